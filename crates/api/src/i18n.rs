//! Message bundles and locale negotiation.
//!
//! Bundles are flat JSON objects of `key -> text`. `en` and `es` are compiled
//! into the binary; a directory given at startup may add locales or override
//! individual keys.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

const EMBEDDED: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en.json")),
    ("es", include_str!("../locales/es.json")),
];

#[derive(Debug, thiserror::Error)]
pub enum I18nError {
    #[error("locale bundle {locale:?} is not a flat string map: {source}")]
    Parse {
        locale: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read locale bundles from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("default locale {0:?} has no bundle")]
    MissingDefault(String),
}

/// Negotiated locale of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Bundle = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct Localizer {
    default_locale: String,
    bundles: HashMap<String, Bundle>,
}

impl Localizer {
    /// Localizer over the compiled-in bundles.
    pub fn embedded(default_locale: &str) -> Result<Self, I18nError> {
        let mut bundles = HashMap::new();
        for (locale, raw) in EMBEDDED {
            bundles.insert(locale.to_string(), parse_bundle(locale, raw)?);
        }
        Self::from_bundles(default_locale, bundles)
    }

    pub fn from_bundles(
        default_locale: &str,
        bundles: HashMap<String, HashMap<String, String>>,
    ) -> Result<Self, I18nError> {
        let default_locale = normalize(default_locale);
        if !bundles.contains_key(&default_locale) {
            return Err(I18nError::MissingDefault(default_locale));
        }
        Ok(Self {
            default_locale,
            bundles,
        })
    }

    /// Merge bundles found in `dir` over the current ones.
    ///
    /// Accepts both `<dir>/<locale>.json` and `<dir>/<locale>/translation.json`.
    pub fn merge_dir(mut self, dir: &Path) -> Result<Self, I18nError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| I18nError::Io { path, source }
        };

        for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
            let entry = entry.map_err(io_err(dir))?;
            let path = entry.path();

            let (locale, file) = if path.is_dir() {
                let file = path.join("translation.json");
                if !file.is_file() {
                    continue;
                }
                (entry.file_name().to_string_lossy().into_owned(), file)
            } else if path.extension().is_some_and(|ext| ext == "json") {
                match path.file_stem() {
                    Some(stem) => (stem.to_string_lossy().into_owned(), path.clone()),
                    None => continue,
                }
            } else {
                continue;
            };

            let locale = normalize(&locale);
            let raw = std::fs::read_to_string(&file).map_err(io_err(&file))?;
            let bundle = parse_bundle(&locale, &raw)?;
            tracing::debug!(%locale, keys = bundle.len(), file = %file.display(), "loaded locale bundle");
            self.bundles.entry(locale).or_default().extend(bundle);
        }

        Ok(self)
    }

    pub fn default_locale(&self) -> Locale {
        Locale::new(self.default_locale.clone())
    }

    pub fn supports(&self, tag: &str) -> bool {
        self.bundles.contains_key(&normalize(tag))
    }

    /// Supported locales, sorted.
    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.bundles.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    /// Text for `key` in `locale`, falling back to the default locale and
    /// finally to the key itself.
    pub fn lookup(&self, key: &str, locale: &Locale) -> String {
        if let Some(text) = self.bundles.get(locale.as_str()).and_then(|b| b.get(key)) {
            return text.clone();
        }

        if let Some(text) = self.bundles.get(&self.default_locale).and_then(|b| b.get(key)) {
            if locale.as_str() != self.default_locale {
                tracing::warn!(key, %locale, "missing translation; using default locale");
            }
            return text.clone();
        }

        tracing::warn!(key, %locale, "missing translation in every locale");
        key.to_string()
    }

    /// Pick the request locale: explicit `lng` first, then the best supported
    /// `Accept-Language` entry, then the default.
    pub fn negotiate(&self, lng: Option<&str>, accept_language: Option<&str>) -> Locale {
        if let Some(tag) = lng.map(primary_subtag).filter(|tag| self.supports(tag)) {
            return Locale::new(tag);
        }

        if let Some(header) = accept_language {
            for tag in accept_language_tags(header) {
                let tag = primary_subtag(tag);
                if self.supports(&tag) {
                    return Locale::new(tag);
                }
            }
        }

        self.default_locale()
    }
}

fn parse_bundle(locale: &str, raw: &str) -> Result<Bundle, I18nError> {
    serde_json::from_str(raw).map_err(|source| I18nError::Parse {
        locale: locale.to_string(),
        source,
    })
}

fn normalize(tag: &str) -> String {
    tag.trim().to_ascii_lowercase()
}

/// `es-MX` -> `es`
fn primary_subtag(tag: &str) -> String {
    let tag = tag.trim();
    let primary = tag.split(['-', '_']).next().unwrap_or(tag);
    normalize(primary)
}

/// Tags of an `Accept-Language` header, highest quality first. Entries with
/// `q=0` or the `*` wildcard are dropped.
fn accept_language_tags(header: &str) -> Vec<&str> {
    let mut tags: Vec<(&str, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = parts
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then_some((tag, quality))
        })
        .collect();

    // stable: equal weights keep header order
    tags.sort_by(|a, b| b.1.total_cmp(&a.1));
    tags.into_iter().map(|(tag, _)| tag).collect()
}
