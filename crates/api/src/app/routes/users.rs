use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};

use filequeue_auth::{CompleteLogin, CompleteRegistration, CredentialError, LoginCredentials, Registration};
use filequeue_core::{NewUser, UserSummary};

use crate::app::{dto, errors::ApiError, services::AppServices};
use crate::i18n::Locale;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Response {
    let result = match body {
        Ok(Json(body)) => match body.complete() {
            Some(registration) => register_user(&services, registration).await,
            None => Err(ApiError::validation("allFieldsRequired")),
        },
        Err(rejection) => Err(ApiError::invalid("allFieldsRequired", rejection.body_text())),
    };

    match result {
        Ok(user) => {
            let message = services.t("userRegistered", &locale);
            (StatusCode::CREATED, Json(dto::user_to_json(message, user))).into_response()
        }
        Err(err) => services.error_response(&locale, err),
    }
}

async fn register_user(
    services: &AppServices,
    registration: CompleteRegistration,
) -> Result<UserSummary, ApiError> {
    const FAILED: &str = "errorRegisteringUser";

    let existing = services
        .records
        .find_user_by_email(&registration.email)
        .await
        .map_err(|e| ApiError::store(FAILED, e))?;
    if existing.is_some() {
        return Err(ApiError::conflict("userAlreadyExists"));
    }

    let credentials = services.credentials.clone();
    let password = registration.password;
    let password_hash = tokio::task::spawn_blocking(move || credentials.hash(&password))
        .await
        .map_err(|e| ApiError::store(FAILED, e))?
        .map_err(|e| ApiError::store(FAILED, e))?;

    let new_user = NewUser::new(registration.username, registration.email, password_hash)
        .map_err(|e| ApiError::from_domain("allFieldsRequired", e))?;

    // a concurrent registration can still win the race; the store reports it
    let user = services
        .records
        .create_user(new_user)
        .await
        .map_err(|e| ApiError::from_store(FAILED, "userAlreadyExists", e))?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(user.summary())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
    body: Result<Json<LoginCredentials>, JsonRejection>,
) -> Response {
    let result = match body {
        Ok(Json(body)) => match body.complete() {
            Some(credentials) => authenticate(&services, credentials).await,
            None => Err(ApiError::validation("allFieldsRequired")),
        },
        Err(rejection) => Err(ApiError::invalid("allFieldsRequired", rejection.body_text())),
    };

    match result {
        Ok(user) => {
            let message = services.t("loginSuccessful", &locale);
            (StatusCode::OK, Json(dto::user_to_json(message, user))).into_response()
        }
        Err(err) => services.error_response(&locale, err),
    }
}

async fn authenticate(
    services: &AppServices,
    login: CompleteLogin,
) -> Result<UserSummary, ApiError> {
    const FAILED: &str = "errorLoggingIn";

    let user = services
        .records
        .find_user_by_email(&login.email)
        .await
        .map_err(|e| ApiError::store(FAILED, e))?
        .ok_or_else(|| ApiError::validation("userNotFound"))?;

    let credentials = services.credentials.clone();
    let password = login.password;
    let stored = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || credentials.verify(&password, &stored))
        .await
        .map_err(|e| ApiError::store(FAILED, e))?;

    match verified {
        Ok(true) => {
            tracing::info!(user_id = %user.id, "login succeeded");
            Ok(user.summary())
        }
        Ok(false) => Err(ApiError::validation("invalidPassword")),
        Err(CredentialError::MalformedHash(detail)) => {
            tracing::warn!(user_id = %user.id, %detail, "stored password hash is unreadable");
            Err(ApiError::validation("invalidPassword"))
        }
        Err(e) => Err(ApiError::store(FAILED, e)),
    }
}
