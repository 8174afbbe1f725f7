use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::Value;

use filequeue_core::{FileChanges, FileFilter, FileId, FileRecord, NewFile, UserId};

use crate::app::{dto, errors::ApiError, routes::queue, services::AppServices};
use crate::i18n::Locale;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_files).post(create_file))
        .route("/:id", get(get_file).put(update_file).delete(delete_file))
}

/// `POST /files`: a body with a top-level `fileData` member is a queue
/// submission (202), anything else creates a record directly (201).
pub async fn create_file(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            let err = ApiError::invalid("missingRequiredFields", rejection.body_text());
            return services.error_response(&locale, err);
        }
    };

    if let Some(file_data) = dto::file_data(&body) {
        return queue::enqueue(&services, &locale, file_data.clone());
    }

    match insert_file(&services, body).await {
        Ok(file) => {
            let message = services.t("fileCreated", &locale);
            (StatusCode::CREATED, Json(dto::file_to_json(message, &file))).into_response()
        }
        Err(err) => services.error_response(&locale, err),
    }
}

async fn insert_file(services: &AppServices, body: Value) -> Result<FileRecord, ApiError> {
    const MISSING: &str = "missingRequiredFields";

    let req: dto::CreateFileRequest =
        serde_json::from_value(body).map_err(|e| ApiError::invalid(MISSING, e))?;

    let (Some(user_id), Some(name), Some(size), Some(file_type), Some(path)) =
        (req.user_id, req.name, req.size, req.file_type, req.path)
    else {
        return Err(ApiError::validation(MISSING));
    };

    let new_file = NewFile::new(UserId::new(user_id), name, size, file_type, path)
        .map_err(|e| ApiError::from_domain(MISSING, e))?;

    let file = services
        .records
        .create_file(new_file)
        .await
        .map_err(|e| ApiError::store("errorCreatingFile", e))?;

    tracing::info!(file_id = %file.id, user_id = %file.user_id, "file record created");
    Ok(file)
}

/// `GET /files[?userId=N]`
pub async fn list_files(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
    query: Result<Query<dto::ListFilesQuery>, QueryRejection>,
) -> Response {
    let filter = match query {
        Ok(Query(q)) => match q.user_id {
            Some(id) => FileFilter::owned_by(UserId::new(id)),
            None => FileFilter::default(),
        },
        Err(rejection) => {
            let err = ApiError::invalid("invalidQuery", rejection.body_text());
            return services.error_response(&locale, err);
        }
    };

    match services.records.list_files(filter).await {
        Ok(files) => {
            let message = services.t("filesFetched", &locale);
            (StatusCode::OK, Json(dto::files_to_json(message, &files))).into_response()
        }
        Err(e) => services.error_response(&locale, ApiError::store("errorFetchingFiles", e)),
    }
}

pub async fn get_file(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
    Path(id): Path<String>,
) -> Response {
    let result = async {
        let id = parse_file_id(&id)?;
        services
            .records
            .find_file(id)
            .await
            .map_err(|e| ApiError::store("errorFetchingFileById", e))?
            .ok_or_else(|| ApiError::not_found("fileNotFound"))
    }
    .await;

    match result {
        Ok(file) => {
            let message = services.t("fileFetched", &locale);
            (StatusCode::OK, Json(dto::file_to_json(message, &file))).into_response()
        }
        Err(err) => services.error_response(&locale, err),
    }
}

/// Partial update. An unknown id is reported before the body is looked at.
pub async fn update_file(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateFileRequest>, JsonRejection>,
) -> Response {
    let result = async {
        const FAILED: &str = "errorUpdatingFile";

        let id = parse_file_id(&id)?;
        let exists = services
            .records
            .find_file(id)
            .await
            .map_err(|e| ApiError::store(FAILED, e))?
            .is_some();
        if !exists {
            return Err(ApiError::not_found("fileNotFound"));
        }

        let Json(req) = body.map_err(|r| ApiError::invalid("invalidRequestBody", r.body_text()))?;
        let changes = FileChanges::from(req);
        changes
            .validate()
            .map_err(|e| ApiError::from_domain("missingRequiredFields", e))?;

        services
            .records
            .update_file(id, changes)
            .await
            .map_err(|e| ApiError::store(FAILED, e))?
            // deleted between the lookup and the update
            .ok_or_else(|| ApiError::not_found("fileNotFound"))
    }
    .await;

    match result {
        Ok(file) => {
            tracing::info!(file_id = %file.id, "file record updated");
            let message = services.t("fileUpdated", &locale);
            (StatusCode::OK, Json(dto::file_to_json(message, &file))).into_response()
        }
        Err(err) => services.error_response(&locale, err),
    }
}

pub async fn delete_file(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
    Path(id): Path<String>,
) -> Response {
    let result = async {
        let id = parse_file_id(&id)?;
        let deleted = services
            .records
            .delete_file(id)
            .await
            .map_err(|e| ApiError::store("errorDeletingFile", e))?;
        if deleted {
            tracing::info!(file_id = %id, "file record deleted");
            Ok(())
        } else {
            Err(ApiError::not_found("fileNotFound"))
        }
    }
    .await;

    match result {
        Ok(()) => {
            let message = services.t("fileDeleted", &locale);
            (StatusCode::OK, Json(serde_json::json!({ "message": message }))).into_response()
        }
        Err(err) => services.error_response(&locale, err),
    }
}

/// Ids that are not integers cannot name a record.
fn parse_file_id(raw: &str) -> Result<FileId, ApiError> {
    raw.parse::<FileId>()
        .map_err(|_| ApiError::not_found("fileNotFound"))
}
