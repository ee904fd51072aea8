//! Request handlers.

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use betadrop_artifacts::parse_file_name;
use betadrop_ingest::Upload;
use betadrop_ingest::id::is_valid_id;
use betadrop_protocol::{ArtifactKind, BundleDetail, BundlePayload, BundleRecord, split_changelog};
use betadrop_ota::{MANIFEST_CONTENT_TYPE, QR_CONTENT_TYPE};
use betadrop_store::Repository;
use chrono::Utc;
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    version: &'static str,
    bundles: u64,
}

#[derive(Debug, Serialize)]
pub struct ChangelogView {
    uuid: String,
    lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VersionEntry {
    version: String,
    url: String,
}

#[derive(Debug, Serialize)]
pub struct VersionsView {
    uuid: String,
    versions: Vec<VersionEntry>,
}

/// Loads a record on the blocking pool, rejecting malformed ids early.
async fn load(repo: &Arc<Repository>, id: String) -> ApiResult<BundleRecord> {
    if !is_valid_id(&id) {
        return Err(ApiError::not_found(format!("bundle not found: {id}")));
    }
    let repo = Arc::clone(repo);
    Ok(tokio::task::spawn_blocking(move || repo.get(&id)).await??)
}

pub async fn health(State(state): State<AppState>) -> ApiResult<Json<Health>> {
    let repo = Arc::clone(&state.repo);
    let bundles = tokio::task::spawn_blocking(move || repo.count()).await??;
    Ok(Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        bundles,
    }))
}

/// `POST /upload`: multipart `file` plus optional `changelog`.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<BundlePayload>> {
    let mut file = None;
    let mut changelog = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("multipart error: {e}")))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read file: {e}")))?;
                file = Some((file_name, data));
            }
            "changelog" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read changelog: {e}")))?;
                changelog = Some(text).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    let (file_name, data) = file.ok_or_else(|| ApiError::bad_request("missing file field"))?;
    let upload = Upload {
        file_name,
        data,
        changelog,
    };

    let ingest = Arc::clone(&state.ingest);
    let payload = tokio::task::spawn_blocking(move || ingest.ingest(upload)).await??;
    Ok(Json(payload))
}

pub async fn bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BundleDetail>> {
    let record = load(&state.repo, id).await?;
    Ok(Json(state.encoder.detail(&record)))
}

pub async fn changelog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ChangelogView>> {
    let record = load(&state.repo, id).await?;
    Ok(Json(ChangelogView {
        lines: split_changelog(&record.changelog),
        uuid: record.id,
    }))
}

pub async fn qrcode(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let record = load(&state.repo, id).await?;
    let png = state.encoder.qr_code(&record.id, Utc::now())?;
    Ok((
        [
            (header::CONTENT_TYPE, QR_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    )
        .into_response())
}

pub async fn plist(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let record = load(&state.repo, id).await?;
    let xml = state.encoder.manifest(&record)?;
    Ok(([(header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE)], xml).into_response())
}

/// Counts the download off the request path and redirects (302) to the
/// package.
pub async fn download(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let record = load(&state.repo, id).await?;
    state.recorder.record(&record.id);
    let target = state.encoder.download_target(&record);
    Ok((StatusCode::FOUND, [(header::LOCATION, target)]).into_response())
}

pub async fn versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<VersionsView>> {
    let record = load(&state.repo, id).await?;
    let repo = Arc::clone(&state.repo);
    let key = record.group_key();
    let versions = tokio::task::spawn_blocking(move || repo.list_versions(&key)).await??;

    let versions = versions
        .into_iter()
        .map(|version| VersionEntry {
            url: state.encoder.builds_url(&record.id, &version),
            version,
        })
        .collect();
    Ok(Json(VersionsView {
        uuid: record.id,
        versions,
    }))
}

/// Builds of one version; an unknown version is a 404.
pub async fn builds(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
) -> ApiResult<Json<Vec<BundlePayload>>> {
    let record = load(&state.repo, id).await?;
    let repo = Arc::clone(&state.repo);
    let key = record.group_key();
    let lookup = version.clone();
    let builds = tokio::task::spawn_blocking(move || repo.list_builds(&key, &lookup)).await??;

    if builds.is_empty() {
        return Err(ApiError::not_found(format!("version not found: {version}")));
    }
    Ok(Json(
        builds.iter().map(|b| state.encoder.payload(b)).collect(),
    ))
}

pub async fn app_file(State(state): State<AppState>, Path(file): Path<String>) -> ApiResult<Response> {
    serve_artifact(&state, ArtifactKind::PACKAGE_DIR, file).await
}

pub async fn icon_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> ApiResult<Response> {
    serve_artifact(&state, ArtifactKind::ICON_DIR, file).await
}

/// Streams a stored file; packages are never buffered whole.
async fn serve_artifact(state: &AppState, dir: &str, file: String) -> ApiResult<Response> {
    let key = parse_file_name(dir, &file)?;
    let content_type = key.kind.content_type();
    let artifacts = state.artifacts.clone();
    let (file, size) = tokio::task::spawn_blocking(move || artifacts.open_file(&key)).await??;

    let stream = ReaderStream::new(tokio::fs::File::from_std(file));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
