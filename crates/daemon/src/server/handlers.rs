//! Request handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{ConnectInfo, Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use percent_encoding::percent_decode_str;
use protocol::{ConnectResponse, ConnectedDevicesResponse};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::error::ApiError;
use super::pages;
use super::AppState;
use crate::files::TransferError;
use crate::orchestrator::OrchestratorEvent;

/// Multipart field carrying uploaded files.
pub const UPLOAD_FIELD: &str = "files";

/// Query string of the listing routes.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    pub search: String,
}

/// `GET /`: list the shared root.
pub async fn index(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<ListingQuery>,
) -> Result<Response, ApiError> {
    render_listing(&state, addr, &headers, String::new(), query.search).await
}

/// `GET /<subpath>`: list a folder below the root.
///
/// Installed as the router fallback so it never competes with the fixed
/// routes for a path.
pub async fn browse(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<ListingQuery>,
) -> Result<Response, ApiError> {
    if method != Method::GET && method != Method::HEAD {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let subpath = match percent_decode_str(uri.path()).decode_utf8() {
        Ok(path) => path.trim_matches('/').to_string(),
        Err(_) => return Err(ApiError::FolderNotFound),
    };

    render_listing(&state, addr, &headers, subpath, query.search).await
}

async fn render_listing(
    state: &Arc<AppState>,
    addr: SocketAddr,
    headers: &HeaderMap,
    subpath: String,
    search: String,
) -> Result<Response, ApiError> {
    state.register_visit(addr, headers);

    let share = state.share()?;
    let browser = Arc::clone(&share.browser);

    let permit = Arc::clone(&state.listing_permits)
        .acquire_owned()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let (subpath, search, entries) = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let entries = browser.list(&subpath, &search);
        (subpath, search, entries)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("listing task failed: {}", e)))?;

    let entries = entries.map_err(ApiError::from_listing)?;
    debug!("Listed /{} ({} entries)", subpath, entries.len());

    Ok(Html(pages::listing_page(&subpath, &search, &entries).into_string()).into_response())
}

/// `POST /upload`: save every file in the `files` field into the root.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let share = state.share()?;
    // A body that is not multipart carries no files field at all.
    let mut multipart = multipart.map_err(|e| {
        debug!("Rejected upload body: {}", e);
        ApiError::NoFilesPart
    })?;

    let mut saw_files_field = false;
    let mut saved = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        saw_files_field = true;

        // Empty file inputs are submitted as a part with no file name.
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        let mut writer = share.transfer.create_upload(&file_name).await?;
        while let Some(chunk) = field.chunk().await? {
            writer.write_chunk(&chunk).await?;
        }
        let bytes = writer.written();
        let path = writer.finish().await?;

        info!("Received upload {} ({} bytes)", path.display(), bytes);
        saved.push(file_name);
    }

    if !saw_files_field {
        return Err(ApiError::NoFilesPart);
    }

    if !saved.is_empty() {
        state.emit(OrchestratorEvent::FilesUploaded {
            names: saved.clone(),
        });
    }

    Ok(Html(pages::upload_success_page(&saved).into_string()).into_response())
}

/// `GET /download/<path>`: stream a file as an attachment.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let share = state.share()?;
    let target = share.transfer.resolve_download(&path).await?;

    let file = tokio::fs::File::open(&target.path)
        .await
        .map_err(TransferError::from)?;
    debug!("Sending {} ({} bytes)", target.path.display(), target.size);

    let headers = [
        (header::CONTENT_TYPE, target.content_type()),
        (header::CONTENT_DISPOSITION, target.content_disposition()),
        (header::CONTENT_LENGTH, target.size.to_string()),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// `POST /connect`: register the caller as a device.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<ConnectResponse> {
    state.register_visit(addr, &headers);
    Json(ConnectResponse::ok())
}

/// `GET /connected_devices`: every device seen so far.
pub async fn connected_devices(State(state): State<Arc<AppState>>) -> Json<ConnectedDevicesResponse> {
    Json(ConnectedDevicesResponse::new(state.registry.snapshot()))
}
