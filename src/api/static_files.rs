use axum::{
    body::Body,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use mime_guess::from_path;
use rust_embed::RustEmbed;
use std::path::PathBuf;

#[derive(RustEmbed)]
#[folder = "site"]
pub struct Assets;

/// Serve site pages from the configured directory, falling back to embedded assets
pub async fn serve_static(uri: Uri, static_dir: Option<String>) -> Response {
    let path = uri.path().trim_start_matches('/');

    if path.split('/').any(|segment| segment == "..") {
        return (StatusCode::BAD_REQUEST, "Invalid path").into_response();
    }

    if let Some(ref dir) = static_dir {
        let file = if path.is_empty() || path.ends_with('/') {
            format!("{}index.html", path)
        } else {
            path.to_string()
        };
        let file_path = PathBuf::from(dir).join(&file);
        if let Ok(content) = tokio::fs::read(&file_path).await {
            return file_response(&file, Body::from(content));
        }
    }

    serve_embedded(path)
}

fn serve_embedded(path: &str) -> Response {
    let path = if path.is_empty() { "index.html" } else { path };

    if let Some(content) = Assets::get(path) {
        return file_response(path, Body::from(content.data));
    }

    // Extensionless paths are page routes; let the index page handle them
    if !path.contains('.') {
        if let Some(index) = Assets::get("index.html") {
            return file_response("index.html", Body::from(index.data));
        }
    }

    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}

fn file_response(path: &str, body: Body) -> Response {
    let mime = from_path(path).first_or_octet_stream();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        body,
    )
        .into_response()
}
