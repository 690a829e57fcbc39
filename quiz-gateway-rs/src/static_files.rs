// quiz-gateway-rs/src/static_files.rs
// Front-end asset routes. Only the four published files are reachable; the
// public directory is never exposed as a tree.

use axum::routing::get_service;
use axum::Router;
use config_rs::ServerSettings;
use tower_http::services::ServeFile;

use crate::errors::not_found;

/// `GET` routes for the bundled front-end and platform manifest.
/// A missing file answers 404; other methods fall through to `NOT_FOUND`.
pub fn static_routes<S>(settings: &ServerSettings) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let public = &settings.public_dir;

    Router::new()
        .route(
            "/",
            get_service(ServeFile::new(public.join("index.html"))).fallback(not_found),
        )
        .route(
            "/app.js",
            get_service(ServeFile::new(public.join("app.js"))).fallback(not_found),
        )
        .route(
            "/styles.css",
            get_service(ServeFile::new(public.join("styles.css"))).fallback(not_found),
        )
        .route(
            "/fbapp-config.json",
            get_service(ServeFile::new(&settings.fbapp_config_path)).fallback(not_found),
        )
}
