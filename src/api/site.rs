//! Public site information and crawler endpoints
//!
//! - GET /api/v1/site
//! - GET /sitemap.xml
//! - GET /robots.txt

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::middleware::ApiError;
use super::AppState;
use crate::services::seo::{robots_txt, sitemap_xml, PageMeta};

/// Response for public site info
#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub version: String,
    pub name: String,
    pub description: String,
    pub base_url: String,
    pub meta: PageMeta,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(site_info))
}

/// Crawler files, mounted at the site root rather than under /api/v1
pub fn root_router() -> Router<AppState> {
    Router::new()
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
}

async fn site_info(State(state): State<AppState>) -> Json<SiteInfoResponse> {
    let site = &state.site;
    Json(SiteInfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: site.name.clone(),
        description: site.description.clone(),
        base_url: site.base_url.clone(),
        meta: PageMeta::home(site),
    })
}

async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let areas = state.practice_area_service.list_active().await?;
    let posts = state.blog_service.all_published().await?;
    let xml = sitemap_xml(&state.site, &areas, &posts);
    Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml))
}

async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        robots_txt(&state.site),
    )
}
