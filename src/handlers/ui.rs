//! # Recorder Page
//!
//! Serves the single-page recorder UI. The page is compiled into the
//! binary so the server has no runtime file dependencies.

use actix_web::HttpResponse;

/// Serve the recorder page.
///
/// ## Endpoint: `GET /`
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(include_str!("../../static/index.html"))
}
