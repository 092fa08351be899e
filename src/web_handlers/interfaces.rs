use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use log::{debug, error, info};
use serde::Deserialize;
use std::sync::Arc;

use crate::interfaces::rewriter::{fetch_and_rewrite, RewriteError};
use crate::models::AppState;
use crate::utils::http::FetchError;

/// Body served to anyone without the right token
pub const FALLBACK_GREETING: &str = "Hello from clash-rewrite!";

/// Query parameters for the rewrite endpoint
#[derive(Deserialize, Debug, Default, Clone)]
pub struct RewriteQuery {
    /// Authentication token
    pub token: Option<String>,
}

/// HTTP status a failed rewrite is reported with
pub fn error_status(err: &RewriteError) -> StatusCode {
    match err {
        RewriteError::Fetch(FetchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        RewriteError::Fetch(_) | RewriteError::Decode(_) => StatusCode::BAD_GATEWAY,
        RewriteError::NotASequence { .. }
        | RewriteError::LocalProxy { .. }
        | RewriteError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Handler for the merged profile
///
/// A wrong or missing token gets the greeting with a normal 200 so the
/// endpoint cannot be told apart from a plain web server.
pub async fn rewrite_handler(
    query: web::Query<RewriteQuery>,
    app_state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    if !app_state.is_authorized(query.token.as_deref()) {
        debug!("Rejected rewrite request without a valid token");
        return HttpResponse::Ok().body(FALLBACK_GREETING);
    }

    match fetch_and_rewrite(&app_state.config).await {
        Ok(content) => {
            info!("Served merged profile ({} bytes)", content.len());
            HttpResponse::Ok().body(content)
        }
        Err(e) => {
            error!("Rewrite error: {}", e);
            HttpResponse::build(error_status(&e)).body(format!("Rewrite error: {}", e))
        }
    }
}

/// Register the API endpoints with Actix Web
pub fn config(cfg: &mut web::ServiceConfig, path: &str) {
    cfg.route(path, web::get().to(rewrite_handler));
}
