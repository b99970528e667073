//! Admin HTTP surface.
//!
//! | Route | Method | Response |
//! |-------|--------|----------|
//! | `/settings` | GET | current settings (JSON) |
//! | `/run` | POST | run outcome (JSON); 400 when a field is empty |
//! | `/logs` | GET | journal as plain text |
//! | `/logs/clear` | POST | clears the journal |
//! | `/logs/export` | GET | journal as a text attachment |

use std::sync::Arc;

use chrono::Local;
use poem::http::{StatusCode, header};
use poem::web::{Data, Json};
use poem::{Endpoint, EndpointExt, IntoResponse, Response, Route, get, handler, post};
use tracing::info;

use super::service::ProbeService;
use super::storage::ProbeSettings;
use super::types::{ErrorResponse, RunRequest};

pub const MISSING_FIELDS_MESSAGE: &str = "Please provide host, port, and select a method.";
pub const EMPTY_LOGS_MESSAGE: &str = "No logs available.";

/// `system-health-logs-YYYY-MM-DDTHH-MM-SS.txt` for the current local time.
pub fn export_filename() -> String {
    format!(
        "system-health-logs-{}.txt",
        Local::now().format("%Y-%m-%dT%H-%M-%S")
    )
}

fn logs_text(service: &ProbeService) -> String {
    if service.sink().is_empty() {
        EMPTY_LOGS_MESSAGE.to_string()
    } else {
        service.sink().snapshot()
    }
}

#[handler]
async fn get_settings(Data(service): Data<&Arc<ProbeService>>) -> Json<ProbeSettings> {
    Json(service.settings())
}

#[handler]
async fn run_probe(
    Data(service): Data<&Arc<ProbeService>>,
    Json(request): Json<RunRequest>,
) -> Response {
    if !request.is_complete() {
        return Json(ErrorResponse {
            error: MISSING_FIELDS_MESSAGE.to_string(),
        })
        .with_status(StatusCode::BAD_REQUEST)
        .into_response();
    }

    info!(
        "Run requested via admin: {}:{} ({})",
        request.host, request.port, request.method
    );
    let outcome = service
        .submit(ProbeSettings {
            host: request.host,
            port: request.port,
            method: request.method,
        })
        .await;

    Json(outcome).into_response()
}

#[handler]
async fn get_logs(Data(service): Data<&Arc<ProbeService>>) -> String {
    logs_text(service)
}

#[handler]
async fn clear_logs(Data(service): Data<&Arc<ProbeService>>) -> String {
    service.clear_logs();
    logs_text(service)
}

#[handler]
async fn export_logs(Data(service): Data<&Arc<ProbeService>>) -> Response {
    Response::builder()
        .content_type("text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export_filename()),
        )
        .body(logs_text(service))
}

/// Build the admin routes around a shared service.
pub fn routes(service: Arc<ProbeService>) -> impl Endpoint {
    Route::new()
        .at("/settings", get(get_settings))
        .at("/run", post(run_probe))
        .at("/logs", get(get_logs))
        .at("/logs/clear", post(clear_logs))
        .at("/logs/export", get(export_logs))
        .data(service)
}
