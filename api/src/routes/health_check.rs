use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{HttpResponse, ResponseError};
use ingest::error::IngestError;
use ingest::store::StatsStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum HealthCheckError {
    #[error("the statistics store is unreachable")]
    StoreUnreachable(#[source] IngestError),
}

impl ResponseError for HealthCheckError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(HealthResponse {
            status: "unhealthy".to_owned(),
            error: Some(self.to_string()),
        })
    }
}

/// Answers 200 when the store responds to a ping, 503 otherwise.
pub async fn health_check<S>(store: Data<S>) -> Result<HttpResponse, HealthCheckError>
where
    S: StatsStore + 'static,
{
    if let Err(err) = store.ping().await {
        error!(error = %err, "health check failed to reach the store");

        return Err(HealthCheckError::StoreUnreachable(err));
    }

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_owned(),
        error: None,
    }))
}
