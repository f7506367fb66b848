use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{HttpResponse, ResponseError};
use ingest::error::IngestError;
use ingest::store::StatsStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::routes::ErrorMessage;

/// Aggregates over everything persisted so far.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    /// Sum of added minus deleted lines over every stored commit.
    pub global_net_lines_current: i64,
    /// Number of distinct push events recorded.
    pub events_seen_since_start: i64,
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to read statistics from the store")]
    Store(#[source] IngestError),
}

impl ResponseError for StatsError {
    fn status_code(&self) -> StatusCode {
        match self {
            StatsError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorMessage {
            error: self.to_string(),
        })
    }
}

pub async fn read_stats<S>(store: Data<S>) -> Result<HttpResponse, StatsError>
where
    S: StatsStore + 'static,
{
    let global_net_lines_current = store.global_net_lines().await.map_err(|err| {
        error!(error = %err, "failed to read global net lines");
        StatsError::Store(err)
    })?;

    let events_seen_since_start = store.events_seen_count().await.map_err(|err| {
        error!(error = %err, "failed to read events seen count");
        StatsError::Store(err)
    })?;

    Ok(HttpResponse::Ok().json(StatsResponse {
        global_net_lines_current,
        events_seen_since_start,
    }))
}
