use serde::{Deserialize, Serialize};

pub mod health_check;
pub mod stats;

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error: String,
}
