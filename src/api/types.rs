use serde::{Deserialize, Serialize};

use crate::filter::PathFilters;
use crate::graph::Triple;

/// Body of `POST /path`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FindPathRequest {
    pub first_person_id: i64,
    pub second_person_id: i64,
    #[serde(default)]
    pub filters: Option<PathFilters>,
}

/// Successful `POST /path` response. An empty `path` means no connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindPathResponse {
    pub request_id: String,
    pub path: Vec<Triple>,
}

/// Error body for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}
