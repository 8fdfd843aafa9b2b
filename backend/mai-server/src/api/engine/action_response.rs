use serde::Serialize;

/// Result of a start or stop request
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Result of a model swap
#[derive(Debug, Serialize)]
pub struct LoadModelResponse {
    pub status: String,
    pub model: String,
    pub message: String,
}
