use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoadModelRequest {
    /// Model identifier or local path (required)
    pub model: String,

    /// Accepted for client compatibility; the engine limit comes from config
    #[serde(default)]
    pub max_tokens: Option<u32>,
}
