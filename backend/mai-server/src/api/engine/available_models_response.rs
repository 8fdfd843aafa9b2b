use serde::Serialize;

/// A model directory found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableModel {
    /// Directory name, usable as the `model` argument
    pub id: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct AvailableModelsResponse {
    pub models: Vec<AvailableModel>,
}
