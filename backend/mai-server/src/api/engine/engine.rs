//! Engine management handlers
//!
//! Start, stop and swap the inference engine and report its status.

use crate::{
    ActionResponse, ApiError, ApiResult, AppState, AvailableModel, AvailableModelsResponse,
    LoadModelRequest, LoadModelResponse, StartQuery,
};

use mai_engine::ServerStatus;

use std::panic::Location;
use std::path::Path;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use error_location::ErrorLocation;

/// Marker file that makes a directory a loadable model
const MODEL_CONFIG_FILE: &str = "config.json";

// =============================================================================
// Handlers
// =============================================================================

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<ServerStatus> {
    Json(state.supervisor.status())
}

/// POST /load
///
/// Hot-swap to another model. Blocks until the new model is healthy.
pub async fn load_model(
    State(state): State<AppState>,
    payload: Result<Json<LoadModelRequest>, JsonRejection>,
) -> ApiResult<Json<LoadModelResponse>> {
    let Json(request) = payload?;

    let model = request.model.trim();
    if model.is_empty() {
        return Err(ApiError::validation("model cannot be empty", "model"));
    }

    if let Some(max_tokens) = request.max_tokens {
        let limit = state.config.engine.max_tokens;
        if max_tokens == 0 || max_tokens > limit {
            return Err(ApiError::validation(
                format!("max_tokens must be 1-{limit}, got {max_tokens}"),
                "max_tokens",
            ));
        }
        log::debug!("Ignoring max_tokens={max_tokens} on load, engine limit is {limit}");
    }

    state.supervisor.swap_model(model).await?;

    Ok(Json(LoadModelResponse {
        status: "success".to_string(),
        model: model.to_string(),
        message: format!("Model {model} loaded successfully"),
    }))
}

/// POST /stop
pub async fn stop_engine(State(state): State<AppState>) -> ApiResult<Json<ActionResponse>> {
    state.supervisor.stop().await?;

    Ok(Json(ActionResponse {
        status: "stopped".to_string(),
        model: None,
    }))
}

/// POST /start?model=<id>
///
/// Start the engine, with the configured default model when none is given.
pub async fn start_engine(
    State(state): State<AppState>,
    query: Result<Query<StartQuery>, QueryRejection>,
) -> ApiResult<Json<ActionResponse>> {
    let Query(query) = query?;
    let model = query.model.as_deref().map(str::trim).filter(|m| !m.is_empty());

    state.supervisor.start(model).await?;

    Ok(Json(ActionResponse {
        status: "started".to_string(),
        model: state.supervisor.status().current_model,
    }))
}

/// GET /models/available
///
/// Subdirectories of the model directory that contain a `config.json`.
pub async fn list_available_models(
    State(state): State<AppState>,
) -> ApiResult<Json<AvailableModelsResponse>> {
    let models = scan_model_directory(Path::new(&state.config.engine.model_directory)).await?;
    Ok(Json(AvailableModelsResponse { models }))
}

async fn scan_model_directory(dir: &Path) -> ApiResult<Vec<AvailableModel>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ApiError::Internal {
                message: format!("Cannot read model directory {}: {e}", dir.display()),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    };

    let mut models = Vec::new();
    while let Some(entry) = next_entry(&mut entries, dir).await? {
        let path = entry.path();
        if !path.is_dir() || !path.join(MODEL_CONFIG_FILE).is_file() {
            continue;
        }

        models.push(AvailableModel {
            id: entry.file_name().to_string_lossy().into_owned(),
            path: path.display().to_string(),
        });
    }

    models.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(models)
}

async fn next_entry(
    entries: &mut tokio::fs::ReadDir,
    dir: &Path,
) -> ApiResult<Option<tokio::fs::DirEntry>> {
    entries.next_entry().await.map_err(|e| ApiError::Internal {
        message: format!("Cannot read model directory {}: {e}", dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })
}
