use serde::Deserialize;

/// Query string of `POST /start`
#[derive(Debug, Default, Deserialize)]
pub struct StartQuery {
    #[serde(default)]
    pub model: Option<String>,
}
