use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media descriptor is missing required field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
