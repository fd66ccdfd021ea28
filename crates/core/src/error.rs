#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}
