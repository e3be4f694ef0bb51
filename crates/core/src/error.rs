#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid environment variable {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::Validation(errors.to_string())
    }
}
