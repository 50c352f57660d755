use thiserror::Error;

/// Input rejected before it reaches business logic or storage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid type. It must be one of: fire, police, flood, accident, landslide, other.")]
    InvalidIncidentType(String),

    #[error("Invalid status. It must be one of: pending, verified, working, solved.")]
    InvalidStatus(String),

    #[error("Invalid role")]
    InvalidRole(String),

    #[error("Description must be a string and at least {min} characters long.")]
    DescriptionTooShort { min: usize },

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    /// Every credential rule that failed, in rule order.
    #[error("Invalid credentials: {}", .0.join(", "))]
    Credentials(Vec<String>),
}
