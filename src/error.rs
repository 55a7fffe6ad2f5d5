use thiserror::Error;

/// Errors raised by domain operations. Every variant is scoped to the action
/// that triggered it; none of them leave partial writes behind.
#[derive(Debug, Error)]
pub enum CampusError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("not logged in. Run 'campus login <email>' first.")]
    NotLoggedIn,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("LLM request failed: {0}")]
    Llm(String),
}

impl CampusError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CampusError::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        CampusError::Unauthorized(msg.into())
    }

    /// Storage, filesystem and provider failures; the user can simply retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CampusError::Storage(_) | CampusError::Io(_) | CampusError::Llm(_)
        )
    }
}

pub type CampusResult<T> = Result<T, CampusError>;

/// Rejects blank required fields before anything is written.
pub fn require(value: &str, field: &str) -> CampusResult<()> {
    if value.trim().is_empty() {
        Err(CampusError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_whitespace() {
        assert!(require("  ", "message").is_err());
        assert!(require("Hi", "message").is_ok());
        let err = require("", "cover note").unwrap_err();
        assert_eq!(err.to_string(), "validation failed: cover note is required");
    }

    #[test]
    fn test_transient_classification() {
        let io = CampusError::from(std::io::Error::other("disk gone"));
        assert!(io.is_transient());
        assert!(!CampusError::validation("x").is_transient());
        assert!(!CampusError::NotFound { entity: "user", id: 3 }.is_transient());
    }
}
