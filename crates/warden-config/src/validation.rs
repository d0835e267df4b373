//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Enforcement config error: {0}")]
    EnforcementError(String),

    #[error("Identity config error: {0}")]
    IdentityError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.enforcement.self_app_id.trim().is_empty() {
        errors.push(ValidationError::EnforcementError(
            "self_app_id cannot be empty".into(),
        ));
    }

    if let Some(identity) = &config.identity {
        if identity.parent_id.trim().is_empty() {
            errors.push(ValidationError::IdentityError(
                "parent_id cannot be empty".into(),
            ));
        }
        if identity.child_id.trim().is_empty() {
            errors.push(ValidationError::IdentityError(
                "child_id cannot be empty".into(),
            ));
        }
    }

    errors
}
