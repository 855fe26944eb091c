//! Validation trait and helpers for configuration types

use crate::error::{ConfigError, Result};

/// Trait for validating configuration values
///
/// Implement this trait for any config type that needs validation beyond
/// type-level checks. Returns `Ok(())` if validation passes, or a
/// `ConfigError` describing what failed and why.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Helper function to validate an integer is above a minimum
pub fn validate_min(field: impl Into<String>, value: usize, min: usize) -> Result<()> {
    if value <= min {
        return Err(ConfigError::InvalidInteger {
            field: field.into(),
            value,
            min,
        });
    }
    Ok(())
}

/// Helper function to validate a list holds no blank entries
pub fn validate_patterns(field: impl Into<String>, patterns: &[String]) -> Result<()> {
    if patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: field.into(),
            message: "Patterns cannot be empty strings".to_string(),
        });
    }
    Ok(())
}
