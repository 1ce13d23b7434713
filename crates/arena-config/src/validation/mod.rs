//! Full configuration validation.
//!
//! Validates numeric ranges, cross-field constraints and endpoint URLs,
//! collecting every problem into a single `ConfigError`.

mod helpers;
mod sections;


use crate::schema::ArenaConfig;
use arena_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ArenaConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_api(&mut errors, config);
    sections::validate_presence(&mut errors, config);
    sections::validate_notifications(&mut errors, config);
    sections::validate_matchmaking(&mut errors, config);
    sections::validate_messages(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
