//! TOML format parser

use crate::{error::ConfigError, Config, Result};

/// Parse configuration from TOML string
pub fn parse(content: &str) -> Result<Config> {
    parse_with_path(content, None)
}

/// Parse configuration from TOML string with file path for better errors
pub fn parse_with_path(content: &str, path: Option<&str>) -> Result<Config> {
    ::toml::from_str(content).map_err(|e| ConfigError::from_toml_error(e, content, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[packaging]
create_incremental_chunks = true
max_chunks = 5
"#;
        let config = parse(toml).unwrap();
        assert!(config.packaging.create_incremental_chunks);
        assert_eq!(config.packaging.max_chunks, Some(5));
    }

    #[test]
    fn test_parse_error_carries_context() {
        let toml = "[scan]\nbatch_size = \"many\"\n";
        let err = parse_with_path(toml, Some("repodex.toml")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("in repodex.toml"));
        assert!(msg.contains("batch_size"));
    }
}
