use super::{types::Config, ConfigError};

/// Resumable upload protocols require chunk sizes aligned to this value.
const CHUNK_ALIGNMENT: usize = 256 * 1024;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Sink endpoint is set
/// - Chunk sizes are non-zero multiples of 256 KiB
/// - Throttle ceiling is positive when throttling is enabled
/// - Created collections have a privacy setting
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.sink.endpoint.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "sink.endpoint cannot be empty".to_string(),
        ));
    }

    for (name, size) in [
        ("upload.chunk_size", config.upload.chunk_size),
        ("upload.throttled_chunk_size", config.upload.throttled_chunk_size),
    ] {
        if size == 0 || size % CHUNK_ALIGNMENT != 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a non-zero multiple of {} bytes (got {})",
                name, CHUNK_ALIGNMENT, size
            )));
        }
    }

    if config.upload.throttling_enabled && config.upload.max_upload_rate_mbps <= 0.0 {
        return Err(ConfigError::ValidationError(
            "upload.max_upload_rate_mbps must be positive when throttling is enabled".to_string(),
        ));
    }

    if config.archive.enabled && config.archive.archive_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "archive.archive_dir must be set when archiving is enabled".to_string(),
        ));
    }

    if config.collections.auto_create && config.collections.privacy.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "collections.privacy must be set when auto_create is enabled".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, load_config_from_str};

    fn base_config() -> Config {
        load_config_from_str(
            r#"
[sink]
endpoint = "https://media.example.com/upload"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = base_config();
        config.server = ServerConfig {
            host: "0.0.0.0".parse().unwrap(),
            port: 0,
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_empty_endpoint_fails() {
        let mut config = base_config();
        config.sink.endpoint = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_misaligned_chunk_size_fails() {
        let mut config = base_config();
        config.upload.chunk_size = 1000;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("upload.chunk_size"));
    }

    #[test]
    fn test_validate_zero_rate_with_throttling_fails() {
        let mut config = base_config();
        config.upload.throttling_enabled = true;
        config.upload.max_upload_rate_mbps = 0.0;
        assert!(validate_config(&config).is_err());

        // A zero ceiling is irrelevant while throttling is off
        config.upload.throttling_enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_auto_create_needs_privacy() {
        let mut config = base_config();
        config.collections.privacy = " ".to_string();
        assert!(validate_config(&config).is_ok());

        config.collections.auto_create = true;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("collections.privacy"));
    }
}
