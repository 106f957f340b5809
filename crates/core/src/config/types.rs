use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::hooks::{ArchiveConfig, CollectionConfig};
use crate::orchestrator::OrchestratorConfig;
use crate::sink::HttpSinkConfig;
use crate::transfer::TransferConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub sink: HttpSinkConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upload: TransferConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub collections: CollectionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub sink: SanitizedSinkConfig,
    pub upload: TransferConfig,
    pub orchestrator: OrchestratorConfig,
    pub archive: ArchiveConfig,
    pub collections: CollectionConfig,
}

/// Sanitized sink config (access token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSinkConfig {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections_endpoint: Option<String>,
    pub access_token_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            sink: SanitizedSinkConfig {
                endpoint: config.sink.endpoint.clone(),
                collections_endpoint: config.sink.collections_endpoint.clone(),
                access_token_configured: config
                    .sink
                    .access_token
                    .as_deref()
                    .is_some_and(|t| !t.is_empty()),
                timeout_secs: config.sink.timeout_secs,
            },
            upload: config.upload.clone(),
            orchestrator: config.orchestrator.clone(),
            archive: config.archive.clone(),
            collections: config.collections.clone(),
        }
    }
}
