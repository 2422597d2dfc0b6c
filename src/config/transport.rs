//! Transport endpoint configuration

use crate::client::errors::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

fn default_url() -> String {
    "https://mcp.kite.trade/sse".to_string()
}

/// Where and how to reach the MCP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// SSE endpoint URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Extra HTTP headers sent on every request (auth, session)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            headers: HashMap::new(),
        }
    }
}

impl TransportConfig {
    /// Recognized environment variable: `KITE_MCP_URL`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("KITE_MCP_URL") {
            if !url.trim().is_empty() {
                config.url = url.trim().to_string();
            }
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url)
            .map_err(|e| ClientError::Config(format!("invalid transport url: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "transport url must be http(s), got {}",
                url.scheme()
            )));
        }
        Ok(())
    }
}
