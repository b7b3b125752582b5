//! Client configuration.
//!
//! Only the API root is configurable. It defaults to the public shortdiary
//! service; tests and self-hosted deployments point it elsewhere.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;

/// Root of the public shortdiary API.
pub const API_ROOT: &str = "https://api.shortdiary.me/api/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    api_root: String,
}

impl Config {
    /// Build a config for `api_root`, which must be an absolute http or https
    /// URL. A trailing slash is dropped.
    pub fn new(api_root: &str) -> Result<Self, ApiError> {
        let api_root = api_root.trim_end_matches('/');
        check_url(api_root)?;
        Ok(Self {
            api_root: api_root.to_string(),
        })
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// `<api_root>/<endpoint>`, validated.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<String, ApiError> {
        // Deserialized configs skip `new`, so normalize here as well.
        let url = format!("{}/{}", self.api_root.trim_end_matches('/'), endpoint);
        check_url(&url)?;
        Ok(url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_root: API_ROOT.to_string(),
        }
    }
}

fn check_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::InvalidUrl(format!("unsupported scheme {other:?} in {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_public_service() {
        let config = Config::default();
        assert_eq!(config.api_root(), "https://api.shortdiary.me/api/v1");
        assert_eq!(
            config.endpoint_url("posts/").unwrap(),
            "https://api.shortdiary.me/api/v1/posts/"
        );
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = Config::new("http://localhost:3000/api/v1/").unwrap();
        assert_eq!(config.endpoint_url("public/").unwrap(), "http://localhost:3000/api/v1/public/");
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = Config::new("ftp://example.com/api").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn rejects_relative_root() {
        let err = Config::new("api/v1").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn deserializes_from_json() {
        let config: Config = serde_json::from_str(r#"{"api_root":"http://127.0.0.1:8080/api/v1"}"#).unwrap();
        assert_eq!(config.api_root(), "http://127.0.0.1:8080/api/v1");
    }
}
