//! HTTP Client Factory
//!
//! Builds the reqwest clients shared by chat and speech providers.

use std::time::Duration;

use crate::types::{LlmError, LlmResult, ProxyConfig};

/// Connect timeout for provider endpoints. Request timeouts are left to the caller.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a `reqwest::Client` with the resolved proxy configuration.
///
/// - `Some(proxy)` -> configure proxy on the client
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
pub fn build_http_client(proxy: Option<&ProxyConfig>) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
    match proxy {
        Some(cfg) => {
            let mut p = reqwest::Proxy::all(&cfg.url).map_err(|e| LlmError::InvalidRequest {
                message: format!("invalid proxy URL {}: {}", cfg.url, e),
            })?;
            if let (Some(u), Some(pw)) = (&cfg.username, &cfg.password) {
                p = p.basic_auth(u, pw);
            }
            builder = builder.proxy(p);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    builder.build().map_err(|e| LlmError::Other {
        message: format!("failed to build HTTP client: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client_no_proxy() {
        assert!(build_http_client(None).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let cfg = ProxyConfig {
            url: "http://127.0.0.1:8080".to_string(),
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
        };
        assert!(build_http_client(Some(&cfg)).is_ok());
    }

    #[test]
    fn test_build_http_client_rejects_bad_proxy() {
        let cfg = ProxyConfig {
            url: "http://[bad".to_string(),
            username: None,
            password: None,
        };
        let err = build_http_client(Some(&cfg)).unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest { .. }));
    }
}
