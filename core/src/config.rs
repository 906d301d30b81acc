//! Client configuration.
//!
//! `ClientConfig` is built once and handed to `ApiClient::new`. Values can
//! come from code (builder-style setters) or from the environment via
//! `ClientConfig::from_env`.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::envelope::SuccessPolicy;
use crate::error::ApiError;
use crate::store::{FileTokenStore, MemoryTokenStore, TokenStore};

pub const BASE_URL_VAR: &str = "API_BASE_URL";
pub const TIMEOUT_VAR: &str = "API_TIMEOUT_SECS";
pub const TOKEN_FILE_VAR: &str = "API_TOKEN_FILE";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Returns the current auth token, if any.
pub type TokenGetter = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Receives every error before it is returned to the caller.
pub type ErrorHandler = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// Default error sink: log and move on.
pub fn log_error_handler() -> ErrorHandler {
    Arc::new(|err: &ApiError| error!(status = ?err.status(), "{err}"))
}

#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub default_headers: Vec<(String, String)>,
    pub success_policy: SuccessPolicy,
    pub token_getter: Option<TokenGetter>,
    pub error_handler: ErrorHandler,
    pub token_store: Arc<dyn TokenStore>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            default_headers: vec![("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string())],
            success_policy: SuccessPolicy::default(),
            token_getter: None,
            error_handler: log_error_handler(),
            token_store: Arc::new(MemoryTokenStore::new()),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("default_headers", &self.default_headers)
            .field("success_policy", &self.success_policy)
            .field("token_getter", &self.token_getter.is_some())
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self::default().base_url(base_url)
    }

    /// Read `API_BASE_URL`, `API_TIMEOUT_SECS` and `API_TOKEN_FILE`.
    ///
    /// An unset base URL means requests go to relative URLs as given.
    pub fn from_env() -> Self {
        let mut config = Self::default().base_url(&var(BASE_URL_VAR).unwrap_or_default());
        config.timeout = Duration::from_secs(try_load(TIMEOUT_VAR, DEFAULT_TIMEOUT.as_secs()));
        if let Some(path) = var(TOKEN_FILE_VAR) {
            config.token_store = Arc::new(FileTokenStore::new(path));
        }
        config
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.default_headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn success_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.success_policy = SuccessPolicy::new(codes);
        self
    }

    pub fn token_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.token_getter = Some(Arc::new(getter));
        self
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    pub fn token_store(mut self, store: impl TokenStore + 'static) -> Self {
        self.token_store = Arc::new(store);
        self
    }
}

fn var(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    let Some(raw) = var(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TOKEN_KEY;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(
            config.default_headers,
            vec![("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string())]
        );
        assert!(config.token_getter.is_none());
        assert!(config.success_policy.is_success(0));
        assert!(config.success_policy.is_success(200));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("http://localhost:3000/");
        assert_eq!(config.base_url, "http://localhost:3000");
    }

    #[test]
    fn default_header_replaces_case_insensitively() {
        let config = ClientConfig::default().default_header("content-type", "text/plain");
        assert_eq!(
            config.default_headers,
            vec![("content-type".to_string(), "text/plain".to_string())]
        );
    }

    #[test]
    fn from_env_reads_every_variable() {
        let token_file = env::temp_dir().join(format!("portal-core-{}-env-token.json", std::process::id()));
        std::fs::write(&token_file, r#"{"token":"from-file"}"#).unwrap();

        env::set_var(BASE_URL_VAR, " http://api.example.com/ ");
        env::set_var(TIMEOUT_VAR, "5");
        env::set_var(TOKEN_FILE_VAR, &token_file);
        let config = ClientConfig::from_env();
        assert_eq!(config.base_url, "http://api.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.token_store.get(TOKEN_KEY), Some("from-file".to_string()));

        env::remove_var(BASE_URL_VAR);
        env::remove_var(TIMEOUT_VAR);
        env::remove_var(TOKEN_FILE_VAR);
        let config = ClientConfig::from_env();
        assert_eq!(config.base_url, "");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.token_store.get(TOKEN_KEY), None);

        std::fs::remove_file(&token_file).unwrap();
    }

    #[test]
    fn try_load_falls_back_on_garbage() {
        env::set_var("PORTAL_CORE_TEST_TIMEOUT", "soon");
        assert_eq!(try_load("PORTAL_CORE_TEST_TIMEOUT", 7u64), 7);
        env::set_var("PORTAL_CORE_TEST_TIMEOUT", "12");
        assert_eq!(try_load("PORTAL_CORE_TEST_TIMEOUT", 7u64), 12);
        env::remove_var("PORTAL_CORE_TEST_TIMEOUT");
        assert_eq!(try_load("PORTAL_CORE_TEST_TIMEOUT", 7u64), 7);
    }
}
