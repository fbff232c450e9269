// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and held in memory.

use std::env;

/// Default Google endpoints (overridable for testing against mock servers).
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Which storage/auth backend the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted Supabase project (GoTrue + PostgREST).
    Supabase,
    /// In-process store for local development and tests.
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(Self::Supabase),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid("BACKEND", other.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    pub backend: BackendKind,
    /// Supabase project URL, e.g. `https://abcd.supabase.co`
    pub supabase_url: String,
    /// Supabase anon (public) API key
    pub supabase_anon_key: String,
    /// Name of the session cookie written by the auth backend
    pub session_cookie_name: String,
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Redirect URI registered with Google for the calendar connect flow
    pub google_redirect_uri: String,
    pub google_auth_url: String,
    pub google_token_url: String,
    pub google_calendar_api_url: String,
    /// Frontend URL (CORS origin, cookie attributes)
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Supabase service role key (bypasses RLS; server-side only)
    pub supabase_service_role_key: String,
    /// HS256 secret for sessions issued by the in-memory backend
    pub session_jwt_secret: Vec<u8>,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
    /// Bearer token required by `/api/migrate` (unset = endpoint open)
    pub migration_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let backend: BackendKind = env::var("BACKEND")
            .unwrap_or_else(|_| "supabase".to_string())
            .parse()?;

        // Supabase credentials are only mandatory when we actually talk to Supabase.
        let supabase_var = |name: &'static str| -> Result<String, ConfigError> {
            match (env::var(name), backend) {
                (Ok(v), _) => Ok(v.trim().to_string()),
                (Err(_), BackendKind::Memory) => Ok(String::new()),
                (Err(_), BackendKind::Supabase) => Err(ConfigError::Missing(name)),
            }
        };

        let supabase_url = supabase_var("SUPABASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let supabase_anon_key = supabase_var("SUPABASE_ANON_KEY")?;
        let supabase_service_role_key = supabase_var("SUPABASE_SERVICE_ROLE_KEY")?;

        let session_jwt_secret = match (env::var("SESSION_JWT_SECRET"), backend) {
            (Ok(v), _) => v.into_bytes(),
            (Err(_), BackendKind::Supabase) => Vec::new(),
            (Err(_), BackendKind::Memory) => {
                return Err(ConfigError::Missing("SESSION_JWT_SECRET"))
            }
        };

        let session_cookie_name = env::var("SESSION_COOKIE_NAME")
            .unwrap_or_else(|_| default_session_cookie_name(&supabase_url));

        Ok(Self {
            backend,
            supabase_url,
            supabase_anon_key,
            session_cookie_name,
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("GOOGLE_REDIRECT_URI"))?,
            google_auth_url: env::var("GOOGLE_AUTH_URL")
                .unwrap_or_else(|_| GOOGLE_AUTH_URL.to_string()),
            google_token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| GOOGLE_TOKEN_URL.to_string()),
            google_calendar_api_url: env::var("GOOGLE_CALENDAR_API_URL")
                .unwrap_or_else(|_| GOOGLE_CALENDAR_API_URL.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            supabase_service_role_key,
            session_jwt_secret,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
            migration_token: env::var("MIGRATION_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    /// Config for tests: in-memory backend, local URLs, fixed secrets.
    pub fn test_default() -> Self {
        Self {
            backend: BackendKind::Memory,
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            session_cookie_name: "sb-localhost-auth-token".to_string(),
            google_client_id: "test_client_id".to_string(),
            google_redirect_uri: "http://localhost:8080/api/auth/callback".to_string(),
            google_auth_url: GOOGLE_AUTH_URL.to_string(),
            google_token_url: GOOGLE_TOKEN_URL.to_string(),
            google_calendar_api_url: GOOGLE_CALENDAR_API_URL.to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            supabase_service_role_key: "test_service_role_key".to_string(),
            session_jwt_secret: b"test_session_secret_32_bytes_min!".to_vec(),
            google_client_secret: "test_secret".to_string(),
            oauth_state_key: b"test_state_key".to_vec(),
            migration_token: Some("test_migration_token".to_string()),
        }
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn cookies_secure(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

/// Supabase's SSR helpers name the session cookie `sb-<project-ref>-auth-token`,
/// where the project ref is the first label of the project host.
pub fn default_session_cookie_name(supabase_url: &str) -> String {
    let host = supabase_url
        .split("://")
        .nth(1)
        .unwrap_or(supabase_url)
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    let project_ref = host.split('.').next().filter(|s| !s.is_empty());

    match project_ref {
        Some(project_ref) => format!("sb-{}-auth-token", project_ref),
        None => "sb-auth-token".to_string(),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("BACKEND", "memory");
        env::set_var("SESSION_JWT_SECRET", "test_session_secret_32_bytes_min!");
        env::set_var("GOOGLE_CLIENT_ID", "test_id");
        env::set_var("GOOGLE_CLIENT_SECRET", " test_secret ");
        env::set_var("GOOGLE_REDIRECT_URI", "http://localhost:8080/api/auth/callback");
        env::set_var("OAUTH_STATE_KEY", "state_key");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.google_client_id, "test_id");
        assert_eq!(config.google_client_secret, "test_secret");
        assert_eq!(config.google_token_url, GOOGLE_TOKEN_URL);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_default_session_cookie_name() {
        assert_eq!(
            default_session_cookie_name("https://abcdxyz.supabase.co"),
            "sb-abcdxyz-auth-token"
        );
        assert_eq!(
            default_session_cookie_name("http://localhost:54321"),
            "sb-localhost-auth-token"
        );
        assert_eq!(default_session_cookie_name(""), "sb-auth-token");
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("Memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!(
            " supabase ".parse::<BackendKind>().unwrap(),
            BackendKind::Supabase
        );
        assert!("postgres".parse::<BackendKind>().is_err());
    }
}
