//! Authentication module for Twitch API access.
//!
//! Implements the Device Code Flow for user authentication.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rand::Rng;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::constants::{ClientInfo, CLIENT_ANDROID_APP};

// =============================================================================
// Token Storage
// =============================================================================

/// Stored authentication state.
///
/// `session_id` and `client_version` were added after the initial device-code flow shipped;
/// both default to empty on deserialize so an on-disk `auth.json` from before this change still
/// loads, and `AuthGate::validate` fills them in on first use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthState {
    pub access_token: String,
    pub user_id: u64,
    pub device_id: String,
    pub login: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub client_version: String,
}

impl AuthState {
    /// Save auth state to a JSON file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).await?;
        Ok(())
    }

    /// Load auth state from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path).await?;
        let state: Self = serde_json::from_str(&contents)?;
        Ok(state)
    }

    /// Fill in `session_id` if it's missing (fresh login, or an `auth.json` predating it).
    pub fn ensure_session_id(&mut self) {
        if self.session_id.is_empty() {
            self.session_id = generate_session_id();
        }
    }
}

/// §4.2: "random 16 hex chars".
fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap())
        .collect()
}

// =============================================================================
// Device Code Flow
// =============================================================================

/// Response from the device code request.
#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    interval: u64,
}

/// Response from the token request.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Response from the validate endpoint.
#[derive(Debug, Deserialize)]
struct ValidateResponse {
    user_id: String,
    login: String,
}

/// Authenticator using Device Code Flow.
pub struct DeviceAuthenticator {
    client: reqwest::Client,
    client_info: ClientInfo,
    device_id: String,
    client_version: String,
    proxy_url: Option<String>,
}

impl DeviceAuthenticator {
    /// Create a new authenticator with Android client (bypasses integrity checks).
    pub fn new() -> Self {
        Self::with_client_info(CLIENT_ANDROID_APP, None)
    }

    /// Create a new authenticator with proxy support.
    pub fn new_with_proxy(proxy_url: Option<String>) -> Self {
        Self::with_client_info(CLIENT_ANDROID_APP, proxy_url)
    }

    /// Create a new authenticator with custom client info.
    pub fn with_client_info(client_info: ClientInfo, proxy_url: Option<String>) -> Self {
        // Generate a placeholder device_id - will be replaced by init()
        let device_id = generate_device_id();

        let mut builder = reqwest::Client::builder();

        if let Some(ref url) = proxy_url {
            if let Ok(proxy) = reqwest::Proxy::all(url) {
                builder = builder.proxy(proxy);
                tracing::info!("Auth using proxy");
            }
        }

        Self {
            client: builder.build().expect("Failed to build HTTP client"),
            client_info,
            device_id,
            client_version: String::new(),
            proxy_url,
        }
    }

    /// Initialize by fetching the landing page, which both sets the `unique_id` cookie
    /// (our device id) and embeds the current client build id in its HTML.
    /// This MUST be called before authenticate() for proper integrity check handling.
    pub async fn init(&mut self) -> Result<()> {
        let response = self
            .client
            .get(self.client_info.client_url)
            .header("User-Agent", self.client_info.user_agent)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| {
                if self.proxy_url.is_some() && (e.is_connect() || e.is_timeout()) {
                    return anyhow!(
                        "Proxy connection failed during auth init. Check settings. Details: {}",
                        e
                    );
                }
                anyhow!("Failed to fetch Twitch page for unique_id: {}", e)
            })?;

        let mut found_device_id = false;
        for (name, value) in response.headers().iter() {
            if name.as_str().eq_ignore_ascii_case("set-cookie") {
                if let Ok(cookie_str) = value.to_str() {
                    if let Some(stripped) = cookie_str.strip_prefix("unique_id=") {
                        let end = stripped.find(';').unwrap_or(stripped.len());
                        self.device_id = stripped[..end].to_string();
                        tracing::info!("Got unique_id from Twitch: {}", self.device_id);
                        found_device_id = true;
                    }
                }
            }
        }
        if !found_device_id {
            tracing::warn!("Could not get unique_id from Twitch, using generated device_id");
        }

        let body = response.text().await.unwrap_or_default();
        if let Some(version) = extract_client_version(&body) {
            self.client_version = version;
        } else {
            tracing::warn!("Could not find client build id in landing page");
        }

        Ok(())
    }

    /// Perform the Device Code Flow authentication.
    ///
    /// Returns a callback with the user code and verification URI,
    /// then waits for the user to authenticate.
    pub async fn authenticate<F>(&self, on_code: F) -> Result<AuthState>
    where
        F: FnOnce(&str, &str),
    {
        // Step 1: Request device code
        let device_response = self.request_device_code().await?;

        // Step 2: Show code to user
        on_code(
            &device_response.user_code,
            &device_response.verification_uri,
        );

        // Step 3: Poll for token
        let access_token = self
            .poll_for_token(
                &device_response.device_code,
                device_response.interval,
                device_response.expires_in,
            )
            .await?;

        // Step 4: Validate token and get user info
        let validate_response = self.validate_token(&access_token).await?;

        Ok(AuthState {
            access_token,
            user_id: validate_response
                .user_id
                .parse()
                .context("Invalid user_id")?,
            device_id: self.device_id.clone(),
            login: validate_response.login,
            session_id: generate_session_id(),
            client_version: self.client_version.clone(),
        })
    }

    /// Perform the Device Code Flow authentication using async channel.
    ///
    /// Sends the code and URI via the provided channel, then polls for token.
    pub async fn authenticate_async(
        &self,
        tx: tokio::sync::mpsc::Sender<crate::LoginMessage>,
    ) -> Result<AuthState> {
        // Step 1: Request device code
        let device_response = self.request_device_code().await?;

        // Step 2: Send code to UI via channel
        let _ = tx
            .send(crate::LoginMessage::CodeReady {
                code: device_response.user_code.clone(),
                uri: device_response.verification_uri.clone(),
            })
            .await;

        // Step 3: Poll for token
        let access_token = self
            .poll_for_token(
                &device_response.device_code,
                device_response.interval,
                device_response.expires_in,
            )
            .await?;

        // Step 4: Validate token and get user info
        let validate_response = self.validate_token(&access_token).await?;

        Ok(AuthState {
            access_token,
            user_id: validate_response
                .user_id
                .parse()
                .context("Invalid user_id")?,
            device_id: self.device_id.clone(),
            login: validate_response.login,
            session_id: generate_session_id(),
            client_version: self.client_version.clone(),
        })
    }

    /// Request a device code from Twitch.
    async fn request_device_code(&self) -> Result<DeviceCodeResponse> {
        let response = self
            .client
            .post("https://id.twitch.tv/oauth2/device")
            .header("Accept", "application/json")
            .header("Accept-Encoding", "gzip")
            .header("Accept-Language", "en-US")
            .header("Cache-Control", "no-cache")
            .header("Client-Id", self.client_info.client_id)
            .header("Host", "id.twitch.tv")
            .header("Origin", self.client_info.client_url)
            .header("Pragma", "no-cache")
            .header("Referer", self.client_info.client_url)
            .header("User-Agent", self.client_info.user_agent)
            .header("X-Device-Id", &self.device_id)
            .form(&[("client_id", self.client_info.client_id), ("scopes", "")])
            .send()
            .await
            .map_err(|e| {
                if self.proxy_url.is_some() && (e.is_connect() || e.is_timeout()) {
                    return anyhow!("Proxy connection failed requesting device code. Check settings. Details: {}", e);
                }
                anyhow!("Failed to request device code: {}", e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Device code request failed: {} - {}", status, body));
        }

        response
            .json()
            .await
            .context("Failed to parse device code response")
    }

    /// Poll for the access token after user authenticates.
    async fn poll_for_token(
        &self,
        device_code: &str,
        interval: u64,
        expires_in: u64,
    ) -> Result<String> {
        let poll_interval = Duration::from_secs(interval);
        let max_attempts = expires_in / interval;

        for attempt in 0..max_attempts {
            sleep(poll_interval).await;

            let response = self
                .client
                .post("https://id.twitch.tv/oauth2/token")
                .header("Accept", "application/json")
                .header("Accept-Encoding", "gzip")
                .header("Client-Id", self.client_info.client_id)
                .header("User-Agent", self.client_info.user_agent)
                .header("X-Device-Id", &self.device_id)
                .form(&[
                    ("client_id", self.client_info.client_id),
                    ("device_code", device_code),
                    (
                        "grant_type",
                        "urn:ietf:params:oauth:grant-type:device_code",
                    ),
                ])
                .send()
                .await
                .map_err(|e| {
                    if self.proxy_url.is_some() && (e.is_connect() || e.is_timeout()) {
                        return anyhow!("Proxy connection failed polling for token. Check settings. Details: {}", e);
                    }
                    anyhow!("Failed to poll for token: {}", e)
                })?;

            if response.status().is_success() {
                let token_response: TokenResponse = response
                    .json()
                    .await
                    .context("Failed to parse token response")?;
                return Ok(token_response.access_token);
            }

            // 400 means user hasn't authenticated yet, continue polling
            if response.status().as_u16() != 400 {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("Token request failed: {} - {}", status, body));
            }

            tracing::debug!(
                "Waiting for user authentication... (attempt {}/{})",
                attempt + 1,
                max_attempts
            );
        }

        Err(anyhow!("Device code expired before user authenticated"))
    }

    /// Validate an access token and get user info.
    async fn validate_token(&self, access_token: &str) -> Result<ValidateResponse> {
        validate_access_token(&self.client, access_token)
            .await
            .map_err(|e| {
                if self.proxy_url.is_some() {
                    anyhow!("Proxy connection failed validating token. Check settings. Details: {}", e)
                } else {
                    e
                }
            })
    }
}

/// Hit the OAuth validate endpoint directly.
async fn validate_access_token(
    client: &reqwest::Client,
    access_token: &str,
) -> Result<ValidateResponse> {
    let response = client
        .get("https://id.twitch.tv/oauth2/validate")
        .header("Authorization", format!("OAuth {}", access_token))
        .send()
        .await
        .map_err(|e| anyhow!("Failed to validate token: {}", e))?;

    if !response.status().is_success() {
        return Err(anyhow!("Token validation failed: {}", response.status()));
    }

    response
        .json()
        .await
        .context("Failed to parse validate response")
}

/// Extract the build id Twitch embeds as `window.__twilightBuildID` in the landing page, used
/// as the `client_version` header on GraphQL requests.
fn extract_client_version(html: &str) -> Option<String> {
    let re = Regex::new(r#"twilightBuildID["']?\s*[:=]\s*["']([-a-zA-Z0-9]+)["']"#).ok()?;
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

// =============================================================================
// Auth gate (§4.2): the single place every caller goes through to get a validated token and
// request headers.
// =============================================================================

struct GateState {
    auth: Option<AuthState>,
    integrity_valid: bool,
}

/// Mutex-serialized holder of the current [`AuthState`], per §4.2: `validate()` is the only
/// path that refreshes credentials, so concurrent callers (GQL client, websocket pool, watch
/// loop) all observe a single refresh rather than racing each other into repeated logins.
///
/// This gate does not itself run the device-code flow (that needs a UI callback to display the
/// code, handled by [`DeviceAuthenticator`]) — it holds whatever [`AuthState`] login produced,
/// revalidates it against the OAuth endpoint, and clears it on a 401 so the caller can detect
/// "needs re-login" and re-run the flow.
pub struct AuthGate {
    state: Mutex<GateState>,
    client: reqwest::Client,
    client_info: ClientInfo,
}

impl AuthGate {
    pub fn new(client_info: ClientInfo) -> Self {
        Self {
            state: Mutex::new(GateState {
                auth: None,
                integrity_valid: false,
            }),
            client: reqwest::Client::new(),
            client_info,
        }
    }

    /// Install a freshly obtained (or loaded-from-disk) auth state, generating `session_id` if
    /// it's still empty.
    pub async fn set_auth(&self, mut auth: AuthState) {
        auth.ensure_session_id();
        let mut guard = self.state.lock().await;
        guard.auth = Some(auth);
        guard.integrity_valid = false;
    }

    pub async fn current(&self) -> Option<AuthState> {
        self.state.lock().await.auth.clone()
    }

    /// §4.2 `validate()`: ensure the held token is still accepted by Twitch, clearing it and
    /// retrying once on a 401 before giving up. Returns the (possibly refreshed) state, or
    /// `MinerError::Auth` if no credentials are held or the retry also fails.
    pub async fn validate(&self) -> crate::error::Result<AuthState> {
        let mut guard = self.state.lock().await;
        for attempt in 0..2 {
            let Some(auth) = guard.auth.clone() else {
                return Err(crate::error::MinerError::Auth("not logged in".to_string()));
            };

            match validate_access_token(&self.client, &auth.access_token).await {
                Ok(resp) => {
                    if let Ok(user_id) = resp.user_id.parse::<u64>() {
                        if let Some(stored) = guard.auth.as_mut() {
                            stored.user_id = user_id;
                            stored.login = resp.login;
                        }
                    }
                    return Ok(guard.auth.clone().expect("just validated"));
                }
                Err(e) if attempt == 0 => {
                    tracing::warn!("auth validate failed ({e}), clearing cookie and retrying once");
                    guard.auth = None;
                    guard.integrity_valid = false;
                }
                Err(e) => {
                    return Err(crate::error::MinerError::Auth(format!(
                        "token validation failed twice: {e}"
                    )));
                }
            }
        }
        unreachable!("loop always returns within two attempts")
    }

    /// §4.2 `headers(gql, integrity)`: validates first, then returns the standard request
    /// headers. `gql` adds the bearer `Authorization` header; `integrity` adds a
    /// `Client-Integrity` marker once one has been established (via `mark_integrity_valid`).
    pub async fn headers(&self, gql: bool, integrity: bool) -> crate::error::Result<Vec<(&'static str, String)>> {
        let auth = self.validate().await?;
        let mut headers = vec![
            ("Client-Id", self.client_info.client_id.to_string()),
            ("User-Agent", self.client_info.user_agent.to_string()),
            ("X-Device-Id", auth.device_id.clone()),
            ("Client-Session-Id", auth.session_id.clone()),
        ];
        if !auth.client_version.is_empty() {
            headers.push(("Client-Version", auth.client_version.clone()));
        }
        if gql {
            headers.push(("Authorization", format!("OAuth {}", auth.access_token)));
        }
        if integrity {
            let guard = self.state.lock().await;
            if guard.integrity_valid {
                headers.push(("Client-Integrity", "valid".to_string()));
            }
        }
        Ok(headers)
    }

    pub async fn mark_integrity_valid(&self) {
        self.state.lock().await.integrity_valid = true;
    }

    /// §4.2 `invalidate(auth?, integrity?)`: drop the in-memory token and/or integrity marker
    /// so the next `validate()`/`headers()` call triggers a fresh round-trip.
    pub async fn invalidate(&self, auth: bool, integrity: bool) {
        let mut guard = self.state.lock().await;
        if auth {
            guard.auth = None;
        }
        if integrity {
            guard.integrity_valid = false;
        }
    }
}

impl Default for DeviceAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a random device ID (32 hex characters).
fn generate_device_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{:032x}", timestamp)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_generation() {
        let id1 = generate_device_id();
        let id2 = generate_device_id();

        assert_eq!(id1.len(), 32);
        assert!(id1.chars().all(|c| c.is_ascii_hexdigit()));
        // IDs should be different (time-based)
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_auth_state_serialization() {
        let state = AuthState {
            access_token: "test_token".to_string(),
            user_id: 12345678,
            device_id: "abcdef1234567890".to_string(),
            login: "testuser".to_string(),
            session_id: "0123456789abcdef".to_string(),
            client_version: "abc123".to_string(),
        };

        let json = serde_json::to_string(&state).unwrap();
        let parsed: AuthState = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.access_token, "test_token");
        assert_eq!(parsed.user_id, 12345678);
        assert_eq!(parsed.login, "testuser");
        assert_eq!(parsed.session_id, "0123456789abcdef");
    }

    #[test]
    fn test_auth_state_back_compat_missing_session_fields() {
        // auth.json written before session_id/client_version existed.
        let json = r#"{"access_token":"t","user_id":1,"device_id":"d","login":"l"}"#;
        let parsed: AuthState = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.session_id, "");
        assert_eq!(parsed.client_version, "");
    }

    #[test]
    fn test_ensure_session_id_generates_once() {
        let mut state = AuthState {
            access_token: "t".to_string(),
            user_id: 1,
            device_id: "d".to_string(),
            login: "l".to_string(),
            session_id: String::new(),
            client_version: String::new(),
        };
        state.ensure_session_id();
        assert_eq!(state.session_id.len(), 16);
        assert!(state.session_id.chars().all(|c| c.is_ascii_hexdigit()));

        let first = state.session_id.clone();
        state.ensure_session_id();
        assert_eq!(state.session_id, first);
    }

    #[test]
    fn test_extract_client_version() {
        let html = r#"<script>window.__twilightBuildID="abc-123-def";</script>"#;
        assert_eq!(
            extract_client_version(html),
            Some("abc-123-def".to_string())
        );
        assert_eq!(extract_client_version("no version here"), None);
    }

    #[tokio::test]
    async fn test_auth_state_save_load() {
        let state = AuthState {
            access_token: "test_token".to_string(),
            user_id: 12345678,
            device_id: "abcdef1234567890".to_string(),
            login: "testuser".to_string(),
            session_id: "0123456789abcdef".to_string(),
            client_version: "abc123".to_string(),
        };

        let temp_path = std::env::temp_dir().join("test_auth_state.json");

        state.save(&temp_path).await.unwrap();
        let loaded = AuthState::load(&temp_path).await.unwrap();

        assert_eq!(loaded.access_token, state.access_token);
        assert_eq!(loaded.user_id, state.user_id);

        // Cleanup
        let _ = fs::remove_file(&temp_path).await;
    }

    #[tokio::test]
    async fn test_gate_headers_without_integrity() {
        let gate = AuthGate::new(ClientInfo {
            client_id: "cid",
            client_url: "https://example.com",
            user_agent: "ua",
        });
        gate.set_auth(AuthState {
            access_token: "tok".to_string(),
            user_id: 1,
            device_id: "dev".to_string(),
            login: "user".to_string(),
            session_id: "0123456789abcdef".to_string(),
            client_version: "ver".to_string(),
        })
        .await;

        let headers = gate.headers(true, false).await.unwrap();
        let map: std::collections::HashMap<_, _> = headers.into_iter().collect();
        assert_eq!(map.get("Authorization"), Some(&"OAuth tok".to_string()));
        assert_eq!(map.get("Client-Session-Id"), Some(&"0123456789abcdef".to_string()));
        assert!(!map.contains_key("Client-Integrity"));
    }

    #[tokio::test]
    async fn test_gate_headers_requires_auth() {
        let gate = AuthGate::new(ClientInfo {
            client_id: "cid",
            client_url: "https://example.com",
            user_agent: "ua",
        });
        assert!(gate.headers(true, false).await.is_err());
    }

    #[tokio::test]
    async fn test_gate_invalidate_clears_token() {
        let gate = AuthGate::new(ClientInfo {
            client_id: "cid",
            client_url: "https://example.com",
            user_agent: "ua",
        });
        gate.set_auth(AuthState {
            access_token: "tok".to_string(),
            user_id: 1,
            device_id: "dev".to_string(),
            login: "user".to_string(),
            session_id: "0123456789abcdef".to_string(),
            client_version: "ver".to_string(),
        })
        .await;
        gate.invalidate(true, false).await;
        assert!(gate.current().await.is_none());
    }
}
