//! GQL client for Twitch API interactions.

use anyhow::{anyhow, Context, Result};
use futures_util::stream::{FuturesUnordered, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::AuthState;
use crate::constants::{gql_operations, ClientInfo, GqlOperation, CLIENT_ANDROID_APP};
use crate::models::{GqlRequest, GqlResponse};
use crate::transport;
use crate::utils::mask_proxy_url;

const GQL_URL: &str = "https://gql.twitch.tv/gql";

/// Twitch's batch GQL endpoint caps how many persisted queries it will execute in one POST
/// before it starts timing the request out under load; requesting campaign details for every
/// subscribed campaign in one shot would blow past that, so fan them out in chunks instead.
const CAMPAIGN_DETAILS_CHUNK_SIZE: usize = 20;

/// A client for making GQL requests to Twitch.
#[derive(Clone)]
pub struct GqlClient {
    client: reqwest::Client,
    client_info: ClientInfo,
    auth: AuthState,
    /// Stored unique_id cookie value
    unique_id: Option<String>,
    /// Cookies initialized flag
    cookies_initialized: bool,
    proxy_url: Option<String>,
}

impl GqlClient {
    /// Create a new GQL client with the given auth state.
    /// Uses Android app client by default to bypass integrity checks.
    pub fn new(auth: AuthState) -> Self {
        Self::with_client_info(auth, CLIENT_ANDROID_APP, None)
    }

    /// Create a new GQL client with the given auth state and proxy.
    pub fn new_with_proxy(auth: AuthState, proxy_url: Option<String>) -> Self {
        Self::with_client_info(auth, CLIENT_ANDROID_APP, proxy_url)
    }

    /// Create a new GQL client with custom client info.
    pub fn with_client_info(
        auth: AuthState,
        client_info: ClientInfo,
        proxy_url: Option<String>,
    ) -> Self {
        if let Some(ref url) = proxy_url {
            tracing::info!("GQL client using proxy: {}", mask_proxy_url(url));
        }

        Self {
            client: transport::build_client(proxy_url.as_deref()),
            client_info,
            auth,
            unique_id: None,
            cookies_initialized: false,
            proxy_url,
        }
    }

    /// Initialize cookies by visiting Twitch (required for integrity checks).
    /// This fetches the unique_id cookie from Twitch and uses it for all subsequent requests.
    pub async fn init_cookies(&mut self) -> Result<()> {
        if self.cookies_initialized {
            return Ok(());
        }

        let response = transport::simple_request_with_retry(
            &self.client,
            Method::GET,
            self.client_info.client_url,
            vec![(USER_AGENT.as_str(), self.client_info.user_agent.to_string())],
        )
        .await
        .map_err(|e| anyhow!("Failed to fetch Twitch page: {}", e))?;

        let mut found_unique_id: Option<String> = None;
        for (name, value) in response.headers().iter() {
            if name.as_str().eq_ignore_ascii_case("set-cookie") {
                if let Ok(cookie_str) = value.to_str() {
                    if let Some(stripped) = cookie_str.strip_prefix("unique_id=") {
                        found_unique_id = Some(match stripped.find(';') {
                            Some(end) => stripped[..end].to_string(),
                            None => stripped.to_string(),
                        });
                        break;
                    }
                }
            }
        }

        self.unique_id = Some(found_unique_id.unwrap_or_else(|| self.auth.device_id.clone()));
        self.cookies_initialized = true;
        Ok(())
    }

    /// Build the Cookie header value for requests
    fn build_cookie_header(&self) -> String {
        let unique_id = self.unique_id.as_ref().unwrap_or(&self.auth.device_id);
        format!(
            "unique_id={}; auth-token={}",
            unique_id, self.auth.access_token
        )
    }

    /// Build the headers required for GQL requests.
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("Accept", HeaderValue::from_static("*/*"));
        headers.insert("Accept-Encoding", HeaderValue::from_static("gzip"));
        headers.insert("Accept-Language", HeaderValue::from_static("en-US"));
        headers.insert("Pragma", HeaderValue::from_static("no-cache"));
        headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));

        headers.insert(
            "Client-Id",
            HeaderValue::from_str(self.client_info.client_id).unwrap(),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(self.client_info.user_agent).unwrap(),
        );
        headers.insert(
            "X-Device-Id",
            HeaderValue::from_str(&self.auth.device_id).unwrap(),
        );
        headers.insert(
            "Client-Session-Id",
            HeaderValue::from_str(&self.auth.device_id[..16]).unwrap(),
        );
        headers.insert(
            "Origin",
            HeaderValue::from_str(self.client_info.client_url).unwrap(),
        );
        headers.insert(
            "Referer",
            HeaderValue::from_str(self.client_info.client_url).unwrap(),
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("OAuth {}", self.auth.access_token)).unwrap(),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Ok(cookie_val) = HeaderValue::from_str(&self.build_cookie_header()) {
            headers.insert("Cookie", cookie_val);
        }

        headers
    }

    /// Execute a GQL query and parse the response.
    ///
    /// On a transport-level service hiccup (connect failure, 5xx) this retries forever on a
    /// jittered backoff rather than surfacing a one-off network blip to the caller — Twitch's
    /// GQL edge is flaky enough in practice that a single failed attempt isn't meaningful.
    ///
    /// A GQL-level "service timeout" error (Twitch occasionally answers 200 with an error body
    /// under load) is a distinct case: it isn't a transport failure `request_with_retry` would
    /// catch, so it's retried here on a flat 1s delay, indefinitely, rather than surfaced to the
    /// caller as a hard failure.
    pub async fn query<T: DeserializeOwned>(
        &self,
        operation: &GqlOperation,
        variables: Option<Value>,
    ) -> Result<T> {
        let request_body = GqlRequest::new(operation, variables);
        loop {
            let response = transport::request_with_retry(
                || {
                    self.client
                        .post(GQL_URL)
                        .headers(self.build_headers())
                        .json(&request_body)
                },
                None,
            )
            .await
            .map_err(|e| anyhow!("Failed to send GQL request: {}", e))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("GQL request failed: {} - {}", status, body));
            }

            let response_text = response.text().await.context("Failed to read response")?;
            let gql_response: GqlResponse<T> =
                serde_json::from_str(&response_text).context("Failed to parse GQL response")?;

            if gql_response.has_errors() {
                let errors = gql_response.errors.unwrap();
                if errors.iter().any(|e| is_service_timeout(&e.message)) {
                    tracing::debug!("GQL service timeout, retrying in 1s");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
                let error_msgs: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
                return Err(anyhow!("GQL errors: {}", error_msgs.join(", ")));
            }

            return gql_response
                .data
                .ok_or_else(|| anyhow!("GQL response missing data"));
        }
    }

    /// Execute a raw GQL query and return the JSON value.
    pub async fn query_raw(
        &self,
        operation: &GqlOperation,
        variables: Option<Value>,
    ) -> Result<Value> {
        self.query(operation, variables).await
    }

    // =========================================================================
    // Convenience methods for common operations
    // =========================================================================

    /// Fetch the user's drops inventory (campaigns already opted in).
    pub async fn fetch_inventory(&self) -> Result<Value> {
        self.query_raw(
            &gql_operations::INVENTORY,
            Some(serde_json::json!({"fetchRewardCampaigns": true})),
        )
        .await
    }

    /// Fetch ALL available campaigns (Viewer Drops Dashboard).
    pub async fn fetch_all_campaigns(&self) -> Result<Value> {
        self.query_raw(
            &gql_operations::CAMPAIGNS,
            Some(serde_json::json!({"fetchRewardCampaigns": false})),
        )
        .await
    }

    /// Get current drop progress for a channel.
    pub async fn get_current_drop(&self, channel_id: &str, _channel_login: &str) -> Result<Value> {
        self.query_raw(
            &gql_operations::CURRENT_DROP,
            Some(serde_json::json!({
                "channelID": channel_id,
                "channelLogin": ""
            })),
        )
        .await
    }

    /// Claim a drop reward.
    pub async fn claim_drop(&self, drop_instance_id: &str) -> Result<Value> {
        self.query_raw(
            &gql_operations::CLAIM_DROP,
            Some(serde_json::json!({
                "input": {
                    "dropInstanceID": drop_instance_id
                }
            })),
        )
        .await
    }

    /// Claim the channel's community points bonus, if one is pending. Errors are swallowed by
    /// the caller (maintenance sweeps treat this as best-effort).
    pub async fn claim_community_points(&self, channel_id: &str, claim_id: &str) -> Result<Value> {
        self.query_raw(
            &gql_operations::CLAIM_COMMUNITY_POINTS,
            Some(serde_json::json!({
                "input": {
                    "channelID": channel_id,
                    "claimID": claim_id
                }
            })),
        )
        .await
    }

    /// Get playback access token for a channel.
    pub async fn get_playback_token(&self, channel_login: &str) -> Result<Value> {
        self.query_raw(
            &gql_operations::PLAYBACK_ACCESS_TOKEN,
            Some(serde_json::json!({
                "isLive": true,
                "isVod": false,
                "login": channel_login,
                "platform": "android",
                "playerType": "channel_home_live",
                "vodID": ""
            })),
        )
        .await
    }

    /// Get a channel's current online status and stream snapshot by login, used to resolve
    /// ACL channels pulled off a campaign's allow-list (§4.8 CHANNELS_FETCH).
    pub async fn get_stream_info(&self, channel_login: &str) -> Result<Value> {
        self.query_raw(
            &gql_operations::GET_STREAM_INFO,
            Some(serde_json::json!({"channel": channel_login})),
        )
        .await
    }

    /// Get live channels for a game.
    pub async fn get_game_directory(&self, game_slug: &str, limit: u32) -> Result<Value> {
        self.query_raw(
            &gql_operations::GAME_DIRECTORY,
            Some(serde_json::json!({
                "limit": limit,
                "slug": game_slug,
                "imageWidth": 50,
                "includeCostreaming": false,
                "options": {
                    "broadcasterLanguages": [],
                    "freeformTags": null,
                    "includeRestricted": ["SUB_ONLY_LIVE"],
                    "recommendationsContext": {"platform": "web"},
                    "sort": "RELEVANCE",
                    "systemFilters": [],
                    "tags": [],
                    "requestID": "JIRA-VXP-2397"
                },
                "sortTypeIsRecency": false
            })),
        )
        .await
    }

    /// Fetch detailed information about a specific campaign (including drops progress).
    pub async fn fetch_campaign_details(
        &self,
        campaign_id: &str,
        channel_login: Option<&str>,
    ) -> Result<Value> {
        let channel_login = channel_login.unwrap_or("");

        self.query_raw(
            &gql_operations::CAMPAIGN_DETAILS,
            Some(serde_json::json!({
                "dropID": campaign_id,
                "channelLogin": channel_login
            })),
        )
        .await
    }

    /// Fetch details for many campaigns at once, chunked to respect
    /// [`CAMPAIGN_DETAILS_CHUNK_SIZE`] and issued concurrently within each chunk.
    ///
    /// Results are folded together as they arrive (not collected and merged afterward) so a
    /// single slow campaign doesn't hold up the rest of the chunk from being merged in. A
    /// failed individual fetch is logged and skipped rather than aborting the whole batch.
    pub async fn fetch_campaign_details_batch(
        &self,
        requests: &[(String, Option<String>)],
    ) -> Result<Value> {
        let mut merged = Value::Object(serde_json::Map::new());

        for chunk in requests.chunks(CAMPAIGN_DETAILS_CHUNK_SIZE) {
            let mut pending = FuturesUnordered::new();
            for (campaign_id, channel_login) in chunk {
                pending.push(self.fetch_campaign_details(campaign_id, channel_login.as_deref()));
            }

            while let Some(result) = pending.next().await {
                match result {
                    Ok(value) => {
                        merged = merge_gql_data(merged, value)
                            .map_err(|e| anyhow!("campaign details merge failed: {}", e))?;
                    }
                    Err(e) => tracing::warn!("campaign details fetch failed: {}", e),
                }
            }
        }

        Ok(merged)
    }

    /// Same fan-out as [`Self::fetch_campaign_details_batch`], but keeps each campaign's result
    /// (success or failure) attributed to its id instead of merging them together — callers
    /// that need to parse each campaign's drops independently want this shape, since the
    /// merged accumulator loses which fragment came from which campaign.
    pub async fn fetch_campaign_details_many(
        &self,
        requests: &[(String, Option<String>)],
    ) -> Vec<(String, Result<Value>)> {
        let mut results = Vec::with_capacity(requests.len());

        for chunk in requests.chunks(CAMPAIGN_DETAILS_CHUNK_SIZE) {
            let mut pending = FuturesUnordered::new();
            for (campaign_id, channel_login) in chunk {
                let campaign_id = campaign_id.clone();
                let channel_login = channel_login.clone();
                pending.push(async move {
                    let result = self
                        .fetch_campaign_details(&campaign_id, channel_login.as_deref())
                        .await;
                    (campaign_id, result)
                });
            }

            while let Some(pair) = pending.next().await {
                results.push(pair);
            }
        }

        results
    }
}

/// Twitch reports a transient backend timeout as a GQL error rather than a transport failure.
fn is_service_timeout(message: &str) -> bool {
    message.eq_ignore_ascii_case("service timeout")
}

/// Recursively merge two GQL response fragments, following the same rule as merging partial
/// results from a chunked fan-out: objects merge key by key, scalars must agree or one side
/// must be null, and any other mismatch (e.g. a list replacing an object) is a hard error
/// rather than a silent overwrite.
fn merge_gql_data(target: Value, source: Value) -> std::result::Result<Value, String> {
    match (target, source) {
        (Value::Object(mut t), Value::Object(s)) => {
            for (key, value) in s {
                let merged = match t.remove(&key) {
                    Some(existing) => merge_gql_data(existing, value)?,
                    None => value,
                };
                t.insert(key, merged);
            }
            Ok(Value::Object(t))
        }
        (Value::Null, other) => Ok(other),
        (other, Value::Null) => Ok(other),
        (t, s) if t == s => Ok(t),
        (t, s) => Err(format!("type mismatch merging GQL fragments: {t:?} vs {s:?}")),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_auth() -> AuthState {
        AuthState {
            access_token: "test_token_12345".to_string(),
            user_id: 12345678,
            device_id: "abcdef1234567890abcdef1234567890".to_string(),
            login: "testuser".to_string(),
            session_id: "0123456789abcdef".to_string(),
            client_version: "test-version".to_string(),
        }
    }

    #[test]
    fn test_headers_contain_required_fields() {
        let client = GqlClient::new(mock_auth());
        let headers = client.build_headers();

        assert!(headers.contains_key("Client-Id"));
        assert!(headers.contains_key(USER_AGENT));
        assert!(headers.contains_key(AUTHORIZATION));
        assert!(headers.contains_key("X-Device-Id"));
        assert!(headers.contains_key("Origin"));
        assert!(headers.contains_key("Referer"));
    }

    #[test]
    fn test_authorization_header_format() {
        let auth = mock_auth();
        let client = GqlClient::new(auth.clone());
        let headers = client.build_headers();

        let auth_header = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert_eq!(auth_header, format!("OAuth {}", auth.access_token));
    }

    #[test]
    fn test_client_id_header() {
        use crate::constants::CLIENT_ANDROID_APP;
        let client = GqlClient::new(mock_auth());
        let headers = client.build_headers();

        let client_id = headers.get("Client-Id").unwrap().to_str().unwrap();
        assert_eq!(client_id, CLIENT_ANDROID_APP.client_id);
    }

    #[test]
    fn test_gql_request_body_structure() {
        let request = GqlRequest::new(
            &gql_operations::INVENTORY,
            Some(serde_json::json!({"fetchRewardCampaigns": false})),
        );
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["operationName"], "Inventory");
        assert!(
            json["extensions"]["persistedQuery"]["sha256Hash"]
                .as_str()
                .unwrap()
                .len()
                == 64
        );
        assert_eq!(json["variables"]["fetchRewardCampaigns"], false);
    }

    #[test]
    fn test_merge_gql_data_combines_distinct_keys() {
        let a = serde_json::json!({"user": {"id": "1"}});
        let b = serde_json::json!({"game": {"id": "2"}});
        let merged = merge_gql_data(a, b).unwrap();
        assert_eq!(merged["user"]["id"], "1");
        assert_eq!(merged["game"]["id"], "2");
    }

    #[test]
    fn test_merge_gql_data_recurses_nested_objects() {
        let a = serde_json::json!({"user": {"dropCampaign": {"id": "c1"}}});
        let b = serde_json::json!({"user": {"self": {"isSubscribed": true}}});
        let merged = merge_gql_data(a, b).unwrap();
        assert_eq!(merged["user"]["dropCampaign"]["id"], "c1");
        assert_eq!(merged["user"]["self"]["isSubscribed"], true);
    }

    #[test]
    fn test_is_service_timeout_matches_case_insensitively() {
        assert!(is_service_timeout("service timeout"));
        assert!(is_service_timeout("Service Timeout"));
        assert!(!is_service_timeout("Not authenticated"));
    }

    #[test]
    fn test_merge_gql_data_rejects_type_mismatch() {
        let a = serde_json::json!({"user": {"id": "1"}});
        let b = serde_json::json!({"user": ["not", "an", "object"]});
        assert!(merge_gql_data(a, b).is_err());
    }
}
