//! OAuth 2.0 PKCE flow for Google APIs.
//!
//! Authorization Code flow with PKCE (RFC 7636) and a loopback redirect,
//! the way Google recommends for installed applications.
//!
//! # Flow Overview
//!
//! 1. Generate a random code verifier and its SHA-256 challenge
//! 2. Bind a local HTTP listener on the first free port of a range
//! 3. Open the user's browser on Google's consent page
//! 4. Google redirects to `/callback` with a code and the `state`
//! 5. Exchange the code (with the verifier) for access and refresh tokens

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;

use super::config::{GoogleConfig, OAuthCredentials};
use super::credentials::Authorizer;
use super::tokens::TokenInfo;

/// Google OAuth endpoints.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long to wait for the browser to hit the callback.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth client for Google APIs.
///
/// Runs the interactive PKCE flow and refreshes expired access tokens.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    port_range: (u16, u16),
    token_url: String,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            credentials,
            http_client,
            port_range: GoogleConfig::DEFAULT_LOOPBACK_PORTS,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        })
    }

    /// Creates an OAuth client from a provider configuration.
    pub fn from_config(config: &GoogleConfig) -> ProviderResult<Self> {
        Ok(Self::new(config.credentials.clone(), config.timeout)?
            .with_port_range(config.loopback_port_range.0, config.loopback_port_range.1))
    }

    /// Sets the loopback port range.
    pub fn with_port_range(mut self, start: u16, end: u16) -> Self {
        self.port_range = (start, end);
        self
    }

    /// Overrides the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Runs the interactive PKCE flow and returns the obtained tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if no port is free in the range, if the user denies
    /// access, if the callback never arrives, or if the code exchange fails.
    pub async fn authorize(&self, scopes: &[String]) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback_server(self.port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);

        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth flow, opening browser...");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let (code, received_state) = Self::wait_for_callback(listener)?;

        if received_state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, refusing the authorization code",
            ));
        }

        info!("received authorization code, exchanging for tokens...");

        self.exchange_code(&code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Refreshes an expired access token.
    ///
    /// The returned token keeps the old refresh token unless the server
    /// issued a new one.
    pub async fn refresh(&self, token: &TokenInfo) -> ProviderResult<TokenInfo> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::authentication("no refresh token available"))?;

        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_request(&params, "token refresh").await?;

        let mut refreshed = token.clone();
        refreshed.update_access_token(response.access_token, response.expires_in);
        if let Some(new_refresh) = response.refresh_token.filter(|t| !t.is_empty()) {
            refreshed.refresh_token = Some(new_refresh);
        }
        if let Some(scope) = response.scope {
            refreshed.scopes = scope.split_whitespace().map(str::to_string).collect();
        }

        info!("refreshed access token");
        Ok(refreshed)
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.post_token_request(&params, "token exchange").await?;

        let granted = match response.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => scopes.to_vec(),
        };

        info!("obtained tokens");
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            granted,
        ))
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("{} request failed", what)).with_source(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network("failed to read token response").with_source(e))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })
    }

    /// Binds a listener on the first free port in the range.
    fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
        for port in port_range.0..=port_range.1 {
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
                debug!("bound loopback server on port {}", port);
                return Ok((listener, port));
            }
        }
        Err(ProviderError::configuration(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    /// Waits for the OAuth callback and returns `(code, state)`.
    fn wait_for_callback(listener: TcpListener) -> ProviderResult<(String, String)> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(result) = handle_callback(stream) {
                            let _ = tx.send(result);
                            return;
                        }
                    }
                    Err(e) => error!("failed to accept connection: {}", e),
                }
            }
        });

        match rx.recv_timeout(CALLBACK_TIMEOUT) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(ProviderError::authentication("OAuth callback timeout"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ProviderError::internal("callback channel disconnected"))
            }
        }
    }
}

impl Authorizer for OAuthClient {
    fn authorize<'a>(&'a self, scopes: &'a [String]) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(OAuthClient::authorize(self, scopes))
    }

    fn refresh<'a>(&'a self, token: &'a TokenInfo) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(OAuthClient::refresh(self, token))
    }
}

/// Handles one request on the callback listener.
///
/// Returns `None` for requests that are not the callback (favicon probes
/// and the like) so the listener keeps waiting.
fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<(String, String)>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let target = parse_request_target(&request_line)?;
    let result = parse_callback_query(target);

    let response = if result.is_ok() {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
        <html><body><h1>Authorization Successful</h1>\
        <p>You can close this window and return to the terminal.</p></body></html>"
    } else {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
        <html><body><h1>Authorization Failed</h1>\
        <p>You can close this window.</p></body></html>"
    };

    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(result)
}

/// Extracts the path of a `GET /callback...` request line.
fn parse_request_target(request_line: &str) -> Option<&str> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let path = target.split('?').next()?;
    (path == "/callback").then_some(target)
}

/// Pulls `code` and `state` out of the callback target.
fn parse_callback_query(target: &str) -> ProviderResult<(String, String)> {
    let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");

    let mut code = None;
    let mut state = None;
    let mut denied = None;

    for param in query.split('&') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => denied = Some(value),
            _ => {}
        }
    }

    if let Some(reason) = denied {
        return Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            reason
        )));
    }

    match code {
        Some(code) if !code.is_empty() => Ok((code, state.unwrap_or_default())),
        _ => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    }
}

/// PKCE flow state.
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 of the verifier, base64url encoded).
    pub challenge: String,
    /// Random state echoed back by the callback.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the Google OAuth authorization URL.
    ///
    /// Requests offline access so Google hands out a refresh token.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

    fn client(server: &MockServer) -> OAuthClient {
        OAuthClient::new(
            OAuthCredentials::new("test.apps.googleusercontent.com", "secret"),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_token_url(format!("{}/token", server.uri()))
    }

    #[test]
    fn pkce_verifier_length() {
        // 32 bytes base64url without padding
        assert_eq!(PkceFlow::new().verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_matches_rfc_example() {
        // RFC 7636 appendix B
        let challenge = PkceFlow::compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn pkce_state_is_random() {
        assert_ne!(PkceFlow::new().state, PkceFlow::new().state);
    }

    #[test]
    fn auth_url_format() {
        let flow = PkceFlow::new();
        let url = flow.build_auth_url(
            "test-client.apps.googleusercontent.com",
            "http://127.0.0.1:8080/callback",
            &[SCOPE.to_string()],
        );

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("state={}", flow.state)));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn request_target_only_accepts_callback() {
        assert_eq!(
            parse_request_target("GET /callback?code=a HTTP/1.1\r\n"),
            Some("/callback?code=a")
        );
        assert_eq!(parse_request_target("GET /favicon.ico HTTP/1.1\r\n"), None);
        assert_eq!(parse_request_target("POST /callback HTTP/1.1\r\n"), None);
        assert_eq!(parse_request_target(""), None);
    }

    #[test]
    fn callback_query_parsing() {
        let (code, state) = parse_callback_query("/callback?code=4%2Fabc&state=xyz").unwrap();
        assert_eq!(code, "4/abc");
        assert_eq!(state, "xyz");

        let err = parse_callback_query("/callback?error=access_denied&state=xyz").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("access_denied"));

        assert!(parse_callback_query("/callback?state=xyz").is_err());
    }

    #[test]
    fn loopback_server_skips_busy_ports() {
        let (busy, port) = OAuthClient::bind_loopback_server((0, 0)).unwrap();
        let busy_port = busy.local_addr().unwrap().port();
        assert_eq!(port, 0);
        assert!(OAuthClient::bind_loopback_server((busy_port, busy_port)).is_err());
    }

    #[tokio::test]
    async fn refresh_keeps_existing_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=keep-me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut stale = TokenInfo::new("stale", Some("keep-me".into()), Some(0), vec![SCOPE.into()]);
        stale.expires_at = Some(chrono::Utc::now() - chrono::Duration::hours(1));

        let refreshed = client(&server).refresh(&stale).await.unwrap();
        assert_eq!(refreshed.access_token, "fresh");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("keep-me"));
        assert_eq!(refreshed.scopes, vec![SCOPE.to_string()]);
        assert!(!refreshed.is_expired());
    }

    #[tokio::test]
    async fn refresh_takes_rotated_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "refresh_token": "rotated",
                "expires_in": 3600,
                "scope": SCOPE
            })))
            .mount(&server)
            .await;

        let stale = TokenInfo::new("stale", Some("old".into()), Some(0), vec![]);
        let refreshed = client(&server).refresh(&stale).await.unwrap();
        assert_eq!(refreshed.refresh_token.as_deref(), Some("rotated"));
        assert_eq!(refreshed.scopes, vec![SCOPE.to_string()]);
    }

    #[tokio::test]
    async fn refresh_rejection_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error": "invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let stale = TokenInfo::new("stale", Some("revoked".into()), Some(0), vec![]);
        let err = client(&server).refresh(&stale).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails_fast() {
        let server = MockServer::start().await;
        let token = TokenInfo::new("stale", None, Some(0), vec![]);
        let err = client(&server).refresh(&token).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
    }
}
