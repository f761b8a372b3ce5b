//! Firebase Cloud Messaging (FCM) HTTP v1 provider.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Notification, PushError, PushProvider, Result};

const DEFAULT_API_BASE: &str = "https://fcm.googleapis.com";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;
/// Cached access tokens are replaced this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// FCM configuration.
#[derive(Debug, Clone)]
pub struct FcmConfig {
    /// Project ID.
    pub project_id: String,
    /// How requests are authorized.
    pub auth: FcmAuth,
    /// Scheme and host of the FCM API; overridable for emulators.
    pub api_base: String,
    /// Timeout for each HTTP request.
    pub request_timeout: Duration,
}

/// Authorization source for FCM requests.
#[derive(Debug, Clone)]
pub enum FcmAuth {
    /// Service-account key exchanged for short-lived OAuth tokens.
    ServiceAccount(FcmCredentials),
    /// Fixed bearer token.
    Static(String),
}

/// FCM service account credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct FcmCredentials {
    /// Client email.
    pub client_email: String,
    /// Private key (PEM format).
    pub private_key: String,
    /// Token URI.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl FcmConfig {
    /// Create config from a service account JSON file.
    pub fn from_service_account(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PushError::Config(format!(
                "Service account file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_service_account_json(&content)
    }

    /// Create config from service account JSON string.
    pub fn from_service_account_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct ServiceAccount {
            project_id: String,
            #[serde(flatten)]
            credentials: FcmCredentials,
        }

        let sa: ServiceAccount =
            serde_json::from_str(json).map_err(|e| PushError::Config(e.to_string()))?;

        Ok(Self::new(sa.project_id, FcmAuth::ServiceAccount(sa.credentials)))
    }

    /// Create with a fixed bearer token.
    pub fn with_static_token(project_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(project_id, FcmAuth::Static(token.into()))
    }

    fn new(project_id: impl Into<String>, auth: FcmAuth) -> Self {
        Self {
            project_id: project_id.into(),
            auth,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Point requests at a different API host.
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request HTTP timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// FCM provider.
pub struct FcmProvider {
    config: FcmConfig,
    client: Client,
    signer: Option<Signer>,
    access_token: Mutex<Option<AccessToken>>,
}

/// Service-account identity with its parsed RS256 key.
struct Signer {
    client_email: String,
    token_uri: String,
    key: EncodingKey,
}

struct AccessToken {
    token: String,
    expires_at: Instant,
}

impl FcmProvider {
    /// Create a new FCM provider.
    ///
    /// The service-account key is parsed here so a bad key fails at startup.
    /// No network traffic happens; OAuth tokens are fetched on first send.
    pub fn new(config: FcmConfig) -> Result<Self> {
        let signer = match &config.auth {
            FcmAuth::Static(_) => None,
            FcmAuth::ServiceAccount(credentials) => Some(Signer {
                client_email: credentials.client_email.clone(),
                token_uri: credentials.token_uri.clone(),
                key: EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
                    .map_err(|e| PushError::Config(format!("Invalid private key: {}", e)))?,
            }),
        };

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PushError::Config(e.to_string()))?;

        Ok(Self {
            config,
            client,
            signer,
            access_token: Mutex::new(None),
        })
    }

    /// Get or refresh the access token.
    ///
    /// The cache lock is held across the exchange, so concurrent sends wait
    /// for one refresh instead of each starting their own.
    async fn get_access_token(&self) -> Result<String> {
        let signer = match (&self.config.auth, &self.signer) {
            (FcmAuth::Static(token), _) => return Ok(token.clone()),
            (FcmAuth::ServiceAccount(_), Some(signer)) => signer,
            (FcmAuth::ServiceAccount(_), None) => {
                return Err(PushError::Config("Service account key not loaded".into()));
            }
        };

        let mut cached = self.access_token.lock().await;
        if let Some(t) = cached.as_ref()
            && t.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN
        {
            return Ok(t.token.clone());
        }

        let fresh = self.exchange_jwt(signer).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Exchange a signed JWT for a fresh access token.
    async fn exchange_jwt(&self, signer: &Signer) -> Result<AccessToken> {
        let now = chrono::Utc::now().timestamp();

        #[derive(Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: i64,
            exp: i64,
        }

        let claims = Claims {
            iss: &signer.client_email,
            scope: MESSAGING_SCOPE,
            aud: &signer.token_uri,
            iat: now,
            exp: now + 3600,
        };

        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &signer.key)
            .map_err(|e| PushError::Config(format!("JWT encoding failed: {}", e)))?;

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let response = self
            .client
            .post(&signer.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Auth(format!("token exchange failed ({}): {}", status, body)));
        }

        let response: TokenResponse = response.json().await?;

        debug!(expires_in = response.expires_in, "Refreshed FCM access token");

        Ok(AccessToken {
            token: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        })
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.config.api_base, self.config.project_id
        )
    }
}

/// Build the FCM v1 message for one token.
fn build_payload<'a>(token: &'a str, notification: &'a Notification) -> FcmMessage<'a> {
    FcmMessage {
        token,
        notification: FcmNotification {
            title: &notification.title,
            body: &notification.body,
            image: notification.image.as_deref(),
        },
        data: (!notification.data.is_empty()).then_some(&notification.data),
        android: FcmAndroidConfig {
            priority: notification.priority.as_str(),
            ttl: notification.ttl.map(|t| format!("{}s", t)),
            collapse_key: notification.collapse_key.as_deref(),
        },
    }
}

/// Map an FCM error response onto a [`PushError`].
///
/// The FCM-specific `errorCode` in `error.details` wins over the HTTP status.
fn classify_error(status: StatusCode, retry_after: Option<u64>, body: &str) -> PushError {
    let parsed: Option<FcmErrorBody> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let code = parsed.as_ref().and_then(|b| {
        b.error
            .details
            .iter()
            .find_map(|d| d.error_code.clone())
    });
    let retry_after = retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS);

    match code.as_deref() {
        Some("UNREGISTERED") => return PushError::Unregistered(message),
        Some("INVALID_ARGUMENT") => return PushError::InvalidArgument(message),
        Some("QUOTA_EXCEEDED") => return PushError::RateLimited(retry_after),
        Some("THIRD_PARTY_AUTH_ERROR") | Some("SENDER_ID_MISMATCH") => {
            return PushError::Auth(message);
        }
        _ => {}
    }

    match status {
        StatusCode::NOT_FOUND => PushError::Unregistered(message),
        StatusCode::BAD_REQUEST => PushError::InvalidArgument(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PushError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => PushError::RateLimited(retry_after),
        _ => PushError::Provider(format!("FCM error {}: {}", status, message)),
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, token: &str, notification: &Notification) -> Result<String> {
        let access_token = self.get_access_token().await?;
        let payload = build_payload(token, notification);

        debug!(token = %pushcast_log::redact(token), "Sending FCM notification");

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&FcmRequest { message: payload })
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let sent: FcmSendResponse = response.json().await?;
            debug!(message_id = %sent.name, "FCM notification sent successfully");
            Ok(sent.name)
        } else {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let body = response.text().await.unwrap_or_default();
            Err(classify_error(status, retry_after, &body))
        }
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}

// FCM API types

#[derive(Serialize)]
struct FcmRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a HashMap<String, String>>,
    android: FcmAndroidConfig<'a>,
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

#[derive(Serialize)]
struct FcmAndroidConfig<'a> {
    priority: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collapse_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct FcmSendResponse {
    name: String,
}

#[derive(Deserialize)]
struct FcmErrorBody {
    error: FcmErrorStatus,
}

#[derive(Deserialize)]
struct FcmErrorStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Deserialize)]
struct FcmErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}
