//! Harmony real-time message client
//!
//! A single [`HarmonyClient`] should be shared across all sends: it owns the
//! connection pool and the token cache. Clones are cheap and share both.
//! No shutdown is required.

use futures::FutureExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::auth::{Credentials, PasswordGrant, TokenStore, TOKEN_PATH};
use crate::error::{self, ClientError, SendError, TransportError};
use crate::http_client::{
    endpoint_url, is_rejected, AuthenticatingTransport, HttpResponse, HttpTransport,
};
use crate::models::{ErrorBody, OutboundMessage, SendReceipt, MAX_RECIPIENTS};

pub const DEFAULT_AUTH_BASE_URL: &str = "https://api-public.epsilon.com";
pub const DEFAULT_MESSAGE_BASE_URL: &str = "https://api.harmony.epsilon.com";

/// Header carrying the routing identifier (organization unit)
pub const OUID_HEADER: &str = "X-OUID";

/// Client for sending messages through Epsilon Harmony
#[derive(Clone)]
pub struct HarmonyClient {
    transport: Arc<AuthenticatingTransport>,
    message_base_url: Url,
}

impl HarmonyClient {
    pub fn builder() -> HarmonyClientBuilder {
        HarmonyClientBuilder::default()
    }

    /// Shared token cache
    pub fn tokens(&self) -> &Arc<TokenStore> {
        self.transport.tokens()
    }

    /// Authenticating transport, for calls this client has no method for
    pub fn transport(&self) -> &AuthenticatingTransport {
        &self.transport
    }

    /// Send a message
    ///
    /// `ouid` routes the message to a campaign/organization. Every failure,
    /// local or remote, comes back as a [`SendError`].
    pub async fn send(
        &self,
        ouid: &str,
        message: &OutboundMessage,
    ) -> error::Result<SendReceipt> {
        if message.id.trim().is_empty() {
            return Err(SendError::InvalidMessage(
                "message id must not be empty".to_string(),
            ));
        }

        let recipients = message.recipients.len();
        if recipients == 0 || recipients > MAX_RECIPIENTS {
            tracing::warn!(
                message_id = %message.id,
                recipients,
                "Harmony accepts 1 to {} recipients per send; the request will likely be rejected",
                MAX_RECIPIENTS
            );
        }

        let url = endpoint_url(
            &self.message_base_url,
            &["v3", "messages", &message.id, "send", ""],
        )
        .ok_or_else(|| SendError::InvalidMessage("cannot build send URL".to_string()))?;

        let body = serde_json::to_vec(message)?;

        let request = self
            .transport
            .client()
            .put(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(OUID_HEADER, ouid)
            .body(body)
            .build()
            .map_err(TransportError::from)?;

        tracing::debug!(message_id = %message.id, ouid = %ouid, recipients, "Sending message");

        let response = self.transport.execute(request).await?;
        let outcome = interpret(response);

        match &outcome {
            Ok(receipt) => tracing::info!(
                message_id = %message.id,
                result_code = ?receipt.result_code,
                service_transaction_id = ?receipt.service_transaction_id,
                "Message sent"
            ),
            Err(e) => tracing::error!(message_id = %message.id, "Message send failed: {}", e),
        }

        outcome
    }

    /// Start a send on the current tokio runtime and return immediately
    ///
    /// Outside a runtime nothing is sent and the handle resolves to
    /// [`SendError::NoRuntime`].
    pub fn dispatch(&self, ouid: impl Into<String>, message: OutboundMessage) -> SendHandle {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(message_id = %message.id, "Cannot dispatch send: {}", e);
                return SendHandle {
                    state: HandleState::Failed(Some(SendError::NoRuntime(e.to_string()))),
                };
            }
        };

        let client = self.clone();
        let ouid = ouid.into();
        SendHandle {
            state: HandleState::Running(
                handle.spawn(async move { client.send(&ouid, &message).await }),
            ),
        }
    }
}

/// Map a send response to its outcome
fn interpret(response: HttpResponse) -> error::Result<SendReceipt> {
    let status = response.status;

    if response.is_success() {
        return response
            .json::<SendReceipt>()
            .map_err(|e| SendError::InvalidResponse(e.to_string()));
    }

    let message = response
        .json::<ErrorBody>()
        .ok()
        .and_then(|body| body.first_message().map(str::to_string))
        .unwrap_or_else(|| format!("Request failed with status {}", status));

    if is_rejected(status) {
        Err(SendError::Unauthorized { status, message })
    } else {
        Err(SendError::Remote { status, message })
    }
}

/// Completion handle of a dispatched send
///
/// Resolves exactly once, to the receipt or the failure.
pub struct SendHandle {
    state: HandleState,
}

enum HandleState {
    Running(JoinHandle<error::Result<SendReceipt>>),
    /// Never started; the error is taken by the first poll
    Failed(Option<SendError>),
}

impl Future for SendHandle {
    type Output = error::Result<SendReceipt>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            HandleState::Running(task) => match task.poll_unpin(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(e)) => Poll::Ready(Err(SendError::Cancelled(e.to_string()))),
                Poll::Pending => Poll::Pending,
            },
            HandleState::Failed(err) => Poll::Ready(Err(err.take().unwrap_or_else(|| {
                SendError::Cancelled("send handle polled after completion".to_string())
            }))),
        }
    }
}

/// Builder for [`HarmonyClient`]
///
/// Both base URLs have production defaults; the four credentials are required.
pub struct HarmonyClientBuilder {
    auth_base_url: String,
    message_base_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    username: Option<String>,
    password: Option<String>,
    connect_timeout: Duration,
    request_timeout: Duration,
    max_idle_connections: usize,
}

impl Default for HarmonyClientBuilder {
    fn default() -> Self {
        Self {
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            message_base_url: DEFAULT_MESSAGE_BASE_URL.to_string(),
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            max_idle_connections: 20,
        }
    }
}

impl HarmonyClientBuilder {
    pub fn auth_base_url(mut self, url: impl Into<String>) -> Self {
        self.auth_base_url = url.into();
        self
    }

    pub fn message_base_url(mut self, url: impl Into<String>) -> Self {
        self.message_base_url = url.into();
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn max_idle_connections(mut self, max: usize) -> Self {
        self.max_idle_connections = max;
        self
    }

    /// Validate settings and assemble the client
    ///
    /// Makes no network calls; the first token is fetched on the first rejected send.
    pub fn build(self) -> Result<HarmonyClient, ClientError> {
        let credentials = Credentials {
            client_id: required(self.client_id, "client_id")?,
            client_secret: required(self.client_secret, "client_secret")?,
            username: required(self.username, "username")?,
            password: required(self.password, "password")?,
        };

        let auth_base_url = parse_base_url(&self.auth_base_url, "auth_base_url")?;
        let message_base_url = parse_base_url(&self.message_base_url, "message_base_url")?;
        let token_url =
            endpoint_url(&auth_base_url, &TOKEN_PATH).ok_or_else(|| ClientError::InvalidUrl {
                field: "auth_base_url",
                reason: "cannot carry a path".to_string(),
            })?;

        let http = HttpTransport::new(
            self.max_idle_connections,
            self.connect_timeout,
            self.request_timeout,
        )?;

        let grant = PasswordGrant::new(http.clone(), token_url.clone(), credentials);
        let tokens = Arc::new(TokenStore::new(Arc::new(grant)));
        let transport = AuthenticatingTransport::new(http, tokens, token_url);

        tracing::debug!(
            auth_base_url = %auth_base_url,
            message_base_url = %message_base_url,
            "Harmony client initialized"
        );

        Ok(HarmonyClient {
            transport: Arc::new(transport),
            message_base_url,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ClientError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ClientError::MissingField(field))
}

fn parse_base_url(value: &str, field: &'static str) -> Result<Url, ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::MissingField(field));
    }
    let url = Url::parse(value).map_err(|e| ClientError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl {
            field,
            reason: "cannot carry a path".to_string(),
        });
    }
    Ok(url)
}
