//! Request transport.
//!
//! A [`Transport`] carries one SQL request to the service and returns the
//! raw CSV body. Credentials are obtained elsewhere and handed over as an
//! opaque [`Session`] token.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{FtError, FtResult};

/// Default service endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://tables.googlelabs.com/api/query";

/// Sends SQL to the service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `sql` and return the response body.
    async fn execute(&self, sql: &str) -> FtResult<String>;
}

/// An authenticated session.
#[derive(Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    /// Session carrying an auth token from the credential provider.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Session without credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Value of the `Authorization` header, if any.
    pub fn authorization(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|t| format!("GoogleLogin auth={}", t))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Whether a statement is sent as GET rather than POST.
pub fn is_read_only(sql: &str) -> bool {
    let head = sql.trim_start();
    ["SELECT", "SHOW", "DESCRIBE"].iter().any(|kw| {
        head.get(..kw.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(kw))
    })
}

/// HTTP transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    session: Session,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, session: Session) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            session,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, sql: &str) -> FtResult<String> {
        let request = if is_read_only(sql) {
            self.client.get(&self.endpoint).query(&[("sql", sql)])
        } else {
            self.client.post(&self.endpoint).form(&[("sql", sql)])
        };
        let request = match self.session.authorization() {
            Some(auth) => request.header(reqwest::header::AUTHORIZATION, auth),
            None => request,
        };

        debug!(endpoint = %self.endpoint, bytes = sql.len(), "sending request");
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "service rejected request");
            return Err(FtError::Service {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
