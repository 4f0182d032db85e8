//! Bayeux session state
//!
//! Everything the protocol negotiates at runtime lives here, guarded by
//! a single lock: the session id, the current credentials, the CometD
//! endpoint, the handshake flag, and the HTTP client carrying the
//! session cookies. The connect loop is the only writer; the POST
//! helper reads.

use crate::auth::Credentials;
use crate::error::{Error, Result};
use reqwest::cookie::Jar;
use reqwest::Client;
use std::sync::Arc;

/// Negotiated Bayeux session state
#[derive(Debug)]
pub(crate) struct Session {
    /// Session id assigned by the handshake
    pub client_id: String,

    /// Current bearer credentials, replaced wholesale on renewal
    pub credentials: Option<Credentials>,

    /// CometD endpoint, `<instance_url>/cometd/<api_version>`
    pub endpoint: String,

    /// Set whenever the session must be renegotiated: at start, on
    /// 401/403, and on `reconnect: "handshake"` advice
    pub needs_handshake: bool,

    /// HTTP client bound to the session cookie jar. CometD session
    /// affinity is cookie-based, so the client is rebuilt with a fresh
    /// jar on every handshake.
    pub http: Client,
}

impl Session {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client_id: String::new(),
            credentials: None,
            endpoint: String::new(),
            needs_handshake: true,
            http: cookie_client()?,
        })
    }

    /// Store freshly minted credentials and recompute the endpoint
    pub fn set_credentials(&mut self, creds: Credentials, api_version: &str) {
        self.endpoint = format!("{}/cometd/{}", creds.instance_url, api_version);
        self.credentials = Some(creds);
    }

    /// Drop credentials after a failed renewal so the next attempt
    /// starts from authentication rather than reusing a stale token
    pub fn clear_credentials(&mut self) {
        self.credentials = None;
    }

    /// Discard session cookies ahead of a new handshake
    pub fn reset_cookies(&mut self) -> Result<()> {
        self.http = cookie_client()?;
        Ok(())
    }

    /// The current bearer token, if authenticated
    pub fn bearer_token(&self) -> Result<String> {
        self.credentials
            .as_ref()
            .map(|c| c.access_token.clone())
            .ok_or_else(|| Error::auth("no credentials available"))
    }
}

/// Long-polls are held open by the server for tens of seconds, so the
/// client is built without a request timeout.
fn cookie_client() -> Result<Client> {
    Client::builder()
        .cookie_provider(Arc::new(Jar::default()))
        .build()
        .map_err(Error::Http)
}
