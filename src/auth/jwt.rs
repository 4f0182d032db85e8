//! JWT-bearer authenticator
//!
//! Implements the OAuth2 JWT-bearer grant (RFC 7523) against the
//! Salesforce token endpoint. The assertion is signed with RS256 and
//! exchanged for an access token; refresh is not supported by this
//! grant, so renewal always mints a fresh set of credentials.

use super::types::Credentials;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;

/// Grant type for the OAuth JWT-bearer flow.
/// See: <https://tools.ietf.org/html/rfc7523#page-10>
const GRANT_JWT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const OAUTH_TOKEN_PATH: &str = "/services/oauth2/token";

/// The assertion must expire in 3 minutes or less.
/// See: <https://help.salesforce.com/articleView?id=remoteaccess_oauth_jwt_flow.htm>
const ASSERTION_LIFETIME_SECS: i64 = 180;

/// Produces bearer credentials for the streaming client
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Mint a brand new set of credentials
    async fn new_credentials(&self) -> Result<Credentials>;

    /// Renew existing credentials without a full re-issue
    async fn refresh_credentials(&self) -> Result<Credentials>;

    /// Best effort: refresh when possible, otherwise mint new credentials
    async fn create_or_renew_credentials(&self) -> Result<Credentials>;
}

/// JWT OAuth authenticator for Salesforce
pub struct JwtAuthenticator {
    auth_url: String,
    issuer: String,
    subject: String,
    audience: String,
    sign_key: EncodingKey,
    http_client: Client,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    exp: i64,
}

impl JwtAuthenticator {
    /// Create a JWT authenticator.
    ///
    /// `cert_key` is the RSA private key in PEM format; a malformed key
    /// is an error here, not at credential time. `server` is the
    /// authorization server, e.g. `https://login.salesforce.com`.
    pub fn new(
        cert_key: &str,
        client_id: impl Into<String>,
        user: impl Into<String>,
        server: &str,
        http_client: Client,
    ) -> Result<Self> {
        let audience = server.trim_end_matches('/').to_string();

        let sign_key = EncodingKey::from_rsa_pem(cert_key.as_bytes())
            .map_err(|e| Error::jwt(format!("unable to parse PEM private key: {e}")))?;

        Ok(Self {
            auth_url: format!("{audience}{OAUTH_TOKEN_PATH}"),
            issuer: client_id.into(),
            subject: user.into(),
            audience,
            sign_key,
            http_client,
        })
    }

    fn signed_assertion(&self) -> Result<String> {
        let claims = Claims {
            iss: &self.issuer,
            sub: &self.subject,
            aud: &self.audience,
            exp: Utc::now().timestamp() + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.sign_key)
            .map_err(|e| Error::jwt(format!("could not sign JWT token: {e}")))
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn new_credentials(&self) -> Result<Credentials> {
        let assertion = self.signed_assertion()?;

        let form = [("grant_type", GRANT_JWT), ("assertion", &assertion)];

        let response = self
            .http_client
            .post(&self.auth_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::auth(format!("could not execute authentication request: {e}")))?;

        let status = response.status().as_u16();
        if status >= 300 {
            let mut message = format!("received unexpected status code {status} from authentication");
            if let Ok(body) = response.text().await {
                if !body.is_empty() {
                    message.push_str(": ");
                    message.push_str(&body);
                }
            }
            return Err(Error::auth(message));
        }

        let creds: Credentials = response.json().await.map_err(|e| {
            Error::auth(format!(
                "could not decode authentication response into credentials: {e}"
            ))
        })?;

        Ok(creds)
    }

    async fn refresh_credentials(&self) -> Result<Credentials> {
        // The JWT-bearer grant never issues refresh tokens.
        Err(Error::auth("refresh not supported for JWT-bearer grant"))
    }

    async fn create_or_renew_credentials(&self) -> Result<Credentials> {
        self.new_credentials().await
    }
}

/// Authenticator that always returns a preset set of credentials.
/// Useful for tests and for environments where a token is provisioned
/// out of band.
pub struct FixedAuthenticator {
    creds: Credentials,
}

impl FixedAuthenticator {
    /// Wrap a fixed set of credentials
    pub fn new(creds: Credentials) -> Self {
        Self { creds }
    }
}

#[async_trait]
impl Authenticator for FixedAuthenticator {
    async fn new_credentials(&self) -> Result<Credentials> {
        Ok(self.creds.clone())
    }

    async fn refresh_credentials(&self) -> Result<Credentials> {
        Ok(self.creds.clone())
    }

    async fn create_or_renew_credentials(&self) -> Result<Credentials> {
        Ok(self.creds.clone())
    }
}
