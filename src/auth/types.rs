//! Credential types
//!
//! Shape of the Salesforce OAuth token response. Credentials are
//! immutable once issued and replaced wholesale on renewal.

use serde::Deserialize;

/// Credentials returned by the Salesforce OAuth token endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    /// Bearer token for API calls
    pub access_token: String,

    /// Token type, normally "Bearer"
    #[serde(default)]
    pub token_type: String,

    /// Refresh token, not issued for the JWT-bearer grant
    #[serde(default)]
    pub refresh_token: String,

    /// Base URL of the Salesforce instance the session is bound to
    pub instance_url: String,

    /// Identity URL of the authenticated user
    #[serde(default)]
    pub id: String,

    /// Base64-encoded HMAC of the id and issued-at values
    #[serde(default)]
    pub signature: String,

    /// Scopes granted to the token
    #[serde(default)]
    pub scope: String,

    /// OpenID Connect id token, when requested
    #[serde(default)]
    pub id_token: String,

    /// Community URL, for Experience Cloud users
    #[serde(default)]
    pub sfdc_community_url: String,

    /// Community id, for Experience Cloud users
    #[serde(default)]
    pub sfdc_community_id: String,
}
