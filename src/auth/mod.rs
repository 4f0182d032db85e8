//! Authentication module
//!
//! Implements the OAuth2 JWT-bearer grant used by the Salesforce
//! Streaming API. The `Authenticator` trait is the boundary the Bayeux
//! client consumes; `JwtAuthenticator` is the production implementation.

mod jwt;
mod types;

pub use jwt::{Authenticator, FixedAuthenticator, JwtAuthenticator};
pub use types::Credentials;

#[cfg(test)]
mod tests;
