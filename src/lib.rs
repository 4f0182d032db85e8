// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

//! # Streamforce
//!
//! A Salesforce Streaming API client: Bayeux/CometD long polling with
//! JWT-bearer authentication and replay-aware resubscription.
//!
//! ## Features
//!
//! - **Bayeux/CometD protocol**: handshake, subscribe, long-polling
//!   connect against the Salesforce Streaming API
//! - **JWT-bearer auth**: OAuth2 `jwt-bearer` grant with automatic
//!   credential renewal on session loss
//! - **Durable replay**: per-channel replay cursors advance only after
//!   dispatch, so a reconnect resumes without event loss
//! - **Self-healing**: meta-channel advice, 401/403, and transport
//!   failures all renegotiate the session with exponential backoff
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use streamforce::auth::JwtAuthenticator;
//! use streamforce::bayeux::{BayeuxClient, Subscription};
//!
//! #[tokio::main]
//! async fn main() -> streamforce::Result<()> {
//!     let auth = JwtAuthenticator::new(
//!         &std::fs::read_to_string("key.pem")?,
//!         "<consumer key>",
//!         "streams@example.com",
//!         "https://login.salesforce.com",
//!         reqwest::Client::new(),
//!     )?;
//!
//!     let subscriptions = [Subscription::new("/topic/AccountUpdates")];
//!     let client = BayeuxClient::new(
//!         "60.0",
//!         &subscriptions,
//!         Arc::new(auth),
//!         Arc::new(my_dispatcher),
//!     )?;
//!
//!     let (_stop, shutdown) = tokio::sync::watch::channel(false);
//!     client.start(shutdown).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        StreamAdapter                        │
//! │     config → JwtAuthenticator + BayeuxClient + EventRelay   │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌───────────────┬─────────────┴────────────────┬──────────────┐
//! │     Auth      │        Bayeux engine         │   Dispatch   │
//! ├───────────────┼──────────────────────────────┼──────────────┤
//! │ JWT assertion │ handshake → subscribe →      │ EventRelay   │
//! │ token grant   │ long-poll connect loop       │ StreamEvent  │
//! │ renewal       │ replay cursors, backoff      │ subject name │
//! └───────────────┴──────────────────────────────┴──────────────┘
//! ```

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// JWT-bearer authentication
pub mod auth;

/// Bayeux/CometD protocol engine
pub mod bayeux;

/// Adapter wiring and event relay
pub mod adapter;

/// Adapter configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

pub use adapter::{StreamAdapter, StreamEvent};
pub use auth::{Authenticator, Credentials, JwtAuthenticator};
pub use bayeux::{BayeuxClient, ConnectResponse, EventDispatcher, Subscription};
pub use config::AdapterConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
