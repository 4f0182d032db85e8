//! Bayeux protocol engine
//!
//! Client for the CometD 3.1 subset used by the Salesforce Streaming
//! API: handshake, subscribe, and a long-polling connect loop with
//! replay-aware resubscription.
//! See: <https://docs.cometd.org/current3/reference/>
//!
//! Two tasks run per client: the connect loop owns all network I/O and
//! session state transitions, the worker loop owns dispatch. They only
//! communicate over channels; meta-channel elements never cross that
//! boundary and are handled synchronously inside the connect loop, so a
//! handshake demand is always observed before the next poll goes out.

mod backoff;
mod session;
mod types;

pub use types::{
    Advice, ChangeDataCapturePayload, ChangeEventHeader, CommonResponse, ConnectResponse,
    EventData, EventDescriptor, HandshakeResponse, PushTopicSObject, Subscription,
    SubscriptionResponse, RECONNECT_HANDSHAKE, REPLAY_ALL, REPLAY_NEW,
};

use crate::auth::Authenticator;
use crate::error::{Error, Result};
use async_trait::async_trait;
use backoff::Backoff;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use session::Session;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, warn};

const HANDSHAKE_CHANNEL: &str = "/meta/handshake";
const SUBSCRIBE_CHANNEL: &str = "/meta/subscribe";
const CONNECT_CHANNEL: &str = "/meta/connect";

/// Consumer-supplied sink for stream messages and asynchronous errors.
///
/// Implementations must not block the worker loop indefinitely: there
/// is a single worker loop per client, so a slow consumer stalls all
/// stream processing.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    /// Handle a non-meta connect response element
    async fn dispatch_event(&self, msg: ConnectResponse);

    /// Handle an error raised by the protocol loops
    async fn dispatch_error(&self, error: Error);
}

/// Bayeux client for Salesforce Streaming API consumption
pub struct BayeuxClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    auth: Arc<dyn Authenticator>,
    dispatcher: Arc<dyn EventDispatcher>,
    api_version: String,
    session: RwLock<Session>,

    // Latest replay id seen per subscribed channel. Atomics rather than
    // the session lock: this is the only state touched by both loops,
    // and routing it through the lock would serialize dispatch behind
    // long-poll I/O.
    replay_cursors: HashMap<String, Arc<AtomicI64>>,
}

impl BayeuxClient {
    /// Create a client for the given API version and subscriptions.
    ///
    /// Replay cursors are seeded from the configured replay ids and
    /// advance as events are dispatched, so a renegotiated session
    /// resumes from the last dispatched event rather than the
    /// configured starting position.
    pub fn new(
        api_version: impl Into<String>,
        subscriptions: &[Subscription],
        auth: Arc<dyn Authenticator>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Result<Self> {
        let replay_cursors = subscriptions
            .iter()
            .map(|s| (s.channel.clone(), Arc::new(AtomicI64::new(s.replay_id))))
            .collect();

        Ok(Self {
            inner: Arc::new(ClientInner {
                auth,
                dispatcher,
                api_version: api_version.into(),
                session: RwLock::new(Session::new()?),
                replay_cursors,
            }),
        })
    }

    /// Current replay cursor for a channel, if it is subscribed
    pub fn replay_cursor(&self, channel: &str) -> Option<i64> {
        self.inner
            .replay_cursors
            .get(channel)
            .map(|c| c.load(Ordering::Acquire))
    }

    /// Run the client until `shutdown` flips to `true`.
    ///
    /// Blocks for the lifetime of the stream. Protocol and transport
    /// errors are reported through the dispatcher and retried with
    /// backoff; only shutdown ends the run, with `Ok(())`.
    pub async fn start(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        // Capacity 1 keeps the connect loop from outrunning dispatch.
        let (msg_tx, mut msg_rx) = mpsc::channel::<ConnectResponse>(1);
        let (err_tx, mut err_rx) = mpsc::channel::<Error>(1);

        let connect_loop = tokio::spawn(Arc::clone(&self.inner).connect_loop(
            shutdown,
            msg_tx,
            err_tx,
        ));

        // Worker loop: runs until the connect loop drops both senders.
        let mut msg_open = true;
        let mut err_open = true;
        while msg_open || err_open {
            tokio::select! {
                msg = msg_rx.recv(), if msg_open => match msg {
                    Some(msg) => {
                        let channel = msg.common.channel.clone();
                        let replay_id = msg.data.event.replay_id;

                        self.inner.dispatcher.dispatch_event(msg).await;

                        // Advance the cursor only after dispatch: a
                        // crash in between re-requests the event on
                        // reconnect (at-least-once delivery).
                        if let Some(cursor) = self.inner.replay_cursors.get(&channel) {
                            cursor.fetch_max(replay_id, Ordering::AcqRel);
                        }
                    }
                    None => msg_open = false,
                },
                err = err_rx.recv(), if err_open => match err {
                    Some(error) => self.inner.dispatcher.dispatch_error(error).await,
                    None => err_open = false,
                },
            }
        }

        let _ = connect_loop.await;
        Ok(())
    }
}

impl ClientInner {
    /// Network I/O loop: renegotiate the session when flagged, then
    /// long-poll, routing data elements to the worker loop and handling
    /// meta elements in place before the next poll.
    async fn connect_loop(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
        msg_tx: mpsc::Sender<ConnectResponse>,
        err_tx: mpsc::Sender<Error>,
    ) {
        let mut backoff = Backoff::new();

        loop {
            if *shutdown.borrow() {
                return;
            }

            if self.session.read().await.needs_handshake {
                // Negotiation POSTs carry no timeout, so shutdown must
                // be able to preempt them just like the long poll.
                let negotiated = tokio::select! {
                    res = self.init() => res,
                    _ = shutdown.changed() => return,
                };

                if let Err(error) = negotiated {
                    if err_tx.send(error).await.is_err() {
                        return;
                    }
                    // Back off to avoid locking the Salesforce account.
                    if !backoff_sleep(&mut backoff, &mut shutdown).await {
                        return;
                    }
                    continue;
                }

                self.session.write().await.needs_handshake = false;
            }

            let responses = tokio::select! {
                res = self.connect() => res,
                _ = shutdown.changed() => return,
            };

            let responses = match responses {
                Ok(responses) => responses,
                Err(error) => {
                    // A rejected token invalidates the session;
                    // renegotiate instead of re-polling with the same
                    // credentials.
                    if error.is_auth_failure() {
                        self.session.write().await.needs_handshake = true;
                    }
                    if err_tx.send(error).await.is_err() {
                        return;
                    }
                    if !backoff_sleep(&mut backoff, &mut shutdown).await {
                        return;
                    }
                    continue;
                }
            };

            for cr in responses {
                // Meta elements are processed here, synchronously, so a
                // handshake demand is seen before the next connect.
                if cr.is_meta() {
                    self.manage_meta(&cr).await;
                    continue;
                }

                if msg_tx.send(cr).await.is_err() {
                    return;
                }
            }
        }
    }

    /// Session (re)negotiation: authenticate, handshake, resubscribe.
    async fn init(&self) -> Result<()> {
        self.authenticate().await?;
        self.handshake().await?;

        for (channel, cursor) in &self.replay_cursors {
            let replay_id = cursor.load(Ordering::Acquire);
            let entries = self.subscribe(channel, replay_id).await?;
            for entry in entries {
                if !entry.common.successful {
                    return Err(Error::subscribe(channel, entry.common.error));
                }
            }
        }

        Ok(())
    }

    async fn authenticate(&self) -> Result<()> {
        let result = self.auth.create_or_renew_credentials().await;

        let mut session = self.session.write().await;
        match result {
            Ok(creds) => {
                session.set_credentials(creds, &self.api_version);
                Ok(())
            }
            Err(error) => {
                // A failed renewal must not leave a stale token behind:
                // the next attempt starts from authentication.
                session.clear_credentials();
                Err(error)
            }
        }
    }

    /// Establish a new session. Only called when one is needed: at
    /// start, and after auth failures or handshake advice.
    async fn handshake(&self) -> Result<()> {
        // CometD session affinity is cookie-based; start clean.
        self.session.write().await.reset_cookies()?;

        let payload = json!({
            "channel": HANDSHAKE_CHANNEL,
            "supportedConnectionTypes": ["long-polling"],
            "version": "1.0",
        });

        let responses: Vec<HandshakeResponse> = self
            .post(&payload, "handshake")
            .await
            .map_err(wrap_decode_as_handshake)?;

        let first = responses
            .first()
            .ok_or_else(|| Error::handshake("empty handshake response"))?;

        if !first.common.successful {
            return Err(Error::handshake(first.common.error.clone()));
        }

        self.session.write().await.client_id = first.common.client_id.clone();
        Ok(())
    }

    async fn subscribe(&self, channel: &str, replay_id: i64) -> Result<Vec<SubscriptionResponse>> {
        let client_id = self.session.read().await.client_id.clone();

        let payload = json!({
            "channel": SUBSCRIBE_CHANNEL,
            "subscription": channel,
            "clientId": client_id,
            "ext": { "replay": { channel: replay_id } },
        });

        let responses: Vec<SubscriptionResponse> = self.post(&payload, "subscription").await?;
        if responses.is_empty() {
            return Err(Error::protocol("empty subscription response"));
        }

        Ok(responses)
    }

    /// Long-poll for events. Blocks until the server responds, which
    /// can take tens of seconds.
    async fn connect(&self) -> Result<Vec<ConnectResponse>> {
        let client_id = self.session.read().await.client_id.clone();

        let payload = json!({
            "channel": CONNECT_CHANNEL,
            "connectionType": "long-polling",
            "clientId": client_id,
        });

        let responses: Vec<ConnectResponse> = self.post(&payload, "connect").await?;
        if responses.is_empty() {
            return Err(Error::protocol("empty connect response"));
        }

        Ok(responses)
    }

    async fn manage_meta(&self, cr: &ConnectResponse) {
        if cr.common.successful {
            debug!(
                channel = %cr.common.channel,
                client = %cr.common.client_id,
                "meta channel ok"
            );
            return;
        }

        warn!(
            channel = %cr.common.channel,
            client = %cr.common.client_id,
            error = %cr.common.error,
            "meta channel response was not successful"
        );

        if cr.advice.reconnect == RECONNECT_HANDSHAKE {
            debug!("marking handshake needed as advised by channel response");
            self.session.write().await.needs_handshake = true;
        }
    }

    /// Shared POST discipline for all three protocol calls: bearer
    /// token and JSON content type on every request, non-2xx statuses
    /// propagate with the response body attached.
    async fn post<T: DeserializeOwned>(&self, payload: &Value, what: &str) -> Result<T> {
        let (endpoint, token, http) = {
            let session = self.session.read().await;
            (
                session.endpoint.clone(),
                session.bearer_token()?,
                session.http.clone(),
            )
        };

        let response = http
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Other(format!("error sending {what} request: {e}")))?;

        let status = response.status().as_u16();
        if status >= 300 {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status, body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::protocol(format!("could not decode {what} response: {e}")))
    }
}

/// Handshake decode failures carry the handshake error class rather
/// than the generic protocol one.
fn wrap_decode_as_handshake(error: Error) -> Error {
    match error {
        Error::Protocol { message } => Error::handshake(message),
        other => other,
    }
}

/// Sleep out a backoff delay. Returns `false` if shutdown fired first.
async fn backoff_sleep(backoff: &mut Backoff, shutdown: &mut watch::Receiver<bool>) -> bool {
    let delay = backoff.next_delay();
    debug!(?delay, "backing off before next attempt");

    tokio::select! {
        () = tokio::time::sleep(delay) => true,
        _ = shutdown.changed() => false,
    }
}
