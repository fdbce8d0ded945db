//! Relay subscriber for driver location events.
//!
//! Wraps a `nostr-sdk` client with a single live subscription covering all
//! followed drivers that have a shared key. On roster change the embedder
//! restarts the subscription; the acceptance pipeline is reset alongside so
//! stale cursors never survive a re-subscription.
//!
//! # Security Model
//!
//! - **WSS Only**: Plaintext ws:// connections are rejected
//! - **No Signer**: Events are signed externally; the client never holds
//!   the rider's identity key

use std::time::Duration;

use nostr::{Event, Filter, Kind, PublicKey, RelayUrl, SubscriptionId};
use nostr_sdk::{Client, RelayPoolNotification};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::error::{RelayError, RelayResult};
use super::types::PublishResult;
use crate::nostr::{EncryptedLocationEvent, KIND_DRIVER_LOCATION};

/// Default timeout for relay operations.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer size for the event channel.
const EVENT_CHANNEL_SIZE: usize = 100;

/// Subscriber for encrypted driver location broadcasts.
///
/// Holds one subscription at a time; [`start`](Self::start) replaces any
/// existing subscription, which is the restart path for roster changes.
pub struct LocationSubscriber {
    client: Client,
    subscription: Option<SubscriptionId>,
    forward_task: Option<JoinHandle<()>>,
}

impl LocationSubscriber {
    /// Creates a subscriber connected to the given relays.
    ///
    /// # Errors
    ///
    /// Returns an error if a relay URL is invalid or uses plaintext ws://.
    pub async fn new(relays: &[String]) -> RelayResult<Self> {
        let relay_urls = validate_relay_urls(relays)?;

        let client = Client::default();
        for url in &relay_urls {
            // Ignore errors when adding relays - they may already be added
            let _: Result<bool, _> = client.add_relay(url.as_str()).await;
        }
        client.connect().await;

        Ok(Self {
            client,
            subscription: None,
            forward_task: None,
        })
    }

    /// Starts (or restarts) the location subscription.
    ///
    /// Subscribes to location broadcasts authored by the given drivers -
    /// exactly those with a shared key; events from other drivers could
    /// never be decrypted anyway. Any existing subscription is torn down
    /// first.
    ///
    /// Returns a receiver yielding decryptable event views as they arrive.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription fails.
    pub async fn start(
        &mut self,
        drivers: Vec<PublicKey>,
    ) -> RelayResult<mpsc::Receiver<EncryptedLocationEvent>> {
        self.stop().await;

        let filter = Filter::new()
            .kind(Kind::Custom(KIND_DRIVER_LOCATION))
            .authors(drivers);

        let output = self
            .client
            .subscribe(filter, None)
            .await
            .map_err(|e| RelayError::Subscription(e.to_string()))?;
        let subscription_id = output.val;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);

        let client = self.client.clone();
        let our_subscription = subscription_id.clone();
        let task = tokio::spawn(async move {
            let _ = client
                .handle_notifications(|notification| async {
                    if let RelayPoolNotification::Event {
                        subscription_id,
                        event,
                        ..
                    } = notification
                    {
                        if subscription_id != our_subscription {
                            return Ok(false);
                        }
                        match EncryptedLocationEvent::from_event(&event) {
                            Ok(view) => {
                                if tx.send(view).await.is_err() {
                                    // Receiver dropped, stop handling
                                    return Ok(true);
                                }
                            }
                            Err(e) => {
                                debug!(error = %e, "ignoring non-location event");
                            }
                        }
                    }
                    Ok(false)
                })
                .await;
        });

        info!("location subscription started");
        self.subscription = Some(subscription_id);
        self.forward_task = Some(task);

        Ok(rx)
    }

    /// Tears down the active subscription, if any.
    pub async fn stop(&mut self) {
        if let Some(subscription_id) = self.subscription.take() {
            self.client.unsubscribe(&subscription_id).await;
            info!("location subscription stopped");
        }
        if let Some(task) = self.forward_task.take() {
            task.abort();
        }
    }

    /// Whether a subscription is currently active.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.subscription.is_some()
    }

    /// Publishes a signed event (location broadcast or refresh request).
    ///
    /// # Errors
    ///
    /// Returns an error if the publish times out or no relay accepts the
    /// event.
    pub async fn publish(&self, event: &Event) -> RelayResult<PublishResult> {
        let event_id = event.id;
        let send_result = tokio::time::timeout(DEFAULT_TIMEOUT, self.client.send_event(event))
            .await
            .map_err(|_| RelayError::Timeout("Event publish timed out".to_string()))?
            .map_err(|e| RelayError::Publish(e.to_string()))?;

        let mut accepted_by = Vec::new();
        let mut rejected_by = Vec::new();

        for url in &send_result.success {
            accepted_by.push(url.to_string());
        }
        for (url, error) in &send_result.failed {
            rejected_by.push((url.to_string(), error.clone()));
        }

        let result = PublishResult {
            event_id,
            accepted_by,
            rejected_by,
        };

        if result.is_success() {
            Ok(result)
        } else {
            Err(RelayError::AllRelaysFailed)
        }
    }

    /// Disconnects from all relays.
    pub async fn shutdown(&mut self) {
        self.stop().await;
        self.client.disconnect().await;
    }
}

/// Validates relay URLs and ensures they use wss://.
fn validate_relay_urls(relays: &[String]) -> RelayResult<Vec<RelayUrl>> {
    let mut urls = Vec::with_capacity(relays.len());

    for relay in relays {
        // Reject plaintext ws:// URLs
        if relay.starts_with("ws://") {
            return Err(RelayError::InvalidUrl(format!(
                "Plaintext ws:// not allowed for security: {relay}"
            )));
        }

        let url =
            RelayUrl::parse(relay).map_err(|e| RelayError::InvalidUrl(format!("{relay}: {e}")))?;

        urls.push(url);
    }

    Ok(urls)
}
