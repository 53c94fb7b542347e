//! Analytics beacons — fire-and-forget load/dwell signals, decoupled from
//! the click queue. Beacon failures are logged and never surfaced; analytics
//! must not block or break the survey flow.

use std::sync::Arc;

use async_trait::async_trait;
use offerpulse_core::config::BeaconConfig;
use offerpulse_core::error::{OfferPulseError, OfferPulseResult};
use offerpulse_core::types::{BeaconEvent, BeaconPayload};
use tracing::{debug, warn};

/// One-way analytics transport supplied by the host environment.
#[async_trait]
pub trait BeaconTransport: Send + Sync {
    /// Fire-and-forget primitive that stays usable during page unload.
    /// Returns `false` when the primitive is unavailable or rejects the
    /// payload, in which case the caller falls back to [`BeaconTransport::post`].
    fn send_beacon(&self, payload: &[u8]) -> bool;

    /// Standard asynchronous POST fallback.
    async fn post(&self, payload: &[u8]) -> OfferPulseResult<()>;
}

/// Sends load/dwell payloads over the cheapest available transport.
pub struct BeaconSender {
    transport: Arc<dyn BeaconTransport>,
    config: BeaconConfig,
    survey_id: String,
}

impl BeaconSender {
    pub fn new(
        transport: Arc<dyn BeaconTransport>,
        config: BeaconConfig,
        survey_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            config,
            survey_id: survey_id.into(),
        }
    }

    /// Send one analytics event. Prefers the beacon primitive while the
    /// payload is under the host ceiling; otherwise spawns an async POST.
    /// Never blocks the caller and never returns an error.
    pub fn send(&self, event: BeaconEvent, dwell_time_ms: Option<u64>) {
        let payload = BeaconPayload {
            survey_id: self.survey_id.clone(),
            event,
            dwell_time_ms,
        };
        let bytes = match serde_json::to_vec(&payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to serialize beacon payload");
                return;
            }
        };

        if bytes.len() <= self.config.max_beacon_bytes && self.transport.send_beacon(&bytes) {
            debug!(event = ?event, "analytics beacon sent");
            metrics::counter!("widget.beacon.sent").increment(1);
            return;
        }

        let transport = self.transport.clone();
        tokio::spawn(async move {
            match transport.post(&bytes).await {
                Ok(()) => {
                    metrics::counter!("widget.beacon.sent").increment(1);
                }
                Err(e) => {
                    metrics::counter!("widget.beacon.failed").increment(1);
                    warn!(error = %e, "analytics post failed");
                }
            }
        });
    }
}

/// HTTP beacon transport. This host has no unload-safe primitive, so every
/// event goes over the async POST path.
pub struct HttpBeaconTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpBeaconTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl BeaconTransport for HttpBeaconTransport {
    fn send_beacon(&self, _payload: &[u8]) -> bool {
        false
    }

    async fn post(&self, payload: &[u8]) -> OfferPulseResult<()> {
        let response = self
            .http
            .post(format!("{}/track/beacon", self.endpoint))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| OfferPulseError::Beacon(e.to_string()))?;
        if !response.status().is_success() {
            return Err(OfferPulseError::Beacon(format!(
                "beacon endpoint returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that records calls; the primitive accepts payloads only
    /// when `beacon_available` is set.
    struct RecordingTransport {
        beacon_available: bool,
        beacon_calls: Mutex<Vec<Vec<u8>>>,
        post_calls: AtomicUsize,
    }

    impl RecordingTransport {
        fn new(beacon_available: bool) -> Arc<Self> {
            Arc::new(Self {
                beacon_available,
                beacon_calls: Mutex::new(Vec::new()),
                post_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl BeaconTransport for RecordingTransport {
        fn send_beacon(&self, payload: &[u8]) -> bool {
            if !self.beacon_available {
                return false;
            }
            self.beacon_calls.lock().push(payload.to_vec());
            true
        }

        async fn post(&self, _payload: &[u8]) -> OfferPulseResult<()> {
            self.post_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_prefers_beacon_primitive() {
        let transport = RecordingTransport::new(true);
        let sender = BeaconSender::new(
            transport.clone(),
            BeaconConfig::default(),
            "survey-1",
        );

        sender.send(BeaconEvent::Loaded, None);

        let calls = transport.beacon_calls.lock();
        assert_eq!(calls.len(), 1);
        let payload: BeaconPayload = serde_json::from_slice(&calls[0]).unwrap();
        assert_eq!(payload.survey_id, "survey-1");
        assert_eq!(payload.event, BeaconEvent::Loaded);
        assert_eq!(transport.post_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_post_when_primitive_unavailable() {
        let transport = RecordingTransport::new(false);
        let sender = BeaconSender::new(
            transport.clone(),
            BeaconConfig::default(),
            "survey-1",
        );

        sender.send(BeaconEvent::Dwell, Some(1234));
        // Let the spawned POST run.
        tokio::task::yield_now().await;

        assert!(transport.beacon_calls.lock().is_empty());
        assert_eq!(transport.post_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_payload_skips_primitive() {
        let transport = RecordingTransport::new(true);
        let sender = BeaconSender::new(
            transport.clone(),
            BeaconConfig { max_beacon_bytes: 8 },
            "survey-with-a-long-identifier",
        );

        sender.send(BeaconEvent::Loaded, None);
        tokio::task::yield_now().await;

        assert!(transport.beacon_calls.lock().is_empty());
        assert_eq!(transport.post_calls.load(Ordering::SeqCst), 1);
    }
}
