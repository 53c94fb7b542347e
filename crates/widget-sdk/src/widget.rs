//! Widget integration hook — binds the click queue to the widget's
//! mount/unmount lifecycle and exposes the narrow consumer surface:
//! track, flush, status, plus the one-shot load and dwell beacons.
//!
//! Nothing here ever errors into the caller. Tracking is deliberately
//! decoupled from the survey-answering flow: every failure path ends in a
//! log line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use offerpulse_core::config::SdkConfig;
use offerpulse_core::types::{BeaconEvent, ClickRecord, QueueStatus};

use crate::beacon::{BeaconSender, BeaconTransport};
use crate::delivery::DeliveryClient;
use crate::network::NetworkMonitor;
use crate::queue::ClickQueue;
use crate::storage::StorageBackend;

pub struct SurveyWidget {
    queue: Option<ClickQueue>,
    delivery: DeliveryClient,
    beacon: BeaconSender,
    mounted_at: Instant,
    dwell_sent: AtomicBool,
    unmounted: AtomicBool,
}

impl SurveyWidget {
    /// Mount the widget: build the click queue and fire the one-shot
    /// "loaded" beacon. If the queue cannot be built the widget still
    /// works, degrading to direct per-click delivery.
    pub fn mount(
        config: &SdkConfig,
        survey_id: impl Into<String>,
        delivery: DeliveryClient,
        transport: Arc<dyn BeaconTransport>,
        backend: Arc<dyn StorageBackend>,
        network: Arc<NetworkMonitor>,
    ) -> Self {
        let queue = match ClickQueue::new(
            config.queue.clone(),
            config.user_agent.clone(),
            delivery.clone(),
            backend,
            network,
        ) {
            Ok(queue) => Some(queue),
            Err(e) => {
                warn!(error = %e, "click queue init failed, degrading to direct delivery");
                None
            }
        };

        let beacon = BeaconSender::new(transport, config.beacon.clone(), survey_id);
        beacon.send(BeaconEvent::Loaded, None);
        info!("survey widget mounted");

        Self {
            queue,
            delivery,
            beacon,
            mounted_at: Instant::now(),
            dwell_sent: AtomicBool::new(false),
            unmounted: AtomicBool::new(false),
        }
    }

    /// Record one CTA click. Never blocks the UI interaction and never
    /// surfaces an error.
    pub fn track_click(
        &self,
        session_id: &str,
        question_id: &str,
        offer_id: &str,
        button_variant_id: &str,
    ) {
        if self.unmounted.load(Ordering::SeqCst) {
            warn!("track_click after unmount ignored");
            return;
        }

        let record = ClickRecord {
            session_id: session_id.to_string(),
            question_id: question_id.to_string(),
            offer_id: offer_id.to_string(),
            button_variant_id: button_variant_id.to_string(),
        };

        match &self.queue {
            Some(queue) => queue.enqueue(record),
            None => {
                // Degraded mode: best-effort direct delivery, errors
                // swallowed.
                let single = self.delivery.single().clone();
                tokio::spawn(async move {
                    if let Err(e) = single
                        .send_single(
                            &record.session_id,
                            &record.question_id,
                            &record.offer_id,
                            &record.button_variant_id,
                        )
                        .await
                    {
                        warn!(error = %e, "direct click delivery failed");
                    }
                });
            }
        }
    }

    /// Force dispatch of everything buffered.
    pub async fn flush(&self) {
        if let Some(queue) = &self.queue {
            queue.flush().await;
        }
    }

    /// Queue snapshot, or `None` when running in degraded mode.
    pub fn status(&self) -> Option<QueueStatus> {
        self.queue.as_ref().map(|queue| queue.status())
    }

    /// Send the dwell beacon with elapsed time since mount. At most once
    /// per mount; the unmount path calls this too, so whichever of manual
    /// send or unmount happens first wins.
    pub fn send_dwell_event(&self) {
        if self.dwell_sent.swap(true, Ordering::SeqCst) {
            return;
        }
        let dwell_ms = self.mounted_at.elapsed().as_millis() as u64;
        self.beacon.send(BeaconEvent::Dwell, Some(dwell_ms));
    }

    /// Unmount: fire the dwell beacon if still pending, destroy the queue,
    /// stop accepting clicks. Idempotent.
    pub fn unmount(&self) {
        if self.unmounted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.send_dwell_event();
        if let Some(queue) = &self.queue {
            queue.destroy();
        }
        info!("survey widget unmounted");
    }
}

impl Drop for SurveyWidget {
    fn drop(&mut self) {
        // The unmount path spawns tasks (final flush, beacon POST), which
        // needs a live runtime; outside one, the queue's persisted state
        // already covers the next mount.
        if tokio::runtime::Handle::try_current().is_ok() {
            self.unmount();
        }
    }
}
