//! End-to-end widget lifecycle tests — mount fires the loaded beacon,
//! clicks flow through the queue to the delivery client, the dwell beacon
//! is idempotent, and unmount stops tracking.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use offerpulse_core::config::{QueueConfig, SdkConfig};
use offerpulse_core::error::OfferPulseResult;
use offerpulse_core::types::{BeaconEvent, BeaconPayload, EventBatch};
use offerpulse_widget_sdk::{
    BatchDelivery, BeaconTransport, DeliveryClient, MemoryStorage, NetworkMonitor, SingleDelivery,
    SurveyWidget,
};

#[derive(Default)]
struct RecordingDelivery {
    batches: Mutex<Vec<EventBatch>>,
    singles: AtomicU32,
}

#[async_trait]
impl SingleDelivery for RecordingDelivery {
    async fn send_single(
        &self,
        _session_id: &str,
        _question_id: &str,
        _offer_id: &str,
        _button_variant_id: &str,
    ) -> OfferPulseResult<()> {
        // Suspend once like a real network call before resolving.
        tokio::task::yield_now().await;
        self.singles.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl BatchDelivery for RecordingDelivery {
    async fn send_batch(&self, batch: &EventBatch) -> OfferPulseResult<()> {
        tokio::task::yield_now().await;
        self.batches.lock().push(batch.clone());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingBeacon {
    payloads: Mutex<Vec<BeaconPayload>>,
}

impl RecordingBeacon {
    fn count(&self, event: BeaconEvent) -> usize {
        self.payloads
            .lock()
            .iter()
            .filter(|p| p.event == event)
            .count()
    }
}

#[async_trait]
impl BeaconTransport for RecordingBeacon {
    fn send_beacon(&self, payload: &[u8]) -> bool {
        if let Ok(parsed) = serde_json::from_slice(payload) {
            self.payloads.lock().push(parsed);
        }
        true
    }

    async fn post(&self, _payload: &[u8]) -> OfferPulseResult<()> {
        Ok(())
    }
}

fn test_config(max_batch_size: usize) -> SdkConfig {
    SdkConfig {
        queue: QueueConfig {
            max_batch_size,
            max_batch_delay_ms: 5_000,
            storage_key: "widget_flow_pending".into(),
            ..QueueConfig::default()
        },
        ..SdkConfig::default()
    }
}

fn mount(
    config: &SdkConfig,
    delivery: &Arc<RecordingDelivery>,
    beacon: &Arc<RecordingBeacon>,
) -> SurveyWidget {
    SurveyWidget::mount(
        config,
        "survey-1",
        DeliveryClient::new(delivery.clone(), Some(delivery.clone())),
        beacon.clone(),
        Arc::new(MemoryStorage::new()),
        Arc::new(NetworkMonitor::new(true)),
    )
}

#[tokio::test(start_paused = true)]
async fn test_mount_fires_loaded_beacon() {
    let delivery = Arc::new(RecordingDelivery::default());
    let beacon = Arc::new(RecordingBeacon::default());

    let widget = mount(&test_config(10), &delivery, &beacon);

    assert_eq!(beacon.count(BeaconEvent::Loaded), 1);
    assert_eq!(beacon.count(BeaconEvent::Dwell), 0);
    assert_eq!(beacon.payloads.lock()[0].survey_id, "survey-1");

    widget.unmount();
}

#[tokio::test(start_paused = true)]
async fn test_clicks_flow_through_queue() {
    let delivery = Arc::new(RecordingDelivery::default());
    let beacon = Arc::new(RecordingBeacon::default());

    let widget = mount(&test_config(2), &delivery, &beacon);
    widget.track_click("sess-1", "q-1", "offer-1", "variant-a");
    widget.track_click("sess-1", "q-1", "offer-2", "variant-b");
    tokio::time::sleep(Duration::from_millis(1)).await;

    let batches = delivery.batches.lock();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].events.len(), 2);
    assert_eq!(batches[0].events[0].offer_id, "offer-1");
    assert_eq!(batches[0].events[1].button_variant_id, "variant-b");
    drop(batches);

    let status = widget.status().expect("queue should be initialized");
    assert_eq!(status.buffered, 0);
    assert!(status.online);

    widget.unmount();
}

#[tokio::test(start_paused = true)]
async fn test_dwell_event_is_idempotent() {
    let delivery = Arc::new(RecordingDelivery::default());
    let beacon = Arc::new(RecordingBeacon::default());

    let widget = mount(&test_config(10), &delivery, &beacon);

    // Manual send first, then the unmount path tries again.
    widget.send_dwell_event();
    widget.send_dwell_event();
    widget.unmount();

    assert_eq!(beacon.count(BeaconEvent::Dwell), 1);
    let payloads = beacon.payloads.lock();
    let dwell = payloads
        .iter()
        .find(|p| p.event == BeaconEvent::Dwell)
        .expect("dwell payload");
    assert!(dwell.dwell_time_ms.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_unmount_sends_pending_dwell() {
    let delivery = Arc::new(RecordingDelivery::default());
    let beacon = Arc::new(RecordingBeacon::default());

    let widget = mount(&test_config(10), &delivery, &beacon);
    widget.unmount();
    widget.unmount();

    assert_eq!(beacon.count(BeaconEvent::Dwell), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clicks_after_unmount_are_ignored() {
    let delivery = Arc::new(RecordingDelivery::default());
    let beacon = Arc::new(RecordingBeacon::default());

    let widget = mount(&test_config(1), &delivery, &beacon);
    widget.track_click("sess-1", "q-1", "offer-1", "variant-a");
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(delivery.batches.lock().len(), 1);

    widget.unmount();
    widget.track_click("sess-1", "q-1", "offer-2", "variant-a");
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(delivery.batches.lock().len(), 1);
    assert_eq!(delivery.singles.load(Ordering::SeqCst), 0);
}
