//! Delivery client — the network-facing contract the queue ships click
//! events through, with batch delivery as an explicit optional capability
//! decided at construction time.

use std::sync::Arc;

use async_trait::async_trait;
use offerpulse_core::error::{OfferPulseError, OfferPulseResult};
use offerpulse_core::types::EventBatch;
use serde_json::json;
use tracing::debug;

/// Per-event delivery. Always available.
#[async_trait]
pub trait SingleDelivery: Send + Sync {
    async fn send_single(
        &self,
        session_id: &str,
        question_id: &str,
        offer_id: &str,
        button_variant_id: &str,
    ) -> OfferPulseResult<()>;
}

/// Whole-batch delivery. An error signals total batch failure; the queue
/// persists the batch and retries it as a unit.
#[async_trait]
pub trait BatchDelivery: Send + Sync {
    async fn send_batch(&self, batch: &EventBatch) -> OfferPulseResult<()>;
}

/// Capability bundle handed to the queue. When `batch` is absent the queue
/// falls back to one `send_single` call per event.
#[derive(Clone)]
pub struct DeliveryClient {
    single: Arc<dyn SingleDelivery>,
    batch: Option<Arc<dyn BatchDelivery>>,
}

impl DeliveryClient {
    pub fn new(single: Arc<dyn SingleDelivery>, batch: Option<Arc<dyn BatchDelivery>>) -> Self {
        Self { single, batch }
    }

    pub fn single(&self) -> &Arc<dyn SingleDelivery> {
        &self.single
    }

    pub fn batch(&self) -> Option<&Arc<dyn BatchDelivery>> {
        self.batch.as_ref()
    }

    pub fn supports_batch(&self) -> bool {
        self.batch.is_some()
    }
}

/// HTTP implementation against the tracking backend's click endpoints.
pub struct HttpDeliveryClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpDeliveryClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Package as a [`DeliveryClient`] with the batch capability enabled.
    pub fn into_client(self) -> DeliveryClient {
        let inner = Arc::new(self);
        DeliveryClient::new(inner.clone(), Some(inner))
    }

    fn check_status(response: &reqwest::Response, what: &str) -> OfferPulseResult<()> {
        if !response.status().is_success() {
            return Err(OfferPulseError::Delivery(format!(
                "{what} endpoint returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SingleDelivery for HttpDeliveryClient {
    async fn send_single(
        &self,
        session_id: &str,
        question_id: &str,
        offer_id: &str,
        button_variant_id: &str,
    ) -> OfferPulseResult<()> {
        let response = self
            .http
            .post(format!("{}/track/click", self.endpoint))
            .json(&json!({
                "sessionId": session_id,
                "questionId": question_id,
                "offerId": offer_id,
                "buttonVariantId": button_variant_id,
            }))
            .send()
            .await
            .map_err(|e| OfferPulseError::Delivery(e.to_string()))?;
        Self::check_status(&response, "click")?;
        debug!(session_id, offer_id, "single click delivered");
        Ok(())
    }
}

#[async_trait]
impl BatchDelivery for HttpDeliveryClient {
    async fn send_batch(&self, batch: &EventBatch) -> OfferPulseResult<()> {
        let response = self
            .http
            .post(format!("{}/track/clicks/batch", self.endpoint))
            .json(batch)
            .send()
            .await
            .map_err(|e| OfferPulseError::Delivery(e.to_string()))?;
        Self::check_status(&response, "batch")?;
        debug!(batch_id = %batch.batch_id, count = batch.events.len(), "batch delivered");
        Ok(())
    }
}
