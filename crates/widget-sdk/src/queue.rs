//! Click queue — batches click events by size or quiet period, persists them
//! across outages and page reloads, and retries failed deliveries with
//! exponential backoff.
//!
//! The queue exclusively owns its in-memory buffer and every timer it
//! schedules. Batches are atomic: the events of a failed batch are retried
//! together, in order, until delivery succeeds or the retry cap drops them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use offerpulse_core::config::QueueConfig;
use offerpulse_core::error::{OfferPulseError, OfferPulseResult};
use offerpulse_core::types::{ClickEvent, ClickRecord, EventBatch, QueueStatus};

use crate::backoff::retry_delay;
use crate::delivery::DeliveryClient;
use crate::network::NetworkMonitor;
use crate::storage::{EventStore, StorageBackend};

#[derive(Default)]
struct QueueState {
    buffer: Vec<ClickEvent>,
    flush_timer: Option<JoinHandle<()>>,
    /// Bumped on every debounce restart. A woken timer task flushes only
    /// if its generation still matches, so a superseded timer can never
    /// drain the buffer.
    flush_generation: u64,
    destroyed: bool,
}

pub struct ClickQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    config: QueueConfig,
    user_agent: String,
    delivery: DeliveryClient,
    store: EventStore,
    network: Arc<NetworkMonitor>,
    state: Mutex<QueueState>,
    subscription: Mutex<Option<u64>>,
}

impl ClickQueue {
    /// Build a queue, restore anything a previous page persisted, and hook
    /// the connectivity monitor. If currently online and events were
    /// restored, an immediate flush attempt is scheduled.
    pub fn new(
        config: QueueConfig,
        user_agent: impl Into<String>,
        delivery: DeliveryClient,
        backend: Arc<dyn StorageBackend>,
        network: Arc<NetworkMonitor>,
    ) -> OfferPulseResult<Self> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(OfferPulseError::Config(
                "click queue requires a running async runtime".into(),
            ));
        }

        let store = EventStore::new(backend, config.storage_key.clone());
        let inner = Arc::new(QueueInner {
            config,
            user_agent: user_agent.into(),
            delivery,
            store,
            network,
            state: Mutex::new(QueueState::default()),
            subscription: Mutex::new(None),
        });

        let persisted = inner.store.load();
        let restored = persisted.len();
        if restored > 0 {
            info!(count = restored, "restored persisted click events");
            inner.state.lock().buffer.extend(persisted);
        }

        // Reconnect triggers a flush of whatever piled up while offline.
        // The listener holds a weak reference so the monitor never keeps a
        // destroyed queue alive.
        let weak = Arc::downgrade(&inner);
        let subscription = inner.network.subscribe(move |online| {
            if !online {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                inner.on_reconnect();
            }
        });
        *inner.subscription.lock() = Some(subscription);

        if restored > 0 && inner.network.is_online() {
            let task = inner.clone();
            tokio::spawn(async move { task.flush_now().await });
        }

        Ok(Self { inner })
    }

    /// Assign an id and append to the buffer. Reaching `max_batch_size`
    /// forces a flush; otherwise the quiet-period timer restarts, so a slow
    /// trickle of clicks flushes `max_batch_delay_ms` after the last one.
    /// Never waits on network I/O.
    pub fn enqueue(&self, record: ClickRecord) {
        let inner = &self.inner;
        let event = ClickEvent {
            id: Uuid::new_v4(),
            session_id: record.session_id,
            question_id: record.question_id,
            offer_id: record.offer_id,
            button_variant_id: record.button_variant_id,
            timestamp: Utc::now(),
            user_agent: inner.user_agent.clone(),
            retry_count: 0,
        };

        let size_flush = {
            let mut state = inner.state.lock();
            if state.destroyed {
                warn!("click event dropped, queue already destroyed");
                return;
            }
            state.buffer.push(event);
            debug!(buffered = state.buffer.len(), "click event enqueued");

            if let Some(timer) = state.flush_timer.take() {
                timer.abort();
            }
            if state.buffer.len() >= inner.config.max_batch_size {
                true
            } else {
                let delay = Duration::from_millis(inner.config.max_batch_delay_ms);
                state.flush_generation = state.flush_generation.wrapping_add(1);
                let generation = state.flush_generation;
                let task = inner.clone();
                state.flush_timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    // Clear our own handle entry before flushing. The abort
                    // in flush_now targets a timer that is still sleeping;
                    // aborting the task that is running the flush would
                    // cancel the dispatch at its first await, after the
                    // buffer was already drained.
                    {
                        let mut state = task.state.lock();
                        if state.flush_generation != generation {
                            // Superseded by a later enqueue.
                            return;
                        }
                        state.flush_timer = None;
                    }
                    task.flush_now().await;
                }));
                false
            }
        };

        if size_flush {
            let task = inner.clone();
            tokio::spawn(async move { task.flush_now().await });
        }
    }

    /// Force dispatch of everything buffered. First-class so UI code can
    /// drain the queue directly (e.g. before navigation) instead of waiting
    /// on a timer.
    pub async fn flush(&self) {
        self.inner.clone().flush_now().await;
    }

    /// Read-only snapshot: buffered count, connectivity, persisted count.
    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            buffered: self.inner.state.lock().buffer.len(),
            online: self.inner.network.is_online(),
            persisted: self.inner.store.count(),
        }
    }

    /// Cancel the pending batch timer, neutralize scheduled retries, detach
    /// from the monitor, and make one best-effort final delivery attempt
    /// (not awaited). Idempotent. Enqueues after this are dropped with a
    /// warning.
    ///
    /// Retry timers are not aborted: each retry task re-checks the
    /// destroyed flag when its sleep ends, so a delivery that is already
    /// in flight runs to completion instead of being cancelled mid-call.
    /// Its batch stays persisted until it succeeds.
    pub fn destroy(&self) {
        let inner = &self.inner;
        let remaining = {
            let mut state = inner.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            if let Some(timer) = state.flush_timer.take() {
                timer.abort();
            }
            std::mem::take(&mut state.buffer)
        };

        if let Some(id) = inner.subscription.lock().take() {
            inner.network.unsubscribe(id);
        }

        if !remaining.is_empty() {
            if inner.network.is_online() {
                // A failure here persists the events for the next mount
                // instead of scheduling a retry timer.
                let task = inner.clone();
                tokio::spawn(async move { task.dispatch(EventBatch::new(remaining)).await });
            } else {
                inner.store.save(&remaining);
            }
        }
        info!("click queue destroyed");
    }
}

impl QueueInner {
    /// Merge persisted events back into the buffer (deduped by id) and
    /// flush. Runs on every offline-to-online edge.
    fn on_reconnect(self: Arc<Self>) {
        let persisted = self.store.load();
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            for event in persisted {
                if !state.buffer.iter().any(|e| e.id == event.id) {
                    state.buffer.push(event);
                }
            }
            if state.buffer.is_empty() {
                return;
            }
        }
        debug!("back online, flushing restored events");
        tokio::spawn(async move { self.flush_now().await });
    }

    /// Atomically drain the buffer and attempt delivery. Offline batches
    /// are persisted without a delivery attempt and without a retry timer;
    /// they stay put until reconnect or the next manual flush.
    async fn flush_now(self: Arc<Self>) {
        let events = {
            let mut state = self.state.lock();
            if let Some(timer) = state.flush_timer.take() {
                timer.abort();
            }
            std::mem::take(&mut state.buffer)
        };
        if events.is_empty() {
            return;
        }

        if !self.network.is_online() {
            debug!(count = events.len(), "offline, persisting batch without dispatch");
            metrics::counter!("widget.queue.persisted_offline").increment(events.len() as u64);
            self.store.save(&events);
            return;
        }

        self.dispatch(EventBatch::new(events)).await;
    }

    async fn dispatch(self: Arc<Self>, batch: EventBatch) {
        match self.send(&batch).await {
            Ok(()) => {
                debug!(
                    batch_id = %batch.batch_id,
                    count = batch.events.len(),
                    "batch delivered"
                );
                metrics::counter!("widget.queue.delivered").increment(batch.events.len() as u64);
                let ids: Vec<Uuid> = batch.events.iter().map(|e| e.id).collect();
                self.store.remove(&ids);
            }
            Err(e) => {
                warn!(batch_id = %batch.batch_id, error = %e, "batch delivery failed");
                self.schedule_retry(batch);
            }
        }
    }

    /// One batched call when the client has the capability, otherwise one
    /// call per event. A partial failure in the per-event path fails the
    /// whole batch so it retries as a unit; the backend dedupes on event id.
    async fn send(&self, batch: &EventBatch) -> OfferPulseResult<()> {
        if let Some(batch_delivery) = self.delivery.batch() {
            return batch_delivery.send_batch(batch).await;
        }

        let mut failure = None;
        for event in &batch.events {
            if let Err(e) = self
                .delivery
                .single()
                .send_single(
                    &event.session_id,
                    &event.question_id,
                    &event.offer_id,
                    &event.button_variant_id,
                )
                .await
            {
                failure = Some(e);
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Bump every event's retry count (the batch retries as a unit), persist
    /// the batch, and schedule the next attempt. Exceeding `max_retries`
    /// drops the batch outright; bounded loss is preferred over unbounded
    /// storage growth.
    fn schedule_retry(self: Arc<Self>, mut batch: EventBatch) {
        for event in &mut batch.events {
            event.retry_count += 1;
        }
        let retry_count = batch.max_retry_count();
        if retry_count > self.config.max_retries {
            warn!(
                batch_id = %batch.batch_id,
                count = batch.events.len(),
                "retries exhausted, dropping batch"
            );
            metrics::counter!("widget.queue.dropped").increment(batch.events.len() as u64);
            let ids: Vec<Uuid> = batch.events.iter().map(|e| e.id).collect();
            self.store.remove(&ids);
            return;
        }

        self.store.save(&batch.events);
        metrics::counter!("widget.queue.retried").increment(1);

        let delay = retry_delay(retry_count, &self.config);
        debug!(
            batch_id = %batch.batch_id,
            retry_count,
            delay_ms = delay.as_millis() as u64,
            "retry scheduled"
        );

        if self.state.lock().destroyed {
            // Already persisted above; the next mount picks it up.
            return;
        }
        let task = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if task.state.lock().destroyed {
                return;
            }
            if !task.network.is_online() {
                debug!(batch_id = %batch.batch_id, "offline at retry, deferring to reconnect");
                return;
            }
            task.dispatch(batch).await;
        });
    }
}
