//! In-process publish/subscribe channel shared by dashboard views.
//!
//! Delivery is synchronous and at-most-once: `publish` invokes every
//! matching handler before returning, in subscription order per message.
//! A closed channel drops all subscribers and ignores further publishes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::{MedicationStatus, PatientId, Vitals};

/// Default channel name used by the dashboards.
pub const DEFAULT_CHANNEL_NAME: &str = "pulseguard-sync";

/// A message carried on the sync channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncMessage {
    #[serde(rename_all = "camelCase")]
    VitalsUpdate { patient_id: PatientId, vitals: Vitals },
    #[serde(rename_all = "camelCase")]
    MedicationUpdate {
        patient_id: PatientId,
        medication_id: String,
        status: MedicationStatus,
    },
}

impl SyncMessage {
    pub fn patient_id(&self) -> &str {
        match self {
            SyncMessage::VitalsUpdate { patient_id, .. } => patient_id,
            SyncMessage::MedicationUpdate { patient_id, .. } => patient_id,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

type Handler = Arc<dyn Fn(&SyncMessage) + Send + Sync>;

struct Subscriber {
    /// `None` receives every patient
    filter: Option<PatientId>,
    handler: Handler,
}

struct ChannelInner {
    name: String,
    connected: AtomicBool,
    next_id: AtomicU64,
    // Keyed by a monotonically increasing id so delivery follows
    // subscription order.
    subscribers: Mutex<BTreeMap<u64, Subscriber>>,
}

impl ChannelInner {
    fn subscribers(&self) -> MutexGuard<'_, BTreeMap<u64, Subscriber>> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Handle to a named sync channel. Clones share the same channel.
#[derive(Clone)]
pub struct SyncChannel {
    inner: Arc<ChannelInner>,
}

impl SyncChannel {
    pub fn open(name: impl Into<String>) -> Self {
        let name = name.into();
        debug!("Opening sync channel {}", name);
        Self {
            inner: Arc::new(ChannelInner {
                name,
                connected: AtomicBool::new(true),
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// True from creation until [`SyncChannel::close`].
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }

    /// Deliver a message to every matching subscriber.
    ///
    /// Returns the number of handlers invoked; zero on a closed channel.
    pub fn publish(&self, message: &SyncMessage) -> usize {
        if !self.is_connected() {
            return 0;
        }

        // Handlers run outside the lock so they may publish or unsubscribe.
        let handlers: Vec<Handler> = self
            .inner
            .subscribers()
            .values()
            .filter(|s| match &s.filter {
                Some(id) => id == message.patient_id(),
                None => true,
            })
            .map(|s| Arc::clone(&s.handler))
            .collect();

        let mut delivered = 0;
        for handler in &handlers {
            // A handler may have closed the channel.
            if !self.is_connected() {
                break;
            }
            handler(message);
            delivered += 1;
        }
        delivered
    }

    pub fn publish_vitals(&self, patient_id: &str, vitals: Vitals) -> usize {
        self.publish(&SyncMessage::VitalsUpdate {
            patient_id: patient_id.to_string(),
            vitals,
        })
    }

    pub fn publish_medication(
        &self,
        patient_id: &str,
        medication_id: &str,
        status: MedicationStatus,
    ) -> usize {
        self.publish(&SyncMessage::MedicationUpdate {
            patient_id: patient_id.to_string(),
            medication_id: medication_id.to_string(),
            status,
        })
    }

    /// Receive messages for one patient.
    pub fn subscribe<F>(&self, patient_id: &str, handler: F) -> Subscription
    where
        F: Fn(&SyncMessage) + Send + Sync + 'static,
    {
        self.register(Some(patient_id.to_string()), Arc::new(handler))
    }

    /// Receive messages for every patient.
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SyncMessage) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    fn register(&self, filter: Option<PatientId>, handler: Handler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        if self.is_connected() {
            self.inner
                .subscribers()
                .insert(id, Subscriber { filter, handler });
        }
        Subscription {
            id,
            channel: Arc::downgrade(&self.inner),
        }
    }

    /// Tear the channel down for every handle. Idempotent.
    pub fn close(&self) {
        if self.inner.connected.swap(false, Ordering::SeqCst) {
            self.inner.subscribers().clear();
            debug!("Closed sync channel {}", self.inner.name);
        }
    }
}

impl Default for SyncChannel {
    fn default() -> Self {
        Self::open(DEFAULT_CHANNEL_NAME)
    }
}

impl std::fmt::Debug for SyncChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncChannel")
            .field("name", &self.inner.name)
            .field("connected", &self.is_connected())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Registration guard. The handler is released on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    channel: Weak<ChannelInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {
        drop(self);
    }

    fn release(&self) {
        if let Some(inner) = self.channel.upgrade() {
            inner.subscribers().remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> (Arc<Mutex<Vec<SyncMessage>>>, impl Fn(&SyncMessage) + Send + Sync) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        (received, move |m: &SyncMessage| {
            sink.lock().unwrap().push(m.clone())
        })
    }

    #[test]
    fn test_filter_by_patient() {
        let channel = SyncChannel::default();
        let (received, handler) = collector();
        let _sub = channel.subscribe("p1", handler);

        let vitals = Vitals::admission_default();
        assert_eq!(channel.publish_vitals("p1", vitals), 1);
        assert_eq!(channel.publish_vitals("p2", vitals), 0);

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].patient_id(), "p1");
    }

    #[test]
    fn test_drop_unsubscribes() {
        let channel = SyncChannel::open("test");
        let (received, handler) = collector();
        let sub = channel.subscribe("p1", handler);
        assert_eq!(channel.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(channel.subscriber_count(), 0);
        assert_eq!(channel.publish_vitals("p1", Vitals::default()), 0);
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_closed_channel_is_noop() {
        let channel = SyncChannel::open("test");
        let other_view = channel.clone();
        let (received, handler) = collector();
        let _sub = channel.subscribe_all(handler);

        other_view.close();
        assert!(!channel.is_connected());
        assert_eq!(channel.publish_vitals("p1", Vitals::default()), 0);

        let (_late, late_handler) = collector();
        let _late_sub = channel.subscribe("p1", late_handler);
        assert_eq!(channel.subscriber_count(), 0);
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_handler_may_publish() {
        let channel = SyncChannel::open("test");
        let relay = channel.clone();
        let _relay_sub = channel.subscribe("p1", move |m| {
            if let SyncMessage::VitalsUpdate { vitals, .. } = m {
                relay.publish_vitals("p2", *vitals);
            }
        });
        let (received, handler) = collector();
        let _sub = channel.subscribe("p2", handler);

        channel.publish_vitals("p1", Vitals::default());
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_close_inside_handler_stops_delivery() {
        let channel = SyncChannel::open("test");
        let closer = channel.clone();
        let _closing_sub = channel.subscribe("p1", move |_| closer.close());
        let (received, handler) = collector();
        let _sub = channel.subscribe("p1", handler);

        assert_eq!(channel.publish_vitals("p1", Vitals::default()), 1);
        assert!(!channel.is_connected());
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_message_json_layout() {
        let message = SyncMessage::MedicationUpdate {
            patient_id: "p1".into(),
            medication_id: "m1".into(),
            status: MedicationStatus::Taken,
        };
        let json = message.to_json().unwrap();
        assert!(json.contains("\"type\":\"MEDICATION_UPDATE\""));
        assert!(json.contains("\"patientId\":\"p1\""));
        assert!(json.contains("\"status\":\"taken\""));
        assert_eq!(SyncMessage::from_json(&json).unwrap(), message);
    }
}
