//! Cross-view synchronization.

mod channel;
mod projection;

pub use channel::{Subscription, SyncChannel, SyncMessage, DEFAULT_CHANNEL_NAME};
pub use projection::PatientProjection;
