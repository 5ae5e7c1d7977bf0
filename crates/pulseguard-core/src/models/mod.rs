//! Domain models for the PulseGuard ward simulation.

mod care;
mod discharge;
mod network;
mod patient;
mod seed;
mod vitals;

pub use care::*;
pub use discharge::*;
pub use network::*;
pub use patient::*;
pub use seed::*;
pub use vitals::*;
