//! Periodic driver: clocks, timers and the simulation that ties the
//! generator, store and sync channel together.

mod clock;
mod network;
mod scheduler;
mod simulation;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use network::NetworkMonitor;
pub use scheduler::{Scheduler, TimerId};
pub use simulation::{DriverId, DriverSpec, Simulation, TickReport};
