pub mod connection;
mod tracking;

pub use connection::ConnectionPhase;
pub use tracking::{TrackingFrame, TrackingState};
