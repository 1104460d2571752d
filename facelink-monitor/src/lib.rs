//! # facelink-monitor: headless tracking monitor
//!
//! `watch` connects a [`facelink_core::FaceTracker`] to a tracking server
//! and prints the live head pose, eyes and blendshape weights. `simulate`
//! runs a synthetic server that streams the same wire format.

pub mod config;
pub mod simulate;
pub mod watch;
