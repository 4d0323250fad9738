//! dutyrec core - duty recording replay engine
//!
//! Decodes duty recordings and drives a host client's playback of them:
//! chapter and time seeks, burst quick-loading, and side-channel records
//! that travel outside the normal capture stream.
//!
//! # Architecture
//!
//! - [`replay::binary`] - Fixed-layout file codec
//! - [`replay::ReplaySession`] - The resident replay
//! - [`replay::QuickLoadController`] - Burst seeking state machine
//! - [`replay::SideChannelBuffer`] - Side-channel buffering and replay
//! - [`replay::ReplayService`] - Host callback surface
//! - [`config`] - Persisted settings

pub mod config;
pub mod replay;
#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use replay::{Replay, ReplayService};
