//! Common traits and helpers used across the headerecho library
//!
//! This module contains the traits that sit between the echo server,
//! the probe runner and the transports the probe sends requests over.

pub mod test_utils;
pub mod traits;

pub use test_utils::spawn_test_server;
pub use traits::{EchoServerTrait, ProbeTransport};
