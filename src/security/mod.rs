//! Request admission for the echo endpoint

pub mod policy;

pub use policy::{UserAgentPolicy, Verdict};
