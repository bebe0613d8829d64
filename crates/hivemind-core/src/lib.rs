//! # hivemind-core
//!
//! Shared vocabulary for the Hivemind bridge client crates:
//!
//! - **Correlation IDs**: [`RequestId`] ties an outbound command to its response
//! - **Logging**: [`logging::init_subscriber`] and, behind `test-utils`, in-memory log capture for tests

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;

pub use ids::RequestId;
