//! Warden Testkit - Deterministic Test Doubles
//!
//! Scripted HTTP transport, recording notifier and session observer,
//! in-memory key-value storage and record fixtures. Everything here is
//! synchronous behind `std::sync::Mutex` and safe to share across tasks.

#![forbid(unsafe_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

pub mod fixtures;
pub mod notifier;
pub mod storage;
pub mod transport;

pub use fixtures::{
    client_with, numbered_page, policies, policy, ranged_page, test_client, test_config, Policy,
};
pub use notifier::{MockNotifier, RecordingObserver};
pub use storage::MemoryStorage;
pub use transport::MockTransport;
