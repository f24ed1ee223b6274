//! Shared testing utilities for the Mammoscan workspace.

pub mod fake;
pub mod stub;

pub use fake::{Call, FakeApi};
pub use stub::{AnalyzeBehaviour, ReceivedUpload, StubBackend, StubOptions};
