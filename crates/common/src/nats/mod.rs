pub mod client;
pub mod consumer;
pub mod publisher;

pub use client::NatsClient;
pub use consumer::{BatchProcessor, NatsConsumer, ProcessingResult};
pub use publisher::JetStreamPublisher;

#[cfg(any(test, feature = "testing"))]
pub use publisher::MockJetStreamPublisher;
