pub mod demo_producer;
pub mod envelope_processor;

pub use demo_producer::{run_demo_producer, DemoProducerConfig};
pub use envelope_processor::create_envelope_processor;
