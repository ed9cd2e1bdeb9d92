use async_trait::async_trait;
use thiserror::Error;

/// Driver-level classification of a completed receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxStatus {
    Ok,
    Error(String),
}

/// Events surfaced by the physical radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// A frame finished receiving, with the driver's status for it.
    Received { bytes: Vec<u8>, status: RxStatus },
    /// A previously queued transmission completed.
    TransmitDone,
}

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("radio send failed: {0}")]
    Send(String),

    #[error("radio closed")]
    Closed,
}

/// Minimal contract against the physical radio transceiver.
///
/// A node has exactly one radio, owned by the node loop; the same send
/// primitive serves both origination and relaying. Transceiver setup and
/// modulation parameters live behind the implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Radio: Send {
    /// Broadcast one frame on the shared channel.
    async fn send(&mut self, frame: &[u8]) -> Result<(), RadioError>;

    /// Wait for the next radio event.
    ///
    /// Must be cancel-safe: the node loop drops this future whenever its
    /// sample ticker fires first.
    async fn next_event(&mut self) -> Result<RadioEvent, RadioError>;
}
