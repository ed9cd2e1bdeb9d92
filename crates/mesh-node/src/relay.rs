use std::time::Duration;

use common::domain::Envelope;
use rand::Rng;

/// Outcome of the admission policy for one received frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayDecision {
    /// Re-broadcast this envelope; its `ttl` is already decremented.
    Forward(Envelope),
    Drop(DropReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Frame did not decode into an envelope.
    Malformed(String),
    /// The envelope is this node's own traffic heard back.
    SelfOrigin,
    /// Hop budget exhausted.
    TtlExhausted,
}

/// Flood-relay admission policy.
///
/// Flooding propagates a message without routing state: every node
/// re-broadcasts what it hears, guarded only by the self-origin check (a
/// 1-hop loop guard) and the decrementing TTL that bounds propagation
/// depth. The decision is pure and synchronous; the node loop applies the
/// jitter delay and performs the send.
pub struct FloodRelay {
    device_id: String,
    max_jitter: Duration,
}

impl FloodRelay {
    pub fn new(device_id: String, max_jitter: Duration) -> Self {
        Self {
            device_id,
            max_jitter,
        }
    }

    /// Run the admission policy on one received frame, in order,
    /// short-circuiting on the first match.
    pub fn decide(&self, frame: &[u8]) -> RelayDecision {
        let envelope = match Envelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => return RelayDecision::Drop(DropReason::Malformed(e.to_string())),
        };

        if envelope.device_id == self.device_id {
            return RelayDecision::Drop(DropReason::SelfOrigin);
        }

        if envelope.ttl == 0 {
            return RelayDecision::Drop(DropReason::TtlExhausted);
        }

        RelayDecision::Forward(envelope.forwarded())
    }

    /// Jitter delay before one re-broadcast, redrawn per message, uniform in
    /// `0..=max_jitter`. Desynchronizes nodes that all heard the same
    /// transmission at the same instant on a shared half-duplex channel.
    pub fn draw_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}
