use std::time::Duration;

use common::domain::Envelope;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::radio::{Radio, RadioError, RadioEvent, RxStatus};
use crate::relay::{DropReason, FloodRelay, RelayDecision};
use crate::sensor::SensorProbe;

#[derive(Debug, Clone)]
pub struct MeshNodeConfig {
    /// Node identity, fixed at boot; every originated envelope carries it.
    pub device_id: String,
    /// Hop budget for originated envelopes.
    pub max_ttl: u32,
    /// Upper bound of the per-message re-broadcast jitter.
    pub max_jitter: Duration,
    /// Origination period.
    pub sample_period: Duration,
}

impl Default for MeshNodeConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            max_ttl: 10,
            max_jitter: Duration::from_millis(1000),
            sample_period: Duration::from_secs(300),
        }
    }
}

/// One mesh node: flood relay plus periodic sensor origination.
///
/// The node owns the single radio and runs as one task; radio events and
/// the sample ticker are its only suspension points. The first sample is
/// taken immediately at startup.
pub struct MeshNode<R: Radio, P: SensorProbe> {
    relay: FloodRelay,
    radio: R,
    probe: P,
    config: MeshNodeConfig,
}

enum Wake {
    Shutdown,
    Sample,
    Radio(Result<RadioEvent, RadioError>),
}

impl<R: Radio, P: SensorProbe> MeshNode<R, P> {
    pub fn new(radio: R, probe: P, config: MeshNodeConfig) -> Self {
        Self {
            relay: FloodRelay::new(config.device_id.clone(), config.max_jitter),
            radio,
            probe,
            config,
        }
    }

    pub async fn run(mut self, ctx: CancellationToken) -> Result<(), RadioError> {
        info!(
            device_id = %self.config.device_id,
            max_ttl = self.config.max_ttl,
            sample_period_secs = self.config.sample_period.as_secs(),
            "starting mesh node"
        );

        let mut ticker = tokio::time::interval(self.config.sample_period);

        loop {
            let wake = tokio::select! {
                _ = ctx.cancelled() => Wake::Shutdown,
                _ = ticker.tick() => Wake::Sample,
                event = self.radio.next_event() => Wake::Radio(event),
            };

            match wake {
                Wake::Shutdown => {
                    info!("shutdown requested, stopping mesh node");
                    break;
                }
                Wake::Sample => self.originate().await?,
                Wake::Radio(Ok(event)) => self.handle_event(event).await?,
                Wake::Radio(Err(e)) => {
                    warn!(error = %e, "radio stopped delivering events");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Sample the sensor and flood a fresh envelope.
    async fn originate(&mut self) -> Result<(), RadioError> {
        let reading = match self.probe.sample() {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, "sensor read failed, skipping this cycle");
                return Ok(());
            }
        };

        if reading.is_empty() {
            warn!("sensor returned no fields, skipping this cycle");
            return Ok(());
        }

        let envelope = Envelope::new(
            self.config.device_id.clone(),
            reading,
            self.config.max_ttl,
        );

        info!(
            message_id = %envelope.message_id,
            field_count = envelope.values.len(),
            "originating reading"
        );

        self.radio.send(&envelope.encode()).await
    }

    async fn handle_event(&mut self, event: RadioEvent) -> Result<(), RadioError> {
        match event {
            RadioEvent::TransmitDone => {
                debug!("transmit complete");
                Ok(())
            }
            RadioEvent::Received {
                status: RxStatus::Error(e),
                ..
            } => {
                error!(error = %e, "receive error, dropping frame");
                Ok(())
            }
            RadioEvent::Received {
                bytes,
                status: RxStatus::Ok,
            } => match self.relay.decide(&bytes) {
                RelayDecision::Forward(envelope) => {
                    let jitter = self.relay.draw_jitter();
                    debug!(
                        message_id = %envelope.message_id,
                        ttl = envelope.ttl,
                        jitter_ms = jitter.as_millis() as u64,
                        "forwarding envelope"
                    );
                    tokio::time::sleep(jitter).await;
                    self.radio.send(&envelope.encode()).await
                }
                RelayDecision::Drop(DropReason::Malformed(reason)) => {
                    error!(reason = %reason, "dropping malformed frame");
                    Ok(())
                }
                RelayDecision::Drop(DropReason::SelfOrigin) => {
                    debug!("dropping own envelope heard back");
                    Ok(())
                }
                RelayDecision::Drop(DropReason::TtlExhausted) => {
                    debug!("dropping envelope, hop budget exhausted");
                    Ok(())
                }
            },
        }
    }
}
