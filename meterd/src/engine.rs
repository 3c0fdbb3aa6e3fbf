//! The query engine: executes a producer's operations against one transport
//! and publishes complete reading snapshots.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use meterd_common::{Measurement, Reading};

use crate::decode::DecodeError;
use crate::producer::{Operation, Producer};
use crate::transport::{Transport, TransportError};

/// Bounded retry policy for a single operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Read attempts per operation before the poll cycle is abandoned.
    pub max_attempts: u32,
    /// Wait between attempts, after the faulted link has been discarded.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Retry budget exhausted for one operation; the poll cycle was
    /// abandoned and nothing was published for it.
    #[error("{measurement:?} at register 0x{address:04X} failed after {attempts} attempt(s): {source}")]
    CycleAborted {
        measurement: Measurement,
        address: u16,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// A register payload did not match the operation's transform. This is
    /// a producer bug, not a bus fault, and terminates the engine instance.
    #[error("decode failure for {measurement:?}: {source}")]
    Decode {
        measurement: Measurement,
        #[source]
        source: DecodeError,
    },

    /// The stop signal fired during a poll cycle.
    #[error("shut down during poll cycle")]
    Cancelled,
}

/// Connection state of the link owned by one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Disconnected,
    Connected,
}

/// Polls one meter over one exclusively-owned transport.
///
/// Each poll cycle executes the producer's full operation list strictly
/// sequentially (the bus is half-duplex), retrying individual reads with
/// link teardown in between. A cycle either completes and publishes one
/// [`Reading`], or aborts and publishes nothing; partial snapshots are
/// never emitted.
pub struct QueryEngine<T: Transport> {
    meter: String,
    transport: T,
    producer: Box<dyn Producer>,
    operations: Vec<Operation>,
    output: mpsc::Sender<Reading>,
    poll_interval: Duration,
    retry: RetryPolicy,
    shutdown: CancellationToken,
    state: LinkState,
}

impl<T: Transport> QueryEngine<T> {
    /// Create an engine with default poll interval (10 s) and retry policy.
    pub fn new(
        meter: impl Into<String>,
        transport: T,
        producer: Box<dyn Producer>,
        output: mpsc::Sender<Reading>,
    ) -> Self {
        let operations = producer.produce();
        Self {
            meter: meter.into(),
            transport,
            producer,
            operations,
            output,
            poll_interval: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            shutdown: CancellationToken::new(),
            state: LinkState::Disconnected,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Run until the stop signal fires or a fatal error occurs.
    ///
    /// Transient transport faults never surface past this loop; an aborted
    /// cycle is reported once and the engine continues with the next one.
    pub async fn run(mut self) -> Result<(), EngineError> {
        info!(
            meter = %self.meter,
            device = %self.producer.description(),
            operations = self.operations.len(),
            "Starting query engine"
        );

        // Verify the device answers before committing to full poll cycles.
        let probe = self.producer.probe();
        match self.execute(&probe).await {
            Ok(value) => debug!(meter = %self.meter, value, "Probe succeeded"),
            Err(EngineError::Cancelled) => return Ok(()),
            Err(e) => {
                error!(meter = %self.meter, error = %e, "Device did not answer probe");
                return Err(e);
            }
        }

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            match self.poll_cycle().await {
                Ok(reading) => {
                    if self.output.send(reading).await.is_err() {
                        info!(meter = %self.meter, "Reading consumer is gone, stopping");
                        break;
                    }
                }
                Err(EngineError::Cancelled) => break,
                Err(e @ EngineError::CycleAborted { .. }) => {
                    // One operational signal per abandoned cycle.
                    error!(meter = %self.meter, error = %e, "Poll cycle failed");
                }
                Err(e) => {
                    error!(meter = %self.meter, error = %e, "Fatal engine error");
                    return Err(e);
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        self.transport.disconnect().await;
        info!(meter = %self.meter, "Query engine stopped");
        Ok(())
    }

    /// Execute every operation once and assemble the snapshot.
    async fn poll_cycle(&mut self) -> Result<Reading, EngineError> {
        let mut values = BTreeMap::new();

        for idx in 0..self.operations.len() {
            if self.shutdown.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            let operation = self.operations[idx];
            let value = self.execute(&operation).await?;
            values.insert(operation.measurement, value);
        }

        // Registers are read sequentially over a non-zero window; the
        // snapshot carries one timestamp taken at cycle completion.
        Ok(Reading::new(self.meter.as_str(), values))
    }

    /// Execute one operation: bounded retry with link teardown, then decode.
    async fn execute(&mut self, operation: &Operation) -> Result<f64, EngineError> {
        let words = self.read_with_retry(operation).await?;
        operation
            .transform
            .decode(&words)
            .map_err(|source| EngineError::Decode {
                measurement: operation.measurement,
                source,
            })
    }

    async fn read_with_retry(&mut self, operation: &Operation) -> Result<Vec<u16>, EngineError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_read(operation).await {
                Ok(words) => return Ok(words),
                Err(e) => {
                    warn!(
                        meter = %self.meter,
                        measurement = ?operation.measurement,
                        address = operation.address,
                        attempt,
                        error = %e,
                        "Register read failed, discarding link"
                    );
                    // A faulted handle risks stale framing state on a
                    // half-duplex link; never reuse it.
                    self.transport.disconnect().await;
                    self.state = LinkState::Disconnected;

                    if attempt >= self.retry.max_attempts {
                        return Err(EngineError::CycleAborted {
                            measurement: operation.measurement,
                            address: operation.address,
                            attempts: attempt,
                            source: e,
                        });
                    }

                    tokio::select! {
                        _ = self.shutdown.cancelled() => return Err(EngineError::Cancelled),
                        _ = tokio::time::sleep(self.retry.backoff) => {}
                    }
                }
            }
        }
    }

    /// One read attempt, lazily reopening the link if it is down.
    async fn try_read(&mut self, operation: &Operation) -> Result<Vec<u16>, TransportError> {
        if self.state == LinkState::Disconnected {
            self.transport.connect().await?;
            self.state = LinkState::Connected;
            debug!(meter = %self.meter, "Link connected");
        }

        self.transport
            .read(operation.function, operation.address, operation.count)
            .await
    }
}
