//! Transport boundary: address-indexed register reads over one serial link.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_modbus::client::{Context, Reader};
use tokio_modbus::prelude::*;

use crate::config::SerialConfig;
use crate::producer::FunctionCode;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Read failed: {0}")]
    Read(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Not connected")]
    NotConnected,
}

/// A single physical Modbus link.
///
/// Implementations own the link exclusively; the bus is half-duplex, so
/// callers issue operations strictly sequentially. After any error the
/// caller is expected to `disconnect` and reconnect rather than reuse the
/// handle.
pub trait Transport: Send {
    /// Open the link.
    fn connect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Execute a single register read of `count` 16-bit registers.
    fn read(
        &mut self,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;

    /// Tear the link down. Safe to call when already closed.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;
}

/// Modbus RTU over a serial port.
pub struct RtuTransport {
    serial: SerialConfig,
    slave: Slave,
    timeout: Duration,
    ctx: Option<Context>,
}

impl RtuTransport {
    pub fn new(serial: SerialConfig, bus_address: u8, timeout: Duration) -> Self {
        Self {
            serial,
            slave: Slave(bus_address),
            timeout,
            ctx: None,
        }
    }
}

impl Transport for RtuTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        // Discard any previous handle before opening a fresh one.
        self.ctx = None;

        let parity = match self.serial.parity.to_lowercase().as_str() {
            "even" => tokio_serial::Parity::Even,
            "odd" => tokio_serial::Parity::Odd,
            _ => tokio_serial::Parity::None,
        };

        let stop_bits = match self.serial.stop_bits {
            2 => tokio_serial::StopBits::Two,
            _ => tokio_serial::StopBits::One,
        };

        let data_bits = match self.serial.data_bits {
            5 => tokio_serial::DataBits::Five,
            6 => tokio_serial::DataBits::Six,
            7 => tokio_serial::DataBits::Seven,
            _ => tokio_serial::DataBits::Eight,
        };

        let builder = tokio_serial::new(&self.serial.device, self.serial.baud_rate)
            .parity(parity)
            .stop_bits(stop_bits)
            .data_bits(data_bits);

        let stream = tokio_serial::SerialStream::open(&builder)
            .map_err(|e| TransportError::Connect(format!("Serial open failed: {}", e)))?;

        self.ctx = Some(rtu::attach_slave(stream, self.slave));
        Ok(())
    }

    async fn read(
        &mut self,
        function: FunctionCode,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;

        let request = async {
            match function {
                FunctionCode::ReadInputRegisters => ctx.read_input_registers(address, count).await,
                FunctionCode::ReadHoldingRegisters => {
                    ctx.read_holding_registers(address, count).await
                }
            }
        };

        let words = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
            .map_err(|e| TransportError::Read(e.to_string()))?
            .map_err(|e| TransportError::Read(format!("Exception: {:?}", e)))?;

        Ok(words)
    }

    async fn disconnect(&mut self) {
        // Dropping the context closes the serial stream.
        self.ctx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_before_connect_fails() {
        let serial = SerialConfig {
            device: "/dev/null".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            parity: "none".to_string(),
            stop_bits: 1,
        };
        let mut transport = RtuTransport::new(serial, 1, Duration::from_millis(100));

        let err = transport
            .read(FunctionCode::ReadInputRegisters, 0x0000, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Timeout(Duration::from_secs(1));
        assert_eq!(err.to_string(), "Request timed out after 1s");
    }
}
