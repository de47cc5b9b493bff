//! Connection to the sensor's serial port.
//!
//! The link settings are fixed by the sensor firmware: 9600 baud, 8 data
//! bits, no parity, one stop bit, no flow control and a 5 s read timeout.

mod link;
mod reader;

pub use link::{LinkEvent, SerialLink};

#[cfg(test)]
pub(crate) use link::tests::ScriptedTransport;

use std::io::Read;
use std::time::Duration;

use crate::config::validate_port_id;
use crate::error::LinkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
    pub read_timeout: Duration,
}

pub const SENSOR_LINE_SETTINGS: LineSettings = LineSettings {
    baud_rate: 9600,
    data_bits: serialport::DataBits::Eight,
    parity: serialport::Parity::None,
    stop_bits: serialport::StopBits::One,
    flow_control: serialport::FlowControl::None,
    read_timeout: Duration::from_millis(5000),
};

/// Platform device name for a 1-based port id.
#[cfg(windows)]
pub fn port_name(port_id: u8) -> String {
    format!("COM{port_id}")
}

/// Platform device name for a 1-based port id (`COM1` is `/dev/ttyS0`).
#[cfg(not(windows))]
pub fn port_name(port_id: u8) -> String {
    format!("/dev/ttyS{}", port_id.saturating_sub(1))
}

/// Opens the byte stream behind a link.
pub trait SerialTransport: Send + Sync + 'static {
    fn open(
        &self,
        port_id: u8,
        settings: &LineSettings,
    ) -> Result<Box<dyn Read + Send>, LinkError>;
}

/// Hardware serial ports through the `serialport` crate.
pub struct SystemSerialTransport;

impl SerialTransport for SystemSerialTransport {
    fn open(
        &self,
        port_id: u8,
        settings: &LineSettings,
    ) -> Result<Box<dyn Read + Send>, LinkError> {
        if !validate_port_id(port_id) {
            return Err(LinkError::InvalidPort(port_id));
        }

        let port = port_name(port_id);
        let handle = serialport::new(&port, settings.baud_rate)
            .data_bits(settings.data_bits)
            .parity(settings.parity)
            .stop_bits(settings.stop_bits)
            .flow_control(settings.flow_control)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|source| LinkError::Open { port, source })?;

        Ok(Box::new(handle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
}

pub fn available_ports() -> Result<Vec<PortInfo>, serialport::Error> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|port| PortInfo {
            kind: port_kind(&port.port_type),
            name: port.port_name,
        })
        .collect())
}

fn port_kind(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(info) => match &info.product {
            Some(product) => format!(
                "USB {product} (VID 0x{:04x}, PID 0x{:04x})",
                info.vid, info.pid
            ),
            None => format!("USB (VID 0x{:04x}, PID 0x{:04x})", info.vid, info.pid),
        },
        serialport::SerialPortType::BluetoothPort => "Bluetooth".into(),
        serialport::SerialPortType::PciPort => "PCI".into(),
        serialport::SerialPortType::Unknown => "Unknown".into(),
    }
}
