//! Native serial port implementation using the `serialport` crate.
//!
//! This module provides the serial port implementation for native platforms
//! (Linux, macOS, Windows, FreeBSD, etc.).

use {
    crate::{
        error::{Error, Result},
        port::{Port, PortDescriptor, PortEnumerator, SerialConfig},
    },
    log::{debug, trace},
    serialport::{DataBits, FlowControl, Parity, SerialPortType, StopBits},
    std::{
        io::{Read, Write},
        time::Duration,
    },
};

/// Native serial port implementation.
pub struct NativePort {
    port: Option<Box<dyn serialport::SerialPort>>,
    name: String,
    timeout: Duration,
}

impl NativePort {
    /// Open a serial port with the given configuration.
    ///
    /// Fails with [`Error::PortOpen`] if the port is missing or busy.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port_name, config.baud_rate)
            .timeout(config.timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|e| Error::PortOpen {
                port: config
                    .port_name
                    .clone(),
                source: e.into(),
            })?;

        debug!(
            "Opened {} at {} baud (timeout {:?})",
            config.port_name, config.baud_rate, config.timeout
        );

        Ok(Self {
            port: Some(port),
            name: config
                .port_name
                .clone(),
            timeout: config.timeout,
        })
    }

    fn closed_error() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotConnected, "port closed")
    }
}

impl Port for NativePort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        if let Some(ref mut p) = self.port {
            p.set_timeout(timeout)?;
        }
        self.timeout = timeout;
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the handle closes the device
        if self
            .port
            .take()
            .is_some()
        {
            trace!("Closed {}", self.name);
        }
        Ok(())
    }
}

impl Read for NativePort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port
            .as_mut()
            .ok_or_else(Self::closed_error)
            .and_then(|p| p.read(buf))
    }
}

impl Write for NativePort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port
            .as_mut()
            .ok_or_else(Self::closed_error)
            .and_then(|p| p.write(buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port
            .as_mut()
            .ok_or_else(Self::closed_error)
            .and_then(std::io::Write::flush)
    }
}

/// Native port enumerator.
pub struct NativePortEnumerator;

impl PortEnumerator for NativePortEnumerator {
    fn list_ports() -> Result<Vec<PortDescriptor>> {
        let ports = serialport::available_ports()?;

        Ok(ports
            .into_iter()
            .map(|p| describe_port(p.port_name, &p.port_type))
            .collect())
    }
}

/// Build the selection-menu view of a port.
fn describe_port(name: String, port_type: &SerialPortType) -> PortDescriptor {
    match port_type {
        SerialPortType::UsbPort(info) => {
            let description = match (&info.product, &info.manufacturer) {
                (Some(product), _) => format!("{product} ({name})"),
                (None, Some(manufacturer)) => format!("{manufacturer} ({name})"),
                (None, None) => name.clone(),
            };

            let mut hardware_id = format!("USB VID:PID={:04X}:{:04X}", info.vid, info.pid);
            if let Some(serial) = &info.serial_number {
                hardware_id.push_str(" SER=");
                hardware_id.push_str(serial);
            }

            PortDescriptor {
                name,
                description,
                hardware_id,
            }
        },
        SerialPortType::PciPort => PortDescriptor {
            description: format!("PCI serial ({name})"),
            name,
            hardware_id: "PCI".to_string(),
        },
        SerialPortType::BluetoothPort => PortDescriptor {
            description: format!("Bluetooth serial ({name})"),
            name,
            hardware_id: "BLUETOOTH".to_string(),
        },
        SerialPortType::Unknown => PortDescriptor::named(name),
    }
}
