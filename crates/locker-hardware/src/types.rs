//! Common types shared across transport implementations.

use std::fmt;

/// Serial port found on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path (e.g., "/dev/ttyUSB0", "COM3").
    pub name: String,

    /// Bus the adapter sits on ("usb", "pci", "bluetooth" or "unknown").
    pub kind: &'static str,

    /// USB vendor id, when known.
    pub vid: Option<u16>,

    /// USB product id, when known.
    pub pid: Option<u16>,

    /// Adapter product string, when known.
    pub product: Option<String>,
}

impl PortInfo {
    /// Create a port entry with no adapter details.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "unknown",
            vid: None,
            pid: None,
            product: None,
        }
    }
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let mut port = PortInfo::new(info.port_name);
        match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                port.kind = "usb";
                port.vid = Some(usb.vid);
                port.pid = Some(usb.pid);
                port.product = usb.product;
            }
            serialport::SerialPortType::PciPort => port.kind = "pci",
            serialport::SerialPortType::BluetoothPort => port.kind = "bluetooth",
            serialport::SerialPortType::Unknown => {}
        }
        port
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)?;
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            write!(f, " {vid:04x}:{pid:04x}")?;
        }
        if let Some(product) = &self.product {
            write!(f, " {product}")?;
        }
        Ok(())
    }
}
