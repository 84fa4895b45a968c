//! Serial port transport.
//!
//! The port is opened for each exchange and closed again when the exchange
//! finishes, so a board that is unplugged and replugged between commands is
//! picked up without any reconnect logic. All blocking driver calls run on
//! Tokio's blocking pool.
//!
//! A blocking exchange keeps running after the future awaiting it is dropped.
//! Each port therefore has a process-wide guard that the blocking worker holds
//! from open to close, and a later exchange on the same port waits for it.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use locker_core::SerialConfig;
use locker_protocol::{Frame, to_hex};
use serialport::SerialPort;
use tracing::{debug, trace};

use crate::error::{HardwareError, Result};
use crate::traits::Transport;
use crate::types::PortInfo;

type PortGuard = Arc<Mutex<()>>;

/// Guards keyed by port name.
static PORT_GUARDS: LazyLock<Mutex<HashMap<String, PortGuard>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn port_guard(port: &str) -> PortGuard {
    let mut guards = PORT_GUARDS.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(guards.entry(port.to_string()).or_default())
}

/// Transport over a local serial port at 8N1 without flow control.
#[derive(Debug, Clone)]
pub struct SerialTransport {
    config: SerialConfig,
    guard: PortGuard,
}

impl SerialTransport {
    /// Create a transport for the configured port. Nothing is opened yet.
    pub fn new(config: SerialConfig) -> Self {
        let guard = port_guard(&config.port);
        Self { config, guard }
    }

    /// Port settings in use.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Transport for SerialTransport {
    async fn exchange(&mut self, frame: &Frame, read_window: usize) -> Result<Bytes> {
        let config = self.config.clone();
        let guard = Arc::clone(&self.guard);
        let outgoing = frame.as_bytes().to_vec();

        debug!(port = %config.port, tx = %frame, "Serial exchange");

        let reply = tokio::task::spawn_blocking(move || {
            let _line = hold(&guard);
            exchange_blocking(&config, &outgoing, read_window)
        })
        .await
        .map_err(|e| HardwareError::other(format!("Serial worker failed: {e}")))??;

        trace!(rx = %to_hex(&reply), "Serial reply");
        Ok(reply)
    }

    fn describe(&self) -> String {
        format!("serial {} @ {} baud", self.config.port, self.config.baud_rate)
    }
}

/// Wait for any earlier exchange on the port, including one whose caller has
/// gone away.
fn hold(guard: &Mutex<()>) -> MutexGuard<'_, ()> {
    guard.lock().unwrap_or_else(PoisonError::into_inner)
}

fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>> {
    serialport::new(config.port.as_str(), config.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(config.read_timeout())
        .open()
        .map_err(|e| HardwareError::unavailable(config.port.as_str(), e.description))
}

fn exchange_blocking(config: &SerialConfig, outgoing: &[u8], read_window: usize) -> Result<Bytes> {
    let mut port = open_port(config)?;

    // Drop anything the board pushed since the last exchange
    port.clear(serialport::ClearBuffer::All)?;

    port.write_all(outgoing)?;
    port.flush()?;

    std::thread::sleep(config.settle());

    read_until_window(port.as_mut(), read_window, config.read_timeout())
}

/// Read until `window` bytes arrive or `timeout` elapses, whichever is first.
fn read_until_window(port: &mut dyn SerialPort, window: usize, timeout: Duration) -> Result<Bytes> {
    let mut buffer = BytesMut::zeroed(window);
    let mut filled = 0;
    let deadline = Instant::now() + timeout;

    while filled < window {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        port.set_timeout(remaining)?;

        match port.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    buffer.truncate(filled);
    Ok(buffer.freeze())
}

fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    for (rank, prefix) in [(0u8, "ttyACM"), (0, "ttyUSB"), (1, "COM")] {
        if let Some(rest) = basename.strip_prefix(prefix) {
            let num = rest.parse::<usize>().unwrap_or(usize::MAX);
            return (rank, num, basename.to_string());
        }
    }
    (2, 0, basename.to_string())
}

/// List serial ports on this host, USB adapters first.
///
/// On Linux, `/dev/ttyACM*` and `/dev/ttyUSB*` nodes the enumeration API
/// missed are added as well.
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let port = PortInfo::from(info);
        map.entry(port.name.clone()).or_insert(port);
    }

    #[cfg(target_os = "linux")]
    if let Ok(entries) = std::fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str()
                && (fname.starts_with("ttyACM") || fname.starts_with("ttyUSB"))
            {
                let full = format!("/dev/{fname}");
                map.entry(full.clone()).or_insert_with(|| PortInfo::new(full));
            }
        }
    }

    let mut ports: Vec<PortInfo> = map.into_values().collect();
    ports.sort_by_key(|p| port_sort_key(&p.name));
    ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use locker_core::Bay;
    use locker_protocol::{AnyCodec, Command, FrameCodec};

    #[test]
    fn test_port_sort_key_orders_usb_first() {
        let mut names = vec!["/dev/ttyS0", "COM3", "/dev/ttyUSB1", "/dev/ttyACM0", "/dev/ttyUSB0"];
        names.sort_by_key(|n| port_sort_key(n));
        assert_eq!(
            names,
            vec!["/dev/ttyACM0", "/dev/ttyUSB0", "/dev/ttyUSB1", "COM3", "/dev/ttyS0"]
        );
    }

    #[test]
    fn test_list_ports_does_not_panic() {
        for port in list_ports() {
            assert!(!port.name.is_empty());
        }
    }

    #[test]
    fn test_describe() {
        let transport = SerialTransport::new(SerialConfig {
            port: "/dev/ttyUSB3".to_string(),
            baud_rate: 19200,
            ..SerialConfig::default()
        });
        assert_eq!(transport.describe(), "serial /dev/ttyUSB3 @ 19200 baud");
    }

    #[test]
    fn test_transports_on_one_port_share_guard() {
        let config = |port: &str| SerialConfig {
            port: port.to_string(),
            ..SerialConfig::default()
        };
        let first = SerialTransport::new(config("/dev/ttyUSB7"));
        let second = SerialTransport::new(config("/dev/ttyUSB7"));
        let other = SerialTransport::new(config("/dev/ttyUSB8"));

        assert!(Arc::ptr_eq(&first.guard, &second.guard));
        assert!(Arc::ptr_eq(&first.guard, &first.clone().guard));
        assert!(!Arc::ptr_eq(&first.guard, &other.guard));
    }

    #[test]
    fn test_guard_held_until_released() {
        let transport = SerialTransport::new(SerialConfig {
            port: "/dev/ttyUSB9".to_string(),
            ..SerialConfig::default()
        });

        let held = hold(&transport.guard);
        assert!(transport.guard.try_lock().is_err());
        drop(held);
        assert!(transport.guard.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_missing_port_is_unavailable() {
        let mut transport = SerialTransport::new(SerialConfig {
            port: "/dev/locker-board-that-does-not-exist".to_string(),
            ..SerialConfig::default()
        });
        let codec = AnyCodec::default();
        let frame = codec.encode(Command::QueryStatus, Bay::new(1).unwrap(), &[]);

        let result = transport.exchange(&frame, codec.read_window()).await;
        assert!(matches!(
            result,
            Err(HardwareError::Unavailable { ref port, .. }) if port == "/dev/locker-board-that-does-not-exist"
        ));
    }
}
