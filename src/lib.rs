//! Queryable model of a USB device's descriptors and multilingual strings.
//!
//! Used by the proxy to present a real device (read through a
//! [`port::ControlPort`]) or an emulated one (built in memory) to the host.

pub mod data;
pub mod port;
pub mod usb;

pub use port::{ControlPort, PortError};
pub use usb::{Configuration, DeviceDescriptor, Error, Result, StringTable, UsbDevice, UsbString};
