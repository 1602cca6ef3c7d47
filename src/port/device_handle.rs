//! [`ControlPort`] backed by a libusb device handle.

use std::time::Duration;

use log::{debug, info};
use rusb::{DeviceHandle, GlobalContext, UsbContext};

use crate::port::{ControlPort, PortError};
use crate::usb::request::{UsbDirection, UsbSetupPacket};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

pub struct RusbPort<T: UsbContext = GlobalContext> {
    handle: DeviceHandle<T>,
    timeout: Duration,
}

impl RusbPort<GlobalContext> {
    /// Opens the first device matching `vendor_id`/`product_id`.
    pub fn open(vendor_id: u16, product_id: u16, timeout: Duration) -> Option<Self> {
        let handle = rusb::open_device_with_vid_pid(vendor_id, product_id)?;
        info!(
            "Opened USB device VID:{:04x} PID:{:04x} (control timeout {:?})",
            vendor_id, product_id, timeout
        );
        Some(RusbPort::new(handle, timeout))
    }
}

impl<T: UsbContext> RusbPort<T> {
    pub fn new(handle: DeviceHandle<T>, timeout: Duration) -> Self {
        RusbPort { handle, timeout }
    }

    pub fn handle(&self) -> &DeviceHandle<T> {
        &self.handle
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<T: UsbContext> ControlPort for RusbPort<T> {
    fn control_request(&self, setup: &UsbSetupPacket) -> Result<Vec<u8>, PortError> {
        // Only the IN direction is needed to read descriptors.
        if setup.direction() != UsbDirection::DeviceToHost {
            return Err(PortError::Unsupported(*setup));
        }

        let mut buf = vec![0u8; usize::from(setup.wLength)];
        let len = match self.handle.read_control(
            setup.bmRequestType,
            setup.bRequest,
            setup.wValue,
            setup.wIndex,
            &mut buf,
            self.timeout,
        ) {
            Ok(len) => len,
            Err(rusb::Error::Pipe) => return Err(PortError::Stall(*setup)),
            Err(e) => return Err(e.into()),
        };
        buf.truncate(len);

        debug!("{} -> {} bytes", setup, len);
        Ok(buf)
    }
}
