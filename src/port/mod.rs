//! Control-transfer port abstraction.
//!
//! The model never talks to the bus itself: every descriptor fetch goes through
//! a [`ControlPort`], which issues one blocking control request and returns the
//! data stage. Timeouts and retries live in the port implementation.

pub mod device_handle;
pub mod mock;

use std::rc::Rc;

use thiserror::Error;

use crate::usb::request::UsbSetupPacket;

pub use self::device_handle::RusbPort;
pub use self::mock::MockPort;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("usb error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("request stalled: {0}")]
    Stall(UsbSetupPacket),

    #[error("unsupported request: {0}")]
    Unsupported(UsbSetupPacket),
}

/// Something that can answer control requests on a device's default pipe.
pub trait ControlPort {
    /// Issues `setup` and blocks until the data stage completes. The length of
    /// the returned buffer is the actual transfer length.
    fn control_request(&self, setup: &UsbSetupPacket) -> Result<Vec<u8>, PortError>;
}

impl<T: ControlPort + ?Sized> ControlPort for &T {
    fn control_request(&self, setup: &UsbSetupPacket) -> Result<Vec<u8>, PortError> {
        (**self).control_request(setup)
    }
}

impl<T: ControlPort + ?Sized> ControlPort for Box<T> {
    fn control_request(&self, setup: &UsbSetupPacket) -> Result<Vec<u8>, PortError> {
        (**self).control_request(setup)
    }
}

impl<T: ControlPort + ?Sized> ControlPort for Rc<T> {
    fn control_request(&self, setup: &UsbSetupPacket) -> Result<Vec<u8>, PortError> {
        (**self).control_request(setup)
    }
}
