//! Scripted [`ControlPort`] for emulation and tests.
//!
//! Answers GET_DESCRIPTOR requests from a table of canned descriptors and
//! records every setup packet it sees. Responses are truncated to `wLength`
//! the way a real device truncates them.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use log::debug;

use crate::port::{ControlPort, PortError};
use crate::usb::descriptor_types::UsbDescriptorType;
use crate::usb::descriptors::DeviceDescriptor;
use crate::usb::request::UsbSetupPacket;
use crate::usb::string::UsbString;

#[derive(Debug, Default)]
pub struct MockPort {
    // (wValue, wIndex) -> descriptor bytes
    descriptors: HashMap<(u16, u16), Vec<u8>>,
    stalls: HashSet<(u16, u16)>,
    requests: RefCell<Vec<UsbSetupPacket>>,
}

fn key(descriptor_type: UsbDescriptorType, index: u8, language_id: u16) -> (u16, u16) {
    (
        (u16::from(descriptor_type.get_value()) << 8) | u16::from(index),
        language_id,
    )
}

impl MockPort {
    pub fn new() -> Self {
        MockPort::default()
    }

    pub fn with_descriptor(
        mut self,
        descriptor_type: UsbDescriptorType,
        index: u8,
        language_id: u16,
        data: Vec<u8>,
    ) -> Self {
        self.descriptors
            .insert(key(descriptor_type, index, language_id), data);
        self
    }

    pub fn with_device(self, descriptor: &DeviceDescriptor) -> Self {
        self.with_descriptor(UsbDescriptorType::Device, 0, 0, descriptor.to_bytes().to_vec())
    }

    pub fn with_languages(self, languages: &[u16]) -> Self {
        let bytes = UsbString::from_languages(languages).to_bytes();
        self.with_descriptor(UsbDescriptorType::String, 0, 0, bytes)
    }

    pub fn with_string(self, index: u8, language_id: u16, text: &str) -> Self {
        let bytes = UsbString::from_text(index, language_id, text).to_bytes();
        self.with_descriptor(UsbDescriptorType::String, index, language_id, bytes)
    }

    /// `data` is the full configuration descriptor set (wTotalLength bytes).
    pub fn with_configuration(self, index: u8, data: Vec<u8>) -> Self {
        self.with_descriptor(UsbDescriptorType::Configuration, index, 0, data)
    }

    /// Makes a descriptor request fail with a STALL.
    pub fn with_stall(mut self, descriptor_type: UsbDescriptorType, index: u8, language_id: u16) -> Self {
        self.stalls.insert(key(descriptor_type, index, language_id));
        self
    }

    /// Every request issued so far, oldest first.
    pub fn requests(&self) -> Vec<UsbSetupPacket> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ControlPort for MockPort {
    fn control_request(&self, setup: &UsbSetupPacket) -> Result<Vec<u8>, PortError> {
        self.requests.borrow_mut().push(*setup);

        if setup.descriptor_target().is_none() {
            return Err(PortError::Unsupported(*setup));
        }

        let k = (setup.wValue, setup.wIndex);
        if self.stalls.contains(&k) {
            debug!("mock: stalling {}", setup);
            return Err(PortError::Stall(*setup));
        }

        match self.descriptors.get(&k) {
            Some(data) => {
                let len = data.len().min(usize::from(setup.wLength));
                Ok(data[..len].to_vec())
            }
            None => {
                debug!("mock: nothing scripted for {}", setup);
                Err(PortError::Stall(*setup))
            }
        }
    }
}
