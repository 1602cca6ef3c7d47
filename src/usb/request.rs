use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::usb::descriptor_types::UsbDescriptorType;

/// Size of a SETUP packet on the wire.
pub const SETUP_PACKET_SIZE: usize = 8;

// Control request direction, bit 7 of bmRequestType
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsbDirection {
    HostToDevice,
    DeviceToHost,
}

impl UsbDirection {
    pub fn bits(&self) -> u8 {
        match self {
            UsbDirection::HostToDevice => 0x00,
            UsbDirection::DeviceToHost => 0x80,
        }
    }
}

impl fmt::Display for UsbDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsbDirection::HostToDevice => write!(f, "OUT"),
            UsbDirection::DeviceToHost => write!(f, "IN"),
        }
    }
}

// Control request type, bits 5..6 of bmRequestType
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsbControlRequestType {
    Standard,
    Class,
    Vendor,
    Reserved,
}

impl UsbControlRequestType {
    pub fn bits(&self) -> u8 {
        match self {
            UsbControlRequestType::Standard => 0x00,
            UsbControlRequestType::Class => 0x20,
            UsbControlRequestType::Vendor => 0x40,
            UsbControlRequestType::Reserved => 0x60,
        }
    }
}

// Control request recipient, bits 0..4 of bmRequestType
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsbControlRecipient {
    Device,
    Interface,
    Endpoint,
    Other,
    Reserved,
}

impl UsbControlRecipient {
    pub fn bits(&self) -> u8 {
        match self {
            UsbControlRecipient::Device => 0x00,
            UsbControlRecipient::Interface => 0x01,
            UsbControlRecipient::Endpoint => 0x02,
            UsbControlRecipient::Other => 0x03,
            UsbControlRecipient::Reserved => 0x1F,
        }
    }
}

/// Builds a bmRequestType byte.
pub fn request_type(
    direction: UsbDirection,
    request_type: UsbControlRequestType,
    recipient: UsbControlRecipient,
) -> u8 {
    direction.bits() | request_type.bits() | recipient.bits()
}

// Standard request codes this model issues or recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsbStandardRequest {
    GetStatus = 0,
    ClearFeature = 1,
    SetFeature = 3,
    SetAddress = 5,
    GetDescriptor = 6,
    SetDescriptor = 7,
    GetConfiguration = 8,
    SetConfiguration = 9,
    GetInterface = 10,
    SetInterface = 11,
    SynchFrame = 12,
}

impl UsbStandardRequest {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(UsbStandardRequest::GetStatus),
            1 => Some(UsbStandardRequest::ClearFeature),
            3 => Some(UsbStandardRequest::SetFeature),
            5 => Some(UsbStandardRequest::SetAddress),
            6 => Some(UsbStandardRequest::GetDescriptor),
            7 => Some(UsbStandardRequest::SetDescriptor),
            8 => Some(UsbStandardRequest::GetConfiguration),
            9 => Some(UsbStandardRequest::SetConfiguration),
            10 => Some(UsbStandardRequest::GetInterface),
            11 => Some(UsbStandardRequest::SetInterface),
            12 => Some(UsbStandardRequest::SynchFrame),
            _ => None,
        }
    }
}

impl fmt::Display for UsbStandardRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UsbStandardRequest::GetStatus => "GET_STATUS",
            UsbStandardRequest::ClearFeature => "CLEAR_FEATURE",
            UsbStandardRequest::SetFeature => "SET_FEATURE",
            UsbStandardRequest::SetAddress => "SET_ADDRESS",
            UsbStandardRequest::GetDescriptor => "GET_DESCRIPTOR",
            UsbStandardRequest::SetDescriptor => "SET_DESCRIPTOR",
            UsbStandardRequest::GetConfiguration => "GET_CONFIGURATION",
            UsbStandardRequest::SetConfiguration => "SET_CONFIGURATION",
            UsbStandardRequest::GetInterface => "GET_INTERFACE",
            UsbStandardRequest::SetInterface => "SET_INTERFACE",
            UsbStandardRequest::SynchFrame => "SYNCH_FRAME",
        };
        write!(f, "{}", name)
    }
}

/// The 8-byte SETUP stage of a control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct UsbSetupPacket {
    // Field names follow the USB specification.
    pub bmRequestType: u8,
    pub bRequest: u8,
    pub wValue: u16,
    pub wIndex: u16,
    pub wLength: u16,
}

impl UsbSetupPacket {
    /// A standard, device-recipient GET_DESCRIPTOR request.
    pub fn get_descriptor(
        descriptor_type: UsbDescriptorType,
        descriptor_index: u8,
        language_id: u16,
        length: u16,
    ) -> Self {
        UsbSetupPacket {
            bmRequestType: request_type(
                UsbDirection::DeviceToHost,
                UsbControlRequestType::Standard,
                UsbControlRecipient::Device,
            ),
            bRequest: UsbStandardRequest::GetDescriptor as u8,
            wValue: (u16::from(descriptor_type.get_value()) << 8) | u16::from(descriptor_index),
            wIndex: language_id,
            wLength: length,
        }
    }

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < SETUP_PACKET_SIZE {
            return None;
        }

        Some(UsbSetupPacket {
            bmRequestType: data[0],
            bRequest: data[1],
            wValue: LittleEndian::read_u16(&data[2..4]),
            wIndex: LittleEndian::read_u16(&data[4..6]),
            wLength: LittleEndian::read_u16(&data[6..8]),
        })
    }

    pub fn to_bytes(&self) -> [u8; SETUP_PACKET_SIZE] {
        let mut buf = [0u8; SETUP_PACKET_SIZE];
        buf[0] = self.bmRequestType;
        buf[1] = self.bRequest;
        LittleEndian::write_u16(&mut buf[2..4], self.wValue);
        LittleEndian::write_u16(&mut buf[4..6], self.wIndex);
        LittleEndian::write_u16(&mut buf[6..8], self.wLength);
        buf
    }

    pub fn direction(&self) -> UsbDirection {
        if (self.bmRequestType & 0x80) != 0 {
            UsbDirection::DeviceToHost
        } else {
            UsbDirection::HostToDevice
        }
    }

    pub fn request_type(&self) -> UsbControlRequestType {
        match (self.bmRequestType >> 5) & 0x03 {
            0 => UsbControlRequestType::Standard,
            1 => UsbControlRequestType::Class,
            2 => UsbControlRequestType::Vendor,
            _ => UsbControlRequestType::Reserved,
        }
    }

    pub fn recipient(&self) -> UsbControlRecipient {
        match self.bmRequestType & 0x1F {
            0 => UsbControlRecipient::Device,
            1 => UsbControlRecipient::Interface,
            2 => UsbControlRecipient::Endpoint,
            3 => UsbControlRecipient::Other,
            _ => UsbControlRecipient::Reserved,
        }
    }

    pub fn standard_request(&self) -> Option<UsbStandardRequest> {
        if self.request_type() == UsbControlRequestType::Standard {
            UsbStandardRequest::from_code(self.bRequest)
        } else {
            None
        }
    }

    /// Descriptor type and index addressed by a GET_DESCRIPTOR request.
    pub fn descriptor_target(&self) -> Option<(UsbDescriptorType, u8)> {
        match self.standard_request() {
            Some(UsbStandardRequest::GetDescriptor) => Some((
                UsbDescriptorType::from((self.wValue >> 8) as u8),
                (self.wValue & 0xFF) as u8,
            )),
            _ => None,
        }
    }
}

impl fmt::Display for UsbSetupPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((descriptor_type, index)) = self.descriptor_target() {
            return match descriptor_type {
                UsbDescriptorType::Device => write!(f, "GET_DESCRIPTOR DEVICE (len {})", self.wLength),
                UsbDescriptorType::String => write!(
                    f,
                    "GET_DESCRIPTOR STRING {} lang 0x{:04X} (len {})",
                    index, self.wIndex, self.wLength
                ),
                other => write!(
                    f,
                    "GET_DESCRIPTOR {} {} (len {})",
                    other.name(),
                    index,
                    self.wLength
                ),
            };
        }

        match self.standard_request() {
            Some(request) => write!(
                f,
                "{} {} value 0x{:04X} index 0x{:04X} (len {})",
                self.direction(),
                request,
                self.wValue,
                self.wIndex,
                self.wLength
            ),
            None => write!(
                f,
                "{} {:?} request 0x{:02X} value 0x{:04X} index 0x{:04X} (len {})",
                self.direction(),
                self.request_type(),
                self.bRequest,
                self.wValue,
                self.wIndex,
                self.wLength
            ),
        }
    }
}
