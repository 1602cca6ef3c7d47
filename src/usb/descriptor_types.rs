// USB descriptor type codes (bDescriptorType)
// Based on USB 2.0 chapter 9 and the common class extensions

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UsbDescriptorType {
    Device,
    Configuration,
    String,
    Interface,
    Endpoint,
    DeviceQualifier,
    OtherSpeedConfiguration,
    InterfacePower,
    InterfaceAssociation,
    Bos,
    DeviceCapability,
    Hid,
    Report,
    Unknown(u8),
}

impl From<u8> for UsbDescriptorType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => UsbDescriptorType::Device,
            0x02 => UsbDescriptorType::Configuration,
            0x03 => UsbDescriptorType::String,
            0x04 => UsbDescriptorType::Interface,
            0x05 => UsbDescriptorType::Endpoint,
            0x06 => UsbDescriptorType::DeviceQualifier,
            0x07 => UsbDescriptorType::OtherSpeedConfiguration,
            0x08 => UsbDescriptorType::InterfacePower,
            0x0B => UsbDescriptorType::InterfaceAssociation,
            0x0F => UsbDescriptorType::Bos,
            0x10 => UsbDescriptorType::DeviceCapability,
            0x21 => UsbDescriptorType::Hid,
            0x22 => UsbDescriptorType::Report,
            _ => UsbDescriptorType::Unknown(value),
        }
    }
}

impl fmt::UpperHex for UsbDescriptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.get_value())
    }
}

impl UsbDescriptorType {
    pub fn get_value(&self) -> u8 {
        match self {
            UsbDescriptorType::Device => 0x01,
            UsbDescriptorType::Configuration => 0x02,
            UsbDescriptorType::String => 0x03,
            UsbDescriptorType::Interface => 0x04,
            UsbDescriptorType::Endpoint => 0x05,
            UsbDescriptorType::DeviceQualifier => 0x06,
            UsbDescriptorType::OtherSpeedConfiguration => 0x07,
            UsbDescriptorType::InterfacePower => 0x08,
            UsbDescriptorType::InterfaceAssociation => 0x0B,
            UsbDescriptorType::Bos => 0x0F,
            UsbDescriptorType::DeviceCapability => 0x10,
            UsbDescriptorType::Hid => 0x21,
            UsbDescriptorType::Report => 0x22,
            UsbDescriptorType::Unknown(value) => *value,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UsbDescriptorType::Device => "DEVICE",
            UsbDescriptorType::Configuration => "CONFIGURATION",
            UsbDescriptorType::String => "STRING",
            UsbDescriptorType::Interface => "INTERFACE",
            UsbDescriptorType::Endpoint => "ENDPOINT",
            UsbDescriptorType::DeviceQualifier => "DEVICE_QUALIFIER",
            UsbDescriptorType::OtherSpeedConfiguration => "OTHER_SPEED_CONFIGURATION",
            UsbDescriptorType::InterfacePower => "INTERFACE_POWER",
            UsbDescriptorType::InterfaceAssociation => "INTERFACE_ASSOCIATION",
            UsbDescriptorType::Bos => "BOS",
            UsbDescriptorType::DeviceCapability => "DEVICE_CAPABILITY",
            UsbDescriptorType::Hid => "HID",
            UsbDescriptorType::Report => "REPORT",
            UsbDescriptorType::Unknown(_) => "UNKNOWN",
        }
    }
}
