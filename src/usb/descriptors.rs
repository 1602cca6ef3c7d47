use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::usb::descriptor_types::UsbDescriptorType;

pub const DEVICE_DESCRIPTOR_SIZE: usize = 18;
pub const CONFIGURATION_DESCRIPTOR_SIZE: usize = 9;
pub const INTERFACE_DESCRIPTOR_SIZE: usize = 9;
pub const ENDPOINT_DESCRIPTOR_SIZE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    #[serde(alias = "bLength")]
    pub b_length: u8,
    #[serde(alias = "bDescriptorType")]
    pub b_descriptor_type: u8,
    #[serde(alias = "bcdUSB")]
    pub bcd_usb: u16,
    #[serde(alias = "bDeviceClass")]
    pub b_device_class: u8,
    #[serde(alias = "bDeviceSubClass")]
    pub b_device_sub_class: u8,
    #[serde(alias = "bDeviceProtocol")]
    pub b_device_protocol: u8,
    #[serde(alias = "bMaxPacketSize0")]
    pub b_max_packet_size0: u8,
    #[serde(alias = "idVendor")]
    pub id_vendor: u16,
    #[serde(alias = "idProduct")]
    pub id_product: u16,
    #[serde(alias = "bcdDevice")]
    pub bcd_device: u16,
    #[serde(alias = "iManufacturer")]
    pub i_manufacturer: u8,
    #[serde(alias = "iProduct")]
    pub i_product: u8,
    #[serde(alias = "iSerialNumber")]
    pub i_serial_number: u8,
    #[serde(alias = "bNumConfigurations")]
    pub b_num_configurations: u8,
}

impl DeviceDescriptor {
    /// Builds a descriptor from explicit field values; the length and type
    /// bytes are filled in.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bcd_usb: u16,
        b_device_class: u8,
        b_device_sub_class: u8,
        b_device_protocol: u8,
        b_max_packet_size0: u8,
        id_vendor: u16,
        id_product: u16,
        bcd_device: u16,
        i_manufacturer: u8,
        i_product: u8,
        i_serial_number: u8,
        b_num_configurations: u8,
    ) -> Self {
        DeviceDescriptor {
            b_length: DEVICE_DESCRIPTOR_SIZE as u8,
            b_descriptor_type: UsbDescriptorType::Device.get_value(),
            bcd_usb,
            b_device_class,
            b_device_sub_class,
            b_device_protocol,
            b_max_packet_size0,
            id_vendor,
            id_product,
            bcd_device,
            i_manufacturer,
            i_product,
            i_serial_number,
            b_num_configurations,
        }
    }

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < DEVICE_DESCRIPTOR_SIZE {
            return None;
        }

        Some(DeviceDescriptor {
            b_length: data[0],
            b_descriptor_type: data[1],
            bcd_usb: LittleEndian::read_u16(&data[2..4]),
            b_device_class: data[4],
            b_device_sub_class: data[5],
            b_device_protocol: data[6],
            b_max_packet_size0: data[7],
            id_vendor: LittleEndian::read_u16(&data[8..10]),
            id_product: LittleEndian::read_u16(&data[10..12]),
            bcd_device: LittleEndian::read_u16(&data[12..14]),
            i_manufacturer: data[14],
            i_product: data[15],
            i_serial_number: data[16],
            b_num_configurations: data[17],
        })
    }

    pub fn to_bytes(&self) -> [u8; DEVICE_DESCRIPTOR_SIZE] {
        let mut buf = [0u8; DEVICE_DESCRIPTOR_SIZE];
        buf[0] = self.b_length;
        buf[1] = self.b_descriptor_type;
        LittleEndian::write_u16(&mut buf[2..4], self.bcd_usb);
        buf[4] = self.b_device_class;
        buf[5] = self.b_device_sub_class;
        buf[6] = self.b_device_protocol;
        buf[7] = self.b_max_packet_size0;
        LittleEndian::write_u16(&mut buf[8..10], self.id_vendor);
        LittleEndian::write_u16(&mut buf[10..12], self.id_product);
        LittleEndian::write_u16(&mut buf[12..14], self.bcd_device);
        buf[14] = self.i_manufacturer;
        buf[15] = self.i_product;
        buf[16] = self.i_serial_number;
        buf[17] = self.b_num_configurations;
        buf
    }

    /// Largest string index referenced directly by the device descriptor.
    pub fn max_string_index(&self) -> u8 {
        self.i_manufacturer
            .max(self.i_product)
            .max(self.i_serial_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationDescriptor {
    #[serde(alias = "bLength")]
    pub b_length: u8,
    #[serde(alias = "bDescriptorType")]
    pub b_descriptor_type: u8,
    #[serde(alias = "wTotalLength")]
    pub w_total_length: u16,
    #[serde(alias = "bNumInterfaces")]
    pub b_num_interfaces: u8,
    #[serde(alias = "bConfigurationValue")]
    pub b_configuration_value: u8,
    #[serde(alias = "iConfiguration")]
    pub i_configuration: u8,
    #[serde(alias = "bmAttributes")]
    pub bm_attributes: u8,
    #[serde(alias = "bMaxPower")]
    pub b_max_power: u8,
}

impl ConfigurationDescriptor {
    pub fn new(
        b_num_interfaces: u8,
        b_configuration_value: u8,
        i_configuration: u8,
        bm_attributes: u8,
        b_max_power: u8,
    ) -> Self {
        ConfigurationDescriptor {
            b_length: CONFIGURATION_DESCRIPTOR_SIZE as u8,
            b_descriptor_type: UsbDescriptorType::Configuration.get_value(),
            w_total_length: CONFIGURATION_DESCRIPTOR_SIZE as u16,
            b_num_interfaces,
            b_configuration_value,
            i_configuration,
            bm_attributes,
            b_max_power,
        }
    }

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < CONFIGURATION_DESCRIPTOR_SIZE {
            return None;
        }

        Some(ConfigurationDescriptor {
            b_length: data[0],
            b_descriptor_type: data[1],
            w_total_length: LittleEndian::read_u16(&data[2..4]),
            b_num_interfaces: data[4],
            b_configuration_value: data[5],
            i_configuration: data[6],
            bm_attributes: data[7],
            b_max_power: data[8],
        })
    }

    pub fn to_bytes(&self) -> [u8; CONFIGURATION_DESCRIPTOR_SIZE] {
        let mut buf = [0u8; CONFIGURATION_DESCRIPTOR_SIZE];
        buf[0] = self.b_length;
        buf[1] = self.b_descriptor_type;
        LittleEndian::write_u16(&mut buf[2..4], self.w_total_length);
        buf[4] = self.b_num_interfaces;
        buf[5] = self.b_configuration_value;
        buf[6] = self.i_configuration;
        buf[7] = self.bm_attributes;
        buf[8] = self.b_max_power;
        buf
    }

    pub fn is_self_powered(&self) -> bool {
        (self.bm_attributes & 0x40) != 0
    }

    pub fn supports_remote_wakeup(&self) -> bool {
        (self.bm_attributes & 0x20) != 0
    }

    pub fn max_power_ma(&self) -> u16 {
        u16::from(self.b_max_power) * 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    #[serde(alias = "bLength")]
    pub b_length: u8,
    #[serde(alias = "bDescriptorType")]
    pub b_descriptor_type: u8,
    #[serde(alias = "bInterfaceNumber")]
    pub b_interface_number: u8,
    #[serde(alias = "bAlternateSetting")]
    pub b_alternate_setting: u8,
    #[serde(alias = "bNumEndpoints")]
    pub b_num_endpoints: u8,
    #[serde(alias = "bInterfaceClass")]
    pub b_interface_class: u8,
    #[serde(alias = "bInterfaceSubClass")]
    pub b_interface_sub_class: u8,
    #[serde(alias = "bInterfaceProtocol")]
    pub b_interface_protocol: u8,
    #[serde(alias = "iInterface")]
    pub i_interface: u8,
}

impl InterfaceDescriptor {
    pub fn new(
        b_interface_number: u8,
        b_alternate_setting: u8,
        b_num_endpoints: u8,
        b_interface_class: u8,
        b_interface_sub_class: u8,
        b_interface_protocol: u8,
        i_interface: u8,
    ) -> Self {
        InterfaceDescriptor {
            b_length: INTERFACE_DESCRIPTOR_SIZE as u8,
            b_descriptor_type: UsbDescriptorType::Interface.get_value(),
            b_interface_number,
            b_alternate_setting,
            b_num_endpoints,
            b_interface_class,
            b_interface_sub_class,
            b_interface_protocol,
            i_interface,
        }
    }

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < INTERFACE_DESCRIPTOR_SIZE {
            return None;
        }

        Some(InterfaceDescriptor {
            b_length: data[0],
            b_descriptor_type: data[1],
            b_interface_number: data[2],
            b_alternate_setting: data[3],
            b_num_endpoints: data[4],
            b_interface_class: data[5],
            b_interface_sub_class: data[6],
            b_interface_protocol: data[7],
            i_interface: data[8],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    #[serde(alias = "bLength")]
    pub b_length: u8,
    #[serde(alias = "bDescriptorType")]
    pub b_descriptor_type: u8,
    #[serde(alias = "bEndpointAddress")]
    pub b_endpoint_address: u8,
    #[serde(alias = "bmAttributes")]
    pub bm_attributes: u8,
    #[serde(alias = "wMaxPacketSize")]
    pub w_max_packet_size: u16,
    #[serde(alias = "bInterval")]
    pub b_interval: u8,
}

impl EndpointDescriptor {
    pub fn new(b_endpoint_address: u8, bm_attributes: u8, w_max_packet_size: u16, b_interval: u8) -> Self {
        EndpointDescriptor {
            b_length: ENDPOINT_DESCRIPTOR_SIZE as u8,
            b_descriptor_type: UsbDescriptorType::Endpoint.get_value(),
            b_endpoint_address,
            bm_attributes,
            w_max_packet_size,
            b_interval,
        }
    }

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < ENDPOINT_DESCRIPTOR_SIZE {
            return None;
        }

        Some(EndpointDescriptor {
            b_length: data[0],
            b_descriptor_type: data[1],
            b_endpoint_address: data[2],
            bm_attributes: data[3],
            w_max_packet_size: LittleEndian::read_u16(&data[4..6]),
            b_interval: data[6],
        })
    }

    pub fn endpoint_number(&self) -> u8 {
        self.b_endpoint_address & 0x0F
    }

    pub fn is_in(&self) -> bool {
        (self.b_endpoint_address & 0x80) != 0
    }

    pub fn transfer_type(&self) -> &'static str {
        match self.bm_attributes & 0x03 {
            0 => "Control",
            1 => "Isochronous",
            2 => "Bulk",
            _ => "Interrupt",
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "USB {}.{} class 0x{:02X}/0x{:02X}/0x{:02X} ep0 {} VID:{:04X} PID:{:04X} rev {:04X}, {} configuration(s)",
            self.bcd_usb >> 8,
            (self.bcd_usb & 0xFF) >> 4,
            self.b_device_class,
            self.b_device_sub_class,
            self.b_device_protocol,
            self.b_max_packet_size0,
            self.id_vendor,
            self.id_product,
            self.bcd_device,
            self.b_num_configurations
        )
    }
}

impl fmt::Display for ConfigurationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Configuration {}: {} interface(s), {}mA{}{}",
            self.b_configuration_value,
            self.b_num_interfaces,
            self.max_power_ma(),
            if self.is_self_powered() { ", self-powered" } else { "" },
            if self.supports_remote_wakeup() { ", remote wakeup" } else { "" }
        )
    }
}

impl fmt::Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Interface {} alt {}: class 0x{:02X}/0x{:02X}/0x{:02X}, {} endpoint(s)",
            self.b_interface_number,
            self.b_alternate_setting,
            self.b_interface_class,
            self.b_interface_sub_class,
            self.b_interface_protocol,
            self.b_num_endpoints
        )
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Endpoint 0x{:02X} ({} {}) {}, max packet {}, interval {}",
            self.b_endpoint_address,
            self.endpoint_number(),
            if self.is_in() { "IN" } else { "OUT" },
            self.transfer_type(),
            self.w_max_packet_size,
            self.b_interval
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACME_DEVICE: [u8; 18] = [
        0x12, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x40, 0x34, 0x12, 0x78, 0x56, 0x00, 0x01,
        0x01, 0x02, 0x00, 0x01,
    ];

    #[test]
    fn parses_device_descriptor() {
        let desc = DeviceDescriptor::parse(&ACME_DEVICE).unwrap();
        assert_eq!(desc.bcd_usb, 0x0200);
        assert_eq!(desc.id_vendor, 0x1234);
        assert_eq!(desc.id_product, 0x5678);
        assert_eq!(desc.i_manufacturer, 1);
        assert_eq!(desc.i_product, 2);
        assert_eq!(desc.i_serial_number, 0);
        assert_eq!(desc.b_num_configurations, 1);
        assert_eq!(desc.max_string_index(), 2);
        assert_eq!(desc.to_bytes(), ACME_DEVICE);
    }

    #[test]
    fn rejects_short_device_descriptor() {
        assert!(DeviceDescriptor::parse(&ACME_DEVICE[..8]).is_none());
    }

    #[test]
    fn explicit_fields_fill_header() {
        let desc = DeviceDescriptor::new(0x0110, 0xFF, 1, 2, 8, 0x1D50, 0x615B, 0x0100, 1, 2, 3, 1);
        assert_eq!(desc.b_length, 18);
        assert_eq!(desc.b_descriptor_type, 0x01);
        assert_eq!(DeviceDescriptor::parse(&desc.to_bytes()), Some(desc));
    }

    #[test]
    fn deserializes_usb_field_names() {
        let json = r#"{
            "bLength": 18, "bDescriptorType": 1, "bcdUSB": 512, "bDeviceClass": 0,
            "bDeviceSubClass": 0, "bDeviceProtocol": 0, "bMaxPacketSize0": 64,
            "idVendor": 4660, "idProduct": 22136, "bcdDevice": 256,
            "iManufacturer": 1, "iProduct": 2, "iSerialNumber": 0, "bNumConfigurations": 1
        }"#;
        let desc: DeviceDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(desc.to_bytes(), ACME_DEVICE);
    }

    #[test]
    fn configuration_attributes() {
        let desc = ConfigurationDescriptor::parse(&[9, 2, 25, 0, 1, 1, 0, 0xE0, 50]).unwrap();
        assert_eq!(desc.w_total_length, 25);
        assert!(desc.is_self_powered());
        assert!(desc.supports_remote_wakeup());
        assert_eq!(desc.max_power_ma(), 100);
    }

    #[test]
    fn endpoint_address_decoding() {
        let desc = EndpointDescriptor::parse(&[7, 5, 0x81, 0x03, 8, 0, 10]).unwrap();
        assert_eq!(desc.endpoint_number(), 1);
        assert!(desc.is_in());
        assert_eq!(desc.transfer_type(), "Interrupt");
    }
}
