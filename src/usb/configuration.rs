//! Configuration descriptor sets. Nodes hold string indexes only; the text
//! behind `iConfiguration` and `iInterface` is looked up through `UsbDevice`.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use serde::Serialize;

use crate::port::ControlPort;
use crate::usb::descriptor_types::UsbDescriptorType;
use crate::usb::descriptors::{
    ConfigurationDescriptor, EndpointDescriptor, InterfaceDescriptor,
    CONFIGURATION_DESCRIPTOR_SIZE, ENDPOINT_DESCRIPTOR_SIZE,
};
use crate::usb::error::{Error, Result};
use crate::usb::request::UsbSetupPacket;

/// One alternate setting of an interface, with its endpoints and any
/// class-specific descriptors that followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    descriptor: InterfaceDescriptor,
    endpoints: Vec<EndpointDescriptor>,
    extra: Vec<Vec<u8>>,
    // Parallel to `endpoints`.
    trailers: Vec<EndpointTrailer>,
}

/// Bytes that belong after an endpoint's standard seven: the audio
/// `bRefresh`/`bSynchAddress` tail, then any descriptors that followed it
/// (SuperSpeed companions, CS_ENDPOINT).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
struct EndpointTrailer {
    tail: Vec<u8>,
    extra: Vec<Vec<u8>>,
}

impl Interface {
    pub fn new(descriptor: InterfaceDescriptor) -> Self {
        Interface {
            descriptor,
            endpoints: Vec::new(),
            extra: Vec::new(),
            trailers: Vec::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: EndpointDescriptor) -> Self {
        self.push_endpoint(endpoint);
        self
    }

    /// Adds raw descriptors to be sent right after the most recent endpoint,
    /// or after the interface descriptor if there is no endpoint yet.
    pub fn with_extra(mut self, raw: Vec<u8>) -> Self {
        self.push_extra(raw);
        self
    }

    fn push_endpoint(&mut self, endpoint: EndpointDescriptor) {
        self.endpoints.push(endpoint);
        self.trailers.push(EndpointTrailer::default());
    }

    fn push_extra(&mut self, raw: Vec<u8>) {
        match self.trailers.last_mut() {
            Some(trailer) => trailer.extra.push(raw),
            None => self.extra.push(raw),
        }
    }

    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    /// Raw descriptors between the interface descriptor and its first endpoint.
    pub fn extra(&self) -> &[Vec<u8>] {
        &self.extra
    }

    /// Raw descriptors that followed endpoint `position`.
    pub fn endpoint_extra(&self, position: usize) -> &[Vec<u8>] {
        self.trailers
            .get(position)
            .map_or(&[][..], |trailer| trailer.extra.as_slice())
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        let d = &self.descriptor;
        buf.extend_from_slice(&[
            d.b_length,
            d.b_descriptor_type,
            d.b_interface_number,
            d.b_alternate_setting,
            d.b_num_endpoints,
            d.b_interface_class,
            d.b_interface_sub_class,
            d.b_interface_protocol,
            d.i_interface,
        ]);
        for raw in &self.extra {
            buf.extend_from_slice(raw);
        }
        for (ep, trailer) in self.endpoints.iter().zip(&self.trailers) {
            let mut packet_size = [0u8; 2];
            LittleEndian::write_u16(&mut packet_size, ep.w_max_packet_size);
            buf.extend_from_slice(&[
                ep.b_length,
                ep.b_descriptor_type,
                ep.b_endpoint_address,
                ep.bm_attributes,
                packet_size[0],
                packet_size[1],
                ep.b_interval,
            ]);
            buf.extend_from_slice(&trailer.tail);
            for raw in &trailer.extra {
                buf.extend_from_slice(raw);
            }
        }
    }
}

/// A configuration descriptor and everything it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    descriptor: ConfigurationDescriptor,
    // Outer index is bInterfaceNumber, inner lists are sorted by bAlternateSetting.
    interfaces: Vec<Vec<Interface>>,
    extra: Vec<Vec<u8>>,
}

impl Configuration {
    pub fn new(descriptor: ConfigurationDescriptor) -> Self {
        Configuration {
            descriptor,
            interfaces: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// Fetches configuration `index` (0-based, not its configuration value):
    /// first the header, then the full `wTotalLength` set.
    pub fn from_port(port: &dyn ControlPort, index: u8) -> Result<Self> {
        let setup = UsbSetupPacket::get_descriptor(
            UsbDescriptorType::Configuration,
            index,
            0,
            CONFIGURATION_DESCRIPTOR_SIZE as u16,
        );
        let header = port.control_request(&setup)?;
        let descriptor = ConfigurationDescriptor::parse(&header).ok_or(Error::ShortDescriptor {
            kind: "configuration",
            expected: CONFIGURATION_DESCRIPTOR_SIZE,
            actual: header.len(),
        })?;

        let total = descriptor.w_total_length;
        debug!(
            "Configuration {} (value {}) has {} bytes of descriptors",
            index, descriptor.b_configuration_value, total
        );

        let setup = UsbSetupPacket::get_descriptor(UsbDescriptorType::Configuration, index, 0, total);
        let data = port.control_request(&setup)?;
        if data.len() < usize::from(total) {
            return Err(Error::ShortDescriptor {
                kind: "configuration",
                expected: usize::from(total),
                actual: data.len(),
            });
        }

        Configuration::parse(&data[..usize::from(total)])
    }

    /// Decodes a full configuration descriptor set.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let descriptor = ConfigurationDescriptor::parse(data).ok_or(Error::ShortDescriptor {
            kind: "configuration",
            expected: CONFIGURATION_DESCRIPTOR_SIZE,
            actual: data.len(),
        })?;
        if descriptor.b_descriptor_type != UsbDescriptorType::Configuration.get_value() {
            return Err(Error::MalformedDescriptor {
                kind: "configuration",
                reason: format!("descriptor type 0x{:02X}", descriptor.b_descriptor_type),
            });
        }

        let mut config = Configuration::new(descriptor);
        let mut current: Option<Interface> = None;
        let mut offset = usize::from(descriptor.b_length).max(CONFIGURATION_DESCRIPTOR_SIZE);

        while offset + 2 <= data.len() {
            let length = usize::from(data[offset]);
            if length < 2 || offset + length > data.len() {
                return Err(Error::MalformedDescriptor {
                    kind: "configuration",
                    reason: format!("bad descriptor length {} at offset {}", length, offset),
                });
            }
            let body = &data[offset..offset + length];

            match UsbDescriptorType::from(body[1]) {
                UsbDescriptorType::Interface => {
                    let interface = InterfaceDescriptor::parse(body).ok_or_else(|| {
                        Error::MalformedDescriptor {
                            kind: "interface",
                            reason: format!("{} bytes", length),
                        }
                    })?;
                    if let Some(done) = current.replace(Interface::new(interface)) {
                        config.add_interface(done);
                    }
                }
                UsbDescriptorType::Endpoint => {
                    let endpoint = EndpointDescriptor::parse(body).ok_or_else(|| {
                        Error::MalformedDescriptor {
                            kind: "endpoint",
                            reason: format!("{} bytes", length),
                        }
                    })?;
                    match current.as_mut() {
                        Some(interface) => {
                            interface.push_endpoint(endpoint);
                            if let Some(trailer) = interface.trailers.last_mut() {
                                trailer.tail = body[ENDPOINT_DESCRIPTOR_SIZE..].to_vec();
                            }
                        }
                        None => config.extra.push(body.to_vec()),
                    }
                }
                _ => match current.as_mut() {
                    Some(interface) => interface.push_extra(body.to_vec()),
                    None => config.extra.push(body.to_vec()),
                },
            }

            offset += length;
        }

        if let Some(done) = current {
            config.add_interface(done);
        }
        Ok(config)
    }

    pub fn descriptor(&self) -> &ConfigurationDescriptor {
        &self.descriptor
    }

    pub fn configuration_value(&self) -> u8 {
        self.descriptor.b_configuration_value
    }

    /// Adds an alternate setting, replacing one with the same
    /// `(bInterfaceNumber, bAlternateSetting)`.
    pub fn add_interface(&mut self, interface: Interface) -> Option<Interface> {
        let number = usize::from(interface.descriptor.b_interface_number);
        if number >= self.interfaces.len() {
            self.interfaces.resize_with(number + 1, Vec::new);
        }

        let alternates = &mut self.interfaces[number];
        let setting = interface.descriptor.b_alternate_setting;
        match alternates.binary_search_by_key(&setting, |alt| alt.descriptor.b_alternate_setting) {
            Ok(pos) => Some(std::mem::replace(&mut alternates[pos], interface)),
            Err(pos) => {
                alternates.insert(pos, interface);
                None
            }
        }
    }

    pub fn interface_alternate_count(&self, number: u8) -> usize {
        self.interfaces
            .get(usize::from(number))
            .map_or(0, Vec::len)
    }

    /// The `alternate`-th setting (by position) of interface `number`.
    pub fn interface(&self, number: u8, alternate: usize) -> Option<&Interface> {
        self.interfaces.get(usize::from(number))?.get(alternate)
    }

    /// Every alternate setting of every interface.
    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter().flatten()
    }

    /// Non-zero string indexes referenced by this configuration: iConfiguration
    /// first, then each alternate's iInterface.
    pub fn string_indexes(&self) -> Vec<u8> {
        std::iter::once(self.descriptor.i_configuration)
            .chain(self.interfaces().map(|alt| alt.descriptor.i_interface))
            .filter(|&index| index != 0)
            .collect()
    }

    /// Encodes the full descriptor set with `wTotalLength` recomputed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.descriptor.to_bytes().to_vec();
        for raw in &self.extra {
            buf.extend_from_slice(raw);
        }
        for alt in self.interfaces() {
            alt.encode(&mut buf);
        }
        let total = buf.len() as u16;
        LittleEndian::write_u16(&mut buf[2..4], total);
        buf
    }
}
