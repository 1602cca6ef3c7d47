//! The device model: device descriptor, configuration slots and string table.
//!
//! A model is either read from a live device through a [`ControlPort`]
//! ([`UsbDevice::from_port`]) or assembled in memory for emulation
//! ([`UsbDevice::new`] followed by [`UsbDevice::add_configuration`] and
//! [`UsbDevice::add_string`]). Queries on slots or strings that were never
//! populated return `None`.

use std::fmt;
use std::rc::Rc;

use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;

use crate::data::language_ids::describe_language;
use crate::port::ControlPort;
use crate::usb::configuration::Configuration;
use crate::usb::descriptor_types::UsbDescriptorType;
use crate::usb::descriptors::{
    ConfigurationDescriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor,
    DEVICE_DESCRIPTOR_SIZE,
};
use crate::usb::error::{Error, Result};
use crate::usb::request::UsbSetupPacket;
use crate::usb::string::UsbString;
use crate::usb::string_table::StringTable;

pub struct UsbDevice {
    descriptor: DeviceDescriptor,
    // Slot i holds the configuration whose bConfigurationValue is i + 1.
    configurations: Vec<Option<Configuration>>,
    port: Option<Rc<dyn ControlPort>>,
    strings: StringTable,
}

impl fmt::Debug for UsbDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsbDevice")
            .field("descriptor", &self.descriptor)
            .field("configurations", &self.configurations)
            .field("has_port", &self.port.is_some())
            .field("strings", &self.strings)
            .finish()
    }
}

fn empty_slots(count: u8) -> Vec<Option<Configuration>> {
    let mut slots = Vec::new();
    slots.resize_with(usize::from(count), || None);
    slots
}

impl UsbDevice {
    /// Reads the device descriptor, the language list, every string the
    /// descriptors reference and every configuration through `port`.
    ///
    /// Descriptor and configuration failures abort construction. String
    /// failures are logged and leave the affected strings unregistered.
    pub fn from_port(port: Rc<dyn ControlPort>) -> Result<Self> {
        let setup = UsbSetupPacket::get_descriptor(
            UsbDescriptorType::Device,
            0,
            0,
            DEVICE_DESCRIPTOR_SIZE as u16,
        );
        let data = port.control_request(&setup)?;
        let descriptor = DeviceDescriptor::parse(&data).ok_or(Error::ShortDescriptor {
            kind: "device",
            expected: DEVICE_DESCRIPTOR_SIZE,
            actual: data.len(),
        })?;
        info!(
            "Device VID:{:04x} PID:{:04x} with {} configuration(s)",
            descriptor.id_vendor, descriptor.id_product, descriptor.b_num_configurations
        );

        let mut device = UsbDevice {
            descriptor,
            configurations: empty_slots(descriptor.b_num_configurations),
            port: Some(Rc::clone(&port)),
            strings: StringTable::new(descriptor.max_string_index()),
        };

        if let Err(e) = device.fetch_string(0, 0) {
            warn!("Could not read supported languages: {}", e);
        }

        for index in [
            descriptor.i_manufacturer,
            descriptor.i_product,
            descriptor.i_serial_number,
        ] {
            if index != 0 {
                device.register_string(index);
            }
        }

        for i in 0..descriptor.b_num_configurations {
            let config = Configuration::from_port(&*port, i)?;
            for index in config.string_indexes() {
                device.register_string(index);
            }
            if let Some(previous) = device.add_configuration(config)? {
                warn!(
                    "Configuration value {} declared twice, keeping the later one",
                    previous.configuration_value()
                );
            }
        }

        Ok(device)
    }

    /// An emulated device with no port. Configurations and strings are added
    /// later; the language list starts as English (US) only.
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        UsbDevice {
            descriptor,
            configurations: empty_slots(descriptor.b_num_configurations),
            port: None,
            strings: StringTable::with_default_language(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_fields(
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
        UsbDevice::new(DeviceDescriptor::new(
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
        ))
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn port(&self) -> Option<&dyn ControlPort> {
        self.port.as_deref()
    }

    /// Stores `config` in the slot for its configuration value and returns the
    /// configuration it displaced, if any.
    pub fn add_configuration(&mut self, config: Configuration) -> Result<Option<Configuration>> {
        let value = config.configuration_value();
        let count = self.descriptor.b_num_configurations;
        if value == 0 || value > count {
            return Err(Error::InvalidConfigurationValue { value, count });
        }

        let previous = self.configurations[usize::from(value - 1)].replace(config);
        if previous.is_some() {
            debug!("Replaced configuration {}", value);
        }
        Ok(previous)
    }

    /// The configuration with configuration value `value` (1-based).
    pub fn configuration(&self, value: u8) -> Option<&Configuration> {
        let slot = usize::from(value.checked_sub(1)?);
        self.configurations.get(slot)?.as_ref()
    }

    pub fn configuration_mut(&mut self, value: u8) -> Option<&mut Configuration> {
        let slot = usize::from(value.checked_sub(1)?);
        self.configurations.get_mut(slot)?.as_mut()
    }

    /// Empties the slot for `value` and hands its configuration to the caller.
    pub fn take_configuration(&mut self, value: u8) -> Option<Configuration> {
        let slot = usize::from(value.checked_sub(1)?);
        self.configurations.get_mut(slot)?.take()
    }

    /// Populated configurations, by configuration value.
    pub fn configurations(&self) -> impl Iterator<Item = &Configuration> {
        self.configurations.iter().flatten()
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn add_string(&mut self, record: UsbString) -> Result<()> {
        self.strings.add_string(record)
    }

    pub fn fetch_string(&mut self, index: u8, language_id: u16) -> Result<()> {
        self.strings
            .fetch_string(self.port.as_deref(), index, language_id)
    }

    pub fn fetch_string_all_languages(&mut self, index: u8) -> Result<usize> {
        self.strings
            .fetch_string_all_languages(self.port.as_deref(), index)
    }

    fn register_string(&mut self, index: u8) {
        if let Err(e) = self.fetch_string_all_languages(index) {
            warn!("String {} incomplete: {}", index, e);
        }
    }

    pub fn string(&self, index: u8, language_id: u16) -> Option<&UsbString> {
        self.strings.get_string(index, language_id)
    }

    fn indexed_string(&self, index: u8, language_id: Option<u16>) -> Option<&UsbString> {
        if index == 0 {
            return None;
        }
        self.strings.get_string(index, language_id.unwrap_or(0))
    }

    /// Manufacturer string in `language_id`, or the first supported language.
    pub fn manufacturer_string(&self, language_id: Option<u16>) -> Option<&UsbString> {
        self.indexed_string(self.descriptor.i_manufacturer, language_id)
    }

    pub fn product_string(&self, language_id: Option<u16>) -> Option<&UsbString> {
        self.indexed_string(self.descriptor.i_product, language_id)
    }

    pub fn serial_string(&self, language_id: Option<u16>) -> Option<&UsbString> {
        self.indexed_string(self.descriptor.i_serial_number, language_id)
    }

    pub fn add_language(&mut self, language_id: u16) {
        self.strings.add_language(language_id)
    }

    pub fn language_count(&self) -> usize {
        self.strings.language_count()
    }

    pub fn language_by_index(&self, i: usize) -> u16 {
        self.strings.language_by_index(i)
    }

    pub fn summary(&self, language_id: Option<u16>) -> DeviceSummary {
        let text = |index: u8| {
            self.indexed_string(index, language_id)
                .map(UsbString::to_string_lossy)
        };

        DeviceSummary {
            descriptor: self.descriptor,
            manufacturer: text(self.descriptor.i_manufacturer),
            product: text(self.descriptor.i_product),
            serial_number: text(self.descriptor.i_serial_number),
            languages: self.strings.languages().to_vec(),
            configurations: self
                .configurations()
                .map(|config| ConfigurationSummary {
                    descriptor: *config.descriptor(),
                    name: text(config.descriptor().i_configuration),
                    interfaces: config
                        .interfaces()
                        .map(|alt| InterfaceSummary {
                            descriptor: *alt.descriptor(),
                            name: text(alt.descriptor().i_interface),
                            endpoints: alt.endpoints().to_vec(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub descriptor: DeviceDescriptor,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub languages: Vec<u16>,
    pub configurations: Vec<ConfigurationSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationSummary {
    pub descriptor: ConfigurationDescriptor,
    pub name: Option<String>,
    pub interfaces: Vec<InterfaceSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceSummary {
    pub descriptor: InterfaceDescriptor,
    pub name: Option<String>,
    pub endpoints: Vec<EndpointDescriptor>,
}

impl fmt::Display for UsbDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self
            .descriptor
            .to_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .join(" ");
        writeln!(f, "Device: {}", raw)?;
        writeln!(f, "  {}", self.descriptor)?;

        let labelled = [
            ("Manufacturer", self.manufacturer_string(None)),
            ("Product", self.product_string(None)),
            ("Serial", self.serial_string(None)),
        ];
        for (label, string) in labelled {
            if let Some(string) = string {
                writeln!(f, "  {:<13} {}", format!("{}:", label), string.to_ascii())?;
            }
        }

        let languages = self
            .strings
            .languages()
            .iter()
            .map(|&id| describe_language(id))
            .join(", ");
        writeln!(f, "  {:<13} {}", "Languages:", languages)?;

        let name = |index: u8| match self.indexed_string(index, None) {
            Some(s) => format!(" \"{}\"", s.to_ascii()),
            None => String::new(),
        };
        for config in self.configurations() {
            writeln!(f, "    {}{}", config.descriptor(), name(config.descriptor().i_configuration))?;
            for alt in config.interfaces() {
                writeln!(f, "      {}{}", alt.descriptor(), name(alt.descriptor().i_interface))?;
                for endpoint in alt.endpoints() {
                    writeln!(f, "        {}", endpoint)?;
                }
            }
        }
        Ok(())
    }
}
