use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

use crate::port::ControlPort;
use crate::usb::descriptor_types::UsbDescriptorType;
use crate::usb::error::{Error, Result};
use crate::usb::request::UsbSetupPacket;

/// Largest number of UTF-16 units a string descriptor can carry (bLength is a u8).
pub const MAX_STRING_UNITS: usize = (u8::MAX as usize - 2) / 2;

/// wLength used when fetching string descriptors.
pub const STRING_REQUEST_LENGTH: u16 = 0xFF;

/// A string descriptor tagged with the (index, language) it was fetched for.
///
/// For index 0 the payload is the device's list of supported language ids
/// instead of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbString {
    index: u8,
    language_id: u16,
    units: Vec<u16>,
}

impl UsbString {
    pub fn new(index: u8, language_id: u16, mut units: Vec<u16>) -> Self {
        if units.len() > MAX_STRING_UNITS {
            warn!(
                "String {} (language 0x{:04X}) has {} UTF-16 units, truncating to {}",
                index,
                language_id,
                units.len(),
                MAX_STRING_UNITS
            );
            units.truncate(MAX_STRING_UNITS);
        }
        UsbString {
            index,
            language_id,
            units,
        }
    }

    pub fn from_text(index: u8, language_id: u16, text: &str) -> Self {
        UsbString::new(index, language_id, text.encode_utf16().collect())
    }

    /// The index-0 descriptor listing `languages`.
    pub fn from_languages(languages: &[u16]) -> Self {
        UsbString::new(0, 0, languages.to_vec())
    }

    /// Decodes a raw string descriptor.
    pub fn parse(data: &[u8], index: u8, language_id: u16) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::ShortDescriptor {
                kind: "string",
                expected: 2,
                actual: data.len(),
            });
        }

        let length = usize::from(data[0]);
        if data[1] != UsbDescriptorType::String.get_value() {
            return Err(Error::MalformedDescriptor {
                kind: "string",
                reason: format!("descriptor type 0x{:02X}", data[1]),
            });
        }
        if length < 2 {
            return Err(Error::MalformedDescriptor {
                kind: "string",
                reason: format!("bLength {}", length),
            });
        }
        if data.len() < length {
            return Err(Error::ShortDescriptor {
                kind: "string",
                expected: length,
                actual: data.len(),
            });
        }

        // An odd trailing byte is not part of any code unit.
        let units = data[2..length]
            .chunks_exact(2)
            .map(LittleEndian::read_u16)
            .collect();

        Ok(UsbString::new(index, language_id, units))
    }

    /// Fetches string `index` in `language_id` through `port`.
    pub fn fetch(port: &dyn ControlPort, index: u8, language_id: u16) -> Result<Self> {
        let setup = UsbSetupPacket::get_descriptor(
            UsbDescriptorType::String,
            index,
            language_id,
            STRING_REQUEST_LENGTH,
        );
        debug!("Fetching string {} (language 0x{:04X})", index, language_id);
        let data = port.control_request(&setup)?;
        UsbString::parse(&data, index, language_id)
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn language_id(&self) -> u16 {
        self.language_id
    }

    pub fn is_language_list(&self) -> bool {
        self.index == 0
    }

    /// Raw UTF-16 code units; for index 0, the language ids.
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    pub fn char_count(&self) -> usize {
        self.units.len()
    }

    /// bLength of the encoded descriptor.
    pub fn descriptor_length(&self) -> u8 {
        (2 + 2 * self.units.len()) as u8
    }

    /// Supported language ids; empty unless this is the index-0 descriptor.
    pub fn language_ids(&self) -> &[u16] {
        if self.is_language_list() {
            &self.units
        } else {
            &[]
        }
    }

    pub(crate) fn append_char(&mut self, unit: u16) -> bool {
        if self.units.len() >= MAX_STRING_UNITS {
            return false;
        }
        self.units.push(unit);
        true
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; usize::from(self.descriptor_length())];
        buf[0] = self.descriptor_length();
        buf[1] = UsbDescriptorType::String.get_value();
        for (chunk, unit) in buf[2..].chunks_exact_mut(2).zip(&self.units) {
            LittleEndian::write_u16(chunk, *unit);
        }
        buf
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    /// ASCII rendering; units outside printable ASCII become '?'.
    pub fn to_ascii(&self) -> String {
        self.units
            .iter()
            .map(|&unit| match unit {
                0x20..=0x7E => unit as u8 as char,
                _ => '?',
            })
            .collect()
    }
}

impl fmt::Display for UsbString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_language_list() {
            for (i, language) in self.units.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "0x{:04X}", language)?;
            }
            Ok(())
        } else {
            write!(f, "{}", self.to_string_lossy())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_descriptor() {
        let s = UsbString::parse(&[10, 3, b'A', 0, b'c', 0, b'm', 0, b'e', 0], 1, 0x0409).unwrap();
        assert_eq!(s.index(), 1);
        assert_eq!(s.language_id(), 0x0409);
        assert_eq!(s.char_count(), 4);
        assert_eq!(s.to_string_lossy(), "Acme");
        assert!(s.language_ids().is_empty());
    }

    #[test]
    fn parses_language_list() {
        let s = UsbString::parse(&[6, 3, 0x09, 0x04, 0x07, 0x04], 0, 0).unwrap();
        assert!(s.is_language_list());
        assert_eq!(s.language_ids(), &[0x0409, 0x0407]);
        assert_eq!(s.to_string(), "0x0409 0x0407");
    }

    #[test]
    fn ignores_bytes_past_blength() {
        let s = UsbString::parse(&[4, 3, b'h', 0, b'x', 0], 3, 0x0409).unwrap();
        assert_eq!(s.to_string_lossy(), "h");
    }

    #[test]
    fn rejects_bad_descriptors() {
        assert!(matches!(
            UsbString::parse(&[4], 1, 0x0409),
            Err(Error::ShortDescriptor { .. })
        ));
        assert!(matches!(
            UsbString::parse(&[4, 2, 0, 0], 1, 0x0409),
            Err(Error::MalformedDescriptor { .. })
        ));
        assert!(matches!(
            UsbString::parse(&[10, 3, b'A', 0], 1, 0x0409),
            Err(Error::ShortDescriptor { expected: 10, actual: 4, .. })
        ));
    }

    #[test]
    fn encodes_descriptor() {
        let s = UsbString::from_text(2, 0x0409, "Hi");
        assert_eq!(s.to_bytes(), vec![6, 3, b'H', 0, b'i', 0]);
        assert_eq!(s.descriptor_length(), 6);
    }

    #[test]
    fn ascii_replaces_non_ascii() {
        let s = UsbString::from_text(1, 0x0409, "Größe");
        assert_eq!(s.to_ascii(), "Gr??e");
    }

    #[test]
    fn long_text_is_cut_to_descriptor_limit() {
        let text = "x".repeat(MAX_STRING_UNITS + 10);
        let s = UsbString::from_text(1, 0x0409, &text);
        assert_eq!(s.char_count(), MAX_STRING_UNITS);
        assert_eq!(s.descriptor_length(), 254);
        assert_eq!(s.to_string_lossy(), &text[..MAX_STRING_UNITS]);
    }

    #[test]
    fn append_stops_at_descriptor_limit() {
        let mut s = UsbString::new(0, 0, vec![0x0409; MAX_STRING_UNITS]);
        assert!(!s.append_char(0x0407));
        assert_eq!(s.char_count(), MAX_STRING_UNITS);
    }
}
