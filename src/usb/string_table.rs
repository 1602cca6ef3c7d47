//! Sparse (string index × language id) table of string descriptors.
//!
//! Slot 0 always holds the language list, every other occupied slot holds the
//! text records for that index, one per language. A text slot is only created
//! by inserting a record and records are never removed individually, so an
//! occupied text slot always has at least one record.

use log::{debug, warn};

use crate::port::ControlPort;
use crate::usb::error::{Error, Result};
use crate::usb::string::UsbString;

/// LANGID for English (United States).
pub const DEFAULT_LANGUAGE_ID: u16 = 0x0409;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringEntry {
    LanguageList(UsbString),
    Text(Vec<UsbString>),
}

#[derive(Debug, Clone)]
pub struct StringTable {
    entries: Vec<Option<StringEntry>>,
}

impl StringTable {
    /// An empty table with room for indexes up to `max_string_index`.
    pub fn new(max_string_index: u8) -> Self {
        let mut entries = Vec::new();
        entries.resize_with(usize::from(max_string_index) + 1, || None);
        StringTable { entries }
    }

    /// A table whose language list is `[DEFAULT_LANGUAGE_ID]`.
    pub fn with_default_language() -> Self {
        let mut table = StringTable::new(0);
        table.entries[0] = Some(StringEntry::LanguageList(UsbString::from_languages(&[
            DEFAULT_LANGUAGE_ID,
        ])));
        table
    }

    pub fn max_string_index(&self) -> u8 {
        // entries is never empty and never grows past index 255
        (self.entries.len() - 1) as u8
    }

    /// Makes room for `index`. Existing entries are kept as they are.
    pub fn grow(&mut self, index: u8) {
        let needed = usize::from(index) + 1;
        if needed > self.entries.len() {
            debug!(
                "Growing string table from {} to {} slots",
                self.entries.len(),
                needed
            );
            self.entries.resize_with(needed, || None);
        }
    }

    pub fn language_list(&self) -> Option<&UsbString> {
        match self.entries.first() {
            Some(Some(StringEntry::LanguageList(list))) => Some(list),
            _ => None,
        }
    }

    fn language_list_mut(&mut self) -> Option<&mut UsbString> {
        match self.entries.first_mut() {
            Some(Some(StringEntry::LanguageList(list))) => Some(list),
            _ => None,
        }
    }

    pub fn languages(&self) -> &[u16] {
        self.language_list()
            .map(UsbString::language_ids)
            .unwrap_or(&[])
    }

    pub fn language_count(&self) -> usize {
        self.languages().len()
    }

    /// The `i`-th supported language, or 0 when out of range.
    pub fn language_by_index(&self, i: usize) -> u16 {
        self.languages().get(i).copied().unwrap_or(0)
    }

    /// The first supported language, used when a caller asks for language 0.
    pub fn default_language(&self) -> Option<u16> {
        self.languages().first().copied()
    }

    /// Adds `language_id` to the language list unless it is already there.
    ///
    /// Language 0 is the "unresolved default" placeholder and is never listed.
    pub fn add_language(&mut self, language_id: u16) {
        if language_id == 0 {
            return;
        }

        match self.language_list_mut() {
            Some(list) => {
                if list.units().contains(&language_id) {
                    return;
                }
                if !list.append_char(language_id) {
                    warn!(
                        "Language list full, not adding language 0x{:04X}",
                        language_id
                    );
                }
            }
            None => {
                self.entries[0] = Some(StringEntry::LanguageList(UsbString::from_languages(
                    &[language_id],
                )));
            }
        }
    }

    /// Registers `record`, replacing any record with the same index and language.
    pub fn add_string(&mut self, record: UsbString) -> Result<()> {
        let index = record.index();
        let language_id = record.language_id();

        if index == 0 {
            if language_id != 0 {
                return Err(Error::ReservedStringIndex { language: language_id });
            }
            debug!("Language list set to [{}]", record);
            self.entries[0] = Some(StringEntry::LanguageList(record));
            return Ok(());
        }

        self.add_language(language_id);
        self.grow(index);

        match &mut self.entries[usize::from(index)] {
            Some(StringEntry::Text(records)) => {
                match records
                    .iter_mut()
                    .find(|existing| existing.language_id() == language_id)
                {
                    Some(existing) => *existing = record,
                    None => records.push(record),
                }
            }
            slot => *slot = Some(StringEntry::Text(vec![record])),
        }
        Ok(())
    }

    /// Fetches `(index, language_id)` through `port` and registers it.
    ///
    /// Without a port nothing is fetched and the table is left untouched.
    pub fn fetch_string(
        &mut self,
        port: Option<&dyn ControlPort>,
        index: u8,
        language_id: u16,
    ) -> Result<()> {
        let port = match port {
            Some(port) => port,
            None => {
                warn!("Can't automatically add string {}, no device port defined", index);
                return Err(Error::NoPort {
                    index,
                    language: language_id,
                });
            }
        };

        let record = UsbString::fetch(port, index, language_id)?;
        self.add_string(record)
    }

    /// Fetches `index` in every supported language and returns how many
    /// records were registered.
    ///
    /// Before the language list is known this degrades to a single fetch for
    /// language 0. Every language is attempted; the first failure is returned.
    pub fn fetch_string_all_languages(
        &mut self,
        port: Option<&dyn ControlPort>,
        index: u8,
    ) -> Result<usize> {
        if index == 0 {
            self.fetch_string(port, 0, 0)?;
            return Ok(1);
        }

        let languages = match self.language_list() {
            Some(list) => list.language_ids().to_vec(),
            None => vec![0],
        };

        let mut registered = 0;
        let mut first_error = None;
        for language_id in languages {
            match self.fetch_string(port, index, language_id) {
                Ok(()) => registered += 1,
                Err(e) => {
                    debug!(
                        "String {} (language 0x{:04X}) not registered: {}",
                        index, language_id, e
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(registered),
        }
    }

    /// Looks up `(index, language_id)`. Language 0 on a text index resolves to
    /// the first supported language.
    pub fn get_string(&self, index: u8, language_id: u16) -> Option<&UsbString> {
        match self.entries.get(usize::from(index))?.as_ref()? {
            StringEntry::LanguageList(list) => (language_id == 0).then_some(list),
            StringEntry::Text(records) => {
                let language_id = if language_id == 0 {
                    self.default_language().unwrap_or(0)
                } else {
                    language_id
                };
                records
                    .iter()
                    .find(|record| record.language_id() == language_id)
            }
        }
    }

    /// Text records registered for `index`, in insertion order.
    pub fn records(&self, index: u8) -> &[UsbString] {
        match self.entries.get(usize::from(index)) {
            Some(Some(StringEntry::Text(records))) => records,
            _ => &[],
        }
    }

    /// Every text record, by index then insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &UsbString> {
        self.entries.iter().flat_map(|entry| match entry {
            Some(StringEntry::Text(records)) => records.as_slice(),
            _ => &[][..],
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockPort;

    fn text(index: u8, language_id: u16, s: &str) -> UsbString {
        UsbString::from_text(index, language_id, s)
    }

    #[test]
    fn default_table_lists_english() {
        let table = StringTable::with_default_language();
        assert_eq!(table.languages(), &[DEFAULT_LANGUAGE_ID]);
        assert_eq!(table.default_language(), Some(0x0409));
        assert!(table.is_empty());
        assert_eq!(table.get_string(0, 0).unwrap().language_ids(), &[0x0409]);
    }

    #[test]
    fn add_language_is_idempotent() {
        let mut table = StringTable::with_default_language();
        table.add_language(0x0407);
        table.add_language(0x0407);
        assert_eq!(table.language_count(), 2);
        assert_eq!(table.language_by_index(1), 0x0407);
        assert_eq!(table.language_by_index(2), 0);
    }

    #[test]
    fn add_string_registers_its_language() {
        let mut table = StringTable::with_default_language();
        table.add_string(text(1, 0x040C, "Bonjour")).unwrap();
        assert_eq!(table.languages(), &[0x0409, 0x040C]);
    }

    #[test]
    fn replaces_same_language_in_place() {
        let mut table = StringTable::with_default_language();
        table.add_string(text(1, 0x0409, "old")).unwrap();
        table.add_string(text(1, 0x0407, "alt")).unwrap();
        table.add_string(text(1, 0x0409, "new")).unwrap();

        let records: Vec<_> = table.records(1).iter().map(UsbString::to_string_lossy).collect();
        assert_eq!(records, vec!["new", "alt"]);
    }

    #[test]
    fn growth_preserves_lower_indexes() {
        let mut table = StringTable::new(1);
        table.add_string(text(1, 0x0409, "low")).unwrap();
        table.add_string(text(200, 0x0409, "high")).unwrap();

        assert_eq!(table.max_string_index(), 200);
        assert_eq!(table.get_string(1, 0x0409).unwrap().to_string_lossy(), "low");
        assert_eq!(table.get_string(200, 0x0409).unwrap().to_string_lossy(), "high");
        assert!(table.get_string(100, 0x0409).is_none());
        assert!(table.get_string(255, 0x0409).is_none());
    }

    #[test]
    fn grow_never_shrinks() {
        let mut table = StringTable::new(10);
        table.grow(3);
        assert_eq!(table.max_string_index(), 10);
    }

    #[test]
    fn language_zero_resolves_to_first_language() {
        let mut table = StringTable::with_default_language();
        table.add_string(text(2, 0x0409, "Widget")).unwrap();
        table.add_string(text(2, 0x0407, "Gerät")).unwrap();
        assert_eq!(table.get_string(2, 0), table.get_string(2, 0x0409));
    }

    #[test]
    fn index_zero_only_holds_language_list() {
        let mut table = StringTable::with_default_language();
        assert!(matches!(
            table.add_string(text(0, 0x0409, "nope")),
            Err(Error::ReservedStringIndex { language: 0x0409 })
        ));
        assert!(table.get_string(0, 0x0409).is_none());

        table
            .add_string(UsbString::from_languages(&[0x0407, 0x0409]))
            .unwrap();
        assert_eq!(table.default_language(), Some(0x0407));
    }

    #[test]
    fn fetch_without_port_leaves_table_unchanged() {
        let mut table = StringTable::with_default_language();
        assert!(matches!(
            table.fetch_string(None, 1, 0x0409),
            Err(Error::NoPort { index: 1, .. })
        ));
        assert!(matches!(
            table.fetch_string_all_languages(None, 1),
            Err(Error::NoPort { .. })
        ));
        assert!(table.is_empty());
        assert_eq!(table.max_string_index(), 0);
    }

    #[test]
    fn fan_out_covers_every_language() {
        let port = MockPort::new()
            .with_string(3, 0x0409, "Serial")
            .with_string(3, 0x0407, "Seriennummer")
            .with_string(3, 0x040C, "Série");
        let mut table = StringTable::with_default_language();
        table.add_language(0x0407);
        table.add_language(0x040C);

        assert_eq!(table.fetch_string_all_languages(Some(&port), 3).unwrap(), 3);
        for &language in &[0x0409, 0x0407, 0x040C] {
            assert!(table.get_string(3, language).is_some());
        }
        assert_eq!(port.request_count(), 3);
    }

    #[test]
    fn fan_out_keeps_going_after_a_failure() {
        let port = MockPort::new().with_string(3, 0x0407, "Seriennummer");
        let mut table = StringTable::with_default_language();
        table.add_language(0x0407);

        assert!(table.fetch_string_all_languages(Some(&port), 3).is_err());
        assert!(table.get_string(3, 0x0409).is_none());
        assert!(table.get_string(3, 0x0407).is_some());
    }

    #[test]
    fn fan_out_before_language_list_uses_language_zero() {
        let port = MockPort::new().with_string(1, 0, "Acme");
        let mut table = StringTable::new(1);

        assert_eq!(table.fetch_string_all_languages(Some(&port), 1).unwrap(), 1);
        assert!(table.language_list().is_none());
        assert_eq!(table.get_string(1, 0).unwrap().to_string_lossy(), "Acme");
    }
}
