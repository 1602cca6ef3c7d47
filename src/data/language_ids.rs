use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref LANGUAGE_MAP: HashMap<u16, &'static str> = {
        let mut m = HashMap::new();

        // USB-IF LANGIDs (partial list - common locales)
        m.insert(0x0401, "Arabic (Saudi Arabia)");
        m.insert(0x0404, "Chinese (Taiwan)");
        m.insert(0x0405, "Czech");
        m.insert(0x0406, "Danish");
        m.insert(0x0407, "German (Standard)");
        m.insert(0x0408, "Greek");
        m.insert(0x0409, "English (US)");
        m.insert(0x040A, "Spanish (Traditional Sort)");
        m.insert(0x040B, "Finnish");
        m.insert(0x040C, "French (Standard)");
        m.insert(0x040D, "Hebrew");
        m.insert(0x040E, "Hungarian");
        m.insert(0x0410, "Italian (Standard)");
        m.insert(0x0411, "Japanese");
        m.insert(0x0412, "Korean");
        m.insert(0x0413, "Dutch (Netherlands)");
        m.insert(0x0414, "Norwegian (Bokmal)");
        m.insert(0x0415, "Polish");
        m.insert(0x0416, "Portuguese (Brazil)");
        m.insert(0x0419, "Russian");
        m.insert(0x041D, "Swedish");
        m.insert(0x041F, "Turkish");
        m.insert(0x0422, "Ukrainian");
        m.insert(0x0804, "Chinese (PRC)");
        m.insert(0x0809, "English (United Kingdom)");
        m.insert(0x080A, "Spanish (Mexican)");
        m.insert(0x0816, "Portuguese (Standard)");
        m.insert(0x0C07, "German (Austrian)");
        m.insert(0x0C09, "English (Australian)");
        m.insert(0x0C0A, "Spanish (Modern Sort)");
        m.insert(0x0C0C, "French (Canadian)");
        m.insert(0x1009, "English (Canadian)");
        m.insert(0x04FF, "HID (Usage Data Descriptor)");

        m
    };
}

pub fn lookup_language(language_id: u16) -> Option<&'static str> {
    LANGUAGE_MAP.get(&language_id).copied()
}

/// "0x0409 (English (US))", or just the hex id when the LANGID is unknown.
pub fn describe_language(language_id: u16) -> String {
    match lookup_language(language_id) {
        Some(name) => format!("0x{:04X} ({})", language_id, name),
        None => format!("0x{:04X}", language_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_common_languages() {
        assert_eq!(lookup_language(0x0409), Some("English (US)"));
        assert_eq!(describe_language(0x0407), "0x0407 (German (Standard))");
        assert_eq!(describe_language(0x7777), "0x7777");
    }
}
