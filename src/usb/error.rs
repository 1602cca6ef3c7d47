use thiserror::Error;

use crate::port::PortError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("control transfer failed: {0}")]
    Port(#[from] PortError),

    #[error("short {kind} descriptor: expected {expected} bytes, got {actual}")]
    ShortDescriptor {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("malformed {kind} descriptor: {reason}")]
    MalformedDescriptor { kind: &'static str, reason: String },

    #[error("configuration value {value} out of range (device declares {count} configurations)")]
    InvalidConfigurationValue { value: u8, count: u8 },

    #[error("no control port attached, cannot fetch string {index} (language 0x{language:04X})")]
    NoPort { index: u8, language: u16 },

    #[error("string index 0 is reserved for the language list (got language 0x{language:04X})")]
    ReservedStringIndex { language: u16 },
}
