pub mod configuration;
pub mod descriptor_types;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod request;
pub mod string;
pub mod string_table;

// Re-export commonly used types for easier access
pub use self::configuration::{Configuration, Interface};
pub use self::descriptor_types::UsbDescriptorType;
pub use self::descriptors::{
    ConfigurationDescriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor,
};
pub use self::device::{DeviceSummary, UsbDevice};
pub use self::error::{Error, Result};
pub use self::request::UsbSetupPacket;
pub use self::string::UsbString;
pub use self::string_table::{StringEntry, StringTable, DEFAULT_LANGUAGE_ID};
