use std::rc::Rc;

use usbfly_model::port::MockPort;
use usbfly_model::usb::request::UsbStandardRequest;
use usbfly_model::usb::{DeviceDescriptor, UsbDescriptorType, UsbString};
use usbfly_model::{Error, PortError, UsbDevice};

fn acme_descriptor(serial: u8, configurations: u8) -> DeviceDescriptor {
    DeviceDescriptor::new(0x0200, 0, 0, 0, 64, 0x1234, 0x5678, 0x0100, 1, 2, serial, configurations)
}

// Configuration descriptor set with one vendor interface (two alternates,
// iInterface 4 and 5) and a bulk IN endpoint on each.
fn config_set(value: u8, i_configuration: u8) -> Vec<u8> {
    let mut data = vec![9, 2, 0, 0, 1, value, i_configuration, 0x80, 250];
    data.extend_from_slice(&[9, 4, 0, 0, 1, 0xFF, 0, 0, 4]);
    data.extend_from_slice(&[7, 5, 0x81, 2, 0, 2, 0]);
    data.extend_from_slice(&[9, 4, 0, 1, 1, 0xFF, 0, 0, 5]);
    data.extend_from_slice(&[7, 5, 0x81, 2, 0, 2, 0]);
    let total = data.len() as u16;
    data[2..4].copy_from_slice(&total.to_le_bytes());
    data
}

fn acme_port() -> MockPort {
    MockPort::new()
        .with_device(&acme_descriptor(0, 1))
        .with_languages(&[0x0409])
        .with_string(1, 0x0409, "Acme")
        .with_string(2, 0x0409, "Widget")
        .with_configuration(0, config_set(1, 0))
}

#[test]
fn acme_widget_scenario() {
    let device = UsbDevice::from_port(Rc::new(acme_port())).unwrap();

    assert_eq!(device.manufacturer_string(None).unwrap().to_string_lossy(), "Acme");
    assert_eq!(device.product_string(None).unwrap().to_string_lossy(), "Widget");
    assert!(device.serial_string(None).is_none());
    assert_eq!(device.configuration(1).unwrap().configuration_value(), 1);
    assert!(device.configuration(2).is_none());
    assert_eq!(device.language_count(), 1);
    assert_eq!(device.language_by_index(0), 0x0409);
}

#[test]
fn device_descriptor_is_fetched_first_and_once() {
    let port = Rc::new(acme_port());
    UsbDevice::from_port(port.clone()).unwrap();

    let requests = port.requests();
    let first = requests[0];
    assert_eq!(first.bmRequestType, 0x80);
    assert_eq!(first.bRequest, UsbStandardRequest::GetDescriptor as u8);
    assert_eq!((first.wValue, first.wIndex, first.wLength), (0x0100, 0, 18));

    let device_requests = requests
        .iter()
        .filter(|r| r.descriptor_target() == Some((UsbDescriptorType::Device, 0)))
        .count();
    assert_eq!(device_requests, 1);

    // Language list comes before any text string.
    assert_eq!((requests[1].wValue, requests[1].wIndex), (0x0300, 0));
    assert_eq!((requests[2].wValue, requests[2].wIndex), (0x0301, 0x0409));
}

#[test]
fn fan_out_fetches_every_language() {
    let languages = [0x0409, 0x0407, 0x040C];
    let mut port = MockPort::new()
        .with_device(&acme_descriptor(3, 1))
        .with_languages(&languages)
        .with_configuration(0, config_set(1, 6));
    for &language in &languages {
        for index in 1..=6 {
            port = port.with_string(index, language, &format!("s{}-{:04x}", index, language));
        }
    }

    let device = UsbDevice::from_port(Rc::new(port)).unwrap();
    for index in 1..=6 {
        for &language in &languages {
            let s = device.string(index, language).unwrap();
            assert_eq!(s.to_string_lossy(), format!("s{}-{:04x}", index, language));
        }
        assert_eq!(device.string(index, 0), device.string(index, 0x0409));
    }
    assert_eq!(device.strings().len(), 18);
    assert_eq!(device.strings().max_string_index(), 6);
}

#[test]
fn configuration_slot_follows_declared_value() {
    // Index 0 declares value 2, index 1 declares value 1.
    let port = MockPort::new()
        .with_device(&acme_descriptor(0, 2))
        .with_languages(&[0x0409])
        .with_string(1, 0x0409, "Acme")
        .with_string(2, 0x0409, "Widget")
        .with_configuration(0, config_set(2, 0))
        .with_configuration(1, config_set(1, 0));

    let device = UsbDevice::from_port(Rc::new(port)).unwrap();
    assert_eq!(device.configuration(1).unwrap().configuration_value(), 1);
    assert_eq!(device.configuration(2).unwrap().configuration_value(), 2);
    assert_eq!(device.configuration(1).unwrap().interface_alternate_count(0), 2);
}

#[test]
fn out_of_range_configuration_value_fails_construction() {
    let port = MockPort::new()
        .with_device(&acme_descriptor(0, 1))
        .with_languages(&[0x0409])
        .with_configuration(0, config_set(3, 0));

    assert!(matches!(
        UsbDevice::from_port(Rc::new(port)),
        Err(Error::InvalidConfigurationValue { value: 3, count: 1 })
    ));
}

#[test]
fn device_descriptor_failure_is_an_error() {
    let port = MockPort::new().with_stall(UsbDescriptorType::Device, 0, 0);
    assert!(matches!(
        UsbDevice::from_port(Rc::new(port)),
        Err(Error::Port(PortError::Stall(_)))
    ));
}

#[test]
fn short_device_descriptor_is_an_error() {
    let bytes = acme_descriptor(0, 1).to_bytes()[..8].to_vec();
    let port = MockPort::new().with_descriptor(UsbDescriptorType::Device, 0, 0, bytes);
    assert!(matches!(
        UsbDevice::from_port(Rc::new(port)),
        Err(Error::ShortDescriptor { kind: "device", expected: 18, actual: 8 })
    ));
}

#[test]
fn missing_strings_do_not_fail_construction() {
    let port = MockPort::new()
        .with_device(&acme_descriptor(0, 1))
        .with_languages(&[0x0409])
        .with_string(1, 0x0409, "Acme")
        .with_configuration(0, config_set(1, 0));

    let device = UsbDevice::from_port(Rc::new(port)).unwrap();
    assert!(device.manufacturer_string(None).is_some());
    assert!(device.product_string(None).is_none());
}

#[test]
fn strings_can_be_refetched_through_the_port() {
    let port = Rc::new(acme_port().with_string(9, 0x0409, "Late"));
    let mut device = UsbDevice::from_port(port.clone()).unwrap();
    let before = port.request_count();

    assert_eq!(device.fetch_string_all_languages(9).unwrap(), 1);
    assert_eq!(device.string(9, 0).unwrap().to_string_lossy(), "Late");
    assert_eq!(port.request_count(), before + 1);

    // Earlier registrations survive the table growing past its initial size.
    assert_eq!(device.string(1, 0x0409).unwrap().to_string_lossy(), "Acme");
}

#[test]
fn emulated_device_built_from_fields() {
    let mut device = UsbDevice::from_fields(0x0110, 0xFF, 0, 0, 8, 0x1D50, 0x6018, 0x0001, 1, 2, 3, 1);
    device.add_string(UsbString::from_text(1, 0x0409, "Acme")).unwrap();
    device.add_string(UsbString::from_text(2, 0x0409, "Widget")).unwrap();
    device.add_string(UsbString::from_text(3, 0x0409, "0001")).unwrap();
    device.add_language(0x0409);

    assert_eq!(device.language_count(), 1);
    assert_eq!(device.serial_string(Some(0x0409)).unwrap().to_string_lossy(), "0001");
    assert_eq!(device.descriptor().to_bytes()[0..2], [18, 1]);
}
