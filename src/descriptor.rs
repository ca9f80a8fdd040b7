//! Static descriptor tables and lookup.
//!
//! Every descriptor is a `'static` byte table built at compile time from
//! [`crate::config`]; nothing here is mutated at runtime.

use crate::config;

/// bDescriptorType values we know about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorType {
    Device,
    Configuration,
    String,
    Interface,
    Endpoint,
    Hid,
    Report,
    Unknown(u8),
}

impl From<u8> for DescriptorType {
    fn from(code: u8) -> Self {
        match code {
            0x01 => DescriptorType::Device,
            0x02 => DescriptorType::Configuration,
            0x03 => DescriptorType::String,
            0x04 => DescriptorType::Interface,
            0x05 => DescriptorType::Endpoint,
            0x21 => DescriptorType::Hid,
            0x22 => DescriptorType::Report,
            other => DescriptorType::Unknown(other),
        }
    }
}

const fn lo(v: u16) -> u8 {
    v.to_le_bytes()[0]
}

const fn hi(v: u16) -> u8 {
    v.to_le_bytes()[1]
}

/// Build a string descriptor from ASCII text.
///
/// `N` must be `2 + 2 * text.len()`; a mismatch fails the build.
const fn string_descriptor<const N: usize>(text: &str) -> [u8; N] {
    let bytes = text.as_bytes();
    assert!(N == 2 + 2 * bytes.len(), "string descriptor length mismatch");
    assert!(N <= 255, "string descriptor too long");

    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = 0x03;
    let mut i = 0;
    while i < bytes.len() {
        assert!(bytes[i] < 0x80, "string descriptors are ASCII only");
        out[2 + 2 * i] = bytes[i];
        i += 1;
    }
    out
}

/// USB HID Report Descriptor: 64 opaque bytes each way plus a feature
/// report, all under the Consumer page.
pub const REPORT_DESCRIPTOR: [u8; 27] = [
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0xFF, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, config::REPORT_SIZE as u8, //   Report Count (64)
    0x09, 0x01, //   Usage (Consumer Control)
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    0x09, 0x01, //   Usage (Consumer Control)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x09, 0x01, //   Usage (Consumer Control)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0xC0, // End Collection
];

pub const DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    0x01, // bDescriptorType (Device)
    0x00,
    0x02, // bcdUSB 2.00
    0x00, // bDeviceClass (per interface)
    0x00, // bDeviceSubClass
    0x00, // bDeviceProtocol
    config::EP0_MAX_PACKET as u8,
    lo(config::USB_VID),
    hi(config::USB_VID),
    lo(config::USB_PID),
    hi(config::USB_PID),
    lo(config::USB_BCD_DEVICE),
    hi(config::USB_BCD_DEVICE),
    0x01, // iManufacturer
    0x02, // iProduct
    0x00, // iSerialNumber
    0x01, // bNumConfigurations
];

const CONFIG_TOTAL_LEN: u16 = 9 + 9 + 9 + 7 + 7;

/// Configuration, interface, HID and both endpoint descriptors, in the
/// order the host expects them after a full-length GetDescriptor.
pub const CONFIGURATION_DESCRIPTOR: [u8; CONFIG_TOTAL_LEN as usize] = [
    // Configuration
    9,
    0x02,
    lo(CONFIG_TOTAL_LEN),
    hi(CONFIG_TOTAL_LEN),
    0x01, // bNumInterfaces
    0x01, // bConfigurationValue
    0x00, // iConfiguration
    0x80, // bmAttributes (bus powered)
    config::USB_MAX_POWER,
    // Interface 0
    9,
    0x04,
    0x00, // bInterfaceNumber
    0x00, // bAlternateSetting
    0x02, // bNumEndpoints
    0x03, // bInterfaceClass (HID)
    0x00, // bInterfaceSubClass (no boot)
    0x00, // bInterfaceProtocol
    0x00, // iInterface
    // HID
    9,
    0x21,
    0x01,
    0x01, // bcdHID 1.01
    0x00, // bCountryCode
    0x01, // bNumDescriptors
    0x22, // bDescriptorType (Report)
    lo(REPORT_DESCRIPTOR.len() as u16),
    hi(REPORT_DESCRIPTOR.len() as u16),
    // Endpoint 1 IN
    7,
    0x05,
    0x81,
    0x03, // interrupt
    lo(config::EP1_MAX_PACKET),
    hi(config::EP1_MAX_PACKET),
    config::USB_HID_POLL_MS,
    // Endpoint 1 OUT
    7,
    0x05,
    0x01,
    0x03, // interrupt
    lo(config::EP1_MAX_PACKET),
    hi(config::EP1_MAX_PACKET),
    config::USB_HID_POLL_MS,
];

pub const LANGUAGE_IDS: [u8; 4] = [
    4,
    0x03,
    lo(config::USB_LANGUAGE_ID),
    hi(config::USB_LANGUAGE_ID),
];

pub const MANUFACTURER_STRING: [u8; 2 + 2 * config::USB_MANUFACTURER.len()] =
    string_descriptor(config::USB_MANUFACTURER);

pub const PRODUCT_STRING: [u8; 2 + 2 * config::USB_PRODUCT.len()] =
    string_descriptor(config::USB_PRODUCT);

/// Look up a descriptor by the (type, index) pair of a GetDescriptor
/// request. `None` means the request must be stalled.
pub fn find(kind: DescriptorType, index: u8) -> Option<&'static [u8]> {
    match kind {
        DescriptorType::Device => Some(&DEVICE_DESCRIPTOR),
        DescriptorType::Configuration => Some(&CONFIGURATION_DESCRIPTOR),
        DescriptorType::String => match index {
            0 => Some(&LANGUAGE_IDS),
            1 => Some(&MANUFACTURER_STRING),
            2 => Some(&PRODUCT_STRING),
            _ => None,
        },
        DescriptorType::Report => Some(&REPORT_DESCRIPTOR),
        _ => None,
    }
}
