//! Application-wide constants and compile-time configuration.
//!
//! USB identity, packet sizes, controller bring-up values, and the
//! board-specific register placement live here so they can be tuned in
//! one place.

// USB identity

/// USB VID/PID reported in the device descriptor.
pub const USB_VID: u16 = 0x5354;
pub const USB_PID: u16 = 0x4380;

/// Device release number (BCD), 1.00.
pub const USB_BCD_DEVICE: u16 = 0x0100;

/// USB device strings (ASCII only, encoded to UTF-16LE at compile time).
pub const USB_MANUFACTURER: &str = "STC";
pub const USB_PRODUCT: &str = "STC8 FwLib HID";

/// Supported string language (English, United States).
pub const USB_LANGUAGE_ID: u16 = 0x0409;

/// Bus-powered budget in 2 mA units. 50 = 100 mA.
pub const USB_MAX_POWER: u8 = 50;

// Packet sizes

/// Endpoint-0 maximum packet size (bMaxPacketSize0).
pub const EP0_MAX_PACKET: u16 = 64;

/// Endpoint-1 IN/OUT maximum packet size as advertised in the descriptors.
pub const EP1_MAX_PACKET: u16 = 64;

/// Value written to INMAXP/OUTMAXP for endpoint 1. The controller counts
/// in 8-byte units, so 8 selects 64-byte packets.
pub const EP1_MAXP_REGISTER: u8 = 8;

/// HID polling interval for endpoint 1 (ms).
pub const USB_HID_POLL_MS: u8 = 1;

/// Size of every HID report (feature, input, output).
pub const REPORT_SIZE: usize = 64;

// Controller bring-up

/// IN endpoint interrupt enables (EP0 plus EP1-EP5 IN).
pub const INTR_IN_ENABLE: u8 = 0x3F;

/// OUT endpoint interrupt enables (EP1-EP5 OUT).
pub const INTR_OUT_ENABLE: u8 = 0x3F;

/// Bus-level interrupt enables. Reset is latched in INTRUSB and read
/// alongside every endpoint interrupt, so no bus interrupt is unmasked.
pub const INTR_USB_ENABLE: u8 = 0x00;

// Reply frame staged by the firmware before interrupts are enabled

/// Command code of the device status reply.
pub const REPLY_COMMAND: u8 = 0x02;

/// Payload of the device status reply.
pub const REPLY_PAYLOAD: [u8; 4] = [0x01, 0x02, 0x01, 0x02];

// Board placement (firmware binary only)
//
// The controller is a memory-mapped, byte-wide register block. These are
// board values; adjust for your part.

/// Base address of the USB controller register block.
pub const USB_BASE: usize = 0x4000_5000;

/// NVIC interrupt number of the USB controller line.
pub const USB_IRQ: u16 = 25;
