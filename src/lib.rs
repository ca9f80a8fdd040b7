//! Vendor HID device firmware for a full-speed USB device controller.
//!
//! The library holds everything that can be tested on the host: the EP0
//! control transfer state machine, the EP1 report exchange, descriptor
//! tables and the interrupt dispatcher. Hardware is reached only through
//! the [`hal::UsbBus`] trait.
//!
//! Usage: `cargo test`
//!
//! Note: The firmware binary uses main.rs with #![no_std] and #![no_main]
//! and needs the `embedded` feature.

#![cfg_attr(not(test), no_std)]

// ═══════════════════════════════════════════════════════════════════════════
// Logging (must come first so the macros are visible below)
// ═══════════════════════════════════════════════════════════════════════════

mod fmt;

// ═══════════════════════════════════════════════════════════════════════════
// Configuration, errors, hardware access
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod error;
pub mod hal;

// ═══════════════════════════════════════════════════════════════════════════
// Protocol
// ═══════════════════════════════════════════════════════════════════════════

pub mod control;
pub mod descriptor;
pub mod endpoint;
pub mod report;
pub mod setup;

// ═══════════════════════════════════════════════════════════════════════════
// Device
// ═══════════════════════════════════════════════════════════════════════════

pub mod device;

pub use control::{ControlPipe, DeviceState, Stage};
pub use device::UsbHid;
pub use error::Error;
