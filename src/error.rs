//! Unified error type for usb-vhid.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for on-target
//! logging.
//!
//! Everything except [`Error::BufferOverflow`] is raised and recovered
//! inside the interrupt handler; foreground code never sees it.

/// Top-level error type used across the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Endpoint 0
    /// A control request was refused; the host sees a STALL handshake.
    Stall(StallReason),

    /// The host reset the bus in the middle of whatever we were doing.
    BusReset,

    // Data endpoints
    /// The controller flagged a stall/underrun condition on an endpoint.
    Endpoint(EndpointCondition),

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

/// Why a control request ended in a STALL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StallReason {
    /// Fewer than 8 bytes were waiting in the FIFO at SETUP time.
    ShortSetup(u8),
    /// Vendor or reserved bmRequestType.
    UnsupportedRequestType(u8),
    /// Standard bRequest we do not implement.
    UnsupportedStandardRequest(u8),
    /// HID class bRequest we do not implement.
    UnsupportedClassRequest(u8),
    /// Supported bRequest, but bmRequestType points the data phase the
    /// wrong way.
    WrongDirection(u8),
    /// GetDescriptor selector not present in the descriptor store.
    UnknownDescriptor { kind: u8, index: u8 },
}

/// Hardware conditions cleared without escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointCondition {
    /// EP0 reported that it sent a STALL handshake.
    ControlSentStall,
    /// EP1 IN reported that it sent a STALL handshake.
    InSentStall,
    /// EP1 IN was polled with nothing loaded.
    InUnderrun,
    /// EP1 OUT reported that it sent a STALL handshake.
    OutSentStall,
}

// Convenience conversions

impl From<StallReason> for Error {
    fn from(e: StallReason) -> Self {
        Error::Stall(e)
    }
}

impl From<EndpointCondition> for Error {
    fn from(e: EndpointCondition) -> Self {
        Error::Endpoint(e)
    }
}
