//! SETUP packet decoding.
//!
//! See USB 2.0 §9.3 (setup data) and HID 1.11 §7.2 (class requests).

use crate::descriptor::DescriptorType;

/// Data phase direction, bit 7 of bmRequestType.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host-to-Device
    Out,
    /// Device-to-Host
    In,
}

/// Bits 6..5 of bmRequestType.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    Standard,
    Class,
    Vendor,
    Reserved,
}

/// Standard request codes (USB 2.0 table 9-4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StandardRequest {
    GetStatus,
    ClearFeature,
    SetFeature,
    SetAddress,
    GetDescriptor,
    SetDescriptor,
    GetConfiguration,
    SetConfiguration,
    GetInterface,
    SetInterface,
    SynchFrame,
    Unknown(u8),
}

impl From<u8> for StandardRequest {
    fn from(code: u8) -> Self {
        match code {
            0 => StandardRequest::GetStatus,
            1 => StandardRequest::ClearFeature,
            3 => StandardRequest::SetFeature,
            5 => StandardRequest::SetAddress,
            6 => StandardRequest::GetDescriptor,
            7 => StandardRequest::SetDescriptor,
            8 => StandardRequest::GetConfiguration,
            9 => StandardRequest::SetConfiguration,
            10 => StandardRequest::GetInterface,
            11 => StandardRequest::SetInterface,
            12 => StandardRequest::SynchFrame,
            other => StandardRequest::Unknown(other),
        }
    }
}

/// HID class request codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidRequest {
    GetReport,
    GetIdle,
    GetProtocol,
    SetReport,
    SetIdle,
    SetProtocol,
    Unknown(u8),
}

impl From<u8> for HidRequest {
    fn from(code: u8) -> Self {
        match code {
            0x01 => HidRequest::GetReport,
            0x02 => HidRequest::GetIdle,
            0x03 => HidRequest::GetProtocol,
            0x09 => HidRequest::SetReport,
            0x0A => HidRequest::SetIdle,
            0x0B => HidRequest::SetProtocol,
            other => HidRequest::Unknown(other),
        }
    }
}

/// The 8-byte SETUP stage of a control transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupRequest {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupRequest {
    pub const SIZE: usize = 8;

    /// Decode a SETUP packet. Multi-byte fields are little-endian on the
    /// wire.
    pub fn parse(raw: &[u8; Self::SIZE]) -> Self {
        Self {
            request_type: raw[0],
            request: raw[1],
            value: u16::from_le_bytes([raw[2], raw[3]]),
            index: u16::from_le_bytes([raw[4], raw[5]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    pub fn direction(&self) -> Direction {
        if self.request_type & 0x80 != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }

    pub fn kind(&self) -> RequestKind {
        match (self.request_type >> 5) & 0x03 {
            0 => RequestKind::Standard,
            1 => RequestKind::Class,
            2 => RequestKind::Vendor,
            _ => RequestKind::Reserved,
        }
    }

    pub fn standard(&self) -> StandardRequest {
        StandardRequest::from(self.request)
    }

    pub fn hid(&self) -> HidRequest {
        HidRequest::from(self.request)
    }

    /// GetDescriptor: descriptor type, high byte of wValue.
    pub fn descriptor_type(&self) -> DescriptorType {
        DescriptorType::from(self.value.to_le_bytes()[1])
    }

    /// GetDescriptor: descriptor index, low byte of wValue.
    pub fn descriptor_index(&self) -> u8 {
        self.value.to_le_bytes()[0]
    }
}
