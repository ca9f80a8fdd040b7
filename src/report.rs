//! 64-byte vendor reports and their framing.
//!
//! Frames on endpoint 1 look like
//!
//! ```text
//! 0xAA 0x55 <command> <payload ...> <checksum>
//! ```
//!
//! where the checksum is the 8-bit wrapping sum of every byte before it.
//! The interrupt handler only looks at the three-byte prefix; checksums
//! are produced for outgoing frames but never verified on incoming ones.

use crate::config::REPORT_SIZE;
use crate::error::Error;

/// One HID report (feature, input or output).
pub type Report = [u8; REPORT_SIZE];

/// Frame start marker.
pub const SYNC: [u8; 2] = [0xAA, 0x55];

/// Host announces it is ready to receive the staged output report.
pub const CMD_HOST_READY: u8 = 0x01;

/// Prefix that arms the automatic reply on endpoint 1.
pub const HOST_READY: [u8; 3] = [SYNC[0], SYNC[1], CMD_HOST_READY];

/// 8-bit wrapping sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Does `received` carry the host-ready announcement?
pub fn is_host_ready(received: &[u8]) -> bool {
    received.starts_with(&HOST_READY)
}

/// Write a framed command into `buf`, zero-filling the rest.
///
/// Returns the frame length including the checksum byte.
pub fn encode_frame(buf: &mut Report, command: u8, payload: &[u8]) -> Result<usize, Error> {
    let len = SYNC.len() + 1 + payload.len() + 1;
    if len > buf.len() {
        return Err(Error::BufferOverflow);
    }
    buf.fill(0);
    buf[..2].copy_from_slice(&SYNC);
    buf[2] = command;
    buf[3..3 + payload.len()].copy_from_slice(payload);
    buf[len - 1] = checksum(&buf[..len - 1]);
    Ok(len)
}

/// Report buffers shared between the interrupt handler and foreground.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reports {
    /// Read and written by HID GetReport/SetReport on endpoint 0.
    pub feature: Report,
    /// Last report received on endpoint 1 OUT.
    pub input: Report,
    /// Bytes of `input` filled by the last OUT packet.
    pub input_len: usize,
    /// Staged by foreground code, sent on endpoint 1 IN.
    pub output: Report,
}

impl Reports {
    pub const fn new() -> Self {
        Self {
            feature: [0; REPORT_SIZE],
            input: [0; REPORT_SIZE],
            input_len: 0,
            output: [0; REPORT_SIZE],
        }
    }
}

impl Default for Reports {
    fn default() -> Self {
        Self::new()
    }
}
