//! Endpoint-0 control transfer state machine.
//!
//! One [`ControlPipe`] owns the context of the transfer in flight (stage,
//! residue, cursor) and is driven by [`ControlPipe::service`] every time
//! the EP0 interrupt flag is set.
//!
//! ```text
//!            SETUP
//!   Idle ─────────────▶ SettingUp ──┬──▶ DataIn ──(residue 0)──▶ Idle
//!    ▲                              ├──▶ DataOut ─(residue 0)──▶ Idle
//!    │                              ├──▶ (no data) ─────────────▶ Idle
//!    └──────────────────────────────┴──▶ Stalled ───────────────▶ Idle
//! ```
//!
//! `SettingUp` and `Stalled` are resolved in the same call that entered
//! them, so between interrupts the stage is always `Idle`, `DataIn` or
//! `DataOut`. When a request enters `DataIn` the first packet is loaded
//! before `service` returns: the host may issue the IN token as soon as
//! it sees the setup serviced.
//!
//! A transfer in `DataIn` or `DataOut` ends when its residue runs out, on
//! a sent stall, on bus reset, or when the controller flags setup end
//! together with a waiting packet (a new SETUP). The controller gives no
//! other way to tell a SETUP from an OUT data packet, so a packet that
//! arrives in `DataOut` without setup end is taken as data.

use crate::config;
use crate::descriptor;
use crate::error::{EndpointCondition, StallReason};
use crate::hal::{csr0, incsr, Reg, UsbBus};
use crate::report::Report;
use crate::setup::{Direction, HidRequest, RequestKind, SetupRequest, StandardRequest};

/// Control transfer stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    Idle,
    SettingUp,
    DataIn,
    DataOut,
    Stalled,
}

/// Enumeration progress as seen through standard requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    Default,
    Addressed(u8),
    Configured,
}

/// Where the data phase reads from or writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    /// No data; only a zero-length packet can be produced.
    Empty,
    Descriptor(&'static [u8]),
    Feature,
}

/// What a request asks of the data phase.
enum Phase {
    NoData,
    In(Source, usize),
    Out(usize),
}

#[derive(Clone, Copy, Debug)]
struct Transfer {
    stage: Stage,
    residue: u16,
    cursor: usize,
    source: Source,
}

impl Transfer {
    const IDLE: Self = Self {
        stage: Stage::Idle,
        residue: 0,
        cursor: 0,
        source: Source::Empty,
    };
}

pub struct ControlPipe {
    xfer: Transfer,
    state: DeviceState,
    max_packet: u16,
}

impl ControlPipe {
    pub const fn new() -> Self {
        Self::with_max_packet(config::EP0_MAX_PACKET)
    }

    /// A pipe that splits data phases into packets of at most
    /// `max_packet` bytes.
    pub const fn with_max_packet(max_packet: u16) -> Self {
        Self {
            xfer: Transfer::IDLE,
            state: DeviceState::Default,
            max_packet,
        }
    }

    pub fn stage(&self) -> Stage {
        self.xfer.stage
    }

    /// Bytes still to move in the current data phase.
    pub fn residue(&self) -> u16 {
        self.xfer.residue
    }

    /// Bytes already moved in the current data phase.
    pub fn cursor(&self) -> usize {
        self.xfer.cursor
    }

    pub fn device_state(&self) -> DeviceState {
        self.state
    }

    /// Abandon whatever transfer is in flight and forget the address and
    /// configuration. Called on bus reset.
    pub fn reset(&mut self) {
        self.xfer = Transfer::IDLE;
        self.state = DeviceState::Default;
    }

    /// Handle one EP0 interrupt. Returns the sent-stall condition if the
    /// controller reported one.
    pub fn service<B: UsbBus>(&mut self, bus: &mut B, feature: &mut Report) -> Option<EndpointCondition> {
        bus.select_endpoint(0);
        let csr = bus.read(Reg::Csr0);
        let mut cleared = None;

        if csr & csr0::STSTL != 0 {
            debug!("ep0: sent stall in {}, back to idle", self.xfer.stage);
            bus.write(Reg::Csr0, csr & !csr0::STSTL);
            self.xfer = Transfer::IDLE;
            cleared = Some(EndpointCondition::ControlSentStall);
        }
        if csr & csr0::SUEND != 0 {
            debug!("ep0: setup end");
            bus.write(Reg::Csr0, csr | csr0::SSUEND);
            // Setup end with a packet waiting: the host cut the transfer
            // short with a new SETUP.
            if csr & csr0::OPRDY != 0 && self.xfer.stage != Stage::Idle {
                debug!("ep0: {} superseded by new setup", self.xfer.stage);
                self.xfer = Transfer::IDLE;
            }
        }

        self.advance(bus, csr, feature);
        cleared
    }

    fn advance<B: UsbBus>(&mut self, bus: &mut B, csr: u8, feature: &mut Report) {
        // At most two passes: Idle -> (SETUP decoded) -> resolution.
        let mut fresh_setup = false;
        loop {
            match self.xfer.stage {
                Stage::Idle => {
                    if fresh_setup || csr & csr0::OPRDY == 0 {
                        return;
                    }
                    self.begin(bus);
                    fresh_setup = true;
                }
                Stage::SettingUp => {
                    bus.write(Reg::Csr0, csr0::SOPRDY | csr0::DATEND);
                    self.xfer = Transfer::IDLE;
                    return;
                }
                Stage::Stalled => {
                    bus.write(Reg::Csr0, csr0::SOPRDY | csr0::SDSTL);
                    self.xfer = Transfer::IDLE;
                    return;
                }
                Stage::DataIn => {
                    if fresh_setup {
                        bus.write(Reg::Csr0, csr0::SOPRDY);
                    } else if csr & csr0::IPRDY != 0 {
                        // Previous packet not collected yet.
                        return;
                    }
                    self.send(bus, feature);
                    return;
                }
                Stage::DataOut => {
                    if fresh_setup {
                        bus.write(Reg::Csr0, csr0::SOPRDY);
                    } else if csr & csr0::OPRDY != 0 {
                        self.receive(bus, feature);
                    }
                    return;
                }
            }
        }
    }

    /// Read the SETUP packet and decide the next stage.
    fn begin<B: UsbBus>(&mut self, bus: &mut B) {
        let mut raw = [0u8; SetupRequest::SIZE];
        let n = bus.read_fifo(0, &mut raw);
        let req = SetupRequest::parse(&raw);

        self.xfer = Transfer {
            stage: Stage::SettingUp,
            residue: req.length,
            cursor: 0,
            source: Source::Empty,
        };

        let outcome = if n < SetupRequest::SIZE {
            Err(StallReason::ShortSetup(n as u8))
        } else {
            debug!(
                "ep0: setup {=u8:#x} {=u8:#x} {=u16:#x} {=u16:#x} len {=u16}",
                req.request_type,
                req.request,
                req.value,
                req.index,
                req.length
            );
            self.dispatch(bus, &req)
        };

        match outcome {
            Ok(Phase::NoData) => {}
            Ok(Phase::In(source, len)) => {
                self.xfer.source = source;
                self.xfer.residue = clamp(req.length, len);
                self.xfer.stage = Stage::DataIn;
            }
            Ok(Phase::Out(len)) => {
                self.xfer.source = Source::Feature;
                self.xfer.residue = clamp(req.length, len);
                if self.xfer.residue > 0 {
                    self.xfer.stage = Stage::DataOut;
                }
            }
            Err(reason) => {
                warn!("ep0: stall {}", reason);
                self.xfer.stage = Stage::Stalled;
            }
        }
    }

    fn dispatch<B: UsbBus>(&mut self, bus: &mut B, req: &SetupRequest) -> Result<Phase, StallReason> {
        match req.kind() {
            RequestKind::Standard => self.standard(bus, req),
            RequestKind::Class => class(req),
            RequestKind::Vendor | RequestKind::Reserved => {
                Err(StallReason::UnsupportedRequestType(req.request_type))
            }
        }
    }

    fn standard<B: UsbBus>(&mut self, bus: &mut B, req: &SetupRequest) -> Result<Phase, StallReason> {
        match req.standard() {
            StandardRequest::SetAddress => {
                expect_direction(req, Direction::Out)?;
                let address = (req.value & 0x7F) as u8;
                bus.write(Reg::Faddr, address);
                self.state = if address == 0 {
                    DeviceState::Default
                } else {
                    DeviceState::Addressed(address)
                };
                info!("ep0: address {=u8}", address);
                Ok(Phase::NoData)
            }
            StandardRequest::SetConfiguration => {
                expect_direction(req, Direction::Out)?;
                bus.select_endpoint(1);
                bus.write(Reg::InCsr2, incsr::INMODEIN);
                bus.write(Reg::InMaxP, config::EP1_MAXP_REGISTER);
                bus.select_endpoint(1);
                bus.write(Reg::InCsr2, incsr::INMODEOUT);
                bus.write(Reg::OutMaxP, config::EP1_MAXP_REGISTER);
                bus.select_endpoint(0);
                self.state = DeviceState::Configured;
                info!("ep0: configuration {=u16}, ep1 armed", req.value);
                Ok(Phase::NoData)
            }
            StandardRequest::GetDescriptor => {
                expect_direction(req, Direction::In)?;
                let kind = req.descriptor_type();
                let index = req.descriptor_index();
                let table = descriptor::find(kind, index).ok_or(StallReason::UnknownDescriptor {
                    kind: req.value.to_le_bytes()[1],
                    index,
                })?;
                Ok(Phase::In(Source::Descriptor(table), table.len()))
            }
            _ => Err(StallReason::UnsupportedStandardRequest(req.request)),
        }
    }

    /// Load the next packet of the IN data phase.
    fn send<B: UsbBus>(&mut self, bus: &mut B, feature: &Report) {
        let count = self.xfer.residue.min(self.max_packet);
        let bytes: &[u8] = match self.xfer.source {
            Source::Empty => &[],
            Source::Descriptor(table) => table,
            Source::Feature => feature,
        };
        let start = self.xfer.cursor.min(bytes.len());
        let end = (start + usize::from(count)).min(bytes.len());
        bus.write_fifo(0, &bytes[start..end]);

        self.xfer.residue -= count;
        self.xfer.cursor += usize::from(count);

        if self.xfer.residue == 0 {
            trace!("ep0: last in packet, {=u16} bytes", count);
            bus.write(Reg::Csr0, csr0::IPRDY | csr0::DATEND);
            self.xfer = Transfer::IDLE;
        } else {
            trace!("ep0: in packet, {=u16} bytes, {=u16} left", count, self.xfer.residue);
            bus.write(Reg::Csr0, csr0::IPRDY);
        }
    }

    /// Take one OUT packet of the data phase into the feature report.
    fn receive<B: UsbBus>(&mut self, bus: &mut B, feature: &mut Report) {
        let start = self.xfer.cursor.min(feature.len());
        let end = (start + usize::from(self.xfer.residue)).min(feature.len());
        let count = bus.read_fifo(0, &mut feature[start..end]);

        // `count` is bounded by the slice, which is bounded by the residue.
        self.xfer.residue -= count as u16;
        self.xfer.cursor += count;

        if self.xfer.residue == 0 {
            trace!("ep0: last out packet, {=usize} bytes", count);
            bus.write(Reg::Csr0, csr0::SOPRDY | csr0::DATEND);
            self.xfer = Transfer::IDLE;
        } else {
            trace!("ep0: out packet, {=usize} bytes, {=u16} left", count, self.xfer.residue);
            bus.write(Reg::Csr0, csr0::SOPRDY);
        }
    }
}

impl Default for ControlPipe {
    fn default() -> Self {
        Self::new()
    }
}

fn class(req: &SetupRequest) -> Result<Phase, StallReason> {
    match req.hid() {
        HidRequest::GetReport => {
            expect_direction(req, Direction::In)?;
            Ok(Phase::In(Source::Feature, config::REPORT_SIZE))
        }
        HidRequest::SetReport => {
            expect_direction(req, Direction::Out)?;
            Ok(Phase::Out(config::REPORT_SIZE))
        }
        HidRequest::SetIdle => {
            expect_direction(req, Direction::Out)?;
            Ok(Phase::NoData)
        }
        HidRequest::GetIdle
        | HidRequest::GetProtocol
        | HidRequest::SetProtocol
        | HidRequest::Unknown(_) => Err(StallReason::UnsupportedClassRequest(req.request)),
    }
}

fn expect_direction(req: &SetupRequest, direction: Direction) -> Result<(), StallReason> {
    if req.direction() == direction {
        Ok(())
    } else {
        Err(StallReason::WrongDirection(req.request_type))
    }
}

/// The data phase never exceeds what the host asked for nor what we have.
fn clamp(requested: u16, available: usize) -> u16 {
    match u16::try_from(available) {
        Ok(available) => requested.min(available),
        Err(_) => requested,
    }
}
