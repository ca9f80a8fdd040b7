//! Endpoint-1 interrupt IN/OUT report exchange.
//!
//! The host polls EP1 every millisecond. Reports it sends land in the
//! input buffer; a report starting with the host-ready prefix makes us
//! answer immediately with the staged output report. Stall and underrun
//! conditions are cleared and reported to the caller; the hardware's own
//! NAK retry is the only reliability mechanism.

use crate::error::EndpointCondition;
use crate::hal::{incsr, outcsr, Reg, UsbBus};
use crate::report::{self, Reports};

/// Endpoint number of the interrupt pair.
pub const EP: u8 = 1;

/// What an EP1 IN interrupt found. Both conditions can be flagged at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InStatus {
    pub sent_stall: bool,
    pub underrun: bool,
}

impl InStatus {
    /// Every condition that was cleared, stall first.
    pub fn conditions(self) -> impl Iterator<Item = EndpointCondition> {
        [
            (self.sent_stall, EndpointCondition::InSentStall),
            (self.underrun, EndpointCondition::InUnderrun),
        ]
        .into_iter()
        .filter_map(|(hit, condition)| hit.then_some(condition))
    }
}

/// What an EP1 OUT interrupt found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutStatus {
    pub sent_stall: bool,
    /// Byte count of the report taken from the FIFO, if one was waiting.
    pub received: Option<usize>,
    /// The report was a host-ready announcement and the output report
    /// has been armed.
    pub replied: bool,
}

impl OutStatus {
    pub fn condition(self) -> Option<EndpointCondition> {
        self.sent_stall.then_some(EndpointCondition::OutSentStall)
    }
}

/// Handle an EP1 IN interrupt.
pub fn service_in<B: UsbBus>(bus: &mut B) -> InStatus {
    bus.select_endpoint(EP);
    let csr = bus.read(Reg::InCsr1);
    let mut status = InStatus::default();

    if csr & incsr::INSTSTL != 0 {
        bus.write(Reg::InCsr1, incsr::INCLRDT);
        status.sent_stall = true;
    }
    if csr & incsr::INUNDRUN != 0 {
        trace!("ep1 in: underrun");
        bus.write(Reg::InCsr1, 0);
        status.underrun = true;
    }
    status
}

/// Handle an EP1 OUT interrupt.
pub fn service_out<B: UsbBus>(bus: &mut B, reports: &mut Reports) -> OutStatus {
    bus.select_endpoint(EP);
    let csr = bus.read(Reg::OutCsr1);
    let mut status = OutStatus::default();

    if csr & outcsr::OUTSTSTL != 0 {
        // Keep OUTOPRDY as read so a packet that arrived with the stall
        // is not discarded.
        bus.write(Reg::OutCsr1, (csr & outcsr::OUTOPRDY) | outcsr::OUTCLRDT);
        status.sent_stall = true;
    }
    if csr & outcsr::OUTOPRDY == 0 {
        return status;
    }

    let n = bus.read_fifo(EP, &mut reports.input);
    reports.input_len = n;
    bus.write(Reg::OutCsr1, 0);
    status.received = Some(n);
    debug!("ep1 out: {=usize} bytes", n);

    if report::is_host_ready(&reports.input[..n]) {
        bus.select_endpoint(EP);
        bus.write_fifo(EP, &reports.output);
        bus.write(Reg::InCsr1, incsr::INIPRDY);
        debug!("ep1 in: host ready, output report armed");
        status.replied = true;
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Endpoint-1 registers only; OUT data is served from `rx`.
    #[derive(Default)]
    struct Ep1 {
        in_csr: u8,
        out_csr: u8,
        rx: Vec<u8>,
        writes: Vec<(Reg, u8)>,
    }

    impl UsbBus for Ep1 {
        fn read(&mut self, reg: Reg) -> u8 {
            match reg {
                Reg::InCsr1 => self.in_csr,
                Reg::OutCsr1 => self.out_csr,
                Reg::OutCount1 => self.rx.len() as u8,
                Reg::Fifo(_) if !self.rx.is_empty() => self.rx.remove(0),
                _ => 0,
            }
        }

        fn write(&mut self, reg: Reg, value: u8) {
            self.writes.push((reg, value));
        }
    }

    #[test]
    fn in_stall_and_underrun_both_reported() {
        let mut bus = Ep1 {
            in_csr: incsr::INSTSTL | incsr::INUNDRUN,
            ..Default::default()
        };
        let status = service_in(&mut bus);
        assert_eq!(
            status,
            InStatus {
                sent_stall: true,
                underrun: true
            }
        );
        let conditions: Vec<_> = status.conditions().collect();
        assert_eq!(
            conditions,
            vec![EndpointCondition::InSentStall, EndpointCondition::InUnderrun]
        );
        assert!(bus.writes.contains(&(Reg::InCsr1, incsr::INCLRDT)));
        assert!(bus.writes.contains(&(Reg::InCsr1, 0)));
    }

    #[test]
    fn in_without_condition_reports_nothing() {
        let mut bus = Ep1::default();
        let status = service_in(&mut bus);
        assert_eq!(status.conditions().count(), 0);
        assert_eq!(bus.writes, vec![(Reg::Index, EP)]);
    }

    #[test]
    fn out_stall_is_reported() {
        let mut bus = Ep1 {
            out_csr: outcsr::OUTSTSTL,
            ..Default::default()
        };
        let mut reports = Reports::new();
        let status = service_out(&mut bus, &mut reports);
        assert_eq!(status.condition(), Some(EndpointCondition::OutSentStall));
        assert_eq!(status.received, None);
        assert!(!status.replied);
        assert_eq!(bus.writes.last(), Some(&(Reg::OutCsr1, outcsr::OUTCLRDT)));
    }

    #[test]
    fn out_stall_with_pending_report() {
        let mut bus = Ep1 {
            out_csr: outcsr::OUTSTSTL | outcsr::OUTOPRDY,
            rx: vec![0xAA, 0x55, 0x01, 0x09],
            ..Default::default()
        };
        let mut reports = Reports::new();
        let status = service_out(&mut bus, &mut reports);
        assert!(status.sent_stall);
        assert_eq!(status.received, Some(4));
        assert!(status.replied);
        assert_eq!(bus.writes[1], (Reg::OutCsr1, outcsr::OUTOPRDY | outcsr::OUTCLRDT));
    }

    #[test]
    fn out_report_without_prefix_is_kept() {
        let mut bus = Ep1 {
            out_csr: outcsr::OUTOPRDY,
            rx: vec![0x01, 0x02, 0x03],
            ..Default::default()
        };
        let mut reports = Reports::new();
        let status = service_out(&mut bus, &mut reports);
        assert_eq!(status.condition(), None);
        assert_eq!(status.received, Some(3));
        assert!(!status.replied);
        assert_eq!(&reports.input[..reports.input_len], &[0x01, 0x02, 0x03]);
    }
}
