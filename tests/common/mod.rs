//! Simulated USB device controller for host tests.
//!
//! Models just enough of the hardware for the firmware to be driven from
//! the host's side of the cable:
//!
//! - interrupt flag registers are clear-on-read,
//! - CSR command bits (`SOPRDY`, `IPRDY`, `SDSTL`, ...) act when written and
//!   status bits are reported on read,
//! - OUT data sits in a per-endpoint FIFO whose length is the byte count,
//! - IN data is collected byte by byte and committed as a [`Packet`] when
//!   the firmware sets the packet-ready bit.

#![allow(dead_code)]

use heapless::{Deque, Vec as HVec};
use usb_vhid::hal::{csr0, incsr, intr, outcsr, Reg, UsbBus};

pub const MAX_PACKET: usize = 64;

/// One packet handed to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub ep: u8,
    pub data: HVec<u8, MAX_PACKET>,
    /// DATEND was written with IPRDY (EP0 only).
    pub end: bool,
}

#[derive(Default)]
pub struct SimBus {
    index: u8,

    // Clear-on-read interrupt flags.
    pub intr_usb: u8,
    pub intr_in: u8,
    pub intr_out: u8,

    // Status bits as the firmware reads them.
    pub csr0: u8,
    pub in_csr: [u8; 2],
    pub out_csr: [u8; 2],

    out_fifo: [Deque<u8, 256>; 2],
    in_fifo: [HVec<u8, 256>; 2],

    pub address: u8,
    pub power: u8,
    pub in_maxp: [u8; 2],
    pub out_maxp: [u8; 2],
    pub in_csr2: [u8; 2],

    /// Every register write, tagged with the INDEX at the time.
    pub writes: Vec<(u8, Reg, u8)>,
    pub sent: Vec<Packet>,
    pub stalls: usize,
    pub status_acks: usize,
    pub in_toggle_clears: usize,
    pub out_toggle_clears: usize,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Host side ──────────────────────────────────────────────────────

    /// Deliver a SETUP packet on EP0 and raise the EP0 interrupt.
    pub fn host_setup(&mut self, raw: [u8; 8]) {
        self.load_out(0, &raw);
        self.csr0 |= csr0::OPRDY;
        self.intr_in |= intr::EP0IF;
    }

    /// Deliver a data-stage OUT packet on EP0.
    pub fn host_out0(&mut self, data: &[u8]) {
        self.load_out(0, data);
        self.csr0 |= csr0::OPRDY;
        self.intr_in |= intr::EP0IF;
    }

    /// The host collected the pending EP0 IN packet.
    pub fn host_in0(&mut self) {
        self.csr0 &= !csr0::IPRDY;
        self.intr_in |= intr::EP0IF;
    }

    /// Deliver a report on EP1 OUT.
    pub fn host_out1(&mut self, data: &[u8]) {
        self.load_out(1, data);
        self.out_csr[1] |= outcsr::OUTOPRDY;
        self.intr_out |= intr::EP1OUTIF;
    }

    pub fn host_reset(&mut self) {
        self.intr_usb |= intr::RSTIF;
    }

    /// Controller reports a STALL handshake was sent on EP0.
    pub fn raise_ep0_sent_stall(&mut self) {
        self.csr0 |= csr0::STSTL;
        self.intr_in |= intr::EP0IF;
    }

    pub fn raise_ep0_setup_end(&mut self) {
        self.csr0 |= csr0::SUEND;
        self.intr_in |= intr::EP0IF;
    }

    pub fn raise_ep1_in(&mut self, status: u8) {
        self.in_csr[1] |= status;
        self.intr_in |= intr::EP1INIF;
    }

    pub fn raise_ep1_out_stall(&mut self) {
        self.out_csr[1] |= outcsr::OUTSTSTL;
        self.intr_out |= intr::EP1OUTIF;
    }

    fn load_out(&mut self, ep: usize, data: &[u8]) {
        self.out_fifo[ep].clear();
        for &b in data {
            self.out_fifo[ep].push_back(b).expect("out fifo overflow");
        }
    }

    // ─── Inspection ─────────────────────────────────────────────────────

    pub fn packets(&self, ep: u8) -> impl Iterator<Item = &Packet> {
        self.sent.iter().filter(move |p| p.ep == ep)
    }

    /// Concatenated payload of every packet sent on `ep`.
    pub fn delivered(&self, ep: u8) -> Vec<u8> {
        self.packets(ep).flat_map(|p| p.data.iter().copied()).collect()
    }

    pub fn csr0_writes(&self) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(_, reg, _)| *reg == Reg::Csr0)
            .map(|&(_, _, v)| v)
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.sent.clear();
    }

    fn commit(&mut self, ep: u8, end: bool) {
        let slot = usize::from(ep);
        let data = HVec::from_slice(&self.in_fifo[slot]).expect("packet larger than 64 bytes");
        self.in_fifo[slot].clear();
        self.sent.push(Packet { ep, data, end });
    }

    fn bank(&self) -> usize {
        usize::from(self.index).min(1)
    }
}

impl UsbBus for SimBus {
    fn read(&mut self, reg: Reg) -> u8 {
        match reg {
            Reg::IntrUsb => core::mem::take(&mut self.intr_usb),
            Reg::IntrIn1 => core::mem::take(&mut self.intr_in),
            Reg::IntrOut1 => core::mem::take(&mut self.intr_out),
            Reg::Index => self.index,
            Reg::Faddr => self.address,
            Reg::Power => self.power,
            Reg::Csr0 => self.csr0,
            Reg::InCsr1 => self.in_csr[self.bank()],
            Reg::OutCsr1 => self.out_csr[self.bank()],
            Reg::Count0 | Reg::OutCount1 => self.out_fifo[self.bank()].len().min(0xFF) as u8,
            Reg::OutCount2 => (self.out_fifo[self.bank()].len() >> 8) as u8,
            Reg::Fifo(ep) => self.out_fifo[usize::from(ep)].pop_front().unwrap_or(0),
            _ => 0,
        }
    }

    fn write(&mut self, reg: Reg, value: u8) {
        self.writes.push((self.index, reg, value));
        match reg {
            Reg::Index => self.index = value,
            Reg::Faddr => self.address = value,
            Reg::Power => self.power = value,
            Reg::InMaxP => self.in_maxp[self.bank()] = value,
            Reg::OutMaxP => self.out_maxp[self.bank()] = value,
            Reg::InCsr2 => self.in_csr2[self.bank()] = value,
            Reg::Fifo(ep) => self.in_fifo[usize::from(ep)]
                .push(value)
                .expect("in fifo overflow"),
            Reg::Csr0 => {
                if value & csr0::STSTL == 0 {
                    self.csr0 &= !csr0::STSTL;
                }
                if value & csr0::SSUEND != 0 {
                    self.csr0 &= !csr0::SUEND;
                }
                if value & csr0::SOPRDY != 0 {
                    self.csr0 &= !csr0::OPRDY;
                    self.out_fifo[0].clear();
                    if value & csr0::DATEND != 0 && value & csr0::SDSTL == 0 {
                        self.status_acks += 1;
                    }
                }
                if value & csr0::SDSTL != 0 {
                    self.stalls += 1;
                }
                // Only a rising IPRDY loads a packet; echoing a set bit is a no-op.
                if value & csr0::IPRDY != 0 && self.csr0 & csr0::IPRDY == 0 {
                    self.csr0 |= csr0::IPRDY;
                    self.commit(0, value & csr0::DATEND != 0);
                }
            }
            Reg::InCsr1 => {
                let bank = self.bank();
                if value & incsr::INCLRDT != 0 {
                    self.in_toggle_clears += 1;
                }
                if value & incsr::INSTSTL == 0 {
                    self.in_csr[bank] &= !incsr::INSTSTL;
                }
                if value & incsr::INUNDRUN == 0 {
                    self.in_csr[bank] &= !incsr::INUNDRUN;
                }
                if value & incsr::INIPRDY != 0 {
                    self.commit(bank as u8, false);
                }
            }
            Reg::OutCsr1 => {
                let bank = self.bank();
                if value & outcsr::OUTCLRDT != 0 {
                    self.out_toggle_clears += 1;
                }
                if value & outcsr::OUTSTSTL == 0 {
                    self.out_csr[bank] &= !outcsr::OUTSTSTL;
                }
                if value & outcsr::OUTOPRDY == 0 && self.out_csr[bank] & outcsr::OUTOPRDY != 0 {
                    self.out_csr[bank] &= !outcsr::OUTOPRDY;
                    self.out_fifo[bank].clear();
                }
            }
            _ => {}
        }
    }
}

// ─── Request builders ───────────────────────────────────────────────────────

pub fn setup(request_type: u8, request: u8, value: u16, index: u16, length: u16) -> [u8; 8] {
    let v = value.to_le_bytes();
    let i = index.to_le_bytes();
    let l = length.to_le_bytes();
    [request_type, request, v[0], v[1], i[0], i[1], l[0], l[1]]
}

pub fn get_descriptor(kind: u8, index: u8, length: u16) -> [u8; 8] {
    setup(0x80, 0x06, u16::from_le_bytes([index, kind]), 0, length)
}

pub fn set_address(address: u8) -> [u8; 8] {
    setup(0x00, 0x05, u16::from(address), 0, 0)
}

pub fn set_configuration(value: u8) -> [u8; 8] {
    setup(0x00, 0x09, u16::from(value), 0, 0)
}

pub fn hid_get_report(length: u16) -> [u8; 8] {
    setup(0xA1, 0x01, 0x0300, 0, length)
}

pub fn hid_set_report(length: u16) -> [u8; 8] {
    setup(0x21, 0x09, 0x0300, 0, length)
}

pub fn hid_set_idle() -> [u8; 8] {
    setup(0x21, 0x0A, 0, 0, 0)
}

pub const DEVICE: u8 = 0x01;
pub const CONFIGURATION: u8 = 0x02;
pub const STRING: u8 = 0x03;
pub const REPORT: u8 = 0x22;
