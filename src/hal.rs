//! Register-level access to the USB device controller.
//!
//! The controller is a byte-wide, index-banked register file in the style
//! of the Mentor full-speed core: the per-endpoint control/status
//! registers (CSR0, INCSRx, OUTCSRx, MAXP, COUNT) show the endpoint picked
//! by the INDEX register. Everything above this module talks to the
//! hardware through [`UsbBus`], so the state machines can be driven by a
//! simulated peripheral on the host.

/// Named controller registers.
///
/// `Csr0`/`InCsr1` and `Count0`/`OutCount1` share an address and differ
/// only by which endpoint INDEX selects; keeping them apart makes call
/// sites say which view they mean.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reg {
    Faddr,
    Power,
    IntrIn1,
    IntrOut1,
    IntrUsb,
    IntrIn1E,
    IntrOut1E,
    IntrUsbE,
    Frame1,
    Frame2,
    Index,
    InMaxP,
    Csr0,
    InCsr1,
    InCsr2,
    OutMaxP,
    OutCsr1,
    OutCsr2,
    Count0,
    OutCount1,
    OutCount2,
    /// Data FIFO of endpoint `n`.
    Fifo(u8),
}

impl Reg {
    /// Byte offset of the register inside the controller block.
    pub const fn offset(self) -> usize {
        match self {
            Reg::Faddr => 0x00,
            Reg::Power => 0x01,
            Reg::IntrIn1 => 0x02,
            Reg::IntrOut1 => 0x04,
            Reg::IntrUsb => 0x06,
            Reg::IntrIn1E => 0x07,
            Reg::IntrOut1E => 0x09,
            Reg::IntrUsbE => 0x0B,
            Reg::Frame1 => 0x0C,
            Reg::Frame2 => 0x0D,
            Reg::Index => 0x0E,
            Reg::InMaxP => 0x10,
            Reg::Csr0 | Reg::InCsr1 => 0x11,
            Reg::InCsr2 => 0x12,
            Reg::OutMaxP => 0x13,
            Reg::OutCsr1 => 0x14,
            Reg::OutCsr2 => 0x15,
            Reg::Count0 | Reg::OutCount1 => 0x16,
            Reg::OutCount2 => 0x17,
            Reg::Fifo(ep) => 0x20 + ep as usize,
        }
    }
}

/// POWER register bits.
pub mod power {
    pub const ENSUSP: u8 = 0x01;
    pub const SUSMD: u8 = 0x02;
    pub const RSUME: u8 = 0x04;
    pub const USBRST: u8 = 0x08;
    pub const ISOUD: u8 = 0x80;
}

/// INTRUSB / INTRIN1 / INTROUT1 flag bits.
pub mod intr {
    // INTRUSB
    pub const SUSIF: u8 = 0x01;
    pub const RSUIF: u8 = 0x02;
    pub const RSTIF: u8 = 0x04;
    pub const SOFIF: u8 = 0x08;

    // INTRIN1
    pub const EP0IF: u8 = 0x01;
    pub const EP1INIF: u8 = 0x02;

    // INTROUT1
    pub const EP1OUTIF: u8 = 0x02;
}

/// CSR0 bits. Status bits are read; `S*` bits are write-only commands.
pub mod csr0 {
    /// A packet (SETUP or data) is waiting in the FIFO.
    pub const OPRDY: u8 = 0x01;
    /// An IN packet is loaded; cleared by hardware once the host takes it.
    pub const IPRDY: u8 = 0x02;
    /// The controller sent a STALL handshake.
    pub const STSTL: u8 = 0x04;
    /// Marks the last packet of the data phase / a no-data status.
    pub const DATEND: u8 = 0x08;
    /// The control transfer ended before DATEND was written.
    pub const SUEND: u8 = 0x10;
    /// Send a STALL handshake.
    pub const SDSTL: u8 = 0x20;
    /// Serviced OPRDY.
    pub const SOPRDY: u8 = 0x40;
    /// Serviced SUEND.
    pub const SSUEND: u8 = 0x80;
}

/// INCSR1 / INCSR2 bits.
pub mod incsr {
    pub const INIPRDY: u8 = 0x01;
    pub const INFIFONE: u8 = 0x02;
    pub const INUNDRUN: u8 = 0x04;
    pub const INFLUSH: u8 = 0x08;
    pub const INSDSTL: u8 = 0x10;
    pub const INSTSTL: u8 = 0x20;
    pub const INCLRDT: u8 = 0x40;

    // INCSR2
    pub const INMODEOUT: u8 = 0x00;
    pub const INMODEIN: u8 = 0x20;
    pub const INISO: u8 = 0x40;
    pub const INAUTOSET: u8 = 0x80;
}

/// OUTCSR1 bits.
pub mod outcsr {
    pub const OUTOPRDY: u8 = 0x01;
    pub const OUTFIFOFUL: u8 = 0x02;
    pub const OUTOVRRUN: u8 = 0x04;
    pub const OUTDATERR: u8 = 0x08;
    pub const OUTFLUSH: u8 = 0x10;
    pub const OUTSDSTL: u8 = 0x20;
    pub const OUTSTSTL: u8 = 0x40;
    pub const OUTCLRDT: u8 = 0x80;
}

/// Register and FIFO access to the USB controller.
///
/// Implementors provide byte reads and writes by register name; endpoint
/// selection and FIFO transfers are built on top of those.
pub trait UsbBus {
    fn read(&mut self, reg: Reg) -> u8;

    fn write(&mut self, reg: Reg, value: u8);

    /// Bank the per-endpoint registers onto endpoint `ep`.
    fn select_endpoint(&mut self, ep: u8) {
        self.write(Reg::Index, ep);
    }

    /// Drain the received packet of endpoint `ep` into `buf`.
    ///
    /// The byte count is whatever the hardware reports for the selected
    /// endpoint, truncated to `buf.len()`. Returns the number of bytes
    /// copied.
    fn read_fifo(&mut self, ep: u8, buf: &mut [u8]) -> usize {
        let available = if ep == 0 {
            usize::from(self.read(Reg::Count0))
        } else {
            usize::from(self.read(Reg::OutCount1))
                | usize::from(self.read(Reg::OutCount2) & 0x07) << 8
        };
        let n = available.min(buf.len());
        for byte in &mut buf[..n] {
            *byte = self.read(Reg::Fifo(ep));
        }
        n
    }

    /// Load `data` into the transmit FIFO of endpoint `ep`.
    fn write_fifo(&mut self, ep: u8, data: &[u8]) {
        for &byte in data {
            self.write(Reg::Fifo(ep), byte);
        }
    }
}

/// [`UsbBus`] over a memory-mapped register block.
pub struct MmioBus {
    base: *mut u8,
}

impl MmioBus {
    /// # Safety
    ///
    /// `base` must be the address of the controller's register block, and
    /// the returned value must be the only accessor of that block.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            base: base as *mut u8,
        }
    }
}

// SAFETY: the pointer is never shared; ownership of the MmioBus is
// ownership of the register block.
unsafe impl Send for MmioBus {}

impl UsbBus for MmioBus {
    fn read(&mut self, reg: Reg) -> u8 {
        // SAFETY: `new` guarantees `base` covers every register offset.
        unsafe { core::ptr::read_volatile(self.base.add(reg.offset())) }
    }

    fn write(&mut self, reg: Reg, value: u8) {
        // SAFETY: as above.
        unsafe { core::ptr::write_volatile(self.base.add(reg.offset()), value) }
    }
}

/// The three interrupt-flag registers, read once per interrupt.
///
/// The flags are clear-on-read, so this snapshot is the only view the
/// handler gets for the whole invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptSnapshot {
    pub usb: u8,
    pub ep_in: u8,
    pub ep_out: u8,
}

impl InterruptSnapshot {
    pub fn capture<B: UsbBus>(bus: &mut B) -> Self {
        Self {
            usb: bus.read(Reg::IntrUsb),
            ep_in: bus.read(Reg::IntrIn1),
            ep_out: bus.read(Reg::IntrOut1),
        }
    }

    pub fn bus_reset(&self) -> bool {
        self.usb & intr::RSTIF != 0
    }

    pub fn ep0(&self) -> bool {
        self.ep_in & intr::EP0IF != 0
    }

    pub fn ep1_in(&self) -> bool {
        self.ep_in & intr::EP1INIF != 0
    }

    pub fn ep1_out(&self) -> bool {
        self.ep_out & intr::EP1OUTIF != 0
    }

    pub fn is_empty(&self) -> bool {
        !(self.bus_reset() || self.ep0() || self.ep1_in() || self.ep1_out())
    }
}
