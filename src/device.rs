//! The vendor HID device: controller bring-up, interrupt dispatch, and the
//! report buffers foreground code stages replies in.

use crate::config;
use crate::control::{ControlPipe, DeviceState, Stage};
use crate::endpoint;
use crate::error::Error;
use crate::hal::{incsr, outcsr, power, InterruptSnapshot, Reg, UsbBus};
use crate::report::{self, Report, Reports};

/// Owns the controller, the EP0 transfer context and the report buffers.
///
/// [`UsbHid::on_interrupt`] is the whole interrupt service routine. Every
/// other method needs `&mut self` as well, so on target the device sits
/// behind a critical-section mutex and foreground code can only touch the
/// output report while the USB interrupt is held off.
pub struct UsbHid<B: UsbBus> {
    bus: B,
    ep0: ControlPipe,
    reports: Reports,
    recoveries: u32,
    last_recovered: Option<Error>,
}

impl<B: UsbBus> UsbHid<B> {
    pub fn new(bus: B) -> Self {
        Self::with_control_pipe(bus, ControlPipe::new())
    }

    pub fn with_control_pipe(bus: B, ep0: ControlPipe) -> Self {
        Self {
            bus,
            ep0,
            reports: Reports::new(),
            recoveries: 0,
            last_recovered: None,
        }
    }

    /// Program the controller for enumeration: address 0, soft reset,
    /// endpoint interrupt enables, suspend detection on.
    ///
    /// The pull-up, clocks and interrupt line are board concerns and are
    /// left to the caller.
    pub fn init(&mut self) {
        self.bus.write(Reg::Faddr, 0x00);
        self.bus.write(Reg::Power, power::USBRST);
        self.bus.write(Reg::IntrIn1E, config::INTR_IN_ENABLE);
        self.bus.write(Reg::IntrOut1E, config::INTR_OUT_ENABLE);
        self.bus.write(Reg::IntrUsbE, config::INTR_USB_ENABLE);
        self.bus.write(Reg::Power, power::ENSUSP);
        self.ep0.reset();
        info!("usb: controller initialised");
    }

    /// USB interrupt service routine.
    ///
    /// Reads the flag registers once, then services bus reset, EP0, EP1 IN
    /// and EP1 OUT in that order, each gated by its own flag. Returns the
    /// snapshot that was acted on.
    pub fn on_interrupt(&mut self) -> InterruptSnapshot {
        let snap = InterruptSnapshot::capture(&mut self.bus);
        trace!("usb: irq {}", snap);

        if snap.bus_reset() {
            self.bus_reset();
        }
        if snap.ep0() {
            if let Some(condition) = self.ep0.service(&mut self.bus, &mut self.reports.feature) {
                self.recovered(condition.into());
            }
        }
        if snap.ep1_in() {
            for condition in endpoint::service_in(&mut self.bus).conditions() {
                self.recovered(condition.into());
            }
        }
        if snap.ep1_out() {
            let status = endpoint::service_out(&mut self.bus, &mut self.reports);
            if let Some(condition) = status.condition() {
                self.recovered(condition.into());
            }
        }
        snap
    }

    fn bus_reset(&mut self) {
        if self.ep0.stage() != Stage::Idle {
            self.recovered(Error::BusReset);
        }
        self.bus.select_endpoint(endpoint::EP);
        self.bus.write(Reg::InCsr1, incsr::INCLRDT);
        self.bus.select_endpoint(endpoint::EP);
        self.bus.write(Reg::OutCsr1, outcsr::OUTCLRDT);
        self.ep0.reset();
        info!("usb: bus reset");
    }

    fn recovered(&mut self, error: Error) {
        warn!("usb: recovered from {}", error);
        self.recoveries = self.recoveries.wrapping_add(1);
        self.last_recovered = Some(error);
    }

    /// Number of conditions the interrupt handler has cleared on its own.
    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    /// The most recent of those conditions.
    pub fn last_recovered(&self) -> Option<Error> {
        self.last_recovered
    }

    pub fn stage(&self) -> Stage {
        self.ep0.stage()
    }

    pub fn control(&self) -> &ControlPipe {
        &self.ep0
    }

    pub fn device_state(&self) -> DeviceState {
        self.ep0.device_state()
    }

    pub fn is_configured(&self) -> bool {
        self.ep0.device_state() == DeviceState::Configured
    }

    /// The report sent on EP1 IN when the host announces itself.
    pub fn output_report_mut(&mut self) -> &mut Report {
        &mut self.reports.output
    }

    /// Frame `command`/`payload` into the output report.
    pub fn stage_output_frame(&mut self, command: u8, payload: &[u8]) -> Result<usize, Error> {
        report::encode_frame(&mut self.reports.output, command, payload)
    }

    /// Bytes of the last report received on EP1 OUT.
    pub fn input_report(&self) -> &[u8] {
        &self.reports.input[..self.reports.input_len]
    }

    /// Feature report as last written by SetReport.
    pub fn feature_report(&self) -> &Report {
        &self.reports.feature
    }

    pub fn feature_report_mut(&mut self) -> &mut Report {
        &mut self.reports.feature
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn release(self) -> B {
        self.bus
    }
}
