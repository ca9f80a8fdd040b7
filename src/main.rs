//! usb-vhid firmware entry point.
//!
//! Board bring-up (clocks, USB PHY supply, D+ pull-up) is done by the boot
//! code before `main`. Here we program the controller, stage the reply
//! report while the USB interrupt is still masked, hand the device to the
//! interrupt handler and sleep.

#![no_std]
#![no_main]

use core::cell::RefCell;

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;
use cortex_m_rt::{entry, exception};
use defmt::{error, info};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use usb_vhid::config;
use usb_vhid::hal::MmioBus;
use usb_vhid::UsbHid;
use {defmt_rtt as _, panic_probe as _};

static DEVICE: Mutex<CriticalSectionRawMutex, RefCell<Option<UsbHid<MmioBus>>>> =
    Mutex::new(RefCell::new(None));

#[derive(Clone, Copy)]
struct UsbIrq;

// SAFETY: USB_IRQ is a valid external interrupt number for the target.
unsafe impl InterruptNumber for UsbIrq {
    fn number(self) -> u16 {
        config::USB_IRQ
    }
}

#[entry]
fn main() -> ! {
    info!("usb-vhid starting");

    let mut cp = cortex_m::Peripherals::take().unwrap();

    // SAFETY: USB_BASE is the controller block and this is its only accessor.
    let bus = unsafe { MmioBus::new(config::USB_BASE) };
    let mut device = UsbHid::new(bus);
    device.init();

    // Interrupt still masked: nothing can be transmitting the output report.
    if let Err(e) = device.stage_output_frame(config::REPLY_COMMAND, &config::REPLY_PAYLOAD) {
        error!("reply frame does not fit: {}", e);
    }

    DEVICE.lock(|cell| cell.replace(Some(device)));

    // SAFETY: the handler only touches DEVICE through the mutex.
    unsafe {
        cp.NVIC.set_priority(UsbIrq, 0);
        NVIC::unmask(UsbIrq);
    }
    info!("USB interrupt enabled, waiting for host");

    loop {
        cortex_m::asm::wfi();
    }
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    if irqn != config::USB_IRQ as i16 {
        return;
    }
    DEVICE.lock(|cell| {
        if let Some(device) = cell.borrow_mut().as_mut() {
            device.on_interrupt();
        }
    });
}
