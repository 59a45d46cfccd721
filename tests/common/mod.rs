#![allow(dead_code, missing_docs)]
//! Recording fakes shared by the host tests.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use dmd_kit::frame::Frame;
use dmd_kit::scan::{ControlLines, Dmd, RowTransmitter, ScanRow};
use dmd_kit::scheduler::ScanTimer;
use dmd_kit::{Error, Result};
use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

/// Everything the fakes see, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Byte(u8),
    Flush,
    Init,
    Blank,
    Latch,
    Select(u8),
    Light(u8),
}

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<Event>>>);

impl Log {
    pub fn push(&self, event: Event) {
        self.0.lock().expect("fake state lock").push(event);
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.0.lock().expect("fake state lock"))
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0
            .lock()
            .expect("fake state lock")
            .iter()
            .filter_map(|event| match event {
                Event::Byte(byte) => Some(*byte),
                _ => None,
            })
            .collect()
    }

    /// Every event except row bytes.
    pub fn controls(&self) -> Vec<Event> {
        self.0
            .lock()
            .expect("fake state lock")
            .iter()
            .copied()
            .filter(|event| !matches!(event, Event::Byte(_)))
            .collect()
    }
}

pub struct FakeWire {
    pub log: Log,
    pub fail: Arc<AtomicBool>,
}

impl RowTransmitter for FakeWire {
    fn send(&mut self, byte: u8) -> Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(Error::Spi(embedded_hal::spi::ErrorKind::Other));
        }
        self.log.push(Event::Byte(byte));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.log.push(Event::Flush);
        Ok(())
    }
}

pub struct FakeLines {
    pub log: Log,
    pub busy: Arc<AtomicBool>,
}

impl ControlLines for FakeLines {
    fn init(&mut self) -> Result<()> {
        self.log.push(Event::Init);
        Ok(())
    }

    fn bus_busy(&mut self) -> Result<bool> {
        Ok(self.busy.load(Ordering::Relaxed))
    }

    fn blank(&mut self) -> Result<()> {
        self.log.push(Event::Blank);
        Ok(())
    }

    fn latch(&mut self) -> Result<()> {
        self.log.push(Event::Latch);
        Ok(())
    }

    fn select_rows(&mut self, row: ScanRow) -> Result<()> {
        self.log.push(Event::Select(row.index()));
        Ok(())
    }

    fn light(&mut self, brightness: u8) -> Result<()> {
        self.log.push(Event::Light(brightness));
        Ok(())
    }
}

/// A fake display plus handles to its log and its bus-busy and wire-failure switches.
pub struct Rig {
    pub log: Log,
    pub busy: Arc<AtomicBool>,
    pub fail: Arc<AtomicBool>,
}

pub fn fake_dmd(panels_wide: usize, panels_high: usize) -> (Dmd<FakeWire, FakeLines>, Rig) {
    let rig = Rig {
        log: Log::default(),
        busy: Arc::new(AtomicBool::new(false)),
        fail: Arc::new(AtomicBool::new(false)),
    };
    let dmd = Dmd::new(
        panels_wide,
        panels_high,
        FakeWire {
            log: rig.log.clone(),
            fail: Arc::clone(&rig.fail),
        },
        FakeLines {
            log: rig.log.clone(),
            busy: Arc::clone(&rig.busy),
        },
    )
    .expect("valid geometry");
    (dmd, rig)
}

/// Counts arm/disarm calls.
#[derive(Clone, Default)]
pub struct FakeTimer {
    pub armed: Arc<AtomicU32>,
    pub disarmed: Arc<AtomicU32>,
    pub last_period: Arc<Mutex<Option<Duration>>>,
}

impl ScanTimer for FakeTimer {
    fn arm(&mut self, period: Duration) {
        self.armed.fetch_add(1, Ordering::Relaxed);
        *self.last_period.lock().expect("fake state lock") = Some(period);
    }

    fn disarm(&mut self) {
        self.disarmed.fetch_add(1, Ordering::Relaxed);
    }
}

/// A GPIO that records every level it is driven to, and reads back a settable level.
#[derive(Clone, Default)]
pub struct FakePin {
    pub levels: Arc<Mutex<Vec<bool>>>,
    pub input_high: Arc<AtomicBool>,
}

impl FakePin {
    pub fn history(&self) -> Vec<bool> {
        self.levels.lock().expect("fake state lock").clone()
    }

    pub fn clear(&self) {
        self.levels.lock().expect("fake state lock").clear();
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.levels.lock().expect("fake state lock").push(false);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.levels.lock().expect("fake state lock").push(true);
        Ok(())
    }
}

impl InputPin for FakePin {
    fn is_high(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(self.input_high.load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(!self.input_high.load(Ordering::Relaxed))
    }
}

/// A PWM channel with a 0..=1000 duty range that records every duty it is set to.
#[derive(Clone, Default)]
pub struct FakePwm {
    pub duties: Arc<Mutex<Vec<u16>>>,
}

impl pwm::ErrorType for FakePwm {
    type Error = Infallible;
}

impl SetDutyCycle for FakePwm {
    fn max_duty_cycle(&self) -> u16 {
        1000
    }

    fn set_duty_cycle(&mut self, duty: u16) -> core::result::Result<(), Self::Error> {
        self.duties.lock().expect("fake state lock").push(duty);
        Ok(())
    }
}

/// All lit pixels, row by row.
pub fn lit_pixels(frame: &Frame) -> Vec<(i32, i32)> {
    let mut lit = Vec::new();
    for y in 0..frame.height() as i32 {
        for x in 0..frame.width() as i32 {
            if frame.get_pixel(x, y) {
                lit.push((x, y));
            }
        }
    }
    lit
}
