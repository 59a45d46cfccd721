//! One periodic tick shared by any number of displays.
//!
//! A [`Scheduler`] keeps a slot list of registered displays (anything implementing
//! [`ScanStep`], usually a [`SharedDmd`]) and scans each of them once per tick. The tick
//! comes from the platform: call [`Scheduler::run_due_callbacks`] from a timer interrupt,
//! or, on target, let [`Scheduler::run`] drive it from an `embassy-time` ticker.
//!
//! Registry edits and tick bookkeeping run inside a critical section, so a tick never
//! sees a half-updated slot list. The registry borrows displays for `'a` and never owns
//! them; a display cannot be dropped while a scheduler may still reach it.
//!
//! ```rust
//! use dmd_kit::scheduler::{NoTimer, Scheduler, ScanStep, SCAN_PERIOD_DEFAULT};
//! use portable_atomic::{AtomicU32, Ordering};
//!
//! struct Counter(AtomicU32);
//! impl ScanStep for Counter {
//!     fn scan_step(&self) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//!
//! # fn main() -> dmd_kit::Result<()> {
//! let counter = Counter(AtomicU32::new(0));
//! let scheduler = Scheduler::new(NoTimer, SCAN_PERIOD_DEFAULT);
//! scheduler.register(&counter)?;
//! scheduler.run_due_callbacks();
//! scheduler.run_due_callbacks();
//! assert_eq!(counter.0.load(Ordering::Relaxed), 2);
//! assert!(!scheduler.unregister(&counter));
//! # Ok(())
//! # }
//! ```

use alloc::vec::Vec;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use embassy_time::Duration;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::{
    Error, Result,
    frame::Frame,
    scan::{ControlLines, Dmd, RowTransmitter},
};

/// Scan period used by the demos: 4 ms per row group, 62.5 Hz per full image.
pub const SCAN_PERIOD_DEFAULT: Duration = Duration::from_millis(4);

/// Something the scheduler can scan once per tick.
///
/// Implementations must not block. The scheduler never calls `scan_step` on the same
/// display re-entrantly from a single tick, but a display may also be scanned by hand, so
/// implementations guard against overlap themselves (see [`SharedDmd`]).
pub trait ScanStep: Sync {
    /// Emit one row group.
    fn scan_step(&self);
}

/// Platform timer that produces the scheduler's ticks.
///
/// Armed when the first display registers, disarmed when the last one leaves.
/// Both calls happen inside the scheduler's critical section.
pub trait ScanTimer {
    /// Start ticking every `period`.
    fn arm(&mut self, period: Duration);
    /// Stop ticking.
    fn disarm(&mut self);
}

/// A [`ScanTimer`] for ticks that run regardless, such as [`Scheduler::run`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTimer;

impl ScanTimer for NoTimer {
    fn arm(&mut self, _period: Duration) {}

    fn disarm(&mut self) {}
}

/// Index of a display's slot in a [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(usize);

impl SlotId {
    /// Slot position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

struct Registry<'a, T> {
    slots: Vec<Option<&'a dyn ScanStep>>,
    timer: T,
    period: Duration,
}

impl<T: ScanTimer> Registry<'_, T> {
    fn position(&self, display: &dyn ScanStep) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.is_some_and(|registered| core::ptr::addr_eq(registered, display))
        })
    }

    fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// The shared tick: a registry of displays and the timer that drives them.
pub struct Scheduler<'a, T: ScanTimer = NoTimer> {
    registry: Mutex<CriticalSectionRawMutex, RefCell<Registry<'a, T>>>,
    running: AtomicBool,
    ticks: AtomicU32,
}

impl<'a, T: ScanTimer> Scheduler<'a, T> {
    /// A scheduler with no displays; `timer` stays disarmed until the first registration.
    #[must_use]
    pub const fn new(timer: T, period: Duration) -> Self {
        Self {
            registry: Mutex::new(RefCell::new(Registry {
                slots: Vec::new(),
                timer,
                period,
            })),
            running: AtomicBool::new(false),
            ticks: AtomicU32::new(0),
        }
    }

    /// Add `display` to the tick, reusing the first empty slot.
    ///
    /// Registering a display twice returns its existing slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the slot list cannot grow. Displays already
    /// registered keep scanning.
    pub fn register(&self, display: &'a dyn ScanStep) -> Result<SlotId> {
        self.registry.lock(|cell| {
            let mut registry = cell.borrow_mut();
            if let Some(index) = registry.position(display) {
                return Ok(SlotId(index));
            }

            let index = if let Some(index) = registry.slots.iter().position(Option::is_none) {
                debug!("Scheduler: reusing slot {}", index);
                registry.slots[index] = Some(display);
                index
            } else {
                if registry.slots.try_reserve(1).is_err() {
                    warn!("Scheduler: no memory for another slot");
                    return Err(Error::OutOfMemory);
                }
                registry.slots.push(Some(display));
                registry.slots.len() - 1
            };
            info!("Scheduler: registered display in slot {}", index);

            if !self.running.load(Ordering::Relaxed) {
                let period = registry.period;
                registry.timer.arm(period);
                self.running.store(true, Ordering::Relaxed);
                debug!("Scheduler: timer armed");
            }
            Ok(SlotId(index))
        })
    }

    /// Remove `display` from the tick.
    ///
    /// Returns whether any other display is still registered; when none is, the timer has
    /// been disarmed. Unregistering a display that is not registered changes nothing.
    pub fn unregister(&self, display: &dyn ScanStep) -> bool {
        self.registry.lock(|cell| {
            let mut registry = cell.borrow_mut();
            if let Some(index) = registry.position(display) {
                registry.slots[index] = None;
                info!("Scheduler: unregistered display from slot {}", index);
            }

            let still_running = registry.occupied() > 0;
            if !still_running && self.running.load(Ordering::Relaxed) {
                registry.timer.disarm();
                self.running.store(false, Ordering::Relaxed);
                debug!("Scheduler: timer disarmed");
            }
            still_running
        })
    }

    /// One tick: scan every registered display once, in slot order.
    ///
    /// Each slot is looked up in its own short critical section and scanned outside it, so
    /// the timer is masked only while the slot list is read. Returns how many displays
    /// were scanned.
    pub fn run_due_callbacks(&self) -> usize {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        let mut scanned = 0;
        let mut index = 0;
        loop {
            let slot = self.registry.lock(|cell| match cell.try_borrow() {
                Ok(registry) => registry.slots.get(index).copied(),
                Err(_) => None,
            });
            match slot {
                None => break,
                Some(None) => {}
                Some(Some(display)) => {
                    display.scan_step();
                    scanned += 1;
                }
            }
            index += 1;
        }
        scanned
    }

    /// Whether any display is registered (and the timer armed).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Ticks so far.
    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Number of registered displays.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.registry.lock(|cell| cell.borrow().occupied())
    }

    /// The tick period the timer is armed with.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.registry.lock(|cell| cell.borrow().period)
    }

    /// Tick forever from an `embassy-time` ticker. Run this from a dedicated task.
    #[cfg(not(feature = "host"))]
    pub async fn run(&self) -> ! {
        let mut ticker = embassy_time::Ticker::every(self.period());
        loop {
            ticker.next().await;
            self.run_due_callbacks();
        }
    }
}

/// A [`Dmd`] that a scheduler tick and the application can both reach.
///
/// Every access goes through a critical section, so drawing inside [`Self::with_dmd`] is
/// never interleaved with a scan of the same display.
pub struct SharedDmd<T, C> {
    dmd: Mutex<CriticalSectionRawMutex, RefCell<Dmd<T, C>>>,
}

impl<T, C> SharedDmd<T, C>
where
    T: RowTransmitter + Send,
    C: ControlLines + Send,
{
    /// Wrap a display for sharing.
    #[must_use]
    pub const fn new(dmd: Dmd<T, C>) -> Self {
        Self {
            dmd: Mutex::new(RefCell::new(dmd)),
        }
    }

    /// Run `f` with exclusive access to the display.
    ///
    /// # Panics
    ///
    /// Panics if called from inside another `with_dmd` on the same display.
    pub fn with_dmd<R>(&self, f: impl FnOnce(&mut Dmd<T, C>) -> R) -> R {
        self.dmd.lock(|cell| f(&mut *cell.borrow_mut()))
    }

    /// Set up the hardware, clear and scan once, then join `scheduler`'s tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware fails or the scheduler cannot take another display.
    pub fn start<'a, S: ScanTimer>(&'a self, scheduler: &Scheduler<'a, S>) -> Result<SlotId> {
        self.with_dmd(Dmd::begin)?;
        let slot = scheduler.register(self)?;
        info!("SharedDmd: started in slot {}", slot.index());
        Ok(slot)
    }

    /// Leave `scheduler`'s tick, then clear and scan once so the panels go dark.
    ///
    /// Returns whether other displays are still registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the final scan fails. The display is unregistered regardless.
    pub fn stop<'a, S: ScanTimer>(&'a self, scheduler: &Scheduler<'a, S>) -> Result<bool> {
        let still_running = scheduler.unregister(self);
        self.with_dmd(|dmd| {
            dmd.clear_screen();
            dmd.scan_display()
        })?;
        info!("SharedDmd: stopped");
        Ok(still_running)
    }

    /// Exchange the displayed bitmap with `back_buffer` in one step.
    ///
    /// Returns `false`, changing nothing, if `back_buffer` has a different geometry.
    pub fn swap_buffers(&self, back_buffer: &mut Frame) -> bool {
        self.with_dmd(|dmd| dmd.frame_mut().swap_buffers(back_buffer))
    }
}

impl<T, C> ScanStep for SharedDmd<T, C>
where
    T: RowTransmitter + Send,
    C: ControlLines + Send,
{
    fn scan_step(&self) {
        self.dmd.lock(|cell| {
            let Ok(mut dmd) = cell.try_borrow_mut() else {
                trace!("SharedDmd: scan already in progress, skipped");
                return;
            };
            if let Err(err) = dmd.scan_display() {
                warn!("SharedDmd: scan failed: {}", err);
            }
        });
    }
}
