//! The interleaved scan-out multiplexer and its hardware seams.
//!
//! A panel lights one of four row groups at a time. Each call to [`Dmd::scan_display`]
//! shifts out the rows of the current group (`r`, `r + 4`, `r + 8`, `r + 12` of every
//! panel), latches them, selects the group on the A/B lines and re-enables the output.
//! Called often enough (every few milliseconds, see
//! [`Scheduler`](crate::scheduler::Scheduler)), the four groups blend into a full image.
//!
//! Hardware is reached only through two traits:
//!
//! - [`RowTransmitter`] shifts bytes into the panel chain ([`SpiTransmitter`] or
//!   [`BitBangTransmitter`]).
//! - [`ControlLines`] drives output enable, latch and row select, and reports whether a
//!   shared bus is busy ([`HalControlLines`] over `embedded-hal` pins).

use core::ops::{Deref, DerefMut};

use embedded_hal::{
    digital::{InputPin, OutputPin, PinState},
    pwm::SetDutyCycle,
    spi::SpiBus,
};

use crate::{Error, Result, frame::Frame};

/// Which of the four interleaved row groups is driven next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanRow(u8);

impl ScanRow {
    /// Number of interleaved row groups.
    pub const COUNT: u8 = 4;

    /// Row group `index`, or `None` if `index >= 4`.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Group index, `0..4`.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// The following group, wrapping from 3 to 0.
    #[must_use]
    pub const fn next(self) -> Self {
        Self((self.0 + 1) % Self::COUNT)
    }

    /// Level of the A row-select line (bit 0).
    #[must_use]
    pub const fn line_a(self) -> bool {
        self.0 & 0b01 != 0
    }

    /// Level of the B row-select line (bit 1).
    #[must_use]
    pub const fn line_b(self) -> bool {
        self.0 & 0b10 != 0
    }
}

/// Shifts bytes of row data, MSB first, into the panel chain.
pub trait RowTransmitter {
    /// Send one byte.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying bus fails.
    fn send(&mut self, byte: u8) -> Result<()>;

    /// Wait until every sent byte has left the wire. Called before latching.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying bus fails.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Row transmitter over a hardware SPI bus (mode 0, MSB first).
pub struct SpiTransmitter<S> {
    spi: S,
}

impl<S: SpiBus> SpiTransmitter<S> {
    /// Wrap a configured SPI bus.
    #[must_use]
    pub const fn new(spi: S) -> Self {
        Self { spi }
    }

    /// Give the bus back.
    pub fn release(self) -> S {
        self.spi
    }
}

impl<S: SpiBus> RowTransmitter for SpiTransmitter<S> {
    fn send(&mut self, byte: u8) -> Result<()> {
        self.spi.write(&[byte]).map_err(Error::spi)
    }

    fn flush(&mut self) -> Result<()> {
        self.spi.flush().map_err(Error::spi)
    }
}

/// Row transmitter that toggles a clock and a data pin directly.
///
/// Data is set before each rising clock edge.
pub struct BitBangTransmitter<CLK, DATA> {
    clock: CLK,
    data: DATA,
}

impl<CLK: OutputPin, DATA: OutputPin> BitBangTransmitter<CLK, DATA> {
    /// Drive both pins low and take them over.
    ///
    /// # Errors
    ///
    /// Returns an error if either pin cannot be driven.
    pub fn new(mut clock: CLK, mut data: DATA) -> Result<Self> {
        clock.set_low().map_err(Error::pin)?;
        data.set_low().map_err(Error::pin)?;
        Ok(Self { clock, data })
    }
}

impl<CLK: OutputPin, DATA: OutputPin> RowTransmitter for BitBangTransmitter<CLK, DATA> {
    fn send(&mut self, mut byte: u8) -> Result<()> {
        for _ in 0..8 {
            self.data
                .set_state(PinState::from(byte & 0x80 != 0))
                .map_err(Error::pin)?;
            self.clock.set_high().map_err(Error::pin)?;
            byte <<= 1;
            self.clock.set_low().map_err(Error::pin)?;
        }
        Ok(())
    }
}

/// The panel's control lines, as seen by the scan multiplexer.
pub trait ControlLines {
    /// One-time setup: every line low (output disabled).
    ///
    /// # Errors
    ///
    /// Returns an error if a line cannot be driven.
    fn init(&mut self) -> Result<()>;

    /// Whether another device currently owns the shared bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the guard line cannot be read.
    fn bus_busy(&mut self) -> Result<bool>;

    /// Disable the LED output.
    ///
    /// # Errors
    ///
    /// Returns an error if a line cannot be driven.
    fn blank(&mut self) -> Result<()>;

    /// Pulse the latch so the shifted rows reach the drivers.
    ///
    /// # Errors
    ///
    /// Returns an error if a line cannot be driven.
    fn latch(&mut self) -> Result<()>;

    /// Drive A and B for `row`.
    ///
    /// # Errors
    ///
    /// Returns an error if a line cannot be driven.
    fn select_rows(&mut self, row: ScanRow) -> Result<()>;

    /// Re-enable the LED output at `brightness` (255 = fully on).
    ///
    /// # Errors
    ///
    /// Returns an error if a line cannot be driven.
    fn light(&mut self, brightness: u8) -> Result<()>;
}

/// The output-enable line, plain or pulse-width modulated.
pub trait OutputEnable {
    /// Disable the output.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be driven.
    fn off(&mut self) -> Result<()>;

    /// Enable the output with an on-time proportional to `brightness`.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be driven.
    fn on(&mut self, brightness: u8) -> Result<()>;
}

/// Output enable on a plain GPIO: any non-zero brightness is fully on.
pub struct GpioOutputEnable<P>(pub P);

impl<P: OutputPin> OutputEnable for GpioOutputEnable<P> {
    fn off(&mut self) -> Result<()> {
        self.0.set_low().map_err(Error::pin)
    }

    fn on(&mut self, brightness: u8) -> Result<()> {
        self.0
            .set_state(PinState::from(brightness > 0))
            .map_err(Error::pin)
    }
}

/// Output enable on a PWM channel: duty cycle is `brightness / 255`.
pub struct PwmOutputEnable<P>(pub P);

impl<P: SetDutyCycle> OutputEnable for PwmOutputEnable<P> {
    fn off(&mut self) -> Result<()> {
        self.0.set_duty_cycle_fully_off().map_err(Error::pwm)
    }

    fn on(&mut self, brightness: u8) -> Result<()> {
        let result = match brightness {
            u8::MAX => self.0.set_duty_cycle_fully_on(),
            level => self.0.set_duty_cycle_fraction(u16::from(level), u16::from(u8::MAX)),
        };
        result.map_err(Error::pwm)
    }
}

/// Cooperative arbitration with another device on the same bus.
pub trait BusGuard {
    /// Whether the other device is mid-transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if the guard line cannot be read.
    fn is_busy(&mut self) -> Result<bool>;
}

/// No other device shares the bus.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBusGuard;

impl BusGuard for NoBusGuard {
    fn is_busy(&mut self) -> Result<bool> {
        Ok(false)
    }
}

/// Watches the other device's active-low chip select: busy while it reads low.
pub struct ChipSelectGuard<P>(pub P);

impl<P: InputPin> BusGuard for ChipSelectGuard<P> {
    fn is_busy(&mut self) -> Result<bool> {
        self.0.is_low().map_err(Error::pin)
    }
}

/// [`ControlLines`] over `embedded-hal` pins.
///
/// The latch line is labelled SCLK on the panel connector; it is pulsed high then low.
pub struct HalControlLines<OE, A, B, LAT, G = NoBusGuard> {
    output_enable: OE,
    line_a: A,
    line_b: B,
    latch: LAT,
    guard: G,
}

impl<OE, A, B, LAT> HalControlLines<OE, A, B, LAT>
where
    OE: OutputEnable,
    A: OutputPin,
    B: OutputPin,
    LAT: OutputPin,
{
    /// Control lines on a bus no other device uses.
    #[must_use]
    pub const fn new(output_enable: OE, line_a: A, line_b: B, latch: LAT) -> Self {
        Self {
            output_enable,
            line_a,
            line_b,
            latch,
            guard: NoBusGuard,
        }
    }

    /// Skip scans while `guard` reports the bus busy.
    #[must_use]
    pub fn with_bus_guard<G: BusGuard>(self, guard: G) -> HalControlLines<OE, A, B, LAT, G> {
        HalControlLines {
            output_enable: self.output_enable,
            line_a: self.line_a,
            line_b: self.line_b,
            latch: self.latch,
            guard,
        }
    }
}

impl<OE, A, B, LAT, G> ControlLines for HalControlLines<OE, A, B, LAT, G>
where
    OE: OutputEnable,
    A: OutputPin,
    B: OutputPin,
    LAT: OutputPin,
    G: BusGuard,
{
    fn init(&mut self) -> Result<()> {
        self.output_enable.off()?;
        self.line_a.set_low().map_err(Error::pin)?;
        self.line_b.set_low().map_err(Error::pin)?;
        self.latch.set_low().map_err(Error::pin)
    }

    fn bus_busy(&mut self) -> Result<bool> {
        self.guard.is_busy()
    }

    fn blank(&mut self) -> Result<()> {
        self.output_enable.off()
    }

    fn latch(&mut self) -> Result<()> {
        self.latch.set_high().map_err(Error::pin)?;
        self.latch.set_low().map_err(Error::pin)
    }

    fn select_rows(&mut self, row: ScanRow) -> Result<()> {
        self.line_a
            .set_state(PinState::from(row.line_a()))
            .map_err(Error::pin)?;
        self.line_b
            .set_state(PinState::from(row.line_b()))
            .map_err(Error::pin)
    }

    fn light(&mut self, brightness: u8) -> Result<()> {
        self.output_enable.on(brightness)
    }
}

/// A display: a panel-grid [`Frame`] plus the hardware that scans it out.
///
/// Derefs to [`Frame`], so every drawing call works on a `Dmd` directly. To scan from a
/// timer or another task, wrap it in a [`SharedDmd`](crate::scheduler::SharedDmd).
///
/// ```rust
/// # use dmd_kit::scan::{ControlLines, Dmd, RowTransmitter, ScanRow};
/// # use dmd_kit::frame::GraphicsMode;
/// # struct Wire;
/// # impl RowTransmitter for Wire { fn send(&mut self, _: u8) -> dmd_kit::Result<()> { Ok(()) } }
/// # struct Lines;
/// # impl ControlLines for Lines {
/// #     fn init(&mut self) -> dmd_kit::Result<()> { Ok(()) }
/// #     fn bus_busy(&mut self) -> dmd_kit::Result<bool> { Ok(false) }
/// #     fn blank(&mut self) -> dmd_kit::Result<()> { Ok(()) }
/// #     fn latch(&mut self) -> dmd_kit::Result<()> { Ok(()) }
/// #     fn select_rows(&mut self, _: ScanRow) -> dmd_kit::Result<()> { Ok(()) }
/// #     fn light(&mut self, _: u8) -> dmd_kit::Result<()> { Ok(()) }
/// # }
/// # fn main() -> dmd_kit::Result<()> {
/// let mut dmd = Dmd::new(1, 1, Wire, Lines)?;
/// dmd.begin()?;
/// dmd.draw_line(0, 0, 31, 15, GraphicsMode::On);
/// dmd.scan_display()?;
/// assert_eq!(dmd.scan_row().index(), 2); // begin() scanned once too
/// # Ok(())
/// # }
/// ```
pub struct Dmd<T, C> {
    frame: Frame,
    transmitter: T,
    control: C,
    scan_row: ScanRow,
    brightness: u8,
}

impl<T: RowTransmitter, C: ControlLines> Dmd<T, C> {
    /// A blank display of `panels_wide` × `panels_high` panels at full brightness.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] for a zero panel count and
    /// [`Error::OutOfMemory`] if the bitmap cannot be allocated.
    pub fn new(panels_wide: usize, panels_high: usize, transmitter: T, control: C) -> Result<Self> {
        let frame = Frame::for_panels(panels_wide, panels_high)?;
        debug!("Dmd: {} x {} panels", panels_wide, panels_high);
        Ok(Self {
            frame,
            transmitter,
            control,
            scan_row: ScanRow::default(),
            brightness: u8::MAX,
        })
    }

    /// Set up the control lines, clear the frame and scan once (output stays dark).
    ///
    /// Use this directly to scan by hand; [`SharedDmd::start`](crate::scheduler::SharedDmd::start)
    /// calls it before registering with a scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware fails.
    pub fn begin(&mut self) -> Result<()> {
        self.control.init()?;
        self.frame.clear_screen();
        self.scan_display()
    }

    /// Emit the current row group and advance to the next.
    ///
    /// Returns without touching anything while the bus guard reports the bus busy.
    /// If the hardware fails part way, the row group does not advance.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware fails.
    pub fn scan_display(&mut self) -> Result<()> {
        if self.control.bus_busy()? {
            trace!("Dmd: bus busy, scan skipped");
            return Ok(());
        }

        let frame = &self.frame;
        let first = usize::from(self.scan_row.index());
        let rows: [&[u8]; 4] = core::array::from_fn(|group| frame.unified_row(first + group * 4));
        for column in 0..frame.tiling().row_bytes() {
            for row in rows.iter().rev() {
                self.transmitter.send(row[column])?;
            }
        }
        self.transmitter.flush()?;

        self.control.blank()?;
        self.control.latch()?;
        self.control.select_rows(self.scan_row)?;
        self.scan_row = self.scan_row.next();
        self.control.light(self.brightness)
    }

    /// The row group the next scan will emit.
    #[must_use]
    pub const fn scan_row(&self) -> ScanRow {
        self.scan_row
    }

    /// Current brightness (255 = fully on).
    #[must_use]
    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Set the brightness used from the next scan on.
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    /// The framebuffer being scanned.
    #[must_use]
    pub const fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Mutable access to the framebuffer being scanned.
    pub fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }

    /// Take the display apart.
    pub fn into_parts(self) -> (Frame, T, C) {
        (self.frame, self.transmitter, self.control)
    }
}

impl<T, C> Deref for Dmd<T, C> {
    type Target = Frame;

    fn deref(&self) -> &Self::Target {
        &self.frame
    }
}

impl<T, C> DerefMut for Dmd<T, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.frame
    }
}
