//! Crate-wide error type.

use derive_more::{Display, Error};

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors raised while constructing displays or talking to the panel hardware.
///
/// Drawing never fails: out-of-range coordinates are clipped instead.
#[derive(Debug, Display, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A display needs at least one panel in each direction.
    #[display("invalid panel grid: {panels_wide} wide x {panels_high} high")]
    InvalidGeometry {
        /// Panels across.
        panels_wide: usize,
        /// Panels down.
        panels_high: usize,
    },

    /// The bitmap or the registry slot list could not be allocated.
    #[display("out of memory")]
    OutOfMemory,

    /// The SPI row transmitter failed.
    #[display("SPI transfer failed: {_0:?}")]
    Spi(#[error(not(source))] embedded_hal::spi::ErrorKind),

    /// A control line or guard pin failed.
    #[display("pin access failed: {_0:?}")]
    Pin(#[error(not(source))] embedded_hal::digital::ErrorKind),

    /// The brightness PWM channel failed.
    #[display("PWM update failed: {_0:?}")]
    Pwm(#[error(not(source))] embedded_hal::pwm::ErrorKind),

    /// Spawning the scan task failed.
    #[display("task spawn failed: {_0:?}")]
    TaskSpawn(#[error(not(source))] embassy_executor::SpawnError),
}

impl From<core::convert::Infallible> for Error {
    fn from(never: core::convert::Infallible) -> Self {
        match never {}
    }
}

impl Error {
    pub(crate) fn spi(err: impl embedded_hal::spi::Error) -> Self {
        Self::Spi(err.kind())
    }

    pub(crate) fn pin(err: impl embedded_hal::digital::Error) -> Self {
        Self::Pin(err.kind())
    }

    pub(crate) fn pwm(err: impl embedded_hal::pwm::Error) -> Self {
        Self::Pwm(err.kind())
    }
}
