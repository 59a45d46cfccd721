//! Drive tiled monochrome dot-matrix LED panels (32×16 "DMD" panels) from one packed bitmap.
//!
//! The crate has two halves that share a bitmap:
//!
//! - [`Frame`](crate::frame::Frame): a 1-bit-per-pixel framebuffer addressed through a
//!   panel-tiling transform, with drawing primitives, region moves, scrolling and text.
//! - [`Dmd`](crate::scan::Dmd) + [`Scheduler`](crate::scheduler::Scheduler): the interleaved
//!   scan-out state machine that pushes the bitmap to the panels' shift registers, and the
//!   registry that lets many displays share one periodic timer tick.
//!
//! # Glossary
//!
//! - **Panel:** one physical 32×16 LED matrix. Panels chain through their shift registers.
//! - **Unified order:** the byte order the chained shift registers expect; every row of the
//!   panel grid is laid end-to-end as one long row.
//! - **Scan row:** one of the four interleaved row groups (`r`, `r+4`, `r+8`, `r+12`) that the
//!   panel lights at a time.
#![cfg_attr(not(feature = "host"), no_std)]

extern crate alloc;

// Compile-time checks: exactly one board must be selected (unless testing with host feature)
#[cfg(all(not(any(feature = "pico1", feature = "pico2")), not(feature = "host")))]
compile_error!("Must enable exactly one board feature: 'pico1' or 'pico2'");

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

// Compile-time checks: exactly one architecture must be selected (unless testing with host feature)
#[cfg(all(not(any(feature = "arm", feature = "riscv")), not(feature = "host")))]
compile_error!("Must enable exactly one architecture feature: 'arm' or 'riscv'");

#[cfg(all(feature = "arm", feature = "riscv"))]
compile_error!("Cannot enable both 'arm' and 'riscv' features simultaneously");

// Compile-time check: pico1 only supports ARM
#[cfg(all(feature = "pico1", feature = "riscv"))]
compile_error!("Pico 1 (RP2040) only supports ARM architecture, not RISC-V");

// Must come first so the logging macros are visible to the modules below.
#[macro_use]
mod fmt;

mod error;
pub mod font;
pub mod frame;
pub mod scan;
pub mod scheduler;
#[cfg(feature = "host")]
pub mod to_png;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
