//! Two panels side by side: a scrolling banner, then a double-buffered counter.
//!
//! Wiring (Pico GPIO to the panel's HUB12 connector): SPI0 clock GP18 to CLK, SPI0 TX GP19
//! to R, GP15 to OE, GP16 to A, GP17 to B, GP14 to SCLK (latch).
#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

extern crate alloc;

use core::convert::Infallible;

use dmd_kit::{
    Result,
    font::Font,
    frame::{Frame, GraphicsMode},
    scan::{Dmd, GpioOutputEnable, HalControlLines, SpiTransmitter},
    scheduler::{NoTimer, SCAN_PERIOD_DEFAULT, Scheduler, SharedDmd},
};
use embassy_executor::Spawner;
use embassy_rp::{
    gpio::{Level, Output},
    peripherals::SPI0,
    spi::{self, Blocking, Spi},
};
use embassy_time::Timer;
use embedded_alloc::LlffHeap as Heap;
use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_5X8},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

#[global_allocator]
static HEAP: Heap = Heap::empty();
const HEAP_SIZE: usize = 8 * 1024;

type Display = SharedDmd<
    SpiTransmitter<Spi<'static, SPI0, Blocking>>,
    HalControlLines<GpioOutputEnable<Output<'static>>, Output<'static>, Output<'static>, Output<'static>>,
>;

static DISPLAY: StaticCell<Display> = StaticCell::new();
static SCHEDULER: Scheduler<'static> = Scheduler::new(NoTimer, SCAN_PERIOD_DEFAULT);

/// Digits and a colon, 5×7, fixed width.
#[rustfmt::skip]
static DIGITS_5X7: [u8; 6 + 11 * 5] = [
    0x00, 0x00, 5, 7, b'0', 11,
    0x3E, 0x51, 0x49, 0x45, 0x3E, // 0
    0x00, 0x42, 0x7F, 0x40, 0x00, // 1
    0x42, 0x61, 0x51, 0x49, 0x46, // 2
    0x21, 0x41, 0x45, 0x4B, 0x31, // 3
    0x18, 0x14, 0x12, 0x7F, 0x10, // 4
    0x27, 0x45, 0x45, 0x45, 0x39, // 5
    0x3C, 0x4A, 0x49, 0x49, 0x30, // 6
    0x01, 0x71, 0x09, 0x05, 0x03, // 7
    0x36, 0x49, 0x49, 0x49, 0x36, // 8
    0x06, 0x49, 0x49, 0x29, 0x1E, // 9
    0x00, 0x36, 0x36, 0x00, 0x00, // :
];

#[embassy_executor::task]
async fn scan_task(scheduler: &'static Scheduler<'static>) {
    scheduler.run().await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    init_heap();
    let p = embassy_rp::init(Default::default());

    let mut spi_config = spi::Config::default();
    spi_config.frequency = 4_000_000;
    let spi = Spi::new_blocking_txonly(p.SPI0, p.PIN_18, p.PIN_19, spi_config);
    let control = HalControlLines::new(
        GpioOutputEnable(Output::new(p.PIN_15, Level::Low)),
        Output::new(p.PIN_16, Level::Low),
        Output::new(p.PIN_17, Level::Low),
        Output::new(p.PIN_14, Level::Low),
    );
    let dmd = Dmd::new(2, 1, SpiTransmitter::new(spi), control)?;
    let display: &'static Display = DISPLAY.init(SharedDmd::new(dmd));

    display.start(&SCHEDULER)?;
    let token = scan_task(&SCHEDULER);
    spawner.spawn(token).map_err(dmd_kit::Error::TaskSpawn)?;
    defmt::info!("scanning, {} display(s)", SCHEDULER.registered());

    let digits = Font::new(&DIGITS_5X7);
    let mut banner = Frame::for_panels(2, 1)?;
    let mut back = Frame::for_panels(2, 1)?;

    loop {
        // Banner: embedded-graphics text, wrapped around the frame one column at a time.
        banner.clear_screen();
        Text::with_baseline(
            "HELLO DMD",
            Point::new(8, 4),
            MonoTextStyle::new(&FONT_5X8, BinaryColor::On),
            Baseline::Top,
        )
        .draw(&mut banner)?;
        for _ in 0..banner.width() {
            banner.marquee_scroll_x(-1);
            display.with_dmd(|dmd| dmd.copy_frame(&banner, 0, 0));
            Timer::after_millis(40).await;
        }

        // Counter: draw off-screen, then swap it in whole.
        for count in 0..=100u32 {
            back.clear_screen();
            let text = alloc::format!("{count}");
            let x = (back.width() - digits.string_width(&text)) as i32 / 2;
            back.draw_string(x, 4, &text, GraphicsMode::On, &digits);
            back.draw_box(0, 0, back.width() as i32 - 1, 15, GraphicsMode::On);
            display.swap_buffers(&mut back);
            Timer::after_millis(50).await;
        }
    }
}

fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[expect(unsafe_code, reason = "the heap is handed its memory exactly once, at startup")]
    unsafe {
        HEAP.init((&raw mut HEAP_MEM) as usize, HEAP_SIZE);
    }
}
