//! Two independent displays on one scan tick.
//!
//! The left display (one panel) is on SPI0: GP18 CLK, GP19 R, GP15 OE, GP16 A, GP17 B,
//! GP14 SCLK. The right display (two panels) is on SPI1, a bus it shares with another
//! device whose active-low chip select is wired to GP5: GP10 CLK, GP11 R, GP9 OE, GP6 A,
//! GP7 B, GP8 SCLK. The right display skips its scan whenever GP5 is low.
//!
//! Every few seconds the right display leaves the tick and rejoins it.
#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

extern crate alloc;

use core::convert::Infallible;

use dmd_kit::{
    Error, Result,
    frame::{GraphicsMode, TestPattern},
    scan::{ChipSelectGuard, Dmd, GpioOutputEnable, HalControlLines, SpiTransmitter},
    scheduler::{NoTimer, SCAN_PERIOD_DEFAULT, Scheduler, SharedDmd},
};
use embassy_executor::Spawner;
use embassy_rp::{
    gpio::{Input, Level, Output, Pull},
    peripherals::{SPI0, SPI1},
    spi::{self, Blocking, Spi},
};
use embassy_time::Timer;
use embedded_alloc::LlffHeap as Heap;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

#[global_allocator]
static HEAP: Heap = Heap::empty();
const HEAP_SIZE: usize = 4 * 1024;

type Lines<G> = HalControlLines<
    GpioOutputEnable<Output<'static>>,
    Output<'static>,
    Output<'static>,
    Output<'static>,
    G,
>;
type LeftDisplay = SharedDmd<SpiTransmitter<Spi<'static, SPI0, Blocking>>, Lines<dmd_kit::scan::NoBusGuard>>;
type RightDisplay =
    SharedDmd<SpiTransmitter<Spi<'static, SPI1, Blocking>>, Lines<ChipSelectGuard<Input<'static>>>>;

static LEFT: StaticCell<LeftDisplay> = StaticCell::new();
static RIGHT: StaticCell<RightDisplay> = StaticCell::new();
static SCHEDULER: Scheduler<'static> = Scheduler::new(NoTimer, SCAN_PERIOD_DEFAULT);

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

    let left = Dmd::new(
        1,
        1,
        SpiTransmitter::new(Spi::new_blocking_txonly(
            p.SPI0,
            p.PIN_18,
            p.PIN_19,
            spi_config.clone(),
        )),
        HalControlLines::new(
            GpioOutputEnable(Output::new(p.PIN_15, Level::Low)),
            Output::new(p.PIN_16, Level::Low),
            Output::new(p.PIN_17, Level::Low),
            Output::new(p.PIN_14, Level::Low),
        ),
    )?;
    let right = Dmd::new(
        2,
        1,
        SpiTransmitter::new(Spi::new_blocking_txonly(
            p.SPI1, p.PIN_10, p.PIN_11, spi_config,
        )),
        HalControlLines::new(
            GpioOutputEnable(Output::new(p.PIN_9, Level::Low)),
            Output::new(p.PIN_6, Level::Low),
            Output::new(p.PIN_7, Level::Low),
            Output::new(p.PIN_8, Level::Low),
        )
        .with_bus_guard(ChipSelectGuard(Input::new(p.PIN_5, Pull::Up))),
    )?;
    let left: &'static LeftDisplay = LEFT.init(SharedDmd::new(left));
    let right: &'static RightDisplay = RIGHT.init(SharedDmd::new(right));

    left.start(&SCHEDULER)?;
    right.start(&SCHEDULER)?;
    spawner.spawn(scan_task(&SCHEDULER)).map_err(Error::TaskSpawn)?;
    defmt::info!("scanning {} displays", SCHEDULER.registered());

    let patterns = [
        TestPattern::Alternate0,
        TestPattern::Alternate1,
        TestPattern::Stripe0,
        TestPattern::Stripe1,
    ];
    let mut round = 0usize;
    loop {
        // Left: cycle the test patterns at falling brightness.
        let pattern = patterns[round % patterns.len()];
        let brightness = 255 - (round % 4) as u8 * 60;
        left.with_dmd(|dmd| {
            dmd.draw_test_pattern(pattern);
            dmd.set_brightness(brightness);
        });

        // Right: a bouncing ring.
        for step in 0..32 {
            right.with_dmd(|dmd| {
                dmd.clear_screen();
                dmd.draw_circle(8 + step * 3 / 2, 8, 6, GraphicsMode::On);
                dmd.draw_box(0, 0, 63, 15, GraphicsMode::On);
            });
            Timer::after_millis(60).await;
        }

        round += 1;
        if round % 4 == 0 {
            let still_running = right.stop(&SCHEDULER)?;
            defmt::info!("right display stopped, others running: {}", still_running);
            Timer::after_millis(1000).await;
            right.start(&SCHEDULER)?;
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
