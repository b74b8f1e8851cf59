//! Mnemo - Device Configuration Firmware
//!
//! Main firmware binary for RP2040-based boards. Restores the broker
//! address and credentials from flash at boot.
//!
//! Named after the Greek "mneme" meaning "memory".

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_time::Timer;
use embedded_alloc::LlffHeap as Heap;
use {defmt_rtt as _, panic_probe as _};

mod controller;
mod storage;

use crate::controller::Controller;
use mnemo_core::config::Field;

// Values baked in at build time, e.g. `MNEMO_BROKER_ADDRESS=mqtt.lan cargo build`
const PROVISIONED: [(Field, Option<&str>); 3] = [
    (Field::BrokerAddress, option_env!("MNEMO_BROKER_ADDRESS")),
    (Field::Username, option_env!("MNEMO_USERNAME")),
    (Field::Password, option_env!("MNEMO_PASSWORD")),
];

// Heap allocator for JSON encoding and decoding
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 8KB (documents are capped at 512 bytes)
const HEAP_SIZE: usize = 8 * 1024;

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Mnemo firmware starting...");

    // Initialize heap allocator
    init_heap();

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Load configuration from flash (or keep compiled-in defaults)
    let volume = storage::config_volume(p.FLASH);
    let mut controller = Controller::new(volume);
    controller.boot();
    controller.apply_provisioned(&PROVISIONED);

    let config = controller.config();
    info!("Configuration ready: {}", config);

    loop {
        Timer::after_secs(60).await;
    }
}

fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
