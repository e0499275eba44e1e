//! Bench tool for the keypad wiring: logs every key decoded from the matrix.
use std::env::var;
use dotenv::dotenv;
use log::{debug, info};
use sysinfo::System;
use time::OffsetDateTime;
use recplay_gpio::GpioDriver;
use recplay_gpio::GpioBias::PullUp;
use recplay_gpio::gpiod::GpiodDriver;
use recplay_gpio::keypad::{GpioMatrixLines, KeyMap, Keypad, MatrixKeypad};
use recplay_gpio::utils::parse_pin_bus;

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!("Architecture {}", System::cpu_arch());

    let chip = var("RECPLAY_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());
    let rows: [usize; 4] = parse_pin_bus(
        &var("RECPLAY_KEYPAD_PINS_ROWS").unwrap_or_else(|_| "4,17,27,22".to_string()),
    )?;
    let cols: [usize; 4] = parse_pin_bus(
        &var("RECPLAY_KEYPAD_PINS_COLS").unwrap_or_else(|_| "18,23,24,25".to_string()),
    )?;
    let keymap = match var("RECPLAY_PROBE_KEYMAP").as_deref() {
        Ok("handset") => KeyMap::HANDSET,
        _ => KeyMap::HEX,
    };

    info!("Keypad @ {} Cols: {:?}, Rows: {:?}", chip, cols, rows);

    let gpio = GpiodDriver::open(&chip)?;
    let mut col_bus = gpio.get_pin_bus(cols)?;
    let mut row_bus = gpio.get_pin_bus(rows)?;
    row_bus.set_bias(PullUp)?;
    let col_out = col_bus.as_output()?;
    let row_in = row_bus.as_input()?;

    let lines = GpioMatrixLines::new(&*col_out, &*row_in)?;
    let mut keypad = MatrixKeypad::new(lines, keymap);
    debug!("{:?} initialized.", keypad);

    info!("Press keys, Ctrl+C to quit.");

    let mut last_press: Option<OffsetDateTime> = None;
    let mut count = 0u32;

    loop {
        let key = keypad.next_key()?;
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        count += 1;

        let since = last_press
            .map(|last| format!(", {} ms after the last one", (now - last).whole_milliseconds()))
            .unwrap_or_default();
        info!("#{} {:?} at {}{}", count, key, now.time(), since);

        last_press = Some(now);
    }
}
