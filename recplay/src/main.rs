mod app;
mod audio;
mod cli;
mod config;
mod filename;
mod storage;
mod utils;

use std::env::var;
use std::thread;
use std::time::Duration;
use clap::Parser;
use dotenv::dotenv;
use eyre::WrapErr;
use log::{debug, info, warn};
use sysinfo::System;
use recplay_gpio::GpioDriver;
use recplay_gpio::GpioBias::PullUp;
use recplay_gpio::gpiod::GpiodDriver;
use recplay_gpio::keypad::{GpioMatrixLines, Keypad, MatrixKeypad, StreamKeypad};
use recplay_gpio::utils::parse_pin_bus;
use crate::app::App;
use crate::audio::{AudioSink, ProcessAudio};
use crate::cli::Args;
use crate::config::{Config, InputSource};

/// Overrides the keypad pins from the environment.
fn apply_pin_env(config: &mut Config) -> eyre::Result<()> {
    if let Ok(chip) = var("RECPLAY_GPIO_CHIP") {
        config.pins.chip = chip.into();
    }
    if let Ok(rows) = var("RECPLAY_KEYPAD_PINS_ROWS") {
        config.pins.rows = parse_pin_bus(&rows)
            .wrap_err_with(|| format!("Invalid keypad row pins {:?}", rows))?;
    }
    if let Ok(cols) = var("RECPLAY_KEYPAD_PINS_COLS") {
        config.pins.cols = parse_pin_bus(&cols)
            .wrap_err_with(|| format!("Invalid keypad column pins {:?}", cols))?;
    }
    Ok(())
}

fn log_system() {
    const UNKNOWN_STR: &str = "???";

    info!(
        "Running on {} ({}), kernel {}, host {}, {}",
        System::name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );
}

fn run(
    config: Config,
    keypad: &mut dyn Keypad<Key = char>,
    audio: &mut dyn AudioSink,
) -> eyre::Result<()> {
    let mut app = App::new(config, keypad, audio)?;

    info!("RecPlay initialized.");
    app.greet();

    info!("Starting main loop...");
    loop {
        if let Err(e) = app.update() {
            warn!("Failed to read a key: {}", e);
            thread::sleep(Duration::from_secs(1));
        }
    }
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("RecPlay starting...");
    log_system();

    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);

    debug!("Trying to load config from {}...", config_path.display());
    let mut config = if let Some(config) = Config::try_load(&config_path)
        .wrap_err_with(|| format!("Failed to read {}", config_path.display()))?
    {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save(&config_path)?;
        info!("Default config saved.");
        config
    };
    args.apply(&mut config);
    apply_pin_env(&mut config)?;
    config.validate().wrap_err("Refusing to start")?;

    info!(
        "Mode {:?}, filename length {}{}, record time {} s, storing in {}.",
        config.mode,
        config.filename_len,
        if config.filename_policy().must_be_max { " (exact)" } else { "" },
        config.max_record_seconds,
        config.storage.dir().display(),
    );

    let mut audio = ProcessAudio::new(
        config.audio.clone(),
        config.cues.missing_file.clone(),
        config.cues.click.clone(),
    );

    match config.input {
        InputSource::Keyboard => {
            info!("Reading keys from stdin.");
            let mut keypad = StreamKeypad::new(std::io::stdin())
                .with_idle_interval(config.poll_interval());
            run(config, &mut keypad, &mut audio)
        }
        InputSource::Matrix => {
            info!("Keypad @ {} Cols: {:?}, Rows: {:?}",
                config.pins.chip.display(), config.pins.cols, config.pins.rows);

            debug!("Initializing GPIO driver...");
            let gpio = GpiodDriver::open(&config.pins.chip)?;
            debug!("{:?} initialized.", gpio);

            debug!("Initializing keypad driver...");
            let mut keypad_col_bus = gpio.get_pin_bus(config.pins.cols)?;
            let mut keypad_row_bus = gpio.get_pin_bus(config.pins.rows)?;
            keypad_row_bus.set_bias(PullUp)?;
            let keypad_col_out = keypad_col_bus.as_output()?;
            let keypad_row_in = keypad_row_bus.as_input()?;

            let lines = GpioMatrixLines::new(&*keypad_col_out, &*keypad_row_in)?;
            let mut keypad = MatrixKeypad::new(lines, config.keymap())
                .with_poll_interval(config.poll_interval());
            debug!("{:?} initialized.", keypad);

            run(config, &mut keypad, &mut audio)
        }
    }
}
