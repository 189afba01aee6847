mod config;
#[cfg(not(feature = "rpi"))]
mod console;
mod dial;
mod engine;
#[cfg(feature = "rpi")]
mod gpio;
mod phone;
mod sound;
mod timer;

use std::env;
use std::process;
use std::sync::mpsc;
use anyhow::Context;
use log::{debug, error, info, warn, LevelFilter};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use thread_priority::{set_current_thread_priority, ThreadPriority};
use crate::config::load_config;
use crate::engine::{CallSession, SessionSettings, StatusBoard};
use crate::phone::LineEvent;
use crate::sound::AudioService;
use crate::timer::InterDigitTimer;

const CONFIG_PATH: &str = "./res/dialer.toml";
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    init_logging();
    if let Err(err) = run() {
        error!("{:#}", err);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    print_banner();

    let config_path = env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_owned());
    let config = load_config(&config_path)
        .with_context(|| format!("unable to load configuration from {}", config_path))?;
    log::set_max_level(config.log_level());
    info!("Config loaded from {} ({} numbers)", config_path, config.numbers.len());
    for (number, action) in config.numbers.iter() {
        debug!("  {} => {:?}", number, action);
    }

    let (tx, rx) = mpsc::channel::<LineEvent>();
    let status = StatusBoard::new();

    // Inputs
    #[cfg(feature = "rpi")]
    let _edge_source = {
        let mut edge_source = gpio::EdgeSource::new(&config.gpio.inputs)?;
        edge_source.acquire_all()?;
        edge_source.listen(tx.clone())?;
        edge_source
    };

    #[cfg(not(feature = "rpi"))]
    console::spawn(tx.clone(), status.clone());

    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(LineEvent::Shutdown);
    }).context("unable to install interrupt handler")?;

    let audio = AudioService::spawn(config.sound.clone());
    let timer = InterDigitTimer::spawn(tx);

    if let Some(interval) = config.status_interval() {
        status.spawn_reporter(interval);
    }

    if let Err(err) = set_current_thread_priority(ThreadPriority::Max) {
        warn!("Unable to raise event loop priority: {:?}", err);
    }

    let mut session = CallSession::new(audio, timer, SessionSettings::from(&config));
    info!("Ready.");
    engine::run(&mut session, rx, &status);

    let (audio, _timer) = session.into_parts();
    audio.shutdown();
    info!("Goodbye.");
    Ok(())
}

fn init_logging() {
    let log_config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    // The logger itself passes everything; `log::set_max_level` does the filtering
    if TermLogger::init(LevelFilter::Trace, log_config, TerminalMode::Mixed, ColorChoice::Auto).is_err() {
        eprintln!("Logger was already initialized");
    }
    log::set_max_level(LevelFilter::Info);
}

fn print_banner() {
    println!("   ___  ____  _________   _____  __  ___  _______   __   _______ ");
    println!("  / _ \\/ __ \\/_  __/ _ | / _ \\ \\/ / / _ \\/  _/ _ | / /  / __/ _ \\");
    println!(" / , _/ /_/ / / / / __ |/ , _/\\  / / // // // __ |/ /__/ _// , _/");
    println!("/_/|_|\\____/ /_/ /_/ |_/_/|_| /_/ /____/___/_/ |_/____/___/_/|_| ");
    println!();
    println!("rotary_dialer v{}", VERSION);
    println!();
}
