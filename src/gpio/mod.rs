#![cfg(feature = "rpi")]

mod debounce;
mod pull;

pub use debounce::*;
pub use pull::*;
use rppal::gpio::Gpio;

use std::collections::HashMap;
use std::sync::mpsc;
use enum_iterator::all;
use log::{debug, info};
use thiserror::Error;
use crate::config::GpioInputsConfig;
use crate::phone::*;

#[derive(Error, Debug)]
pub enum LineError {
    #[error("unable to initialize GPIO interface: {0}")]
    Gpio(#[source] rppal::gpio::Error),
    #[error("unable to initialize {line} on pin {pin}: {source}")]
    Acquire {
        line: InputLine,
        pin: u8,
        #[source]
        source: rppal::gpio::Error
    },
    #[error("{0} was never acquired")]
    NotAcquired(InputLine),
}

/// Supplies debounced edges for the phone's four input lines.
pub struct EdgeSource {
    gpio: Gpio,
    /// Acquired input pins, by the line they carry.
    inputs: HashMap<InputLine, SoftInputPin>,
    /// Copy of config used to initialize pins.
    config: GpioInputsConfig,
}

impl EdgeSource {
    pub fn new(config: &GpioInputsConfig) -> Result<Self, LineError> {
        let gpio = Gpio::new().map_err(LineError::Gpio)?;
        Ok(Self {
            gpio,
            inputs: Default::default(),
            config: config.clone(),
        })
    }

    /// Claims every input line. Any line that can't be claimed is fatal.
    pub fn acquire_all(&mut self) -> Result<(), LineError> {
        for line in all::<InputLine>() {
            info!("Initializing {}...", line);
            self.acquire(line)?;
        }
        Ok(())
    }

    fn acquire(&mut self, line: InputLine) -> Result<(), LineError> {
        let input_config = self.config.get(line);
        let pin_id = input_config.pin;
        let acquire_err = |source: rppal::gpio::Error| LineError::Acquire { line, pin: pin_id, source };

        let pin = self.gpio.get(pin_id).map_err(acquire_err)?;
        let soft_input = make_input_pin(pin, Pull::from(&input_config.pull))
            .debounce(input_config.bounce_time())
            .map_err(acquire_err)?;

        debug!("{} on pin {} (bounce {:?})", line, pin_id, input_config.bounce_time());
        self.inputs.insert(line, soft_input);
        Ok(())
    }

    /// Registers `handler` to receive every debounced edge on `line`.
    /// Lines configured with `invert` report their edges swapped.
    pub fn subscribe<F>(&mut self, line: InputLine, mut handler: F) -> Result<(), LineError>
    where F: FnMut(Edge) + Send + 'static {
        let invert = self.config.get(line).invert;
        let input = self.inputs.get_mut(&line).ok_or(LineError::NotAcquired(line))?;
        input.on_changed(move |high| {
            let edge = Edge::from_level(high);
            handler(if invert { edge.inverted() } else { edge });
        });
        Ok(())
    }

    /// Forwards edges from all lines into the session's event channel.
    pub fn listen(&mut self, tx: mpsc::Sender<LineEvent>) -> Result<(), LineError> {
        for line in all::<InputLine>() {
            let sender = tx.clone();
            self.subscribe(line, move |edge| {
                let _ = sender.send(LineEvent::Edge(line, edge));
            })?;
        }
        info!("GPIO inputs initialized.");
        Ok(())
    }
}
