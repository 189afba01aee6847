use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;
use crate::engine::NumberTable;
#[cfg(feature = "rpi")]
use crate::phone::InputLine;

#[allow(non_camel_case_types)]
type ms = u64;

const DEFAULT_INTER_DIGIT_TIMEOUT_MS: ms = 2000;
#[cfg(feature = "rpi")]
const DEFAULT_BOUNCE_MS: ms = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error
    },
    #[error("unable to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for '{key}': {reason}")]
    Invalid {
        key: &'static str,
        reason: String
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct DialerConfig {
    /// Delay (in milliseconds) to wait after the last digit is dialed,
    /// before the dialed number is evaluated.
    #[serde(default = "default_inter_digit_timeout_ms")]
    pub inter_digit_timeout_ms: ms,

    /// Period (in milliseconds) of the status line written to the log.
    /// Set to 0 to disable.
    #[serde(default)]
    pub status_interval_ms: ms,

    /// When the dial tone is stopped relative to dialing.
    /// See table for supported values.
    ///
    /// |Value                  |Dial tone stops...                    |
    /// |:----------------------|:-------------------------------------|
    /// |`"stop-on-evaluate"`   |when the dialed number is evaluated   |
    /// |`"stop-on-first-digit"`|as soon as the first digit is dialed  |
    #[serde(default)]
    pub tone_timing: ToneTiming,

    /// Maximum log level (`"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`, `"off"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// GPIO configuration.
    #[serde(default)]
    #[cfg_attr(not(feature = "rpi"), allow(dead_code))]
    pub gpio: GpioConfig,

    /// Sound configuration.
    #[serde(default)]
    pub sound: SoundConfig,

    /// Recognized numbers and what dialing them does.
    #[serde(default = "NumberTable::reference")]
    pub numbers: NumberTable,
}

#[derive(Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToneTiming {
    #[default]
    StopOnEvaluate,
    StopOnFirstDigit,
}

// Pin settings are only read by the GPIO edge source
#[cfg_attr(not(feature = "rpi"), allow(dead_code))]
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct GpioConfig {
    /// Input configuration.
    #[serde(default)]
    pub inputs: GpioInputsConfig,
}

#[cfg_attr(not(feature = "rpi"), allow(dead_code))]
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct GpioInputsConfig {
    /// Input configuration for the dial (pulse component).
    pub dial_pulse: InputPinConfig,
    /// Input configuration for the dial (off-normal component).
    pub dial_active: InputPinConfig,
    /// Input configuration for the switchhook.
    pub hook: InputPinConfig,
    /// Input configuration for the reset button.
    pub reset: InputPinConfig,
}

impl Default for GpioInputsConfig {
    /// Pins used by the reference wiring on a Raspberry Pi Zero header.
    fn default() -> Self {
        Self {
            dial_pulse: InputPinConfig::with_pin(15),
            dial_active: InputPinConfig::with_pin(14),
            hook: InputPinConfig::with_pin(23),
            reset: InputPinConfig::with_pin(25),
        }
    }
}

#[cfg(feature = "rpi")]
impl GpioInputsConfig {
    pub fn get(&self, line: InputLine) -> &InputPinConfig {
        match line {
            InputLine::DialPulse => &self.dial_pulse,
            InputLine::DialActive => &self.dial_active,
            InputLine::Hook => &self.hook,
            InputLine::Reset => &self.reset,
        }
    }
}

#[cfg_attr(not(feature = "rpi"), allow(dead_code))]
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct InputPinConfig {
    /// BCM pin number of the input.
    pub pin: u8,
    /// Bounce time (ms) of the input. Defaults to 10.
    pub bounce_ms: Option<ms>,
    /// Name of the resistor type to use. Defaults to "up".
    #[serde(default = "default_pull")]
    pub pull: Option<String>,
    /// Swaps rising and falling edges for inputs wired the other way around.
    #[serde(default)]
    pub invert: bool,
}

impl InputPinConfig {
    fn with_pin(pin: u8) -> Self {
        Self {
            pin,
            bounce_ms: None,
            pull: default_pull(),
            invert: false,
        }
    }

    #[cfg(feature = "rpi")]
    pub fn bounce_time(&self) -> Duration {
        Duration::from_millis(self.bounce_ms.unwrap_or(DEFAULT_BOUNCE_MS))
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct SoundConfig {
    /// Directory that sound clips are loaded from.
    pub root: String,
    /// Initial master volume.
    pub master_volume: f32,
    /// Clip to loop as the dial tone. A synthesized tone is used when unset.
    pub dial_tone: Option<String>,
    /// Gain (dB) of the dial tone.
    pub dial_tone_gain: f32,
    /// Clip played for numbers that aren't in service.
    pub fallback: String,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            root: "./res/sounds".to_owned(),
            master_volume: 1.0,
            dial_tone: None,
            dial_tone_gain: -6.0,
            fallback: "not-working".to_owned(),
        }
    }
}

impl DialerConfig {
    pub fn inter_digit_timeout(&self) -> Duration {
        Duration::from_millis(self.inter_digit_timeout_ms)
    }

    pub fn status_interval(&self) -> Option<Duration> {
        match self.status_interval_ms {
            0 => None,
            interval => Some(Duration::from_millis(interval))
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.inter_digit_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "inter-digit-timeout-ms",
                reason: "must be greater than zero".to_owned()
            })
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(ConfigError::Invalid {
                key: "log-level",
                reason: format!("unknown level '{}'", self.log_level)
            })
        }

        if !(0.0..=2.0).contains(&self.sound.master_volume) {
            return Err(ConfigError::Invalid {
                key: "sound.master-volume",
                reason: format!("{} is outside 0.0..=2.0", self.sound.master_volume)
            })
        }

        Ok(())
    }
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            inter_digit_timeout_ms: DEFAULT_INTER_DIGIT_TIMEOUT_MS,
            status_interval_ms: 0,
            tone_timing: ToneTiming::default(),
            log_level: default_log_level(),
            gpio: Default::default(),
            sound: Default::default(),
            numbers: NumberTable::reference(),
        }
    }
}

fn default_inter_digit_timeout_ms() -> ms {
    DEFAULT_INTER_DIGIT_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_pull() -> Option<String> {
    Some("up".to_owned())
}

pub fn parse_config(config_str: &str) -> Result<DialerConfig, ConfigError> {
    let config: DialerConfig = toml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<DialerConfig, ConfigError> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source
    })?;
    parse_config(&config_str)
}
