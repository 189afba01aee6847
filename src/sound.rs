use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use rand::Rng;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use rodio::source::{Buffered, SamplesConverter, SineWave};
use thiserror::Error;
use crate::config::SoundConfig;

const SOUND_EXTENSIONS: &[&str] = &["wav", "ogg", "mp3"];
const FREQ_DIAL_A: f32 = 350.0;
const FREQ_DIAL_B: f32 = 440.0;

#[derive(Error, Debug)]
pub enum SoundError {
    #[error("no audio output device available: {0}")]
    Device(#[from] rodio::StreamError),
    #[error("unable to open audio sink: {0}")]
    Sink(#[from] rodio::PlayError),
    #[error("sound root '{path}' is unavailable: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error
    },
    #[error("invalid sound search pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("unable to open sound file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error
    },
    #[error("unable to decode sound file '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError
    },
    #[error("no sound matches '{0}'")]
    NotFound(String),
}

/// Opaque audio operations the call session depends on.
pub trait AudioPort {
    /// Stops whatever is playing and starts the named clip.
    fn play(&self, clip: &str);

    /// Queues the looping dial tone behind anything still playing.
    fn play_dial_tone(&self);

    /// Stops all playback. Harmless if nothing is playing.
    fn stop_all(&self);
}

/// Converts decibels to amplitude (assuming a normalized signal).
fn db_to_amp(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Forms the lookup key of a sound file: its path under `root`, without extension, `/`-separated.
fn sound_key(root: &Path, path: &Path) -> Option<String> {
    let key = path
        .strip_prefix(root).ok()?
        .with_extension("")
        .to_string_lossy()
        .replace('\\', "/");
    Some(key)
}

/// Returns the positions of all keys matching a glob pattern.
fn glob_matches<'a>(keys: impl Iterator<Item = &'a str>, pattern: &str) -> Vec<usize> {
    let glob = match globset::GlobBuilder::new(pattern).literal_separator(true).build() {
        Ok(glob) => glob,
        Err(_) => return vec![]
    };
    let matcher = glob.compile_matcher();
    keys.enumerate()
        .filter(|(_, key)| matcher.is_match(key))
        .map(|(index, _)| index)
        .collect()
}

struct Sound {
    src: Buffered<SamplesConverter<rodio::Decoder<BufReader<File>>, i16>>
}

impl Sound {
    fn from_file(path: &Path) -> Result<Self, SoundError> {
        let file = File::open(path).map_err(|source| SoundError::Open { path: path.to_owned(), source })?;
        let src = rodio::Decoder::new(BufReader::new(file))
            .map_err(|source| SoundError::Decode { path: path.to_owned(), source })?
            .convert_samples::<i16>();

        Ok(Self {
            src: src.buffered()
        })
    }
}

/// Plays clips and tones on the default output device.
///
/// Only one sink is used, so there is never more than one clip audible at once.
pub struct SoundEngine {
    root_path: PathBuf,
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Sink,
    config: SoundConfig,
    sounds: IndexMap<String, Sound>,
    sound_glob_cache: HashMap<String, Vec<usize>>,
}

impl SoundEngine {
    pub fn new(config: SoundConfig) -> Result<Self, SoundError> {
        let (stream, handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&handle)?;
        sink.set_volume(config.master_volume);
        let root_path = Path::new(config.root.as_str())
            .canonicalize()
            .map_err(|source| SoundError::Root { path: PathBuf::from(&config.root), source })?;

        let mut engine = Self {
            root_path,
            _stream: stream,
            handle,
            sink,
            config,
            sounds: IndexMap::new(),
            sound_glob_cache: Default::default(),
        };

        engine.load_sounds()?;
        Ok(engine)
    }

    fn load_sounds(&mut self) -> Result<(), SoundError> {
        info!("Loading sound clips from {}", self.root_path.display());
        self.sounds.clear();
        self.sound_glob_cache.clear();
        for ext in SOUND_EXTENSIONS {
            let search_path = self.root_path.join("**").join(format!("*.{}", ext));
            for path in glob::glob(&search_path.to_string_lossy())?.flatten() {
                let Some(sound_key) = sound_key(&self.root_path, &path) else { continue };
                match Sound::from_file(&path) {
                    Ok(sound) => {
                        debug!("Loaded sound '{}'", sound_key);
                        self.sounds.insert(sound_key, sound);
                    },
                    Err(err) => warn!("Skipping sound: {}", err)
                }
            }
        }
        info!("Total sounds loaded: {}", self.sounds.len());
        Ok(())
    }

    /// Looks up a sound by exact key, then by glob (picking a random match).
    fn find_sound(&mut self, key: &str) -> Option<usize> {
        if let Some(index) = self.sounds.get_index_of(key) {
            return Some(index)
        }

        if !self.sound_glob_cache.contains_key(key) {
            let matches = glob_matches(self.sounds.keys().map(String::as_str), key);
            if matches.is_empty() {
                return None
            }
            self.sound_glob_cache.insert(key.to_owned(), matches);
        }

        let glob_list = self.sound_glob_cache.get(key)?;
        let pick = rand::thread_rng().gen_range(0..glob_list.len());
        Some(glob_list[pick])
    }

    pub fn play(&mut self, key: &str) -> Result<(), SoundError> {
        let index = self.find_sound(key).ok_or_else(|| SoundError::NotFound(key.to_owned()))?;
        self.stop_all()?;
        let (_, sound) = self.sounds.get_index(index).ok_or_else(|| SoundError::NotFound(key.to_owned()))?;
        self.sink.append(sound.src.clone());
        Ok(())
    }

    pub fn play_dial_tone(&mut self) -> Result<(), SoundError> {
        let volume = db_to_amp(self.config.dial_tone_gain);
        if let Some(dial_tone) = self.config.dial_tone.clone() {
            let index = self.find_sound(&dial_tone).ok_or(SoundError::NotFound(dial_tone))?;
            if let Some((_, sound)) = self.sounds.get_index(index) {
                self.sink.append(sound.src.clone().amplify(volume).repeat_infinite());
            }
            return Ok(())
        }

        let half_volume = volume * 0.5;
        let dial_tone = SineWave::new(FREQ_DIAL_A)
            .mix(SineWave::new(FREQ_DIAL_B))
            .amplify(half_volume);
        self.sink.append(dial_tone);
        Ok(())
    }

    pub fn stop_all(&mut self) -> Result<(), SoundError> {
        if !self.sink.empty() {
            self.sink.stop();
            self.sink = Sink::try_new(&self.handle)?;
            self.sink.set_volume(self.config.master_volume);
        }
        Ok(())
    }
}

enum AudioCommand {
    Play(String),
    DialTone,
    StopAll,
}

/// Runs a [`SoundEngine`] on its own thread so slow playback never stalls the session.
///
/// If no output device can be opened, the service keeps accepting commands and only logs them.
pub struct AudioService {
    tx: Option<mpsc::Sender<AudioCommand>>,
    thread: Option<JoinHandle<()>>,
}

impl AudioService {
    pub fn spawn(config: SoundConfig) -> Self {
        let (tx, rx) = mpsc::channel::<AudioCommand>();

        let thread = thread::Builder::new()
            .name("audio".into())
            .spawn(move || {
                let mut engine = match SoundEngine::new(config) {
                    Ok(engine) => Some(engine),
                    Err(err) => {
                        error!("Sound engine unavailable; continuing without audio: {}", err);
                        None
                    }
                };

                while let Ok(command) = rx.recv() {
                    let Some(engine) = engine.as_mut() else {
                        debug!("Audio command dropped (no sound engine)");
                        continue
                    };

                    let result = match &command {
                        AudioCommand::Play(clip) => {
                            debug!("Playing '{}'", clip);
                            engine.play(clip)
                        },
                        AudioCommand::DialTone => engine.play_dial_tone(),
                        AudioCommand::StopAll => engine.stop_all(),
                    };

                    if let Err(err) = result {
                        warn!("Audio command failed: {}", err);
                    }
                }

                if let Some(mut engine) = engine {
                    let _ = engine.stop_all();
                }
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!("Unable to start audio thread: {}", err);
                None
            }
        };

        Self {
            tx: Some(tx),
            thread
        }
    }

    fn send(&self, command: AudioCommand) {
        if let Some(tx) = &self.tx {
            if tx.send(command).is_err() {
                warn!("Audio thread is gone; command dropped");
            }
        }
    }

    /// Closes the command channel and waits (briefly) for the audio thread to wind down.
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            let deadline = std::time::Instant::now() + Duration::from_secs(1);
            while !thread.is_finished() && std::time::Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

impl AudioPort for AudioService {
    fn play(&self, clip: &str) {
        self.send(AudioCommand::Play(clip.to_owned()));
    }

    fn play_dial_tone(&self) {
        self.send(AudioCommand::DialTone);
    }

    fn stop_all(&self) {
        self.send(AudioCommand::StopAll);
    }
}
