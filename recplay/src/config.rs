//! Appliance configuration, stored as JSON.

use std::env::var_os;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use clap::ValueEnum;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use recplay_gpio::keypad::{KeyMap, MATRIX_SIZE};
use crate::filename::FilenamePolicy;
use crate::storage::Storage;

pub const CONFIG_FILE_VAR: &str = "RECPLAY_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ConfigError {
    #[error("filename length {0} is invalid, it must be at least 1")]
    InvalidFilenameLength(usize),
    #[error("record time must be at least one second")]
    InvalidRecordTime,
    #[error("keys {0:?} and {1:?} conflict")]
    ConflictingKeys(char, char),
    #[error("key {0:?} is not on the keypad")]
    KeyNotOnKeypad(char),
}

/// Which call flow the appliance runs.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CallMode {
    /// Dial digits, then press the play or record key.
    #[default]
    Direct,
    /// Pick up, choose play or record, dial, confirm, hang up.
    Call,
}

/// Where keys come from.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    #[default]
    Matrix,
    /// A keyboard on standard input.
    Keyboard,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub play: char,
    pub record: char,
    pub pickup: char,
    pub hangup: char,
    /// After playback, records over the clip just played.
    pub switch_to_record: char,
    /// Keeps the recording.
    pub confirm: char,
    /// Records again under the same filename.
    pub retry: char,
    /// Plays the recording back before deciding.
    pub check: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            play: '*',
            record: '#',
            pickup: 'R',
            hangup: 'P',
            switch_to_record: 'R',
            confirm: '#',
            retry: '0',
            check: '*',
        }
    }
}

/// Clips announcing state changes. Any of them can be left out.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cues {
    pub hello: Option<PathBuf>,
    pub got_a_key: Option<PathBuf>,
    pub start_play: Option<PathBuf>,
    pub start_record: Option<PathBuf>,
    pub reached_max: Option<PathBuf>,
    pub too_short: Option<PathBuf>,
    pub click: Option<PathBuf>,
    pub missing_file: Option<PathBuf>,
    pub pick_up: Option<PathBuf>,
    pub got_enough: Option<PathBuf>,
    pub finished_choose: Option<PathBuf>,
    pub finished_confirm: Option<PathBuf>,
    pub please_hang_up: Option<PathBuf>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeypadPins {
    pub chip: PathBuf,
    pub rows: [usize; MATRIX_SIZE],
    pub cols: [usize; MATRIX_SIZE],
}

impl Default for KeypadPins {
    fn default() -> Self {
        KeypadPins {
            chip: PathBuf::from("/dev/gpiochip0"),
            rows: [4, 17, 27, 22],
            cols: [18, 23, 24, 25],
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioCommands {
    pub player: String,
    pub recorder: String,
    /// ALSA capture device passed to the recorder.
    pub record_device: String,
}

impl Default for AudioCommands {
    fn default() -> Self {
        AudioCommands {
            player: "aplay".to_string(),
            recorder: "arecord".to_string(),
            record_device: "plughw:1,0".to_string(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: CallMode,
    /// Maximum filename length; the exact length in call mode.
    pub filename_len: usize,
    pub must_be_max_filename_len: bool,
    pub max_record_seconds: u32,
    pub input: InputSource,
    pub storage: Storage,
    pub keys: KeyBindings,
    pub cues: Cues,
    /// Custom keypad layout, rows first.
    pub keymap: Option<[[char; MATRIX_SIZE]; MATRIX_SIZE]>,
    pub pins: KeypadPins,
    pub audio: AudioCommands,
    pub poll_interval_ms: u64,
}

impl Config {
    /// Gets the config file path from the environment, or the default one.
    pub fn default_path() -> PathBuf {
        let config_str = var_os(CONFIG_FILE_VAR);
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new(DEFAULT_CONFIG_FILE));
        PathBuf::from(config_str)
    }

    /// Loads the config at `path`, or `None` if there is no file there.
    pub fn try_load(path: &Path) -> std::io::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Checks the settings the appliance cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filename_len < 1 {
            return Err(ConfigError::InvalidFilenameLength(self.filename_len));
        }
        if self.max_record_seconds < 1 {
            return Err(ConfigError::InvalidRecordTime);
        }

        let keys = &self.keys;
        let used = match self.mode {
            CallMode::Direct => {
                for key in [keys.play, keys.record] {
                    if key.is_ascii_digit() {
                        return Err(ConfigError::ConflictingKeys(key, key));
                    }
                }
                distinct(&[keys.play, keys.record])?;
                vec![keys.play, keys.record]
            }
            CallMode::Call => {
                distinct(&[keys.play, keys.record])?;
                distinct(&[keys.hangup, keys.switch_to_record])?;
                distinct(&[keys.retry, keys.check, keys.confirm])?;
                vec![
                    keys.play,
                    keys.record,
                    keys.pickup,
                    keys.hangup,
                    keys.switch_to_record,
                    keys.confirm,
                    keys.retry,
                    keys.check,
                ]
            }
        };

        // A keyboard can type anything, the matrix only what is printed on it.
        if self.input == InputSource::Matrix {
            let keymap = self.keymap();
            if let Some(&key) = used.iter().find(|&&key| !keymap.contains(key)) {
                return Err(ConfigError::KeyNotOnKeypad(key));
            }
        }
        Ok(())
    }

    /// Gets the keypad layout, the handset one unless a custom table is configured.
    pub fn keymap(&self) -> KeyMap {
        match self.keymap {
            Some(keys) => KeyMap::new(keys),
            None => KeyMap::HANDSET,
        }
    }

    /// Gets the filename length rule. The call flow always dials full-length filenames.
    pub fn filename_policy(&self) -> FilenamePolicy {
        FilenamePolicy {
            max_len: self.filename_len,
            must_be_max: self.must_be_max_filename_len || self.mode == CallMode::Call,
        }
    }

    pub fn record_duration(&self) -> Duration {
        Duration::from_secs(self.max_record_seconds as u64)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: CallMode::Direct,
            filename_len: 10,
            must_be_max_filename_len: false,
            max_record_seconds: 30,
            input: InputSource::Matrix,
            storage: Storage::default(),
            keys: KeyBindings::default(),
            cues: Cues::default(),
            keymap: None,
            pins: KeypadPins::default(),
            audio: AudioCommands::default(),
            poll_interval_ms: 10,
        }
    }
}

fn distinct(keys: &[char]) -> Result<(), ConfigError> {
    for (i, &key) in keys.iter().enumerate() {
        if let Some(&other) = keys[i + 1..].iter().find(|&&other| other == key) {
            return Err(ConfigError::ConflictingKeys(key, other));
        }
    }
    Ok(())
}
