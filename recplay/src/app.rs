//! The module for the call flow state and logic.

use std::path::PathBuf;
use log::{debug, info, trace};
use recplay_gpio::GpioResult;
use recplay_gpio::keypad::Keypad;
use crate::audio::AudioSink;
use crate::config::{CallMode, Config, ConfigError};
use crate::filename::{FilenameBuffer, FilenamePolicy, PushError};

/// What to do with a dialed filename.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Play,
    Record,
}

/// Enum that can represent the different states of the call flow.
///
/// The direct flow only rests in [CallState::Idle] and [CallState::Accumulating]; the
/// call flow rests in every state but [CallState::Accumulating] and [CallState::Recording].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CallState {
    /// Nothing dialed yet, or waiting for the handset to be picked up.
    #[default]
    Idle,
    /// Collecting digits until the play or record key.
    Accumulating,
    /// Handset picked up, waiting for the choice between play and record.
    PickedUp,
    /// Collecting a full-length filename for the given action.
    Dialing(Action),
    /// A recording was played; waiting for hang-up or for the switch to recording.
    Playing,
    /// Recording is in progress.
    Recording,
    /// A recording was made; waiting for retry, check or confirm.
    Confirming,
    /// Recording confirmed; waiting for hang-up.
    WaitingHangup,
}

#[derive(Copy, Clone, Debug)]
enum Cue {
    Hello,
    GotAKey,
    StartPlay,
    StartRecord,
    ReachedMax,
    TooShort,
    PickUp,
    GotEnough,
    FinishedChoose,
    FinishedConfirm,
    PleaseHangUp,
}

/// The main app state struct.
pub struct App<'a> {
    /// The configuration for the app.
    config: Config,
    /// The length rule dialed filenames have to pass.
    policy: FilenamePolicy,
    /// The current state of the call flow.
    state: CallState,
    /// The digits dialed so far.
    filename: FilenameBuffer,
    keypad: &'a mut dyn Keypad<Key = char>,
    audio: &'a mut dyn AudioSink,
}

impl <'a> App<'a> {
    /// Creates a new instance of the App.
    ///
    /// Fails if the config is not one the app can run with.
    pub fn new(
        config: Config,
        keypad: &'a mut dyn Keypad<Key = char>,
        audio: &'a mut dyn AudioSink,
    ) -> Result<App<'a>, ConfigError> {
        config.validate()?;
        let filename = FilenameBuffer::new(config.filename_len)
            .ok_or(ConfigError::InvalidFilenameLength(config.filename_len))?;

        Ok(App {
            policy: config.filename_policy(),
            config,
            state: CallState::default(),
            filename,
            keypad,
            audio,
        })
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    pub fn filename(&self) -> &str {
        self.filename.as_str()
    }

    /// Plays the greeting.
    pub fn greet(&mut self) {
        self.cue(Cue::Hello);
    }

    /// Waits for the next key and handles it.
    pub fn update(&mut self) -> GpioResult<()> {
        if let Some(key) = self.keypad.poll_key()? {
            self.handle_key(key);
        }
        Ok(())
    }

    /// Moves the call flow forward by one key.
    pub fn handle_key(&mut self, key: char) {
        trace!("Key {:?} in {:?}.", key, self.state);
        match self.config.mode {
            CallMode::Direct => self.handle_direct(key),
            CallMode::Call => self.handle_call(key),
        }
    }

    fn handle_direct(&mut self, key: char) {
        let action = if key == self.config.keys.play {
            Some(Action::Play)
        } else if key == self.config.keys.record {
            Some(Action::Record)
        } else {
            None
        };

        if let Some(action) = action {
            if self.policy.accepts(&self.filename) {
                match action {
                    Action::Play => {
                        self.cue(Cue::StartPlay);
                        self.set_state(CallState::Playing);
                        let path = self.recording_path();
                        info!("Playing {}.", path.display());
                        self.audio.play(&path);
                    }
                    Action::Record => self.record(),
                }
            } else {
                info!("Filename {:?} does not have a valid length.", self.filename.as_str());
                self.cue(Cue::TooShort);
            }
            self.filename.clear();
            self.set_state(CallState::Idle);
            return;
        }

        match self.filename.push(key) {
            Ok(()) => {
                self.cue(Cue::GotAKey);
                self.set_state(CallState::Accumulating);
            }
            Err(PushError::Full) => {
                debug!("Filename reached {} digits, starting over.", self.filename.capacity());
                self.cue(Cue::ReachedMax);
                self.filename.clear();
                self.set_state(CallState::Accumulating);
            }
            Err(PushError::NotADigit) => trace!("Ignoring {:?}.", key),
        }
    }

    fn handle_call(&mut self, key: char) {
        let keys = self.config.keys;

        match self.state {
            CallState::Idle | CallState::Accumulating | CallState::Recording => {
                if key == keys.pickup {
                    info!("Picked up.");
                    self.filename.clear();
                    self.set_state(CallState::PickedUp);
                    self.cue(Cue::PickUp);
                }
            }
            CallState::PickedUp => {
                if key == keys.play {
                    self.dial(Action::Play);
                } else if key == keys.record {
                    self.dial(Action::Record);
                } else {
                    self.cue(Cue::PickUp);
                }
            }
            CallState::Dialing(action) => match self.filename.push(key) {
                Ok(()) => {
                    self.cue(Cue::GotAKey);
                    if self.filename.is_full() {
                        self.dialed(action);
                    }
                }
                Err(err) => trace!("Discarding {:?}: {}", key, err),
            },
            CallState::Playing => {
                if key == keys.hangup {
                    self.hang_up();
                } else if key == keys.switch_to_record {
                    // The filename just played becomes the record target.
                    info!("Recording over {:?}.", self.filename.as_str());
                    self.dial(Action::Record);
                } else {
                    self.cue(Cue::FinishedChoose);
                }
            }
            CallState::Confirming => {
                if key == keys.retry {
                    info!("Recording {:?} again.", self.filename.as_str());
                    self.record();
                    self.cue(Cue::FinishedConfirm);
                } else if key == keys.check {
                    let path = self.recording_path();
                    self.audio.play_to_end(&path);
                    self.cue(Cue::FinishedConfirm);
                } else if key == keys.confirm {
                    info!("Recording {:?} kept.", self.filename.as_str());
                    self.set_state(CallState::WaitingHangup);
                    self.cue(Cue::PleaseHangUp);
                } else {
                    self.cue(Cue::FinishedConfirm);
                }
            }
            CallState::WaitingHangup => {
                if key == keys.hangup {
                    self.hang_up();
                } else {
                    self.cue(Cue::PleaseHangUp);
                }
            }
        }
    }

    /// Starts collecting digits for `action`. A filename that is already complete is
    /// used right away.
    fn dial(&mut self, action: Action) {
        self.set_state(CallState::Dialing(action));
        if self.filename.is_full() {
            self.dialed(action);
        }
    }

    fn dialed(&mut self, action: Action) {
        self.cue(Cue::GotEnough);
        match action {
            Action::Play => {
                self.set_state(CallState::Playing);
                let path = self.recording_path();
                info!("Playing {}.", path.display());
                self.audio.play_to_end(&path);
                self.cue(Cue::FinishedChoose);
            }
            Action::Record => {
                self.record();
                self.cue(Cue::FinishedConfirm);
            }
        }
    }

    /// Records the dialed filename, blocking for the whole record time.
    ///
    /// Ends in [CallState::Confirming] in the call flow.
    fn record(&mut self) {
        self.cue(Cue::StartRecord);
        self.set_state(CallState::Recording);
        let path = self.recording_path();
        self.audio.record(&path, self.config.record_duration());
        if self.config.mode == CallMode::Call {
            self.set_state(CallState::Confirming);
        }
    }

    fn hang_up(&mut self) {
        info!("Hung up.");
        self.filename.clear();
        self.set_state(CallState::Idle);
    }

    fn recording_path(&self) -> PathBuf {
        self.config.storage.resolve(self.filename.as_str())
    }

    fn set_state(&mut self, state: CallState) {
        if self.state != state {
            debug!("{:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Plays the clip configured for `cue`, if any.
    fn cue(&mut self, cue: Cue) {
        let cues = &self.config.cues;
        let clip = match cue {
            Cue::Hello => &cues.hello,
            Cue::GotAKey => &cues.got_a_key,
            Cue::StartPlay => &cues.start_play,
            Cue::StartRecord => &cues.start_record,
            Cue::ReachedMax => &cues.reached_max,
            Cue::TooShort => &cues.too_short,
            Cue::PickUp => &cues.pick_up,
            Cue::GotEnough => &cues.got_enough,
            Cue::FinishedChoose => &cues.finished_choose,
            Cue::FinishedConfirm => &cues.finished_confirm,
            Cue::PleaseHangUp => &cues.please_hang_up,
        };
        if let Some(clip) = clip {
            trace!("Cue {:?}.", cue);
            self.audio.play(clip);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::path::Path;
    use std::rc::Rc;
    use std::time::Duration;
    use recplay_gpio::keypad::StreamKeypad;
    use crate::config::Cues;

    #[derive(Clone, Debug, Eq, PartialEq)]
    enum AudioEvent {
        Play(PathBuf),
        PlayToEnd(PathBuf),
        Record(PathBuf, Duration),
    }

    #[derive(Debug, Default)]
    struct RecordingAudio {
        events: Rc<RefCell<Vec<AudioEvent>>>,
    }

    impl AudioSink for RecordingAudio {
        fn play(&mut self, clip: &Path) {
            self.events.borrow_mut().push(AudioEvent::Play(clip.to_path_buf()));
        }

        fn play_to_end(&mut self, clip: &Path) {
            self.events.borrow_mut().push(AudioEvent::PlayToEnd(clip.to_path_buf()));
        }

        fn record(&mut self, target: &Path, duration: Duration) {
            self.events.borrow_mut().push(AudioEvent::Record(target.to_path_buf(), duration));
        }
    }

    #[derive(Debug, Default)]
    struct ScriptedKeypad {
        keys: VecDeque<Option<char>>,
    }

    impl Keypad for ScriptedKeypad {
        type Key = char;

        fn poll_key(&mut self) -> GpioResult<Option<char>> {
            Ok(self.keys.pop_front().flatten())
        }
    }

    fn cue(name: &str) -> AudioEvent {
        AudioEvent::Play(PathBuf::from(format!("/cues/{name}.wav")))
    }

    fn recording(id: &str) -> PathBuf {
        PathBuf::from(format!("/rec/{id}.wav"))
    }

    fn config(mode: CallMode, filename_len: usize) -> Config {
        let clip = |name: &str| Some(PathBuf::from(format!("/cues/{name}.wav")));
        let mut config = Config {
            mode,
            filename_len,
            cues: Cues {
                hello: clip("hello"),
                got_a_key: clip("got_a_key"),
                start_play: clip("start_play"),
                start_record: clip("start_record"),
                reached_max: clip("reached_max"),
                too_short: clip("too_short"),
                click: clip("click"),
                missing_file: clip("missing_file"),
                pick_up: clip("pick_up"),
                got_enough: clip("got_enough"),
                finished_choose: clip("finished_choose"),
                finished_confirm: clip("finished_confirm"),
                please_hang_up: clip("please_hang_up"),
            },
            ..Config::default()
        };
        config.storage.primary_dir = PathBuf::from("/rec");
        config
    }

    struct Harness {
        keypad: ScriptedKeypad,
        audio: RecordingAudio,
        events: Rc<RefCell<Vec<AudioEvent>>>,
    }

    impl Harness {
        fn new() -> Self {
            let audio = RecordingAudio::default();
            Harness {
                keypad: ScriptedKeypad::default(),
                events: audio.events.clone(),
                audio,
            }
        }

        fn app(&mut self, config: Config) -> App<'_> {
            App::new(config, &mut self.keypad, &mut self.audio).unwrap()
        }
    }

    fn press(app: &mut App, keys: &str) {
        for key in keys.chars() {
            app.handle_key(key);
        }
    }

    fn take(events: &Rc<RefCell<Vec<AudioEvent>>>) -> Vec<AudioEvent> {
        events.borrow_mut().drain(..).collect()
    }

    #[test]
    fn direct_flow_plays_dialed_filename() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut app = harness.app(config(CallMode::Direct, 10));

        press(&mut app, "12345");
        assert_eq!(app.state(), &CallState::Accumulating);
        assert_eq!(app.filename(), "12345");

        app.handle_key('*');
        assert_eq!(app.state(), &CallState::Idle);
        assert_eq!(app.filename(), "");

        let mut expected = vec![cue("got_a_key"); 5];
        expected.push(cue("start_play"));
        expected.push(AudioEvent::Play(recording("12345")));
        assert_eq!(take(&events), expected);
    }

    #[test]
    fn direct_flow_records_for_the_record_time() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut app = harness.app(Config { max_record_seconds: 12, ..config(CallMode::Direct, 10) });

        press(&mut app, "7#");

        assert_eq!(app.state(), &CallState::Idle);
        assert_eq!(take(&events), vec![
            cue("got_a_key"),
            cue("start_record"),
            AudioEvent::Record(recording("7"), Duration::from_secs(12)),
        ]);
    }

    #[test]
    fn direct_flow_rejects_short_filename_when_max_is_required() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut app = harness.app(Config {
            must_be_max_filename_len: true,
            ..config(CallMode::Direct, 4)
        });

        press(&mut app, "12*");
        assert_eq!(app.filename(), "");
        assert_eq!(app.state(), &CallState::Idle);
        assert_eq!(take(&events), vec![cue("got_a_key"), cue("got_a_key"), cue("too_short")]);

        press(&mut app, "1234*");
        let events = take(&events);
        assert_eq!(events.last(), Some(&AudioEvent::Play(recording("1234"))));
        assert!(!events.contains(&cue("too_short")));
    }

    #[test]
    fn direct_flow_rejects_empty_filename() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut app = harness.app(config(CallMode::Direct, 10));

        app.handle_key('#');

        assert_eq!(take(&events), vec![cue("too_short")]);
    }

    #[test]
    fn direct_flow_starts_over_past_max_length() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut app = harness.app(config(CallMode::Direct, 3));

        press(&mut app, "1234");
        assert_eq!(app.filename(), "");
        assert_eq!(app.state(), &CallState::Accumulating);
        assert_eq!(take(&events), vec![
            cue("got_a_key"),
            cue("got_a_key"),
            cue("got_a_key"),
            cue("reached_max"),
        ]);

        press(&mut app, "5*");
        assert_eq!(take(&events).last(), Some(&AudioEvent::Play(recording("5"))));
    }

    #[test]
    fn direct_flow_ignores_other_keys() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut app = harness.app(config(CallMode::Direct, 10));

        press(&mut app, "AP\n");

        assert_eq!(app.state(), &CallState::Idle);
        assert!(take(&events).is_empty());
    }

    #[test]
    fn unset_cues_stay_silent() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut config = config(CallMode::Direct, 10);
        config.cues = Cues::default();
        let mut app = harness.app(config);

        app.greet();
        press(&mut app, "42*");

        assert_eq!(take(&events), vec![AudioEvent::Play(recording("42"))]);
    }

    #[test]
    fn call_flow_plays_after_full_filename() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut app = harness.app(config(CallMode::Call, 7));

        app.handle_key('5');
        assert_eq!(app.state(), &CallState::Idle);

        app.handle_key('R');
        assert_eq!(app.state(), &CallState::PickedUp);
        assert_eq!(take(&events), vec![cue("pick_up")]);

        app.handle_key('*');
        assert_eq!(app.state(), &CallState::Dialing(Action::Play));

        press(&mut app, "123A#P456");
        assert_eq!(app.state(), &CallState::Dialing(Action::Play));
        assert_eq!(app.filename(), "123456");
        assert_eq!(take(&events), vec![cue("got_a_key"); 6]);

        app.handle_key('7');
        assert_eq!(app.state(), &CallState::Playing);
        assert_eq!(take(&events), vec![
            cue("got_a_key"),
            cue("got_enough"),
            AudioEvent::PlayToEnd(recording("1234567")),
            cue("finished_choose"),
        ]);

        app.handle_key('9');
        assert_eq!(take(&events), vec![cue("finished_choose")]);

        app.handle_key('P');
        assert_eq!(app.state(), &CallState::Idle);
        assert_eq!(app.filename(), "");
    }

    #[test]
    fn call_flow_repeats_pick_up_prompt() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut app = harness.app(config(CallMode::Call, 7));

        press(&mut app, "R5D");

        assert_eq!(app.state(), &CallState::PickedUp);
        assert_eq!(take(&events), vec![cue("pick_up"); 3]);
    }

    #[test]
    fn call_flow_records_confirms_and_hangs_up() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut app = harness.app(config(CallMode::Call, 4));
        let take_recording = AudioEvent::Record(recording("2468"), Duration::from_secs(30));

        press(&mut app, "R#2468");
        assert_eq!(app.state(), &CallState::Confirming);
        let mut expected = vec![cue("pick_up")];
        expected.extend(vec![cue("got_a_key"); 4]);
        expected.extend([
            cue("got_enough"),
            cue("start_record"),
            take_recording.clone(),
            cue("finished_confirm"),
        ]);
        assert_eq!(take(&events), expected);

        app.handle_key('0');
        assert_eq!(app.state(), &CallState::Confirming);
        assert_eq!(app.filename(), "2468");
        assert_eq!(take(&events), vec![
            cue("start_record"),
            take_recording.clone(),
            cue("finished_confirm"),
        ]);

        app.handle_key('*');
        assert_eq!(app.state(), &CallState::Confirming);
        assert_eq!(take(&events), vec![
            AudioEvent::PlayToEnd(recording("2468")),
            cue("finished_confirm"),
        ]);

        app.handle_key('5');
        assert_eq!(take(&events), vec![cue("finished_confirm")]);

        app.handle_key('#');
        assert_eq!(app.state(), &CallState::WaitingHangup);
        app.handle_key('1');
        assert_eq!(take(&events), vec![cue("please_hang_up"), cue("please_hang_up")]);

        app.handle_key('P');
        assert_eq!(app.state(), &CallState::Idle);
        assert_eq!(app.filename(), "");
        assert!(take(&events).is_empty());
    }

    #[test]
    fn switching_to_record_reuses_played_filename() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        let mut app = harness.app(config(CallMode::Call, 3));

        press(&mut app, "R*321");
        assert_eq!(app.state(), &CallState::Playing);
        take(&events);

        app.handle_key('R');
        assert_eq!(app.state(), &CallState::Confirming);
        assert!(take(&events).contains(&AudioEvent::Record(recording("321"), Duration::from_secs(30))));
    }

    #[test]
    fn invalid_filename_length_is_refused() {
        let mut keypad = ScriptedKeypad::default();
        let mut audio = RecordingAudio::default();

        let app = App::new(config(CallMode::Direct, 0), &mut keypad, &mut audio);

        assert!(matches!(app, Err(ConfigError::InvalidFilenameLength(0))));
    }

    #[test]
    fn update_skips_reads_without_a_key() {
        let mut harness = Harness::new();
        let events = harness.events.clone();
        harness.keypad.keys = VecDeque::from([None, Some('1'), None]);
        let mut app = harness.app(config(CallMode::Direct, 10));

        app.update().unwrap();
        assert_eq!(app.state(), &CallState::Idle);
        assert!(take(&events).is_empty());

        app.update().unwrap();
        assert_eq!(app.filename(), "1");
        assert_eq!(take(&events), vec![cue("got_a_key")]);

        app.update().unwrap();
        assert_eq!(app.filename(), "1");
    }

    #[test]
    fn typed_enter_does_not_repeat_prompts() {
        let mut keypad = StreamKeypad::new(Cursor::new(b"R\n*\n".to_vec()))
            .with_idle_interval(Duration::ZERO);
        let mut audio = RecordingAudio::default();
        let events = audio.events.clone();
        let mut app = App::new(config(CallMode::Call, 7), &mut keypad, &mut audio).unwrap();

        app.update().unwrap();
        app.update().unwrap();
        assert_eq!(app.state(), &CallState::PickedUp);
        assert_eq!(take(&events), vec![cue("pick_up")]);

        app.update().unwrap();
        app.update().unwrap();
        assert_eq!(app.state(), &CallState::Dialing(Action::Play));
        assert!(take(&events).is_empty());
    }
}
