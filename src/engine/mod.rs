mod numbers;
mod status;

use std::sync::mpsc;
use std::time::{Duration, Instant};
use log::{debug, info, trace, LevelFilter};
use crate::config::{DialerConfig, ToneTiming};
use crate::dial::{DialBuffer, PulseCounter, Rotation};
use crate::phone::*;
use crate::sound::AudioPort;
use crate::timer::DigitTimer;

pub use self::numbers::*;
pub use self::status::*;

/// Call-handling settings taken from the config.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    /// Quiet period after the last digit before the number is evaluated.
    pub inter_digit_timeout: Duration,
    /// When the dial tone stops while dialing.
    pub tone_timing: ToneTiming,
    /// Recognized numbers.
    pub numbers: NumberTable,
    /// Clip played for numbers not in the table.
    pub fallback_clip: String,
    /// Log level restored when debug mode is switched off.
    pub base_log_level: LevelFilter,
}

impl From<&DialerConfig> for SessionSettings {
    fn from(config: &DialerConfig) -> Self {
        Self {
            inter_digit_timeout: config.inter_digit_timeout(),
            tone_timing: config.tone_timing,
            numbers: config.numbers.clone(),
            fallback_clip: config.sound.fallback.clone(),
            base_log_level: config.log_level(),
        }
    }
}

/// Turns input edges and timer fires into a dialed number and call actions.
///
/// All state lives here and is only touched through [`CallSession::handle_event`],
/// which must be driven from a single thread (see [`run`]).
pub struct CallSession<A: AudioPort, T: DigitTimer> {
    /// Audio output.
    audio: A,
    /// Inter-digit timer.
    timer: T,
    /// Call-handling settings.
    settings: SessionSettings,
    /// The current state of the session.
    state: SessionState,
    /// Time when the current state started.
    state_start: Instant,
    /// Is the handset lifted?
    off_hook: bool,
    /// Is the reset button held down?
    reset_pressed: bool,
    /// Is a dialed number being acted on?
    in_call: bool,
    /// Pulses of the rotation in progress.
    pulses: PulseCounter,
    /// Digits dialed so far.
    dialed: DialBuffer,
    /// Generation of the outstanding inter-digit timer, if any.
    pending_timer: Option<TimerGeneration>,
    /// Last generation handed to the timer.
    timer_generation: TimerGeneration,
    /// Debug mode, toggled by the maintenance number.
    debug_mode: bool,
    /// The last number that was evaluated.
    last_dialed_number: Option<String>,
}

impl<A: AudioPort, T: DigitTimer> CallSession<A, T> {
    pub fn new(audio: A, timer: T, settings: SessionSettings) -> Self {
        Self {
            audio,
            timer,
            settings,
            state: SessionState::Idle,
            state_start: Instant::now(),
            off_hook: false,
            reset_pressed: false,
            in_call: false,
            pulses: PulseCounter::new(),
            dialed: DialBuffer::new(),
            pending_timer: None,
            timer_generation: 0,
            debug_mode: false,
            last_dialed_number: None,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn is_off_hook(&self) -> bool {
        self.off_hook
    }

    #[inline]
    pub fn dialed_number(&self) -> &str {
        self.dialed.current()
    }

    #[inline]
    pub fn has_pending_timer(&self) -> bool {
        self.pending_timer.is_some()
    }

    #[inline]
    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn last_dialed_number(&self) -> Option<&str> {
        self.last_dialed_number.as_deref()
    }

    /// Takes the session apart, handing back its audio port and timer.
    pub fn into_parts(self) -> (A, T) {
        (self.audio, self.timer)
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            off_hook: self.off_hook,
            dialing: self.pulses.is_rotating(),
            reset_pressed: self.reset_pressed,
            digit_in_progress: self.pulses.digit_in_progress().value(),
            dialed_number: self.dialed.current().to_owned(),
            debug_mode: self.debug_mode,
        }
    }

    /// Applies one event to the session.
    pub fn handle_event(&mut self, event: LineEvent) {
        if self.debug_mode {
            debug!("Event: {:?}", event);
        }

        match event {
            LineEvent::Edge(InputLine::DialPulse, edge) => {
                if self.pulses.on_pulse_edge(edge) {
                    trace!("Pulse (n = {})", self.pulses.pulse_count());
                }
            },
            LineEvent::Edge(InputLine::DialActive, edge) => self.handle_dial_active_edge(edge),
            LineEvent::Edge(InputLine::Hook, edge) => self.handle_hook_state_change(edge == Edge::Rising),
            LineEvent::Edge(InputLine::Reset, Edge::Falling) => self.handle_reset_pressed(),
            LineEvent::Edge(InputLine::Reset, Edge::Rising) => {
                self.reset_pressed = false;
            },
            LineEvent::TimerFired(generation) => self.handle_timer_fired(generation),
            LineEvent::Shutdown => self.shutdown(),
        }
    }

    /// Sets the current state of the session.
    fn set_state(&mut self, state: SessionState) {
        if self.state == state {
            return
        }

        let prev_state = std::mem::replace(&mut self.state, state);
        let state_start = Instant::now();
        let state_time = state_start.saturating_duration_since(self.state_start);
        self.state_start = state_start;

        info!("{:?} ({:?}) --> {:?}", prev_state, state_time, state);
    }

    /// The state the line rests in when nothing is being dialed.
    #[inline]
    fn resting_state(&self) -> SessionState {
        if self.off_hook { SessionState::OffHook } else { SessionState::Idle }
    }

    fn arm_timer(&mut self) {
        self.cancel_timer();
        self.timer_generation += 1;
        let generation = self.timer_generation;
        self.timer.arm(generation, self.settings.inter_digit_timeout);
        self.pending_timer = Some(generation);
    }

    fn cancel_timer(&mut self) {
        if self.pending_timer.take().is_some() {
            self.timer.cancel();
        }
    }

    /// Drops everything dialed so far. The hook state is left alone.
    fn reset_line(&mut self) {
        self.cancel_timer();
        self.dialed.clear();
        self.pulses.abandon();
        self.in_call = false;
    }

    fn handle_hook_state_change(&mut self, on_hook: bool) {
        if on_hook {
            // Hanging up always aborts everything, whatever the line was doing
            info!("Switchhook CLOSED");
            self.off_hook = false;
            self.audio.stop_all();
            self.reset_line();
            self.set_state(SessionState::Idle);
        } else {
            if self.off_hook {
                trace!("Ignored repeated off-hook edge");
                return
            }
            info!("Switchhook OPEN");
            self.off_hook = true;
            if !self.in_call {
                self.audio.play_dial_tone();
            }
            self.set_state(SessionState::OffHook);
        }
    }

    fn handle_dial_active_edge(&mut self, edge: Edge) {
        match self.pulses.on_dial_active_edge(edge) {
            Some(Rotation::Started) => {
                self.cancel_timer();
                if self.off_hook && !self.in_call {
                    self.set_state(SessionState::Dialing);
                }
            },
            Some(Rotation::Ended(digit)) => self.handle_rotation_end(digit),
            None => trace!("Ignored dial rest edge outside of a rotation")
        }
    }

    fn handle_rotation_end(&mut self, digit: Option<Digit>) {
        // Digits only count while the handset is lifted
        if !self.off_hook || self.in_call {
            return
        }

        match digit {
            Some(digit) => {
                let first_digit = self.dialed.is_empty();
                if self.dialed.append(digit, self.off_hook, self.in_call) {
                    info!("Host dialed '{}' (number so far: {})", digit, self.dialed.current());
                    if first_digit && self.settings.tone_timing == ToneTiming::StopOnFirstDigit {
                        self.audio.stop_all();
                    }
                }
            },
            None => debug!("Dial returned to rest without a digit")
        }

        // Restart the inter-digit window from this rotation
        if self.dialed.is_empty() {
            self.set_state(SessionState::OffHook);
        } else {
            self.arm_timer();
            self.set_state(SessionState::AwaitingTimeout);
        }
    }

    fn handle_reset_pressed(&mut self) {
        self.reset_pressed = true;
        if !self.off_hook {
            debug!("Reset pressed while on-hook");
            return
        }

        info!("Reset pressed; clearing line.");
        self.audio.stop_all();
        self.reset_line();
        self.audio.play_dial_tone();
        self.set_state(SessionState::OffHook);
    }

    fn handle_timer_fired(&mut self, generation: TimerGeneration) {
        // A fire may race a cancel or a re-arm; only the latest arming counts
        if self.pending_timer != Some(generation) {
            debug!("Ignored stale inter-digit timer (gen {})", generation);
            return
        }
        self.pending_timer = None;

        if !self.off_hook || self.in_call || self.dialed.is_empty() {
            return
        }

        self.evaluate_number();
    }

    /// Acts on the dialed number, then readies the line for another call.
    fn evaluate_number(&mut self) {
        self.audio.stop_all();
        self.in_call = true;
        self.set_state(SessionState::InCall);

        let number = self.dialed.current().to_owned();
        let action = self.settings.numbers.lookup(&number);
        info!("Calling: {} ({:?})", number, action);

        match action {
            NumberAction::PlayClip(clip) => self.audio.play(&clip),
            NumberAction::ToggleDebug => self.toggle_debug_mode(),
            NumberAction::PlayFallback => self.audio.play(&self.settings.fallback_clip),
        }

        self.last_dialed_number = Some(number);
        self.reset_line();
        if self.off_hook {
            self.audio.play_dial_tone();
        }
        self.set_state(self.resting_state());
    }

    fn toggle_debug_mode(&mut self) {
        self.debug_mode = !self.debug_mode;
        let level = if self.debug_mode {
            self.settings.base_log_level.max(LevelFilter::Debug)
        } else {
            self.settings.base_log_level
        };
        log::set_max_level(level);
        info!("Debug mode {}", if self.debug_mode { "ON" } else { "OFF" });
    }

    fn shutdown(&mut self) {
        info!("Shutting down call session.");
        self.cancel_timer();
        self.audio.stop_all();
    }
}

/// Drains `events` into the session until shutdown, publishing status after each event.
///
/// This is the only place session state is mutated.
pub fn run<A: AudioPort, T: DigitTimer>(session: &mut CallSession<A, T>, events: mpsc::Receiver<LineEvent>, status: &StatusBoard) {
    status.publish(session.status());
    while let Ok(event) = events.recv() {
        session.handle_event(event);
        status.publish(session.status());
        if event == LineEvent::Shutdown {
            return
        }
    }
    info!("All event sources closed.");
    session.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use crate::timer::InterDigitTimer;

    #[derive(Clone, Debug, PartialEq)]
    enum AudioCall {
        Play(String),
        DialTone,
        StopAll,
    }

    #[derive(Clone, Default)]
    struct RecordingAudio(Arc<Mutex<Vec<AudioCall>>>);

    impl RecordingAudio {
        fn calls(&self) -> Vec<AudioCall> {
            self.0.lock().unwrap().clone()
        }

        fn clear(&self) {
            self.0.lock().unwrap().clear();
        }

        fn plays(&self) -> Vec<String> {
            self.calls().into_iter().filter_map(|call| match call {
                AudioCall::Play(clip) => Some(clip),
                _ => None
            }).collect()
        }
    }

    impl AudioPort for RecordingAudio {
        fn play(&self, clip: &str) {
            self.0.lock().unwrap().push(AudioCall::Play(clip.to_owned()));
        }

        fn play_dial_tone(&self) {
            self.0.lock().unwrap().push(AudioCall::DialTone);
        }

        fn stop_all(&self) {
            self.0.lock().unwrap().push(AudioCall::StopAll);
        }
    }

    #[derive(Default, Debug)]
    struct TimerLog {
        armed: Vec<(TimerGeneration, Duration)>,
        cancels: usize,
    }

    /// Records timer calls; fires are injected by the test.
    #[derive(Clone, Default)]
    struct ManualTimer(Arc<Mutex<TimerLog>>);

    impl ManualTimer {
        fn armed(&self) -> Vec<TimerGeneration> {
            self.0.lock().unwrap().armed.iter().map(|(generation, _)| *generation).collect()
        }

        fn last_armed(&self) -> Option<TimerGeneration> {
            self.armed().last().copied()
        }

        fn cancels(&self) -> usize {
            self.0.lock().unwrap().cancels
        }
    }

    impl DigitTimer for ManualTimer {
        fn arm(&mut self, generation: TimerGeneration, duration: Duration) {
            self.0.lock().unwrap().armed.push((generation, duration));
        }

        fn cancel(&mut self) {
            self.0.lock().unwrap().cancels += 1;
        }
    }

    fn settings() -> SessionSettings {
        SessionSettings::from(&DialerConfig::default())
    }

    fn session_with(settings: SessionSettings) -> (CallSession<RecordingAudio, ManualTimer>, RecordingAudio, ManualTimer) {
        let audio = RecordingAudio::default();
        let timer = ManualTimer::default();
        let session = CallSession::new(audio.clone(), timer.clone(), settings);
        (session, audio, timer)
    }

    fn session() -> (CallSession<RecordingAudio, ManualTimer>, RecordingAudio, ManualTimer) {
        session_with(settings())
    }

    fn edge(line: InputLine, edge: Edge) -> LineEvent {
        LineEvent::Edge(line, edge)
    }

    fn lift(session: &mut CallSession<RecordingAudio, ManualTimer>) {
        session.handle_event(edge(InputLine::Hook, Edge::Falling));
    }

    fn hang_up(session: &mut CallSession<RecordingAudio, ManualTimer>) {
        session.handle_event(edge(InputLine::Hook, Edge::Rising));
    }

    fn start_rotation(session: &mut CallSession<RecordingAudio, ManualTimer>, pulses: usize) {
        session.handle_event(edge(InputLine::DialActive, Edge::Falling));
        for _ in 0..pulses {
            session.handle_event(edge(InputLine::DialPulse, Edge::Rising));
            session.handle_event(edge(InputLine::DialPulse, Edge::Falling));
        }
    }

    fn dial_digit(session: &mut CallSession<RecordingAudio, ManualTimer>, pulses: usize) {
        start_rotation(session, pulses);
        session.handle_event(edge(InputLine::DialActive, Edge::Rising));
    }

    fn fire(session: &mut CallSession<RecordingAudio, ManualTimer>, timer: &ManualTimer) {
        let generation = timer.last_armed().expect("timer was never armed");
        session.handle_event(LineEvent::TimerFired(generation));
    }

    #[test]
    fn lifting_the_handset_starts_dial_tone() {
        let (mut session, audio, _) = session();
        lift(&mut session);
        assert!(session.is_off_hook());
        assert_eq!(session.state(), SessionState::OffHook);
        assert_eq!(audio.calls(), vec![AudioCall::DialTone]);

        // A repeated edge doesn't restart the tone
        lift(&mut session);
        assert_eq!(audio.calls(), vec![AudioCall::DialTone]);
    }

    #[test]
    fn single_pulse_dials_connect() {
        let (mut session, audio, timer) = session();
        lift(&mut session);
        audio.clear();

        dial_digit(&mut session, 1);
        assert_eq!(session.state(), SessionState::AwaitingTimeout);
        assert_eq!(session.dialed_number(), "1");
        assert_eq!(timer.armed(), vec![1]);
        assert_eq!(timer.0.lock().unwrap().armed[0].1, Duration::from_secs(2));

        fire(&mut session, &timer);
        assert_eq!(audio.calls(), vec![
            AudioCall::StopAll,
            AudioCall::Play("connect".into()),
            AudioCall::DialTone,
        ]);
        assert_eq!(session.dialed_number(), "");
        assert!(session.is_off_hook());
        assert!(!session.has_pending_timer());
        assert_eq!(session.state(), SessionState::OffHook);
        assert_eq!(session.last_dialed_number(), Some("1"));
    }

    #[test]
    fn second_digit_restarts_timeout() {
        let (mut session, audio, timer) = session();
        lift(&mut session);
        dial_digit(&mut session, 2);
        dial_digit(&mut session, 5);
        assert_eq!(timer.armed(), vec![1, 2]);
        assert_eq!(session.dialed_number(), "25");

        // The first arming is stale
        session.handle_event(LineEvent::TimerFired(1));
        assert!(audio.plays().is_empty());
        assert_eq!(session.dialed_number(), "25");

        fire(&mut session, &timer);
        assert_eq!(audio.plays(), vec!["not-working".to_owned()]);
        assert_eq!(session.last_dialed_number(), Some("25"));
    }

    #[test]
    fn hanging_up_mid_rotation_discards_digit() {
        let (mut session, _, timer) = session();
        lift(&mut session);
        start_rotation(&mut session, 2);
        assert_eq!(session.state(), SessionState::Dialing);
        assert_eq!(session.status().digit_in_progress, 2);

        hang_up(&mut session);
        session.handle_event(edge(InputLine::DialActive, Edge::Rising));

        assert_eq!(session.dialed_number(), "");
        assert!(timer.armed().is_empty());
        assert!(!session.has_pending_timer());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn reset_mid_rotation_discards_digit() {
        let (mut session, _, timer) = session();
        lift(&mut session);
        start_rotation(&mut session, 3);
        assert_eq!(session.status().digit_in_progress, 3);

        session.handle_event(edge(InputLine::Reset, Edge::Falling));
        session.handle_event(edge(InputLine::Reset, Edge::Rising));
        // The dial keeps turning after the press
        session.handle_event(edge(InputLine::DialPulse, Edge::Rising));
        session.handle_event(edge(InputLine::DialActive, Edge::Rising));

        assert_eq!(session.dialed_number(), "");
        assert!(timer.armed().is_empty());
        assert!(!session.has_pending_timer());
        assert_eq!(session.state(), SessionState::OffHook);
    }

    #[test]
    fn reset_before_timeout_clears_without_calling() {
        let (mut session, audio, timer) = session();
        lift(&mut session);
        dial_digit(&mut session, 3);
        audio.clear();

        session.handle_event(edge(InputLine::Reset, Edge::Falling));
        assert_eq!(session.dialed_number(), "");
        assert!(!session.has_pending_timer());
        assert_eq!(timer.cancels(), 1);
        assert!(session.is_off_hook());
        assert_eq!(session.state(), SessionState::OffHook);
        assert!(session.status().reset_pressed);

        // A fire that raced the cancel is ignored
        fire(&mut session, &timer);
        assert!(audio.plays().is_empty());
        assert_eq!(audio.calls(), vec![AudioCall::StopAll, AudioCall::DialTone]);

        session.handle_event(edge(InputLine::Reset, Edge::Rising));
        assert!(!session.status().reset_pressed);
    }

    #[test]
    fn reset_on_hook_only_records_press() {
        let (mut session, audio, timer) = session();
        let before = session.status();
        session.handle_event(edge(InputLine::Reset, Edge::Falling));
        let after = session.status();

        assert!(after.reset_pressed);
        assert_eq!(StatusSnapshot { reset_pressed: false, ..after }, before);
        assert!(audio.calls().is_empty());
        assert_eq!(timer.cancels(), 0);
    }

    #[test]
    fn digits_dialed_on_hook_are_dropped() {
        let (mut session, audio, timer) = session();
        dial_digit(&mut session, 4);
        assert_eq!(session.dialed_number(), "");
        assert!(timer.armed().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(audio.calls().is_empty());
    }

    #[test]
    fn hanging_up_always_fully_resets() {
        let (mut session, audio, timer) = session();
        hang_up(&mut session);
        assert_eq!(session.state(), SessionState::Idle);

        lift(&mut session);
        dial_digit(&mut session, 6);
        dial_digit(&mut session, 7);
        audio.clear();
        // Starting the second rotation cancelled the first timer
        assert_eq!(timer.cancels(), 1);
        hang_up(&mut session);
        assert_eq!(session.dialed_number(), "");
        assert!(!session.has_pending_timer());
        assert_eq!(timer.cancels(), 2);
        assert_eq!(audio.calls(), vec![AudioCall::StopAll]);
        assert!(!session.is_off_hook());

        // The fire of the cancelled timer is stale
        fire(&mut session, &timer);
        assert!(audio.plays().is_empty());

        hang_up(&mut session);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn rotation_start_cancels_pending_timer() {
        let (mut session, _, timer) = session();
        lift(&mut session);
        dial_digit(&mut session, 1);
        start_rotation(&mut session, 0);
        assert!(!session.has_pending_timer());
        assert_eq!(timer.cancels(), 1);
        assert_eq!(session.state(), SessionState::Dialing);
    }

    #[test]
    fn empty_rotation_rearms_pending_number() {
        let (mut session, audio, timer) = session();
        lift(&mut session);
        dial_digit(&mut session, 1);
        dial_digit(&mut session, 0);
        assert_eq!(session.dialed_number(), "1");
        assert_eq!(timer.armed(), vec![1, 2]);
        assert_eq!(session.state(), SessionState::AwaitingTimeout);

        fire(&mut session, &timer);
        assert_eq!(audio.plays(), vec!["connect".to_owned()]);
    }

    #[test]
    fn empty_rotation_on_fresh_line_stays_off_hook() {
        let (mut session, _, timer) = session();
        lift(&mut session);
        dial_digit(&mut session, 0);
        assert!(timer.armed().is_empty());
        assert_eq!(session.state(), SessionState::OffHook);
    }

    #[test]
    fn ten_pulses_dial_zero() {
        let (mut session, _, _) = session();
        lift(&mut session);
        dial_digit(&mut session, 10);
        dial_digit(&mut session, 3);
        assert_eq!(session.dialed_number(), "03");
    }

    #[test]
    fn maintenance_number_toggles_debug() {
        let (mut session, audio, timer) = session();
        lift(&mut session);
        for pulses in [7, 3, 7, 8] {
            dial_digit(&mut session, pulses);
        }
        audio.clear();
        fire(&mut session, &timer);
        assert!(session.debug_mode());
        assert!(audio.plays().is_empty());
        assert_eq!(audio.calls(), vec![AudioCall::StopAll, AudioCall::DialTone]);

        for pulses in [7, 3, 7, 8] {
            dial_digit(&mut session, pulses);
        }
        fire(&mut session, &timer);
        assert!(!session.debug_mode());
    }

    #[test]
    fn stop_on_first_digit_policy() {
        let mut settings = settings();
        settings.tone_timing = ToneTiming::StopOnFirstDigit;
        let (mut session, audio, _) = session_with(settings);
        lift(&mut session);
        audio.clear();

        dial_digit(&mut session, 2);
        assert_eq!(audio.calls(), vec![AudioCall::StopAll]);
        dial_digit(&mut session, 2);
        assert_eq!(audio.calls(), vec![AudioCall::StopAll]);
    }

    #[test]
    fn stop_on_evaluate_keeps_tone_while_dialing() {
        let (mut session, audio, _) = session();
        lift(&mut session);
        audio.clear();
        dial_digit(&mut session, 2);
        dial_digit(&mut session, 2);
        assert!(audio.calls().is_empty());
    }

    #[test]
    fn configured_table_drives_dispatch() {
        let mut settings = settings();
        settings.numbers = NumberTable::from_iter([("42", NumberAction::PlayClip("answer".into()))]);
        settings.fallback_clip = "intercept".into();
        let (mut session, audio, timer) = session_with(settings);
        lift(&mut session);
        dial_digit(&mut session, 4);
        dial_digit(&mut session, 2);
        fire(&mut session, &timer);
        dial_digit(&mut session, 1);
        fire(&mut session, &timer);
        assert_eq!(audio.plays(), vec!["answer".to_owned(), "intercept".to_owned()]);
    }

    #[test]
    fn shutdown_stops_audio_and_timer() {
        let (mut session, audio, timer) = session();
        lift(&mut session);
        dial_digit(&mut session, 1);
        audio.clear();
        session.handle_event(LineEvent::Shutdown);
        assert_eq!(timer.cancels(), 1);
        assert_eq!(audio.calls(), vec![AudioCall::StopAll]);
    }

    #[test]
    fn event_loop_with_real_timer() {
        let (tx, rx) = mpsc::channel();
        let audio = RecordingAudio::default();
        let mut settings = settings();
        settings.inter_digit_timeout = Duration::from_millis(40);
        let board = StatusBoard::new();

        let worker = {
            let audio = audio.clone();
            let board = board.clone();
            let timer_tx = tx.clone();
            thread::spawn(move || {
                let timer = InterDigitTimer::spawn(timer_tx);
                let mut session = CallSession::new(audio, timer, settings);
                run(&mut session, rx, &board);
                session.last_dialed_number().map(str::to_owned)
            })
        };

        tx.send(edge(InputLine::Hook, Edge::Falling)).unwrap();
        for pulses in [2, 5] {
            tx.send(edge(InputLine::DialActive, Edge::Falling)).unwrap();
            for _ in 0..pulses {
                tx.send(edge(InputLine::DialPulse, Edge::Rising)).unwrap();
                tx.send(edge(InputLine::DialPulse, Edge::Falling)).unwrap();
            }
            tx.send(edge(InputLine::DialActive, Edge::Rising)).unwrap();
        }

        // Wait for the number to be evaluated
        let deadline = Instant::now() + Duration::from_secs(2);
        while audio.plays().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        tx.send(LineEvent::Shutdown).unwrap();
        let last_dialed = worker.join().unwrap();

        assert_eq!(last_dialed.as_deref(), Some("25"));
        assert_eq!(audio.plays(), vec!["not-working".to_owned()]);
        let status = board.snapshot();
        assert!(status.off_hook);
        assert_eq!(status.dialed_number, "");
    }
}
