use std::fmt;
use enum_iterator::Sequence;

/// One of the four logical inputs wired to the phone.
#[derive(Sequence, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InputLine {
    /// Make/break contact pulsed by the dial as it returns to rest.
    DialPulse,
    /// Asserted while the dial is away from its resting position.
    DialActive,
    /// Switchhook under the handset.
    Hook,
    /// Front-panel reset button.
    Reset,
}

impl InputLine {
    pub fn name(self) -> &'static str {
        match self {
            InputLine::DialPulse => "dial pulse",
            InputLine::DialActive => "dial active",
            InputLine::Hook => "headset hook",
            InputLine::Reset => "reset button",
        }
    }
}

impl fmt::Display for InputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A debounced transition of a digital input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    /// Low to high.
    Rising,
    /// High to low.
    Falling,
}

#[cfg(feature = "rpi")]
impl Edge {
    /// Edge produced when a line settles high (`true`) or low (`false`).
    #[inline]
    pub fn from_level(high: bool) -> Self {
        if high { Edge::Rising } else { Edge::Falling }
    }

    #[inline]
    pub fn inverted(self) -> Self {
        match self {
            Edge::Rising => Edge::Falling,
            Edge::Falling => Edge::Rising,
        }
    }
}

/// Identifies one arming of the inter-digit timer.
/// A fire carrying an older generation than the session's current one is stale.
pub type TimerGeneration = u64;

/// Everything the call session reacts to, funneled through a single channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// An input line changed state.
    Edge(InputLine, Edge),
    /// The inter-digit timer armed with this generation ran out.
    TimerFired(TimerGeneration),
    /// The process is shutting down.
    Shutdown,
}

/// A decoded dial digit (0-9).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Digit(u8);

impl Digit {
    /// Ten pulses encode zero.
    pub fn from_pulses(pulse_count: usize) -> Self {
        Self((pulse_count % 10) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn as_char(self) -> char {
        char::from(b'0' + self.0)
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// The handset is on the hook and nothing is dialed.
    Idle,
    /// The handset is lifted and the line is ready to dial.
    OffHook,
    /// The dial is turning.
    Dialing,
    /// A digit was dialed and the inter-digit timer is running.
    AwaitingTimeout,
    /// The dialed number is being evaluated and its action dispatched.
    InCall,
}
