use log::trace;
use crate::phone::{Digit, Edge};

/// What a dial-active edge meant for the rotation in progress.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rotation {
    /// The dial left its resting position.
    Started,
    /// The dial came back to rest. Carries the decoded digit, if the rotation produced one.
    Ended(Option<Digit>),
}

/// Counts dial pulses inside a single rotation of the dial.
///
/// With the reference wiring, the dial-active line falls when the dial is pulled
/// away from rest and rises when it returns, and each pulse is a rising edge on
/// the dial-pulse line.
#[derive(Default, Debug)]
pub struct PulseCounter {
    /// Pulses seen since the rotation started.
    count: usize,
    /// Is a rotation currently in progress?
    active: bool,
    /// Was the rotation in progress thrown away by a hangup or reset?
    abandoned: bool,
}

impl PulseCounter {
    pub fn new() -> Self {
        Default::default()
    }

    /// Handles an edge on the dial-pulse line. Returns `true` if the edge was counted.
    pub fn on_pulse_edge(&mut self, edge: Edge) -> bool {
        match edge {
            Edge::Falling => false,
            Edge::Rising => {
                if !self.active {
                    trace!("Ignored pulse outside of a rotation");
                    return false
                }
                self.count += 1;
                true
            }
        }
    }

    /// Handles an edge on the dial-active line.
    pub fn on_dial_active_edge(&mut self, edge: Edge) -> Option<Rotation> {
        match edge {
            Edge::Falling => {
                self.count = 0;
                self.active = true;
                self.abandoned = false;
                Some(Rotation::Started)
            },
            Edge::Rising => {
                if !self.active {
                    return None
                }
                self.active = false;
                let pulses = std::mem::take(&mut self.count);
                if std::mem::take(&mut self.abandoned) || pulses == 0 {
                    return Some(Rotation::Ended(None))
                }
                Some(Rotation::Ended(Some(Digit::from_pulses(pulses))))
            }
        }
    }

    /// Discards the rotation in progress; its end will not produce a digit.
    pub fn abandon(&mut self) {
        self.count = 0;
        if self.active {
            self.abandoned = true;
        }
    }

    #[inline]
    pub fn is_rotating(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn pulse_count(&self) -> usize {
        self.count
    }

    /// The digit the dial would produce if it came to rest right now.
    #[inline]
    pub fn digit_in_progress(&self) -> Digit {
        Digit::from_pulses(self.count)
    }
}

/// Digits dialed since the line last went idle.
#[derive(Default, Debug)]
pub struct DialBuffer {
    digits: String,
}

impl DialBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a digit, but only while the phone is off-hook and no call is being placed.
    /// Returns `true` if the digit was taken.
    pub fn append(&mut self, digit: Digit, off_hook: bool, in_call: bool) -> bool {
        if !off_hook || in_call {
            return false
        }
        self.digits.push(digit.as_char());
        true
    }

    #[inline]
    pub fn clear(&mut self) {
        self.digits.clear();
    }

    #[inline]
    pub fn current(&self) -> &str {
        self.digits.as_str()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }
}
