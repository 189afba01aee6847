use std::fmt;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;
use log::{info, warn};
use crate::phone::SessionState;

/// Read-only view of the call session at one instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub state: SessionState,
    pub off_hook: bool,
    pub dialing: bool,
    pub reset_pressed: bool,
    /// Digit the dial would produce if it came to rest now.
    pub digit_in_progress: u8,
    pub dialed_number: String,
    pub debug_mode: bool,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            off_hook: false,
            dialing: false,
            reset_pressed: false,
            digit_in_progress: 0,
            dialed_number: String::new(),
            debug_mode: false,
        }
    }
}

#[inline]
fn yes_no(v: bool) -> &'static str {
    if v { "Y" } else { "N" }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
            "PickedUp: {}, Dialing: {}, ResetPressed: {}, Number: {}, Dialed: {}",
            yes_no(self.off_hook),
            yes_no(self.dialing),
            yes_no(self.reset_pressed),
            self.digit_in_progress,
            self.dialed_number
        )
    }
}

/// Latest published status, shared between the event loop and observers.
#[derive(Clone, Default)]
pub struct StatusBoard(Arc<RwLock<StatusSnapshot>>);

impl StatusBoard {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn publish(&self, snapshot: StatusSnapshot) {
        match self.0.write() {
            Ok(mut current) => *current = snapshot,
            Err(_) => warn!("Status board is poisoned; snapshot dropped")
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        match self.0.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone()
        }
    }

    /// Logs the current status at a fixed period for the rest of the process.
    pub fn spawn_reporter(&self, interval: Duration) {
        let board = self.clone();
        let spawned = thread::Builder::new()
            .name("status".into())
            .spawn(move || loop {
                thread::sleep(interval);
                info!("{}", board.snapshot());
            });
        if let Err(err) = spawned {
            warn!("Unable to start status reporter: {}", err);
        }
    }
}
