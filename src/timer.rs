use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::{trace, warn};
use crate::phone::{LineEvent, TimerGeneration};

/// A restartable one-shot timer whose expiry is delivered as [`LineEvent::TimerFired`].
pub trait DigitTimer {
    /// Starts the timer, replacing any timer already running.
    fn arm(&mut self, generation: TimerGeneration, duration: Duration);

    /// Stops the running timer. A fire that is already in flight may still be delivered.
    fn cancel(&mut self);
}

enum TimerCommand {
    Arm(TimerGeneration, Duration),
    Cancel,
}

/// Inter-digit timer backed by a dedicated thread.
///
/// The thread never touches session state; it only posts `TimerFired` into the
/// same channel the input lines feed.
pub struct InterDigitTimer {
    tx: Option<mpsc::Sender<TimerCommand>>,
    thread: Option<JoinHandle<()>>,
}

impl InterDigitTimer {
    pub fn spawn(events: mpsc::Sender<LineEvent>) -> Self {
        let (tx, rx) = mpsc::channel::<TimerCommand>();

        let thread = thread::Builder::new()
            .name("inter-digit-timer".into())
            .spawn(move || {
                let mut pending: Option<(TimerGeneration, Instant)> = None;

                loop {
                    let command = match pending {
                        None => match rx.recv() {
                            Ok(command) => command,
                            Err(_) => break
                        },
                        Some((generation, deadline)) => {
                            let now = Instant::now();
                            if now >= deadline {
                                pending = None;
                                trace!("Inter-digit timer fired (gen {})", generation);
                                if events.send(LineEvent::TimerFired(generation)).is_err() {
                                    break
                                }
                                continue
                            }
                            match rx.recv_timeout(deadline - now) {
                                Ok(command) => command,
                                Err(RecvTimeoutError::Timeout) => continue,
                                Err(RecvTimeoutError::Disconnected) => break
                            }
                        }
                    };

                    match command {
                        TimerCommand::Arm(generation, duration) => {
                            pending = Some((generation, Instant::now() + duration));
                        },
                        TimerCommand::Cancel => {
                            pending = None;
                        }
                    }
                }
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("Unable to start inter-digit timer thread: {}", err);
                None
            }
        };

        Self {
            tx: Some(tx),
            thread
        }
    }

    fn send(&self, command: TimerCommand) {
        if let Some(tx) = &self.tx {
            if tx.send(command).is_err() {
                warn!("Inter-digit timer thread is gone");
            }
        }
    }
}

impl DigitTimer for InterDigitTimer {
    fn arm(&mut self, generation: TimerGeneration, duration: Duration) {
        self.send(TimerCommand::Arm(generation, duration));
    }

    fn cancel(&mut self) {
        self.send(TimerCommand::Cancel);
    }
}

impl Drop for InterDigitTimer {
    fn drop(&mut self) {
        // Closing the command channel ends the thread
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
