use std::thread::{self, JoinHandle};
use std::sync::{Mutex, Arc, mpsc};
use std::time::Duration;
use log::warn;
use rppal::gpio::*;

/// Enables a digital input to be wrapped into a debounced input.
pub trait Debounce<T> where T: Debounced {
    fn debounce(self, time: Duration) -> Result<T>;
}

/// Represents a debounced digital input.
pub trait Debounced {
    fn on_changed<C>(&mut self, callback: C)
        where C: FnMut(bool) + Send + 'static;
}

/// Simple wrapper around `rppal::gpio::pin::InputPin` to add debouncing.
pub struct SoftInputPin {
    pin: InputPin,
    state: Arc<Mutex<SoftInputState>>,
    handler_thread: Option<JoinHandle<()>>,
}

struct SoftInputState {
    bounce_time: Duration,
    last_value: bool,
    change_callback: Option<Box<dyn FnMut(bool) + Send + 'static>>
}

impl SoftInputState {
    fn change_last_value(&mut self, new_value: bool) {
        self.last_value = new_value;
        if let Some(callback) = self.change_callback.as_mut() {
            callback(new_value);
        }
    }
}

impl SoftInputPin {
    fn new(pin: InputPin, bounce_time: Duration) -> Result<Self> {
        let state = SoftInputState {
            bounce_time,
            last_value: pin.is_high(),
            change_callback: None
        };

        let mut s = Self {
            pin,
            state: Arc::new(Mutex::new(state)),
            handler_thread: None
        };
        s.start_handler_thread()?;
        Ok(s)
    }

    fn start_handler_thread(&mut self) -> Result<()> {
        let (tx_handler, rx) = mpsc::channel::<bool>();
        let state = Arc::clone(&self.state);
        let pin_id = self.pin.pin();

        self.handler_thread = Some(thread::spawn(move || {
            while let Ok(new_value) = rx.recv() {
                let Ok(mut state) = state.lock() else {
                    warn!("Input state for pin {} is poisoned; no more edges will be reported.", pin_id);
                    break
                };

                // Ignore this event if the state hasn't changed
                if new_value == state.last_value {
                    continue
                }

                // Report the edge right away, then hold off for the bounce time
                state.change_last_value(new_value);
                thread::sleep(state.bounce_time);

                // The line may have settled elsewhere while we weren't looking
                let mut settled_value = new_value;
                while let Ok(is_high) = rx.try_recv() {
                    settled_value = is_high;
                }
                if settled_value != state.last_value {
                    state.change_last_value(settled_value);
                }
            }
        }));

        self.pin.set_async_interrupt(Trigger::Both, move |level| {
            let _ = tx_handler.send(level == Level::High);
        })
    }
}

impl Debounce<SoftInputPin> for InputPin {
    fn debounce(self, time: Duration) -> Result<SoftInputPin> {
        SoftInputPin::new(self, time)
    }
}

impl Debounced for SoftInputPin {
    fn on_changed<C>(&mut self, callback: C)
    where C: FnMut(bool) + Send + 'static {
        match self.state.lock() {
            Ok(mut state) => state.change_callback = Some(Box::new(callback)),
            Err(_) => warn!("Unable to register change handler for pin {}", self.pin.pin())
        }
    }
}

impl Drop for SoftInputPin {
    fn drop(&mut self) {
        // Dropping the interrupt closes the handler's channel so its thread can finish
        let _ = self.pin.clear_async_interrupt();
        if let Some(handler_thread) = self.handler_thread.take() {
            let _ = handler_thread.join();
        }
    }
}
