use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, tick, Sender};

use crate::session::state::Event;

/// Ticker thread that posts `Event::Tick { generation }` every `interval`
/// until cancelled or the event channel closes.
///
/// Ticks the controller is too busy to take are coalesced by the ticker,
/// so a slow consumer never builds a backlog.
pub struct PollingTask {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PollingTask {
    pub fn start(generation: u64, interval: Duration, events: Sender<Event>) -> Self {
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(0);
        let handle = thread::spawn(move || {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        if events.send(Event::Tick { generation }).is_err() {
                            break;
                        }
                    }
                    // Fires on drop of the sender.
                    recv(cancel_rx) -> _ => break,
                }
            }
            log::debug!("Polling for generation {generation} stopped");
        });

        Self {
            cancel: Some(cancel_tx),
            handle: Some(handle),
        }
    }

    /// Stops the ticker and waits for its thread. No tick is posted after
    /// this returns.
    pub fn cancel(&mut self) {
        self.cancel.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PollingTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
