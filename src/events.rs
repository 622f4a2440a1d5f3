use crossterm::event::Event;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::compare::FetchOutcome;

pub enum AppEvent {
    Input(Event),
    Fetched(FetchOutcome),
    Tick,
}

/// Merges terminal input with completed background fetches.
pub struct EventHandler {
    outcomes: UnboundedReceiver<FetchOutcome>,
    sender: UnboundedSender<FetchOutcome>,
    tick: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        let (sender, outcomes) = mpsc::unbounded_channel();
        Self {
            outcomes,
            sender,
            tick: Duration::from_millis(100),
        }
    }

    pub fn sender(&self) -> UnboundedSender<FetchOutcome> {
        self.sender.clone()
    }

    /// Fetch results take priority so the screen updates as soon as one lands.
    pub fn next(&mut self) -> anyhow::Result<AppEvent> {
        if let Ok(outcome) = self.outcomes.try_recv() {
            return Ok(AppEvent::Fetched(outcome));
        }
        if crossterm::event::poll(self.tick)? {
            Ok(AppEvent::Input(crossterm::event::read()?))
        } else {
            Ok(AppEvent::Tick)
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
