use crossterm::event::{Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::{thread, time::Duration};
use tokio::sync::mpsc;
use tracing::error;

use crate::llm::{GenerationResponse, GenerationResult};

/// Application events
#[derive(Debug)]
pub enum Event {
    /// Keyboard input event
    Key(KeyEvent),

    /// Terminal resize event
    Resize(u16, u16),

    /// Periodic tick event
    Tick,

    /// The in-flight model call came back
    TurnResolved(GenerationResult<GenerationResponse>),
}

/// Merges terminal input, ticks and turn results into one stream
pub struct EventHandler {
    receiver: mpsc::UnboundedReceiver<Event>,
    sender: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Start polling the terminal on a dedicated thread
    pub fn new(tick_interval: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        let input_sender = sender.clone();
        thread::spawn(move || loop {
            let event = match crossterm::event::poll(tick_interval) {
                Ok(true) => match crossterm::event::read() {
                    Ok(event) => match convert_crossterm_event(event) {
                        Some(event) => event,
                        None => continue,
                    },
                    Err(e) => {
                        error!("Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => Event::Tick,
                Err(e) => {
                    error!("Failed to poll terminal: {}", e);
                    break;
                }
            };

            if input_sender.send(event).is_err() {
                break; // Receiver dropped
            }
        });

        Self { receiver, sender }
    }

    /// Get the next event
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Get a clone of the sender
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.sender.clone()
    }
}

/// Convert crossterm events to application events; ignores key releases
fn convert_crossterm_event(event: CrosstermEvent) -> Option<Event> {
    match event {
        CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => Some(Event::Key(key)),
        CrosstermEvent::Resize(width, height) => Some(Event::Resize(width, height)),
        _ => None,
    }
}
