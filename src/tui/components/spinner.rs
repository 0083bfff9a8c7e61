//! Loading spinner shown while a turn is in flight

/// Classic dots spinner: ⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏
const DOTS: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone)]
pub struct Spinner {
    frame: usize,
    message: String,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        Self {
            frame: 0,
            message: message.to_string(),
        }
    }

    /// Advance one frame
    pub fn tick(&mut self) {
        self.frame = (self.frame + 1) % DOTS.len();
    }

    pub fn reset(&mut self) {
        self.frame = 0;
    }

    pub fn text(&self) -> String {
        format!("{} {}", DOTS[self.frame], self.message)
    }
}
