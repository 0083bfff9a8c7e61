use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Key binding configuration
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
    pub label: &'static str,
    pub description: &'static str,
}

impl KeyBinding {
    pub const fn new(
        key: KeyCode,
        modifiers: KeyModifiers,
        label: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            modifiers,
            label,
            description,
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.code && self.modifiers == event.modifiers
    }
}

/// Application key mappings
#[derive(Debug, Clone)]
pub struct KeyMap {
    pub quit: KeyBinding,
    pub quit_alt: KeyBinding,
    pub help: KeyBinding,
    pub submit: KeyBinding,
    pub toggle_sources: KeyBinding,
    pub scroll_up: KeyBinding,
    pub scroll_down: KeyBinding,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            quit: KeyBinding::new(KeyCode::Char('c'), KeyModifiers::CONTROL, "Ctrl+C", "Quit"),
            quit_alt: KeyBinding::new(KeyCode::Esc, KeyModifiers::NONE, "Esc", "Quit"),
            help: KeyBinding::new(KeyCode::Char('g'), KeyModifiers::CONTROL, "Ctrl+G", "Show/hide help"),
            submit: KeyBinding::new(KeyCode::Enter, KeyModifiers::NONE, "Enter", "Send message"),
            toggle_sources: KeyBinding::new(
                KeyCode::Char('s'),
                KeyModifiers::CONTROL,
                "Ctrl+S",
                "Expand/collapse sources",
            ),
            scroll_up: KeyBinding::new(KeyCode::PageUp, KeyModifiers::NONE, "PgUp", "Scroll up"),
            scroll_down: KeyBinding::new(KeyCode::PageDown, KeyModifiers::NONE, "PgDn", "Scroll down"),
        }
    }
}

impl KeyMap {
    /// Check if the event should quit the application
    pub fn should_quit(&self, event: &KeyEvent) -> bool {
        self.quit.matches(event) || self.quit_alt.matches(event)
    }

    fn bindings(&self) -> [&KeyBinding; 7] {
        [
            &self.submit,
            &self.toggle_sources,
            &self.scroll_up,
            &self.scroll_down,
            &self.help,
            &self.quit,
            &self.quit_alt,
        ]
    }

    /// Get help text for all key bindings
    pub fn help_text(&self) -> String {
        self.bindings()
            .iter()
            .map(|b| format!("{:<8} {}", b.label, b.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
