use crossterm::event::KeyEvent;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    app::{ChatHeader, SEARCHING_MESSAGE},
    session::{TurnError, TurnHandler, TurnOutcome, TurnState},
    tui::{
        components::{ChatInput, Spinner, Transcript, TranscriptView},
        events::Event,
        keys::KeyMap,
        styles::Theme,
        Frame,
    },
};

pub const INPUT_PLACEHOLDER: &str = "Ask about your documents...";

const SCROLL_STEP: u16 = 5;

/// Chat screen state and controller
pub struct ChatApp {
    header: ChatHeader,
    handler: TurnHandler,
    input: ChatInput,
    transcript: Transcript,
    spinner: Spinner,

    /// Outcome of the most recent turn; its sources or error are drawn under it
    last_outcome: Option<TurnOutcome>,
    sources_expanded: bool,

    show_help: bool,
    status_message: Option<String>,
    should_quit: bool,

    key_map: KeyMap,
    theme: Theme,

    /// Where the spawned model call reports back
    event_sender: mpsc::UnboundedSender<Event>,
}

impl ChatApp {
    pub fn new(header: ChatHeader, handler: TurnHandler, event_sender: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            header,
            handler,
            input: ChatInput::new().with_placeholder(INPUT_PLACEHOLDER),
            transcript: Transcript::new(),
            spinner: Spinner::new(SEARCHING_MESSAGE),
            last_outcome: None,
            sources_expanded: false,
            show_help: false,
            status_message: None,
            should_quit: false,
            key_map: KeyMap::default(),
            theme: Theme::default(),
            event_sender,
        }
    }

    pub fn handler(&self) -> &TurnHandler {
        &self.handler
    }

    fn is_awaiting(&self) -> bool {
        self.handler.state() == TurnState::AwaitingResponse
    }

    /// Handle incoming events; returns true when the app should exit
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key_event) => self.handle_key(key_event),
            Event::Resize(width, height) => {
                debug!("Terminal resized to {}x{}", width, height);
            }
            Event::Tick => {
                if self.is_awaiting() {
                    self.spinner.tick();
                }
            }
            Event::TurnResolved(result) => match self.handler.finish_turn(result) {
                Ok(outcome) => {
                    self.last_outcome = Some(outcome);
                    self.input.set_focus(true);
                    self.transcript.scroll_to_bottom();
                }
                Err(e) => warn!("Dropped turn result: {}", e),
            },
        }

        self.should_quit
    }

    fn handle_key(&mut self, key_event: KeyEvent) {
        if self.key_map.should_quit(&key_event) {
            self.should_quit = true;
            return;
        }

        if self.key_map.help.matches(&key_event) {
            self.show_help = !self.show_help;
            return;
        }

        if self.key_map.toggle_sources.matches(&key_event) {
            self.sources_expanded = !self.sources_expanded;
            return;
        }

        if self.key_map.scroll_up.matches(&key_event) {
            self.transcript.scroll_up(SCROLL_STEP);
            return;
        }

        if self.key_map.scroll_down.matches(&key_event) {
            self.transcript.scroll_down(SCROLL_STEP);
            return;
        }

        if self.key_map.submit.matches(&key_event) {
            self.submit();
            return;
        }

        if self.input.handle_key_event(key_event) {
            self.status_message = None;
        }
    }

    /// Start a turn and hand the model call to a background task
    fn submit(&mut self) {
        if self.input.content().trim().is_empty() {
            return;
        }

        let prompt = self.input.content().to_string();
        let request = match self.handler.begin_turn(&prompt) {
            Ok(request) => request,
            Err(TurnError::Busy) => {
                self.status_message = Some("Still searching, please wait".to_string());
                return;
            }
            Err(e) => {
                self.status_message = Some(e.to_string());
                return;
            }
        };

        self.input.take();
        self.input.set_focus(false);
        self.last_outcome = None;
        self.sources_expanded = false;
        self.status_message = None;
        self.spinner.reset();
        self.transcript.scroll_to_bottom();

        let provider = self.handler.provider();
        let sender = self.event_sender.clone();
        tokio::spawn(async move {
            let result = provider.generate_content(request).await;
            if sender.send(Event::TurnResolved(result)).is_err() {
                debug!("UI closed before the answer arrived");
            }
        });
    }

    /// Render the application UI
    pub fn render(&mut self, frame: &mut Frame) {
        frame.render_widget(Block::default().style(self.theme.base_style()), frame.size());

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(3),    // Transcript
                Constraint::Length(3), // Input
                Constraint::Length(1), // Status bar
            ])
            .split(frame.size());

        self.render_header(frame, chunks[0]);

        let view = TranscriptView {
            session: self.handler.session(),
            pending: self.is_awaiting().then_some(&self.spinner),
            outcome: self.last_outcome.as_ref(),
            sources_expanded: self.sources_expanded,
        };
        let lines = view.lines(&self.theme);
        self.transcript.render(frame, chunks[1], &self.theme, lines);

        self.input.render(frame, chunks[2], &self.theme);
        self.render_status_bar(frame, chunks[3]);

        if self.show_help {
            self.render_help_overlay(frame);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(Span::styled(self.header.title.as_str(), self.theme.title_style()));

        let caption = Paragraph::new(Line::from(Span::styled(
            self.header.caption.as_str(),
            self.theme.dim_style(),
        )))
        .block(block);

        frame.render_widget(caption, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let status_text = if let Some(ref message) = self.status_message {
            message.clone()
        } else {
            let stats = self.handler.session().stats();
            format!(
                "{} turns | Ctrl+S sources | Ctrl+G help | Ctrl+C quit",
                stats.total_turns
            )
        };

        frame.render_widget(Paragraph::new(status_text).style(self.theme.status_bar_style()), area);
    }

    fn render_help_overlay(&self, frame: &mut Frame) {
        let help_area = centered_rect(60, 50, frame.size());

        let help_block = Block::default()
            .borders(Borders::ALL)
            .title("Help")
            .style(self.theme.help_style());

        let help_paragraph = Paragraph::new(self.key_map.help_text())
            .block(help_block)
            .style(self.theme.text_style());

        frame.render_widget(Clear, help_area);
        frame.render_widget(help_paragraph, help_area);
    }
}

/// Create a centered rectangle with given percentage of the screen
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{
        Citation, GenerateRequest, GenerationError, GenerationResponse, GenerationResult, LlmProvider,
        TokenUsage,
    };
    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    struct EchoModel {
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for EchoModel {
        async fn generate_content(&self, request: GenerateRequest) -> GenerationResult<GenerationResponse> {
            if self.fail {
                return Err(GenerationError::Transport("generic fault".into()));
            }
            Ok(GenerationResponse {
                text: format!("echo: {}", request.prompt),
                citations: vec![Citation::new(Some("Policy.pdf".into()), None)],
                usage: TokenUsage::default(),
                finish_reason: Some("STOP".into()),
            })
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }
    }

    fn app(fail: bool) -> (ChatApp, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let header = ChatHeader {
            title: "🤖 Vertex AI RAG Chat".into(),
            caption: "Connected to Corpus: `1111111` in `europe-west1`".into(),
        };
        let handler = TurnHandler::new(Arc::new(EchoModel { fail }));
        (ChatApp::new(header, handler, sender), receiver)
    }

    fn press(app: &mut ChatApp, code: KeyCode) {
        app.handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn type_text(app: &mut ChatApp, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    async fn resolve(app: &mut ChatApp, receiver: &mut mpsc::UnboundedReceiver<Event>) {
        let event = receiver.recv().await.unwrap();
        assert!(matches!(event, Event::TurnResolved(_)));
        app.handle_event(event);
    }

    fn screen(app: &mut ChatApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_submit_and_answer() {
        let (mut app, mut receiver) = app(false);
        type_text(&mut app, "What is the refund policy?");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.handler().state(), TurnState::AwaitingResponse);
        assert_eq!(app.handler().session().len(), 1);
        assert!(app.input.content().is_empty());

        resolve(&mut app, &mut receiver).await;
        assert_eq!(app.handler().state(), TurnState::Idle);
        assert_eq!(app.handler().session().len(), 2);
        assert!(app.last_outcome.as_ref().unwrap().sources().is_some());
    }

    #[tokio::test]
    async fn test_submit_while_awaiting_is_refused() {
        let (mut app, mut receiver) = app(false);
        type_text(&mut app, "first");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "second");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.handler().session().len(), 1);
        assert_eq!(app.input.content(), "second");
        assert!(app.status_message.is_some());

        resolve(&mut app, &mut receiver).await;
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.handler().session().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_submit_is_ignored() {
        let (mut app, _receiver) = app(false);
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.handler().state(), TurnState::Idle);
        assert!(app.handler().session().is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_user_turn() {
        let (mut app, mut receiver) = app(true);
        type_text(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        resolve(&mut app, &mut receiver).await;

        assert_eq!(app.handler().session().len(), 1);
        assert!(screen(&mut app).contains("Error generating response"));
    }

    #[tokio::test]
    async fn test_render_header_and_sources_toggle() {
        let (mut app, mut receiver) = app(false);
        let idle = screen(&mut app);
        assert!(idle.contains("Vertex AI RAG Chat"));
        assert!(idle.contains("Connected to Corpus: `1111111` in `europe-west1`"));
        assert!(idle.contains(INPUT_PLACEHOLDER));

        type_text(&mut app, "refunds?");
        press(&mut app, KeyCode::Enter);
        resolve(&mut app, &mut receiver).await;
        assert!(!screen(&mut app).contains("Policy.pdf"));

        app.handle_event(Event::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)));
        let expanded = screen(&mut app);
        assert!(expanded.contains("Policy.pdf"));
        assert!(expanded.contains("Location: Internal RAG DB"));
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (mut app, _receiver) = app(false);
        assert!(app.handle_event(Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE))));
        assert!(app.should_quit);
    }
}
