//! Scrolling chat transcript with the latest turn's sources or error

use chrono::Local;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::{
    app::SOURCES_HEADING,
    session::{ChatSession, Role, TurnOutcome},
    tui::{components::Spinner, styles::Theme, Frame},
};

const EMPTY_HINT: &str = "Ask a question about the documents in the corpus.";

/// What to draw: the whole session plus whatever belongs to the latest turn
pub struct TranscriptView<'a> {
    pub session: &'a ChatSession,
    pub pending: Option<&'a Spinner>,
    pub outcome: Option<&'a TurnOutcome>,
    pub sources_expanded: bool,
}

impl<'a> TranscriptView<'a> {
    pub fn lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        if self.session.is_empty() && self.pending.is_none() {
            lines.push(Line::from(Span::styled(EMPTY_HINT, theme.dim_style())));
        }

        for turn in self.session.turns() {
            let (label, style) = match turn.role() {
                Role::User => ("You", theme.user_style()),
                Role::Assistant => ("Assistant", theme.assistant_style()),
            };
            let time = turn.created_at().with_timezone(&Local).format("%H:%M");
            lines.push(Line::from(vec![
                Span::styled(label, style),
                Span::styled(format!(" {}", time), theme.dim_style()),
            ]));
            for text in turn.content().lines() {
                lines.push(Line::from(Span::styled(text.to_string(), theme.text_style())));
            }
            lines.push(Line::default());
        }

        if let Some(spinner) = self.pending {
            lines.push(Line::from(Span::styled(spinner.text(), theme.dim_style())));
        }

        if let Some(outcome) = self.outcome {
            if let Some(message) = outcome.error_message() {
                lines.push(Line::from(Span::styled(message, theme.error_style())));
            }

            if let Some(sources) = outcome.sources() {
                if self.sources_expanded {
                    lines.push(Line::from(Span::styled(
                        format!("▾ {}", SOURCES_HEADING),
                        theme.title_style(),
                    )));
                    for (i, citation) in sources.iter().enumerate() {
                        lines.push(Line::from(Span::styled(
                            format!("  {}", citation.display_title(i)),
                            theme.source_style(),
                        )));
                        lines.push(Line::from(Span::styled(
                            format!("  Location: {}", citation.display_locator()),
                            theme.dim_style(),
                        )));
                    }
                } else {
                    lines.push(Line::from(Span::styled(
                        format!("▸ {} ({}), Ctrl+S to expand", SOURCES_HEADING, sources.len()),
                        theme.title_style(),
                    )));
                }
            }
        }

        lines
    }
}

/// Break lines into rows of at most `width` columns, the way they are drawn.
/// A wrapped line keeps the style of its first span.
pub fn wrap_lines(lines: Vec<Line<'static>>, width: u16) -> Vec<Line<'static>> {
    let width = width.max(1) as usize;
    let mut rows = Vec::with_capacity(lines.len());

    for line in lines {
        if line.width() <= width {
            rows.push(line);
            continue;
        }

        let style = line.spans.first().map(|span| span.style).unwrap_or_default();
        let text: String = line.spans.iter().map(|span| span.content.as_ref()).collect();
        rows.extend(
            textwrap::wrap(&text, width)
                .into_iter()
                .map(|row| Line::from(Span::styled(row.into_owned(), style))),
        );
    }

    rows
}

/// Transcript pane; sticks to the bottom unless scrolled back
#[derive(Debug, Default)]
pub struct Transcript {
    scroll_back: u16,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.scroll_back = self.scroll_back.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(rows);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, lines: Vec<Line<'static>>) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style());

        let rows = wrap_lines(lines, area.width.saturating_sub(2));
        let inner_height = area.height.saturating_sub(2);
        let total = rows.len().min(u16::MAX as usize) as u16;
        let max_scroll = total.saturating_sub(inner_height);
        self.scroll_back = self.scroll_back.min(max_scroll);

        let paragraph = Paragraph::new(rows)
            .block(block)
            .scroll((max_scroll - self.scroll_back, 0));

        frame.render_widget(paragraph, area);
    }
}
