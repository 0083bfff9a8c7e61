//! Line-oriented transcript output for the REPL and `run`

use std::io::{self, Write};

use crate::{
    app::ChatHeader,
    llm::Citation,
    session::TurnOutcome,
};

pub const SOURCES_HEADING: &str = "📚 View Sources";
pub const SEARCHING_MESSAGE: &str = "Searching knowledge base...";

/// Writes turns and outcomes as plain text
pub struct PlainTranscript<W: Write> {
    out: W,
}

impl<W: Write> PlainTranscript<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn header(&mut self, header: &ChatHeader) -> io::Result<()> {
        writeln!(self.out, "{}", header.title)?;
        writeln!(self.out, "{}", header.caption)?;
        writeln!(self.out)
    }

    pub fn searching(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", SEARCHING_MESSAGE)?;
        self.out.flush()
    }

    /// Answer or error, then the sources block when there are citations
    pub fn outcome(&mut self, outcome: &TurnOutcome) -> io::Result<()> {
        if let Some(answer) = outcome.answer() {
            writeln!(self.out, "assistant> {}", answer)?;
        }
        if let Some(message) = outcome.error_message() {
            writeln!(self.out, "{}", message)?;
        }
        if let Some(sources) = outcome.sources() {
            self.sources(sources)?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }

    fn sources(&mut self, sources: &[Citation]) -> io::Result<()> {
        writeln!(self.out, "{}", SOURCES_HEADING)?;
        for (i, citation) in sources.iter().enumerate() {
            writeln!(self.out, "  [{}] {}", i + 1, citation.display_title(i))?;
            writeln!(self.out, "      Location: {}", citation.display_locator())?;
        }
        Ok(())
    }

    pub fn prompt_marker(&mut self) -> io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Citation, GenerationError};

    fn render(outcome: &TurnOutcome) -> String {
        let mut transcript = PlainTranscript::new(Vec::new());
        transcript.outcome(outcome).unwrap();
        String::from_utf8(transcript.into_inner()).unwrap()
    }

    #[test]
    fn test_answer_with_sources() {
        let text = render(&TurnOutcome::Answered {
            answer: "30 days.".into(),
            citations: vec![
                Citation::new(Some("Policy.pdf".into()), Some("gs://docs/Policy.pdf".into())),
                Citation::new(None, None),
            ],
        });

        assert!(text.contains("assistant> 30 days."));
        assert!(text.contains(SOURCES_HEADING));
        assert!(text.contains("[1] Policy.pdf"));
        assert!(text.contains("Location: gs://docs/Policy.pdf"));
        assert!(text.contains("[2] Chunk 2"));
        assert!(text.contains("Location: Internal RAG DB"));
    }

    #[test]
    fn test_no_sources_heading_without_citations() {
        let text = render(&TurnOutcome::Answered { answer: "hi".into(), citations: vec![] });
        assert!(!text.contains(SOURCES_HEADING));
    }

    #[test]
    fn test_error_is_inline() {
        let text = render(&TurnOutcome::Failed {
            error: GenerationError::Transport("boom".into()),
        });
        assert!(text.contains("Error generating response: transport error: boom"));
        assert!(!text.contains("assistant>"));
    }
}
