//! Line-oriented console surface used by the binary.
//!
//! [`parse_line`] turns one line of input into a [`ConsoleInput`];
//! [`render_view`] and [`ViewPrinter`] turn [`StudioView`] snapshots back
//! into text.

use thiserror::Error;

use crate::app::{StudioCommand, StudioView};
use crate::documents::DocumentId;
use crate::playback::{format_clock, PlaybackStatus};
use crate::status::Tone;

pub const HELP: &str = "\
commands:
  new                      open a new document
  open <doc>               make <doc> active (e.g. doc-2 or 2)
  close <doc>              close a document
  edit <doc> <text>        replace a document's content (\\n for newlines)
  run                      generate music from the active document
  play | pause | stop      transport
  seek <seconds>           move the playhead
  volume <0-100>           set the output volume
  chat <message>           ask the assistant
  show                     print the full studio state
  help                     this text
  quit                     exit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Command(StudioCommand),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("empty input")]
    Empty,

    #[error("unknown command {0:?} (try `help`)")]
    Unknown(String),

    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("invalid {what}: {value:?}")]
    InvalidArgument { what: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub fn parse_line(line: &str) -> Result<ConsoleInput, ConsoleError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "" => return Err(ConsoleError::Empty),
        "show" => return Ok(ConsoleInput::Show),
        "help" | "?" => return Ok(ConsoleInput::Help),
        "quit" | "exit" => return Ok(ConsoleInput::Quit),
        "new" => StudioCommand::AddDocument,
        "open" | "select" => StudioCommand::SelectDocument(document_arg("open", rest)?),
        "close" => StudioCommand::CloseDocument(document_arg("close", rest)?),
        "edit" => {
            let (doc, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            StudioCommand::EditDocument {
                id: document_arg("edit", doc)?,
                content: unescape(text),
            }
        }
        "run" => StudioCommand::Run,
        "play" => StudioCommand::Play,
        "pause" => StudioCommand::Pause,
        "stop" => StudioCommand::Stop,
        "seek" => StudioCommand::Seek(number_arg("seek", "seconds", rest)?),
        "volume" | "vol" => StudioCommand::SetVolume(number_arg("volume", "a percentage", rest)?),
        // Blank messages go through; the chat channel ignores them.
        "chat" => StudioCommand::Chat(rest.to_string()),
        other => return Err(ConsoleError::Unknown(other.to_string())),
    };
    Ok(ConsoleInput::Command(command))
}

fn document_arg(command: &'static str, arg: &str) -> Result<DocumentId, ConsoleError> {
    if arg.is_empty() {
        return Err(ConsoleError::MissingArgument {
            command,
            what: "a document id",
        });
    }
    arg.parse().map_err(|_| ConsoleError::InvalidArgument {
        what: "document id",
        value: arg.to_string(),
    })
}

fn number_arg<T: std::str::FromStr>(
    command: &'static str,
    what: &'static str,
    arg: &str,
) -> Result<T, ConsoleError> {
    if arg.is_empty() {
        return Err(ConsoleError::MissingArgument { command, what });
    }
    arg.parse().map_err(|_| ConsoleError::InvalidArgument {
        what,
        value: arg.to_string(),
    })
}

/// Expand `\n`, `\t` and `\\`.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn tone_marker(tone: Tone) -> &'static str {
    match tone {
        Tone::Neutral => "[..]",
        Tone::Success => "[ok]",
        Tone::Error => "[!!]",
    }
}

fn playback_line(view: &StudioView) -> String {
    let p = &view.playback;
    let duration = p
        .duration_secs
        .map(format_clock)
        .unwrap_or_else(|| "--:--".to_string());
    format!(
        "{} {} / {}  vol {}%",
        p.status.label(),
        format_clock(p.position_secs),
        duration,
        p.volume_percent
    )
}

/// Full multi-line description of a view.
pub fn render_view(view: &StudioView) -> String {
    let mut out = String::from("documents:\n");
    for doc in &view.documents {
        let marker = if doc.id == view.active { '*' } else { ' ' };
        out.push_str(&format!(
            " {marker} {:<7} {:<12} {:<10} {} lines, {} chars\n",
            doc.id.to_string(),
            doc.name,
            doc.language.label(),
            doc.stats.lines,
            doc.stats.length
        ));
    }
    if view.generating {
        out.push_str("generating...\n");
    }
    out.push_str(&format!("playback: {}\n", playback_line(view)));
    if let Some(entry) = view.status.last() {
        out.push_str(&format!("status: {} {}\n", tone_marker(entry.tone), entry.text));
    }
    out.push_str(&format!("chat: {} messages", view.chat.len()));
    if view.chat_pending > 0 {
        out.push_str(&format!(", {} awaiting reply", view.chat_pending));
    }
    out
}

/// Prints only what changed between successive views.
#[derive(Debug, Default)]
pub struct ViewPrinter {
    status_seen: u64,
    chat_seen: usize,
    playback: Option<PlaybackStatus>,
}

impl ViewPrinter {
    /// A printer that treats everything already in `view` as seen.
    pub fn starting_at(view: &StudioView) -> Self {
        Self {
            status_seen: view.status_appended,
            chat_seen: view.chat.len(),
            playback: Some(view.playback.status),
        }
    }

    /// Lines describing what is new in `view`.
    pub fn changes(&mut self, view: &StudioView) -> Vec<String> {
        let mut lines = Vec::new();

        let fresh = view.status_appended.saturating_sub(self.status_seen);
        let fresh = usize::try_from(fresh).unwrap_or(usize::MAX).min(view.status.len());
        for entry in &view.status[view.status.len() - fresh..] {
            lines.push(format!("{} {}", tone_marker(entry.tone), entry.text));
        }
        self.status_seen = view.status_appended;

        for message in view.chat.iter().skip(self.chat_seen) {
            lines.push(format!("{}> {}", message.role.label(), message.text));
        }
        self.chat_seen = view.chat.len();

        if self.playback != Some(view.playback.status) {
            lines.push(format!("playback: {}", playback_line(view)));
            self.playback = Some(view.playback.status);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::DocumentSummary;
    use crate::chat::{ChatMessage, ChatRole};
    use crate::documents::{DocumentStats, Language};
    use crate::playback::PlaybackState;
    use crate::status::StatusEntry;

    fn command(line: &str) -> StudioCommand {
        match parse_line(line) {
            Ok(ConsoleInput::Command(command)) => command,
            other => panic!("{line:?} parsed as {other:?}"),
        }
    }

    fn view() -> StudioView {
        StudioView {
            documents: vec![DocumentSummary {
                id: DocumentId(1),
                name: "main.py".into(),
                language: Language::Python,
                stats: DocumentStats {
                    lines: 3,
                    length: 40,
                },
            }],
            active: DocumentId(1),
            generating: false,
            playback: PlaybackState {
                status: PlaybackStatus::Stopped,
                position_secs: 0.0,
                duration_secs: None,
                volume_percent: 75,
            },
            status: Vec::new(),
            status_appended: 0,
            chat: vec![ChatMessage {
                role: ChatRole::Assistant,
                text: "Hello!".into(),
            }],
            chat_pending: 0,
        }
    }

    #[test]
    fn parses_transport_and_documents() {
        assert_eq!(command("run"), StudioCommand::Run);
        assert_eq!(command("  PLAY "), StudioCommand::Play);
        assert_eq!(command("seek 12.5"), StudioCommand::Seek(12.5));
        assert_eq!(command("volume 80"), StudioCommand::SetVolume(80));
        assert_eq!(command("new"), StudioCommand::AddDocument);
        assert_eq!(command("open doc-2"), StudioCommand::SelectDocument(DocumentId(2)));
        assert_eq!(command("close 3"), StudioCommand::CloseDocument(DocumentId(3)));
        assert_eq!(
            command("chat how do   I loop?"),
            StudioCommand::Chat("how do   I loop?".into())
        );
    }

    #[test]
    fn edit_unescapes_newlines() {
        assert_eq!(
            command(r"edit doc-1 piano = Piano()\npiano.play('C4')"),
            StudioCommand::EditDocument {
                id: DocumentId(1),
                content: "piano = Piano()\npiano.play('C4')".into(),
            }
        );
        assert_eq!(unescape(r"a\\n\q\"), "a\\n\\q\\");
    }

    #[test]
    fn meta_inputs() {
        assert_eq!(parse_line("show"), Ok(ConsoleInput::Show));
        assert_eq!(parse_line("?"), Ok(ConsoleInput::Help));
        assert_eq!(parse_line("exit"), Ok(ConsoleInput::Quit));
    }

    #[test]
    fn reports_bad_input() {
        assert_eq!(parse_line("   "), Err(ConsoleError::Empty));
        assert_eq!(
            parse_line("dance"),
            Err(ConsoleError::Unknown("dance".into()))
        );
        assert!(matches!(
            parse_line("seek"),
            Err(ConsoleError::MissingArgument { command: "seek", .. })
        ));
        assert!(matches!(
            parse_line("volume loud"),
            Err(ConsoleError::InvalidArgument { .. })
        ));
        assert!(matches!(
            parse_line("open tab"),
            Err(ConsoleError::InvalidArgument { what: "document id", .. })
        ));
    }

    #[test]
    fn render_marks_active_document() {
        let text = render_view(&view());
        assert!(text.contains("* doc-1"));
        assert!(text.contains("main.py"));
        assert!(text.contains("Stopped 0:00 / --:--  vol 75%"));
        assert!(text.ends_with("chat: 1 messages"));
    }

    #[test]
    fn printer_reports_only_new_items() {
        let mut view = view();
        let mut printer = ViewPrinter::starting_at(&view);
        assert!(printer.changes(&view).is_empty());

        view.status.push(StatusEntry::new("Music generated from main.py", Tone::Success));
        view.status_appended = 1;
        view.playback.status = PlaybackStatus::Playing;
        view.chat.push(ChatMessage {
            role: ChatRole::User,
            text: "hi".into(),
        });

        let lines = printer.changes(&view);
        assert_eq!(
            lines,
            [
                "[ok] Music generated from main.py",
                "user> hi",
                "playback: Playing 0:00 / --:--  vol 75%",
            ]
        );
        assert!(printer.changes(&view).is_empty());
    }
}
