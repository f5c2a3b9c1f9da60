//! Terminal front-end.
//!
//! Reads commands from stdin and renders transcript events to stdout. Every
//! dispatch runs in its own task, so a slow reply never blocks typing.

use std::io::{self, Write};
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::oneshot;
use tokio::task::JoinSet;

use crate::api::UploadFile;
use crate::transcript::{Origin, TranscriptEntry, TranscriptEvent};
use crate::widget::ChatWidget;

/// Text of the transient typing line.
pub const INDICATOR_TEXT: &str = "Bot is typing...";

/// Carriage return plus "erase entire line".
const CLEAR_LINE: &str = "\r\x1b[2K";

const HELP: &str = "\
Type a message and press Enter to send it.
  /upload <path>  upload a file
  /help           show this help
  /quit           exit (end of input works too)";

/// One line of user input, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Chat text, untrimmed. Blank text is dropped by the widget.
    Message(String),
    /// Upload the file at this path.
    Upload(PathBuf),
    /// Print usage.
    Help,
    /// Stop reading input.
    Quit,
    /// A slash command that could not be understood.
    Invalid(String),
}

/// Interpret one input line.
pub fn parse_line(line: &str) -> InputCommand {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return InputCommand::Message(line.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    match name {
        "upload" if rest.is_empty() => InputCommand::Invalid("usage: /upload <path>".to_string()),
        "upload" => InputCommand::Upload(PathBuf::from(rest)),
        "help" => InputCommand::Help,
        "quit" | "exit" => InputCommand::Quit,
        other => InputCommand::Invalid(format!("unknown command: /{other}")),
    }
}

/// Draws transcript events as terminal lines.
///
/// The typing indicator occupies at most one line at the bottom. It is erased
/// when hidden and redrawn under entries appended while it is visible.
#[derive(Debug)]
pub struct TerminalRenderer<W: Write> {
    out: W,
    indicator_visible: bool,
}

impl<W: Write> TerminalRenderer<W> {
    /// Create a renderer writing to `out`, with no indicator drawn.
    pub fn new(out: W) -> Self {
        Self {
            out,
            indicator_visible: false,
        }
    }

    /// Print the widget title.
    pub fn banner(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out, "== {title} ==")?;
        writeln!(self.out, "(type /help for commands)")?;
        self.out.flush()
    }

    /// Draw one transcript event.
    pub fn render(&mut self, event: &TranscriptEvent) -> io::Result<()> {
        match event {
            TranscriptEvent::EntryAppended(entry) => {
                if self.indicator_visible {
                    write!(self.out, "{CLEAR_LINE}")?;
                }
                self.write_entry(entry)?;
                if self.indicator_visible {
                    write!(self.out, "{INDICATOR_TEXT}")?;
                }
            }
            // Scrollback already holds it.
            TranscriptEvent::EntryEvicted { .. } => {}
            TranscriptEvent::IndicatorShown => {
                if !self.indicator_visible {
                    write!(self.out, "{INDICATOR_TEXT}")?;
                    self.indicator_visible = true;
                }
            }
            TranscriptEvent::IndicatorHidden => {
                if self.indicator_visible {
                    write!(self.out, "{CLEAR_LINE}")?;
                    self.indicator_visible = false;
                }
            }
        }
        self.out.flush()
    }

    fn write_entry(&mut self, entry: &TranscriptEntry) -> io::Result<()> {
        let label = match entry.origin {
            Origin::User => "You",
            Origin::Bot => "Bot",
        };
        let indent = " ".repeat(label.len() + 2);

        let mut lines = entry.text.lines();
        writeln!(self.out, "{label}: {}", lines.next().unwrap_or_default())?;
        for line in lines {
            writeln!(self.out, "{indent}{line}")?;
        }
        Ok(())
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Run the interactive loop on stdin/stdout until `/quit` or end of input.
pub async fn run(widget: ChatWidget, title: &str) -> anyhow::Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    run_with(widget, title, input, io::stdout()).await?;
    Ok(())
}

/// Run the interactive loop over any line source and output sink.
///
/// Lines that are not valid UTF-8 are decoded lossily rather than ending the
/// session. In-flight dispatches are always awaited before returning so their
/// replies are rendered. Returns the sink once everything has been drawn.
pub async fn run_with<R, W>(
    widget: ChatWidget,
    title: &str,
    mut input: R,
    out: W,
) -> anyhow::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send + 'static,
{
    let mut renderer = TerminalRenderer::new(out);
    let mut events = widget.transcript().subscribe();

    renderer.banner(title)?;
    for entry in widget.transcript().entries() {
        renderer.render(&TranscriptEvent::EntryAppended(entry))?;
    }

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let render_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Ok(event) => renderer.render(&event)?,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Terminal renderer lagged behind transcript");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut stop_rx => {
                    loop {
                        match events.try_recv() {
                            Ok(event) => renderer.render(&event)?,
                            Err(TryRecvError::Lagged(_)) => {}
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
        Ok::<_, io::Error>(renderer.into_inner())
    });

    let mut dispatches = JoinSet::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                break;
            }
        }
        while dispatches.try_join_next().is_some() {}

        let line = String::from_utf8_lossy(&buf);
        match parse_line(line.trim_end_matches(['\n', '\r'])) {
            InputCommand::Message(text) => {
                let widget = widget.clone();
                dispatches.spawn(async move {
                    widget.submit(&text).await;
                });
            }
            InputCommand::Upload(path) => match UploadFile::from_path(&path).await {
                Ok(file) => {
                    let widget = widget.clone();
                    dispatches.spawn(async move {
                        widget.upload(file).await;
                    });
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not read upload");
                    eprintln!("Cannot read {}: {e}", path.display());
                }
            },
            InputCommand::Help => println!("{HELP}"),
            InputCommand::Invalid(reason) => eprintln!("{reason}"),
            InputCommand::Quit => break,
        }
    }

    while let Some(result) = dispatches.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "Dispatch task failed");
        }
    }

    // Every event has been sent once the dispatches are done.
    let _ = stop_tx.send(());
    Ok(render_task.await??)
}
