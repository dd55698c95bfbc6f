//! Console rendering of step headers, skip notices and misuse warnings.

use crate::color::ColorPath;
use crossterm::style::{Color, Stylize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

const HEADER_COLOR: Color = Color::Rgb {
    r: 0x11,
    g: 0x66,
    b: 0x66,
};

const LOOK_ABOVE: &str = "\n\n\n\n\nlook above 👆\n\n\n\n";

/// Destination for rendered console lines.
pub trait Sink: Send + Sync {
    /// Writes one rendered entry. Entries may span several lines.
    fn write_line(&self, line: &str);
}

/// Writes to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn write_line(&self, line: &str) {
        println!("{}", line);
    }
}

/// Keeps every entry in memory.
///
/// ```
/// use devlog::{MemorySink, Sink};
///
/// let sink = MemorySink::new();
/// sink.write_line("hello");
/// assert_eq!(sink.lines(), vec!["hello".to_string()]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of entries containing `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl Sink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Renders the fixed console templates through a [`Sink`].
#[derive(Clone)]
pub(crate) struct Printer {
    sink: Arc<dyn Sink>,
    color: bool,
    glyph: String,
}

impl fmt::Debug for Printer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Printer")
            .field("color", &self.color)
            .field("glyph", &self.glyph)
            .finish()
    }
}

impl Printer {
    pub(crate) fn new(sink: Arc<dyn Sink>, color: bool, glyph: impl Into<String>) -> Self {
        Self {
            sink,
            color,
            glyph: glyph.into(),
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    /// One glyph per level, each in that level's color.
    pub(crate) fn prefix(&self, colors: &ColorPath) -> String {
        colors
            .codes()
            .iter()
            .fold(String::new(), |mut acc, code| {
                acc.push_str(&self.paint(&self.glyph, Color::AnsiValue(*code)));
                acc
            })
    }

    fn emit(&self, prefix: &str, text: &str) {
        self.sink.write_line(&format!("{}{}", prefix, text));
    }

    pub(crate) fn header(&self, prefix: &str, message: &str) {
        let text = format!("run {}", message);
        self.emit(prefix, &self.paint(&text, HEADER_COLOR));
    }

    pub(crate) fn skipped(&self, prefix: &str, message: &str) {
        self.emit(
            prefix,
            &format!("{} {}", self.paint("skipped", Color::Yellow), message),
        );
    }

    pub(crate) fn overlap(&self, prefix: &str, message: &str, previous: &str) {
        let previous = self.paint(previous, Color::Red);
        self.emit(
            prefix,
            &format!(
                "overlap: {} expects the previous step {} to finish first (add await before {})",
                self.paint(message, Color::Blue),
                previous,
                previous
            ),
        );
        self.emit(prefix, LOOK_ABOVE);
    }

    pub(crate) fn parent_finished(
        &self,
        prefix: &str,
        message: &str,
        parent: &str,
        previous: Option<&str>,
    ) {
        let parent = self.paint(parent, Color::DarkRed);
        let previous = self.paint(previous.unwrap_or("<none>"), Color::Yellow);
        self.emit(
            prefix,
            &format!(
                "current step \"{}\"\n\
                 its parent \"{}\" has already finished\n\
                 while the previous step \"{}\" was still pending\n\
                 expected an await before\n\
                 \"{}-{}\"",
                self.paint(message, Color::Blue),
                parent,
                previous,
                parent,
                previous
            ),
        );
        self.emit(prefix, LOOK_ABOVE);
    }

    pub(crate) fn body_failed(&self, prefix: &str, error: &str) {
        let text = format!("step body raised an error \n {}", error);
        self.emit(prefix, &self.paint(&text, Color::Magenta));
    }
}
