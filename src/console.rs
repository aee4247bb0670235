//! Human-facing status output
//!
//! Banners, section markers and leveled status lines, colored with
//! crossterm when the terminal allows it.

use crossterm::style::{style, Color, Stylize};

/// Width of header banners
const BANNER_WIDTH: usize = 70;

/// Status level of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Fail,
    Warn,
    Info,
}

impl Level {
    fn color(self) -> Color {
        match self {
            Level::Ok => Color::Green,
            Level::Fail => Color::Red,
            Level::Warn => Color::Yellow,
            Level::Info => Color::Cyan,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Level::Ok => "✓",
            Level::Fail => "✗",
            Level::Warn => "⚠",
            Level::Info => "ℹ",
        }
    }
}

/// Console writer
#[derive(Debug, Clone, Copy)]
pub struct Console {
    color: bool,
}

impl Console {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Color unless `NO_COLOR` is set
    pub fn from_env() -> Self {
        Self::new(std::env::var_os("NO_COLOR").is_none())
    }

    /// Plain output, used by tests
    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.color {
            return text.to_string();
        }
        let styled = style(text).with(color);
        if bold {
            styled.bold().to_string()
        } else {
            styled.to_string()
        }
    }

    pub fn header(&self, text: &str) {
        let rule = "=".repeat(BANNER_WIDTH);
        println!("\n{}", rule);
        let centered = format!("{:^width$}", text, width = BANNER_WIDTH);
        println!("{}", self.paint(&centered, Color::Cyan, true));
        println!("{}", rule);
    }

    pub fn section(&self, text: &str) {
        println!("\n{}", self.paint(&format!(">>> {}", text), Color::Yellow, true));
    }

    /// A marked status line: `✓ text`, `✗ text`, ...
    pub fn status(&self, level: Level, text: &str) {
        let line = format!("{} {}", level.marker(), text);
        let bold = matches!(level, Level::Ok | Level::Fail);
        println!("{}", self.paint(&line, level.color(), bold));
    }

    /// A colored line without a marker
    pub fn note(&self, level: Level, text: &str) {
        println!("{}", self.paint(text, level.color(), false));
    }

    /// Uncolored passthrough, for relayed tool output
    pub fn raw(&self, text: &str) {
        println!("{}", text);
    }

    pub fn error(&self, text: &str) {
        eprintln!("{}", self.paint(text, Color::Red, false));
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::from_env()
    }
}
