//! Colored status lines for operators.

use std::io::IsTerminal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Ok,
    Fail,
    Warn,
    Step,
}

impl Level {
    fn marker(self) -> &'static str {
        match self {
            Level::Ok => "✔",
            Level::Fail => "✖",
            Level::Warn => "!",
            Level::Step => "→",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Level::Ok => "\x1b[32m",
            Level::Fail => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Step => "\x1b[36m",
        }
    }
}

fn use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

/// Renders one status line, colored or plain.
pub fn format_line(level: Level, message: &str, color: bool) -> String {
    if color {
        format!("{}{}\x1b[0m {}", level.color(), level.marker(), message)
    } else {
        format!("{} {}", level.marker(), message)
    }
}

pub fn print(level: Level, message: impl AsRef<str>) {
    println!("{}", format_line(level, message.as_ref(), use_color()));
}

pub fn ok(message: impl AsRef<str>) {
    print(Level::Ok, message);
}

pub fn fail(message: impl AsRef<str>) {
    print(Level::Fail, message);
}

pub fn warn(message: impl AsRef<str>) {
    print(Level::Warn, message);
}

pub fn step(message: impl AsRef<str>) {
    print(Level::Step, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_line_has_marker_and_message() {
        assert_eq!(format_line(Level::Warn, "skipped", false), "! skipped");
    }

    #[test]
    fn colored_line_resets_after_marker() {
        let line = format_line(Level::Fail, "boom", true);
        assert!(line.starts_with("\x1b[31m✖\x1b[0m"));
        assert!(line.ends_with(" boom"));
    }
}
