//! Line formatting for the game's HTML console.

/// Wrap `text` in a colored span understood by the game console.
pub fn colorize<T, C>(text: T, color: C) -> String
where
    T: AsRef<str>,
    C: AsRef<str>,
{
    format!(
        r#"<span style="color:{color}">{text}</span>"#,
        color = color.as_ref(),
        text = text.as_ref()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn tag(self) -> String {
        match self {
            Level::Info => "INFO".to_string(),
            Level::Warn => colorize("WARN", "orange"),
            Level::Error => colorize("ERROR", "red"),
            Level::Debug => colorize("DEBUG", "dodgerBlue"),
        }
    }
}

/// Format a leveled console line, e.g. `[INFO] hive planned 2 tasks`.
pub fn format_line<S: AsRef<str>>(level: Level, text: S) -> String {
    format!("[{}] {}", level.tag(), text.as_ref())
}
