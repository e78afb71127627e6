use chrono::{DateTime, Utc};
use colored::Colorize;
use notenet::model::DocId;
use notenet::state::{NoteEntry, Notes};
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const STATUS_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
}

pub fn print_message(level: MessageLevel, content: &str) {
    match level {
        MessageLevel::Info => println!("{}", content.dimmed()),
        MessageLevel::Success => println!("{}", content.green()),
        MessageLevel::Warning => println!("{}", content.yellow()),
    }
}

pub fn print_notes(notes: &Notes) {
    if notes.is_empty() {
        println!("No notes yet.");
        return;
    }

    for (i, (id, entry)) in notes.iter().enumerate() {
        let idx_str = format!("{}. ", i + 1);
        let prefix = "    ";
        let fixed_width = prefix.width() + idx_str.width() + STATUS_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed_width);

        let title = if entry.title().is_empty() {
            id.to_string()
        } else {
            entry.title().to_string()
        };
        let title_display = truncate_to_width(&title, available);
        let padding = available.saturating_sub(title_display.width());
        let status = format!("{:>width$}", entry.status_label(), width = STATUS_WIDTH);

        println!(
            "{}{}{}{}{}",
            prefix,
            idx_str.yellow(),
            title_display,
            " ".repeat(padding),
            status.dimmed()
        );
    }
}

pub fn print_note(id: &DocId, entry: &NoteEntry, placeholder: &str) {
    let content = entry.doc().map(|doc| doc.content());
    let date = content
        .as_ref()
        .and_then(|c| c.get("date"))
        .and_then(|d| d.as_str())
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc));

    println!("{}", entry.title().bold());
    match date {
        Some(date) => println!("{}  {}", id.to_string().dimmed(), format_time_ago(date).dimmed()),
        None => println!("{}", id.to_string().dimmed()),
    }
    println!("--------------------------------");
    match entry.text() {
        Some(text) if !text.is_empty() => println!("{}", text),
        _ => println!("{}", placeholder.dimmed()),
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    Formatter::new().convert(duration.to_std().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(truncate_to_width("groceries", 20), "groceries");
    }

    #[test]
    fn test_long_text_gets_ellipsis() {
        let out = truncate_to_width("abcdefghij", 5);
        assert_eq!(out, "abcd…");
        assert_eq!(out.width(), 5);
    }

    #[test]
    fn test_wide_chars_count_double() {
        let out = truncate_to_width("日本語のメモ", 5);
        assert_eq!(out, "日本…");
    }

    #[test]
    fn test_future_dates_read_as_now() {
        let later = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(format_time_ago(later), "now");
    }
}
