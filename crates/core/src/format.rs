//! Business formatting for report text.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::fitting::char_len;

/// Sentence boundaries in project descriptions.
static SENTENCE_SPLIT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\. |\n").unwrap());

/// Display format of every date in the report.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

const MAX_SENTENCES: usize = 3;
const MIN_SENTENCE_CHARS: usize = 5;
const MAX_SENTENCE_CHARS: usize = 60;

/// Format an ISO-8601 date or date-time as `dd/mm/yyyy`.
///
/// Empty input yields `today`; input that does not parse is returned as is.
pub fn format_date(raw: &str, today: NaiveDate) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return today.format(DATE_FORMAT).to_string();
    }
    parse_date(raw)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Integer amount with `,` thousands separators and a euro suffix.
pub fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{}{} €", sign, grouped)
}

/// Progress percentage without a trailing `.0`.
pub fn format_progress(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Up to three readable sentences of a description.
pub fn split_sentences(description: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for sentence in SENTENCE_SPLIT_REGEX.split(description) {
        let sentence = sentence.trim();
        if char_len(sentence) <= MIN_SENTENCE_CHARS {
            continue;
        }
        let sentence = if char_len(sentence) > MAX_SENTENCE_CHARS {
            let head: String = sentence.chars().take(MAX_SENTENCE_CHARS - 3).collect();
            format!("{}...", head)
        } else {
            sentence.to_string()
        };
        sentences.push(sentence);
        if sentences.len() >= MAX_SENTENCES {
            break;
        }
    }
    sentences
}

/// `in_progress` → `In Progress`.
pub fn humanize_status(status: &str) -> String {
    status
        .replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First word of an owner's name, `-` when unknown.
pub fn owner_short(name: Option<&str>) -> String {
    name.and_then(|n| n.split_whitespace().next())
        .unwrap_or("-")
        .to_string()
}

/// French label of a mood code; unknown codes are shown as is.
pub fn mood_label(mood: &str) -> &str {
    match mood {
        "good" => "Tout va bien",
        "issues" => "Quelques problèmes",
        "complicated" => "C'est compliqué",
        "blocked" => "Bloqué",
        other => other,
    }
}

pub fn mood_color(mood: &str) -> Option<&'static str> {
    match mood {
        "good" => Some("03E26B"),
        "issues" => Some("FFD43B"),
        "complicated" => Some("FF922B"),
        "blocked" => Some("FF0A55"),
        _ => None,
    }
}

pub fn status_color(status: &str) -> Option<&'static str> {
    match status {
        "in_progress" | "ongoing_sourcing" => Some("0099FF"),
        "finished" => Some("03E26B"),
        "backlog" => Some("999999"),
        "ideation" => Some("BB99FF"),
        "solution_chosen" => Some("00CCCC"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-01-15", today()), "15/01/2024");
        assert_eq!(format_date("2024-01-15T10:30:00Z", today()), "15/01/2024");
        assert_eq!(format_date("2024-01-15T10:30:00.123+02:00", today()), "15/01/2024");
        assert_eq!(format_date("2024-01-15T10:30:00", today()), "15/01/2024");
        assert_eq!(format_date("", today()), "07/03/2025");
        assert_eq!(format_date("next spring", today()), "next spring");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1234567.4), "1,234,567 €");
        assert_eq!(format_amount(999.0), "999 €");
        assert_eq!(format_amount(1000.0), "1,000 €");
        assert_eq!(format_amount(0.0), "0 €");
        assert_eq!(format_amount(-25000.0), "-25,000 €");
    }

    #[test]
    fn test_format_progress() {
        assert_eq!(format_progress(40.0), "40");
        assert_eq!(format_progress(42.5), "42.5");
    }

    #[test]
    fn test_split_sentences() {
        let desc = "Replace the legacy ERP. Cut costs.\nImprove reporting for every regional subsidiary of the group worldwide. Ok. Fourth sentence here.";
        let sentences = split_sentences(desc);
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "Replace the legacy ERP");
        assert_eq!(sentences[1], "Cut costs.");
        assert_eq!(char_len(&sentences[2]), 60);
        assert!(sentences[2].ends_with("..."));
        assert!(split_sentences("Tiny. Ok.").is_empty());
    }

    #[test]
    fn test_humanize_status() {
        assert_eq!(humanize_status("in_progress"), "In Progress");
        assert_eq!(humanize_status("FINISHED"), "Finished");
    }

    #[test]
    fn test_owner_short_and_labels() {
        assert_eq!(owner_short(Some("Ada Lovelace")), "Ada");
        assert_eq!(owner_short(None), "-");
        assert_eq!(mood_label("good"), "Tout va bien");
        assert_eq!(mood_label("unknown"), "unknown");
        assert_eq!(mood_color("blocked"), Some("FF0A55"));
        assert_eq!(status_color("ongoing_sourcing"), Some("0099FF"));
        assert_eq!(status_color("unknown"), None);
    }
}
