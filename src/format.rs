// Display helpers shared by the built-in columns.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const MONTH: f64 = 30.0 * DAY;
const YEAR: f64 = 365.0 * DAY;

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// `%Y-%m-%d` for an epoch-milliseconds timestamp.
pub fn date(ms: i64) -> Option<String> {
    from_millis(ms).map(|d| d.format("%Y-%m-%d").to_string())
}

/// `%Y-%m-%d %H:%M:%S` for an epoch-milliseconds timestamp.
pub fn datetime(ms: i64) -> Option<String> {
    from_millis(ms).map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn trim_number(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

/// Human time span: "45 seconds", "2.5 minutes", "3 days", "1.2 years".
pub fn timespan(secs: f64) -> String {
    let abs = secs.abs();
    let (value, unit) = if abs < MINUTE {
        (secs, "second")
    } else if abs < HOUR {
        (secs / MINUTE, "minute")
    } else if abs < DAY {
        (secs / HOUR, "hour")
    } else if abs < MONTH {
        (secs / DAY, "day")
    } else if abs < YEAR {
        (secs / MONTH, "month")
    } else {
        (secs / YEAR, "year")
    };
    let n = trim_number(value);
    if n == "1" { format!("1 {}", unit) } else { format!("{} {}s", n, unit) }
}

/// Interval given in days.
pub fn interval_days(days: i64) -> String {
    if days == 0 { "0 days".to_string() } else { timespan(days as f64 * DAY) }
}

static SOUND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[sound:([^\]]+)\]").expect("static regex"));
static TYPE_ANSWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[type:[^\]]+\]\]").expect("static regex"));
static IMG: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']?([^"'>]+)["']?[^>]*>"#).expect("static regex"));
static STYLE_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style.*?>.*?</style>|<script.*?>.*?</script>|<!--.*?-->").expect("static regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<.*?>").expect("static regex"));
static ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("static regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("static regex"));

fn decode_entity(body: &str) -> Option<String> {
    let c = if let Some(hex) = body.strip_prefix("#x") {
        char::from_u32(u32::from_str_radix(hex, 16).ok()?)?
    } else if let Some(dec) = body.strip_prefix('#') {
        char::from_u32(dec.parse().ok()?)?
    } else {
        match body {
            "nbsp" => ' ',
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => return None,
        }
    };
    Some(c.to_string())
}

/// One-line plain text of a field: markup removed, sound and image file names
/// kept, type-answer markers dropped.
pub fn html_to_text_line(s: &str) -> String {
    let s = s.replace("<br>", " ").replace("<br />", " ").replace("<div>", " ").replace('\n', " ");
    let s = SOUND.replace_all(&s, "$1");
    let s = TYPE_ANSWER.replace_all(&s, "");
    let s = IMG.replace_all(&s, " $1 ");
    let s = STYLE_SCRIPT.replace_all(&s, "");
    let s = TAG.replace_all(&s, "");
    let s = ENTITY.replace_all(&s, |caps: &regex::Captures<'_>| decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string()));
    SPACES.replace_all(&s, " ").trim().to_string()
}

/// Whole text is one number: optional leading `-`, digits, at most one
/// fractional part. Dates, phone numbers and lone punctuation are not.
pub fn is_bare_number(s: &str) -> bool {
    BARE_NUMBER.is_match(s)
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod format_tests;
