//! Lenient value parsing for scraped text.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

const NOISE: &[&str] = &[",", " ", "円", "¥", "￦", "\t", "원"];

const TRUTHY: &[&str] = &[
    "true", "yes", "y", "はい", "예", "ok", "1", "on", "enable", "enabled", "active", "activated",
    "open", "opened", "unlock", "unlocked",
];

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn strip_noise(value: &str) -> String {
    NOISE
        .iter()
        .fold(value.to_string(), |acc, noise| acc.replace(noise, ""))
}

/// Price-like float; separators and currency marks are ignored, garbage and
/// non-finite values are 0.
pub fn parse_float(value: &str) -> f64 {
    strip_noise(value)
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

pub fn parse_number(value: &str) -> i64 {
    strip_noise(value).parse().unwrap_or(0)
}

pub fn parse_bool(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    TRUTHY.contains(&value.as_str())
}

pub fn parse_html(text: &str) -> Html {
    Html::parse_document(text)
}

/// Text of the first element matching `selector`, entities decoded and
/// whitespace collapsed. An invalid selector yields `None`.
pub fn select_text(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let element = doc.select(&selector).next()?;
    let text = clean_text(&element.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

pub fn clean_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    WHITESPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}
