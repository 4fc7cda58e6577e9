use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Opening or closing tag, including one left unterminated at the end of the text.
    static ref TAG_RE: Regex = Regex::new(r"</?[^>]+(>|$)").expect("valid regex");
}

/// Default character budget for histogram chips.
pub const CHIP_LIMIT: usize = 35;

pub fn strip_tags(text: &str) -> String { TAG_RE.replace_all(text, "").into_owned() }

/// Shorten text to whole words within `limit` characters (spaces not counted).
/// The word that overflows is kept with a trailing "..."; a single oversized first
/// word is cut at `limit`. Markup is stripped from the result.
pub fn compact_text(text: &str, limit: usize) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut chars = 0usize;
    for word in text.split(' ') {
        if word.is_empty() { continue; }
        let len = word.chars().count();
        if chars + len > limit {
            if out.is_empty() {
                out.push(format!("{}...", word.chars().take(limit).collect::<String>()));
            } else {
                out.push(format!("{word}..."));
            }
            break;
        }
        chars += len;
        out.push(word.to_string());
    }
    strip_tags(&out.join(" "))
}
