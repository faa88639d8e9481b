// src/ingest/mod.rs
pub mod dates;
pub mod providers;
pub mod scheduler;
pub mod transport;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::Record;

/// Stands in for line breaks while tags are stripped. Contains NUL so it can
/// neither occur in real text nor be swallowed by the URL pattern.
const LINE_BREAK_TOKEN: &str = "\u{0}BR\u{0}";

fn re_breaks() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)\\n|\r\n|\n|<br\b[^>]*>").unwrap())
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z][^>]*>").unwrap())
}

fn re_urls() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"'\x00]+"#).unwrap())
}

/// Normalize a post body for display: keep line breaks, drop markup,
/// re-link bare URLs with `rel="nofollow"`.
///
/// The output is HTML-safe and a fixed point: normalizing it again yields the
/// same string.
pub fn normalize_text(s: &str) -> String {
    // 1) Protect line breaks from tag stripping
    let out = re_breaks().replace_all(s, LINE_BREAK_TOKEN);

    // 2) Strip tags, then decode entities to plain text
    let out = re_tags().replace_all(&out, "");
    let plain = html_escape::decode_html_entities(&out);

    // 3) Re-escape while wrapping URLs in anchors
    let linked = linkify(&plain);

    // 4) Restore line breaks
    linked.replace(LINE_BREAK_TOKEN, "<br>")
}

/// HTML text escaping, with backslashes as `&#92;` so a decoded backslash can
/// never form a break marker on a later pass.
fn encode(s: &str) -> String {
    html_escape::encode_text(s).replace('\\', "&#92;")
}

/// Escape `plain` as HTML text, turning every URL into an anchor.
fn linkify(plain: &str) -> String {
    let mut out = String::with_capacity(plain.len() + 32);
    let mut last = 0usize;

    for m in re_urls().find_iter(plain) {
        let url = trim_url_tail(m.as_str());
        if url.is_empty() {
            continue;
        }
        let end = m.start() + url.len();

        out.push_str(&encode(&plain[last..m.start()]));

        let href = if url.len() >= 4 && url[..4].eq_ignore_ascii_case("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        out.push_str("<a href=\"");
        out.push_str(
            &html_escape::encode_double_quoted_attribute(&href).replace('\\', "&#92;"),
        );
        out.push_str("\" class=\"linkified\" target=\"_blank\" rel=\"nofollow\">");
        out.push_str(&encode(url));
        out.push_str("</a>");

        last = end;
    }

    out.push_str(&encode(&plain[last..]));
    out
}

/// Sentence punctuation right after a URL belongs to the sentence.
/// A closing paren is kept only when it balances one inside the URL.
fn trim_url_tail(url: &str) -> &str {
    let mut s = url;
    loop {
        let Some(last) = s.chars().last() else {
            return s;
        };
        let drop = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            ')' => s.matches('(').count() < s.matches(')').count(),
            _ => false,
        };
        if !drop {
            return s;
        }
        s = &s[..s.len() - last.len_utf8()];
    }
}

/// Normalize the text of every record in place.
pub fn normalize_records(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .map(|mut r| {
            r.text = normalize_text(&r.text);
            r
        })
        .collect()
}
