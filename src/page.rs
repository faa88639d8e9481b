// src/page.rs
//! Page data assembly, HTML rendering and the single-slot rendered-page cache.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::aggregate::Aggregate;
use crate::config::{AppConfig, SiteConfig, StatusConfig, StatusKind};
use crate::ingest::types::Record;

/// One source as shown on the page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamView {
    pub name: String,
    pub title: String,
    pub link: String,
    pub update_time: i64,
    pub content: Vec<Record>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub status: StatusKind,
    pub status_text: String,
    pub status_message: String,
    pub streams: Vec<StreamView>,
}

/// Turns an [`Aggregate`] into [`PageData`] using site and source metadata.
#[derive(Debug, Clone)]
pub struct PageBuilder {
    site: SiteConfig,
    status: StatusConfig,
    /// name -> (title, link)
    meta: HashMap<String, (String, String)>,
}

impl PageBuilder {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let meta = cfg
            .sources
            .iter()
            .map(|s| (s.name.clone(), (s.title.clone(), s.link.clone())))
            .collect();
        Self {
            site: cfg.site.clone(),
            status: cfg.status.clone(),
            meta,
        }
    }

    pub fn build(&self, aggregate: &Aggregate) -> PageData {
        let status = self.status.current;
        let mut rng = rand::rng();
        let status_message = self
            .status
            .messages
            .for_status(status)
            .choose(&mut rng)
            .cloned()
            .unwrap_or_default();
        let status_text = self
            .status
            .texts
            .for_status(status)
            .first()
            .cloned()
            .unwrap_or_default();

        let streams = aggregate
            .streams
            .iter()
            .map(|s| {
                let (title, link) = self
                    .meta
                    .get(&s.name)
                    .cloned()
                    .unwrap_or_else(|| (s.name.clone(), String::new()));
                StreamView {
                    name: s.name.clone(),
                    title,
                    link,
                    update_time: s.snapshot.update_time,
                    content: s.snapshot.data.clone(),
                }
            })
            .collect();

        PageData {
            title: self.site.title.clone(),
            description: self.site.description.clone(),
            keywords: self.site.keywords.clone(),
            status,
            status_text,
            status_message,
            streams,
        }
    }
}

fn format_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%d.%m.%Y %H:%M UTC").to_string())
        .unwrap_or_default()
}

fn head(out: &mut String, title: &str, description: &str, keywords: &str) {
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n\
         <meta name=\"description\" content=\"{}\">\n\
         <meta name=\"keywords\" content=\"{}\">\n\
         <link rel=\"stylesheet\" href=\"/css/style.css\">\n</head>\n",
        text(title),
        attr(description),
        attr(keywords)
    );
}

/// Render the full page. Record text is already normalized HTML and is
/// inserted as-is; every other string is escaped here.
pub fn render_page(page: &PageData) -> String {
    let mut out = String::with_capacity(16 * 1024);
    head(&mut out, &page.title, &page.description, &page.keywords);

    let _ = write!(
        out,
        "<body class=\"status-{}\">\n<header>\n<h1>{}</h1>\n\
         <div class=\"status\">{}</div>\n<p class=\"status-text\">{}</p>\n</header>\n<main>\n",
        page.status.as_str(),
        text(&page.title),
        text(&page.status_message),
        text(&page.status_text)
    );

    for s in &page.streams {
        let _ = write!(
            out,
            "<section class=\"stream stream-{}\">\n<h2><a href=\"{}\" rel=\"nofollow\" target=\"_blank\">{}</a></h2>\n\
             <p class=\"updated\">updated {}</p>\n<ul class=\"entries\">\n",
            attr(&s.name),
            attr(&s.link),
            text(&s.title),
            format_ms(s.update_time)
        );
        for r in &s.content {
            let _ = write!(
                out,
                "<li class=\"entry\">\n<div class=\"text\">{}</div>\n\
                 <footer><span class=\"author\">{}</span> \
                 <a class=\"date\" href=\"{}\" rel=\"nofollow\" target=\"_blank\">{}</a></footer>\n</li>\n",
                r.text,
                text(&r.author),
                attr(&r.url),
                format_ms(r.date)
            );
        }
        out.push_str("</ul>\n</section>\n");
    }

    out.push_str("</main>\n</body>\n</html>\n");
    out
}

/// Generic failure page shown when any source cannot be read.
pub fn render_error(site_title: &str) -> String {
    let mut out = String::with_capacity(1024);
    head(&mut out, site_title, "", "");
    let _ = write!(
        out,
        "<body class=\"error\">\n<h1>{}</h1>\n\
         <p>Sources are not reachable right now. Please try again in a few minutes.</p>\n\
         </body>\n</html>\n",
        text(site_title)
    );
    out
}

/// Process-wide single slot holding the last rendered page.
#[derive(Debug)]
pub struct PageCache {
    ttl: Duration,
    slot: Mutex<Option<(Instant, String)>>,
}

impl PageCache {
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached page if it is younger than the TTL.
    pub fn fresh(&self) -> Option<String> {
        let slot = self.slot.lock().expect("page cache mutex poisoned");
        match &*slot {
            Some((at, html)) if at.elapsed() < self.ttl => Some(html.clone()),
            _ => None,
        }
    }

    pub fn store(&self, html: String) {
        if self.ttl.is_zero() {
            return;
        }
        *self.slot.lock().expect("page cache mutex poisoned") = Some((Instant::now(), html));
    }

    pub fn clear(&self) {
        *self.slot.lock().expect("page cache mutex poisoned") = None;
    }
}
