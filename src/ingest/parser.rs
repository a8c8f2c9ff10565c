// src/ingest/parser.rs
//! Tolerant RSS 2.0 / Atom extraction. Feeds are semi-trusted and
//! occasionally malformed; a parse failure yields zero items for that
//! source only, never a failed cycle.

use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::error::{PipelineError, Result};
use crate::ingest::normalize_text;

/// One structured feed item. `link` is the canonical dedup key downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: Option<String>,
    pub description: String,
    pub published_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<String>,
    content: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

pub(crate) fn parse_rfc2822_to_unix(ts: &str) -> Option<i64> {
    if let Ok(dt) = OffsetDateTime::parse(ts, &Rfc2822) {
        return Some(dt.to_offset(UtcOffset::UTC).unix_timestamp());
    }
    // Feeds in the wild use obsolete zone names ("GMT", "EST") that strict
    // RFC 2822 parsing may reject.
    chrono::DateTime::parse_from_rfc2822(ts)
        .ok()
        .map(|dt| dt.timestamp())
}

pub(crate) fn parse_rfc3339_to_unix(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts, &Rfc3339)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
}

fn is_atom(raw: &str) -> bool {
    raw.contains("http://www.w3.org/2005/Atom") || raw.contains("<feed")
}

/// Parse a raw feed payload into structured items. Format is detected from
/// the Atom marker; anything else is treated as RSS 2.0. Items lacking both
/// a title and a link are discarded.
pub fn parse_feed(raw: &str, source_name: &str) -> Result<Vec<FeedItem>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(raw);

    let items = if is_atom(&xml_clean) {
        parse_atom(&xml_clean, source_name)?
    } else {
        parse_rss(&xml_clean, source_name)?
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("news_parse_ms").record(ms);
    counter!("news_items_parsed_total").increment(items.len() as u64);
    Ok(items)
}

fn parse_rss(xml: &str, source_name: &str) -> Result<Vec<FeedItem>> {
    let rss: Rss = from_str(xml).map_err(|e| PipelineError::Parse {
        source_name: source_name.to_string(),
        reason: e.to_string(),
    })?;

    let mut out = Vec::with_capacity(rss.channel.items.len());
    for it in rss.channel.items {
        let title = normalize_text(it.title.as_deref().unwrap_or_default());
        let link = clean_link(it.link.as_deref());
        if title.is_empty() && link.is_none() {
            continue;
        }
        out.push(FeedItem {
            title,
            link,
            description: normalize_text(it.description.as_deref().unwrap_or_default()),
            published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
        });
    }
    Ok(out)
}

fn parse_atom(xml: &str, source_name: &str) -> Result<Vec<FeedItem>> {
    let feed: AtomFeed = from_str(xml).map_err(|e| PipelineError::Parse {
        source_name: source_name.to_string(),
        reason: e.to_string(),
    })?;

    let mut out = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let title = normalize_text(entry.title.as_deref().unwrap_or_default());
        let link = pick_atom_link(&entry.links);
        if title.is_empty() && link.is_none() {
            continue;
        }
        let body = entry
            .content
            .as_deref()
            .or(entry.summary.as_deref())
            .unwrap_or_default();
        let published = entry
            .published
            .as_deref()
            .or(entry.updated.as_deref())
            .and_then(parse_rfc3339_to_unix);
        out.push(FeedItem {
            title,
            link,
            description: normalize_text(body),
            published_at: published,
        });
    }
    Ok(out)
}

/// Atom entries may carry several links; prefer rel="alternate" (or an
/// unqualified rel), fall back to the first href present.
fn pick_atom_link(links: &[AtomLink]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .and_then(|l| l.href.as_deref())
        .or_else(|| links.iter().find_map(|l| l.href.as_deref()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn clean_link(link: Option<&str>) -> Option<String> {
    link.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Feeds in the wild embed HTML entities that are not valid XML without a
/// DTD; swap the common ones before handing the payload to quick-xml.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
