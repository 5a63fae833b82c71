// src/watch/feed.rs
//! Namespace-agnostic Atom/RSS parsing.
//!
//! The parser walks `quick_xml` events and matches element *local* names,
//! so bare and namespaced documents parse identically; nothing assumes a
//! particular namespace URI up front. Atom is detected by `entry` elements
//! directly under the root, RSS by `item` elements under `channel`.

use anyhow::{anyhow, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::knowledge::UpdateRecord;
use crate::normalize::clean_version;
use crate::watch::{clip_text, strip_tags, SUMMARY_CAP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Atom,
    Rss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Date,
    Body,
    BodyFallback,
    Link,
}

#[derive(Default)]
struct RawEntry {
    title: Option<String>,
    date: Option<String>,
    body: Option<String>,
    body_fallback: Option<String>,
    link: Option<String>,
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().local_name().as_ref()).into_owned()
}

fn href_attr(start: &BytesStart<'_>) -> Option<String> {
    for attr in start.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"href" {
            return attr.unescape_value().ok().map(|v| v.into_owned());
        }
    }
    None
}

/// Parse an Atom or RSS document into partial update records, preserving
/// document order and stopping after `max_items` entries. Errors only on
/// malformed XML or an unrecognized root; missing per-entry fields degrade
/// to sentinel values instead of failing the entry.
pub fn parse_feed(xml: &str, max_items: usize) -> Result<Vec<UpdateRecord>> {
    let mut reader = Reader::from_str(xml);

    let mut kind: Option<FeedKind> = None;
    let mut depth = 0usize;
    let mut in_channel = false;
    let mut entry_depth: Option<usize> = None;
    let mut capture: Option<(Field, usize)> = None;
    let mut text_buf = String::new();
    let mut cur = RawEntry::default();
    let mut out = Vec::new();

    loop {
        match reader.read_event().context("reading feed xml")? {
            Event::Eof => break,
            Event::Start(e) => {
                depth += 1;
                let name = local_name(&e);

                let Some(k) = kind else {
                    kind = match name.as_str() {
                        "feed" => Some(FeedKind::Atom),
                        "rss" => Some(FeedKind::Rss),
                        other => return Err(anyhow!("unrecognized feed root <{other}>")),
                    };
                    continue;
                };

                match k {
                    FeedKind::Atom => {
                        if name == "entry" && depth == 2 {
                            entry_depth = Some(depth);
                            cur = RawEntry::default();
                        } else if let Some(ed) = entry_depth {
                            if capture.is_none() && depth == ed + 1 {
                                let field = match name.as_str() {
                                    "title" => Some(Field::Title),
                                    "updated" => Some(Field::Date),
                                    "content" => Some(Field::Body),
                                    "summary" => Some(Field::BodyFallback),
                                    "link" => {
                                        if cur.link.is_none() {
                                            cur.link = href_attr(&e);
                                        }
                                        None
                                    }
                                    _ => None,
                                };
                                if let Some(f) = field {
                                    capture = Some((f, depth));
                                    text_buf.clear();
                                }
                            }
                        }
                    }
                    FeedKind::Rss => {
                        if name == "channel" && depth == 2 {
                            in_channel = true;
                        } else if name == "item" && in_channel && entry_depth.is_none() {
                            entry_depth = Some(depth);
                            cur = RawEntry::default();
                        } else if let Some(ed) = entry_depth {
                            if capture.is_none() && depth == ed + 1 {
                                let field = match name.as_str() {
                                    "title" => Some(Field::Title),
                                    "pubDate" => Some(Field::Date),
                                    "description" => Some(Field::Body),
                                    "link" => Some(Field::Link),
                                    _ => None,
                                };
                                if let Some(f) = field {
                                    capture = Some((f, depth));
                                    text_buf.clear();
                                }
                            }
                        }
                    }
                }
            }
            Event::Empty(e) => {
                // Atom links are usually self-closing: <link href="..."/>
                if kind == Some(FeedKind::Atom)
                    && entry_depth.is_some()
                    && local_name(&e) == "link"
                    && cur.link.is_none()
                {
                    cur.link = href_attr(&e);
                }
            }
            Event::Text(t) => {
                if capture.is_some() {
                    match t.unescape() {
                        Ok(s) => text_buf.push_str(&s),
                        Err(_) => text_buf.push_str(&String::from_utf8_lossy(t.as_ref())),
                    }
                }
            }
            Event::CData(t) => {
                if capture.is_some() {
                    text_buf.push_str(&String::from_utf8_lossy(t.as_ref()));
                }
            }
            Event::End(_) => {
                if let Some((field, d)) = capture {
                    if depth == d {
                        let value = text_buf.trim().to_string();
                        if !value.is_empty() {
                            match field {
                                Field::Title => cur.title = Some(value),
                                Field::Date => cur.date = Some(value),
                                Field::Body => cur.body = Some(value),
                                Field::BodyFallback => cur.body_fallback = Some(value),
                                Field::Link => cur.link = Some(value),
                            }
                        }
                        capture = None;
                    }
                }
                if entry_depth == Some(depth) {
                    entry_depth = None;
                    if out.len() < max_items {
                        out.push(finish_entry(std::mem::take(&mut cur)));
                    }
                    if out.len() >= max_items {
                        break;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    Ok(out)
}

fn finish_entry(cur: RawEntry) -> UpdateRecord {
    let raw_body = cur.body.or(cur.body_fallback).unwrap_or_default();
    let summary = clip_text(strip_tags(&raw_body).trim(), SUMMARY_CAP);

    // PyPI-style titles ("package==1.2.3") carry a parseable version; other
    // feeds get the sentinel.
    let version = cur
        .title
        .as_deref()
        .filter(|t| t.contains("=="))
        .and_then(|t| t.split_whitespace().last())
        .map(clean_version);

    UpdateRecord::from_feed(
        cur.title,
        cur.date,
        summary,
        cur.link.unwrap_or_default(),
        version,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
    <feed xmlns="http://www.w3.org/2005/Atom">
      <title>Release notes</title>
      <entry>
        <title>Test Update 1</title>
        <updated>2026-02-06T12:00:00Z</updated>
        <link href="https://example.com/1" />
        <summary>Summary 1</summary>
      </entry>
      <entry>
        <title>Test Update 2</title>
        <updated>2026-02-05T12:00:00Z</updated>
        <link href="https://example.com/2" />
        <summary>Summary 2</summary>
      </entry>
    </feed>"#;

    #[test]
    fn atom_entries_preserve_document_order() {
        let out = parse_feed(ATOM, 10).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Test Update 1");
        assert_eq!(out[1].title, "Test Update 2");
        assert_eq!(out[0].source_url, "https://example.com/1");
        assert_eq!(out[0].date, "2026-02-06T12:00:00Z");
        assert_eq!(out[0].summary, "Summary 1");
    }

    #[test]
    fn bare_and_namespaced_atom_parse_identically() {
        let bare = ATOM.replace(r#" xmlns="http://www.w3.org/2005/Atom""#, "");
        let a = parse_feed(ATOM, 10).unwrap();
        let b = parse_feed(&bare, 10).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn max_items_caps_extraction() {
        let out = parse_feed(ATOM, 1).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn zero_max_items_yields_nothing() {
        // Must agree with the html path, which also returns no records
        // for a zero cap.
        let out = parse_feed(ATOM, 0).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn rss_items_parse_under_channel() {
        let rss = r#"<?xml version="1.0"?>
        <rss version="2.0">
          <channel>
            <title>Vendor blog</title>
            <item>
              <title>Gemini 2.0 launched</title>
              <pubDate>Fri, 06 Feb 2026 12:00:00 GMT</pubDate>
              <link>https://example.com/gemini</link>
              <description>&lt;p&gt;Bigger context window.&lt;/p&gt;</description>
            </item>
            <item>
              <title>Maintenance notice</title>
            </item>
          </channel>
        </rss>"#;
        let out = parse_feed(rss, 10).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Gemini 2.0 launched");
        assert_eq!(out[0].source_url, "https://example.com/gemini");
        // embedded markup is stripped from the description
        assert_eq!(out[0].summary, "Bigger context window.");
        // missing optional fields degrade, not fail
        assert_eq!(out[1].date, crate::knowledge::NO_DATE);
        assert_eq!(out[1].source_url, "");
    }

    #[test]
    fn long_bodies_are_capped_with_marker() {
        let body = "x".repeat(900);
        let atom = format!(
            "<feed><entry><title>Big</title><summary>{body}</summary></entry></feed>"
        );
        let out = parse_feed(&atom, 10).unwrap();
        assert_eq!(out[0].summary.chars().count(), SUMMARY_CAP + 3);
        assert!(out[0].summary.ends_with("..."));
    }

    #[test]
    fn pypi_style_title_yields_version() {
        let atom = "<feed><entry><title>google-adk==1.5.0</title></entry></feed>";
        let out = parse_feed(atom, 10).unwrap();
        assert_eq!(out[0].version, "1.5.0");

        let plain = "<feed><entry><title>Release 1.24.0 shipped</title></entry></feed>";
        let out = parse_feed(plain, 10).unwrap();
        assert_eq!(out[0].version, crate::knowledge::NO_VERSION);
    }

    #[test]
    fn non_feed_root_is_an_error() {
        assert!(parse_feed("<html><body>nope</body></html>", 10).is_err());
    }
}
