// tests/watch_fixtures.rs
// Fixture-driven extraction through the same dispatch path production
// uses: URL shape decides the parser, HTML is the fallback.

use field_pulse::watch::Fetcher;

const ATOM: &str = include_str!("fixtures/vertex_release_notes.atom");
const RSS: &str = include_str!("fixtures/gemini_blog.rss");
const HTML: &str = include_str!("fixtures/docs_release_notes.html");

#[test]
fn atom_fixture_extracts_in_document_order() {
    let f = Fetcher::new();
    let out = f.extract("https://cloud.example.com/feeds/vertex.atom", ATOM, 10);
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].title, "Agent Builder adds low-code flows");
    assert_eq!(out[1].title, "Claude 3.5 models available on Vertex");
    assert_eq!(
        out[0].source_url,
        "https://cloud.example.com/agent-builder/notes#feb-06"
    );
    // embedded markup stripped from the content body
    assert!(out[0].summary.contains("low-code flow authoring"));
    assert!(!out[0].summary.contains("<b>"));
}

#[test]
fn atom_fixture_honours_per_source_cap() {
    let f = Fetcher::new();
    let out = f.extract("https://cloud.example.com/feeds/vertex.atom", ATOM, 2);
    assert_eq!(out.len(), 2);
}

#[test]
fn rss_fixture_extracts_items_with_rfc2822_dates() {
    let f = Fetcher::new();
    let out = f.extract("https://blog.example.com/gemini/feed.rss", RSS, 10);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].title, "Gemini 2.0 Flash: longer context windows");
    assert_eq!(out[0].date, "Fri, 06 Feb 2026 10:00:00 GMT");
    let dt = out[0].canonical_date();
    assert_eq!(dt.to_rfc3339(), "2026-02-06T10:00:00+00:00");
    assert_eq!(
        out[0].source_url,
        "https://blog.example.com/gemini/context-windows"
    );
}

#[test]
fn html_fixture_segments_dated_sections() {
    let f = Fetcher::new();
    let page_url = "https://docs.example.com/release-notes";
    let out = f.extract(page_url, HTML, 10);
    assert_eq!(out.len(), 2);

    // Bare "Feature" label merges with the following line.
    assert_eq!(out[0].title, "Feature: Agent Development Kit 1.2");
    assert!(out[0].summary.contains("streaming tool calls"));
    assert_eq!(out[0].date, "2026-02-06");
    assert_eq!(out[0].source_url, format!("{page_url}#February_06_2026"));

    // Inline label stays part of the title line.
    assert_eq!(out[1].title, "Fixed: Token counting for cached prompts");
    assert_eq!(out[1].date, "2026-02-03");
}

#[test]
fn feed_url_with_html_body_falls_back_to_html() {
    let f = Fetcher::new();
    // Mislabelled source: feed extension, HTML payload. Parse fails, the
    // heuristic still recovers the dated sections.
    let out = f.extract("https://docs.example.com/notes.xml", HTML, 10);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].date, "2026-02-06");
}
