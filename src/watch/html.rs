// src/watch/html.rs
//! Heuristic extraction for documentation pages with no machine feed.
//!
//! The page is treated as an unstructured stream of date-stamped sections:
//! every `Month DD, YYYY` match anchors a block running until the next
//! match. Documentation pages have no stable schema, so best-effort text
//! segmentation is the only viable strategy. Any dated text can be picked
//! up as an "update" (a copyright line next to a month name, say); that
//! false-positive trade-off is accepted and covered by tests, not patched
//! over with stricter guesses.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::knowledge::UpdateRecord;
use crate::watch::{clip_text, SUMMARY_CAP};

static RE_SECTION_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2})(?:st|nd|rd|th)?,\s+(\d{4})",
    )
    .unwrap()
});

static RE_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());
static RE_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());

/// Change-type labels that appear alone on the first line of a section and
/// belong with the line that follows them.
const CHANGE_LABELS: &[&str] = &["feature", "announcement", "changed", "fixed", "deprecated"];

fn month_number(name: &str) -> u32 {
    match name {
        "January" => 1,
        "February" => 2,
        "March" => 3,
        "April" => 4,
        "May" => 5,
        "June" => 6,
        "July" => 7,
        "August" => 8,
        "September" => 9,
        "October" => 10,
        "November" => 11,
        "December" => 12,
        _ => 0,
    }
}

/// Scan raw markup for date-stamped sections and turn each into a partial
/// update record. Stops once `max_items` sections have been produced.
pub fn parse_release_page(html: &str, page_url: &str, max_items: usize) -> Vec<UpdateRecord> {
    let matches: Vec<_> = RE_SECTION_DATE.captures_iter(html).collect();
    let mut out = Vec::new();

    for (i, caps) in matches.iter().enumerate() {
        if out.len() >= max_items {
            break;
        }
        let whole = caps.get(0).expect("capture 0 always present");
        let block_end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(html.len());
        let block = &html[whole.end()..block_end];

        let month = month_number(&caps[1]);
        let day: u32 = caps[2].parse().unwrap_or(1);
        let year: i32 = caps[3].parse().unwrap_or(1970);
        let date = format!("{year:04}-{month:02}-{day:02}");

        let lines = block_lines(block);
        let Some(first) = lines.first() else {
            continue;
        };

        let (title, rest) = match split_change_label(first) {
            // A bare change-type label belongs with the following line.
            Some(label) if lines.len() > 1 => {
                (format!("{label}: {}", lines[1]), &lines[2..])
            }
            _ => (first.clone(), &lines[1..]),
        };

        let summary = clip_text(rest.join(" ").trim(), SUMMARY_CAP);
        let anchor = format!("{}_{:02}_{}", &caps[1], day, year);

        out.push(UpdateRecord::from_feed(
            Some(title),
            Some(date),
            summary,
            format!("{page_url}#{anchor}"),
            None,
        ));
    }

    out
}

/// Strip script/style first, turn remaining tags into line breaks, then
/// collapse to trimmed non-empty lines.
fn block_lines(block: &str) -> Vec<String> {
    let no_script = RE_SCRIPT.replace_all(block, "");
    let no_style = RE_STYLE.replace_all(&no_script, "");
    let text = strip_tags_to_newlines(&no_style);
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

static RE_TAG_NL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());

fn strip_tags_to_newlines(s: &str) -> String {
    let replaced = RE_TAG_NL.replace_all(s, "\n");
    html_escape::decode_html_entities(&replaced).into_owned()
}

/// If the line is a bare change-type label ("Feature", "Fixed", ...),
/// return it with its original casing; otherwise `None`.
fn split_change_label(line: &str) -> Option<String> {
    let bare = line.trim_end_matches(':').trim();
    CHANGE_LABELS
        .iter()
        .any(|l| bare.eq_ignore_ascii_case(l))
        .then(|| bare.to_string())
}
