//! Response normalizer: Atom feeds and HTML listings to [`PaperRecord`]s.
//!
//! The surfaces answer either with an Atom document (legacy feed) or with an
//! HTML page of paper containers. The format is inferred from the body. Field
//! derivation rules that differ between surfaces are selected by [`Surface`].
//!
//! Failures are contained: a container that cannot be read becomes an error
//! record in place, and a document that cannot be read at all becomes a
//! single error record.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use crate::models::{PaperCore, PaperRecord, PreprintRecord, Surface, VenueRecord};
use crate::sources::links::extract_pdf_link;
use crate::sources::SourceError;

/// Structure detected in a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Atom,
    Html,
    Empty,
    Unknown,
}

/// Infer the format from the document's root element.
///
/// A root whose local name is `feed` (prefixed or not, after any prolog,
/// comments or processing instructions) is Atom. Anything else that looks
/// like markup is treated as an HTML listing.
pub fn detect_format(body: &str) -> DocumentFormat {
    let head = body.trim_start_matches('\u{feff}').trim_start();
    if head.is_empty() {
        return DocumentFormat::Empty;
    }
    if !head.starts_with('<') {
        return DocumentFormat::Unknown;
    }

    match root_is_feed(head) {
        Some(true) => DocumentFormat::Atom,
        _ => DocumentFormat::Html,
    }
}

/// `Some(is_feed)` for the first element, `None` if no element could be read
fn root_is_feed(body: &str) -> Option<bool> {
    let mut reader = Reader::from_str(body);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(e.local_name().as_ref() == b"feed");
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Normalize a response body into records, in document order.
///
/// Never fails: an unreadable document yields one error record, an empty
/// body yields no records.
pub fn normalize(body: &str, surface: Surface) -> Vec<PaperRecord> {
    match detect_format(body) {
        DocumentFormat::Empty => Vec::new(),
        DocumentFormat::Atom => match parse_atom(body, surface) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Failed to parse {} feed: {}", surface, e);
                vec![PaperRecord::error(format!("Failed to parse feed: {}", e))]
            }
        },
        DocumentFormat::Html => parse_html(body, surface),
        DocumentFormat::Unknown => {
            tracing::warn!("Unrecognized {} response body", surface);
            vec![PaperRecord::error(
                "Failed to parse response: body is neither an Atom feed nor an HTML page",
            )]
        }
    }
}

// ===== Atom =====

#[derive(Debug, Default)]
struct AtomEntry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    updated: Option<String>,
    author: Option<String>,
    pdf_url: Option<String>,
}

impl AtomEntry {
    fn into_record(self, surface: Surface) -> PaperRecord {
        let core = PaperCore {
            identifier: self.id,
            title: self.title,
            author: self.author,
            summary: self.summary,
            pdf_url: self.pdf_url,
        };

        match surface {
            Surface::Preprint => PaperRecord::Preprint(PreprintRecord {
                core,
                published: self.updated,
            }),
            Surface::Venue => PaperRecord::Venue(VenueRecord {
                core,
                updated: self.updated,
                ..Default::default()
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtomField {
    Id,
    Title,
    Summary,
    Updated,
    AuthorName,
}

impl AtomField {
    fn from_tag(tag: &[u8], in_author: bool) -> Option<Self> {
        match (tag, in_author) {
            (b"name", true) => Some(AtomField::AuthorName),
            (_, true) => None,
            (b"id", false) => Some(AtomField::Id),
            (b"title", false) => Some(AtomField::Title),
            (b"summary", false) => Some(AtomField::Summary),
            (b"updated", false) => Some(AtomField::Updated),
            _ => None,
        }
    }

    fn tag(&self) -> &'static [u8] {
        match self {
            AtomField::Id => b"id",
            AtomField::Title => b"title",
            AtomField::Summary => b"summary",
            AtomField::Updated => b"updated",
            AtomField::AuthorName => b"name",
        }
    }
}

fn get_attr(e: &BytesStart<'_>, attr_name: &str) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == attr_name.as_bytes())
        .and_then(|a| {
            std::str::from_utf8(a.value.as_ref())
                .ok()
                .map(|s| s.to_string())
        })
}

/// `<link type="application/pdf" href="...">`
fn pdf_link_from(e: &BytesStart<'_>) -> Option<String> {
    if e.local_name().as_ref() != b"link" {
        return None;
    }
    match get_attr(e, "type").as_deref() {
        Some("application/pdf") => get_attr(e, "href"),
        _ => None,
    }
}

/// Parse an Atom document. Sub-elements are matched by exact local name; a
/// missing one leaves the field empty. Only the first author is kept.
pub fn parse_atom(body: &str, surface: Surface) -> Result<Vec<PaperRecord>, SourceError> {
    let mut reader = Reader::from_str(body);

    let mut records = Vec::new();
    let mut entry: Option<AtomEntry> = None;
    let mut field: Option<AtomField> = None;
    let mut in_author = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"entry" => {
                        entry = Some(AtomEntry::default());
                        field = None;
                        in_author = false;
                    }
                    b"author" if entry.is_some() => in_author = true,
                    tag => {
                        if let Some(current) = entry.as_mut() {
                            if field.is_none() {
                                field = AtomField::from_tag(tag, in_author);
                                text.clear();
                            }
                            if current.pdf_url.is_none() {
                                current.pdf_url = pdf_link_from(&e);
                            }
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(current) = entry.as_mut() {
                    if current.pdf_url.is_none() {
                        current.pdf_url = pdf_link_from(&e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| SourceError::Parse(format!("XML text: {}", e)))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(c)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                let tag = name.as_ref();

                if tag == b"entry" {
                    if let Some(done) = entry.take() {
                        records.push(done.into_record(surface));
                    }
                    field = None;
                    in_author = false;
                } else if tag == b"author" {
                    in_author = false;
                } else if let (Some(f), Some(current)) = (field, entry.as_mut()) {
                    if f.tag() == tag {
                        let value = text.trim();
                        let value = (!value.is_empty()).then(|| value.to_string());
                        let slot = match f {
                            AtomField::Id => &mut current.id,
                            AtomField::Title => &mut current.title,
                            AtomField::Summary => &mut current.summary,
                            AtomField::Updated => &mut current.updated,
                            AtomField::AuthorName => &mut current.author,
                        };
                        if slot.is_none() {
                            *slot = value;
                        }
                        field = None;
                        text.clear();
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SourceError::Parse(format!(
                    "XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if entry.is_some() {
        return Err(SourceError::Parse(
            "document ended inside an <entry>".to_string(),
        ));
    }

    Ok(records)
}

// ===== HTML =====

struct ListingSelectors {
    container: Selector,
    title: Selector,
    pdf: Selector,
    author_links: Selector,
    authors: Selector,
    summary: Selector,
    date: Selector,
    subject_links: Selector,
    subjects: Selector,
}

impl ListingSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            container: Selector::parse("div.paper").ok()?,
            title: Selector::parse("a.title-link, h2.title > a").ok()?,
            pdf: Selector::parse("a.title-pdf, a.pdf-link").ok()?,
            author_links: Selector::parse("p.authors a.author").ok()?,
            authors: Selector::parse("p.authors").ok()?,
            summary: Selector::parse("p.summary").ok()?,
            date: Selector::parse("p.date").ok()?,
            subject_links: Selector::parse("p.subjects a").ok()?,
            subjects: Selector::parse("p.subjects").ok()?,
        })
    }
}

fn year_pattern() -> Option<&'static Regex> {
    static YEAR: OnceLock<Option<Regex>> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"\.(\d{4})\b").ok()).as_ref()
}

/// Text content with whitespace runs collapsed
fn element_text(elem: &ElementRef<'_>) -> String {
    elem.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop a leading `Label:` if present
fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    let text = text.trim();
    match text.strip_prefix(label) {
        Some(rest) => rest.trim_start().trim_start_matches(':').trim(),
        None => text,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// First four-digit year following a dot in any subject tag (`NeurIPS.2023`)
pub fn year_from_subjects(subjects: &[String]) -> Option<i32> {
    let pattern = year_pattern()?;
    subjects
        .iter()
        .find_map(|s| pattern.captures(s))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn first_author(container: &ElementRef<'_>, sel: &ListingSelectors) -> Option<String> {
    if let Some(link) = container.select(&sel.author_links).next() {
        return non_empty(&element_text(&link));
    }

    let block = container.select(&sel.authors).next()?;
    let text = element_text(&block);
    strip_label(&text, "Authors")
        .split(',')
        .next()
        .and_then(non_empty)
}

fn pdf_url(container: &ElementRef<'_>, sel: &ListingSelectors) -> Option<String> {
    let anchor = container.select(&sel.pdf).next()?;
    let attrs = anchor.value();
    attrs
        .attr("onclick")
        .and_then(extract_pdf_link)
        .or_else(|| attrs.attr("href").and_then(extract_pdf_link))
}

fn subjects(container: &ElementRef<'_>, sel: &ListingSelectors) -> Vec<String> {
    let linked: Vec<String> = container
        .select(&sel.subject_links)
        .filter_map(|a| non_empty(&element_text(&a)))
        .collect();
    if !linked.is_empty() {
        return linked;
    }

    container
        .select(&sel.subjects)
        .next()
        .map(|p| {
            let text = element_text(&p);
            strip_label(&text, "Subjects")
                .split(',')
                .filter_map(non_empty)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_container(
    container: &ElementRef<'_>,
    surface: Surface,
    sel: &ListingSelectors,
) -> Result<PaperRecord, String> {
    let title = container
        .select(&sel.title)
        .next()
        .and_then(|a| non_empty(&element_text(&a)))
        .ok_or_else(|| "missing title link".to_string())?;

    let core = PaperCore {
        identifier: None,
        title: Some(title),
        author: first_author(container, sel),
        summary: container
            .select(&sel.summary)
            .next()
            .and_then(|p| non_empty(&element_text(&p))),
        pdf_url: pdf_url(container, sel),
    };

    Ok(match surface {
        Surface::Preprint => PaperRecord::Preprint(PreprintRecord {
            core,
            published: container
                .select(&sel.date)
                .next()
                .and_then(|p| non_empty(strip_label(&element_text(&p), "Publish"))),
        }),
        Surface::Venue => {
            let subjects = subjects(container, sel);
            PaperRecord::Venue(VenueRecord {
                core,
                year: year_from_subjects(&subjects),
                subjects,
                updated: None,
            })
        }
    })
}

/// Parse an HTML listing. Each paper container is read independently; one
/// that cannot be read becomes an error record at its position.
pub fn parse_html(body: &str, surface: Surface) -> Vec<PaperRecord> {
    let Some(sel) = ListingSelectors::new() else {
        return vec![PaperRecord::error("Failed to parse listing: invalid selector")];
    };

    let document = Html::parse_document(body);
    document
        .select(&sel.container)
        .enumerate()
        .map(|(index, container)| {
            parse_container(&container, surface, &sel).unwrap_or_else(|reason| {
                tracing::warn!("Skipping {} entry {}: {}", surface, index, reason);
                PaperRecord::error(format!("Failed to parse entry {}: {}", index, reason))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Cool Papers</title>
  <updated>2024-06-01T00:00:00Z</updated>
  <entry>
    <id>https://papers.cool/arxiv/2401.00001</id>
    <title>First &amp; Foremost</title>
    <summary>An abstract.</summary>
    <updated>2024-01-02T03:04:05Z</updated>
    <author><name>Ada Lovelace</name></author>
    <author><name>Charles Babbage</name></author>
  </entry>
  <entry>
    <id>https://papers.cool/arxiv/2401.00002</id>
    <title>No Summary Here</title>
    <link rel="related" type="application/pdf" href="https://arxiv.org/pdf/2401.00002"/>
  </entry>
</feed>"#;

    const HTML: &str = r#"<!DOCTYPE html>
<html><body>
<div id="2401.12345" class="panel paper">
  <h2 class="title">
    <a class="title-link notranslate" href="/arxiv/2401.12345">Sparse   Attention
      Revisited</a>
    <a class="title-pdf" onclick="togglePdf('2401.12345', 'https://arxiv.org/pdf/2401.12345', this)">[PDF]</a>
  </h2>
  <p class="metainfo authors"><strong>Authors</strong>:
    <a class="author" href="/a/1">Grace Hopper</a>, <a class="author" href="/a/2">Alan Turing</a></p>
  <p class="summary">We revisit sparse attention.</p>
  <p class="metainfo subjects"><strong>Subjects</strong>: <a>NeurIPS.2023 - Poster</a>, <a>ICML.2022</a></p>
  <p class="metainfo date"><strong>Publish</strong>: <span>2024-01-22 18:59:56 UTC</span></p>
</div>
<div class="panel paper">
  <h2 class="title"><span>untitled</span></h2>
</div>
<div class="panel paper">
  <h2 class="title"><a class="title-link" href="/x">Plain Authors</a></h2>
  <p class="metainfo authors">Authors: Barbara Liskov, Leslie Lamport</p>
</div>
</body></html>"#;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(ATOM), DocumentFormat::Atom);
        assert_eq!(detect_format("<feed></feed>"), DocumentFormat::Atom);
        assert_eq!(detect_format(HTML), DocumentFormat::Html);
        assert_eq!(
            detect_format(r#"<?xml version="1.0"?><html><body/></html>"#),
            DocumentFormat::Html
        );
        assert_eq!(detect_format("<!doctype html><html></html>"), DocumentFormat::Html);
        assert_eq!(detect_format("   \n\t"), DocumentFormat::Empty);
        assert_eq!(detect_format("{\"json\": true}"), DocumentFormat::Unknown);
    }

    #[test]
    fn test_prefixed_atom_root() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<atom:feed xmlns:atom="http://www.w3.org/2005/Atom">
  <atom:entry>
    <atom:id>https://papers.cool/arxiv/2401.00003</atom:id>
    <atom:title>Prefixed Feed</atom:title>
    <atom:author><atom:name>Edsger Dijkstra</atom:name></atom:author>
  </atom:entry>
</atom:feed>"#;

        assert_eq!(detect_format(body), DocumentFormat::Atom);
        let records = normalize(body, Surface::Preprint);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title(), Some("Prefixed Feed"));
        assert_eq!(records[0].author(), Some("Edsger Dijkstra"));
    }

    #[test]
    fn test_atom_after_long_preamble() {
        let body = format!(
            r#"<?xml version="1.0"?>
<!-- {} -->
<?xml-stylesheet type="text/xsl" href="feed.xsl"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><id>urn:1</id><title>Late Root</title></entry>
</feed>"#,
            "generated by the listing service ".repeat(64)
        );

        assert_eq!(detect_format(&body), DocumentFormat::Atom);
        let records = normalize(&body, Surface::Venue);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title(), Some("Late Root"));
    }

    #[test]
    fn test_atom_entries() {
        let records = normalize(ATOM, Surface::Preprint);
        assert_eq!(records.len(), 2);

        let PaperRecord::Preprint(first) = &records[0] else {
            panic!("expected preprint record");
        };
        assert_eq!(
            first.core.identifier.as_deref(),
            Some("https://papers.cool/arxiv/2401.00001")
        );
        assert_eq!(first.core.title.as_deref(), Some("First & Foremost"));
        assert_eq!(first.core.author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(first.published.as_deref(), Some("2024-01-02T03:04:05Z"));

        let PaperRecord::Preprint(second) = &records[1] else {
            panic!("expected preprint record");
        };
        assert!(second.core.summary.is_none());
        assert!(second.core.author.is_none());
        assert!(second.published.is_none());
        assert_eq!(
            second.core.pdf_url.as_deref(),
            Some("https://arxiv.org/pdf/2401.00002")
        );
    }

    #[test]
    fn test_atom_venue_keeps_timestamp() {
        let records = normalize(ATOM, Surface::Venue);
        let PaperRecord::Venue(first) = &records[0] else {
            panic!("expected venue record");
        };
        assert_eq!(first.updated.as_deref(), Some("2024-01-02T03:04:05Z"));
        assert!(first.year.is_none());
    }

    #[test]
    fn test_malformed_xml_yields_single_error() {
        let broken = r#"<?xml version="1.0"?><feed><entry><title>x</entry></feed>"#;
        let records = normalize(broken, Surface::Preprint);
        assert_eq!(records.len(), 1);
        assert!(records[0].is_error());

        let truncated = r#"<feed><entry><title>x</title>"#;
        let records = normalize(truncated, Surface::Preprint);
        assert_eq!(records.len(), 1);
        assert!(records[0].is_error());
    }

    #[test]
    fn test_unrecognized_body_yields_single_error() {
        let records = normalize("Service temporarily unavailable", Surface::Venue);
        assert_eq!(records.len(), 1);
        assert!(records[0].error_message().is_some());
    }

    #[test]
    fn test_empty_body_yields_nothing() {
        assert!(normalize("", Surface::Preprint).is_empty());
        assert!(normalize("  \n ", Surface::Venue).is_empty());
    }

    #[test]
    fn test_html_preprint_containers() {
        let records = normalize(HTML, Surface::Preprint);
        assert_eq!(records.len(), 3);

        let PaperRecord::Preprint(first) = &records[0] else {
            panic!("expected preprint record");
        };
        assert!(first.core.identifier.is_none());
        assert_eq!(first.core.title.as_deref(), Some("Sparse Attention Revisited"));
        assert_eq!(first.core.author.as_deref(), Some("Grace Hopper"));
        assert_eq!(
            first.core.summary.as_deref(),
            Some("We revisit sparse attention.")
        );
        assert_eq!(
            first.core.pdf_url.as_deref(),
            Some("https://arxiv.org/pdf/2401.12345")
        );
        assert_eq!(first.published.as_deref(), Some("2024-01-22 18:59:56 UTC"));

        // container without a title degrades in place
        assert!(records[1].is_error());

        assert_eq!(records[2].author(), Some("Barbara Liskov"));
        assert!(records[2].pdf_url().is_none());
    }

    #[test]
    fn test_html_venue_year_from_subjects() {
        let records = normalize(HTML, Surface::Venue);
        let PaperRecord::Venue(first) = &records[0] else {
            panic!("expected venue record");
        };
        assert_eq!(first.subjects, vec!["NeurIPS.2023 - Poster", "ICML.2022"]);
        assert_eq!(first.year, Some(2023));
    }

    #[test]
    fn test_year_from_subjects() {
        let subjects = vec!["Computation and Language".to_string(), "ACL.2024".to_string()];
        assert_eq!(year_from_subjects(&subjects), Some(2024));
        assert_eq!(year_from_subjects(&["cs.CL".to_string()]), None);
        assert_eq!(year_from_subjects(&[]), None);
    }

    #[test]
    fn test_html_without_containers_is_empty() {
        let records = normalize("<html><body><p>No results</p></body></html>", Surface::Preprint);
        assert!(records.is_empty());
    }
}
