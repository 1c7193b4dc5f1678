//! Extraction of `data-dpt` annotations from transcription HTML
//!
//! Transcriptions mark clauses, places and people with spans such as
//! `<span data-dpt="person" data-dpt-type="name" data-dpt-ref="...">`.
//! The extractor walks the markup once, keeping a stack that mirrors the
//! open elements. Text is credited to the innermost annotated ancestor, so
//! nested formatting (`<i>`, `<b>`, ...) inside an annotation still counts.

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::debug;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// HTML elements that never have a closing tag
const VOID_ELEMENTS: &[&[u8]] = &[
    b"area", b"base", b"br", b"col", b"embed", b"hr", b"img", b"input", b"link", b"meta",
    b"source", b"track", b"wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnnotationKind {
    Clause,
    Place,
    Person,
}

impl AnnotationKind {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "clause" => Some(Self::Clause),
            "place" => Some(Self::Place),
            "person" => Some(Self::Person),
            _ => None,
        }
    }
}

/// A `data-dpt="clause"` span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// `data-dpt-type`, e.g. `address`
    pub clause_type: String,
    pub content: String,
}

/// A `data-dpt="place"` or `data-dpt="person"` span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub name: String,
    /// `data-dpt-type`, e.g. `name` or `region`
    pub mention_type: String,
    /// `data-dpt-ref`, usually an authority URI
    pub reference: String,
}

/// Everything found in one pass over a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMarkup {
    pub clauses: Vec<Clause>,
    pub places: Vec<Mention>,
    pub people: Vec<Mention>,
}

struct OpenAnnotation {
    kind: AnnotationKind,
    subtype: String,
    reference: String,
    text: String,
}

#[derive(Default)]
struct Extractor {
    stack: Vec<Option<OpenAnnotation>>,
    found: ExtractedMarkup,
}

impl Extractor {
    fn open(&mut self, element: &BytesStart<'_>) {
        let mut kind = None;
        let mut subtype = String::new();
        let mut reference = String::new();

        for attr in element.html_attributes().flatten() {
            let raw = String::from_utf8_lossy(&attr.value);
            let value = decode_html_entities(&raw);
            match attr.key.as_ref() {
                b"data-dpt" => kind = AnnotationKind::parse(value.trim()),
                b"data-dpt-type" => subtype = value.into_owned(),
                b"data-dpt-ref" => reference = value.into_owned(),
                _ => {}
            }
        }

        self.stack.push(kind.map(|kind| OpenAnnotation {
            kind,
            subtype,
            reference,
            text: String::new(),
        }));
    }

    fn close(&mut self) {
        let Some(Some(annotation)) = self.stack.pop() else {
            return;
        };
        let text = collapse_whitespace(&annotation.text);
        match annotation.kind {
            AnnotationKind::Clause => self.found.clauses.push(Clause {
                clause_type: annotation.subtype,
                content: text,
            }),
            AnnotationKind::Place if !text.is_empty() => self.found.places.push(Mention {
                name: text,
                mention_type: annotation.subtype,
                reference: annotation.reference,
            }),
            AnnotationKind::Person if !text.is_empty() => self.found.people.push(Mention {
                name: text,
                mention_type: annotation.subtype,
                reference: annotation.reference,
            }),
            _ => {}
        }
    }

    fn text(&mut self, data: &str) {
        if let Some(annotation) = self.stack.iter_mut().rev().find_map(Option::as_mut) {
            annotation.text.push_str(data);
        }
    }
}

/// Parse `html` once and return every clause, place and person span
pub fn extract_all(html: &str) -> ExtractedMarkup {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut extractor = Extractor::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if is_void(&e) {
                    continue;
                }
                extractor.open(&e);
            }
            Ok(Event::Empty(e)) => {
                extractor.open(&e);
                extractor.close();
            }
            Ok(Event::End(_)) => extractor.close(),
            Ok(Event::Text(e)) => {
                // Entities are decoded one by one; unknown ones stay literal
                let raw = String::from_utf8_lossy(&e);
                extractor.text(&decode_html_entities(&raw));
            }
            Ok(Event::CData(e)) => extractor.text(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(
                    position = reader.error_position(),
                    error = %e,
                    "Stopping markup extraction at malformed input"
                );
                break;
            }
            _ => {}
        }
    }

    extractor.found
}

/// Clauses in document order; empty clauses are kept
pub fn extract_clauses(html: &str) -> Vec<Clause> {
    extract_all(html).clauses
}

pub fn extract_places_detailed(html: &str) -> Vec<Mention> {
    extract_all(html).places
}

pub fn extract_people_detailed(html: &str) -> Vec<Mention> {
    extract_all(html).people
}

/// Distinct place names, first occurrence first
pub fn extract_places(html: &str) -> Vec<String> {
    unique_names(extract_all(html).places)
}

/// Distinct person names, first occurrence first
pub fn extract_people(html: &str) -> Vec<String> {
    unique_names(extract_all(html).people)
}

/// Plain text of `html` with tags removed and whitespace collapsed
pub fn strip_markup(html: &str) -> String {
    collapse_whitespace(&TAG.replace_all(html, " "))
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

pub(crate) fn unique_names(mentions: Vec<Mention>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(mentions.len());
    for mention in mentions {
        if !names.contains(&mention.name) {
            names.push(mention.name);
        }
    }
    names
}

fn is_void(element: &BytesStart<'_>) -> bool {
    let name = element.local_name();
    VOID_ELEMENTS
        .iter()
        .any(|void| name.as_ref().eq_ignore_ascii_case(void))
}
