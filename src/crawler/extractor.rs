//! Article extraction
//!
//! Turns a parsed article page into a [`Document`]: an uppercase title, an
//! optional overview and the allow-listed sections in the order their headings
//! first appear.
//!
//! The scan walks `h2`, `p` and `ul` elements in document order. Every `h2`
//! closes the section that is currently open and opens a new one; paragraphs
//! and list items are appended to the open section. Content seen before the
//! first `h2` belongs to no section and is dropped.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use thiserror::Error;

/// Section headings kept in a [`Document`], compared case-insensitively
pub const SECTION_ALLOW_LIST: &[&str] = &[
    "alternative names",
    "causes",
    "symptoms",
    "treatment",
    "exams and tests",
    "diagnosis",
    "prevention",
    "possible complications",
];

/// Prefix put in front of every rendered list item
pub const BULLET: &str = "    • ";

/// Errors that stop a page from becoming a [`Document`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("page has no <h1> title")]
    MissingTitle,

    #[error("invalid selector '{0}'")]
    Selector(String),
}

/// One allow-listed block of an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading text as it appears on the page
    pub header: String,

    /// Newline-joined body fragments
    pub body: String,
}

/// Ordered header -> body mapping with case-insensitive keys
///
/// Re-inserting a header keeps its first position and replaces the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    entries: Vec<Section>,
}

impl Sections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the body stored for `header`
    pub fn insert(&mut self, header: impl Into<String>, body: impl Into<String>) {
        let header = header.into();
        let body = body.into();

        match self
            .entries
            .iter_mut()
            .find(|section| section.header.eq_ignore_ascii_case(&header))
        {
            Some(existing) => existing.body = body,
            None => self.entries.push(Section { header, body }),
        }
    }

    /// Looks up a section body by header, ignoring case
    pub fn get(&self, header: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|section| section.header.eq_ignore_ascii_case(header))
            .map(|section| section.body.as_str())
    }

    pub fn contains(&self, header: &str) -> bool {
        self.get(header).is_some()
    }

    /// Lowercased headers in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|section| section.header.to_lowercase())
            .collect()
    }

    /// Drops every section whose header is not in [`SECTION_ALLOW_LIST`]
    pub fn retain_allowed(&mut self) {
        self.entries.retain(|section| is_allowed_header(&section.header));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A structured article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Uppercased `h1` text
    pub title: String,

    /// Text of the summary element, when the page has one
    pub overview: Option<String>,

    /// Allow-listed sections in first-seen order
    pub sections: Sections,
}

impl Document {
    /// Renders the document as a plain text block
    ///
    /// ```text
    /// TITLE
    ///
    /// OVERVIEW
    /// <overview>
    ///
    /// SYMPTOMS
    /// <body>
    /// ```
    pub fn render(&self) -> String {
        let mut lines = vec![self.title.clone(), String::new()];

        if let Some(overview) = &self.overview {
            lines.push("OVERVIEW".to_string());
            lines.push(overview.clone());
            lines.push(String::new());
        }

        for section in self.sections.iter() {
            lines.push(section.header.to_uppercase());
            lines.push(section.body.clone());
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

/// Returns true if `header` names an allow-listed section
pub fn is_allowed_header(header: &str) -> bool {
    let header = collapse_whitespace(header).to_lowercase();
    SECTION_ALLOW_LIST.contains(&header.as_str())
}

/// Section scanning state
enum SectionState {
    NoHeader,
    InSection {
        header: String,
        fragments: Vec<String>,
    },
}

impl SectionState {
    fn open(header: String) -> Self {
        Self::InSection {
            header,
            fragments: Vec::new(),
        }
    }

    fn push(&mut self, fragment: String) {
        if let Self::InSection { fragments, .. } = self {
            fragments.push(fragment);
        }
    }

    /// Commits the open section if its header is allow-listed
    fn close(self, sections: &mut Sections) {
        if let Self::InSection { header, fragments } = self {
            if is_allowed_header(&header) {
                sections.insert(header, fragments.join("\n"));
            }
        }
    }
}

/// Parses `html` and extracts a [`Document`] from it
pub fn extract_html(html: &str, summary_id: &str) -> Result<Document, ExtractError> {
    extract(&Html::parse_document(html), summary_id)
}

/// Extracts a [`Document`] from a parsed article page
///
/// # Arguments
///
/// * `page` - Parsed article HTML
/// * `summary_id` - `id` of the element holding the overview
///
/// # Returns
///
/// * `Ok(Document)` - Title, optional overview and the allow-listed sections
/// * `Err(ExtractError::MissingTitle)` - The page has no non-empty `h1`
///
/// # Example
///
/// ```
/// use ency_harvest::crawler::extract_html;
///
/// let html = r#"<h1>Flu</h1><h2>Symptoms</h2><p>Fever and chills.</p>"#;
/// let document = extract_html(html, "ency_summary").unwrap();
/// assert_eq!(document.title, "FLU");
/// assert_eq!(document.sections.get("symptoms"), Some("Fever and chills."));
/// ```
pub fn extract(page: &Html, summary_id: &str) -> Result<Document, ExtractError> {
    let title = extract_title(page)?;
    let overview = find_by_id(page, summary_id)
        .map(element_text)
        .filter(|text| !text.is_empty());

    let blocks = selector("h2, p, ul")?;
    let items = selector("li")?;

    let mut sections = Sections::new();
    let mut state = SectionState::NoHeader;

    for element in page.select(&blocks) {
        match element.value().name() {
            "h2" => {
                let heading = SectionState::open(element_text(element));
                std::mem::replace(&mut state, heading).close(&mut sections);
            }
            "ul" => {
                for item in element.select(&items) {
                    let text = element_text(item);
                    if !text.is_empty() {
                        state.push(format!("{}{}", BULLET, text));
                    }
                }
            }
            _ => {
                let text = normalize_text(&element_text(element));
                if !text.is_empty() {
                    state.push(text);
                }
            }
        }
    }

    // The last heading has no successor to close it
    state.close(&mut sections);
    sections.retain_allowed();

    Ok(Document {
        title,
        overview,
        sections,
    })
}

/// Cleans paragraph text and lays out inline lists as bullet lines
///
/// - Whitespace runs collapse to single spaces.
/// - Text containing "may include:" (any case) becomes the prefix followed by
///   one bullet per item, items starting wherever an uppercase run begins.
/// - Text starting with `•` or `-` is split on those markers, one bullet per piece.
///
/// ```
/// use ency_harvest::crawler::normalize_text;
///
/// assert_eq!(
///     normalize_text("Symptoms may include: Fever Cough Fatigue"),
///     "Symptoms may include:\n    • Fever\n    • Cough\n    • Fatigue"
/// );
/// ```
pub fn normalize_text(text: &str) -> String {
    let collapsed = collapse_whitespace(text);

    if let Some(marker) = may_include_marker().find(&collapsed) {
        let prefix = collapsed[..marker.start()].trim();
        let mut out = if prefix.is_empty() {
            "may include:".to_string()
        } else {
            format!("{} may include:", prefix)
        };

        for item in split_at_capitals(&collapsed[marker.end()..]) {
            out.push('\n');
            out.push_str(BULLET);
            out.push_str(&item);
        }
        return out;
    }

    if collapsed.starts_with('•') || collapsed.starts_with('-') {
        return bullet_marker()
            .split(&collapsed)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|piece| format!("{}{}", BULLET, piece))
            .collect::<Vec<_>>()
            .join("\n");
    }

    collapsed
}

fn extract_title(page: &Html) -> Result<String, ExtractError> {
    let h1 = selector("h1")?;

    page.select(&h1)
        .next()
        .map(|element| element_text(element).to_uppercase())
        .filter(|title| !title.is_empty())
        .ok_or(ExtractError::MissingTitle)
}

/// First element whose `id` attribute equals `id`
fn find_by_id<'a>(page: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    page.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().id() == Some(id))
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::Selector(css.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    whitespace().replace_all(text.trim(), " ").into_owned()
}

/// Splits before every uppercase letter that does not continue an uppercase run
fn split_at_capitals(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut previous: Option<char> = None;

    for c in text.chars() {
        if c.is_uppercase() && !previous.is_some_and(char::is_uppercase) {
            push_trimmed(&mut items, &current);
            current.clear();
        }
        current.push(c);
        previous = Some(c);
    }
    push_trimmed(&mut items, &current);

    items
}

fn push_trimmed(items: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        items.push(piece.to_string());
    }
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn may_include_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)may include:").expect("static regex"))
}

fn bullet_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[•-]").expect("static regex"))
}
