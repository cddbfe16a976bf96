use std::sync::LazyLock;

use regex::Regex;

static TABLE_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"表\d+").unwrap());
static SUB_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+-\d+").unwrap());
static CONDITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"試験条件|試験方法|試験項目").unwrap());
static CRITERIA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"判定基準|確認項目").unwrap());

pub const DEFAULT_HEADING_MARKER: &str = "■";

/// Terminates the summary clause of a condition/criteria annotation.
const FULL_STOP: char = '。';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Heading(String),
    TableNoise,
    SubItem(String),
    /// Extracted condition text, already cut at the first full stop.
    Condition(String),
    Criteria(String),
    Generic(String),
}

impl LineKind {
    pub fn tag(&self) -> &'static str {
        match self {
            LineKind::Blank => "blank",
            LineKind::Heading(_) => "heading",
            LineKind::TableNoise => "table_noise",
            LineKind::SubItem(_) => "sub_item",
            LineKind::Condition(_) => "condition",
            LineKind::Criteria(_) => "criteria",
            LineKind::Generic(_) => "generic",
        }
    }
}

type Rule = fn(&str, &str) -> Option<LineKind>;

/// Classification rules in priority order. The first rule that returns
/// `Some` decides the line; anything left over is `Generic`.
const RULES: &[(&str, Rule)] = &[
    ("blank", blank),
    ("heading", heading),
    ("table_noise", table_noise),
    ("sub_item", sub_item),
    ("condition", condition),
    ("criteria", criteria),
];

/// Classify one raw line. `heading_marker` is the glyph that opens a
/// major-item title.
pub fn classify_line(raw: &str, heading_marker: &str) -> LineKind {
    let line = raw.trim();
    RULES
        .iter()
        .find_map(|(_, rule)| rule(line, heading_marker))
        .unwrap_or_else(|| LineKind::Generic(line.to_string()))
}

pub fn has_table_ref(line: &str) -> bool {
    TABLE_REF_RE.is_match(line)
}

fn blank(line: &str, _: &str) -> Option<LineKind> {
    line.is_empty().then_some(LineKind::Blank)
}

fn heading(line: &str, marker: &str) -> Option<LineKind> {
    if marker.is_empty() || !line.starts_with(marker) || has_table_ref(line) {
        return None;
    }
    Some(LineKind::Heading(line.to_string()))
}

fn table_noise(line: &str, _: &str) -> Option<LineKind> {
    has_table_ref(line).then_some(LineKind::TableNoise)
}

fn sub_item(line: &str, _: &str) -> Option<LineKind> {
    SUB_ITEM_RE
        .is_match(line)
        .then(|| LineKind::SubItem(line.to_string()))
}

fn condition(line: &str, _: &str) -> Option<LineKind> {
    annotation_after(&CONDITION_RE, line).map(LineKind::Condition)
}

fn criteria(line: &str, _: &str) -> Option<LineKind> {
    annotation_after(&CRITERIA_RE, line).map(LineKind::Criteria)
}

/// Text after the leftmost marker, trimmed and cut after the first `。`.
fn annotation_after(markers: &Regex, line: &str) -> Option<String> {
    let m = markers.find(line)?;
    let rest = line[m.end()..].trim();
    let summary = match rest.find(FULL_STOP) {
        Some(idx) => &rest[..idx + FULL_STOP.len_utf8()],
        None => rest,
    };
    Some(summary.to_string())
}
