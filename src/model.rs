//! Request data and the logical content of a report document.
//!
//! The types in this module mirror the building blocks the layout engine understands (titles,
//! paragraphs, spacers and tables) without referencing `genpdf` directly, so a report can be
//! composed and inspected in tests without loading fonts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::shaping::ShapedText;

/// Form/JSON keys of the per-day fields, in week order.
pub const DAY_KEYS: [&str; 3] = ["sun", "mon", "tue"];

/// One row of an absence table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceRow {
    pub name: String,
    pub reason: String,
}

impl AbsenceRow {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// What was observed on one day of the weekly visit log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DayEntry {
    pub class: String,
    pub activity: String,
    pub note: String,
}

impl DayEntry {
    pub fn is_blank(&self) -> bool {
        [&self.class, &self.activity, &self.note]
            .iter()
            .all(|field| field.trim().is_empty())
    }
}

/// Free-text fields submitted for one report.
///
/// Every template reads the subset it needs; unused fields are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportInput {
    pub period: String,
    pub week: String,
    pub term: String,
    /// Sunday, Monday and Tuesday.
    pub days: [DayEntry; 3],
    /// Absence rows in the order the caller supplied them.
    pub rows: Vec<AbsenceRow>,
}

/// How a payload whose `rows` are not a list of objects is handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedRowsPolicy {
    /// Render as if no rows were sent.
    TreatAsEmpty,
    /// Refuse the request with a client error.
    Reject,
}

/// Problems with the `rows` payload.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RowsError {
    #[error("rows are not valid JSON: {0}")]
    InvalidJson(String),
    #[error("rows must be a JSON array of {{name, reason}} objects")]
    NotAnArray,
    #[error("row {index} is not a {{name, reason}} object")]
    NotAnObject { index: usize },
}

/// Parses a rows payload: a JSON array of objects, or a string holding one.
///
/// `null` and blank strings mean "no rows".  Missing `name`/`reason` keys become empty strings;
/// non-string scalars are kept as their JSON text.
pub fn parse_rows(raw: &Value) -> Result<Vec<AbsenceRow>, RowsError> {
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::String(text) if text.trim().is_empty() => Ok(Vec::new()),
        Value::String(text) => {
            let parsed: Value = serde_json::from_str(text)
                .map_err(|err| RowsError::InvalidJson(err.to_string()))?;
            match parsed {
                Value::Array(_) => parse_rows(&parsed),
                _ => Err(RowsError::NotAnArray),
            }
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(fields) => Ok(AbsenceRow {
                    name: text_value(fields.get("name")),
                    reason: text_value(fields.get("reason")),
                }),
                _ => Err(RowsError::NotAnObject { index }),
            })
            .collect(),
        _ => Err(RowsError::NotAnArray),
    }
}

/// [`parse_rows`] with the template's malformed-payload policy applied.
pub fn parse_rows_with_policy(
    raw: Option<&Value>,
    policy: MalformedRowsPolicy,
) -> Result<Vec<AbsenceRow>, RowsError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    match (parse_rows(raw), policy) {
        (Ok(rows), _) => Ok(rows),
        (Err(err), MalformedRowsPolicy::TreatAsEmpty) => {
            log::debug!("ignoring malformed rows payload: {err}");
            Ok(Vec::new())
        }
        (Err(err), MalformedRowsPolicy::Reject) => Err(err),
    }
}

fn text_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

impl ReportInput {
    /// Builds the input from decoded form or JSON fields.
    ///
    /// Rows are read from `rows` (array or JSON string) or from the form field `rows_json`.
    pub fn from_fields(
        fields: &Map<String, Value>,
        policy: MalformedRowsPolicy,
    ) -> Result<Self, RowsError> {
        let field = |key: &str| text_value(fields.get(key)).trim().to_owned();
        let day = |prefix: &str| DayEntry {
            class: field(&format!("{prefix}_class")),
            activity: field(&format!("{prefix}_activity")),
            note: field(&format!("{prefix}_note")),
        };

        let raw_rows = fields.get("rows").or_else(|| fields.get("rows_json"));
        Ok(Self {
            period: field("period"),
            week: field("week"),
            term: field("term"),
            days: DAY_KEYS.map(day),
            rows: parse_rows_with_policy(raw_rows, policy)?,
        })
    }
}

/// Horizontal placement of text within its box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    Center,
    /// Natural alignment of Arabic text.
    #[default]
    Right,
}

/// Typographic role of a paragraph; templates map roles to font sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextRole {
    Body,
    /// Table cells.
    Small,
    Signature,
}

/// A table column with its fixed width.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub heading: ShapedText,
    pub width_mm: f64,
    pub alignment: HorizontalAlignment,
}

/// A bordered table.
///
/// Columns and cells are stored in *reading* order, first column being the one an Arabic reader
/// meets first (the rightmost on the page).  [`TableBlock::visual_columns`] yields them in the
/// left-to-right order the layout engine expects.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBlock {
    columns: Vec<Column>,
    rows: Vec<Vec<ShapedText>>,
}

impl TableBlock {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a data row; cells are given in reading order.
    ///
    /// Missing trailing cells are padded with empty text and extra cells are dropped, so every row
    /// has exactly one cell per column.
    pub fn push_row(&mut self, mut cells: Vec<ShapedText>) {
        cells.resize(self.columns.len(), ShapedText::default());
        self.rows.push(cells);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn data_rows(&self) -> &[Vec<ShapedText>] {
        &self.rows
    }

    /// Number of rendered rows, header included.
    pub fn row_count(&self) -> usize {
        self.rows.len() + 1
    }

    /// Sum of the column widths.
    pub fn width_mm(&self) -> f64 {
        self.columns.iter().map(|column| column.width_mm).sum()
    }

    /// Columns from the left edge of the page to the right edge.
    pub fn visual_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().rev()
    }

    /// Cells of a data row from the left edge of the page to the right edge.
    pub fn visual_cells<'a>(row: &'a [ShapedText]) -> impl Iterator<Item = &'a ShapedText> {
        row.iter().rev()
    }
}

/// Content blocks flowing through the page body.
#[derive(Clone, Debug, PartialEq)]
pub enum ReportBlock {
    /// Centered bold heading.
    Title(ShapedText),
    /// Right-aligned paragraph.
    Paragraph { text: ShapedText, role: TextRole },
    /// Vertical gap in millimetres.
    Spacer(f64),
    Table(TableBlock),
}

impl ReportBlock {
    pub fn paragraph(text: ShapedText, role: TextRole) -> Self {
        Self::Paragraph { text, role }
    }
}

/// Page geometry in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageLayout {
    pub width_mm: f64,
    pub height_mm: f64,
    pub side_margin_mm: f64,
    /// Space reserved above the body for the repeating header.
    pub top_margin_mm: f64,
    /// Space reserved below the body for the repeating footer.
    pub bottom_margin_mm: f64,
}

impl PageLayout {
    /// A4 portrait with 15 mm side margins.
    pub fn a4(top_margin_mm: f64, bottom_margin_mm: f64) -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            side_margin_mm: 15.0,
            top_margin_mm,
            bottom_margin_mm,
        }
    }

    /// Width available to body content.
    pub fn content_width_mm(&self) -> f64 {
        self.width_mm - 2.0 * self.side_margin_mm
    }
}

/// Document information dictionary entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
}

/// A fully composed report, ready for the layout engine.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportLayout {
    pub info: DocumentInfo,
    pub page: PageLayout,
    /// Lines drawn right-aligned at the top of every page.
    pub header_lines: Vec<ShapedText>,
    pub blocks: Vec<ReportBlock>,
    /// Signature drawn above the bottom margin of every page, when the template puts it there.
    pub footer_signature: Option<ShapedText>,
}

impl ReportLayout {
    /// The body table, if the report has one.
    pub fn table(&self) -> Option<&TableBlock> {
        self.blocks.iter().find_map(|block| match block {
            ReportBlock::Table(table) => Some(table),
            _ => None,
        })
    }

    /// Whether the signature appears in the body flow.
    pub fn has_flow_signature(&self) -> bool {
        self.blocks.iter().any(|block| {
            matches!(
                block,
                ReportBlock::Paragraph {
                    role: TextRole::Signature,
                    ..
                }
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::shaping::TextShaper;

    #[test]
    fn rows_preserve_caller_order() {
        let rows = parse_rows(&json!([
            {"name": "نورة", "reason": "إجازة"},
            {"name": "سارة", "reason": "مرض"},
        ]))
        .expect("valid rows");
        assert_eq!(
            rows,
            vec![AbsenceRow::new("نورة", "إجازة"), AbsenceRow::new("سارة", "مرض")]
        );
    }

    #[test]
    fn rows_may_arrive_as_a_json_string() {
        let rows = parse_rows(&json!(r#"[{"name": "هند"}]"#)).expect("valid rows");
        assert_eq!(rows, vec![AbsenceRow::new("هند", "")]);
    }

    #[test]
    fn blank_and_null_rows_mean_no_rows() {
        assert_eq!(parse_rows(&Value::Null), Ok(Vec::new()));
        assert_eq!(parse_rows(&json!("  ")), Ok(Vec::new()));
        assert_eq!(parse_rows(&json!([])), Ok(Vec::new()));
    }

    #[test]
    fn malformed_rows_are_detected() {
        assert!(matches!(
            parse_rows(&json!("{not json")),
            Err(RowsError::InvalidJson(_))
        ));
        assert_eq!(parse_rows(&json!({"name": "x"})), Err(RowsError::NotAnArray));
        assert_eq!(parse_rows(&json!("\"text\"")), Err(RowsError::NotAnArray));
        assert_eq!(
            parse_rows(&json!([{"name": "x"}, 3])),
            Err(RowsError::NotAnObject { index: 1 })
        );
    }

    #[test]
    fn policy_decides_between_empty_and_error() {
        let bad = json!("[1, 2]");
        assert_eq!(
            parse_rows_with_policy(Some(&bad), MalformedRowsPolicy::TreatAsEmpty),
            Ok(Vec::new())
        );
        assert_eq!(
            parse_rows_with_policy(Some(&bad), MalformedRowsPolicy::Reject),
            Err(RowsError::NotAnObject { index: 0 })
        );
        assert_eq!(
            parse_rows_with_policy(None, MalformedRowsPolicy::Reject),
            Ok(Vec::new())
        );
    }

    #[test]
    fn fields_accept_numbers_and_form_rows() {
        let fields = json!({
            "period": "الفصل الأول",
            "week": 1,
            "term": "1446",
            "mon_class": " 3/2 ",
            "rows_json": "[{\"name\": \"ريم\", \"reason\": 5}]",
        });
        let Value::Object(fields) = fields else {
            unreachable!()
        };

        let input =
            ReportInput::from_fields(&fields, MalformedRowsPolicy::Reject).expect("valid input");
        assert_eq!(input.week, "1");
        assert_eq!(input.days[1].class, "3/2");
        assert!(input.days[0].is_blank());
        assert_eq!(input.rows, vec![AbsenceRow::new("ريم", "5")]);
    }

    #[test]
    fn table_rows_are_padded_to_the_column_count() {
        let shaper = TextShaper::default();
        let column = |heading: &str, width_mm| Column {
            heading: shaper.shape(heading),
            width_mm,
            alignment: HorizontalAlignment::Right,
        };
        let mut table = TableBlock::new(vec![column("م", 14.0), column("الاسم", 70.0)]);
        table.push_row(vec![shaper.shape("1")]);

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.data_rows()[0].len(), 2);
        assert_eq!(table.width_mm(), 84.0);
        let first_visual = table.visual_columns().next().expect("column");
        assert_eq!(first_visual.width_mm, 70.0);
    }
}
