//! Report templates.
//!
//! The renderer knows three kinds of report.  They share the page template and differ in their
//! letterhead, their body text and a few policies, which are modelled as flags on
//! [`ReportTemplate`] rather than as separate code paths.

use std::fmt;
use std::str::FromStr;

use log::debug;
use thiserror::Error;

use crate::config::Branding;
use crate::dates::{self, Clock};
use crate::model::{
    Column, DocumentInfo, HorizontalAlignment, MalformedRowsPolicy, PageLayout, ReportBlock,
    ReportInput, ReportLayout, TableBlock, TextRole,
};
use crate::shaping::TextShaper;

/// When the body table is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableVisibility {
    /// Only when there is at least one data row.
    WhenRows,
    /// Always, as a header-only table when there are no rows.
    Always,
}

/// Where the signature line goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignaturePlacement {
    /// After the closing remarks, in the body flow.
    Flow,
    /// Above the bottom margin of every page.
    PageDecoration,
}

/// Per-template behaviour flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemplatePolicy {
    pub table: TableVisibility,
    pub malformed_rows: MalformedRowsPolicy,
    pub signature: SignaturePlacement,
}

/// The available reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReportTemplate {
    /// Rounds carried out during a remote-work day, with the teachers who did not attend.
    #[default]
    Rounds,
    /// Weekly classroom-visit log for Sunday to Tuesday.
    WeeklyVisits,
    /// Daily teacher absence report.
    Attendance,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown report template `{0}` (expected rounds, weekly or attendance)")]
pub struct UnknownTemplate(pub String);

impl FromStr for ReportTemplate {
    type Err = UnknownTemplate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rounds" => Ok(Self::Rounds),
            "weekly" | "weekly-visits" => Ok(Self::WeeklyVisits),
            "attendance" => Ok(Self::Attendance),
            _ => Err(UnknownTemplate(s.to_string())),
        }
    }
}

impl fmt::Display for ReportTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

const CLOSING_THANKS: &str = "ختامًا أرجو قبول التقرير ولكم جزيل الشكر";
const SECTION_GAP_MM: f64 = 6.0;
const SIGNATURE_GAP_MM: f64 = 25.0;

impl ReportTemplate {
    pub const ALL: [ReportTemplate; 3] = [Self::Rounds, Self::WeeklyVisits, Self::Attendance];

    /// URL and CLI name.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Rounds => "rounds",
            Self::WeeklyVisits => "weekly",
            Self::Attendance => "attendance",
        }
    }

    pub fn policy(&self) -> TemplatePolicy {
        match self {
            Self::Rounds => TemplatePolicy {
                table: TableVisibility::WhenRows,
                malformed_rows: MalformedRowsPolicy::TreatAsEmpty,
                signature: SignaturePlacement::Flow,
            },
            Self::WeeklyVisits => TemplatePolicy {
                table: TableVisibility::Always,
                malformed_rows: MalformedRowsPolicy::TreatAsEmpty,
                signature: SignaturePlacement::PageDecoration,
            },
            Self::Attendance => TemplatePolicy {
                table: TableVisibility::Always,
                malformed_rows: MalformedRowsPolicy::Reject,
                signature: SignaturePlacement::PageDecoration,
            },
        }
    }

    /// Unshaped document title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Rounds => "تقرير الجولات",
            Self::WeeklyVisits => "سجل الزيارات الصفية الأسبوعي",
            Self::Attendance => "تقرير متابعة غياب المعلمات",
        }
    }

    /// Stem of the download file name, before the timestamp.
    pub fn filename_prefix(&self) -> &'static str {
        match self {
            Self::Rounds => "تقرير_الجولات",
            Self::WeeklyVisits => "سجل_الزيارات_الأسبوعي",
            Self::Attendance => "تقرير_الغياب",
        }
    }

    /// `<prefix>_<YYYYMMDD_HHMMSS>.pdf`
    pub fn download_filename(&self, clock: &dyn Clock) -> String {
        format!("{}_{}.pdf", self.filename_prefix(), dates::file_timestamp(clock))
    }

    fn page(&self) -> PageLayout {
        match self {
            Self::Rounds => PageLayout::a4(60.0, 40.0),
            Self::WeeklyVisits => PageLayout::a4(55.0, 30.0),
            Self::Attendance => PageLayout::a4(60.0, 35.0),
        }
    }

    fn header_lines(&self, branding: &Branding) -> Vec<String> {
        match self {
            Self::Rounds => vec![
                branding.ministry.clone(),
                branding.office.clone(),
                branding.directorate.clone(),
                branding.school.clone(),
            ],
            Self::WeeklyVisits => vec![
                branding.ministry.clone(),
                branding.directorate.clone(),
                branding.office.clone(),
                branding.school.clone(),
            ],
            Self::Attendance => vec![
                branding.ministry.clone(),
                branding.directorate.clone(),
                branding.school.clone(),
            ],
        }
    }

    /// Lays out the report content for one request.
    ///
    /// Every string is shaped exactly once here; the layout engine only reorders lines.
    pub fn compose(
        &self,
        input: &ReportInput,
        branding: &Branding,
        shaper: &TextShaper,
        clock: &dyn Clock,
    ) -> ReportLayout {
        let policy = self.policy();
        let body = |text: &str| ReportBlock::paragraph(shaper.shape(text), TextRole::Body);

        let mut blocks = vec![ReportBlock::Title(shaper.shape(self.title()))];
        blocks.extend(
            self.introduction(input, branding, clock)
                .iter()
                .map(|line| body(line.as_str())),
        );
        blocks.push(ReportBlock::Spacer(SECTION_GAP_MM));

        let table = self.table(input, shaper, clock);
        let show_table = match policy.table {
            TableVisibility::Always => true,
            TableVisibility::WhenRows => !table.data_rows().is_empty(),
        };
        if show_table {
            debug!(
                "{} report: table with {} data rows",
                self.slug(),
                table.data_rows().len()
            );
            blocks.push(ReportBlock::Table(table));
            blocks.push(ReportBlock::Spacer(SECTION_GAP_MM));
        }

        blocks.extend(self.closing_remarks().iter().map(|line| body(*line)));

        let signature = shaper.shape(branding.signature().as_str());
        let footer_signature = match policy.signature {
            SignaturePlacement::Flow => {
                blocks.push(ReportBlock::Spacer(SIGNATURE_GAP_MM));
                blocks.push(ReportBlock::paragraph(signature, TextRole::Signature));
                None
            }
            SignaturePlacement::PageDecoration => Some(signature),
        };

        ReportLayout {
            info: DocumentInfo {
                title: shaper.shape_for_display(self.title()),
                author: shaper.shape_for_display(branding.author.as_str()),
                subject: shaper.shape_for_display(self.title()),
            },
            page: self.page(),
            header_lines: self
                .header_lines(branding)
                .iter()
                .map(|line| shaper.shape(line.as_str()))
                .collect(),
            blocks,
            footer_signature,
        }
    }

    fn introduction(&self, input: &ReportInput, branding: &Branding, clock: &dyn Clock) -> Vec<String> {
        match self {
            Self::Rounds => {
                let (day, date) = dates::arabic_day_and_date(clock);
                vec![
                    format!(
                        "بناءً على تعليمات إدارة التعليم بمنطقة {}، تقرر أن يكون",
                        branding.region
                    ),
                    format!("الدوام ليوم ({day}) الموافق ({date}) عن بُعد للمعلمين الممارسين للتدريس."),
                    format!(
                        "وبناءً عليه، تم تكليفي بتنفيذ الجولات خلال الحصة الرابعة عبر منصة مدرستي، وذلك من قبل مديرة المدرسة: {}.",
                        branding.principal
                    ),
                ]
            }
            Self::WeeklyVisits => {
                let labels = [
                    ("الفصل الدراسي", &input.period),
                    ("الأسبوع", &input.week),
                    ("العام الدراسي", &input.term),
                ];
                let summary: Vec<String> = labels
                    .iter()
                    .filter(|(_, value)| !value.is_empty())
                    .map(|(label, value)| format!("{label}: {value}"))
                    .collect();
                if summary.is_empty() {
                    Vec::new()
                } else {
                    vec![summary.join(" - ")]
                }
            }
            Self::Attendance => {
                let (day, date) = dates::arabic_day_and_date(clock);
                vec![format!(
                    "بيان بأسماء المعلمات الغائبات ليوم ({day}) الموافق ({date})."
                )]
            }
        }
    }

    fn closing_remarks(&self) -> &'static [&'static str] {
        match self {
            Self::Rounds => &["*لوحظ الانضباط في دخول الحصص", CLOSING_THANKS],
            Self::WeeklyVisits | Self::Attendance => &[CLOSING_THANKS],
        }
    }

    fn table(&self, input: &ReportInput, shaper: &TextShaper, clock: &dyn Clock) -> TableBlock {
        let column = |heading: &str, width_mm: f64, alignment| Column {
            heading: shaper.shape(heading),
            width_mm,
            alignment,
        };
        let right = HorizontalAlignment::Right;
        let center = HorizontalAlignment::Center;

        match self {
            Self::Rounds | Self::Attendance => {
                let reason = match self {
                    Self::Attendance => "سبب الغياب",
                    _ => "سبب عدم الحضور",
                };
                let mut table = TableBlock::new(vec![
                    column("م", 14.0, center),
                    column("اسم المعلمة", 70.0, right),
                    column(reason, 90.0, right),
                ]);
                for (index, row) in input.rows.iter().enumerate() {
                    let number = (index + 1).to_string();
                    table.push_row(vec![
                        shaper.shape(number.as_str()),
                        shaper.shape(row.name.as_str()),
                        shaper.shape(row.reason.as_str()),
                    ]);
                }
                table
            }
            Self::WeeklyVisits => {
                let mut table = TableBlock::new(vec![
                    column("اليوم", 22.0, right),
                    column("التاريخ", 26.0, center),
                    column("الفصل", 30.0, right),
                    column("النشاط", 50.0, right),
                    column("ملاحظات", 52.0, right),
                ]);
                let weekdays = [
                    chrono::Weekday::Sun,
                    chrono::Weekday::Mon,
                    chrono::Weekday::Tue,
                ];
                let week_dates = dates::current_week_sun_mon_tue(clock);
                for ((entry, weekday), date) in input.days.iter().zip(weekdays).zip(&week_dates) {
                    if entry.is_blank() {
                        continue;
                    }
                    table.push_row(vec![
                        shaper.shape(dates::arabic_weekday(weekday)),
                        shaper.shape(date.as_str()),
                        shaper.shape(entry.class.as_str()),
                        shaper.shape(entry.activity.as_str()),
                        shaper.shape(entry.note.as_str()),
                    ]);
                }
                table
            }
        }
    }
}
