//! Calendar helpers for report labels.
//!
//! Every helper takes a [`Clock`] so tests can pin "now".

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Weekday};

/// Date format used in report bodies and tables.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Timestamp format embedded in download file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall clock in the server's local time zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Midnight of the given date.
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Arabic name of a weekday.
pub fn arabic_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "الإثنين",
        Weekday::Tue => "الثلاثاء",
        Weekday::Wed => "الأربعاء",
        Weekday::Thu => "الخميس",
        Weekday::Fri => "الجمعة",
        Weekday::Sat => "السبت",
        Weekday::Sun => "الأحد",
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Dates of Sunday, Monday and Tuesday of the current week, formatted `YYYY/MM/DD`.
pub fn current_week_sun_mon_tue(clock: &dyn Clock) -> [String; 3] {
    let sunday = week_start(clock.today());
    [0, 1, 2].map(|offset| format_date(sunday + Duration::days(offset)))
}

/// Today's Arabic weekday name and formatted date.
pub fn arabic_day_and_date(clock: &dyn Clock) -> (&'static str, String) {
    let today = clock.today();
    (arabic_weekday(today.weekday()), format_date(today))
}

/// `YYYYMMDD_HHMMSS` for download file names.
pub fn file_timestamp(clock: &dyn Clock) -> String {
    clock.now().format(FILE_TIMESTAMP_FORMAT).to_string()
}
