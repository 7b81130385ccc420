use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub mod config;
#[cfg(feature = "ssr")]
pub mod service;
#[cfg(feature = "ssr")]
pub mod source;

pub const PLACEHOLDER_LEVEL: i8 = -1;
pub const MAX_LEVEL: i8 = 4;
pub const DAYS_PER_WEEK: usize = 7;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivityError {
    #[error("Couldn't reach contribution provider: {0}")]
    Network(String),
    #[error("Contribution provider responded with {0}")]
    Status(http::StatusCode),
    #[error("Contribution provider returned no days")]
    Empty,
    #[error("Malformed contribution data: {0}")]
    Malformed(String),
    #[error("Invalid value {value:?} for {var}")]
    Config { var: &'static str, value: String },
}

impl ActivityError {
    /// Everything except a bad configuration means the data just isn't there.
    pub fn is_data_unavailable(&self) -> bool {
        !matches!(self, Self::Config { .. })
    }
}

/// One cell of the heatmap. Placeholders carry no date, a zero count and
/// `PLACEHOLDER_LEVEL`; real days always have a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDayRecord")]
pub struct DayRecord {
    #[serde(with = "date_or_empty")]
    pub date: Option<NaiveDate>,
    pub count: u32,
    pub level: i8,
}

impl DayRecord {
    pub fn new(date: NaiveDate, count: u32) -> Self {
        Self {
            date: Some(date),
            count,
            level: bucket_level(count),
        }
    }

    pub fn placeholder() -> Self {
        Self {
            date: None,
            count: 0,
            level: PLACEHOLDER_LEVEL,
        }
    }

    /// Keep a level computed elsewhere (e.g. by the provider).
    pub fn with_level(date: NaiveDate, count: u32, level: i8) -> Result<Self, ActivityError> {
        if !(0..=MAX_LEVEL).contains(&level) {
            return Err(ActivityError::Malformed(format!(
                "level {level} on {date} is outside 0..={MAX_LEVEL}"
            )));
        }
        Ok(Self {
            date: Some(date),
            count,
            level,
        })
    }

    pub fn is_placeholder(&self) -> bool {
        self.date.is_none()
    }
}

#[derive(Deserialize)]
struct RawDayRecord {
    #[serde(with = "date_or_empty")]
    date: Option<NaiveDate>,
    count: u32,
    level: i8,
}

impl TryFrom<RawDayRecord> for DayRecord {
    type Error = ActivityError;

    fn try_from(raw: RawDayRecord) -> Result<Self, Self::Error> {
        match raw.date {
            Some(date) => Self::with_level(date, raw.count, raw.level),
            None if raw.count == 0 && raw.level == PLACEHOLDER_LEVEL => Ok(Self::placeholder()),
            None => Err(ActivityError::Malformed(format!(
                "placeholder with count {} and level {}",
                raw.count, raw.level
            ))),
        }
    }
}

mod date_or_empty {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.collect_str(&d.format(FORMAT)),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = String::deserialize(d)?;
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(&raw, FORMAT)
            .map(Some)
            .map_err(D::Error::custom)
    }
}

/// Intensity tier for a day's count: 0, 1-3, 4-6, 7-9, 10+.
pub fn bucket_level(count: u32) -> i8 {
    match count {
        0 => 0,
        1..=3 => 1,
        4..=6 => 2,
        7..=9 => 3,
        _ => 4,
    }
}

pub type WeekColumn = Vec<DayRecord>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    fn offset(self, weekday: Weekday) -> usize {
        match self {
            Self::Sunday => weekday.num_days_from_sunday() as usize,
            Self::Monday => weekday.num_days_from_monday() as usize,
        }
    }
}

impl std::str::FromStr for WeekStart {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" => Ok(Self::Monday),
            _ => Err(()),
        }
    }
}

/// Sunday-start version of [`group_into_weeks_from`].
pub fn group_into_weeks(days: &[DayRecord]) -> Vec<WeekColumn> {
    group_into_weeks_from(days, WeekStart::Sunday)
}

/// Split a contiguous, oldest-first run of days into week columns.
///
/// The first column is left-padded with placeholders so the first day sits
/// in its weekday slot. The last column is emitted short if the input ends
/// mid-week; renderers must not assume every column holds seven cells.
pub fn group_into_weeks_from(days: &[DayRecord], week_start: WeekStart) -> Vec<WeekColumn> {
    let Some(first) = days.first() else {
        return Vec::new();
    };
    let padding = first
        .date
        .map(|d| week_start.offset(d.weekday()))
        .unwrap_or(0);

    let mut weeks = Vec::with_capacity((padding + days.len()).div_ceil(DAYS_PER_WEEK));
    let mut current: WeekColumn = vec![DayRecord::placeholder(); padding];
    for day in days {
        current.push(*day);
        if current.len() == DAYS_PER_WEEK {
            weeks.push(std::mem::replace(
                &mut current,
                Vec::with_capacity(DAYS_PER_WEEK),
            ));
        }
    }
    if !current.is_empty() {
        weeks.push(current);
    }
    weeks
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthLabel {
    pub label: String,
    pub week_index: usize,
}

/// One label per run of columns whose first real day falls in the same month.
pub fn derive_month_labels(weeks: &[WeekColumn]) -> Vec<MonthLabel> {
    let mut labels = Vec::new();
    let mut last_month = None;
    for (week_index, week) in weeks.iter().enumerate() {
        let Some(date) = week.iter().find_map(|d| d.date) else {
            continue;
        };
        if last_month != Some(date.month()) {
            labels.push(MonthLabel {
                label: date.format("%b").to_string(),
                week_index,
            });
            last_month = Some(date.month());
        }
    }
    labels
}

pub fn total_count(days: &[DayRecord]) -> u64 {
    days.iter().map(|d| u64::from(d.count)).sum()
}

/// Everything the heatmap view paints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionCalendar {
    pub weeks: Vec<WeekColumn>,
    pub month_labels: Vec<MonthLabel>,
    pub total: u64,
}

impl ContributionCalendar {
    pub fn from_days(days: &[DayRecord], week_start: WeekStart) -> Self {
        let weeks = group_into_weeks_from(days, week_start);
        let month_labels = derive_month_labels(&weeks);
        Self {
            weeks,
            month_labels,
            total: total_count(days),
        }
    }

    /// Year of the most recent real day.
    pub fn year(&self) -> Option<i32> {
        self.weeks
            .iter()
            .rev()
            .flat_map(|w| w.iter().rev())
            .find_map(|d| d.date)
            .map(|d| d.year())
    }
}

/// Result of loading an identity's activity. `Fallback` is synthetic data
/// standing in for an unavailable provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContributionData {
    Live(Vec<DayRecord>),
    Fallback(Vec<DayRecord>),
    Unavailable,
}

impl ContributionData {
    pub fn days(&self) -> &[DayRecord] {
        match self {
            Self::Live(days) | Self::Fallback(days) => days,
            Self::Unavailable => &[],
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Live(_))
    }

    pub fn calendar(&self, week_start: WeekStart) -> Option<ContributionCalendar> {
        match self {
            Self::Unavailable => None,
            data => Some(ContributionCalendar::from_days(data.days(), week_start)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Hands out a token per request so only the latest response is applied.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::Acquire) == token.0
    }
}
