// Query time window and user time input parsing
use super::error::LoadError;
use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Closed-open window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, LoadError> {
        if start >= end {
            return Err(LoadError::validation(format!(
                "start time {} must be before end time {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Both bounds are required and must parse.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, LoadError> {
        let start = required(start, "start")?;
        let end = required(end, "end")?;
        Self::new(parse_time_input(start)?, parse_time_input(end)?)
    }

    /// `{startISO}/{endISO}` in millisecond UTC form, as used in `during(...)`.
    pub fn as_interval(&self) -> String {
        format!("{}/{}", iso(&self.start), iso(&self.end))
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, LoadError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(LoadError::validation(format!("please select a {} time", name))),
    }
}

fn iso(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `...Z` and explicit offsets are taken as given; a naive wall-clock time is
/// read in the local timezone and converted to UTC.
pub fn parse_time_input(raw: &str) -> Result<DateTime<Utc>, LoadError> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| LoadError::validation(format!("invalid time '{}'", raw)))?;

    local_to_utc(&Local, &naive)
}

fn local_to_utc<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> Result<DateTime<Utc>, LoadError> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| LoadError::validation(format!("time '{}' does not exist locally", naive)))
}
