use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::calendar::EventTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl RepeatUnit {
    fn freq(self) -> &'static str {
        match self {
            RepeatUnit::Days => "DAILY",
            RepeatUnit::Weeks => "WEEKLY",
            RepeatUnit::Months => "MONTHLY",
            RepeatUnit::Years => "YEARLY",
        }
    }

    fn from_freq(token: &str) -> Option<Self> {
        match token {
            "DAILY" => Some(RepeatUnit::Days),
            "WEEKLY" => Some(RepeatUnit::Weeks),
            "MONTHLY" => Some(RepeatUnit::Months),
            "YEARLY" => Some(RepeatUnit::Years),
            _ => None,
        }
    }
}

/// How a series terminates. A count and an end date are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatEnd {
    Never,
    Count(u32),
    Until(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub unit: RepeatUnit,
    pub interval: u32,
    pub end: RepeatEnd,
}

impl Recurrence {
    pub fn new(unit: RepeatUnit, interval: u32) -> Self {
        Self {
            unit,
            interval: interval.max(1),
            end: RepeatEnd::Never,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.end = if count > 0 { RepeatEnd::Count(count) } else { RepeatEnd::Never };
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = RepeatEnd::Until(end);
        self
    }

    /// True once an explicit end date lies in the past. Count-bounded series
    /// never report as ended here.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        matches!(self.end, RepeatEnd::Until(end) if end < now)
    }
}

/// Encodes a recurrence as a single `RRULE:` line.
///
/// Weekly rules carry the weekday of `start` so the remote side repeats on the
/// same day. A positive count wins over an end date.
pub fn encode(recurrence: &Recurrence, start: &EventTime) -> String {
    let mut rule = format!("RRULE:FREQ={}", recurrence.unit.freq());

    if recurrence.interval > 1 {
        rule.push_str(&format!(";INTERVAL={}", recurrence.interval));
    }

    if recurrence.unit == RepeatUnit::Weeks {
        rule.push_str(";BYDAY=");
        rule.push_str(weekday_code(start.date().weekday()));
    }

    match recurrence.end {
        RepeatEnd::Count(count) if count > 0 => rule.push_str(&format!(";COUNT={}", count)),
        RepeatEnd::Until(end) => rule.push_str(&format!(";UNTIL={}", end.format("%Y%m%dT%H%M%SZ"))),
        _ => {}
    }

    rule
}

/// Decodes the first `RRULE` among a remote event's recurrence lines.
pub fn decode_lines(lines: &[String]) -> Option<Recurrence> {
    lines
        .iter()
        .find(|line| line.starts_with("RRULE:"))
        .and_then(|line| decode(line))
}

/// Decodes an RRULE string, with or without the `RRULE:` prefix.
///
/// Anything this codec cannot express degrades to `None` (a plain event).
/// Selectors it does not model are accepted and dropped with a warning.
pub fn decode(rule: &str) -> Option<Recurrence> {
    let body = rule.trim().strip_prefix("RRULE:").unwrap_or(rule.trim());

    let mut unit = None;
    let mut interval = 1;
    let mut count = None;
    let mut until = None;

    for part in body.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };

        match key.to_ascii_uppercase().as_str() {
            "FREQ" => {
                unit = RepeatUnit::from_freq(&value.to_ascii_uppercase());
                if unit.is_none() {
                    tracing::warn!("Unsupported recurrence frequency {:?}, treating as single event", value);
                    return None;
                }
            }
            "INTERVAL" => interval = value.parse::<u32>().unwrap_or(1).max(1),
            "COUNT" => count = value.parse::<u32>().ok(),
            "UNTIL" => until = parse_until(value),
            "BYDAY" => {
                let days: Vec<&str> = value.split(',').collect();
                let positional = days.iter().any(|d| d.len() > 2);
                if days.len() > 1 || positional {
                    tracing::warn!(rule = body, "Dropping BYDAY={} from recurrence rule", value);
                }
            }
            "BYMONTHDAY" | "BYSETPOS" | "BYMONTH" | "BYYEARDAY" | "BYWEEKNO" | "BYHOUR"
            | "BYMINUTE" => {
                tracing::warn!(rule = body, "Dropping {}={} from recurrence rule", key, value);
            }
            _ => {}
        }
    }

    let unit = unit?;
    let end = match (count, until) {
        (Some(n), _) if n > 0 => RepeatEnd::Count(n),
        (_, Some(end)) => RepeatEnd::Until(end),
        _ => RepeatEnd::Never,
    };

    Some(Recurrence { unit, interval, end })
}

fn parse_until(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim_end_matches('Z');
    if trimmed.len() == 8 {
        // A bare date keeps its whole last day.
        return NaiveDate::parse_from_str(trimmed, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc());
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y%m%dT%H%M%S")
        .ok()
        .map(|dt| dt.and_utc())
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}
