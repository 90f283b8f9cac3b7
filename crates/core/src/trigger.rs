// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Trigger evaluation for scheduled jobs
//!
//! A trigger decides when a job fires next: exactly once at a date, at
//! a fixed interval from a start date, or on a cron-style calendar
//! expression evaluated in the job's timezone. All computed fire times
//! are UTC; the timezone applies only while matching calendar fields.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A single field that failed validation, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// The kind of trigger backing a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Date,
    Interval,
    Cron,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Date => write!(f, "date"),
            TriggerKind::Interval => write!(f, "interval"),
            TriggerKind::Cron => write!(f, "cron"),
        }
    }
}

/// One calendar field of a cron trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CronField {
    /// Wildcard: any value matches
    All,
    /// A single concrete value
    Value(u32),
    /// An inclusive range `from-to`
    Range(u32, u32),
    /// Every n-th value (`*/n`)
    Step(u32),
    /// An explicit list of values
    List(Vec<u32>),
}

impl CronField {
    fn render(&self, names: Option<&[&str]>) -> String {
        let show = |v: u32| match names {
            Some(names) => names
                .get(v as usize)
                .map(|n| (*n).to_string())
                .unwrap_or_else(|| v.to_string()),
            None => v.to_string(),
        };
        match self {
            CronField::All => "*".to_string(),
            CronField::Value(v) => show(*v),
            CronField::Range(from, to) => format!("{}-{}", show(*from), show(*to)),
            CronField::Step(n) => format!("*/{}", n),
            CronField::List(values) => values
                .iter()
                .map(|v| show(*v))
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    fn check(&self, name: &str, min: u32, max: u32, errors: &mut Vec<FieldError>) {
        let out_of_range = |v: u32| v < min || v > max;
        match self {
            CronField::All => {}
            CronField::Value(v) if out_of_range(*v) => {
                errors.push(FieldError::new(
                    name,
                    format!("{} outside {}-{}", v, min, max),
                ));
            }
            CronField::Range(from, to) => {
                if out_of_range(*from) || out_of_range(*to) || from > to {
                    errors.push(FieldError::new(
                        name,
                        format!("invalid range {}-{} for {}-{}", from, to, min, max),
                    ));
                }
            }
            CronField::Step(n) if *n == 0 => {
                errors.push(FieldError::new(name, "step must be nonzero"));
            }
            CronField::List(values) => {
                if values.is_empty() {
                    errors.push(FieldError::new(name, "empty list"));
                } else if values.iter().any(|v| out_of_range(*v)) {
                    errors.push(FieldError::new(
                        name,
                        format!("list value outside {}-{}", min, max),
                    ));
                }
            }
            _ => {}
        }
    }
}

/// Day-of-week names indexed by 0 = Sunday, matching standard cron.
/// Rendered as names so the backing parser cannot disagree about
/// numeric weekday conventions.
const DOW_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Calendar fields of a cron trigger
///
/// Defaults fire at second 0 of every minute; narrowing any field
/// narrows the match the way standard cron does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronFields {
    #[serde(default = "CronField::second_default")]
    pub second: CronField,
    #[serde(default = "CronField::all")]
    pub minute: CronField,
    #[serde(default = "CronField::all")]
    pub hour: CronField,
    #[serde(default = "CronField::all")]
    pub day: CronField,
    #[serde(default = "CronField::all")]
    pub month: CronField,
    #[serde(default = "CronField::all")]
    pub day_of_week: CronField,
    #[serde(default = "CronField::all")]
    pub year: CronField,
}

impl CronField {
    fn all() -> Self {
        CronField::All
    }

    fn second_default() -> Self {
        CronField::Value(0)
    }
}

impl Default for CronFields {
    fn default() -> Self {
        Self {
            second: CronField::second_default(),
            minute: CronField::All,
            hour: CronField::All,
            day: CronField::All,
            month: CronField::All,
            day_of_week: CronField::All,
            year: CronField::All,
        }
    }
}

impl CronFields {
    /// Render as a seven-field cron expression (sec min hour dom month dow year)
    pub fn expression(&self) -> String {
        format!(
            "{} {} {} {} {} {} {}",
            self.second.render(None),
            self.minute.render(None),
            self.hour.render(None),
            self.day.render(None),
            self.month.render(None),
            self.day_of_week.render(Some(&DOW_NAMES)),
            self.year.render(None),
        )
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        self.second.check("second", 0, 59, &mut errors);
        self.minute.check("minute", 0, 59, &mut errors);
        self.hour.check("hour", 0, 23, &mut errors);
        self.day.check("day", 1, 31, &mut errors);
        self.month.check("month", 1, 12, &mut errors);
        self.day_of_week.check("day_of_week", 0, 6, &mut errors);
        self.year.check("year", 1970, 2099, &mut errors);

        // Backstop: the rendered expression must parse
        if errors.is_empty() && Schedule::from_str(&self.expression()).is_err() {
            errors.push(FieldError::new("cron", "unparseable field combination"));
        }
        errors
    }

    fn schedule(&self) -> Option<Schedule> {
        Schedule::from_str(&self.expression()).ok()
    }
}

/// When a job fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Fire exactly once at `run_date`
    Date { run_date: DateTime<Utc> },
    /// Fire at `start_date + k * every` until `end_date` passes
    Interval {
        start_date: DateTime<Utc>,
        #[serde(default)]
        end_date: Option<DateTime<Utc>>,
        #[serde(with = "humantime_serde")]
        every: Duration,
    },
    /// Fire whenever the calendar fields match in the job's timezone
    Cron {
        fields: CronFields,
        #[serde(default)]
        start_date: Option<DateTime<Utc>>,
        #[serde(default)]
        end_date: Option<DateTime<Utc>>,
    },
}

impl Trigger {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Date { .. } => TriggerKind::Date,
            Trigger::Interval { .. } => TriggerKind::Interval,
            Trigger::Cron { .. } => TriggerKind::Cron,
        }
    }

    /// The first fire time for a freshly created job.
    ///
    /// A one-shot date in the past still fires (coalesced on the next
    /// scheduler pass); interval and cron triggers start at their first
    /// occurrence at or after `now`.
    pub fn first_fire(&self, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Date { run_date } => Some(*run_date),
            Trigger::Interval { .. } => self.interval_at_or_after(now),
            Trigger::Cron { .. } => self.next_fire(now - ChronoDuration::seconds(1), tz),
        }
    }

    /// The next fire time strictly after `last`, or `None` once the
    /// trigger is exhausted (one-shot already fired, or past end date).
    pub fn next_fire(&self, last: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Date { run_date } => {
                if *run_date > last {
                    Some(*run_date)
                } else {
                    None
                }
            }
            Trigger::Interval {
                start_date,
                end_date,
                every,
            } => {
                let every = ChronoDuration::from_std(*every).ok()?;
                if every <= ChronoDuration::zero() {
                    return None;
                }
                let candidate = if last < *start_date {
                    *start_date
                } else {
                    // smallest start + k*every strictly after last
                    let elapsed = last - *start_date;
                    let k = elapsed.num_seconds().checked_div(every.num_seconds())? + 1;
                    *start_date + ChronoDuration::seconds(k * every.num_seconds())
                };
                match end_date {
                    Some(end) if candidate > *end => None,
                    _ => Some(candidate),
                }
            }
            Trigger::Cron {
                fields,
                start_date,
                end_date,
            } => {
                let schedule = fields.schedule()?;
                let after = match start_date {
                    Some(start) if *start > last => *start - ChronoDuration::seconds(1),
                    _ => last,
                };
                // Calendar fields are matched in local wall-clock time;
                // nonexistent or ambiguous local times resolve to the
                // first valid instant.
                let local = after.with_timezone(&tz);
                let candidate = schedule.after(&local).next()?.with_timezone(&Utc);
                match end_date {
                    Some(end) if candidate > *end => None,
                    _ => Some(candidate),
                }
            }
        }
    }

    /// Validate trigger parameters, reporting every offending field
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        match self {
            Trigger::Date { .. } => {}
            Trigger::Interval {
                start_date,
                end_date,
                every,
            } => {
                if every.as_secs() == 0 {
                    errors.push(FieldError::new("every", "interval must be at least 1s"));
                }
                if let Some(end) = end_date {
                    if end < start_date {
                        errors.push(FieldError::new("end_date", "ends before it starts"));
                    }
                }
            }
            Trigger::Cron {
                fields,
                start_date,
                end_date,
            } => {
                errors.extend(fields.validate());
                if let (Some(start), Some(end)) = (start_date, end_date) {
                    if end < start {
                        errors.push(FieldError::new("end_date", "ends before it starts"));
                    }
                }
            }
        }
        errors
    }

    /// Interval occurrence at or after `at` ( `first_fire` includes the
    /// start date itself, `next_fire` does not)
    fn interval_at_or_after(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let Trigger::Interval {
            start_date,
            end_date,
            every,
        } = self
        else {
            return None;
        };
        let every = ChronoDuration::from_std(*every).ok()?;
        if every <= ChronoDuration::zero() {
            return None;
        }
        let candidate = if at <= *start_date {
            *start_date
        } else {
            let elapsed = at - *start_date;
            let mut k = elapsed.num_seconds().checked_div(every.num_seconds())?;
            if *start_date + ChronoDuration::seconds(k * every.num_seconds()) < at {
                k += 1;
            }
            *start_date + ChronoDuration::seconds(k * every.num_seconds())
        };
        match end_date {
            Some(end) if candidate > *end => None,
            _ => Some(candidate),
        }
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
