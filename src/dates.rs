use chrono::{Duration, Local, Months, NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("empty posted-date phrase")]
    Empty,
    #[error("unrecognized posted-date phrase: '{0}'")]
    UnknownPhrase(String),
    #[error("unrecognized date unit: '{0}'")]
    UnknownUnit(String),
    #[error("invalid count in date phrase: '{0}'")]
    BadCount(String),
    #[error("date arithmetic out of range for '{0}'")]
    OutOfRange(String),
}

/// Parse a vendor's relative posted-date phrase ("today", "yesterday",
/// "3 days", "2 wks") into a calendar date. Callers decide what to do with
/// an unparseable phrase; adapters skip the record.
pub fn parse_posted(phrase: &str) -> Result<NaiveDate, DateParseError> {
    let now = Local::now().naive_local();
    parse_posted_at(phrase, now.date(), now)
}

/// Deterministic variant used by `parse_posted` and the tests.
pub fn parse_posted_at(
    phrase: &str,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<NaiveDate, DateParseError> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    match words.as_slice() {
        [] => Err(DateParseError::Empty),
        [word] => match word.to_lowercase().as_str() {
            "today" => Ok(today),
            "yesterday" => Ok(today - Duration::days(1)),
            _ => Err(DateParseError::UnknownPhrase(phrase.to_string())),
        },
        [count, unit, ..] => {
            let n: i64 = count
                .parse()
                .map_err(|_| DateParseError::BadCount(count.to_string()))?;
            match unit.to_lowercase().as_str() {
                "hour" | "hours" | "hr" | "hrs" | "h" => Ok((now - Duration::hours(n)).date()),
                "day" | "days" | "d" => Ok(today - Duration::days(n)),
                "week" | "weeks" | "wk" | "wks" | "w" => Ok(today - Duration::weeks(n)),
                "month" | "months" | "mon" | "mons" | "m" => today
                    .checked_sub_months(Months::new(n as u32))
                    .ok_or_else(|| DateParseError::OutOfRange(phrase.to_string())),
                "year" | "years" | "yr" | "yrs" | "y" => today
                    .checked_sub_months(Months::new(n as u32 * 12))
                    .ok_or_else(|| DateParseError::OutOfRange(phrase.to_string())),
                _ => Err(DateParseError::UnknownUnit(unit.to_string())),
            }
        }
    }
}
