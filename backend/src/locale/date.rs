//! Multi-format date parsing.
//!
//! Accepts spreadsheet serial numbers, already-structured dates and strings
//! in the day-monthname-year, day/month/year, month/day/year and ISO
//! year-month-day shapes. `auto` tries the string strategies in that order;
//! an explicit format runs only its own strategy.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{Month, RawCell};

/// Largest accepted serial (9999-12-31).
pub const MAX_SERIAL: f64 = 2_958_465.0;

/// Date format hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYear,
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYear,
    #[serde(rename = "DD-MONTH-YYYY")]
    DayMonthNameYear,
}

impl DateFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DateFormat::Auto => "auto",
            DateFormat::DayMonthYear => "DD/MM/YYYY",
            DateFormat::MonthDayYear => "MM/DD/YYYY",
            DateFormat::DayMonthNameYear => "DD-MONTH-YYYY",
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AUTO" => Ok(DateFormat::Auto),
            "DD/MM/YYYY" | "DMY" => Ok(DateFormat::DayMonthYear),
            "MM/DD/YYYY" | "MDY" => Ok(DateFormat::MonthDayYear),
            "DD-MONTH-YYYY" | "DD-MON-YYYY" => Ok(DateFormat::DayMonthNameYear),
            other => Err(format!(
                "unknown date format '{}' (expected auto, DD/MM/YYYY, MM/DD/YYYY or DD-MONTH-YYYY)",
                other
            )),
        }
    }
}

// Trailing time-of-day text after whitespace or 'T' is ignored.
static MONTH_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[-/.\s]([A-Za-z]+)[-/.\s](\d{2,4})(?:[\sT].*)?$")
        .expect("valid month-name date pattern")
});

static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[-/.](\d{1,2})[-/.](\d{2,4})(?:[\sT].*)?$")
        .expect("valid numeric date pattern")
});

static ISO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})(?:[\sT].*)?$").expect("valid ISO date pattern")
});

static YEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})$").expect("valid year-month pattern"));

static SERIAL_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid serial pattern"));

/// Parse any raw cell into a date-time.
///
/// Numbers are spreadsheet serials. Text goes through the string strategies;
/// under `auto`, purely numeric text that matches none of them is tried as a
/// serial too, since CSV exports carry serials as text. Bare 4- and 6-digit
/// text is a year or `YYYYMM`, never a serial.
pub fn parse_date(cell: &RawCell, format: DateFormat) -> Option<NaiveDateTime> {
    match cell {
        RawCell::Empty => None,
        RawCell::Date(d) => Some(*d),
        RawCell::Number(n) => serial_to_datetime(*n),
        RawCell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Some(date) = parse_date_str(s, format) {
                return date.and_hms_opt(0, 0, 0);
            }
            if format == DateFormat::Auto && SERIAL_TEXT_RE.is_match(s) && !is_year_like(s) {
                return s.parse::<f64>().ok().and_then(serial_to_datetime);
            }
            None
        }
    }
}

/// Parse a date string with the given hint.
pub fn parse_date_str(s: &str, format: DateFormat) -> Option<NaiveDate> {
    let s = s.trim();
    match format {
        DateFormat::Auto => parse_day_month_name_year(s)
            .or_else(|| parse_day_month_year(s))
            .or_else(|| parse_month_day_year(s))
            .or_else(|| parse_iso(s))
            .or_else(|| parse_year_month(s)),
        DateFormat::DayMonthYear => parse_day_month_year(s),
        DateFormat::MonthDayYear => parse_month_day_year(s),
        DateFormat::DayMonthNameYear => parse_day_month_name_year(s),
    }
}

/// `15-Jan-2024`, `08.Mei.25`, `3/Agustus/2024`.
pub fn parse_day_month_name_year(s: &str) -> Option<NaiveDate> {
    let caps = MONTH_NAME_RE.captures(s)?;
    let day = caps[1].parse().ok()?;
    let month = month_from_name(&caps[2])?;
    let year = expand_year(caps[3].parse().ok()?);
    build_date(year, month, day)
}

/// `15/03/2024`, `15-03-24`, `15.03.2024`.
pub fn parse_day_month_year(s: &str) -> Option<NaiveDate> {
    let caps = NUMERIC_RE.captures(s)?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = expand_year(caps[3].parse().ok()?);
    build_date(year, month, day)
}

/// `03/15/2024`, `03-15-24`, `03.15.2024`.
pub fn parse_month_day_year(s: &str) -> Option<NaiveDate> {
    let caps = NUMERIC_RE.captures(s)?;
    let month = caps[1].parse().ok()?;
    let day = caps[2].parse().ok()?;
    let year = expand_year(caps[3].parse().ok()?);
    build_date(year, month, day)
}

/// `2024-03-15`, `2024/3/15`.
pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    let caps = ISO_RE.captures(s)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    build_date(year, month, day)
}

/// `202401` as the first day of that month.
pub fn parse_year_month(s: &str) -> Option<NaiveDate> {
    let caps = YEAR_MONTH_RE.captures(s)?;
    build_date(caps[1].parse().ok()?, caps[2].parse().ok()?, 1)
}

fn is_year_like(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit()) && matches!(s.len(), 4 | 6)
}

/// Convert a spreadsheet serial (day 0 = 1899-12-30) into a date-time,
/// decoding the fractional part as time of day.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc();
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(days as i64))?;

    // Nudge before truncating so 0.5 stays 12:00:00 and not 11:59:59.
    let fraction = serial - days + 0.000_000_1;
    let seconds = ((86_400.0 * fraction) as u32).min(86_399);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
    Some(date.and_time(time))
}

/// Report month of a date.
pub fn month_of<D: Datelike>(date: &D) -> Option<Month> {
    Month::from_number(date.month())
}

/// Report month label of an optional date, "N/A" when missing.
pub fn month_label<D: Datelike>(date: Option<&D>) -> &'static str {
    date.and_then(month_of).map(Month::label).unwrap_or("N/A")
}

/// Two-digit years pivot at 50: `49` → 2049, `50` → 1950.
fn expand_year(year: i32) -> i32 {
    match year {
        0..=49 => 2000 + year,
        50..=99 => 1900 + year,
        _ => year,
    }
}

/// Reconstruct and require an exact day/month/year round-trip.
fn build_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    (date.year() == year && date.month() == month && date.day() == day).then_some(date)
}

/// Indonesian and English month names and abbreviations.
fn month_from_name(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "jan" | "januari" | "january" => 1,
        "feb" | "februari" | "february" => 2,
        "mar" | "maret" | "march" => 3,
        "apr" | "april" => 4,
        "mei" | "may" => 5,
        "jun" | "juni" | "june" => 6,
        "jul" | "juli" | "july" => 7,
        "agu" | "agt" | "agustus" | "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "okt" | "oktober" | "oct" | "october" => 10,
        "nov" | "nopember" | "november" => 11,
        "des" | "desember" | "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}
