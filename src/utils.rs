use crate::error::{AuditError, Result};
use crate::schema::YearMonth;
use chrono::{Datelike, NaiveDate};

pub fn year_month_of(date: NaiveDate) -> YearMonth {
    YearMonth {
        year: date.year(),
        month: date.month(),
    }
}

/// Every calendar month touched by `[start, end]`, in order, both ends included.
pub fn months_in_period(start: NaiveDate, end: NaiveDate) -> Vec<YearMonth> {
    let mut months = Vec::new();
    if end < start {
        return months;
    }

    let last = year_month_of(end);
    let mut current = year_month_of(start);
    while current <= last {
        months.push(current);
        current = current.next();
    }

    months
}

/// Parses a strict `YYYY-MM-DD` date. `record` names the offending input in the error.
pub fn parse_iso_date(value: &str, record: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| AuditError::InvalidDate {
        record: record.to_string(),
        value: value.to_string(),
    })
}

/// Parses a month key in the format "YYYY-MM".
pub fn parse_year_month(value: &str) -> Result<YearMonth> {
    let trimmed = value.trim();
    let (year_str, month_str) = trimmed
        .split_once('-')
        .ok_or_else(|| AuditError::InvalidYearMonth(value.to_string()))?;

    if year_str.len() != 4 || month_str.len() != 2 {
        return Err(AuditError::InvalidYearMonth(value.to_string()));
    }

    let year: i32 = year_str
        .parse()
        .map_err(|_| AuditError::InvalidYearMonth(value.to_string()))?;
    let month: u32 = month_str
        .parse()
        .map_err(|_| AuditError::InvalidYearMonth(value.to_string()))?;

    if !(1..=12).contains(&month) {
        return Err(AuditError::InvalidYearMonth(value.to_string()));
    }

    Ok(YearMonth { year, month })
}

pub fn eur_mwh_to_eur_kwh(price_eur_mwh: f64) -> f64 {
    price_eur_mwh / 1000.0
}
