//! Spanish long-form dates as shown in campaign UIs
//!
//! Accepted shape: `"<weekday>, <day> de <month>"`, for example
//! `"viernes, 19 de septiembre"`. The weekday is ignored, the day is 1-31
//! (checked against the month) and the month is a full Spanish month name,
//! matched case-insensitively. No year is accepted.

const MONTHS: [(&str, u32); 12] = [
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpanishDateError {
    #[error("expected '<weekday>, <day> de <month>', found no comma in '{0}'")]
    MissingComma(String),

    #[error("expected '<day> de <month>' after the comma in '{0}'")]
    MissingSeparator(String),

    #[error("invalid day '{0}'")]
    InvalidDay(String),

    #[error("unknown month name '{0}'")]
    UnknownMonth(String),
}

/// Month number (1-12) for a Spanish month name
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.trim().to_lowercase();
    MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, number)| *number)
}

/// Parse into `(month, day)`
pub fn parse_day_month(input: &str) -> Result<(u32, u32), SpanishDateError> {
    let (_, rest) = input
        .split_once(',')
        .ok_or_else(|| SpanishDateError::MissingComma(input.to_string()))?;

    let rest = rest.trim().to_lowercase();
    let (day, month) = rest
        .split_once(" de ")
        .ok_or_else(|| SpanishDateError::MissingSeparator(input.to_string()))?;

    let day: u32 = day
        .trim()
        .parse()
        .map_err(|_| SpanishDateError::InvalidDay(day.trim().to_string()))?;
    let month_num =
        month_number(month).ok_or_else(|| SpanishDateError::UnknownMonth(month.trim().to_string()))?;

    if day == 0 || day > days_in_month(month_num) {
        return Err(SpanishDateError::InvalidDay(day.to_string()));
    }

    Ok((month_num, day))
}

/// Upper bound without a year, so February allows the 29th
fn days_in_month(month: u32) -> u32 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}
