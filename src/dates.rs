//! Textual dates
//!
//! Dates travel as `day/month/year`. Input may be zero-padded (`05/03/2024`), output never is
//! (`5/3/2024`).

use chrono::Datelike;
use chrono::NaiveDate;
use chrono::ParseError;

/// Pattern used to parse incoming dates
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Parse a `day/month/year` date
///
/// Day and month may be written with one or two digits, `5/3/2024` and `05/03/2024` are the
/// same day. Impossible calendar dates (like `31/02/2024`) are rejected
pub fn parse_date(value: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
}

/// Render a date as `day/month/year` without zero padding
pub fn format_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}
