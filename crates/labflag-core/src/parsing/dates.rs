use crate::error::LabError;
use chrono::NaiveDate;

/// Formats tried when the caller does not configure any.
pub const DEFAULT_DATE_FORMATS: &[&str] = &["YYYY-MM-DD", "MM/DD/YYYY", "DD-Mon-YYYY", "YYYY/MM/DD"];

/// Outcome of parsing one date cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCell {
    Absent,
    Parsed(NaiveDate),
    /// Non-blank but no candidate format matched.
    Invalid,
}

/// Ordered list of candidate date formats, compiled to chrono patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormats {
    patterns: Vec<String>,
}

impl Default for DateFormats {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_DATE_FORMATS
                .iter()
                .map(|f| translate_format(f))
                .collect(),
        }
    }
}

impl DateFormats {
    /// Compile formats given either as `YYYY-MM-DD` style tokens or as
    /// chrono `%` patterns.
    pub fn new<S: AsRef<str>>(formats: &[S]) -> Result<Self, LabError> {
        if formats.is_empty() {
            return Err(LabError::Config("date format list must not be empty".into()));
        }

        let mut patterns = Vec::with_capacity(formats.len());
        for format in formats {
            let format = format.as_ref();
            let pattern = translate_format(format);
            let has_year = pattern.contains("%Y") || pattern.contains("%y");
            let has_month = pattern.contains("%m") || pattern.contains("%b") || pattern.contains("%B");
            let has_day = pattern.contains("%d") || pattern.contains("%e");
            if !(has_year && has_month && has_day) {
                return Err(LabError::Config(format!(
                    "date format '{}' must contain a year, month and day",
                    format
                )));
            }
            patterns.push(pattern);
        }

        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Parse a date cell; the first matching format wins.
    ///
    /// A trailing time part ("2025-01-02 08:30", "2025-01-02T08:30:00") is
    /// ignored when the whole cell does not parse.
    pub fn parse(&self, raw: &str) -> DateCell {
        let raw = raw.trim();
        if raw.is_empty() {
            return DateCell::Absent;
        }

        if let Some(date) = self.try_patterns(raw) {
            return DateCell::Parsed(date);
        }

        if let Some((date_part, _)) = raw.split_once([' ', 'T']) {
            if let Some(date) = self.try_patterns(date_part) {
                return DateCell::Parsed(date);
            }
        }

        DateCell::Invalid
    }

    fn try_patterns(&self, s: &str) -> Option<NaiveDate> {
        self.patterns
            .iter()
            .find_map(|p| NaiveDate::parse_from_str(s, p).ok())
    }
}

/// Translate `YYYY`/`YY`/`MM`/`DD`/`Mon`/`Month` tokens to chrono specifiers.
/// Patterns already containing `%` pass through unchanged.
fn translate_format(format: &str) -> String {
    if format.contains('%') {
        return format.to_string();
    }
    format
        .replace("YYYY", "%Y")
        .replace("YY", "%y")
        .replace("Month", "%B")
        .replace("Mon", "%b")
        .replace("MM", "%m")
        .replace("DD", "%d")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_translate_tokens() {
        assert_eq!(translate_format("YYYY-MM-DD"), "%Y-%m-%d");
        assert_eq!(translate_format("MM/DD/YYYY"), "%m/%d/%Y");
        assert_eq!(translate_format("DD-Mon-YYYY"), "%d-%b-%Y");
        assert_eq!(translate_format("%d.%m.%Y"), "%d.%m.%Y");
    }

    #[test]
    fn test_iso_and_us_formats_agree() {
        let formats = DateFormats::new(&["YYYY-MM-DD", "MM/DD/YYYY"]).unwrap();
        assert_eq!(formats.parse("2025-01-02"), DateCell::Parsed(ymd(2025, 1, 2)));
        assert_eq!(formats.parse("01/02/2025"), DateCell::Parsed(ymd(2025, 1, 2)));
    }

    #[test]
    fn test_first_format_wins() {
        let us = DateFormats::new(&["MM/DD/YYYY", "DD/MM/YYYY"]).unwrap();
        assert_eq!(us.parse("03/04/2025"), DateCell::Parsed(ymd(2025, 3, 4)));
        let eu = DateFormats::new(&["DD/MM/YYYY", "MM/DD/YYYY"]).unwrap();
        assert_eq!(eu.parse("03/04/2025"), DateCell::Parsed(ymd(2025, 4, 3)));
    }

    #[test]
    fn test_month_abbreviation() {
        let formats = DateFormats::default();
        assert_eq!(formats.parse("02-Jan-2025"), DateCell::Parsed(ymd(2025, 1, 2)));
    }

    #[test]
    fn test_time_suffix_ignored() {
        let formats = DateFormats::default();
        assert_eq!(
            formats.parse("2025-01-02 08:30"),
            DateCell::Parsed(ymd(2025, 1, 2))
        );
        assert_eq!(
            formats.parse("2025-01-02T08:30:00"),
            DateCell::Parsed(ymd(2025, 1, 2))
        );
    }

    #[test]
    fn test_unparseable_and_absent() {
        let formats = DateFormats::default();
        assert_eq!(formats.parse("N/A"), DateCell::Invalid);
        assert_eq!(formats.parse("2025-13-40"), DateCell::Invalid);
        assert_eq!(formats.parse("   "), DateCell::Absent);
    }

    #[test]
    fn test_format_without_day_rejected() {
        assert!(DateFormats::new(&["YYYY-MM"]).is_err());
        let empty: [&str; 0] = [];
        assert!(DateFormats::new(&empty).is_err());
    }
}
