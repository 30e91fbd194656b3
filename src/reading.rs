//! A single timestamped probe reading and its wire format.
//!
//! On the wire a reading is the UTF-8 text `"<timestamp>, <value>"`.
//! Consumers tolerate any whitespace around either field.

use std::fmt;

use crate::error::ParseError;

/// A temperature reading from one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Opaque timestamp label copied from the source row.
    pub timestamp: String,
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }

    /// Parse a message body.
    ///
    /// The value is the last comma-separated field; everything before the
    /// final comma is the timestamp.
    pub fn parse(body: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(body).map_err(|_| ParseError::Encoding)?;
        let (timestamp, value) = text
            .rsplit_once(',')
            .ok_or_else(|| ParseError::Shape(text.trim().to_string()))?;
        let value = parse_temperature(value).ok_or_else(|| ParseError::Value(value.trim().to_string()))?;
        Ok(Self::new(timestamp.trim(), value))
    }

    /// Encode for publishing.
    pub fn to_body(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.timestamp, format_temperature(self.value))
    }
}

/// Parse a decimal temperature field. Blank and non-finite fields are rejected.
pub fn parse_temperature(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a temperature with at least one decimal place ("225.0", "224.6").
pub fn format_temperature(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_producer_format() {
        let reading = Reading::parse(b"6/4/24 16:00:30, 225.6").unwrap();
        assert_eq!(reading.timestamp, "6/4/24 16:00:30");
        assert_eq!(reading.value, 225.6);
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let reading = Reading::parse(b"  12:00 ,100.0  ").unwrap();
        assert_eq!(reading, Reading::new("12:00", 100.0));

        let reading = Reading::parse(b"12:00,\t-3.5\n").unwrap();
        assert_eq!(reading.value, -3.5);
    }

    #[test]
    fn test_parse_uses_last_comma() {
        let reading = Reading::parse(b"Jun 4, 2024 12:00, 98.2").unwrap();
        assert_eq!(reading.timestamp, "Jun 4, 2024 12:00");
        assert_eq!(reading.value, 98.2);
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(
            Reading::parse(b"12:00, hot"),
            Err(ParseError::Value("hot".to_string()))
        );
        assert_eq!(
            Reading::parse(b"12:00,"),
            Err(ParseError::Value(String::new()))
        );
        assert_eq!(
            Reading::parse(b"225.0"),
            Err(ParseError::Shape("225.0".to_string()))
        );
        assert_eq!(Reading::parse(&[0xff, 0xfe, b',', b'1']), Err(ParseError::Encoding));
        assert!(matches!(Reading::parse(b"12:00, NaN"), Err(ParseError::Value(_))));
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(Reading::new("12:00", 225.0).to_string(), "12:00, 225.0");
        assert_eq!(Reading::new("12:00", 224.6).to_string(), "12:00, 224.6");
        assert_eq!(Reading::new("t", -15.0).to_body(), b"t, -15.0".to_vec());
    }

    #[test]
    fn test_body_round_trip() {
        let reading = Reading::new("6/4/24 16:01:00", 221.3);
        assert_eq!(Reading::parse(&reading.to_body()), Ok(reading));
    }
}
