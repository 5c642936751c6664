use serde_json::Value;
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

use crate::error::{AppError, FieldError};

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Parses `YYYY-MM-DD`, falling back to the date part of an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(raw, &Rfc3339).ok().map(|t| t.date()))
}

/// Accumulates per-field errors so one response can report all of them.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_error(self) -> AppError {
        AppError::Validation(self.errors)
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    pub fn required_str(&mut self, field: &str, value: Option<String>) -> Option<String> {
        match value.map(|s| s.trim().to_string()) {
            Some(s) if !s.is_empty() => Some(s),
            _ => {
                self.push(field, &format!("{field} is required"));
                None
            }
        }
    }

    pub fn date(&mut self, field: &str, value: Option<&str>) -> Option<Date> {
        match value {
            None => {
                self.push(field, &format!("{field} is required"));
                None
            }
            Some(raw) => self.optional_date(field, Some(raw)),
        }
    }

    pub fn optional_date(&mut self, field: &str, value: Option<&str>) -> Option<Date> {
        let raw = value?;
        let parsed = parse_date(raw);
        if parsed.is_none() {
            self.push(field, &format!("{field} must be an ISO 8601 date"));
        }
        parsed
    }

    /// Accepts a JSON number or a numeric string within `[min, max]`.
    pub fn float_in(&mut self, field: &str, value: Option<&Value>, min: f64, max: f64) -> Option<f64> {
        let n = self.number(field, value)?;
        if n.is_finite() && n >= min && n <= max {
            Some(n)
        } else {
            self.push(field, &format!("{field} must be between {min} and {max}"));
            None
        }
    }

    /// Accepts a whole JSON number or integer string that is at least `min`.
    pub fn int_at_least(&mut self, field: &str, value: Option<&Value>, min: i32) -> Option<i32> {
        let n = self.number(field, value)?;
        if n.fract() != 0.0 || n < f64::from(min) || n > f64::from(i32::MAX) {
            self.push(field, &format!("{field} must be an integer of at least {min}"));
            return None;
        }
        Some(n as i32)
    }

    fn number(&mut self, field: &str, value: Option<&Value>) -> Option<f64> {
        let parsed = match value {
            None | Some(Value::Null) => {
                self.push(field, &format!("{field} is required"));
                return None;
            }
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        if parsed.is_none() {
            self.push(field, &format!("{field} must be a number"));
        }
        parsed
    }
}
