//! Column value checkers, dispatched by type tag.

pub mod date;
pub mod email;
pub mod range;

pub use date::{CompareOperand, compare_dates, matches_format, parse_generic};
pub use email::is_valid_email;
pub use range::{LevelMemo, check_range};

use crate::config::{ColumnRule, TypeTag};

const BOOLEAN_LITERALS: [&str; 4] = ["TRUE", "FALSE", "1", "0"];

/// Type acceptance for one column of one row.
///
/// Remembers whether a `maxLengthValidRange` limit was breached, which
/// replaces the plain type mismatch diagnostic.
pub struct TypeCheck<'a> {
    rule: &'a ColumnRule,
    compare: Option<CompareOperand<'a>>,
    format_breached: bool,
}

impl<'a> TypeCheck<'a> {
    pub fn new(rule: &'a ColumnRule, compare: Option<CompareOperand<'a>>) -> Self {
        TypeCheck {
            rule,
            compare,
            format_breached: false,
        }
    }

    pub fn format_breached(&self) -> bool {
        self.format_breached
    }

    /// Try every configured type in order and stop at the first that accepts `value`.
    pub fn accepts_any(&mut self, value: &str) -> bool {
        let rule = self.rule;
        if rule.valid_types.is_empty() {
            return true;
        }
        rule.valid_types.iter().any(|type_tag| self.accepts(type_tag, value))
    }

    pub fn accepts(&mut self, type_tag: &TypeTag, value: &str) -> bool {
        let data = value.to_uppercase();
        let blank_allowed = data.is_empty() && !self.rule.invalid_if_blank;

        match type_tag {
            TypeTag::Email => is_valid_email(&data, self.rule.required),
            TypeTag::Boolean => BOOLEAN_LITERALS.contains(&data.as_str()),
            TypeTag::Integer => {
                blank_allowed || is_integer_text(data.trim())
            }
            TypeTag::Decimal => {
                if !blank_allowed && !data.trim().parse::<f64>().is_ok_and(f64::is_finite) {
                    return false;
                }
                match self.rule.format_limit_for(type_tag) {
                    Some(limit) => self.within_format_limit(fractional_digits(&data) <= limit),
                    None => true,
                }
            }
            TypeTag::String => match self.rule.format_limit_for(type_tag) {
                Some(limit) => self.within_format_limit(data.chars().count() <= limit),
                None => true,
            },
            TypeTag::Datetime => self.accepts_datetime(&data),
            TypeTag::Unknown(_) => false,
        }
    }

    fn within_format_limit(&mut self, within: bool) -> bool {
        self.format_breached = !within;
        within
    }

    fn accepts_datetime(&self, data: &str) -> bool {
        let rule = self.rule;
        let formats = match &rule.date_time_format {
            Some(formats) if !formats.is_empty() => formats,
            _ => return (data.is_empty() && !rule.required) || parse_generic(data).is_some(),
        };

        for format in formats {
            let format_ok = (data.is_empty() && !rule.required) || matches_format(data, format);
            if !format_ok {
                continue;
            }
            if let (Some(operand), Some(comparator)) = (self.compare, &rule.comparator) {
                if !matches!(operand, CompareOperand::Value(text) if text.is_empty()) {
                    return compare_dates(data, operand, comparator, format, rule.required);
                }
            }
            return true;
        }
        false
    }
}

/// Optional sign followed by digits only; the width is not limited.
fn is_integer_text(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Digits after the decimal point, as written.
fn fractional_digits(value: &str) -> usize {
    match value.split_once('.') {
        Some((_, fraction)) => fraction.chars().take_while(char::is_ascii_digit).count(),
        None => 0,
    }
}
