use std::collections::{BTreeMap, BTreeSet};

use crate::config::{RangeLimit, RangeRule};
use crate::finding::Finding;
use crate::utils::find_case_insensitive;

/// Last level read from each level-setter column of the current file.
///
/// Refreshed at the start of every data row; `None` when the setter cell is
/// missing or does not start with an integer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelMemo {
    levels: BTreeMap<String, Option<i64>>,
}

impl LevelMemo {
    pub fn new(setters: BTreeSet<String>) -> Self {
        LevelMemo {
            levels: setters.into_iter().map(|setter| (setter, None)).collect(),
        }
    }

    pub fn refresh(&mut self, row: &BTreeMap<String, String>) {
        for (setter, level) in self.levels.iter_mut() {
            *level = find_case_insensitive(row, setter).and_then(|value| leading_integer(value));
        }
    }

    pub fn level(&self, setter: &str) -> Option<i64> {
        self.levels.get(setter).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// The integer a cell starts with: `"7.5"` and `"7th"` are level 7.
pub fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let unsigned = value.trim_start_matches(['+', '-']);
    let sign_len = value.len() - unsigned.len();
    if sign_len > 1 {
        return None;
    }
    let digits = unsigned.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    value[..sign_len + digits].parse().ok()
}

fn resolve_limit(limit: &RangeLimit, depends_on: Option<&str>, memo: &LevelMemo) -> Option<f64> {
    match limit {
        RangeLimit::Value(value) => Some(*value),
        RangeLimit::ByLevel(by_level) => {
            let level = memo.level(depends_on?)?;
            by_level.get(&level.to_string()).copied()
        }
    }
}

/// Check `value` against the column's min/max limits. Limits are inclusive.
///
/// A level-dependent limit that cannot be resolved fails whatever the value;
/// the min/max comparison only applies to numeric values.
pub fn check_range(
    column: &str,
    value: Option<f64>,
    range: &RangeRule,
    depends_on: Option<&str>,
    memo: &LevelMemo,
) -> Option<Finding> {
    let (Some(min_limit), Some(max_limit)) = (&range.min_val, &range.max_val) else {
        return None;
    };

    let missing_limit = || Finding::MissingLevelLimit {
        column: column.to_string(),
        setter: depends_on.unwrap_or_default().to_string(),
    };
    let Some(min) = resolve_limit(min_limit, depends_on, memo) else {
        return Some(missing_limit());
    };
    let Some(max) = resolve_limit(max_limit, depends_on, memo) else {
        return Some(missing_limit());
    };
    let value = value?;

    if value < min {
        return Some(Finding::BelowMinimum {
            column: column.to_string(),
            value,
            limit: min,
        });
    }
    if value > max {
        return Some(Finding::AboveMaximum {
            column: column.to_string(),
            value,
            limit: max,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal_range(min: f64, max: f64) -> RangeRule {
        RangeRule {
            min_val: Some(RangeLimit::Value(min)),
            max_val: Some(RangeLimit::Value(max)),
        }
    }

    fn level_range() -> RangeRule {
        RangeRule {
            min_val: Some(RangeLimit::Value(0.0)),
            max_val: Some(RangeLimit::ByLevel(BTreeMap::from([
                ("6".to_string(), 400.0),
                ("7".to_string(), 433.0),
            ]))),
        }
    }

    fn memo_with_grade(grade: &str) -> LevelMemo {
        let mut memo = LevelMemo::new(BTreeSet::from(["grade".to_string()]));
        memo.refresh(&BTreeMap::from([("Grade".to_string(), grade.to_string())]));
        memo
    }

    #[test]
    fn test_literal_limits_are_inclusive() {
        let memo = LevelMemo::default();
        let range = literal_range(0.0, 4.0);
        assert_eq!(check_range("gpa", Some(0.0), &range, None, &memo), None);
        assert_eq!(check_range("gpa", Some(4.0), &range, None, &memo), None);
        assert_eq!(
            check_range("gpa", Some(4.5), &range, None, &memo).unwrap().to_string(),
            "Value 4.5 for gpa is above the maximum of 4"
        );
        assert_eq!(
            check_range("gpa", Some(-1.0), &range, None, &memo).unwrap().to_string(),
            "Value -1 for gpa is below the minimum of 0"
        );
    }

    #[test]
    fn test_limit_by_level() {
        let range = level_range();
        let memo = memo_with_grade(" 7 ");
        assert_eq!(memo.level("grade"), Some(7));
        assert_eq!(check_range("Science", Some(433.0), &range, Some("grade"), &memo), None);
        assert_eq!(
            check_range("Science", Some(440.0), &range, Some("grade"), &memo)
                .unwrap()
                .to_string(),
            "Value 440 for Science is above the maximum of 433"
        );
    }

    #[test]
    fn test_missing_level_limit() {
        let range = level_range();
        for grade in ["seven", "", "9", "--7", "."] {
            let memo = memo_with_grade(grade);
            for value in [Some(10.0), None] {
                assert_eq!(
                    check_range("Science", value, &range, Some("grade"), &memo)
                        .unwrap()
                        .to_string(),
                    "Value for Science is missing for range limit grade"
                );
            }
        }
    }

    #[test]
    fn test_level_is_the_leading_integer() {
        let range = level_range();
        for grade in ["7", "7.0", "7.5", " +7", "7th"] {
            let memo = memo_with_grade(grade);
            assert_eq!(memo.level("grade"), Some(7), "{grade}");
            assert_eq!(check_range("Science", Some(433.0), &range, Some("grade"), &memo), None);
        }
        assert_eq!(leading_integer("-3"), Some(-3));
        assert_eq!(leading_integer("+"), None);
    }

    #[test]
    fn test_blank_value_skips_literal_limits() {
        let memo = LevelMemo::default();
        assert_eq!(check_range("gpa", None, &literal_range(0.0, 4.0), None, &memo), None);
        let memo = memo_with_grade("6");
        assert_eq!(check_range("Science", None, &level_range(), Some("grade"), &memo), None);
    }
}
