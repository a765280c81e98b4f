//! Parsing of the free-text form fields that accompany an upload.

use crate::allocation::QuotaPlan;
use crate::error::AppError;
use crate::selection::KeywordSet;

/// Parses a daily plan: one non-negative integer per line.
///
/// Blank lines are ignored and surrounding whitespace is trimmed. Line
/// numbers in errors are 1-based and count blank lines.
pub fn parse_quota_plan(text: &str) -> Result<QuotaPlan, AppError> {
    let mut days = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let count = trimmed
            .parse::<u64>()
            .map_err(|_| AppError::InvalidQuotaEntry {
                line: i + 1,
                value: trimmed.to_string(),
            })?;
        days.push(count);
    }

    Ok(QuotaPlan::new(days))
}

/// Parses exclusion keywords separated by commas or newlines.
pub fn parse_keywords(text: &str) -> KeywordSet {
    KeywordSet::new(
        text.split([',', '\n', '\r'])
            .map(str::trim)
            .filter(|k| !k.is_empty()),
    )
}

/// Parses one percentage field.
///
/// Accepts an optional trailing `%` and a decimal comma.
pub fn parse_percentage(text: &str) -> Result<f64, AppError> {
    let trimmed = text.trim();
    let cleaned = trimmed.trim_end_matches('%').trim().replace(',', ".");

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(AppError::InvalidPercentage {
            value: trimmed.to_string(),
        }),
    }
}

/// Parses up to two percentage fields; empty fields are skipped.
pub fn parse_percentages<'a, I>(fields: I) -> Result<Vec<f64>, AppError>
where
    I: IntoIterator<Item = &'a str>,
{
    fields
        .into_iter()
        .filter(|f| !f.trim().is_empty())
        .map(parse_percentage)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_skips_blank_lines() {
        let plan = parse_quota_plan("10\n\n  20 \r\n\n5\n").unwrap();
        assert_eq!(plan.days(), &[10, 20, 5]);
        assert_eq!(plan.total(), 35);
    }

    #[test]
    fn plan_accepts_zero_days() {
        let plan = parse_quota_plan("0\n3\n").unwrap();
        assert_eq!(plan.days(), &[0, 3]);
    }

    #[test]
    fn plan_rejects_negative_with_line_number() {
        let err = parse_quota_plan("5\n\n-3\n").unwrap_err();
        match err {
            AppError::InvalidQuotaEntry { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "-3");
            }
            other => panic!("Expected InvalidQuotaEntry, got {:?}", other),
        }
    }

    #[test]
    fn plan_rejects_non_integer() {
        assert!(matches!(
            parse_quota_plan("1.5"),
            Err(AppError::InvalidQuotaEntry { line: 1, .. })
        ));
        assert!(matches!(
            parse_quota_plan("ten"),
            Err(AppError::InvalidQuotaEntry { line: 1, .. })
        ));
    }

    #[test]
    fn empty_plan_is_empty() {
        assert!(parse_quota_plan("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn keywords_split_on_commas_and_newlines() {
        let set = parse_keywords("gmail.com, spam\n\n  test ,");
        assert_eq!(set.terms(), &["gmail.com", "spam", "test"]);
        assert!(parse_keywords("  , \n").is_empty());
    }

    #[test]
    fn percentages_parse_variants() {
        assert_eq!(parse_percentage("70").unwrap(), 70.0);
        assert_eq!(parse_percentage(" 12.5% ").unwrap(), 12.5);
        assert_eq!(parse_percentage("33,3").unwrap(), 33.3);
        assert!(parse_percentage("-1").is_err());
        assert!(parse_percentage("abc").is_err());
        assert!(parse_percentage("NaN").is_err());
        assert!(parse_percentage("inf").is_err());
    }

    #[test]
    fn percentages_skip_empty_fields() {
        assert_eq!(parse_percentages(["70", ""]).unwrap(), vec![70.0]);
        assert!(parse_percentages(["", " "]).unwrap().is_empty());
    }
}
