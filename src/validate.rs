use crate::calc::POINTS_PER_SUBJECT;
use crate::error::{DomainError, DomainResult};

pub fn name(raw: &str, field: &'static str) -> DomainResult<String> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(DomainError::Missing(field));
    }
    Ok(t.to_string())
}

pub fn score(v: f64, field: &'static str) -> DomainResult<f64> {
    if !(0.0..=100.0).contains(&v) {
        return Err(DomainError::OutOfRange {
            field,
            min: 0.0,
            max: 100.0,
        });
    }
    Ok(v)
}

pub const MAX_CREDITS: u32 = 99;

/// Standalone and in-progress subjects need credits; subjects entered as
/// part of a past period may carry zero (e.g. optional activities without
/// credit).
pub fn credits(v: i64, allow_zero: bool) -> DomainResult<u32> {
    if v < 0 || (v == 0 && !allow_zero) {
        return Err(DomainError::NotPositive("credits"));
    }
    if v > i64::from(MAX_CREDITS) {
        return Err(DomainError::OutOfRange {
            field: "credits",
            min: if allow_zero { 0.0 } else { 1.0 },
            max: f64::from(MAX_CREDITS),
        });
    }
    u32::try_from(v).map_err(|_| DomainError::Invalid("credits is too large".to_string()))
}

pub fn weight(v: f64) -> DomainResult<f64> {
    if v.is_nan() || v <= 0.0 {
        return Err(DomainError::NotPositive("weight"));
    }
    Ok(v)
}

pub fn total_evaluations(v: i64) -> DomainResult<u32> {
    if v < 1 {
        return Err(DomainError::NotPositive("totalEvaluations"));
    }
    u32::try_from(v).map_err(|_| DomainError::Invalid("totalEvaluations is too large".to_string()))
}

pub fn absences(v: i64) -> DomainResult<u32> {
    if v < 0 {
        return Err(DomainError::Invalid(
            "absences cannot be negative".to_string(),
        ));
    }
    u32::try_from(v).map_err(|_| DomainError::Invalid("absences is too large".to_string()))
}

/// Checks one activity against the subject's 100-point budget.
///
/// `consumed_elsewhere` is the total of every other activity of the
/// subject (for an edit, the edited activity is excluded).
pub fn activity(obtained: f64, total: f64, consumed_elsewhere: f64) -> DomainResult<(f64, f64)> {
    if obtained.is_nan() || obtained < 0.0 || total.is_nan() || total <= 0.0 {
        return Err(DomainError::Invalid(
            "activity points must be valid (obtained >= 0, total > 0)".to_string(),
        ));
    }
    if obtained > total {
        return Err(DomainError::Invalid(
            "obtained points cannot exceed the activity total".to_string(),
        ));
    }
    if consumed_elsewhere + total > POINTS_PER_SUBJECT {
        return Err(DomainError::LimitReached(format!(
            "activity would exceed {:.0} points: {:.1} already consumed, at most {:.1} available",
            POINTS_PER_SUBJECT,
            consumed_elsewhere,
            POINTS_PER_SUBJECT - consumed_elsewhere
        )));
    }
    Ok((obtained, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(name("  Calculo I ", "name").expect("name"), "Calculo I");
        assert_eq!(name("   ", "name"), Err(DomainError::Missing("name")));
    }

    #[test]
    fn score_range_is_inclusive() {
        assert!(score(0.0, "score").is_ok());
        assert!(score(100.0, "score").is_ok());
        assert!(score(100.1, "score").is_err());
        assert!(score(f64::NAN, "score").is_err());
    }

    #[test]
    fn credits_zero_only_when_allowed() {
        assert!(credits(0, false).is_err());
        assert_eq!(credits(0, true), Ok(0));
        assert!(credits(-2, true).is_err());
    }

    #[test]
    fn credits_have_an_upper_bound() {
        assert_eq!(credits(99, false), Ok(99));
        let err = credits(100, true).expect_err("too many credits");
        assert_eq!(err.code(), "bad_params");
        assert!(credits(i64::from(u32::MAX), false).is_err());
    }

    #[test]
    fn activity_budget_is_enforced() {
        assert!(activity(8.0, 10.0, 90.0).is_ok());
        assert!(activity(11.0, 10.0, 0.0).is_err());
        let err = activity(5.0, 10.0, 95.0).expect_err("over budget");
        assert_eq!(err.code(), "limit_reached");
    }
}
