//! "What do I need to reach CR X?" analyses.
//!
//! A target is expressed in the same 0..=100 scale as the grades. Points
//! are `grade * credits`, so a target CR over a set of subjects needs
//! `target * sum(credits)` points in total.

use serde::Serialize;

use crate::calc::{self, POINTS_PER_SUBJECT};
use crate::error::{DomainError, DomainResult};
use crate::model::{CalcMode, PartialSubject, Period, Subject};

pub fn validate_target(target: f64) -> DomainResult<f64> {
    if !(0.0..=100.0).contains(&target) {
        return Err(DomainError::OutOfRange {
            field: "target",
            min: 0.0,
            max: 100.0,
        });
    }
    Ok(target)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetEntry {
    pub name: String,
    pub credits: u32,
    pub current: f64,
    pub available: f64,
}

/// Subjects that take part in the target analysis for `mode`.
///
/// Loose subjects still have `100 - score` points "available"; partial
/// subjects have whatever their activities have not consumed yet.
pub fn target_entries(
    mode: CalcMode,
    subjects: &[Subject],
    periods: &[Period],
    partials: &[PartialSubject],
) -> Vec<TargetEntry> {
    let from_subject = |s: &Subject| TargetEntry {
        name: s.name.clone(),
        credits: s.credits,
        current: s.score,
        available: POINTS_PER_SUBJECT - s.score,
    };
    match mode {
        CalcMode::Parcial => partials
            .iter()
            .filter(|p| p.credits > 0)
            .map(|p| TargetEntry {
                name: p.name.clone(),
                credits: p.credits,
                current: calc::final_grade(p),
                available: POINTS_PER_SUBJECT - calc::points_consumed(&p.activities),
            })
            .collect(),
        CalcMode::Periodo => subjects
            .iter()
            .filter(|s| s.credits > 0)
            .map(from_subject)
            .collect(),
        CalcMode::Curso => periods
            .iter()
            .flat_map(|p| p.subjects.iter())
            .chain(subjects.iter())
            .filter(|s| s.credits > 0)
            .map(from_subject)
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TargetAnalysis {
    /// Nothing left to earn: the CR is final.
    #[serde(rename_all = "camelCase")]
    Complete {
        current_cr: f64,
        target: f64,
        reached: bool,
        gap: f64,
    },
    #[serde(rename_all = "camelCase")]
    Incomplete {
        target: f64,
        complete_subjects: Vec<TargetEntry>,
        incomplete_subjects: Vec<TargetEntry>,
        points_obtained: f64,
        points_needed: f64,
        max_points_possible: f64,
        min_average_needed: f64,
        suggested_points: Vec<f64>,
        total_credits: u64,
        incomplete_credits: u64,
        feasible: bool,
        already_met: bool,
    },
}

pub fn analyze_target(entries: &[TargetEntry], target: f64) -> Option<TargetAnalysis> {
    if entries.is_empty() {
        return None;
    }
    let total_credits: u64 = entries.iter().map(|e| u64::from(e.credits)).sum();
    let points_obtained: f64 = entries.iter().map(|e| e.current * e.credits as f64).sum();
    let points_needed = target * total_credits as f64 - points_obtained;

    let (complete, incomplete): (Vec<TargetEntry>, Vec<TargetEntry>) =
        entries.iter().cloned().partition(|e| e.available <= 0.0);

    if incomplete.is_empty() {
        let current_cr = points_obtained / total_credits as f64;
        return Some(TargetAnalysis::Complete {
            current_cr,
            target,
            reached: current_cr >= target,
            gap: target - current_cr,
        });
    }

    let incomplete_credits: u64 = incomplete.iter().map(|e| u64::from(e.credits)).sum();
    let max_points_possible: f64 = incomplete
        .iter()
        .map(|e| e.available * e.credits as f64)
        .sum();
    let available_total: f64 = incomplete.iter().map(|e| e.available).sum();
    let already_met = points_needed <= 0.0;
    let min_average_needed = if available_total > 0.0 && !already_met && incomplete_credits > 0 {
        points_needed / incomplete_credits as f64
    } else {
        0.0
    };
    let suggested_points = incomplete
        .iter()
        .map(|e| min_average_needed.min(e.available))
        .collect();

    Some(TargetAnalysis::Incomplete {
        target,
        complete_subjects: complete,
        incomplete_subjects: incomplete,
        points_obtained,
        points_needed,
        max_points_possible,
        min_average_needed,
        suggested_points,
        total_credits,
        incomplete_credits,
        feasible: points_needed <= max_points_possible,
        already_met,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    pub simulated_cr: f64,
    pub reached: bool,
    pub points_added: f64,
    pub points_needed: f64,
    pub shortfall: f64,
    pub shortfall_per_credit: f64,
    pub errors: Vec<String>,
}

/// Plays "what if I score `points[i]` in incomplete subject `i`".
///
/// Entries above a subject's available points are reported in `errors`
/// but still counted, so the caller sees both the mistake and its effect.
pub fn simulate(analysis: &TargetAnalysis, points: &[f64]) -> DomainResult<Simulation> {
    let TargetAnalysis::Incomplete {
        target,
        incomplete_subjects,
        points_obtained,
        points_needed,
        total_credits,
        incomplete_credits,
        ..
    } = analysis
    else {
        return Err(DomainError::Invalid(
            "every subject already has a final grade".to_string(),
        ));
    };

    let mut points_added = 0.0_f64;
    let mut errors = Vec::new();
    for (i, entry) in incomplete_subjects.iter().enumerate() {
        let p = points.get(i).copied().unwrap_or(0.0);
        if p > entry.available {
            errors.push(format!(
                "{}: at most {:.1} points available",
                entry.name, entry.available
            ));
        }
        points_added += p * entry.credits as f64;
    }

    let simulated_cr = (points_obtained + points_added) / *total_credits as f64;
    let shortfall = points_needed - points_added;
    let shortfall_per_credit = if shortfall > 0.0 && *incomplete_credits > 0 {
        shortfall / *incomplete_credits as f64
    } else {
        0.0
    };
    Ok(Simulation {
        simulated_cr,
        reached: simulated_cr >= *target,
        points_added,
        points_needed: *points_needed,
        shortfall,
        shortfall_per_credit,
        errors,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CraTarget {
    pub target: f64,
    pub current_cra: f64,
    pub feasible: bool,
    pub average_needed: f64,
    pub points_needed: f64,
    pub max_points_possible: f64,
    pub partial_subjects: Vec<String>,
    pub already_met: bool,
}

/// Average the running term must close with for the CRA to reach `target`.
pub fn analyze_cra_target(
    periods: &[Period],
    partials: &[PartialSubject],
    target: f64,
) -> Option<CraTarget> {
    calc::updated_cra(periods, partials)?;

    let fixed = calc::weighted_mean(
        periods
            .iter()
            .flat_map(|p| p.subjects.iter())
            .filter(|s| s.credits > 0)
            .map(|s| (s.score, s.credits)),
    );
    let fixed_points = fixed.mean * fixed.total_credits as f64;

    let running: Vec<&PartialSubject> = partials
        .iter()
        .filter(|p| p.has_evaluations() && p.credits > 0)
        .collect();
    let partial_credits: u64 = running.iter().map(|p| u64::from(p.credits)).sum();
    let total_credits = fixed.total_credits + partial_credits;

    let points_needed = target * total_credits as f64 - fixed_points;
    let max_points_possible = POINTS_PER_SUBJECT * partial_credits as f64;
    let average_needed = if partial_credits > 0 {
        points_needed / partial_credits as f64
    } else {
        0.0
    };
    let partial_points: f64 = running
        .iter()
        .map(|p| calc::final_grade(p) * p.credits as f64)
        .sum();
    let current_cra = if total_credits > 0 {
        (fixed_points + partial_points) / total_credits as f64
    } else {
        0.0
    };

    Some(CraTarget {
        target,
        current_cra,
        feasible: points_needed <= max_points_possible,
        average_needed,
        points_needed,
        max_points_possible,
        partial_subjects: running.iter().map(|p| p.name.clone()).collect(),
        already_met: current_cra >= target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Activity, EvaluationMode};

    fn entry(name: &str, credits: u32, current: f64, available: f64) -> TargetEntry {
        TargetEntry {
            name: name.to_string(),
            credits,
            current,
            available,
        }
    }

    #[test]
    fn target_must_be_a_percentage() {
        assert!(validate_target(75.0).is_ok());
        assert!(validate_target(-1.0).is_err());
        assert!(validate_target(100.5).is_err());
    }

    #[test]
    fn all_final_grades_report_gap() {
        let entries = vec![entry("A", 4, 70.0, 0.0), entry("B", 2, 40.0, 0.0)];
        let Some(TargetAnalysis::Complete {
            current_cr,
            reached,
            gap,
            ..
        }) = analyze_target(&entries, 65.0)
        else {
            panic!("expected complete analysis");
        };
        assert!((current_cr - 60.0).abs() < 1e-9);
        assert!(!reached);
        assert!((gap - 5.0).abs() < 1e-9);
    }

    #[test]
    fn incomplete_analysis_needs_per_credit_average() {
        // A: done at 80 (4 cr). B: 20 so far, 50 points still open (2 cr).
        let entries = vec![entry("A", 4, 80.0, 0.0), entry("B", 2, 20.0, 50.0)];
        let Some(TargetAnalysis::Incomplete {
            points_obtained,
            points_needed,
            max_points_possible,
            min_average_needed,
            feasible,
            already_met,
            suggested_points,
            ..
        }) = analyze_target(&entries, 70.0)
        else {
            panic!("expected incomplete analysis");
        };
        assert_eq!(points_obtained, 360.0);
        assert_eq!(points_needed, 60.0);
        assert_eq!(max_points_possible, 100.0);
        assert_eq!(min_average_needed, 30.0);
        assert_eq!(suggested_points, vec![30.0]);
        assert!(feasible);
        assert!(!already_met);
    }

    #[test]
    fn simulation_flags_points_above_available() {
        let entries = vec![entry("A", 4, 80.0, 0.0), entry("B", 2, 20.0, 50.0)];
        let analysis = analyze_target(&entries, 70.0).expect("analysis");

        let sim = simulate(&analysis, &[30.0]).expect("simulate");
        assert!(sim.reached);
        assert!((sim.simulated_cr - 70.0).abs() < 1e-9);
        assert!(sim.errors.is_empty());

        let sim = simulate(&analysis, &[10.0]).expect("simulate");
        assert!(!sim.reached);
        assert_eq!(sim.shortfall, 40.0);
        assert_eq!(sim.shortfall_per_credit, 20.0);

        let sim = simulate(&analysis, &[60.0]).expect("simulate");
        assert_eq!(sim.errors.len(), 1);
    }

    #[test]
    fn simulation_rejects_complete_analysis() {
        let analysis = analyze_target(&[entry("A", 4, 80.0, 0.0)], 70.0).expect("analysis");
        assert!(simulate(&analysis, &[]).is_err());
    }

    #[test]
    fn cra_target_over_periods_and_running_term() {
        let periods = vec![Period {
            id: "p1".into(),
            number: 1,
            name: "1º Período".into(),
            subjects: vec![Subject {
                id: "s".into(),
                name: "Algebra".into(),
                score: 80.0,
                credits: 4,
            }],
        }];
        let partials = vec![PartialSubject {
            id: "q".into(),
            name: "Calculo".into(),
            credits: 4,
            mode: Some(EvaluationMode::Pontos),
            activities: vec![Activity {
                id: "a".into(),
                name: None,
                obtained: 30.0,
                total: 40.0,
            }],
            exams: vec![],
            total_evaluations: None,
            absences: 0,
        }];

        let t = analyze_cra_target(&periods, &partials, 75.0).expect("cra target");
        assert_eq!(t.points_needed, 280.0);
        assert_eq!(t.average_needed, 70.0);
        assert_eq!(t.max_points_possible, 400.0);
        assert!(t.feasible);
        assert!((t.current_cra - 55.0).abs() < 1e-9);
        assert!(!t.already_met);
        assert_eq!(t.partial_subjects, vec!["Calculo".to_string()]);

        assert!(analyze_cra_target(&[], &[], 75.0).is_none());
    }
}
