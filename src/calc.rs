use serde::Serialize;

use crate::absences::{self, AbsenceInfo};
use crate::model::{Activity, CalcMode, CalcResult, EvaluationMode, PartialSubject, Period, Subject};
use crate::recovery::{self, SubjectStatus};

/// Points a point-accumulation subject distributes over the term.
pub const POINTS_PER_SUBJECT: f64 = 100.0;

/// Academic rounding to whole points, half-up: 86.5 -> 87, 86.4 -> 86.
pub fn round_academic(x: f64) -> f64 {
    (x + 0.5).floor()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedMean {
    pub mean: f64,
    pub total_credits: u64,
    pub count: usize,
}

/// Credit-weighted mean over `(score, credits)` pairs.
///
/// Zero total credits yields a mean of 0 rather than NaN.
pub fn weighted_mean<I>(items: I) -> WeightedMean
where
    I: IntoIterator<Item = (f64, u32)>,
{
    let mut sum = 0.0_f64;
    let mut total_credits: u64 = 0;
    let mut count: usize = 0;
    for (score, credits) in items {
        sum += score * f64::from(credits);
        total_credits += u64::from(credits);
        count += 1;
    }
    let mean = if total_credits > 0 {
        sum / total_credits as f64
    } else {
        0.0
    };
    WeightedMean {
        mean,
        total_credits,
        count,
    }
}

pub fn points_obtained(activities: &[Activity]) -> f64 {
    let sum: f64 = activities.iter().map(|a| a.obtained).sum();
    sum.min(POINTS_PER_SUBJECT)
}

pub fn points_consumed(activities: &[Activity]) -> f64 {
    activities.iter().map(|a| a.total).sum()
}

/// Exam average where exams not yet applied count as grade 0 with weight 1.
pub fn exam_average(subject: &PartialSubject) -> f64 {
    if subject.exams.is_empty() {
        return 0.0;
    }
    let sum: f64 = subject.exams.iter().map(|e| e.grade * e.weight).sum();
    let weights: f64 = subject.exams.iter().map(|e| e.weight).sum();
    let missing = subject
        .total_evaluations()
        .saturating_sub(subject.exams.len() as u32);
    let denom = weights + missing as f64;
    if denom > 0.0 {
        sum / denom
    } else {
        0.0
    }
}

/// Unrounded grade under the subject's evaluation mode.
pub fn mode_grade(subject: &PartialSubject) -> f64 {
    match subject.mode() {
        EvaluationMode::Pontos => points_obtained(&subject.activities),
        EvaluationMode::Medias => exam_average(subject),
    }
}

/// Grade that feeds the partial CR. Failing by absences zeroes it.
pub fn final_grade(subject: &PartialSubject) -> f64 {
    if absences::is_failed_by_absences(subject.credits, subject.absences) {
        return 0.0;
    }
    let grade = mode_grade(subject);
    if grade > 0.0 {
        round_academic(grade)
    } else {
        0.0
    }
}

pub fn progress(subject: &PartialSubject) -> f64 {
    match subject.mode() {
        EvaluationMode::Medias => {
            let total = subject.total_evaluations();
            if total == 0 {
                return 0.0;
            }
            (subject.exams.len() as f64 / total as f64) * 100.0
        }
        EvaluationMode::Pontos => points_consumed(&subject.activities),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum Remaining {
    Evaluations(u32),
    Points(f64),
}

pub fn remaining(subject: &PartialSubject) -> Remaining {
    match subject.mode() {
        EvaluationMode::Medias => Remaining::Evaluations(
            subject
                .total_evaluations()
                .saturating_sub(subject.exams.len() as u32),
        ),
        EvaluationMode::Pontos => {
            Remaining::Points(POINTS_PER_SUBJECT - points_consumed(&subject.activities))
        }
    }
}

/// True once every evaluation of the subject has been applied.
pub fn is_complete(subject: &PartialSubject) -> bool {
    match subject.mode() {
        EvaluationMode::Medias => subject.exams.len() as u32 >= subject.total_evaluations(),
        EvaluationMode::Pontos => {
            !subject.activities.is_empty()
                && points_consumed(&subject.activities) >= POINTS_PER_SUBJECT
        }
    }
}

pub fn can_add_exam(subject: &PartialSubject) -> bool {
    subject.mode() == EvaluationMode::Medias
        && (subject.exams.len() as u32) < subject.total_evaluations()
}

pub fn period_mean(period: &Period) -> WeightedMean {
    weighted_mean(period.subjects.iter().map(|s| (s.score, s.credits)))
}

fn to_result(wm: WeightedMean) -> Option<CalcResult> {
    if wm.count == 0 {
        return None;
    }
    Some(CalcResult {
        mean: wm.mean,
        total_credits: wm.total_credits,
        total_subjects: wm.count,
    })
}

/// Headline CR for the selected mode. `None` means nothing to average yet.
pub fn compute_result(
    mode: CalcMode,
    subjects: &[Subject],
    periods: &[Period],
    partials: &[PartialSubject],
) -> Option<CalcResult> {
    match mode {
        CalcMode::Periodo => to_result(weighted_mean(
            subjects.iter().map(|s| (s.score, s.credits)),
        )),
        CalcMode::Curso => to_result(weighted_mean(
            periods
                .iter()
                .flat_map(|p| p.subjects.iter())
                .chain(subjects.iter())
                .map(|s| (s.score, s.credits)),
        )),
        CalcMode::Parcial => to_result(weighted_mean(
            partials
                .iter()
                .filter(|p| p.has_evaluations())
                .map(|p| (final_grade(p), p.credits)),
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedCra {
    pub cra: f64,
    pub total_credits: u64,
    pub total_subjects: usize,
    pub completed_subjects: usize,
    pub partial_subjects: usize,
}

/// CRA over completed periods plus the running term's evaluated subjects.
pub fn updated_cra(periods: &[Period], partials: &[PartialSubject]) -> Option<UpdatedCra> {
    let completed: Vec<&Subject> = periods
        .iter()
        .flat_map(|p| p.subjects.iter())
        .filter(|s| s.credits > 0)
        .collect();
    let running: Vec<&PartialSubject> = partials
        .iter()
        .filter(|p| p.has_evaluations() && p.credits > 0)
        .collect();
    if completed.is_empty() && running.is_empty() {
        return None;
    }
    let wm = weighted_mean(
        completed
            .iter()
            .map(|s| (s.score, s.credits))
            .chain(running.iter().map(|p| (final_grade(p), p.credits))),
    );
    Some(UpdatedCra {
        cra: wm.mean,
        total_credits: wm.total_credits,
        total_subjects: wm.count,
        completed_subjects: completed.len(),
        partial_subjects: running.len(),
    })
}

/// Derived view of a partial subject as the list screen shows it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSummary {
    #[serde(flatten)]
    pub subject: PartialSubject,
    pub grade: f64,
    pub current_average: f64,
    pub points_consumed: f64,
    pub progress: f64,
    pub remaining: Remaining,
    pub complete: bool,
    pub can_add_exam: bool,
    pub status: SubjectStatus,
    pub absence: AbsenceInfo,
    /// Over the limit with every evaluation applied: no way back.
    pub definitively_failed_by_absences: bool,
}

pub fn summarize_partial(subject: &PartialSubject) -> PartialSummary {
    let grade = final_grade(subject);
    PartialSummary {
        grade,
        current_average: mode_grade(subject),
        points_consumed: points_consumed(&subject.activities),
        progress: progress(subject),
        remaining: remaining(subject),
        complete: is_complete(subject),
        can_add_exam: can_add_exam(subject),
        status: recovery::partial_status(subject),
        absence: absences::absence_info(subject.credits, subject.absences),
        definitively_failed_by_absences: absences::is_failed_by_absences_when_complete(subject),
        subject: subject.clone(),
    }
}
