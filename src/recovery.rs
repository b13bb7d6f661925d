use serde::Serialize;

use crate::absences;
use crate::calc;
use crate::model::PartialSubject;

pub const PASSING_GRADE: f64 = 60.0;
pub const RECOVERY_FLOOR: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectStatus {
    Aprovado,
    /// Eligible for the recovery exam.
    Final,
    ReprovadoNota,
    ReprovadoFaltas,
    EmAndamento,
}

/// Verdict for a finished term grade.
pub fn subject_status(grade: f64, credits: u32, absences: u32) -> SubjectStatus {
    if absences::is_failed_by_absences(credits, absences) {
        return SubjectStatus::ReprovadoFaltas;
    }
    if grade >= PASSING_GRADE {
        SubjectStatus::Aprovado
    } else if grade >= RECOVERY_FLOOR {
        SubjectStatus::Final
    } else {
        SubjectStatus::ReprovadoNota
    }
}

/// Like `subject_status`, but a subject with evaluations still pending is
/// reported as in progress instead of judged on a partial grade.
pub fn partial_status(subject: &PartialSubject) -> SubjectStatus {
    if absences::is_failed_by_absences(subject.credits, subject.absences) {
        return SubjectStatus::ReprovadoFaltas;
    }
    if !calc::is_complete(subject) {
        return SubjectStatus::EmAndamento;
    }
    subject_status(calc::final_grade(subject), subject.credits, subject.absences)
}

/// Recovery grade needed so that the mean with the term grade reaches 60.
pub fn min_recovery_grade(grade: f64) -> f64 {
    (PASSING_GRADE * 2.0 - grade).clamp(0.0, 100.0)
}

pub fn grade_after_recovery(grade: f64, recovery_grade: f64) -> f64 {
    calc::round_academic((grade + recovery_grade) / 2.0)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    pub grade: f64,
    pub status: SubjectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_recovery_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
}

pub fn recovery_report(
    grade: f64,
    credits: u32,
    absences: u32,
    recovery_grade: Option<f64>,
) -> RecoveryReport {
    let status = subject_status(grade, credits, absences);
    let mut report = RecoveryReport {
        grade,
        status,
        min_recovery_grade: None,
        recovery_grade: None,
        final_grade: None,
        passed: None,
    };
    if status != SubjectStatus::Final {
        return report;
    }
    report.min_recovery_grade = Some(min_recovery_grade(grade));
    if let Some(rec) = recovery_grade {
        let final_grade = grade_after_recovery(grade, rec);
        report.recovery_grade = Some(rec);
        report.final_grade = Some(final_grade);
        report.passed = Some(final_grade >= PASSING_GRADE);
    }
    report
}
