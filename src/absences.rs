use serde::Serialize;

use crate::calc;
use crate::model::PartialSubject;

/// Absence limit for a subject of the given credit load.
///
/// Credit loads missing from the table (1, 9+) fall back to the
/// four-credit limit. Zero-credit subjects share the two-credit limit.
pub fn max_absences(credits: u32) -> u32 {
    match credits {
        0 | 2 => 7,
        3 => 11,
        4 => 14,
        5 => 18,
        6 => 22,
        7 => 25,
        8 => 28,
        _ => 14,
    }
}

pub fn remaining_absences(credits: u32, absences: u32) -> u32 {
    max_absences(credits).saturating_sub(absences)
}

pub fn is_failed_by_absences(credits: u32, absences: u32) -> bool {
    absences > max_absences(credits)
}

/// Failure by absences only counts once every evaluation has been applied.
pub fn is_failed_by_absences_when_complete(subject: &PartialSubject) -> bool {
    if !is_failed_by_absences(subject.credits, subject.absences) {
        return false;
    }
    calc::is_complete(subject)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Seguro,
    Atencao,
    Critico,
    Reprovado,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceRisk {
    pub level: RiskLevel,
    pub percentage: f64,
}

pub fn absence_risk(credits: u32, absences: u32) -> AbsenceRisk {
    let max = max_absences(credits);
    if absences > max {
        return AbsenceRisk {
            level: RiskLevel::Reprovado,
            percentage: 100.0,
        };
    }
    let percentage = (absences as f64 / max as f64) * 100.0;
    let level = if percentage >= 80.0 {
        RiskLevel::Critico
    } else if percentage >= 60.0 {
        RiskLevel::Atencao
    } else {
        RiskLevel::Seguro
    };
    AbsenceRisk { level, percentage }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceInfo {
    pub absences: u32,
    pub max_absences: u32,
    pub remaining: u32,
    pub risk: AbsenceRisk,
    pub failed: bool,
}

pub fn absence_info(credits: u32, absences: u32) -> AbsenceInfo {
    AbsenceInfo {
        absences,
        max_absences: max_absences(credits),
        remaining: remaining_absences(credits, absences),
        risk: absence_risk(credits, absences),
        failed: is_failed_by_absences(credits, absences),
    }
}

/// Absence counter mutations issued by the attendance controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsenceChange {
    Add,
    AddDouble,
    Remove,
    Set(u32),
}

pub fn apply_change(current: u32, change: AbsenceChange) -> u32 {
    match change {
        AbsenceChange::Add => current.saturating_add(1),
        AbsenceChange::AddDouble => current.saturating_add(2),
        AbsenceChange::Remove => current.saturating_sub(1),
        AbsenceChange::Set(n) => n,
    }
}
