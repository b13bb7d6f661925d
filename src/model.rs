use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A finished course subject: final score out of 100 and its credit weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "nota")]
    pub score: f64,
    #[serde(alias = "creditos")]
    pub credits: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(default, alias = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(alias = "notaObtida")]
    pub obtained: f64,
    #[serde(alias = "notaTotal")]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "nota")]
    pub grade: f64,
    #[serde(alias = "peso")]
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Activities hand out points until the subject's 100 points are spent.
    #[default]
    Pontos,
    /// Weighted average over a fixed number of exams.
    Medias,
}

impl EvaluationMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pontos" => Some(Self::Pontos),
            "medias" => Some(Self::Medias),
            _ => None,
        }
    }
}

pub const DEFAULT_TOTAL_EVALUATIONS: u32 = 4;

/// A subject of the running term, graded incrementally.
///
/// `mode` is optional on disk: records written before exam support carry
/// no mode and are read back as point accumulation. Field aliases accept
/// the Portuguese names used by browser-era backups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSubject {
    pub id: String,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "creditos")]
    pub credits: u32,
    #[serde(default, alias = "modalidade")]
    pub mode: Option<EvaluationMode>,
    #[serde(default, alias = "atividades")]
    pub activities: Vec<Activity>,
    #[serde(default, alias = "provas")]
    pub exams: Vec<Exam>,
    #[serde(
        default,
        alias = "totalAvaliacoes",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_evaluations: Option<u32>,
    #[serde(default, alias = "faltas")]
    pub absences: u32,
}

impl PartialSubject {
    pub fn mode(&self) -> EvaluationMode {
        self.mode.unwrap_or_default()
    }

    pub fn total_evaluations(&self) -> u32 {
        self.total_evaluations.unwrap_or(DEFAULT_TOTAL_EVALUATIONS)
    }

    pub fn has_evaluations(&self) -> bool {
        match self.mode() {
            EvaluationMode::Pontos => !self.activities.is_empty(),
            EvaluationMode::Medias => !self.exams.is_empty(),
        }
    }

    pub fn activity_mut(&mut self, activity_id: &str) -> Option<&mut Activity> {
        self.activities.iter_mut().find(|a| a.id == activity_id)
    }

    pub fn exam_mut(&mut self, exam_id: &str) -> Option<&mut Exam> {
        self.exams.iter_mut().find(|e| e.id == exam_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub id: String,
    #[serde(alias = "numero")]
    pub number: u32,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "disciplinas")]
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcMode {
    #[default]
    Periodo,
    Curso,
    Parcial,
}

impl CalcMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "periodo" => Some(Self::Periodo),
            "curso" => Some(Self::Curso),
            "parcial" => Some(Self::Parcial),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Periodo => "periodo",
            Self::Curso => "curso",
            Self::Parcial => "parcial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalcResult {
    pub mean: f64,
    pub total_credits: u64,
    pub total_subjects: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_without_mode_reads_as_points() {
        let raw = serde_json::json!({
            "id": "p1",
            "name": "Calculo I",
            "credits": 4,
            "activities": [{ "id": "a1", "obtained": 8.0, "total": 10.0 }]
        });
        let p: PartialSubject = serde_json::from_value(raw).expect("parse partial");
        assert_eq!(p.mode, None);
        assert_eq!(p.mode(), EvaluationMode::Pontos);
        assert!(p.exams.is_empty());
        assert_eq!(p.absences, 0);
        assert_eq!(p.total_evaluations(), DEFAULT_TOTAL_EVALUATIONS);
        assert!(p.has_evaluations());
    }

    #[test]
    fn browser_backup_field_names_are_accepted() {
        let raw = serde_json::json!({
            "id": "1700000000000abc",
            "nome": "Fisica I",
            "creditos": 3,
            "modalidade": "medias",
            "atividades": [],
            "provas": [{ "id": "e1", "nome": "P1", "nota": 72.5, "peso": 2 }],
            "totalAvaliacoes": 3,
            "faltas": 4,
            "notaParcial": 24,
            "pontosConsumidos": 0
        });
        let p: PartialSubject = serde_json::from_value(raw).expect("parse legacy partial");
        assert_eq!(p.name, "Fisica I");
        assert_eq!(p.mode(), EvaluationMode::Medias);
        assert_eq!(p.exams[0].weight, 2.0);
        assert_eq!(p.total_evaluations(), 3);
        assert_eq!(p.absences, 4);
    }

    #[test]
    fn calc_mode_parse_is_case_insensitive() {
        assert_eq!(CalcMode::parse("Parcial"), Some(CalcMode::Parcial));
        assert_eq!(CalcMode::parse(" curso "), Some(CalcMode::Curso));
        assert_eq!(CalcMode::parse("semestre"), None);
        assert_eq!(CalcMode::default().as_str(), "periodo");
    }
}
