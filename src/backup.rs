use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::store::{Store, KEY_CALC_MODE, KEY_PARTIALS, KEY_PERIODS, KEY_SUBJECTS};

pub const BACKUP_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("invalid backup file: {0}")]
    Invalid(String),
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

impl BackupError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "bad_backup",
            Self::Io(_) => "io_failed",
        }
    }
}

/// On-disk JSON backup. Data fields carry the stored JSON text verbatim,
/// so a backup restores exactly what was saved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonBackup {
    pub disciplinas: Option<String>,
    pub disciplinas_parciais: Option<String>,
    pub tipo_calculo: Option<String>,
    pub periodos: Option<String>,
    pub timestamp: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub path: String,
    pub timestamp: String,
    pub keys_written: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub version: String,
    pub timestamp: String,
    pub keys_restored: Vec<&'static str>,
}

pub fn default_file_name(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("backup-calculadora-cr-{}.json", now.format("%Y-%m-%d"))
}

pub fn snapshot(store: &Store<'_>) -> anyhow::Result<JsonBackup> {
    Ok(JsonBackup {
        disciplinas: store.raw(KEY_SUBJECTS)?,
        disciplinas_parciais: store.raw(KEY_PARTIALS)?,
        tipo_calculo: store.raw(KEY_CALC_MODE)?,
        periodos: store.raw(KEY_PERIODS)?,
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: BACKUP_VERSION.to_string(),
    })
}

/// Writes the JSON backup. A directory target gets the dated default name.
pub fn export_json(store: &Store<'_>, out_path: &Path) -> anyhow::Result<ExportSummary> {
    let backup = snapshot(store)?;
    let target: PathBuf = if out_path.is_dir() {
        out_path.join(default_file_name(chrono::Utc::now()))
    } else {
        out_path.to_path_buf()
    };
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let text = serde_json::to_string_pretty(&backup).context("failed to serialize backup")?;
    std::fs::write(&target, text)
        .with_context(|| format!("failed to write backup {}", target.to_string_lossy()))?;

    let keys_written = [
        &backup.disciplinas,
        &backup.disciplinas_parciais,
        &backup.tipo_calculo,
        &backup.periodos,
    ]
    .iter()
    .filter(|v| v.is_some())
    .count();
    tracing::info!(path = %target.display(), keys_written, "exported json backup");

    Ok(ExportSummary {
        path: target.to_string_lossy().to_string(),
        timestamp: backup.timestamp,
        keys_written,
    })
}

/// Accepts both the raw-string layout and backups whose data fields were
/// written as plain JSON arrays or strings.
fn data_field(doc: &serde_json::Value, name: &str) -> Option<String> {
    match doc.get(name)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn required_text(doc: &serde_json::Value, name: &str) -> Result<String, BackupError> {
    let value = match doc.get(name) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Err(BackupError::Invalid(format!("missing {name}"))),
    };
    Ok(value)
}

pub fn restore_json(store: &Store<'_>, text: &str) -> Result<ImportSummary, BackupError> {
    let doc: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| BackupError::Invalid(format!("not a JSON document: {e}")))?;
    if !doc.is_object() {
        return Err(BackupError::Invalid("expected a JSON object".to_string()));
    }
    let version = required_text(&doc, "version")?;
    let timestamp = required_text(&doc, "timestamp")?;

    let mut keys_restored = Vec::new();
    for (field, key) in [
        ("disciplinas", KEY_SUBJECTS),
        ("disciplinasParciais", KEY_PARTIALS),
        ("tipoCalculo", KEY_CALC_MODE),
        ("periodos", KEY_PERIODS),
    ] {
        if let Some(raw) = data_field(&doc, field) {
            store.set_raw(key, &raw)?;
            keys_restored.push(key);
        }
    }
    if !keys_restored.is_empty() {
        store.touch()?;
    }
    tracing::info!(%version, %timestamp, restored = keys_restored.len(), "imported json backup");

    Ok(ImportSummary {
        version,
        timestamp,
        keys_restored,
    })
}

pub fn import_json(store: &Store<'_>, in_path: &Path) -> Result<ImportSummary, BackupError> {
    let text = std::fs::read_to_string(in_path)
        .with_context(|| format!("failed to read backup {}", in_path.to_string_lossy()))?;
    restore_json(store, &text)
}
