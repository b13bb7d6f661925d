use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::db;
use crate::error::DomainError;
use crate::model::{CalcMode, EvaluationMode, PartialSubject, Period, Subject};

pub const STORAGE_PREFIX: &str = "calculadora-cr-";
pub const KEY_SUBJECTS: &str = "calculadora-cr-disciplinas";
pub const KEY_PARTIALS: &str = "calculadora-cr-disciplinas-parciais";
pub const KEY_CALC_MODE: &str = "calculadora-cr-tipo-calculo";
pub const KEY_PERIODS: &str = "calculadora-cr-periodos";
pub const KEY_LAST_MODIFIED: &str = "calculadora-cr-last-modified";

/// Keys holding user data, in export order.
pub const DATA_KEYS: [&str; 4] = [KEY_SUBJECTS, KEY_PARTIALS, KEY_CALC_MODE, KEY_PERIODS];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::Storage(_) => "storage_failed",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub has_data: bool,
    pub subjects_count: usize,
    pub partials_count: usize,
    pub periods_count: usize,
    pub last_modified: Option<String>,
    pub storage_size: usize,
}

/// Typed access to the calculator's keys in the workspace database.
pub struct Store<'a> {
    conn: &'a Connection,
}

impl<'a> Store<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Reads `key`, falling back to `default` when it is absent or holds
    /// JSON that no longer parses. Only database failures are errors.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> anyhow::Result<T> {
        let Some(raw) = db::storage_get(self.conn, key)? else {
            return Ok(default);
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "unreadable stored value, using default");
                Ok(default)
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)?;
        db::storage_set(self.conn, key, &raw)?;
        self.touch()
    }

    pub fn touch(&self) -> anyhow::Result<()> {
        db::storage_set(
            self.conn,
            KEY_LAST_MODIFIED,
            &chrono::Utc::now().to_rfc3339(),
        )
    }

    pub fn raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        db::storage_get(self.conn, key)
    }

    pub fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()> {
        db::storage_set(self.conn, key, value)
    }

    pub fn subjects(&self) -> anyhow::Result<Vec<Subject>> {
        self.load(KEY_SUBJECTS, Vec::new())
    }

    pub fn save_subjects(&self, subjects: &[Subject]) -> anyhow::Result<()> {
        self.save(KEY_SUBJECTS, subjects)
    }

    pub fn periods(&self) -> anyhow::Result<Vec<Period>> {
        self.load(KEY_PERIODS, Vec::new())
    }

    pub fn save_periods(&self, periods: &[Period]) -> anyhow::Result<()> {
        self.save(KEY_PERIODS, periods)
    }

    pub fn calc_mode(&self) -> anyhow::Result<CalcMode> {
        self.load(KEY_CALC_MODE, CalcMode::default())
    }

    pub fn set_calc_mode(&self, mode: CalcMode) -> anyhow::Result<()> {
        self.save(KEY_CALC_MODE, &mode)
    }

    /// Partial subjects, upgrading records saved without an evaluation mode.
    pub fn partials(&self) -> anyhow::Result<Vec<PartialSubject>> {
        let mut partials: Vec<PartialSubject> = self.load(KEY_PARTIALS, Vec::new())?;
        let mut migrated = 0usize;
        for p in partials.iter_mut().filter(|p| p.mode.is_none()) {
            p.mode = Some(EvaluationMode::Pontos);
            p.exams.clear();
            p.total_evaluations = None;
            migrated += 1;
        }
        if migrated > 0 {
            tracing::info!(migrated, "migrated partial subjects to point accumulation");
            db::storage_set(self.conn, KEY_PARTIALS, &serde_json::to_string(&partials)?)?;
        }
        Ok(partials)
    }

    pub fn save_partials(&self, partials: &[PartialSubject]) -> anyhow::Result<()> {
        self.save(KEY_PARTIALS, partials)
    }

    /// Load, edit and save the partial subject `id` in one step.
    pub fn update_partial<R, F>(&self, id: &str, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut PartialSubject) -> Result<R, DomainError>,
    {
        let mut partials = self.partials()?;
        let subject = partials
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(DomainError::NotFound("partial subject"))?;
        let out = f(subject)?;
        self.save_partials(&partials)?;
        Ok(out)
    }

    pub fn info(&self) -> anyhow::Result<StorageInfo> {
        let mut storage_size = 0usize;
        let mut has_data = false;
        for key in DATA_KEYS {
            if let Some(raw) = self.raw(key)? {
                has_data = true;
                storage_size += raw.len();
            }
        }
        Ok(StorageInfo {
            has_data,
            subjects_count: count_items(self.raw(KEY_SUBJECTS)?),
            partials_count: count_items(self.raw(KEY_PARTIALS)?),
            periods_count: count_items(self.raw(KEY_PERIODS)?),
            last_modified: self.raw(KEY_LAST_MODIFIED)?,
            storage_size,
        })
    }

    /// Drops every calculator key, leaving the workspace as new.
    pub fn clear_all(&self) -> anyhow::Result<usize> {
        let mut removed = 0usize;
        for key in db::storage_keys(self.conn)? {
            if key.starts_with(STORAGE_PREFIX) && db::storage_remove(self.conn, &key)? {
                removed += 1;
            }
        }
        tracing::info!(removed, "cleared calculator storage");
        Ok(removed)
    }
}

fn count_items(raw: Option<String>) -> usize {
    raw.and_then(|r| serde_json::from_str::<Vec<serde_json::Value>>(&r).ok())
        .map(|v| v.len())
        .unwrap_or(0)
}
