use serde::Serialize;
use serde_json::Value;

use crate::backup::BackupError;
use crate::error::DomainError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::{Store, StoreError};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<DomainError> for HandlerErr {
    fn from(e: DomainError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

impl From<anyhow::Error> for HandlerErr {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = ?e, "storage operation failed");
        Self::new("storage_failed", e.to_string())
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Domain(d) => d.into(),
            StoreError::Storage(s) => s.into(),
        }
    }
}

impl From<BackupError> for HandlerErr {
    fn from(e: BackupError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

impl From<serde_json::Error> for HandlerErr {
    fn from(e: serde_json::Error) -> Self {
        Self::new("internal_error", e.to_string())
    }
}

pub type HandlerResult = Result<Value, HandlerErr>;

pub fn to_value<T: Serialize>(v: &T) -> HandlerResult {
    Ok(serde_json::to_value(v)?)
}

/// Runs `f` against the open workspace, or answers `no_workspace`.
pub fn with_store<F>(state: &AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&Store<'_>, &Value) -> HandlerResult,
{
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let store = Store::new(conn);
    match f(&store, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => {
            tracing::debug!(method = %req.method, code = error.code, message = %error.message, "request rejected");
            error.response(&req.id)
        }
    }
}

fn missing(key: &str) -> HandlerErr {
    HandlerErr::new("bad_params", format!("missing {}", key))
}

fn not_a_number(key: &str) -> HandlerErr {
    HandlerErr::new("bad_params", format!("{} must be a number", key))
}

pub fn required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    optional_str(params, key).ok_or_else(|| missing(key))
}

pub fn optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Numbers may arrive as JSON numbers or as the text typed into a form.
pub fn optional_f64(params: &Value, key: &str) -> Result<Option<f64>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| not_a_number(key)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| not_a_number(key)),
        Some(_) => Err(not_a_number(key)),
    }
}

pub fn required_f64(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    optional_f64(params, key)?.ok_or_else(|| missing(key))
}

pub fn optional_i64(params: &Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    match optional_f64(params, key)? {
        None => Ok(None),
        Some(v) if v.fract() == 0.0 => Ok(Some(v as i64)),
        Some(_) => Err(HandlerErr::new(
            "bad_params",
            format!("{} must be an integer", key),
        )),
    }
}

pub fn required_i64(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    optional_i64(params, key)?.ok_or_else(|| missing(key))
}
