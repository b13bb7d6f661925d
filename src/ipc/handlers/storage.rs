use crate::backup;
use crate::bundle;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_str, to_value, with_store, HandlerErr, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use serde_json::{json, Value};
use std::path::PathBuf;

fn storage_info(store: &Store<'_>, _params: &Value) -> HandlerResult {
    to_value(&store.info()?)
}

fn storage_clear(store: &Store<'_>, _params: &Value) -> HandlerResult {
    let removed = store.clear_all()?;
    Ok(json!({ "removed": removed, "info": to_value(&store.info()?)? }))
}

fn storage_export_json(store: &Store<'_>, params: &Value) -> HandlerResult {
    let path = PathBuf::from(required_str(params, "path")?);
    let summary = backup::export_json(store, &path).map_err(|e| {
        HandlerErr::new("io_failed", e.to_string())
            .with_details(json!({ "path": path.to_string_lossy() }))
    })?;
    to_value(&summary)
}

fn storage_import_json(store: &Store<'_>, params: &Value) -> HandlerResult {
    let path = PathBuf::from(required_str(params, "path")?);
    if !path.is_file() {
        return Err(HandlerErr::new("not_found", "backup file not found")
            .with_details(json!({ "path": path.to_string_lossy() })));
    }
    let summary = backup::import_json(store, &path)?;
    Ok(json!({
        "import": to_value(&summary)?,
        "info": to_value(&store.info()?)?,
    }))
}

fn handle_workspace_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing outPath", None),
    };
    let Some(workspace_path) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let out = PathBuf::from(&out_path);
    let export = match bundle::export_workspace_bundle(&workspace_path, &out) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(path = %out_path, error = ?e, "bundle export failed");
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out_path })),
            );
        }
    };
    tracing::info!(path = %out_path, "workspace bundle exported");

    ok(
        &req.id,
        json!({
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "dbSha256": export.db_sha256,
        }),
    )
}

fn handle_workspace_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match req.params.get("inPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing inPath", None),
    };
    let Some(workspace_path) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    // Drop open handle before replacing file.
    state.db = None;

    let import = bundle::import_workspace_bundle(&src, &workspace_path);
    let reopened = db::open_db(&workspace_path);
    let conn = match reopened {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", e.to_string(), None),
    };
    state.db = Some(conn);

    match import {
        Ok(import) => {
            tracing::info!(path = %in_path, format = %import.bundle_format_detected, "workspace bundle imported");
            ok(
                &req.id,
                json!({
                    "workspacePath": workspace_path.to_string_lossy(),
                    "bundleFormatDetected": import.bundle_format_detected
                }),
            )
        }
        Err(e) => {
            tracing::warn!(path = %in_path, error = ?e, "bundle import rejected");
            err(
                &req.id,
                "bad_backup",
                e.to_string(),
                Some(json!({ "path": in_path })),
            )
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&Store<'_>, &Value) -> HandlerResult = match req.method.as_str() {
        "workspace.exportBundle" => return Some(handle_workspace_export_bundle(state, req)),
        "workspace.importBundle" => return Some(handle_workspace_import_bundle(state, req)),
        "storage.info" => storage_info,
        "storage.clear" => storage_clear,
        "storage.exportJson" => storage_export_json,
        "storage.importJson" => storage_import_json,
        _ => return None,
    };
    Some(with_store(state, req, handler))
}
