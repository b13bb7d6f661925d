use std::panic::{self, AssertUnwindSafe};

use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::subjects::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::partials::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::absences::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::periods::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::results::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::storage::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

/// Error boundary: a panicking handler becomes an `internal_error` reply and
/// the loop keeps serving, so the front end can still reload or clear data.
pub fn handle_request_guarded(state: &mut AppState, req: Request) -> serde_json::Value {
    guarded(state, req, handle_request)
}

fn guarded(
    state: &mut AppState,
    req: Request,
    handle: fn(&mut AppState, Request) -> serde_json::Value,
) -> serde_json::Value {
    let id = req.id.clone();
    let method = req.method.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| handle(state, req))) {
        Ok(resp) => resp,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            tracing::error!(%method, %message, "handler panicked");
            err(
                &id,
                "internal_error",
                message,
                Some(serde_json::json!({ "method": method })),
            )
        }
    }
}
