use crate::absences::{self, AbsenceChange};
use crate::ipc::helpers::{required_i64, required_str, to_value, with_store, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::PartialSubject;
use crate::store::Store;
use crate::validate;
use serde_json::{json, Value};

fn absence_result(p: &PartialSubject) -> HandlerResult {
    Ok(json!({
        "partialId": p.id,
        "absence": to_value(&absences::absence_info(p.credits, p.absences))?,
        "definitivelyFailedByAbsences": absences::is_failed_by_absences_when_complete(p),
    }))
}

fn apply(store: &Store<'_>, params: &Value, change: AbsenceChange) -> HandlerResult {
    let partial_id = required_str(params, "partialId")?;
    let partial = store.update_partial(&partial_id, |p| {
        p.absences = absences::apply_change(p.absences, change);
        Ok(p.clone())
    })?;
    tracing::debug!(partial_id = %partial.id, absences = partial.absences, "absences updated");
    absence_result(&partial)
}

fn absences_add(store: &Store<'_>, params: &Value) -> HandlerResult {
    apply(store, params, AbsenceChange::Add)
}

fn absences_add_double(store: &Store<'_>, params: &Value) -> HandlerResult {
    apply(store, params, AbsenceChange::AddDouble)
}

fn absences_remove(store: &Store<'_>, params: &Value) -> HandlerResult {
    apply(store, params, AbsenceChange::Remove)
}

fn absences_set(store: &Store<'_>, params: &Value) -> HandlerResult {
    let count = validate::absences(required_i64(params, "count")?)?;
    apply(store, params, AbsenceChange::Set(count))
}

fn absences_status(store: &Store<'_>, params: &Value) -> HandlerResult {
    let partial_id = required_str(params, "partialId")?;
    let partials = store.partials()?;
    let partial = partials
        .iter()
        .find(|p| p.id == partial_id)
        .ok_or(crate::error::DomainError::NotFound("partial subject"))?;
    absence_result(partial)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&Store<'_>, &Value) -> HandlerResult = match req.method.as_str() {
        "absences.add" => absences_add,
        "absences.addDouble" => absences_add_double,
        "absences.remove" => absences_remove,
        "absences.set" => absences_set,
        "absences.status" => absences_status,
        _ => return None,
    };
    Some(with_store(state, req, handler))
}
