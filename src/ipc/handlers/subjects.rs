use crate::error::DomainError;
use crate::ipc::helpers::{
    optional_str, required_f64, required_i64, required_str, to_value, with_store, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{new_id, CalcMode, Subject};
use crate::store::Store;
use crate::validate;
use serde_json::{json, Value};

fn calc_mode_get(store: &Store<'_>, _params: &Value) -> HandlerResult {
    Ok(json!({ "mode": store.calc_mode()?.as_str() }))
}

fn calc_mode_set(store: &Store<'_>, params: &Value) -> HandlerResult {
    let raw = required_str(params, "mode")?;
    let mode = CalcMode::parse(&raw).ok_or_else(|| {
        DomainError::Invalid(format!("unknown mode: {raw} (expected periodo, curso or parcial)"))
    })?;
    store.set_calc_mode(mode)?;
    Ok(json!({ "mode": mode.as_str() }))
}

fn subjects_list(store: &Store<'_>, _params: &Value) -> HandlerResult {
    Ok(json!({ "subjects": to_value(&store.subjects()?)? }))
}

fn subjects_create(store: &Store<'_>, params: &Value) -> HandlerResult {
    let name = validate::name(&optional_str(params, "name").unwrap_or_default(), "name")?;
    let score = validate::score(required_f64(params, "score")?, "score")?;
    let credits = validate::credits(required_i64(params, "credits")?, false)?;

    let subject = Subject {
        id: new_id(),
        name,
        score,
        credits,
    };
    let mut subjects = store.subjects()?;
    subjects.push(subject.clone());
    store.save_subjects(&subjects)?;

    Ok(json!({
        "subjectId": subject.id,
        "subjects": to_value(&subjects)?,
    }))
}

fn subjects_delete(store: &Store<'_>, params: &Value) -> HandlerResult {
    let subject_id = required_str(params, "subjectId")?;
    let mut subjects = store.subjects()?;
    let before = subjects.len();
    subjects.retain(|s| s.id != subject_id);
    if subjects.len() == before {
        return Err(DomainError::NotFound("subject").into());
    }
    store.save_subjects(&subjects)?;
    Ok(json!({ "subjects": to_value(&subjects)? }))
}

fn subjects_clear(store: &Store<'_>, _params: &Value) -> HandlerResult {
    store.save_subjects(&[])?;
    Ok(json!({ "subjects": [] }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&Store<'_>, &Value) -> HandlerResult = match req.method.as_str() {
        "calcMode.get" => calc_mode_get,
        "calcMode.set" => calc_mode_set,
        "subjects.list" => subjects_list,
        "subjects.create" => subjects_create,
        "subjects.delete" => subjects_delete,
        "subjects.clear" => subjects_clear,
        _ => return None,
    };
    Some(with_store(state, req, handler))
}
