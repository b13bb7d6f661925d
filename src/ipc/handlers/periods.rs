use crate::calc;
use crate::error::DomainError;
use crate::ipc::helpers::{
    optional_f64, optional_i64, optional_str, required_str, to_value, with_store, HandlerErr,
    HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{new_id, CalcMode, Period, Subject};
use crate::store::Store;
use crate::validate;
use serde_json::{json, Value};

pub fn period_name(number: u32) -> String {
    format!("{}º Período", number)
}

/// Periods are numbered by position, so removing one renumbers the rest.
fn renumber(periods: &mut [Period]) {
    for (i, p) in periods.iter_mut().enumerate() {
        let number = i as u32 + 1;
        p.number = number;
        p.name = period_name(number);
    }
}

fn periods_view(periods: &[Period]) -> HandlerResult {
    let rows: Vec<Value> = periods
        .iter()
        .map(|p| {
            let wm = calc::period_mean(p);
            let mut row = to_value(p)?;
            row["mean"] = json!(wm.mean);
            row["totalCredits"] = json!(wm.total_credits);
            Ok(row)
        })
        .collect::<Result<_, HandlerErr>>()?;
    let result = calc::compute_result(CalcMode::Curso, &[], periods, &[]);
    Ok(json!({
        "periods": rows,
        "result": to_value(&result)?,
    }))
}

fn periods_list(store: &Store<'_>, _params: &Value) -> HandlerResult {
    periods_view(&store.periods()?)
}

/// Rows missing a name, score or credits are skipped, as blank form lines
/// are. Filled rows must be in range.
fn parse_subject_rows(params: &Value) -> Result<Vec<Subject>, HandlerErr> {
    let Some(rows) = params.get("subjects").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing subjects"));
    };
    let mut subjects = Vec::new();
    for row in rows {
        let name = optional_str(row, "name");
        let score = optional_f64(row, "score")?;
        let credits = optional_i64(row, "credits")?;
        let (Some(name), Some(score), Some(credits)) = (name, score, credits) else {
            continue;
        };
        subjects.push(Subject {
            id: new_id(),
            name: validate::name(&name, "name")?,
            score: validate::score(score, "score")?,
            credits: validate::credits(credits, true)?,
        });
    }
    if subjects.is_empty() {
        return Err(DomainError::Invalid(
            "add at least one subject with name, score and credits".to_string(),
        )
        .into());
    }
    Ok(subjects)
}

fn periods_create(store: &Store<'_>, params: &Value) -> HandlerResult {
    let subjects = parse_subject_rows(params)?;
    let mut periods = store.periods()?;
    let number = periods.len() as u32 + 1;
    let period = Period {
        id: new_id(),
        number,
        name: period_name(number),
        subjects,
    };
    let period_id = period.id.clone();
    periods.push(period);
    store.save_periods(&periods)?;

    let mut view = periods_view(&periods)?;
    view["periodId"] = json!(period_id);
    Ok(view)
}

fn periods_delete(store: &Store<'_>, params: &Value) -> HandlerResult {
    let period_id = required_str(params, "periodId")?;
    let mut periods = store.periods()?;
    let before = periods.len();
    periods.retain(|p| p.id != period_id);
    if periods.len() == before {
        return Err(DomainError::NotFound("period").into());
    }
    renumber(&mut periods);
    store.save_periods(&periods)?;
    periods_view(&periods)
}

fn periods_clear(store: &Store<'_>, _params: &Value) -> HandlerResult {
    store.save_periods(&[])?;
    periods_view(&[])
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&Store<'_>, &Value) -> HandlerResult = match req.method.as_str() {
        "periods.list" => periods_list,
        "periods.create" => periods_create,
        "periods.delete" => periods_delete,
        "periods.clear" => periods_clear,
        _ => return None,
    };
    Some(with_store(state, req, handler))
}
