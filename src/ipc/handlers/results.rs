use crate::calc;
use crate::error::DomainError;
use crate::ipc::helpers::{
    optional_f64, optional_i64, optional_str, required_f64, required_i64, to_value, with_store,
    HandlerErr, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::CalcMode;
use crate::recovery;
use crate::store::Store;
use crate::targets::{self, TargetAnalysis};
use crate::validate;
use serde_json::{json, Value};

/// `mode` param when given, otherwise the stored selection.
fn resolve_mode(store: &Store<'_>, params: &Value) -> Result<CalcMode, HandlerErr> {
    match optional_str(params, "mode") {
        Some(raw) => CalcMode::parse(&raw)
            .ok_or_else(|| DomainError::Invalid(format!("unknown mode: {raw}")).into()),
        None => Ok(store.calc_mode()?),
    }
}

fn target_analysis(
    store: &Store<'_>,
    params: &Value,
) -> Result<(CalcMode, Option<TargetAnalysis>), HandlerErr> {
    let target = targets::validate_target(required_f64(params, "target")?)?;
    let mode = resolve_mode(store, params)?;
    let entries = targets::target_entries(
        mode,
        &store.subjects()?,
        &store.periods()?,
        &store.partials()?,
    );
    Ok((mode, targets::analyze_target(&entries, target)))
}

fn results_compute(store: &Store<'_>, params: &Value) -> HandlerResult {
    let mode = resolve_mode(store, params)?;
    let result = calc::compute_result(
        mode,
        &store.subjects()?,
        &store.periods()?,
        &store.partials()?,
    );
    Ok(json!({ "mode": mode.as_str(), "result": to_value(&result)? }))
}

fn results_updated_cra(store: &Store<'_>, _params: &Value) -> HandlerResult {
    let cra = calc::updated_cra(&store.periods()?, &store.partials()?);
    to_value(&cra)
}

fn results_target_cr(store: &Store<'_>, params: &Value) -> HandlerResult {
    let (mode, analysis) = target_analysis(store, params)?;
    Ok(json!({ "mode": mode.as_str(), "analysis": to_value(&analysis)? }))
}

fn results_simulate(store: &Store<'_>, params: &Value) -> HandlerResult {
    let points: Vec<f64> = match params.get("points") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| HandlerErr::new("bad_params", "points must be numbers"))
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(HandlerErr::new("bad_params", "missing points")),
    };
    let (mode, analysis) = target_analysis(store, params)?;
    let Some(analysis) = analysis else {
        return Err(DomainError::Invalid("no subjects to simulate".to_string()).into());
    };
    let simulation = targets::simulate(&analysis, &points)?;
    Ok(json!({ "mode": mode.as_str(), "simulation": to_value(&simulation)? }))
}

fn results_target_cra(store: &Store<'_>, params: &Value) -> HandlerResult {
    let target = targets::validate_target(required_f64(params, "target")?)?;
    let analysis = targets::analyze_cra_target(&store.periods()?, &store.partials()?, target);
    to_value(&analysis)
}

/// Either a partial subject's current standing (`partialId`) or an
/// explicit grade/credits/absences triple.
fn results_recovery(store: &Store<'_>, params: &Value) -> HandlerResult {
    let recovery_grade = optional_f64(params, "recoveryGrade")?
        .map(|v| validate::score(v, "recoveryGrade"))
        .transpose()?;

    let report = match optional_str(params, "partialId") {
        Some(partial_id) => {
            let partials = store.partials()?;
            let p = partials
                .iter()
                .find(|p| p.id == partial_id)
                .ok_or(DomainError::NotFound("partial subject"))?;
            recovery::recovery_report(calc::final_grade(p), p.credits, p.absences, recovery_grade)
        }
        None => {
            let grade = validate::score(required_f64(params, "grade")?, "grade")?;
            let credits = validate::credits(required_i64(params, "credits")?, true)?;
            let absences = validate::absences(optional_i64(params, "absences")?.unwrap_or(0))?;
            recovery::recovery_report(grade, credits, absences, recovery_grade)
        }
    };
    to_value(&report)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&Store<'_>, &Value) -> HandlerResult = match req.method.as_str() {
        "results.compute" => results_compute,
        "results.updatedCra" => results_updated_cra,
        "results.targetCr" => results_target_cr,
        "results.simulate" => results_simulate,
        "results.targetCra" => results_target_cra,
        "results.recovery" => results_recovery,
        _ => return None,
    };
    Some(with_store(state, req, handler))
}
