use crate::calc;
use crate::error::DomainError;
use crate::ipc::helpers::{
    optional_f64, optional_i64, optional_str, required_f64, required_i64, required_str, to_value,
    with_store, HandlerErr, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{
    new_id, Activity, CalcMode, EvaluationMode, Exam, PartialSubject, DEFAULT_TOTAL_EVALUATIONS,
};
use crate::store::Store;
use crate::validate;
use serde_json::{json, Value};

fn require_mode(subject: &PartialSubject, mode: EvaluationMode) -> Result<(), DomainError> {
    if subject.mode() != mode {
        let what = match mode {
            EvaluationMode::Pontos => "activities belong to point-accumulation subjects",
            EvaluationMode::Medias => "exams belong to weighted-average subjects",
        };
        return Err(DomainError::Invalid(what.to_string()));
    }
    Ok(())
}

fn partials_list(store: &Store<'_>, _params: &Value) -> HandlerResult {
    let partials = store.partials()?;
    let summaries: Vec<_> = partials.iter().map(calc::summarize_partial).collect();
    let result = calc::compute_result(CalcMode::Parcial, &[], &[], &partials);
    Ok(json!({
        "partials": to_value(&summaries)?,
        "result": to_value(&result)?,
    }))
}

fn partials_create(store: &Store<'_>, params: &Value) -> HandlerResult {
    let name = validate::name(&optional_str(params, "name").unwrap_or_default(), "name")?;
    let credits = validate::credits(required_i64(params, "credits")?, false)?;
    let mode = match optional_str(params, "mode") {
        None => EvaluationMode::default(),
        Some(raw) => EvaluationMode::parse(&raw).ok_or_else(|| {
            DomainError::Invalid(format!("unknown mode: {raw} (expected pontos or medias)"))
        })?,
    };
    let total_evaluations = match mode {
        EvaluationMode::Medias => Some(match optional_i64(params, "totalEvaluations")? {
            Some(v) => validate::total_evaluations(v)?,
            None => DEFAULT_TOTAL_EVALUATIONS,
        }),
        EvaluationMode::Pontos => None,
    };

    let subject = PartialSubject {
        id: new_id(),
        name,
        credits,
        mode: Some(mode),
        activities: Vec::new(),
        exams: Vec::new(),
        total_evaluations,
        absences: 0,
    };
    let mut partials = store.partials()?;
    partials.push(subject.clone());
    store.save_partials(&partials)?;
    tracing::debug!(partial_id = %subject.id, mode = ?mode, "partial subject created");

    Ok(json!({
        "partialId": subject.id,
        "partial": to_value(&calc::summarize_partial(&subject))?,
    }))
}

fn partials_delete(store: &Store<'_>, params: &Value) -> HandlerResult {
    let partial_id = required_str(params, "partialId")?;
    let mut partials = store.partials()?;
    let before = partials.len();
    partials.retain(|p| p.id != partial_id);
    if partials.len() == before {
        return Err(DomainError::NotFound("partial subject").into());
    }
    store.save_partials(&partials)?;
    Ok(json!({ "ok": true }))
}

fn partials_clear(store: &Store<'_>, _params: &Value) -> HandlerResult {
    store.save_partials(&[])?;
    Ok(json!({ "ok": true }))
}

fn summary(subject: &PartialSubject) -> HandlerResult {
    to_value(&calc::summarize_partial(subject))
}

fn activity_add(store: &Store<'_>, params: &Value) -> HandlerResult {
    let partial_id = required_str(params, "partialId")?;
    let name = optional_str(params, "name");
    let obtained = required_f64(params, "obtained")?;
    let total = required_f64(params, "total")?;

    let (activity_id, partial) = store.update_partial(&partial_id, |p| {
        require_mode(p, EvaluationMode::Pontos)?;
        let consumed = calc::points_consumed(&p.activities);
        let (obtained, total) = validate::activity(obtained, total, consumed)?;
        let activity = Activity {
            id: new_id(),
            name,
            obtained,
            total,
        };
        let id = activity.id.clone();
        p.activities.push(activity);
        Ok((id, p.clone()))
    })?;

    Ok(json!({ "activityId": activity_id, "partial": summary(&partial)? }))
}

fn activity_update(store: &Store<'_>, params: &Value) -> HandlerResult {
    let partial_id = required_str(params, "partialId")?;
    let activity_id = required_str(params, "activityId")?;
    let name = optional_str(params, "name");
    let obtained = required_f64(params, "obtained")?;
    let total = required_f64(params, "total")?;

    let partial = store.update_partial(&partial_id, |p| {
        let consumed_elsewhere: f64 = p
            .activities
            .iter()
            .filter(|a| a.id != activity_id)
            .map(|a| a.total)
            .sum();
        let activity = p
            .activity_mut(&activity_id)
            .ok_or(DomainError::NotFound("activity"))?;
        let (obtained, total) = validate::activity(obtained, total, consumed_elsewhere)?;
        activity.name = name;
        activity.obtained = obtained;
        activity.total = total;
        Ok(p.clone())
    })?;

    Ok(json!({ "activityId": activity_id, "partial": summary(&partial)? }))
}

fn activity_delete(store: &Store<'_>, params: &Value) -> HandlerResult {
    let partial_id = required_str(params, "partialId")?;
    let activity_id = required_str(params, "activityId")?;

    let partial = store.update_partial(&partial_id, |p| {
        let before = p.activities.len();
        p.activities.retain(|a| a.id != activity_id);
        if p.activities.len() == before {
            return Err(DomainError::NotFound("activity"));
        }
        Ok(p.clone())
    })?;

    Ok(json!({ "activityId": activity_id, "partial": summary(&partial)? }))
}

fn exam_fields(params: &Value) -> Result<(String, f64, f64), HandlerErr> {
    let name = validate::name(&optional_str(params, "name").unwrap_or_default(), "name")?;
    let grade = validate::score(required_f64(params, "grade")?, "grade")?;
    let weight = validate::weight(optional_f64(params, "weight")?.unwrap_or(1.0))?;
    Ok((name, grade, weight))
}

fn exam_add(store: &Store<'_>, params: &Value) -> HandlerResult {
    let partial_id = required_str(params, "partialId")?;
    let (name, grade, weight) = exam_fields(params)?;

    let (exam_id, partial) = store.update_partial(&partial_id, |p| {
        require_mode(p, EvaluationMode::Medias)?;
        if !calc::can_add_exam(p) {
            return Err(DomainError::LimitReached(format!(
                "subject already has all {} evaluations",
                p.total_evaluations()
            )));
        }
        let exam = Exam {
            id: new_id(),
            name,
            grade,
            weight,
        };
        let id = exam.id.clone();
        p.exams.push(exam);
        Ok((id, p.clone()))
    })?;

    Ok(json!({ "examId": exam_id, "partial": summary(&partial)? }))
}

fn exam_update(store: &Store<'_>, params: &Value) -> HandlerResult {
    let partial_id = required_str(params, "partialId")?;
    let exam_id = required_str(params, "examId")?;
    let (name, grade, weight) = exam_fields(params)?;

    let partial = store.update_partial(&partial_id, |p| {
        let exam = p.exam_mut(&exam_id).ok_or(DomainError::NotFound("exam"))?;
        exam.name = name;
        exam.grade = grade;
        exam.weight = weight;
        Ok(p.clone())
    })?;

    Ok(json!({ "examId": exam_id, "partial": summary(&partial)? }))
}

fn exam_delete(store: &Store<'_>, params: &Value) -> HandlerResult {
    let partial_id = required_str(params, "partialId")?;
    let exam_id = required_str(params, "examId")?;

    let partial = store.update_partial(&partial_id, |p| {
        let before = p.exams.len();
        p.exams.retain(|e| e.id != exam_id);
        if p.exams.len() == before {
            return Err(DomainError::NotFound("exam"));
        }
        Ok(p.clone())
    })?;

    Ok(json!({ "examId": exam_id, "partial": summary(&partial)? }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&Store<'_>, &Value) -> HandlerResult = match req.method.as_str() {
        "partials.list" => partials_list,
        "partials.create" => partials_create,
        "partials.delete" => partials_delete,
        "partials.clear" => partials_clear,
        "partials.addActivity" => activity_add,
        "partials.updateActivity" => activity_update,
        "partials.deleteActivity" => activity_delete,
        "partials.addExam" => exam_add,
        "partials.updateExam" => exam_update,
        "partials.deleteExam" => exam_delete,
        _ => return None,
    };
    Some(with_store(state, req, handler))
}
