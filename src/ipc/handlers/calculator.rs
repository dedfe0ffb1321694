use crate::calc::{self, GRADE_SCALE};
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_opt_score, parse_score_input, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn calc_grade(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let scores = parse_score_input(params)?;
    let result = calc::calculate_grade(scores.midterm, scores.quiz, scores.final_exam);
    Ok(json!(result))
}

/// Per-tier minimum finals. Missing midterm/quiz count as 0, matching the
/// total calculation.
fn calc_final_needed(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let midterm = get_opt_score(params, "midterm")?.unwrap_or(0.0);
    let quiz = get_opt_score(params, "quiz")?.unwrap_or(0.0);
    Ok(json!({
        "average": calc::component_average(midterm, quiz),
        "targets": calc::minimum_finals(midterm, quiz),
    }))
}

fn respond(req: &Request, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(error) => error.response(&req.id),
    }
}

// The calculator does not touch the workspace, so it works before one is selected.
pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "calc.grade" => Some(respond(req, calc_grade(&req.params))),
        "calc.finalNeeded" => Some(respond(req, calc_final_needed(&req.params))),
        "calc.scale" => Some(ok(&req.id, json!({ "tiers": &GRADE_SCALE[..] }))),
        _ => None,
    }
}
