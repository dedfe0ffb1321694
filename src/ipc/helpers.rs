use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{CourseInput, InputError, ScoreInput, DEFAULT_CREDIT};
use rusqlite::Connection;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<InputError> for HandlerErr {
    fn from(e: InputError) -> Self {
        Self {
            code: e.code,
            message: e.message,
            details: e.details,
        }
    }
}

/// Map a persistence failure onto a response error code.
pub fn db_err(code: &'static str) -> impl Fn(anyhow::Error) -> HandlerErr {
    move |e| HandlerErr::new(code, format!("{e:#}"))
}

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_opt_str(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| HandlerErr::new("bad_params", format!("{} must be a string or null", key))),
    }
}

/// Absent and null both mean "not entered"; 0 is a real score.
pub fn get_opt_score(params: &serde_json::Value, key: &str) -> Result<Option<f64>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| HandlerErr::new("bad_params", format!("{} must be a number or null", key))),
    }
}

pub fn get_opt_usize(params: &serde_json::Value, key: &str) -> Result<Option<usize>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| {
                HandlerErr::new("bad_params", format!("{} must be a non-negative integer", key))
            }),
    }
}

/// Course form fields. `credit` falls back to the default only when
/// `credit_required` is false.
pub fn parse_course_input(
    params: &serde_json::Value,
    credit_required: bool,
) -> Result<CourseInput, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let code = get_opt_str(params, "code")?;
    let semester = get_required_str(params, "semester")?;
    let credit = match params.get("credit") {
        None if !credit_required => DEFAULT_CREDIT,
        None => return Err(HandlerErr::new("bad_params", "missing credit")),
        Some(v) => v
            .as_i64()
            .ok_or_else(|| HandlerErr::new("bad_params", "credit must be an integer"))?,
    };
    Ok(CourseInput {
        name,
        code,
        credit,
        semester,
    })
}

pub fn parse_score_input(params: &serde_json::Value) -> Result<ScoreInput, HandlerErr> {
    Ok(ScoreInput {
        midterm: get_opt_score(params, "midterm")?,
        quiz: get_opt_score(params, "quiz")?,
        final_exam: get_opt_score(params, "final")?,
    })
}

pub type DbHandler = fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>;

/// Run `f` against the open workspace and wrap its outcome in a response.
pub fn with_db(state: &AppState, req: &Request, f: DbHandler) -> serde_json::Value {
    match require_db(state).and_then(|conn| f(conn, &req.params)) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}
