use crate::db;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    db_err, get_opt_str, get_opt_usize, get_required_str, parse_score_input, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{now_timestamp, Grade};
use crate::reports::{filter_grades, paginate, GradeFilter, DEFAULT_PER_PAGE};
use rusqlite::Connection;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

fn handle_grades_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        let (_, pagination) = paginate::<Grade>(&[], 1, DEFAULT_PER_PAGE);
        return ok(&req.id, json!({ "grades": [], "pagination": pagination }));
    }
    with_db(state, req, grades_list)
}

fn grades_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let filter = GradeFilter {
        course_id: get_opt_str(params, "courseId")?.filter(|s| s != "all"),
        search: get_opt_str(params, "search")?,
        letter_grade: get_opt_str(params, "letterGrade")?.filter(|s| s != "all"),
    };
    let page = get_opt_usize(params, "page")?.unwrap_or(1);
    let per_page = get_opt_usize(params, "perPage")?.unwrap_or(DEFAULT_PER_PAGE);

    let courses = db::list_courses(conn).map_err(db_err("db_query_failed"))?;
    let grades = db::list_grades(conn).map_err(db_err("db_query_failed"))?;
    let filtered = filter_grades(&courses, &grades, &filter);
    let (items, pagination) = paginate(&filtered, page, per_page);
    Ok(json!({ "grades": items, "pagination": pagination }))
}

fn grades_get(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let grade_id = get_required_str(params, "gradeId")?;
    let grade = db::get_grade(conn, &grade_id)
        .map_err(db_err("db_query_failed"))?
        .ok_or_else(|| HandlerErr::new("not_found", "grade not found"))?;
    Ok(json!({ "grade": grade }))
}

fn require_course(conn: &Connection, course_id: &str) -> Result<(), HandlerErr> {
    let course = db::get_course(conn, course_id).map_err(db_err("db_query_failed"))?;
    if course.is_none() {
        return Err(HandlerErr {
            code: "not_found",
            message: "course not found".to_string(),
            details: Some(json!({ "courseId": course_id })),
        });
    }
    Ok(())
}

fn grades_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let scores = parse_score_input(params)?;
    scores.validate()?;
    require_course(conn, &course_id)?;

    let grade = Grade::derive(
        Uuid::new_v4().to_string(),
        course_id,
        scores,
        now_timestamp(),
        None,
    );
    db::insert_grade(conn, &grade).map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "grades" })),
    })?;
    info!(grade_id = %grade.id, course_id = %grade.course_id, letter = ?grade.letter_grade, "grade created");
    Ok(json!({ "grade": grade }))
}

fn grades_update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let grade_id = get_required_str(params, "gradeId")?;
    let current = db::get_grade(conn, &grade_id)
        .map_err(db_err("db_query_failed"))?
        .ok_or_else(|| HandlerErr::new("not_found", "grade not found"))?;
    let course_id = get_required_str(params, "courseId")?;
    let scores = parse_score_input(params)?;
    scores.validate()?;
    require_course(conn, &course_id)?;

    let grade = Grade::derive(
        current.id,
        course_id,
        scores,
        current.created_at,
        Some(now_timestamp()),
    );
    let updated = db::update_grade(conn, &grade).map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "grades" })),
    })?;
    if !updated {
        return Err(HandlerErr::new("not_found", "grade not found"));
    }
    info!(grade_id = %grade.id, letter = ?grade.letter_grade, "grade updated");
    Ok(json!({ "grade": grade }))
}

fn grades_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let grade_id = get_required_str(params, "gradeId")?;
    let deleted = db::delete_grade(conn, &grade_id).map_err(|e| HandlerErr {
        code: "db_delete_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "grades" })),
    })?;
    if !deleted {
        return Err(HandlerErr::new("not_found", "grade not found"));
    }
    info!(grade_id = %grade_id, "grade deleted");
    Ok(json!({ "gradeId": grade_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.list" => Some(handle_grades_list(state, req)),
        "grades.get" => Some(with_db(state, req, grades_get)),
        "grades.create" => Some(with_db(state, req, grades_create)),
        "grades.update" => Some(with_db(state, req, grades_update)),
        "grades.delete" => Some(with_db(state, req, grades_delete)),
        _ => None,
    }
}
