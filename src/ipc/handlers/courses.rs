use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_err, get_required_str, parse_course_input, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{check_course_unique, now_timestamp, Course};
use crate::reports::compare_names;
use rusqlite::Connection;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "courses": [] }));
    };
    match db::list_courses(conn) {
        Ok(mut courses) => {
            courses.sort_by(|a, b| compare_names(&a.name, &b.name));
            ok(&req.id, json!({ "courses": courses }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn load_course(conn: &Connection, course_id: &str) -> Result<Course, HandlerErr> {
    db::get_course(conn, course_id)
        .map_err(db_err("db_query_failed"))?
        .ok_or_else(|| HandlerErr::new("not_found", "course not found"))
}

fn courses_get(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let course = load_course(conn, &course_id)?;
    Ok(json!({ "course": course }))
}

fn courses_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let input = parse_course_input(params, false)?.normalized()?;
    let existing = db::list_courses(conn).map_err(db_err("db_query_failed"))?;
    check_course_unique(&input, &existing, None)?;

    let course = Course::from_input(Uuid::new_v4().to_string(), input, now_timestamp());
    db::insert_course(conn, &course).map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "courses" })),
    })?;
    info!(course_id = %course.id, name = %course.name, "course created");
    Ok(json!({ "course": course }))
}

fn courses_update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let current = load_course(conn, &course_id)?;
    let input = parse_course_input(params, true)?.normalized()?;
    let existing = db::list_courses(conn).map_err(db_err("db_query_failed"))?;
    check_course_unique(&input, &existing, Some(&course_id))?;

    let course = Course {
        id: current.id,
        name: input.name,
        code: input.code,
        credit: input.credit,
        semester: input.semester,
        created_at: current.created_at,
        updated_at: Some(now_timestamp()),
    };
    let updated = db::update_course(conn, &course).map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "courses" })),
    })?;
    if !updated {
        return Err(HandlerErr::new("not_found", "course not found"));
    }
    info!(course_id = %course.id, "course updated");
    Ok(json!({ "course": course }))
}

fn courses_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let removed = db::delete_course(conn, &course_id).map_err(|e| HandlerErr {
        code: "db_delete_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "courses" })),
    })?;
    let Some(deleted_grades) = removed else {
        return Err(HandlerErr::new("not_found", "course not found"));
    };
    info!(course_id = %course_id, deleted_grades, "course deleted");
    Ok(json!({ "courseId": course_id, "deletedGrades": deleted_grades }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_courses_list(state, req)),
        "courses.get" => Some(with_db(state, req, courses_get)),
        "courses.create" => Some(with_db(state, req, courses_create)),
        "courses.update" => Some(with_db(state, req, courses_update)),
        "courses.delete" => Some(with_db(state, req, courses_delete)),
        _ => None,
    }
}
