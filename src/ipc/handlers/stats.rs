use crate::db;
use crate::ipc::helpers::{db_err, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{Course, Grade};
use crate::reports;
use crate::stats::compute_statistics;
use rusqlite::Connection;
use serde_json::json;

fn load_collections(conn: &Connection) -> Result<(Vec<Course>, Vec<Grade>), HandlerErr> {
    let courses = db::list_courses(conn).map_err(db_err("db_query_failed"))?;
    let grades = db::list_grades(conn).map_err(db_err("db_query_failed"))?;
    Ok((courses, grades))
}

fn stats_compute(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (courses, grades) = load_collections(conn)?;
    Ok(json!(compute_statistics(&courses, &grades)))
}

fn stats_charts(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (courses, grades) = load_collections(conn)?;
    let stats = compute_statistics(&courses, &grades);
    Ok(json!({
        "gradeDistribution": reports::distribution_chart(&stats),
        "coursePerformance": reports::course_performance_chart(&stats),
    }))
}

fn reports_transcript(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (courses, grades) = load_collections(conn)?;
    Ok(json!({ "rows": reports::transcript(&courses, &grades) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.compute" => Some(with_db(state, req, stats_compute)),
        "stats.charts" => Some(with_db(state, req, stats_charts)),
        "reports.transcript" => Some(with_db(state, req, reports_transcript)),
        _ => None,
    }
}
