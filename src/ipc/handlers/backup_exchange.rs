use crate::backup;
use crate::db;
use crate::exchange::{plan_import, ImportMode};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_err, get_opt_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::now_timestamp;
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn handle_backup_export_workspace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing outPath", None),
    };
    let Some(workspace_path) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Some(conn) = state.db.as_ref() {
        let _ = conn.execute_batch("PRAGMA wal_checkpoint(FULL)");
    }

    let out = PathBuf::from(&out_path);
    let export = match backup::export_workspace_bundle(&workspace_path, &out) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "workspace export failed");
            return err(
                &req.id,
                "backup_failed",
                format!("{e:#}"),
                Some(json!({ "path": out_path })),
            );
        }
    };
    info!(path = %out_path, "workspace exported");

    ok(
        &req.id,
        json!({
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "dbSha256": export.db_sha256
        }),
    )
}

fn handle_backup_import_workspace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match req.params.get("inPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing inPath", None),
    };
    let Some(workspace_path) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    // Drop open handle before replacing file.
    state.db = None;

    let import = backup::import_workspace_bundle(&src, &workspace_path);
    // Reopen whatever is on disk now, restored or not.
    let reopened = db::open_db(&workspace_path);
    let import = match import {
        Ok(v) => v,
        Err(e) => {
            state.db = reopened.ok();
            warn!(error = %e, "workspace import failed");
            return err(
                &req.id,
                "backup_failed",
                format!("{e:#}"),
                Some(json!({ "path": src.to_string_lossy() })),
            );
        }
    };

    match reopened {
        Ok(conn) => {
            state.db = Some(conn);
            info!(path = %in_path, format = %import.bundle_format_detected, "workspace restored");
            ok(
                &req.id,
                json!({
                    "workspacePath": workspace_path.to_string_lossy(),
                    "bundleFormatDetected": import.bundle_format_detected
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", e.to_string(), None),
    }
}

fn collections_export(conn: &Connection, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let courses = db::list_courses(conn).map_err(db_err("db_query_failed"))?;
    let grades = db::list_grades(conn).map_err(db_err("db_query_failed"))?;
    Ok(json!({
        "exportedAt": now_timestamp(),
        "courses": courses,
        "grades": grades,
    }))
}

fn get_array<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a [serde_json::Value], HandlerErr> {
    match params.get(key) {
        None => Ok(&[]),
        Some(v) if v.is_null() => Ok(&[]),
        Some(v) => v
            .as_array()
            .map(|a| a.as_slice())
            .ok_or_else(|| HandlerErr::new("bad_params", format!("{} must be an array", key))),
    }
}

fn collections_import(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mode_raw = get_opt_str(params, "mode")?;
    let Some(mode) = ImportMode::parse(mode_raw.as_deref()) else {
        return Err(HandlerErr::new("bad_params", "mode must be 'replace' or 'merge'"));
    };
    let raw_courses = get_array(params, "courses")?;
    let raw_grades = get_array(params, "grades")?;

    let existing_courses = db::list_courses(conn).map_err(db_err("db_query_failed"))?;
    let existing_grades = db::list_grades(conn).map_err(db_err("db_query_failed"))?;
    let plan = plan_import(
        mode,
        &existing_courses,
        &existing_grades,
        raw_courses,
        raw_grades,
    );

    let written = match mode {
        ImportMode::Replace => db::replace_collections(conn, &plan.courses, &plan.grades),
        ImportMode::Merge => db::append_collections(conn, &plan.courses, &plan.grades),
    };
    written.map_err(|e| HandlerErr {
        code: "db_tx_failed",
        message: format!("{e:#}"),
        details: None,
    })?;

    info!(
        courses = plan.courses.len(),
        grades = plan.grades.len(),
        rejected = plan.rejected.len(),
        "collections imported"
    );
    Ok(json!({
        "mode": match mode {
            ImportMode::Replace => "replace",
            ImportMode::Merge => "merge",
        },
        "acceptedCourses": plan.courses.len(),
        "acceptedGrades": plan.grades.len(),
        "rejected": plan.rejected,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspace" => Some(handle_backup_export_workspace(state, req)),
        "backup.importWorkspace" => Some(handle_backup_import_workspace(state, req)),
        "collections.export" => Some(with_db(state, req, collections_export)),
        "collections.import" => Some(with_db(state, req, collections_import)),
        _ => None,
    }
}
