use crate::model::{Course, Grade};
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

pub const DB_FILE_NAME: &str = "gradebook.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT,
            credit INTEGER NOT NULL,
            semester TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    // Workspaces created before semesters were tracked lack the column.
    ensure_courses_semester(&conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grades(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            midterm REAL,
            quiz REAL,
            final_score REAL,
            total_score REAL,
            letter_grade TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grades_course ON grades(course_id)",
        [],
    )?;

    Ok(conn)
}

fn ensure_courses_semester(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "courses", "semester")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE courses ADD COLUMN semester TEXT NOT NULL DEFAULT ''",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

const COURSE_COLUMNS: &str = "id, name, code, credit, semester, created_at, updated_at";
const GRADE_COLUMNS: &str =
    "id, course_id, midterm, quiz, final_score, total_score, letter_grade, created_at, updated_at";

fn course_from_row(r: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: r.get(0)?,
        name: r.get(1)?,
        code: r.get(2)?,
        credit: r.get(3)?,
        semester: r.get(4)?,
        created_at: r.get(5)?,
        updated_at: r.get(6)?,
    })
}

fn grade_from_row(r: &Row<'_>) -> rusqlite::Result<Grade> {
    Ok(Grade {
        id: r.get(0)?,
        course_id: r.get(1)?,
        midterm: r.get(2)?,
        quiz: r.get(3)?,
        final_exam: r.get(4)?,
        total_score: r.get(5)?,
        letter_grade: r.get(6)?,
        created_at: r.get(7)?,
        updated_at: r.get(8)?,
    })
}

/// All courses in the order they were added.
pub fn list_courses(conn: &Connection) -> anyhow::Result<Vec<Course>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM courses ORDER BY rowid",
        COURSE_COLUMNS
    ))?;
    let courses = stmt
        .query_map([], course_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(courses)
}

/// All grades in the order they were added. Statistics rely on this order
/// when a course has more than one graded record.
pub fn list_grades(conn: &Connection) -> anyhow::Result<Vec<Grade>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM grades ORDER BY rowid",
        GRADE_COLUMNS
    ))?;
    let grades = stmt
        .query_map([], grade_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(grades)
}

pub fn get_course(conn: &Connection, id: &str) -> anyhow::Result<Option<Course>> {
    let course = conn
        .query_row(
            &format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS),
            [id],
            course_from_row,
        )
        .optional()?;
    Ok(course)
}

pub fn get_grade(conn: &Connection, id: &str) -> anyhow::Result<Option<Grade>> {
    let grade = conn
        .query_row(
            &format!("SELECT {} FROM grades WHERE id = ?", GRADE_COLUMNS),
            [id],
            grade_from_row,
        )
        .optional()?;
    Ok(grade)
}

pub fn insert_course(conn: &Connection, c: &Course) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO courses(id, name, code, credit, semester, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &c.id,
            &c.name,
            &c.code,
            c.credit,
            &c.semester,
            &c.created_at,
            &c.updated_at,
        ),
    )?;
    Ok(())
}

pub fn update_course(conn: &Connection, c: &Course) -> anyhow::Result<bool> {
    let n = conn.execute(
        "UPDATE courses
         SET name = ?, code = ?, credit = ?, semester = ?, updated_at = ?
         WHERE id = ?",
        (&c.name, &c.code, c.credit, &c.semester, &c.updated_at, &c.id),
    )?;
    Ok(n > 0)
}

/// Delete a course and every grade that references it. Returns the number of
/// grades removed, or `None` when the course did not exist.
pub fn delete_course(conn: &Connection, id: &str) -> anyhow::Result<Option<usize>> {
    let tx = conn.unchecked_transaction()?;
    let removed_grades = tx.execute("DELETE FROM grades WHERE course_id = ?", [id])?;
    let removed = tx.execute("DELETE FROM courses WHERE id = ?", [id])?;
    if removed == 0 {
        tx.rollback()?;
        return Ok(None);
    }
    tx.commit()?;
    Ok(Some(removed_grades))
}

pub fn insert_grade(conn: &Connection, g: &Grade) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO grades(id, course_id, midterm, quiz, final_score, total_score, letter_grade, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &g.id,
            &g.course_id,
            g.midterm,
            g.quiz,
            g.final_exam,
            g.total_score,
            &g.letter_grade,
            &g.created_at,
            &g.updated_at,
        ),
    )?;
    Ok(())
}

pub fn update_grade(conn: &Connection, g: &Grade) -> anyhow::Result<bool> {
    let n = conn.execute(
        "UPDATE grades
         SET course_id = ?, midterm = ?, quiz = ?, final_score = ?, total_score = ?, letter_grade = ?, updated_at = ?
         WHERE id = ?",
        (
            &g.course_id,
            g.midterm,
            g.quiz,
            g.final_exam,
            g.total_score,
            &g.letter_grade,
            &g.updated_at,
            &g.id,
        ),
    )?;
    Ok(n > 0)
}

pub fn delete_grade(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM grades WHERE id = ?", [id])?;
    Ok(n > 0)
}

/// Replace both collections in one transaction, preserving the given order.
pub fn replace_collections(
    conn: &Connection,
    courses: &[Course],
    grades: &[Grade],
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM grades", [])?;
    tx.execute("DELETE FROM courses", [])?;
    for c in courses {
        insert_course(&tx, c).with_context(|| format!("failed to insert course {}", c.id))?;
    }
    for g in grades {
        insert_grade(&tx, g).with_context(|| format!("failed to insert grade {}", g.id))?;
    }
    tx.commit()?;
    Ok(())
}

/// Append collections after the existing rows in one transaction.
pub fn append_collections(
    conn: &Connection,
    courses: &[Course],
    grades: &[Grade],
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    for c in courses {
        insert_course(&tx, c).with_context(|| format!("failed to insert course {}", c.id))?;
    }
    for g in grades {
        insert_grade(&tx, g).with_context(|| format!("failed to insert grade {}", g.id))?;
    }
    tx.commit()?;
    Ok(())
}
