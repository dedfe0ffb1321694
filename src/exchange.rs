use crate::model::{check_course_unique, check_timestamps, Course, Grade};
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Imported collections become the whole workspace.
    Replace,
    /// Imported records are appended after the existing ones.
    Merge,
}

impl ImportMode {
    pub fn parse(raw: Option<&str>) -> Option<ImportMode> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("replace") => Some(ImportMode::Replace),
            Some("merge") => Some(ImportMode::Merge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub collection: &'static str,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    pub courses: Vec<Course>,
    pub grades: Vec<Grade>,
    pub rejected: Vec<Rejection>,
}

fn reject(rejected: &mut Vec<Rejection>, collection: &'static str, index: usize, reason: String) {
    warn!(collection, index, reason = %reason, "skipping malformed record");
    rejected.push(Rejection {
        collection,
        index,
        reason,
    });
}

/// Screen raw collection records before they reach the store.
///
/// Records that fail to parse or break a course/grade rule are skipped and
/// reported; the rest keep their input order. Derived grade fields are
/// recomputed from the component scores.
pub fn plan_import(
    mode: ImportMode,
    existing_courses: &[Course],
    existing_grades: &[Grade],
    raw_courses: &[serde_json::Value],
    raw_grades: &[serde_json::Value],
) -> ImportPlan {
    let (mut known_courses, known_grade_ids): (Vec<Course>, HashSet<String>) = match mode {
        ImportMode::Replace => (Vec::new(), HashSet::new()),
        ImportMode::Merge => (
            existing_courses.to_vec(),
            existing_grades.iter().map(|g| g.id.clone()).collect(),
        ),
    };
    let mut rejected: Vec<Rejection> = Vec::new();
    let mut courses: Vec<Course> = Vec::new();

    for (index, raw) in raw_courses.iter().enumerate() {
        let course: Course = match serde_json::from_value(raw.clone()) {
            Ok(c) => c,
            Err(e) => {
                reject(&mut rejected, "courses", index, e.to_string());
                continue;
            }
        };
        if course.id.trim().is_empty() {
            reject(&mut rejected, "courses", index, "missing id".to_string());
            continue;
        }
        if let Err(e) = check_timestamps(&course.created_at, course.updated_at.as_deref()) {
            reject(&mut rejected, "courses", index, e.message);
            continue;
        }
        if known_courses.iter().any(|c| c.id == course.id) {
            reject(&mut rejected, "courses", index, format!("duplicate id {}", course.id));
            continue;
        }
        let input = match course.input().normalized() {
            Ok(v) => v,
            Err(e) => {
                reject(&mut rejected, "courses", index, e.message);
                continue;
            }
        };
        if let Err(e) = check_course_unique(&input, &known_courses, None) {
            reject(&mut rejected, "courses", index, e.message);
            continue;
        }
        let course = Course {
            name: input.name,
            code: input.code,
            credit: input.credit,
            semester: input.semester,
            ..course
        };
        known_courses.push(course.clone());
        courses.push(course);
    }

    let mut grade_ids = known_grade_ids;
    let mut grades: Vec<Grade> = Vec::new();
    for (index, raw) in raw_grades.iter().enumerate() {
        let grade: Grade = match serde_json::from_value(raw.clone()) {
            Ok(g) => g,
            Err(e) => {
                reject(&mut rejected, "grades", index, e.to_string());
                continue;
            }
        };
        if grade.id.trim().is_empty() {
            reject(&mut rejected, "grades", index, "missing id".to_string());
            continue;
        }
        if let Err(e) = check_timestamps(&grade.created_at, grade.updated_at.as_deref()) {
            reject(&mut rejected, "grades", index, e.message);
            continue;
        }
        if grade_ids.contains(&grade.id) {
            reject(&mut rejected, "grades", index, format!("duplicate id {}", grade.id));
            continue;
        }
        if let Err(e) = grade.scores().validate() {
            reject(&mut rejected, "grades", index, e.message);
            continue;
        }
        if !known_courses.iter().any(|c| c.id == grade.course_id) {
            reject(
                &mut rejected,
                "grades",
                index,
                format!("unknown course {}", grade.course_id),
            );
            continue;
        }
        grade_ids.insert(grade.id.clone());
        grades.push(grade.rederived());
    }

    ImportPlan {
        courses,
        grades,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_course(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "credit": 3,
            "semester": "2024-2025 Fall",
            "createdAt": "2024-09-01T00:00:00Z"
        })
    }

    #[test]
    fn malformed_records_are_skipped_not_fatal() {
        let courses = vec![
            raw_course("c1", "Physics"),
            json!({ "id": "c2", "name": "No credit", "semester": "2024-2025 Fall",
                    "createdAt": "2024-09-01T00:00:00Z" }),
            raw_course("c3", " physics "),
            raw_course("c4", "Chemistry"),
            json!({ "id": "c5", "name": "Bad date", "credit": 2, "semester": "x",
                    "createdAt": "not-a-date" }),
            json!({ "id": "c6", "name": "No semester", "credit": 2,
                    "createdAt": "2024-09-01T00:00:00Z" }),
        ];
        let grades = vec![
            json!({ "id": "g1", "courseId": "c1", "midterm": 80, "quiz": 60, "final": 85,
                    "letterGrade": "AA", "createdAt": "2025-01-01T00:00:00Z" }),
            json!({ "id": "g2", "courseId": "c2", "final": 50, "createdAt": "2025-01-01T00:00:00Z" }),
            json!({ "id": "g3", "courseId": "c4", "createdAt": "2025-01-01T00:00:00Z" }),
            json!({ "id": "g4", "courseId": "c4", "midterm": 120, "createdAt": "2025-01-01T00:00:00Z" }),
            json!({ "id": "g5", "courseId": "c4", "quiz": 0, "createdAt": "2025-01-01T00:00:00Z" }),
            json!({ "id": "g6", "courseId": "c4", "quiz": 50, "createdAt": "garbage" }),
            json!({ "id": "g7", "courseId": "c4", "quiz": 50, "createdAt": "2025-01-01T00:00:00Z",
                    "updatedAt": "later" }),
        ];

        let plan = plan_import(ImportMode::Replace, &[], &[], &courses, &grades);
        let course_ids: Vec<&str> = plan.courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(course_ids, vec!["c1", "c2", "c4"]);
        // A stored course without credit takes the default.
        assert_eq!(plan.courses[1].credit, crate::model::DEFAULT_CREDIT);
        let grade_ids: Vec<&str> = plan.grades.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(grade_ids, vec!["g1", "g2", "g5"]);

        // Stored letter is ignored in favour of the recomputed one.
        assert_eq!(plan.grades[0].letter_grade.as_deref(), Some("BB"));
        assert_eq!(plan.grades[0].total_score, Some(80.0));

        let rejected: Vec<(&str, usize)> =
            plan.rejected.iter().map(|r| (r.collection, r.index)).collect();
        assert_eq!(
            rejected,
            vec![
                ("courses", 2),
                ("courses", 4),
                ("courses", 5),
                ("grades", 2),
                ("grades", 3),
                ("grades", 5),
                ("grades", 6),
            ]
        );
        assert!(plan.rejected[1].reason.contains("createdAt"));
        assert!(plan.rejected[6].reason.contains("updatedAt"));
    }

    #[test]
    fn merge_checks_against_existing_records() {
        let existing: Course = serde_json::from_value(raw_course("c1", "Physics")).expect("course");
        let plan = plan_import(
            ImportMode::Merge,
            &[existing],
            &[],
            &[raw_course("c1", "Other"), raw_course("c2", "PHYSICS"), raw_course("c3", "Art")],
            &[json!({ "id": "g1", "courseId": "c1", "final": 90, "createdAt": "2025-01-01T00:00:00Z" })],
        );
        assert_eq!(plan.courses.len(), 1);
        assert_eq!(plan.courses[0].id, "c3");
        assert_eq!(plan.grades.len(), 1);
        assert_eq!(plan.rejected.len(), 2);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(ImportMode::parse(None), Some(ImportMode::Replace));
        assert_eq!(ImportMode::parse(Some("MERGE")), Some(ImportMode::Merge));
        assert_eq!(ImportMode::parse(Some("upsert")), None);
    }
}
