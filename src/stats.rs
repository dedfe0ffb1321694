use crate::calc;
use crate::model::{Course, Grade};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStat {
    pub course: Course,
    pub grade: Option<Grade>,
    pub gpa: f64,
    pub credits: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(rename = "totalGPA")]
    pub total_gpa: f64,
    pub total_credits: i64,
    pub completed_credits: i64,
    pub course_count: usize,
    pub grade_distribution: BTreeMap<String, usize>,
    pub course_stats: Vec<CourseStat>,
}

/// Coefficient for a stored letter; labels outside the scale count as 0.
pub fn coefficient_for_letter(letter: Option<&str>) -> f64 {
    letter
        .and_then(calc::tier_by_letter)
        .map(|t| t.coefficient)
        .unwrap_or(0.0)
}

/// The grade that stands for `course_id`: the first graded record in input
/// order. Pending grades (no final yet) never match.
pub fn matched_grade<'a>(course_id: &str, grades: &'a [Grade]) -> Option<&'a Grade> {
    grades
        .iter()
        .find(|g| g.course_id == course_id && g.letter_grade.is_some())
}

pub fn compute_statistics(courses: &[Course], grades: &[Grade]) -> Statistics {
    let course_stats: Vec<CourseStat> = courses
        .iter()
        .map(|course| {
            let grade = matched_grade(&course.id, grades);
            CourseStat {
                course: course.clone(),
                grade: grade.cloned(),
                gpa: coefficient_for_letter(grade.and_then(|g| g.letter_grade.as_deref())),
                credits: course.credit,
            }
        })
        .collect();

    let total_credits: i64 = course_stats.iter().map(|s| s.credits).sum();

    let mut completed_credits = 0_i64;
    let mut weighted_points = 0.0_f64;
    let mut grade_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for stat in course_stats.iter() {
        let Some(letter) = stat.grade.as_ref().and_then(|g| g.letter_grade.as_ref()) else {
            continue;
        };
        completed_credits += stat.credits;
        weighted_points += stat.gpa * (stat.credits as f64);
        *grade_distribution.entry(letter.clone()).or_insert(0) += 1;
    }

    let total_gpa = if completed_credits > 0 {
        weighted_points / (completed_credits as f64)
    } else {
        0.0
    };

    Statistics {
        total_gpa,
        total_credits,
        completed_credits,
        course_count: courses.len(),
        grade_distribution,
        course_stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScoreInput;

    fn course(id: &str, name: &str, credit: i64) -> Course {
        Course {
            id: id.to_string(),
            name: name.to_string(),
            code: None,
            credit,
            semester: "2024-2025 Spring".to_string(),
            created_at: "2025-02-01T00:00:00Z".to_string(),
            updated_at: None,
        }
    }

    fn grade(id: &str, course_id: &str, m: f64, q: f64, f: Option<f64>) -> Grade {
        Grade::derive(
            id.to_string(),
            course_id.to_string(),
            ScoreInput { midterm: Some(m), quiz: Some(q), final_exam: f },
            "2025-06-01T00:00:00Z".to_string(),
            None,
        )
    }

    #[test]
    fn empty_inputs_give_zero_statistics() {
        let s = compute_statistics(&[], &[]);
        assert_eq!(s.total_gpa, 0.0);
        assert_eq!(s.total_credits, 0);
        assert_eq!(s.completed_credits, 0);
        assert_eq!(s.course_count, 0);
        assert!(s.grade_distribution.is_empty());
        assert!(s.course_stats.is_empty());

        let v = serde_json::to_value(&s).expect("serialize");
        assert_eq!(
            v,
            serde_json::json!({
                "totalGPA": 0.0,
                "totalCredits": 0,
                "completedCredits": 0,
                "courseCount": 0,
                "gradeDistribution": {},
                "courseStats": []
            })
        );
    }

    #[test]
    fn ungraded_courses_count_toward_total_credits_only() {
        let courses = vec![course("a", "Algorithms", 4), course("b", "Biology", 3)];
        // 100*0.375 + 100*0.125 + 75*0.5 = 87.5 -> 88 -> BA (3.5)
        let grades = vec![grade("g1", "a", 100.0, 100.0, Some(75.0))];

        let s = compute_statistics(&courses, &grades);
        assert_eq!(s.total_credits, 7);
        assert_eq!(s.completed_credits, 4);
        assert_eq!(s.total_gpa, 3.5);
        assert_eq!(s.course_count, 2);
        assert_eq!(s.grade_distribution.get("BA"), Some(&1));
        assert_eq!(s.grade_distribution.len(), 1);
        assert_eq!(s.course_stats[1].grade, None);
        assert_eq!(s.course_stats[1].gpa, 0.0);
    }

    #[test]
    fn gpa_is_credit_weighted() {
        let courses = vec![course("a", "A", 4), course("b", "B", 2)];
        let grades = vec![
            grade("g1", "a", 100.0, 100.0, Some(100.0)), // AA 4.0
            grade("g2", "b", 80.0, 60.0, Some(85.0)),    // BB 3.0
        ];
        let s = compute_statistics(&courses, &grades);
        assert!((s.total_gpa - (4.0 * 4.0 + 3.0 * 2.0) / 6.0).abs() < 1e-12);
    }

    #[test]
    fn pending_grade_does_not_grade_a_course() {
        let courses = vec![course("a", "A", 3)];
        let grades = vec![grade("g1", "a", 90.0, 90.0, None)];
        let s = compute_statistics(&courses, &grades);
        assert_eq!(s.completed_credits, 0);
        assert_eq!(s.total_gpa, 0.0);
        assert_eq!(s.course_stats[0].grade, None);
    }

    #[test]
    fn first_graded_record_in_input_order_wins() {
        let courses = vec![course("a", "A", 3)];
        let pending = grade("g0", "a", 10.0, 10.0, None);
        let first = grade("g1", "a", 80.0, 60.0, Some(85.0)); // BB
        let retake = grade("g2", "a", 100.0, 100.0, Some(100.0)); // AA

        let s = compute_statistics(&courses, &[pending.clone(), first.clone(), retake.clone()]);
        assert_eq!(s.course_stats[0].grade.as_ref().map(|g| g.id.as_str()), Some("g1"));
        assert_eq!(s.total_gpa, 3.0);

        let s = compute_statistics(&courses, &[retake, pending, first]);
        assert_eq!(s.course_stats[0].grade.as_ref().map(|g| g.id.as_str()), Some("g2"));
        assert_eq!(s.total_gpa, 4.0);
    }

    #[test]
    fn zero_credit_graded_courses_do_not_divide_by_zero() {
        let courses = vec![course("a", "Seminar", 0)];
        let grades = vec![grade("g1", "a", 100.0, 100.0, Some(100.0))];
        let s = compute_statistics(&courses, &grades);
        assert_eq!(s.completed_credits, 0);
        assert_eq!(s.total_gpa, 0.0);
        assert_eq!(s.grade_distribution.get("AA"), Some(&1));
    }

    #[test]
    fn unknown_letters_count_as_zero_points() {
        assert_eq!(coefficient_for_letter(Some("A+")), 0.0);
        assert_eq!(coefficient_for_letter(None), 0.0);
        assert_eq!(coefficient_for_letter(Some("CB")), 2.5);
    }

    #[test]
    fn statistics_are_idempotent() {
        let courses = vec![course("a", "A", 4), course("b", "B", 3)];
        let grades = vec![grade("g1", "a", 55.0, 70.0, Some(62.0))];
        assert_eq!(
            compute_statistics(&courses, &grades),
            compute_statistics(&courses, &grades)
        );
    }
}
