use crate::calc::GRADE_SCALE;
use crate::model::{Course, Grade};
use crate::stats::{coefficient_for_letter, Statistics};
use serde::Serialize;
use std::cmp::Ordering;

pub const DEFAULT_PER_PAGE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRow {
    pub course: Course,
    pub grade: Grade,
    pub gpa: f64,
}

/// Every grade whose course still exists, ordered by course name.
/// Grades for the same course keep their recorded order.
pub fn transcript(courses: &[Course], grades: &[Grade]) -> Vec<TranscriptRow> {
    let mut rows: Vec<TranscriptRow> = grades
        .iter()
        .filter_map(|g| {
            let course = courses.iter().find(|c| c.id == g.course_id)?;
            Some(TranscriptRow {
                course: course.clone(),
                grade: g.clone(),
                gpa: coefficient_for_letter(g.letter_grade.as_deref()),
            })
        })
        .collect();
    rows.sort_by(|a, b| compare_names(&a.course.name, &b.course.name));
    rows
}

// Turkish alphabet order, with q, w and x slotted in where Latin puts them.
const COLLATION_ALPHABET: &str = "abcçdefgğhıijklmnoöpqrsştuüvwxyz";

fn fold_turkish(c: char) -> char {
    match c {
        'I' => 'ı',
        'İ' => 'i',
        'Ç' => 'ç',
        'Ğ' => 'ğ',
        'Ö' => 'ö',
        'Ş' => 'ş',
        'Ü' => 'ü',
        _ => c.to_lowercase().next().unwrap_or(c),
    }
}

/// Case-insensitive sort key over the Turkish alphabet. Characters outside
/// it (digits, spaces, punctuation) sort before letters by code point.
fn collation_key(name: &str) -> Vec<u32> {
    name.chars()
        .map(fold_turkish)
        .map(|c| match COLLATION_ALPHABET.chars().position(|l| l == c) {
            Some(i) => 0x11_0000 + i as u32,
            None => c as u32,
        })
        .collect()
}

/// Course name order for listings and transcripts.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBucket {
    pub name: &'static str,
    pub value: usize,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePerformance {
    pub name: String,
    pub gpa: f64,
    pub score: f64,
    pub credits: i64,
}

/// Distribution buckets in scale order, empty buckets dropped.
pub fn distribution_chart(stats: &Statistics) -> Vec<DistributionBucket> {
    GRADE_SCALE
        .iter()
        .map(|t| DistributionBucket {
            name: t.letter,
            value: stats.grade_distribution.get(t.letter).copied().unwrap_or(0),
            coefficient: t.coefficient,
        })
        .filter(|b| b.value > 0)
        .collect()
}

/// Graded courses, best coefficient first.
pub fn course_performance_chart(stats: &Statistics) -> Vec<CoursePerformance> {
    let mut out: Vec<CoursePerformance> = stats
        .course_stats
        .iter()
        .filter_map(|s| {
            let grade = s.grade.as_ref()?;
            Some(CoursePerformance {
                name: s.course.name.clone(),
                gpa: s.gpa,
                score: grade.total_score.unwrap_or(0.0),
                credits: s.credits,
            })
        })
        .collect();
    out.sort_by(|a, b| b.gpa.partial_cmp(&a.gpa).unwrap_or(Ordering::Equal));
    out
}

#[derive(Debug, Clone, Default)]
pub struct GradeFilter {
    pub course_id: Option<String>,
    pub search: Option<String>,
    pub letter_grade: Option<String>,
}

/// Apply the grade list filters. `search` matches a case-insensitive
/// substring of the grade's course name; grades of missing courses never
/// match a search.
pub fn filter_grades(courses: &[Course], grades: &[Grade], filter: &GradeFilter) -> Vec<Grade> {
    let query = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    grades
        .iter()
        .filter(|g| {
            filter
                .course_id
                .as_deref()
                .map(|id| g.course_id == id)
                .unwrap_or(true)
        })
        .filter(|g| {
            let Some(q) = query.as_deref() else {
                return true;
            };
            courses
                .iter()
                .find(|c| c.id == g.course_id)
                .map(|c| c.name.to_lowercase().contains(q))
                .unwrap_or(false)
        })
        .filter(|g| {
            filter
                .letter_grade
                .as_deref()
                .map(|l| g.letter_grade.as_deref() == Some(l))
                .unwrap_or(true)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub per_page: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub total_items: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Slice one page out of `items`. Pages are 1-based; an out-of-range page is
/// clamped into `[1, total_pages]` and there is always at least one page.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> (Vec<T>, PageInfo) {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page).max(1);
    let current_page = page.clamp(1, total_pages);
    let start_index = (current_page - 1) * per_page;
    let end_index = (start_index + per_page).min(total_items);
    let slice = items
        .get(start_index..end_index)
        .map(|s| s.to_vec())
        .unwrap_or_default();
    (
        slice,
        PageInfo {
            current_page,
            total_pages,
            per_page,
            start_index,
            end_index,
            total_items,
            has_next_page: current_page < total_pages,
            has_previous_page: current_page > 1,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScoreInput;
    use crate::stats::compute_statistics;

    fn course(id: &str, name: &str, credit: i64) -> Course {
        Course {
            id: id.to_string(),
            name: name.to_string(),
            code: None,
            credit,
            semester: "Fall".to_string(),
            created_at: "2024-09-01T00:00:00Z".to_string(),
            updated_at: None,
        }
    }

    fn grade(id: &str, course_id: &str, f: Option<f64>) -> Grade {
        Grade::derive(
            id.to_string(),
            course_id.to_string(),
            ScoreInput { midterm: Some(80.0), quiz: Some(60.0), final_exam: f },
            "2025-01-01T00:00:00Z".to_string(),
            None,
        )
    }

    #[test]
    fn transcript_sorts_by_course_name_and_skips_orphans() {
        let courses = vec![course("z", "zoology", 3), course("a", "Algebra", 4)];
        let grades = vec![
            grade("g1", "z", Some(85.0)),
            grade("g2", "missing", Some(85.0)),
            grade("g3", "a", None),
        ];
        let rows = transcript(&courses, &grades);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].course.name, "Algebra");
        assert_eq!(rows[0].gpa, 0.0);
        assert_eq!(rows[1].course.name, "zoology");
        assert_eq!(rows[1].gpa, 3.0);
    }

    #[test]
    fn course_names_follow_turkish_alphabet() {
        let mut names = vec![
            "Zooloji", "İstatistik", "çevre", "Ilıman", "Coğrafya", "Şehircilik", "Sanat", "ıhlamur",
        ];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(
            names,
            vec!["Coğrafya", "çevre", "ıhlamur", "Ilıman", "İstatistik", "Sanat", "Şehircilik", "Zooloji"]
        );
        assert_eq!(compare_names("algebra", "Algebra"), Ordering::Greater);
        assert_eq!(compare_names("Algebra II", "Algebra2"), Ordering::Less);
    }

    #[test]
    fn charts_follow_scale_and_gpa_order() {
        let courses = vec![course("a", "A", 3), course("b", "B", 3), course("c", "C", 3)];
        let grades = vec![
            grade("g1", "a", Some(85.0)), // BB
            Grade::derive(
                "g2".into(),
                "b".into(),
                ScoreInput { midterm: Some(100.0), quiz: Some(100.0), final_exam: Some(100.0) },
                "t".into(),
                None,
            ),
        ];
        let stats = compute_statistics(&courses, &grades);

        let dist = distribution_chart(&stats);
        let names: Vec<&str> = dist.iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["AA", "BB"]);

        let perf = course_performance_chart(&stats);
        assert_eq!(perf.len(), 2);
        assert_eq!(perf[0].name, "B");
        assert_eq!(perf[0].score, 100.0);
        assert_eq!(perf[1].name, "A");
    }

    #[test]
    fn filters_compose() {
        let courses = vec![course("a", "Linear Algebra", 3), course("b", "Biology", 3)];
        let grades = vec![
            grade("g1", "a", Some(85.0)),
            grade("g2", "b", Some(85.0)),
            grade("g3", "a", None),
        ];

        let by_course = filter_grades(
            &courses,
            &grades,
            &GradeFilter { course_id: Some("a".into()), ..Default::default() },
        );
        assert_eq!(by_course.len(), 2);

        let by_search = filter_grades(
            &courses,
            &grades,
            &GradeFilter { search: Some("  ALGEB ".into()), ..Default::default() },
        );
        assert_eq!(by_search.iter().map(|g| g.id.as_str()).collect::<Vec<_>>(), vec!["g1", "g3"]);

        let by_letter = filter_grades(
            &courses,
            &grades,
            &GradeFilter {
                course_id: Some("a".into()),
                letter_grade: Some("BB".into()),
                ..Default::default()
            },
        );
        assert_eq!(by_letter.len(), 1);
        assert_eq!(by_letter[0].id, "g1");
    }

    #[test]
    fn pagination_clamps_pages() {
        let items: Vec<i32> = (0..23).collect();

        let (page, info) = paginate(&items, 3, 10);
        assert_eq!(page, vec![20, 21, 22]);
        assert_eq!(info.total_pages, 3);
        assert!(!info.has_next_page);
        assert!(info.has_previous_page);

        let (page, info) = paginate(&items, 99, 10);
        assert_eq!(info.current_page, 3);
        assert_eq!(page.len(), 3);

        let (page, info) = paginate(&items, 0, 10);
        assert_eq!(info.current_page, 1);
        assert_eq!(page.len(), 10);

        let empty: Vec<i32> = Vec::new();
        let (page, info) = paginate(&empty, 1, 10);
        assert!(page.is_empty());
        assert_eq!(info.total_pages, 1);
        assert_eq!(info.end_index, 0);
    }
}
