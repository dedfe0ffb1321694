use crate::calc;
use serde::{Deserialize, Serialize};

pub const COURSE_NAME_MAX: usize = 100;
pub const COURSE_CODE_MAX: usize = 20;
pub const SEMESTER_MAX: usize = 50;
pub const CREDIT_MAX: i64 = 10;
pub const DEFAULT_CREDIT: i64 = 3;

fn default_credit() -> i64 {
    DEFAULT_CREDIT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default = "default_credit")]
    pub credit: i64,
    pub semester: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A recorded exam result. `total_score` and `letter_grade` are derived from
/// the three components and are rebuilt whenever a grade is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub course_id: String,
    #[serde(default)]
    pub midterm: Option<f64>,
    #[serde(default)]
    pub quiz: Option<f64>,
    #[serde(default, rename = "final")]
    pub final_exam: Option<f64>,
    #[serde(default)]
    pub total_score: Option<f64>,
    #[serde(default)]
    pub letter_grade: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputError {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl InputError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseInput {
    pub name: String,
    pub code: Option<String>,
    pub credit: i64,
    pub semester: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput {
    pub midterm: Option<f64>,
    pub quiz: Option<f64>,
    pub final_exam: Option<f64>,
}

fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}

fn is_valid_code(code: &str) -> bool {
    code.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ')
}

impl CourseInput {
    /// Trim fields and check lengths/ranges. Uniqueness needs the other
    /// courses and is checked by `check_course_unique`.
    pub fn normalized(self) -> Result<CourseInput, InputError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(InputError::bad_params("name must not be empty"));
        }
        if name.chars().count() > COURSE_NAME_MAX {
            return Err(InputError::bad_params(format!(
                "name must be at most {} characters",
                COURSE_NAME_MAX
            )));
        }

        let code = match self.code.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(c) => {
                if c.chars().count() > COURSE_CODE_MAX {
                    return Err(InputError::bad_params(format!(
                        "code must be at most {} characters",
                        COURSE_CODE_MAX
                    )));
                }
                if !is_valid_code(c) {
                    return Err(InputError::bad_params(
                        "code may only contain letters, digits, dashes and spaces",
                    ));
                }
                Some(c.to_string())
            }
        };

        if !(0..=CREDIT_MAX).contains(&self.credit) {
            return Err(InputError::bad_params(format!(
                "credit must be between 0 and {}",
                CREDIT_MAX
            )));
        }

        let semester = self.semester.trim().to_string();
        if semester.is_empty() {
            return Err(InputError::bad_params("semester must not be empty"));
        }
        if semester.chars().count() > SEMESTER_MAX {
            return Err(InputError::bad_params(format!(
                "semester must be at most {} characters",
                SEMESTER_MAX
            )));
        }

        Ok(CourseInput {
            name,
            code,
            credit: self.credit,
            semester,
        })
    }
}

/// Name and code are unique across courses, ignoring case and surrounding
/// whitespace. `exclude_id` skips the course being edited.
pub fn check_course_unique(
    input: &CourseInput,
    courses: &[Course],
    exclude_id: Option<&str>,
) -> Result<(), InputError> {
    let others = || courses.iter().filter(move |c| Some(c.id.as_str()) != exclude_id);

    let name_key = normalize_key(&input.name);
    if let Some(clash) = others().find(|c| normalize_key(&c.name) == name_key) {
        return Err(InputError {
            code: "duplicate_name",
            message: "a course with this name already exists".to_string(),
            details: Some(serde_json::json!({ "courseId": clash.id })),
        });
    }

    if let Some(code) = input.code.as_deref() {
        let code_key = normalize_key(code);
        if let Some(clash) = others().find(|c| {
            c.code
                .as_deref()
                .map(|v| !v.trim().is_empty() && normalize_key(v) == code_key)
                .unwrap_or(false)
        }) {
            return Err(InputError {
                code: "duplicate_code",
                message: "a course with this code already exists".to_string(),
                details: Some(serde_json::json!({ "courseId": clash.id })),
            });
        }
    }
    Ok(())
}

fn check_score(label: &str, v: Option<f64>) -> Result<(), InputError> {
    match v {
        Some(x) if !x.is_finite() || !(0.0..=100.0).contains(&x) => Err(InputError::bad_params(
            format!("{} must be between 0 and 100", label),
        )),
        _ => Ok(()),
    }
}

impl ScoreInput {
    pub fn validate(&self) -> Result<(), InputError> {
        check_score("midterm", self.midterm)?;
        check_score("quiz", self.quiz)?;
        check_score("final", self.final_exam)?;
        if self.midterm.is_none() && self.quiz.is_none() && self.final_exam.is_none() {
            return Err(InputError::new(
                "no_scores",
                "at least one of midterm, quiz or final is required",
            ));
        }
        Ok(())
    }
}

impl Course {
    pub fn from_input(id: String, input: CourseInput, created_at: String) -> Course {
        Course {
            id,
            name: input.name,
            code: input.code,
            credit: input.credit,
            semester: input.semester,
            created_at,
            updated_at: None,
        }
    }

    pub fn input(&self) -> CourseInput {
        CourseInput {
            name: self.name.clone(),
            code: self.code.clone(),
            credit: self.credit,
            semester: self.semester.clone(),
        }
    }
}

impl Grade {
    /// Build a grade with its derived fields computed from `scores`.
    pub fn derive(
        id: String,
        course_id: String,
        scores: ScoreInput,
        created_at: String,
        updated_at: Option<String>,
    ) -> Grade {
        let result = calc::calculate_grade(scores.midterm, scores.quiz, scores.final_exam);
        Grade {
            id,
            course_id,
            midterm: scores.midterm,
            quiz: scores.quiz,
            final_exam: scores.final_exam,
            total_score: result.total_score,
            letter_grade: result.letter_grade.map(str::to_string),
            created_at,
            updated_at,
        }
    }

    pub fn scores(&self) -> ScoreInput {
        ScoreInput {
            midterm: self.midterm,
            quiz: self.quiz,
            final_exam: self.final_exam,
        }
    }

    /// Same grade with derived fields recomputed, discarding whatever was stored.
    pub fn rederived(self) -> Grade {
        let scores = self.scores();
        Grade::derive(self.id, self.course_id, scores, self.created_at, self.updated_at)
    }
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Stored records carry RFC 3339 `createdAt` and, once edited, `updatedAt`.
pub fn check_timestamps(created_at: &str, updated_at: Option<&str>) -> Result<(), InputError> {
    for (label, value) in [("createdAt", Some(created_at)), ("updatedAt", updated_at)] {
        let Some(value) = value else {
            continue;
        };
        if let Err(e) = chrono::DateTime::parse_from_rfc3339(value) {
            return Err(InputError::bad_params(format!(
                "{} is not a valid timestamp: {}",
                label, e
            )));
        }
    }
    Ok(())
}
