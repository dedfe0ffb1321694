use serde::Serialize;

pub const MIDTERM_WEIGHT: f64 = 0.375;
pub const QUIZ_WEIGHT: f64 = 0.125;
pub const FINAL_WEIGHT: f64 = 0.5;

/// One band of the letter-grade scale. `min` and `max` are inclusive bounds on
/// the rounded (ceiling) total score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeTier {
    pub letter: &'static str,
    pub coefficient: f64,
    pub min: i64,
    pub max: i64,
}

/// Ordered by descending threshold; contiguous over [0, 100].
pub static GRADE_SCALE: [GradeTier; 9] = [
    GradeTier { letter: "AA", coefficient: 4.0, min: 90, max: 100 },
    GradeTier { letter: "BA", coefficient: 3.5, min: 85, max: 89 },
    GradeTier { letter: "BB", coefficient: 3.0, min: 75, max: 84 },
    GradeTier { letter: "CB", coefficient: 2.5, min: 70, max: 74 },
    GradeTier { letter: "CC", coefficient: 2.0, min: 60, max: 69 },
    GradeTier { letter: "DC", coefficient: 1.5, min: 55, max: 59 },
    GradeTier { letter: "DD", coefficient: 1.0, min: 50, max: 54 },
    GradeTier { letter: "FD", coefficient: 0.5, min: 40, max: 49 },
    GradeTier { letter: "FF", coefficient: 0.0, min: 0, max: 39 },
];

fn highest_tier() -> &'static GradeTier {
    &GRADE_SCALE[0]
}

fn lowest_tier() -> &'static GradeTier {
    &GRADE_SCALE[GRADE_SCALE.len() - 1]
}

/// Classify an already-rounded score. Scores outside [0, 100] clamp to the
/// nearest end of the scale.
pub fn tier_for_score(rounded: i64) -> &'static GradeTier {
    if rounded < 0 {
        return lowest_tier();
    }
    if rounded > 100 {
        return highest_tier();
    }
    GRADE_SCALE
        .iter()
        .find(|t| rounded >= t.min && rounded <= t.max)
        .unwrap_or_else(lowest_tier)
}

pub fn tier_by_letter(letter: &str) -> Option<&'static GradeTier> {
    GRADE_SCALE.iter().find(|t| t.letter == letter)
}

/// Midterm/quiz contribution to the total, before the final is known.
pub fn component_average(midterm: f64, quiz: f64) -> f64 {
    midterm * MIDTERM_WEIGHT + quiz * QUIZ_WEIGHT
}

/// Displayed scores are rounded up, and classification uses the same value.
pub fn round_up_score(total: f64) -> i64 {
    total.ceil() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub total_score: Option<f64>,
    pub rounded_score: Option<i64>,
    pub letter_grade: Option<&'static str>,
    pub coefficient: Option<f64>,
}

/// Blend the three components into a total and classify it.
///
/// Missing midterm/quiz count as 0. A missing final means there is no total
/// yet; a final of 0 is a real score and produces one.
pub fn calculate_grade(
    midterm: Option<f64>,
    quiz: Option<f64>,
    final_exam: Option<f64>,
) -> GradeResult {
    let average = component_average(midterm.unwrap_or(0.0), quiz.unwrap_or(0.0));

    let Some(final_exam) = final_exam else {
        return GradeResult {
            total_score: None,
            rounded_score: None,
            letter_grade: None,
            coefficient: None,
        };
    };

    let total = average + final_exam * FINAL_WEIGHT;
    let rounded = round_up_score(total);
    let tier = tier_for_score(rounded);
    GradeResult {
        total_score: Some(total),
        rounded_score: Some(rounded),
        letter_grade: Some(tier.letter),
        coefficient: Some(tier.coefficient),
    }
}

/// Smallest integer final in [0, 100] whose rounded total lands inside
/// `target`, or `None` when no such final exists.
///
/// The rounded total is non-decreasing in the final score, so the scan can
/// start at the analytic lower bound and stop as soon as it overshoots.
pub fn minimum_final_for_grade(midterm: f64, quiz: f64, target: &GradeTier) -> Option<i64> {
    let average = component_average(midterm, quiz);
    let in_target = |final_exam: i64| {
        let rounded = round_up_score(average + (final_exam as f64) * FINAL_WEIGHT);
        (rounded, rounded >= target.min && rounded <= target.max)
    };

    // ceil(average + f/2) >= min  <=>  average + f/2 > min - 1
    let bound = ((target.min - 1) as f64 - average) / FINAL_WEIGHT;
    if bound < 0.0 && in_target(0).1 {
        return Some(0);
    }

    let start = bound.ceil().max(0.0);
    if start > 100.0 {
        return None;
    }
    for final_exam in (start as i64)..=100 {
        let (rounded, hit) = in_target(final_exam);
        if hit {
            return Some(final_exam);
        }
        if rounded > target.max {
            break;
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalTarget {
    pub letter: &'static str,
    pub coefficient: f64,
    pub min: i64,
    pub max: i64,
    pub final_needed: Option<i64>,
}

/// `minimum_final_for_grade` for every tier, in scale order.
pub fn minimum_finals(midterm: f64, quiz: f64) -> Vec<FinalTarget> {
    GRADE_SCALE
        .iter()
        .map(|t| FinalTarget {
            letter: t.letter,
            coefficient: t.coefficient,
            min: t.min,
            max: t.max,
            final_needed: minimum_final_for_grade(midterm, quiz, t),
        })
        .collect()
}
