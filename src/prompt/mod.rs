pub mod format;
mod templates;

use crate::error::FeedbackError;
use crate::model::{FeedbackStyle, Language, PerformanceSnapshot};
use format::*;

/// Every value a template can reference, already formatted for the target
/// language.
#[derive(Debug, Clone)]
pub struct PromptSections {
    pub student_name: String,
    pub start_date: String,
    pub end_date: String,
    pub grade_average: f64,
    pub completion_rate: f64,
    pub completed_assignments: u32,
    pub total_assignments: u32,
    pub attendance_rate: f64,
    pub present_days: u32,
    pub total_days: u32,
    pub subjects: String,
    pub classrooms: String,
    pub data_context: String,
    /// Aggregated statistics when the host supplied them, else the type breakdown.
    pub statistics: String,
    pub type_breakdown: String,
    pub category_breakdown: String,
    pub classroom_percentiles: String,
    pub individual_grades: String,
}

impl PromptSections {
    pub fn build(snapshot: &PerformanceSnapshot, language: Language) -> Self {
        let m = &snapshot.metrics;
        let type_breakdown = format_type_breakdown(&m.by_type, language);
        let statistics = match &snapshot.ai_stats {
            Some(stats) => format_ai_statistics(stats, language),
            None => type_breakdown.clone(),
        };
        let individual_grades = match &snapshot.ai_priority_grades {
            Some(priority) => format_priority_grades(Some(priority), language),
            None => format_individual_grades(snapshot.individual_grades.as_deref(), language),
        };

        Self {
            student_name: snapshot.student.name.clone(),
            start_date: snapshot.period.start_date.to_string(),
            end_date: snapshot.period.end_date.to_string(),
            grade_average: m.overall.grade_average,
            completion_rate: m.overall.completion_rate,
            completed_assignments: m.overall.completed_assignments,
            total_assignments: m.overall.total_assignments,
            attendance_rate: m.attendance.rate,
            present_days: m.attendance.present,
            total_days: m.attendance.total,
            subjects: format_subjects(snapshot.subjects.as_deref(), language),
            classrooms: format_classrooms(snapshot.classrooms.as_deref(), language),
            data_context: format_data_context(snapshot.data_context.as_ref(), language),
            statistics,
            type_breakdown,
            category_breakdown: format_category_breakdown(m.by_category.as_ref(), language),
            classroom_percentiles: format_classroom_percentiles(
                m.classroom_percentiles.as_ref(),
                language,
            ),
            individual_grades,
        }
    }
}

/// Rejects snapshots that would render a misleading prompt.
pub fn validate(snapshot: &PerformanceSnapshot) -> Result<(), FeedbackError> {
    if snapshot.student.name.trim().is_empty() {
        return Err(FeedbackError::InvalidSnapshot("student name is empty".into()));
    }
    if snapshot.period.end_date < snapshot.period.start_date {
        return Err(FeedbackError::InvalidSnapshot(format!(
            "period ends ({}) before it starts ({})",
            snapshot.period.end_date, snapshot.period.start_date
        )));
    }

    let m = &snapshot.metrics;
    let mut figures = vec![
        ("overall.gradeAverage", m.overall.grade_average),
        ("overall.completionRate", m.overall.completion_rate),
        ("attendance.rate", m.attendance.rate),
    ];
    for (name, t) in [
        ("byType.quiz", &m.by_type.quiz),
        ("byType.homework", &m.by_type.homework),
        ("byType.test", &m.by_type.test),
        ("byType.project", &m.by_type.project),
    ] {
        figures.push((name, t.average_grade));
        figures.push((name, t.completion_rate));
    }
    if let Some((name, _)) = figures.iter().find(|(_, v)| !v.is_finite()) {
        return Err(FeedbackError::InvalidSnapshot(format!("{} is not a finite number", name)));
    }
    Ok(())
}

/// Renders the prompt for a snapshot in the given style and language.
pub fn render_prompt(
    style: FeedbackStyle,
    language: Language,
    snapshot: &PerformanceSnapshot,
) -> Result<String, FeedbackError> {
    validate(snapshot)?;
    let sections = PromptSections::build(snapshot, language);
    Ok(templates::render(style, language, &sections))
}

/// Instruction sent as the system message alongside every prompt.
pub fn system_instruction(language: Language) -> &'static str {
    match language {
        Language::English => templates::SYSTEM_EN,
        Language::Korean => templates::SYSTEM_KO,
    }
}
