//! Pure formatters that turn parts of a snapshot into prompt sub-sections.
//!
//! A dimension with zero assignments is always phrased as "none given",
//! never as a 0% score, so the model does not read it as a deficiency.

use crate::model::{
    AiGradeStatistics, AssignmentKind, CategoryMetrics, ClassroomPercentile, ClassroomRef,
    DataContext, IndividualGradeRecord, Language, PriorityGrade, PriorityGrades, PriorityReason,
    SubjectRef, TypeBreakdown,
};
use std::collections::BTreeMap;

/// Maximum number of individual grade lines included in a prompt.
pub const MAX_INDIVIDUAL_GRADES: usize = 50;

/// Scores below this (or missing) mark an assignment as needing attention.
pub const FAILING_THRESHOLD: f64 = 70.0;

fn kind_label(kind: AssignmentKind, language: Language) -> &'static str {
    match (kind, language) {
        (AssignmentKind::Quiz, Language::English) => "Quizzes",
        (AssignmentKind::Homework, Language::English) => "Homework",
        (AssignmentKind::Test, Language::English) => "Tests",
        (AssignmentKind::Project, Language::English) => "Projects",
        (AssignmentKind::Quiz, Language::Korean) => "퀴즈",
        (AssignmentKind::Homework, Language::Korean) => "숙제",
        (AssignmentKind::Test, Language::Korean) => "시험",
        (AssignmentKind::Project, Language::Korean) => "프로젝트",
    }
}

fn kind_label_from_str(kind: &str, language: Language) -> String {
    let known = match kind {
        "quiz" => Some(AssignmentKind::Quiz),
        "homework" => Some(AssignmentKind::Homework),
        "test" => Some(AssignmentKind::Test),
        "project" => Some(AssignmentKind::Project),
        _ => None,
    };
    known.map_or_else(|| kind.to_string(), |k| kind_label(k, language).to_string())
}

fn breakdown_line(
    label: &str,
    total: u32,
    completed: u32,
    completion_rate: f64,
    average_grade: f64,
    language: Language,
) -> String {
    if total == 0 {
        return match language {
            Language::English => format!("- {}: No assignments given during this period", label),
            Language::Korean => format!("- {}: 이 기간 동안 과제 없음", label),
        };
    }
    match language {
        Language::English => format!(
            "- {}: {}% average, {}% completion ({}/{})",
            label, average_grade, completion_rate, completed, total
        ),
        Language::Korean => format!(
            "- {}: 평균 {}%, 완료율 {}% ({}/{})",
            label, average_grade, completion_rate, completed, total
        ),
    }
}

pub fn format_type_breakdown(by_type: &TypeBreakdown, language: Language) -> String {
    AssignmentKind::ALL
        .iter()
        .map(|&kind| {
            let m = by_type.get(kind);
            breakdown_line(
                kind_label(kind, language),
                m.total,
                m.completed,
                m.completion_rate,
                m.average_grade,
                language,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_category_breakdown(
    by_category: Option<&BTreeMap<String, CategoryMetrics>>,
    language: Language,
) -> String {
    let Some(categories) = by_category.filter(|m| !m.is_empty()) else {
        return match language {
            Language::English => "No category-specific data available".to_string(),
            Language::Korean => "카테고리별 데이터 없음".to_string(),
        };
    };
    categories
        .values()
        .map(|c| {
            breakdown_line(
                &c.name,
                c.total,
                c.completed,
                c.completion_rate,
                c.average_grade,
                language,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_classroom_percentiles(
    percentiles: Option<&BTreeMap<String, ClassroomPercentile>>,
    language: Language,
) -> String {
    let Some(percentiles) = percentiles.filter(|m| !m.is_empty()) else {
        return match language {
            Language::English => "No classroom ranking data available".to_string(),
            Language::Korean => "클래스 순위 데이터 없음".to_string(),
        };
    };
    percentiles
        .values()
        .map(|p| match language {
            Language::English => format!(
                "- {} ({}): {}th percentile (class avg: {}%)",
                p.name, p.subject, p.percentile, p.average
            ),
            Language::Korean => format!(
                "- {} ({}): 상위 {}% (학급 평균: {}%)",
                p.name, p.subject, p.percentile, p.average
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_subjects(subjects: Option<&[SubjectRef]>, language: Language) -> String {
    match subjects.filter(|s| !s.is_empty()) {
        None => match language {
            Language::English => "All subjects".to_string(),
            Language::Korean => "모든 과목".to_string(),
        },
        Some(subjects) => {
            let names = subjects
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            match language {
                Language::English => format!("Subjects: {}", names),
                Language::Korean => format!("과목: {}", names),
            }
        }
    }
}

pub fn format_classrooms(classrooms: Option<&[ClassroomRef]>, language: Language) -> String {
    match classrooms.filter(|c| !c.is_empty()) {
        None => match language {
            Language::English => "All classrooms".to_string(),
            Language::Korean => "모든 교실".to_string(),
        },
        Some(classrooms) => {
            let info = classrooms
                .iter()
                .map(|c| format!("{} ({})", c.name, c.subject))
                .collect::<Vec<_>>()
                .join(", ");
            match language {
                Language::English => format!("Classrooms: {}", info),
                Language::Korean => format!("교실: {}", info),
            }
        }
    }
}

pub fn translate_status(status: &str, language: Language) -> &str {
    if language == Language::English {
        return status;
    }
    match status {
        "submitted" => "제출됨",
        "graded" => "채점됨",
        "pending" => "대기중",
        "overdue" => "지연",
        "not_submitted" => "미제출",
        "excused" => "면제",
        other => other,
    }
}

fn teacher_feedback_line(feedback: &str, language: Language) -> String {
    match language {
        Language::English => format!("\n  Teacher feedback: \"{}\"", feedback),
        Language::Korean => format!("\n  교사 피드백: \"{}\"", feedback),
    }
}

/// Picks at most [`MAX_INDIVIDUAL_GRADES`] records: everything with teacher
/// feedback, then failing or unscored work, then the rest. Order within each
/// group is preserved.
pub fn select_individual_grades(grades: &[IndividualGradeRecord]) -> Vec<&IndividualGradeRecord> {
    let is_failing = |g: &IndividualGradeRecord| g.score.map_or(true, |s| s < FAILING_THRESHOLD);

    let mut selected: Vec<&IndividualGradeRecord> =
        grades.iter().filter(|g| g.has_feedback()).collect();

    let failing = grades.iter().filter(|g| !g.has_feedback() && is_failing(g));
    let room = MAX_INDIVIDUAL_GRADES.saturating_sub(selected.len());
    selected.extend(failing.take(room));

    let passing = grades.iter().filter(|g| !g.has_feedback() && !is_failing(g));
    let room = MAX_INDIVIDUAL_GRADES.saturating_sub(selected.len());
    selected.extend(passing.take(room));

    selected
}

pub fn format_individual_grades(
    grades: Option<&[IndividualGradeRecord]>,
    language: Language,
) -> String {
    let Some(grades) = grades.filter(|g| !g.is_empty()) else {
        return match language {
            Language::English => "No individual grade data available".to_string(),
            Language::Korean => "개별 성적 데이터 없음".to_string(),
        };
    };

    let selected = select_individual_grades(grades);
    let mut out = selected
        .iter()
        .map(|g| {
            let score = match (g.score, language) {
                (Some(score), _) => format!("{}%", score),
                (None, Language::English) => "Not submitted".to_string(),
                (None, Language::Korean) => "미제출".to_string(),
            };
            let mut line = format!(
                "• {} ({}, {}): {} - {}",
                g.title,
                g.kind,
                g.subject,
                score,
                translate_status(&g.status, language)
            );
            if let Some(feedback) = g.feedback.as_deref().filter(|f| !f.is_empty()) {
                line.push_str(&teacher_feedback_line(feedback, language));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    let omitted = grades.len() - selected.len();
    if omitted > 0 {
        match language {
            Language::English => out.push_str(&format!("\n... and {} more assignments", omitted)),
            Language::Korean => out.push_str(&format!("\n... 그리고 {}개 더 많은 과제", omitted)),
        }
    }
    out
}

fn format_priority_grade(grade: &PriorityGrade, language: Language) -> String {
    let score = match (grade.percentage, language) {
        (Some(p), _) => format!("{}%", p),
        (None, Language::English) => "Not graded".to_string(),
        (None, Language::Korean) => "미채점".to_string(),
    };
    let mut line = format!(
        "• {} ({}, {}): {} - {}",
        grade.assignment_name,
        grade.assignment_type.as_deref().unwrap_or("N/A"),
        grade.subject.as_deref().unwrap_or("N/A"),
        score,
        translate_status(&grade.status, language)
    );
    if let Some(feedback) = grade.feedback.as_deref().filter(|f| !f.is_empty()) {
        line.push_str(&teacher_feedback_line(feedback, language));
    }
    line
}

/// Formats the host-selected grade sample, grouped by why each grade was picked.
pub fn format_priority_grades(priority: Option<&PriorityGrades>, language: Language) -> String {
    let Some(priority) = priority.filter(|p| !p.grades.is_empty()) else {
        return match language {
            Language::English => "No individual grade data available".to_string(),
            Language::Korean => "개별 성적 데이터 없음".to_string(),
        };
    };

    let group = |reason: PriorityReason| -> Vec<&PriorityGrade> {
        priority
            .grades
            .iter()
            .filter(|g| g.priority_reason == reason)
            .collect()
    };
    let feedback = group(PriorityReason::Feedback);
    let failing = group(PriorityReason::Failing);
    let recent = group(PriorityReason::Recent);

    let mut sections = Vec::new();
    let mut push = |header: String, grades: &[&PriorityGrade]| {
        if grades.is_empty() {
            return;
        }
        let lines = grades
            .iter()
            .map(|g| format_priority_grade(g, language))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("{}\n{}", header, lines));
    };

    match language {
        Language::English => {
            push(
                format!("\n📝 Assignments with Teacher Feedback ({}):", feedback.len()),
                &feedback,
            );
            push("\n⚠️ Areas Needing Attention (Below 60%):".to_string(), &failing);
            push("\n📅 Recent Performance:".to_string(), &recent);
        }
        Language::Korean => {
            push(
                format!("\n📝 교사 피드백이 있는 과제 ({}개):", feedback.len()),
                &feedback,
            );
            push("\n⚠️ 주의가 필요한 영역 (60% 미만):".to_string(), &failing);
            push("\n📅 최근 성과:".to_string(), &recent);
        }
    }

    let summary = match language {
        Language::English => format!(
            "\n[Sample: {} representative assignments from student's complete history]",
            priority.counts.total
        ),
        Language::Korean => format!(
            "\n[샘플: 학생의 전체 기록에서 대표적인 {}개 과제]",
            priority.counts.total
        ),
    };
    sections.join("\n") + &summary
}

fn or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

/// Formats statistics aggregated over every assignment in the period.
pub fn format_ai_statistics(stats: &AiGradeStatistics, language: Language) -> String {
    let o = &stats.overall;
    let mut sections = vec![match language {
        Language::English => format!(
            "📊 Overall Performance (All {total} assignments):\n\
             • Grade Average: {avg}%\n\
             • Completion Rate: {rate}% ({done}/{total})\n\
             • Excellent (90%+): {excellent} | Needs Improvement (<60%): {failing}\n\
             • Assignments with Feedback: {feedback}",
            total = o.total_assignments,
            avg = or_na(o.grade_average),
            rate = or_na(o.completion_rate),
            done = o.completed_assignments,
            excellent = o.excellent_count,
            failing = o.failing_count,
            feedback = o.feedback_count,
        ),
        Language::Korean => format!(
            "📊 전체 성과 (총 {total}개 과제):\n\
             • 평균 성적: {avg}%\n\
             • 완료율: {rate}% ({done}/{total})\n\
             • 우수 (90%+): {excellent}개 | 개선 필요 (<60%): {failing}개\n\
             • 피드백 있는 과제: {feedback}개",
            total = o.total_assignments,
            avg = or_na(o.grade_average),
            rate = or_na(o.completion_rate),
            done = o.completed_assignments,
            excellent = o.excellent_count,
            failing = o.failing_count,
            feedback = o.feedback_count,
        ),
    }];

    let english = language == Language::English;
    let row = |label: &str, average: Option<f64>, completed: u32, total: u32| {
        if english {
            format!("• {}: {}% avg, {}/{} completed", label, or_na(average), completed, total)
        } else {
            format!("• {}: 평균 {}%, {}/{} 완료", label, or_na(average), completed, total)
        }
    };
    let mut section = |header_en: &str, header_ko: &str, lines: Vec<String>| {
        if !lines.is_empty() {
            let header = if english { header_en } else { header_ko };
            sections.push(format!("\n{}\n{}", header, lines.join("\n")));
        }
    };

    section(
        "📚 By Subject:",
        "📚 과목별:",
        stats
            .by_subject
            .iter()
            .map(|s| row(&s.subject, s.average, s.completed, s.total))
            .collect(),
    );
    section(
        "📋 By Type:",
        "📋 유형별:",
        stats
            .by_type
            .iter()
            .map(|t| row(&kind_label_from_str(&t.kind, language), t.average, t.completed, t.total))
            .collect(),
    );
    section(
        "📈 Recent Trend:",
        "📈 최근 추세:",
        stats
            .monthly_trend
            .iter()
            .take(3)
            .map(|m| {
                if english {
                    format!(
                        "• {}: {}% avg ({}/{} completed)",
                        m.month,
                        or_na(m.average),
                        m.completed,
                        m.total
                    )
                } else {
                    format!(
                        "• {}: 평균 {}% ({}/{} 완료)",
                        m.month,
                        or_na(m.average),
                        m.completed,
                        m.total
                    )
                }
            })
            .collect(),
    );
    section(
        "🏫 By Classroom:",
        "🏫 교실별:",
        stats
            .by_classroom
            .iter()
            .map(|c| {
                row(
                    &format!("{} ({})", c.classroom_name, c.subject),
                    c.average,
                    c.completed,
                    c.total,
                )
            })
            .collect(),
    );

    sections.join("\n")
}

pub fn format_data_context(context: Option<&DataContext>, language: Language) -> String {
    let Some(ctx) = context else {
        return String::new();
    };
    let mut clauses = Vec::new();
    match language {
        Language::English => {
            if !ctx.has_grade_data {
                clauses.push("No grade data available".to_string());
            }
            if !ctx.has_assignment_data {
                clauses.push("No assignment data available".to_string());
            }
            if !ctx.has_attendance_data {
                clauses.push("No attendance data available".to_string());
            }
            if ctx.selected_subject_count > 0 {
                clauses.push(format!("{} subject(s) selected", ctx.selected_subject_count));
            }
            if ctx.selected_classroom_count > 0 {
                clauses.push(format!("{} classroom(s) selected", ctx.selected_classroom_count));
            }
            if ctx.selected_category_count > 0 {
                clauses.push(format!("{} category(ies) selected", ctx.selected_category_count));
            }
        }
        Language::Korean => {
            if !ctx.has_grade_data {
                clauses.push("성적 데이터 없음".to_string());
            }
            if !ctx.has_assignment_data {
                clauses.push("과제 데이터 없음".to_string());
            }
            if !ctx.has_attendance_data {
                clauses.push("출석 데이터 없음".to_string());
            }
            if ctx.selected_subject_count > 0 {
                clauses.push(format!("{}개 과목 선택", ctx.selected_subject_count));
            }
            if ctx.selected_classroom_count > 0 {
                clauses.push(format!("{}개 교실 선택", ctx.selected_classroom_count));
            }
            if ctx.selected_category_count > 0 {
                clauses.push(format!("{}개 카테고리 선택", ctx.selected_category_count));
            }
        }
    }
    clauses.join("; ")
}
