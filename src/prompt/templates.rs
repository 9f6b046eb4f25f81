use super::PromptSections;
use crate::model::{FeedbackStyle, Language};

const FORMAT_RULE_EN: &str = "FORMAT: Return the feedback as HTML using only these tags: <p>, <strong>, <em>, <ul>, <ol>, <li>, <blockquote>. Use <strong> for emphasis, <ul>/<li> for bullet points, <ol>/<li> for numbered lists. Structure your response with clear paragraphs using <p> tags.";

const FORMAT_RULE_KO: &str = "형식: 다음 HTML 태그만 사용하여 피드백을 반환하세요: <p>, <strong>, <em>, <ul>, <ol>, <li>, <blockquote>. 강조는 <strong>, 불릿 포인트는 <ul>/<li>, 번호 목록은 <ol>/<li>를 사용하세요. <p> 태그로 명확한 단락 구조를 만드세요.";

pub(super) const SYSTEM_EN: &str = "You are an experienced academic advisor who provides thoughtful, data-driven feedback to help students improve their academic performance. Always format your response as clean HTML using only these tags: <p>, <strong>, <em>, <ul>, <ol>, <li>, <blockquote>. Use proper paragraph structure with <p> tags, <strong> for emphasis, and lists where appropriate.";

pub(super) const SYSTEM_KO: &str = "당신은 학생들의 학업 성과 향상을 돕기 위해 사려 깊고 데이터 기반의 피드백을 제공하는 경험 많은 학업 상담사입니다. 항상 다음 HTML 태그만 사용하여 깔끔한 HTML 형식으로 응답하세요: <p>, <strong>, <em>, <ul>, <ol>, <li>, <blockquote>. <p> 태그로 적절한 단락 구조를 만들고, 강조는 <strong>, 필요시 목록을 사용하세요.";

pub(super) fn render(style: FeedbackStyle, language: Language, s: &PromptSections) -> String {
    match (style, language) {
        (FeedbackStyle::Comprehensive, Language::English) => comprehensive_en(s),
        (FeedbackStyle::Comprehensive, Language::Korean) => comprehensive_ko(s),
        (FeedbackStyle::Focused, Language::English) => focused_en(s),
        (FeedbackStyle::Focused, Language::Korean) => focused_ko(s),
        (FeedbackStyle::Encouraging, Language::English) => encouraging_en(s),
        (FeedbackStyle::Encouraging, Language::Korean) => encouraging_ko(s),
    }
}

fn comprehensive_en(s: &PromptSections) -> String {
    format!(
        "Analyze student performance and provide comprehensive feedback.

Student: {student} | Period: {start} to {end}

Report Scope:
{subjects}
{classrooms}
{context}

COMPLETE PERFORMANCE STATISTICS (from ALL assignments):
{statistics}

Overall: {grade_average}% grade average, {completion_rate}% completion ({completed}/{total}), {attendance_rate}% attendance ({present}/{days} days)

By Category:
{categories}

{percentiles}

REPRESENTATIVE ASSIGNMENT SAMPLES:
{grades}

Provide detailed feedback covering:
1. Key strengths and achievements based on the complete statistics
2. Areas for improvement with specific context from the sample assignments
3. Trend analysis and progress trajectory
4. Specific recommendations based on performance patterns
5. Study strategies tailored to the subjects and classroom performance

IMPORTANT: The statistics above represent the student's COMPLETE assignment history for this period. Use these for accurate metrics. The sample assignments provide specific context for your feedback. A type or category with no assignments given was simply not assigned; do not treat it as a weakness.

Keep it professional, encouraging, and actionable (300-400 words).

{FORMAT_RULE_EN}",
        student = s.student_name,
        start = s.start_date,
        end = s.end_date,
        subjects = s.subjects,
        classrooms = s.classrooms,
        context = s.data_context,
        statistics = s.statistics,
        grade_average = s.grade_average,
        completion_rate = s.completion_rate,
        completed = s.completed_assignments,
        total = s.total_assignments,
        attendance_rate = s.attendance_rate,
        present = s.present_days,
        days = s.total_days,
        categories = s.category_breakdown,
        percentiles = s.classroom_percentiles,
        grades = s.individual_grades,
    )
}

fn comprehensive_ko(s: &PromptSections) -> String {
    format!(
        "학생 성과를 분석하고 종합적인 피드백을 제공하세요.

학생: {student} | 기간: {start} ~ {end}

보고서 범위:
{subjects}
{classrooms}
{context}

전체 성과 통계 (모든 과제 기반):
{statistics}

종합: 평균 성적 {grade_average}%, 완료율 {completion_rate}% ({completed}/{total}), 출석률 {attendance_rate}% ({present}/{days}일)

카테고리별:
{categories}

{percentiles}

대표 과제 샘플:
{grades}

다음을 포함한 상세한 피드백을 작성하세요:
1. 전체 통계에 기반한 주요 강점과 성취
2. 샘플 과제의 구체적인 맥락을 반영한 개선 영역
3. 추세 분석 및 진전 궤적
4. 성과 패턴에 기반한 구체적인 권장사항
5. 과목과 교실 성과에 맞춘 학습 전략

중요: 위 통계는 이 기간 동안 학생의 전체 과제 기록을 나타냅니다. 정확한 지표로 사용하세요. 샘플 과제는 피드백을 위한 구체적인 맥락을 제공합니다. 과제가 없는 유형이나 카테고리는 단순히 출제되지 않은 것이므로 약점으로 다루지 마세요.

전문적이고 격려하며 실행 가능한 내용으로 작성하세요 (300-400 단어).

{FORMAT_RULE_KO}",
        student = s.student_name,
        start = s.start_date,
        end = s.end_date,
        subjects = s.subjects,
        classrooms = s.classrooms,
        context = s.data_context,
        statistics = s.statistics,
        grade_average = s.grade_average,
        completion_rate = s.completion_rate,
        completed = s.completed_assignments,
        total = s.total_assignments,
        attendance_rate = s.attendance_rate,
        present = s.present_days,
        days = s.total_days,
        categories = s.category_breakdown,
        percentiles = s.classroom_percentiles,
        grades = s.individual_grades,
    )
}

fn focused_en(s: &PromptSections) -> String {
    format!(
        "Provide focused insights for {student}.

Period: {start} to {end}
Scope: {subjects} | {classrooms}
Context: {context}

COMPLETE STATISTICS:
{statistics}

KEY ASSIGNMENT SAMPLES:
{grades}

Give concise feedback (200-250 words):
1. Top 3 strengths based on complete statistics
2. Top 3 improvement areas with specific examples from samples
3. 5 actionable next steps based on performance trends

Be direct and practical.

{FORMAT_RULE_EN}",
        student = s.student_name,
        start = s.start_date,
        end = s.end_date,
        subjects = s.subjects,
        classrooms = s.classrooms,
        context = s.data_context,
        statistics = s.statistics,
        grades = s.individual_grades,
    )
}

fn focused_ko(s: &PromptSections) -> String {
    format!(
        "{student} 학생을 위한 핵심 분석을 제공하세요.

기간: {start} ~ {end}
범위: {subjects} | {classrooms}
상황: {context}

전체 통계:
{statistics}

주요 과제 샘플:
{grades}

간결한 피드백 (200-250 단어):
1. 전체 통계 기반 상위 3가지 강점
2. 샘플의 구체적인 예시와 함께 상위 3가지 개선 영역
3. 성과 추세에 기반한 5가지 실행 가능한 다음 단계

직접적이고 실용적으로 작성하세요.

{FORMAT_RULE_KO}",
        student = s.student_name,
        start = s.start_date,
        end = s.end_date,
        subjects = s.subjects,
        classrooms = s.classrooms,
        context = s.data_context,
        statistics = s.statistics,
        grades = s.individual_grades,
    )
}

fn encouraging_en(s: &PromptSections) -> String {
    format!(
        "Write encouraging feedback for {student}.

Period: {start} to {end}
Learning Context: {subjects} | {classrooms}
Data Context: {context}

COMPLETE PERFORMANCE JOURNEY:
{statistics}

YOUR ASSIGNMENT HIGHLIGHTS:
{grades}

Create motivational feedback (250-300 words):
1. Celebrate achievements and progress shown in the statistics
2. Highlight growth areas with positive framing based on trends
3. Provide supportive suggestions using specific examples from the samples
4. Emphasize potential based on patterns in the complete data

Use a warm, encouraging tone focused on building confidence.

{FORMAT_RULE_EN}",
        student = s.student_name,
        start = s.start_date,
        end = s.end_date,
        subjects = s.subjects,
        classrooms = s.classrooms,
        context = s.data_context,
        statistics = s.statistics,
        grades = s.individual_grades,
    )
}

fn encouraging_ko(s: &PromptSections) -> String {
    format!(
        "{student} 학생을 위한 격려 피드백을 작성하세요.

기간: {start} ~ {end}
학습 환경: {subjects} | {classrooms}
데이터 상황: {context}

전체 성과 여정:
{statistics}

과제 하이라이트:
{grades}

동기 부여 피드백 작성 (250-300 단어):
1. 통계에 나타난 성취와 진전을 축하
2. 추세에 기반해 긍정적인 관점에서 성장 영역 강조
3. 샘플의 구체적인 예시를 사용한 지지적인 제안 제공
4. 전체 데이터의 패턴에 기반해 잠재력 강조

자신감을 기르는 따뜻하고 격려하는 어조를 사용하세요.

{FORMAT_RULE_KO}",
        student = s.student_name,
        start = s.start_date,
        end = s.end_date,
        subjects = s.subjects,
        classrooms = s.classrooms,
        context = s.data_context,
        statistics = s.statistics,
        grades = s.individual_grades,
    )
}
