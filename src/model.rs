use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Performance data for one student over one reporting period, as assembled
/// by the report builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub student: StudentInfo,
    pub period: ReportingPeriod,
    pub metrics: PerformanceMetrics,
    #[serde(default)]
    pub selected_filters: SelectedFilters,
    #[serde(default)]
    pub subjects: Option<Vec<SubjectRef>>,
    #[serde(default)]
    pub classrooms: Option<Vec<ClassroomRef>>,
    #[serde(default)]
    pub categories: Option<Vec<CategoryRef>>,
    #[serde(default)]
    pub data_context: Option<DataContext>,
    #[serde(default)]
    pub individual_grades: Option<Vec<IndividualGradeRecord>>,
    // Pre-aggregated by the host's reporting queries, preferred over the legacy fields above.
    #[serde(default)]
    pub ai_stats: Option<AiGradeStatistics>,
    #[serde(default)]
    pub ai_priority_grades: Option<PriorityGrades>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub name: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub overall: OverallMetrics,
    pub attendance: AttendanceMetrics,
    pub by_type: TypeBreakdown,
    #[serde(default)]
    pub by_category: Option<BTreeMap<String, CategoryMetrics>>,
    #[serde(default)]
    pub classroom_percentiles: Option<BTreeMap<String, ClassroomPercentile>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallMetrics {
    pub grade_average: f64,
    pub total_assignments: u32,
    pub completed_assignments: u32,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceMetrics {
    pub present: u32,
    pub total: u32,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub quiz: AssignmentTypeMetrics,
    pub homework: AssignmentTypeMetrics,
    pub test: AssignmentTypeMetrics,
    pub project: AssignmentTypeMetrics,
}

impl TypeBreakdown {
    pub fn get(&self, kind: AssignmentKind) -> &AssignmentTypeMetrics {
        match kind {
            AssignmentKind::Quiz => &self.quiz,
            AssignmentKind::Homework => &self.homework,
            AssignmentKind::Test => &self.test,
            AssignmentKind::Project => &self.project,
        }
    }
}

/// The four assignment types every snapshot reports on, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentKind {
    Quiz,
    Homework,
    Test,
    Project,
}

impl AssignmentKind {
    pub const ALL: [AssignmentKind; 4] = [
        AssignmentKind::Quiz,
        AssignmentKind::Homework,
        AssignmentKind::Test,
        AssignmentKind::Project,
    ];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentTypeMetrics {
    pub total: u32,
    pub completed: u32,
    pub completion_rate: f64,
    pub average_grade: f64,
    #[serde(default)]
    pub statuses: StatusCounts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub submitted: u32,
    pub pending: u32,
    pub overdue: u32,
    pub not_submitted: u32,
    pub excused: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMetrics {
    pub name: String,
    pub total: u32,
    pub completed: u32,
    pub completion_rate: f64,
    pub average_grade: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomPercentile {
    pub name: String,
    pub subject: String,
    pub percentile: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedFilters {
    #[serde(default)]
    pub classrooms: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomRef {
    pub id: String,
    pub name: String,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

/// Which data dimensions are actually populated in the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataContext {
    pub has_grade_data: bool,
    pub has_assignment_data: bool,
    pub has_attendance_data: bool,
    pub selected_subject_count: u32,
    pub selected_classroom_count: u32,
    pub selected_category_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualGradeRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    #[serde(default)]
    pub classroom: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub score: Option<f64>,
    pub status: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed_date: Option<NaiveDate>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl IndividualGradeRecord {
    pub fn has_feedback(&self) -> bool {
        self.feedback.as_deref().is_some_and(|f| !f.is_empty())
    }
}

// Aggregates computed over every assignment in the period. Field names follow
// the reporting query output, which is snake_case.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiGradeStatistics {
    pub overall: AiOverallStatistics,
    #[serde(default)]
    pub by_subject: Vec<SubjectStatistics>,
    #[serde(default)]
    pub by_type: Vec<TypeStatistics>,
    #[serde(default)]
    pub by_category: Vec<CategoryStatistics>,
    #[serde(default)]
    pub monthly_trend: Vec<MonthlyStatistics>,
    #[serde(default)]
    pub by_classroom: Vec<ClassroomStatistics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiOverallStatistics {
    pub total_assignments: u32,
    pub completed_assignments: u32,
    pub grade_average: Option<f64>,
    pub completion_rate: Option<f64>,
    pub failing_count: u32,
    pub excellent_count: u32,
    pub feedback_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectStatistics {
    pub subject: String,
    pub total: u32,
    pub completed: u32,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeStatistics {
    #[serde(rename = "type")]
    pub kind: String,
    pub total: u32,
    pub completed: u32,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStatistics {
    pub category: String,
    pub total: u32,
    pub completed: u32,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyStatistics {
    pub month: String,
    pub total: u32,
    pub completed: u32,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomStatistics {
    pub classroom_id: String,
    pub classroom_name: String,
    pub subject: String,
    pub total: u32,
    pub completed: u32,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityGrades {
    pub grades: Vec<PriorityGrade>,
    pub counts: PriorityCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityGrade {
    pub id: String,
    pub assignment_id: String,
    pub assignment_name: String,
    #[serde(default)]
    pub assignment_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub score: Option<f64>,
    #[serde(default)]
    pub total_score: Option<f64>,
    pub percentage: Option<f64>,
    pub status: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub submitted_date: Option<String>,
    #[serde(default)]
    pub classroom_name: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub priority_reason: PriorityReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityReason {
    Feedback,
    Failing,
    Recent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub with_feedback: u32,
    pub failing: u32,
    pub recent: u32,
    pub total: u32,
}

/// Tone and verbosity of the generated feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStyle {
    #[default]
    Comprehensive,
    Focused,
    Encouraging,
}

impl FeedbackStyle {
    /// Output token budget handed to the backend.
    pub fn max_tokens(self) -> u32 {
        match self {
            FeedbackStyle::Comprehensive => 800,
            FeedbackStyle::Focused => 500,
            FeedbackStyle::Encouraging => 600,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackStyle::Comprehensive => "comprehensive",
            FeedbackStyle::Focused => "focused",
            FeedbackStyle::Encouraging => "encouraging",
        }
    }
}

impl fmt::Display for FeedbackStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackStyle {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comprehensive" => Ok(FeedbackStyle::Comprehensive),
            "focused" => Ok(FeedbackStyle::Focused),
            "encouraging" => Ok(FeedbackStyle::Encouraging),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Korean,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Korean => "korean",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "english" => Ok(Language::English),
            "korean" => Ok(Language::Korean),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant `{0}`")]
pub struct UnknownVariant(pub String);

/// Result of a buffered generation, serialized as-is at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FeedbackOutcome {
    pub fn success(feedback: String) -> Self {
        Self {
            success: true,
            feedback: Some(feedback),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            feedback: None,
            error: Some(error.into()),
        }
    }
}
