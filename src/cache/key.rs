use crate::error::FeedbackError;
use crate::model::{
    AttendanceMetrics, FeedbackStyle, Language, OverallMetrics, PerformanceSnapshot,
    ReportingPeriod, SelectedFilters, StudentInfo, TypeBreakdown,
};
use serde::Serialize;
use std::fmt;

/// Fingerprint of the parts of a snapshot that shape the rendered prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(blake3::Hash);

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.to_hex().as_str())
    }
}

// Field order here is the canonical order of the hashed JSON; do not reorder.
#[derive(Serialize)]
struct KeyProjection<'a> {
    student: &'a StudentInfo,
    period: &'a ReportingPeriod,
    metrics: MetricsProjection<'a>,
    filters: &'a SelectedFilters,
    template: FeedbackStyle,
    language: Language,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsProjection<'a> {
    overall: &'a OverallMetrics,
    attendance: &'a AttendanceMetrics,
    by_type: &'a TypeBreakdown,
    // Only which categories/classrooms are present, not their figures.
    by_category: Option<Vec<&'a str>>,
    classroom_percentiles: Option<Vec<&'a str>>,
}

/// Derives the cache key for a (snapshot, style, language) triple.
///
/// The snapshot is reduced to student, period, the metrics block, the key
/// sets of the category and percentile maps, and the caller's filters, then
/// serialized to JSON and hashed with BLAKE3. Map keys come out of `BTreeMap`s
/// already sorted, so the result does not depend on input key order.
pub fn derive_key(
    snapshot: &PerformanceSnapshot,
    style: FeedbackStyle,
    language: Language,
) -> Result<CacheKey, FeedbackError> {
    let metrics = &snapshot.metrics;
    let projection = KeyProjection {
        student: &snapshot.student,
        period: &snapshot.period,
        metrics: MetricsProjection {
            overall: &metrics.overall,
            attendance: &metrics.attendance,
            by_type: &metrics.by_type,
            by_category: metrics
                .by_category
                .as_ref()
                .map(|m| m.keys().map(String::as_str).collect()),
            classroom_percentiles: metrics
                .classroom_percentiles
                .as_ref()
                .map(|m| m.keys().map(String::as_str).collect()),
        },
        filters: &snapshot.selected_filters,
        template: style,
        language,
    };

    let mut hasher = blake3::Hasher::new();
    serde_json::to_writer(&mut hasher, &projection)
        .map_err(|e| FeedbackError::InvalidSnapshot(e.to_string()))?;
    Ok(CacheKey(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_snapshot;
    use crate::model::{CategoryMetrics, IndividualGradeRecord, SubjectRef};
    use std::collections::BTreeMap;

    fn category(name: &str, average: f64) -> CategoryMetrics {
        CategoryMetrics {
            name: name.to_string(),
            total: 4,
            completed: 3,
            completion_rate: 75.0,
            average_grade: average,
        }
    }

    #[test]
    fn same_input_same_key() {
        let s = sample_snapshot();
        let a = derive_key(&s, FeedbackStyle::Focused, Language::English).unwrap();
        let b = derive_key(&s.clone(), FeedbackStyle::Focused, Language::English).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string().len(), 64);
    }

    #[test]
    fn style_and_language_change_key() {
        let s = sample_snapshot();
        let base = derive_key(&s, FeedbackStyle::Focused, Language::English).unwrap();
        assert_ne!(
            base,
            derive_key(&s, FeedbackStyle::Comprehensive, Language::English).unwrap()
        );
        assert_ne!(
            base,
            derive_key(&s, FeedbackStyle::Focused, Language::Korean).unwrap()
        );
    }

    #[test]
    fn projected_fields_change_key() {
        let s = sample_snapshot();
        let base = derive_key(&s, FeedbackStyle::Focused, Language::English).unwrap();

        let mut renamed = s.clone();
        renamed.student.name = "Bob".into();
        assert_ne!(base, derive_key(&renamed, FeedbackStyle::Focused, Language::English).unwrap());

        let mut quiz = s.clone();
        quiz.metrics.by_type.quiz.average_grade += 1.0;
        assert_ne!(base, derive_key(&quiz, FeedbackStyle::Focused, Language::English).unwrap());

        let mut filtered = s.clone();
        filtered.selected_filters.classrooms.push("c-9".into());
        assert_ne!(base, derive_key(&filtered, FeedbackStyle::Focused, Language::English).unwrap());
    }

    #[test]
    fn unprojected_fields_do_not_change_key() {
        let s = sample_snapshot();
        let base = derive_key(&s, FeedbackStyle::Focused, Language::English).unwrap();

        let mut extra = s.clone();
        extra.subjects = Some(vec![SubjectRef {
            id: "s1".into(),
            name: "Math".into(),
        }]);
        extra.individual_grades = Some(vec![IndividualGradeRecord {
            id: "g1".into(),
            title: "Quiz 1".into(),
            kind: "quiz".into(),
            subject: "Math".into(),
            classroom: "A".into(),
            category_id: None,
            score: Some(50.0),
            status: "graded".into(),
            due_date: None,
            completed_date: None,
            feedback: Some("Needs work".into()),
        }]);
        assert_eq!(base, derive_key(&extra, FeedbackStyle::Focused, Language::English).unwrap());
    }

    #[test]
    fn category_key_set_is_order_independent_and_ignores_values() {
        let mut s1 = sample_snapshot();
        let mut forward = BTreeMap::new();
        forward.insert("alg".to_string(), category("Algebra", 80.0));
        forward.insert("geo".to_string(), category("Geometry", 70.0));
        s1.metrics.by_category = Some(forward);

        let mut s2 = sample_snapshot();
        let mut reverse = BTreeMap::new();
        reverse.insert("geo".to_string(), category("Geometry", 10.0));
        reverse.insert("alg".to_string(), category("Algebra", 20.0));
        s2.metrics.by_category = Some(reverse);

        let k1 = derive_key(&s1, FeedbackStyle::Encouraging, Language::Korean).unwrap();
        let k2 = derive_key(&s2, FeedbackStyle::Encouraging, Language::Korean).unwrap();
        assert_eq!(k1, k2);

        let mut s3 = s1.clone();
        if let Some(map) = s3.metrics.by_category.as_mut() {
            map.remove("geo");
        }
        let k3 = derive_key(&s3, FeedbackStyle::Encouraging, Language::Korean).unwrap();
        assert_ne!(k1, k3);
    }

    #[test]
    fn absent_and_empty_category_maps_differ() {
        let s1 = sample_snapshot();
        let mut s2 = sample_snapshot();
        s2.metrics.by_category = Some(BTreeMap::new());
        assert_ne!(
            derive_key(&s1, FeedbackStyle::Focused, Language::English).unwrap(),
            derive_key(&s2, FeedbackStyle::Focused, Language::English).unwrap()
        );
    }
}
