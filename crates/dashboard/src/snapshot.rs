use std::fmt;

use client::{
    ClientError,
    api_types::metrics::{MonthlySummary, PredictionSet, SpendingAnalysis},
};

/// One of the three independently fetched parts of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    MonthlySummary,
    Predictions,
    SpendingAnalysis,
}

impl Section {
    pub const ALL: [Section; 3] = [
        Section::MonthlySummary,
        Section::Predictions,
        Section::SpendingAnalysis,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::MonthlySummary => "Monthly Overview",
            Self::Predictions => "Predicted Expenses",
            Self::SpendingAnalysis => "Spending Insights",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Combined result of one fetch batch. Any subset may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub monthly_summary: Option<MonthlySummary>,
    pub predictions: Option<PredictionSet>,
    pub spending_analysis: Option<SpendingAnalysis>,
}

impl DashboardSnapshot {
    pub fn has(&self, section: Section) -> bool {
        match section {
            Section::MonthlySummary => self.monthly_summary.is_some(),
            Section::Predictions => self.predictions.is_some(),
            Section::SpendingAnalysis => self.spending_analysis.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Section::ALL.iter().all(|section| !self.has(*section))
    }

    pub fn is_complete(&self) -> bool {
        Section::ALL.iter().all(|section| self.has(*section))
    }

    /// Sections the consumer should mark as unavailable.
    pub fn unavailable_sections(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|section| !self.has(*section))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionFailure {
    pub section: Section,
    pub error: ClientError,
}

/// Some of the batch failed. Carried next to a still usable snapshot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{} of 3 dashboard sections unavailable: {}", .failures.len(), describe(.failures))]
pub struct PartialAggregationError {
    failures: Vec<SectionFailure>,
}

fn describe(failures: &[SectionFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{} ({})", failure.section, failure.error))
        .collect::<Vec<_>>()
        .join(", ")
}

impl PartialAggregationError {
    pub fn failures(&self) -> &[SectionFailure] {
        &self.failures
    }

    pub fn sections(&self) -> Vec<Section> {
        self.failures.iter().map(|failure| failure.section).collect()
    }

    pub fn error_for(&self, section: Section) -> Option<&ClientError> {
        self.failures
            .iter()
            .find(|failure| failure.section == section)
            .map(|failure| &failure.error)
    }
}

/// Merges the three settled calls.
///
/// A failed call leaves its slice empty and is recorded; it never affects
/// the other two.
pub fn combine(
    monthly_summary: Result<MonthlySummary, ClientError>,
    predictions: Result<PredictionSet, ClientError>,
    spending_analysis: Result<SpendingAnalysis, ClientError>,
) -> (DashboardSnapshot, Option<PartialAggregationError>) {
    let mut failures = Vec::new();
    let snapshot = DashboardSnapshot {
        monthly_summary: keep(Section::MonthlySummary, monthly_summary, &mut failures),
        predictions: keep(Section::Predictions, predictions, &mut failures),
        spending_analysis: keep(Section::SpendingAnalysis, spending_analysis, &mut failures),
    };

    let partial = (!failures.is_empty()).then_some(PartialAggregationError { failures });
    (snapshot, partial)
}

fn keep<V>(
    section: Section,
    result: Result<V, ClientError>,
    failures: &mut Vec<SectionFailure>,
) -> Option<V> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            failures.push(SectionFailure { section, error });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use client::{
        TransportError,
        api_types::metrics::{DailyPatterns, MonthlyPatterns, PredictionPoint},
    };
    use reqwest::StatusCode;

    use super::*;

    fn summary() -> MonthlySummary {
        MonthlySummary {
            total_income: 5000.0,
            total_expenses: 3000.0,
            by_category: Vec::new(),
        }
    }

    fn predictions() -> PredictionSet {
        PredictionSet {
            predictions: vec![PredictionPoint {
                date: chrono::NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
                predicted_amount: 100.0,
            }],
            model_accuracy: 85.0,
        }
    }

    fn analysis() -> SpendingAnalysis {
        SpendingAnalysis {
            monthly_patterns: MonthlyPatterns {
                highest_spending_month: None,
                lowest_spending_month: None,
                average_monthly_expenses: 3000.0,
            },
            daily_patterns: DailyPatterns {
                highest_spending_day: "Friday".to_string(),
                spending_by_day: Default::default(),
            },
            category_insights: None,
            unusual_expenses: None,
        }
    }

    fn server_error() -> ClientError {
        ClientError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "boom".to_string(),
            body: None,
        }
    }

    #[test]
    fn all_ok_has_no_partial_error() {
        let (snapshot, partial) = combine(Ok(summary()), Ok(predictions()), Ok(analysis()));
        assert!(snapshot.is_complete());
        assert!(partial.is_none());
    }

    #[test]
    fn single_failure_nulls_only_its_section() {
        let (snapshot, partial) = combine(Ok(summary()), Err(server_error()), Ok(analysis()));

        assert_eq!(snapshot.monthly_summary, Some(summary()));
        assert_eq!(snapshot.predictions, None);
        assert_eq!(snapshot.spending_analysis, Some(analysis()));
        assert_eq!(snapshot.unavailable_sections(), vec![Section::Predictions]);

        let partial = partial.unwrap();
        assert_eq!(partial.sections(), vec![Section::Predictions]);
        assert_eq!(
            partial.error_for(Section::Predictions).and_then(ClientError::status),
            Some(StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[test]
    fn all_failures_give_an_empty_snapshot() {
        let unreachable = || ClientError::Transport(TransportError::Unreachable("down".to_string()));
        let (snapshot, partial) = combine(Err(unreachable()), Err(unreachable()), Err(unreachable()));

        assert!(snapshot.is_empty());
        assert_eq!(partial.unwrap().failures().len(), 3);
    }

    #[test]
    fn partial_error_message_lists_sections() {
        let (_, partial) = combine(Err(server_error()), Ok(predictions()), Ok(analysis()));
        let message = partial.unwrap().to_string();
        assert!(message.starts_with("1 of 3 dashboard sections unavailable"));
        assert!(message.contains("Monthly Overview"));
    }
}
