//! Plain-text output for the command line.

use client::api_types::{
    budget::Budget, category::Category, savings_goal::SavingsGoal, transaction::Transaction,
    transaction::TransactionType,
};
use dashboard::{DashboardView, Section};

/// Formats an amount with two decimals, e.g. `$5000.00`.
#[must_use]
pub fn money(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${amount:.2}")
    }
}

/// Text progress bar like `████████░░ 80%`; `━━━━━━━━━━` when there is no target.
#[must_use]
pub fn progress_bar(current: f64, target: f64, width: usize) -> String {
    if target <= 0.0 {
        return "━".repeat(width);
    }
    let ratio = (current / target).clamp(0.0, 1.0);
    let filled = ((ratio * width as f64) as usize).min(width);
    let empty = width.saturating_sub(filled);
    format!(
        "{}{} {}%",
        "█".repeat(filled),
        "░".repeat(empty),
        (ratio * 100.0) as u16
    )
}

/// Predictions shown on the overview; the rest stay available in the snapshot.
const PREDICTION_PREVIEW: usize = 6;

#[must_use]
pub fn dashboard(view: &DashboardView) -> String {
    let snapshot = &view.snapshot;

    let mut text = format!("{}\n", Section::MonthlySummary);
    match &snapshot.monthly_summary {
        Some(summary) => {
            text.push_str(&format!("  Income:   {}\n", money(summary.total_income)));
            text.push_str(&format!("  Expenses: {}\n", money(summary.total_expenses)));
            for entry in &summary.by_category {
                text.push_str(&format!(
                    "    {:<16} {}\n",
                    entry.category,
                    money(entry.amount)
                ));
            }
        }
        None => text.push_str(&unavailable(view, Section::MonthlySummary)),
    }

    text.push_str(&format!("{}\n", Section::Predictions));
    match &snapshot.predictions {
        Some(set) => {
            for point in set.predictions.iter().take(PREDICTION_PREVIEW) {
                text.push_str(&format!("  {}  {:.0}\n", point.date, point.predicted_amount));
            }
            text.push_str(&format!("  Model Accuracy: {}%\n", set.model_accuracy));
        }
        None => text.push_str(&unavailable(view, Section::Predictions)),
    }

    text.push_str(&format!("{}\n", Section::SpendingAnalysis));
    match &snapshot.spending_analysis {
        Some(analysis) => {
            text.push_str(&format!(
                "  Highest spending day: {}\n",
                analysis.daily_patterns.highest_spending_day
            ));
            // Kept as the service sent it; no rounding applied.
            text.push_str(&format!(
                "  Average monthly expenses: ${}\n",
                analysis.monthly_patterns.average_monthly_expenses
            ));
        }
        None => text.push_str(&unavailable(view, Section::SpendingAnalysis)),
    }

    text
}

fn unavailable(view: &DashboardView, section: Section) -> String {
    let reason = view
        .partial_error
        .as_ref()
        .and_then(|partial| partial.error_for(section))
        .map(ToString::to_string)
        .or_else(|| view.last_error.as_ref().map(ToString::to_string))
        .unwrap_or_else(|| "not loaded".to_string());
    format!("  unavailable: {reason}\n")
}

#[must_use]
pub fn transactions(items: &[Transaction]) -> String {
    let mut text = String::new();
    for tx in items {
        let sign = match tx.transaction_type {
            TransactionType::Income => "+",
            TransactionType::Expense => "-",
        };
        text.push_str(&format!(
            "{:>5}  {}  {sign}{:<12} {:<14} {}\n",
            tx.id,
            tx.date,
            money(tx.amount),
            tx.category_name.as_deref().unwrap_or("-"),
            tx.description
        ));
    }
    text
}

#[must_use]
pub fn categories(items: &[Category]) -> String {
    let mut text = String::new();
    for category in items {
        text.push_str(&format!("{:>5}  {}\n", category.id, category.name));
    }
    text
}

#[must_use]
pub fn budgets(items: &[Budget]) -> String {
    let mut text = String::new();
    for budget in items {
        text.push_str(&format!(
            "{:>5}  {:<14} {}  {} → {}{}\n",
            budget.id,
            budget.category_name.as_deref().unwrap_or("-"),
            money(budget.amount),
            budget.start_date,
            budget.end_date,
            budget
                .spent_amount
                .map(|spent| format!("  {}", progress_bar(spent, budget.amount, 10)))
                .unwrap_or_default()
        ));
    }
    text
}

#[must_use]
pub fn goals(items: &[SavingsGoal]) -> String {
    let mut text = String::new();
    for goal in items {
        text.push_str(&format!(
            "{:>5}  {:<16} {} / {}  {}  by {}\n",
            goal.id,
            goal.name,
            money(goal.current_amount),
            money(goal.target_amount),
            progress_bar(goal.current_amount, goal.target_amount, 10),
            goal.target_date
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use client::{
        ClientError,
        api_types::metrics::{MonthlySummary, PredictionPoint, PredictionSet},
    };
    use dashboard::{DashboardSnapshot, DashboardState, combine};

    use super::*;

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(5000.0), "$5000.00");
        assert_eq!(money(12.5), "$12.50");
        assert_eq!(money(-3.0), "-$3.00");
    }

    #[test]
    fn progress_bar_clamps() {
        assert_eq!(progress_bar(50.0, 100.0, 4), "██░░ 50%");
        assert_eq!(progress_bar(500.0, 100.0, 2), "██ 100%");
        assert_eq!(progress_bar(1.0, 0.0, 3), "━━━");
    }

    #[test]
    fn dashboard_marks_missing_sections() {
        let (snapshot, partial) = combine(
            Ok(MonthlySummary {
                total_income: 5000.0,
                total_expenses: 3000.0,
                by_category: Vec::new(),
            }),
            Ok(PredictionSet {
                predictions: vec![PredictionPoint {
                    date: chrono::NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
                    predicted_amount: 100.0,
                }],
                model_accuracy: 85.0,
            }),
            Err(ClientError::NoData("No transaction data available".to_string())),
        );
        let view = DashboardView {
            state: DashboardState::Ready,
            snapshot: Arc::new(snapshot),
            partial_error: partial,
            last_error: None,
        };

        let text = dashboard(&view);
        assert!(text.contains("Income:   $5000.00"));
        assert!(text.contains("Expenses: $3000.00"));
        assert!(text.contains("Model Accuracy: 85%"));
        assert!(text.contains("unavailable: no data: No transaction data available"));
    }

    #[test]
    fn empty_dashboard_is_not_loaded() {
        let view = DashboardView {
            state: DashboardState::Loading,
            snapshot: Arc::new(DashboardSnapshot::default()),
            partial_error: None,
            last_error: None,
        };
        assert_eq!(dashboard(&view).matches("unavailable: not loaded").count(), 3);
    }

    #[test]
    fn budget_line_shows_progress_only_when_spent_is_known() {
        let budget = Budget {
            id: 4,
            category: 1,
            category_name: Some("Food".to_string()),
            amount: 400.0,
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2025, 10, 31).unwrap(),
            spent_amount: None,
            remaining_amount: None,
        };
        let plain = budgets(std::slice::from_ref(&budget));
        assert!(plain.ends_with("2025-10-31\n"));

        let tracked = Budget {
            spent_amount: Some(200.0),
            ..budget
        };
        assert!(budgets(&[tracked]).ends_with("█████░░░░░ 50%\n"));
    }
}
