use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Decimal amounts as sent by the service.
///
/// The backend serializes decimals as strings (`"5000.00"`) while computed
/// metrics come back as plain JSON numbers, so both forms are accepted.
pub mod amount {
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    fn parse<E: Error>(raw: Raw) -> Result<f64, E> {
        match raw {
            Raw::Number(value) => Ok(value),
            Raw::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|err| E::custom(format!("invalid amount {text:?}: {err}"))),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse(Raw::deserialize(deserializer)?)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<Raw>::deserialize(deserializer)?
                .map(parse::<D::Error>)
                .transpose()
        }
    }
}

pub mod auth {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LoginRequest {
        pub username: String,
        pub password: String,
    }

    /// Body returned by `/auth/login/`.
    ///
    /// The token is kept as a plain string here; the client wraps it into an
    /// opaque credential before storing it.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LoginResponse {
        pub token: String,
        #[serde(default)]
        pub user: Option<User>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RegisterRequest {
        pub username: String,
        pub password: String,
        pub email: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub first_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub last_name: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct User {
        pub id: u64,
        pub username: String,
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub first_name: String,
        #[serde(default)]
        pub last_name: String,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum TransactionType {
        Income,
        Expense,
    }

    impl TransactionType {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Income => "INCOME",
                Self::Expense => "EXPENSE",
            }
        }
    }

    /// Aggregation window understood by the transactions endpoint.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Period {
        Monthly,
    }

    impl Period {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Monthly => "monthly",
            }
        }
    }

    /// Query filters for `GET /transactions/`. Unset fields are not sent.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct TransactionFilter {
        pub period: Option<Period>,
        pub month: Option<u32>,
        pub year: Option<i32>,
        /// Free text matched against description and category name.
        pub search: Option<String>,
        /// One of `date`, `amount`, `created_at`, optionally prefixed by `-`.
        pub ordering: Option<String>,
    }

    impl TransactionFilter {
        pub fn monthly() -> Self {
            Self {
                period: Some(Period::Monthly),
                ..Self::default()
            }
        }

        pub fn to_query(&self) -> Vec<(String, String)> {
            let mut query = Vec::new();
            if let Some(period) = self.period {
                query.push(("period".to_string(), period.as_str().to_string()));
            }
            if let Some(month) = self.month {
                query.push(("month".to_string(), month.to_string()));
            }
            if let Some(year) = self.year {
                query.push(("year".to_string(), year.to_string()));
            }
            if let Some(search) = &self.search {
                query.push(("search".to_string(), search.clone()));
            }
            if let Some(ordering) = &self.ordering {
                query.push(("ordering".to_string(), ordering.clone()));
            }
            query
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Transaction {
        pub id: u64,
        pub category: Option<u64>,
        #[serde(default)]
        pub category_name: Option<String>,
        #[serde(with = "super::amount_serde")]
        pub amount: f64,
        pub transaction_type: TransactionType,
        #[serde(default)]
        pub description: String,
        pub date: NaiveDate,
        #[serde(default)]
        pub created_at: Option<DateTime<FixedOffset>>,
        #[serde(default)]
        pub updated_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub category: Option<u64>,
        /// Must be at least 0.01; the server rejects smaller amounts.
        pub amount: f64,
        pub transaction_type: TransactionType,
        pub description: String,
        pub date: NaiveDate,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Category {
        pub id: u64,
        pub name: String,
        #[serde(default)]
        pub description: String,
        #[serde(default)]
        pub created_at: Option<DateTime<FixedOffset>>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Budget {
        pub id: u64,
        pub category: u64,
        #[serde(default)]
        pub category_name: Option<String>,
        #[serde(with = "super::amount_serde")]
        pub amount: f64,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
        /// Only filled in by the detail endpoint.
        #[serde(default, deserialize_with = "super::amount::option::deserialize")]
        pub spent_amount: Option<f64>,
        #[serde(default, deserialize_with = "super::amount::option::deserialize")]
        pub remaining_amount: Option<f64>,
    }

    /// Partial update body for `PATCH /budgets/{id}/`.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct BudgetPatch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub amount: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub start_date: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub end_date: Option<NaiveDate>,
    }
}

pub mod savings_goal {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SavingsGoal {
        pub id: u64,
        pub name: String,
        #[serde(with = "super::amount_serde")]
        pub target_amount: f64,
        #[serde(with = "super::amount_serde")]
        pub current_amount: f64,
        pub target_date: NaiveDate,
        /// Rounded to two decimals by the server; absent on list responses.
        #[serde(default)]
        pub progress_percentage: Option<f64>,
    }

    /// Partial update body for `PATCH /savings-goals/{id}/`.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct SavingsGoalPatch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub target_amount: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub current_amount: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub target_date: Option<NaiveDate>,
    }
}

pub mod metrics {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CategoryAmount {
        pub category: String,
        #[serde(with = "super::amount_serde")]
        pub amount: f64,
    }

    /// Income and expenses for the current month.
    ///
    /// Both totals are required: a payload missing either one does not decode.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MonthlySummary {
        #[serde(with = "super::amount_serde")]
        pub total_income: f64,
        #[serde(with = "super::amount_serde")]
        pub total_expenses: f64,
        #[serde(default)]
        pub by_category: Vec<CategoryAmount>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PredictionPoint {
        pub date: NaiveDate,
        pub predicted_amount: f64,
    }

    /// Predicted expenses, in the order the service returned them.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PredictionSet {
        pub predictions: Vec<PredictionPoint>,
        /// Percentage in `[0, 100]`.
        pub model_accuracy: f64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MonthlyPatterns {
        #[serde(default)]
        pub highest_spending_month: Option<u32>,
        #[serde(default)]
        pub lowest_spending_month: Option<u32>,
        pub average_monthly_expenses: f64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct DailyPatterns {
        pub highest_spending_day: String,
        /// Weekday totals in the order the service lists them.
        #[serde(default, with = "super::day_amounts")]
        pub spending_by_day: Vec<(String, f64)>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CategoryTotal {
        pub category_id: u64,
        pub total_amount: f64,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct CategoryInsights {
        #[serde(default)]
        pub top_spending_categories: Vec<CategoryTotal>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct UnusualExpense {
        pub date: NaiveDate,
        pub amount: f64,
        pub category_id: u64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct UnusualExpenses {
        pub threshold: f64,
        pub count: u64,
        #[serde(default)]
        pub examples: Vec<UnusualExpense>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SpendingAnalysis {
        pub monthly_patterns: MonthlyPatterns,
        pub daily_patterns: DailyPatterns,
        #[serde(default)]
        pub category_insights: Option<CategoryInsights>,
        #[serde(default)]
        pub unusual_expenses: Option<UnusualExpenses>,
    }

    /// Payload the metrics endpoints answer with when there is nothing to
    /// compute yet (e.g. too few transactions for a prediction).
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MetricsUnavailable {
        pub error: String,
        #[serde(default)]
        pub required_data_points: Option<u64>,
        #[serde(default)]
        pub current_data_points: Option<u64>,
    }
}

/// `#[serde(with = ...)]` adapter: lenient on input, plain number on output.
mod amount_serde {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        super::amount::deserialize(deserializer)
    }
}

/// A JSON object read as `(key, amount)` pairs, keeping document order.
mod day_amounts {
    use std::fmt;

    use serde::{
        Deserializer, Serializer,
        de::{MapAccess, Visitor},
        ser::SerializeMap,
    };

    pub fn serialize<S: Serializer>(
        entries: &[(String, f64)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (day, amount) in entries {
            map.serialize_entry(day, amount)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, f64)>, D::Error> {
        deserializer.deserialize_map(OrderedVisitor)
    }

    struct OrderedVisitor;

    #[derive(serde::Deserialize)]
    struct Amount(#[serde(deserialize_with = "super::amount::deserialize")] f64);

    impl<'de> Visitor<'de> for OrderedVisitor {
        type Value = Vec<(String, f64)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object of amounts")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(7));
            while let Some((day, Amount(amount))) = access.next_entry::<String, Amount>()? {
                entries.push((day, amount));
            }
            Ok(entries)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::metrics::*;
    use super::transaction::*;

    #[test]
    fn monthly_summary_accepts_decimal_strings() {
        let summary: MonthlySummary =
            serde_json::from_str(r#"{"total_income": "5000.00", "total_expenses": 3000}"#)
                .unwrap();
        assert_eq!(summary.total_income, 5000.0);
        assert_eq!(summary.total_expenses, 3000.0);
        assert!(summary.by_category.is_empty());
    }

    #[test]
    fn monthly_summary_requires_both_totals() {
        let res = serde_json::from_str::<MonthlySummary>(r#"{"total_income": 5000}"#);
        assert!(res.is_err());
    }

    #[test]
    fn prediction_set_keeps_service_order() {
        let set: PredictionSet = serde_json::from_str(
            r#"{"predictions": [
                {"date": "2025-11-02", "predicted_amount": 150},
                {"date": "2025-11-01", "predicted_amount": 100}
            ], "model_accuracy": 85}"#,
        )
        .unwrap();
        assert_eq!(set.predictions[0].date.to_string(), "2025-11-02");
        assert_eq!(set.predictions[1].predicted_amount, 100.0);
    }

    #[test]
    fn spending_analysis_minimal_payload() {
        let analysis: SpendingAnalysis = serde_json::from_str(
            r#"{"daily_patterns": {"highest_spending_day": "Friday"},
                "monthly_patterns": {"average_monthly_expenses": 3000}}"#,
        )
        .unwrap();
        assert_eq!(analysis.daily_patterns.highest_spending_day, "Friday");
        assert_eq!(analysis.monthly_patterns.average_monthly_expenses, 3000.0);
        assert!(analysis.unusual_expenses.is_none());
    }

    #[test]
    fn spending_by_day_keeps_weekday_order() {
        let patterns: DailyPatterns = serde_json::from_str(
            r#"{"highest_spending_day": "Friday", "spending_by_day": {
                "Monday": 120.5, "Tuesday": 80, "Wednesday": "95.00", "Thursday": 60,
                "Friday": 3000, "Saturday": 410, "Sunday": 15
            }}"#,
        )
        .unwrap();
        let days: Vec<&str> = patterns
            .spending_by_day
            .iter()
            .map(|(day, _)| day.as_str())
            .collect();
        assert_eq!(
            days,
            [
                "Monday",
                "Tuesday",
                "Wednesday",
                "Thursday",
                "Friday",
                "Saturday",
                "Sunday"
            ]
        );
        assert_eq!(patterns.spending_by_day[2].1, 95.0);

        let back = serde_json::to_string(&patterns).unwrap();
        assert!(back.find("Monday").unwrap() < back.find("Sunday").unwrap());
    }

    #[test]
    fn filter_skips_unset_fields() {
        assert_eq!(
            TransactionFilter::monthly().to_query(),
            vec![("period".to_string(), "monthly".to_string())]
        );
        assert!(TransactionFilter::default().to_query().is_empty());
    }

    #[test]
    fn transaction_type_is_uppercase_on_the_wire() {
        let json = serde_json::to_string(&TransactionType::Expense).unwrap();
        assert_eq!(json, "\"EXPENSE\"");
    }
}
