use api_types::{
    auth::{LoginRequest, LoginResponse, RegisterRequest, User},
    budget::{Budget, BudgetPatch},
    category::Category,
    metrics::{MetricsUnavailable, MonthlySummary, PredictionSet, SpendingAnalysis},
    savings_goal::{SavingsGoal, SavingsGoalPatch},
    transaction::{Transaction, TransactionFilter, TransactionNew},
};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    credential::{Credential, CredentialStore},
    error::{ClientError, SessionError},
    transport::{OutboundRequest, RequestDescriptor, Transport, TransportError},
};

/// HTTP client that signs every request with the stored session token.
///
/// Holds no state of its own besides the transport and a handle to the
/// credential store, so it can be shared by reference between concurrent
/// callers.
#[derive(Debug, Clone)]
pub struct Client<T, S> {
    transport: T,
    store: S,
}

impl<T: Transport, S: CredentialStore> Client<T, S> {
    pub fn new(transport: T, store: S) -> Self {
        Self { transport, store }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fails when no batch of requests could be dispatched at all.
    pub fn ensure_dispatchable(&self) -> Result<(), ClientError> {
        self.transport.ensure_ready().map_err(ClientError::from)
    }

    /// Performs one request and returns the raw success body.
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<Vec<u8>, ClientError> {
        let headers = self.headers().await?;
        let method = descriptor.method().clone();
        let path = descriptor.path().to_string();
        tracing::debug!(
            authenticated = headers.contains_key(header::AUTHORIZATION),
            "{method} {path}"
        );

        let resp = self
            .transport
            .send(OutboundRequest::new(descriptor, headers))
            .await
            .map_err(|err| {
                tracing::debug!("request failed: {method} {path}: {err}");
                ClientError::from(err)
            })?;

        if resp.status.is_success() {
            return Ok(resp.body);
        }

        let err = ClientError::from_response(resp.status, &resp.body);
        tracing::debug!("{method} {path} rejected: {err}");
        Err(err)
    }

    async fn headers(&self) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();

        // A broken store must not block the request; the server decides
        // whether an anonymous call is acceptable.
        let credential = match self.store.get().await {
            Ok(credential) => credential,
            Err(err) => {
                tracing::warn!("credential lookup failed, sending unauthenticated: {err}");
                None
            }
        };

        if let Some(credential) = credential {
            let mut auth = HeaderValue::try_from(format!("Bearer {}", credential.expose()))
                .map_err(|err| {
                    TransportError::InvalidRequest(format!("invalid auth header value: {err}"))
                })?;
            auth.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth);
        }

        Ok(headers)
    }

    async fn fetch<R: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<R, ClientError> {
        let body = self.execute(descriptor).await?;
        serde_json::from_slice(&body).map_err(|err| ClientError::Decode(err.to_string()))
    }

    /// Like [`Self::fetch`] but recognizes the `{"error": ...}` payload the
    /// metrics endpoints send when there is nothing to report.
    async fn fetch_metric<R: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<R, ClientError> {
        let body = self.execute(descriptor).await?;
        let value: Value =
            serde_json::from_slice(&body).map_err(|err| ClientError::Decode(err.to_string()))?;

        match serde_json::from_value::<R>(value.clone()) {
            Ok(decoded) => Ok(decoded),
            Err(err) => match serde_json::from_value::<MetricsUnavailable>(value) {
                Ok(unavailable) => Err(ClientError::NoData(unavailable.error)),
                Err(_) => Err(ClientError::Decode(err.to_string())),
            },
        }
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        self.fetch(RequestDescriptor::post("/auth/login/", to_body(request)?))
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ClientError> {
        self.fetch(RequestDescriptor::post("/auth/register/", to_body(request)?))
            .await
    }

    /// Logs in and persists the returned token.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, SessionError> {
        let response = self
            .login(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        self.store
            .set(Credential::new(response.token.clone()))
            .await?;
        tracing::info!("signed in as {username}");
        Ok(response)
    }

    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.store.clear().await?;
        tracing::info!("signed out");
        Ok(())
    }

    pub async fn transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, ClientError> {
        self.fetch(RequestDescriptor::get("/transactions/").with_query(filter.to_query()))
            .await
    }

    pub async fn create_transaction(
        &self,
        transaction: &TransactionNew,
    ) -> Result<Transaction, ClientError> {
        self.fetch(RequestDescriptor::post(
            "/transactions/",
            to_body(transaction)?,
        ))
        .await
    }

    /// Current month totals, served by the transactions endpoint with
    /// `period=monthly`.
    pub async fn monthly_summary(&self) -> Result<MonthlySummary, ClientError> {
        self.monthly_summary_for(None, None).await
    }

    /// Totals for a given month; the service fills in the current month or
    /// year for whichever is left out.
    pub async fn monthly_summary_for(
        &self,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<MonthlySummary, ClientError> {
        let filter = TransactionFilter {
            month,
            year,
            ..TransactionFilter::monthly()
        };
        let summary: MonthlySummary = self
            .fetch(RequestDescriptor::get("/transactions/").with_query(filter.to_query()))
            .await?;
        check_summary(summary)
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        self.fetch(RequestDescriptor::get("/categories/")).await
    }

    pub async fn budgets(&self) -> Result<Vec<Budget>, ClientError> {
        self.fetch(RequestDescriptor::get("/budgets/")).await
    }

    pub async fn update_budget(&self, id: u64, patch: &BudgetPatch) -> Result<Budget, ClientError> {
        self.fetch(RequestDescriptor::patch(
            format!("/budgets/{id}/"),
            to_body(patch)?,
        ))
        .await
    }

    pub async fn savings_goals(&self) -> Result<Vec<SavingsGoal>, ClientError> {
        self.fetch(RequestDescriptor::get("/savings-goals/")).await
    }

    pub async fn update_savings_goal(
        &self,
        id: u64,
        patch: &SavingsGoalPatch,
    ) -> Result<SavingsGoal, ClientError> {
        self.fetch(RequestDescriptor::patch(
            format!("/savings-goals/{id}/"),
            to_body(patch)?,
        ))
        .await
    }

    pub async fn predictions(&self) -> Result<PredictionSet, ClientError> {
        let set: PredictionSet = self
            .fetch_metric(RequestDescriptor::get("/financial-metrics/predictions/"))
            .await?;
        Ok(check_predictions(set))
    }

    pub async fn spending_analysis(&self) -> Result<SpendingAnalysis, ClientError> {
        self.fetch_metric(RequestDescriptor::get(
            "/financial-metrics/spending-analysis/",
        ))
        .await
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body).map_err(|err| {
        ClientError::Transport(TransportError::InvalidRequest(format!(
            "failed to encode request body: {err}"
        )))
    })
}

fn check_summary(summary: MonthlySummary) -> Result<MonthlySummary, ClientError> {
    for (field, value) in [
        ("total_income", summary.total_income),
        ("total_expenses", summary.total_expenses),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ClientError::Decode(format!(
                "{field} must be a non-negative number, got {value}"
            )));
        }
    }
    Ok(summary)
}

/// The service derives accuracy from an R² score, which goes negative for a
/// poor fit.
fn check_predictions(mut set: PredictionSet) -> PredictionSet {
    let accuracy = set.model_accuracy;
    let clamped = if accuracy.is_nan() {
        0.0
    } else {
        accuracy.clamp(0.0, 100.0)
    };
    if clamped != accuracy {
        tracing::warn!("model_accuracy {accuracy} out of range, using {clamped}");
        set.model_accuracy = clamped;
    }
    set
}
