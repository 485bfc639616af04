//! Tax Simulation API Routes
//!
//! Capital gains simulation and the jurisdiction catalog.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tax_simulator::{SimulationRequest, TaxReport, TaxRule};

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JurisdictionInfo {
    pub code: String,
    pub name: String,
    pub currency: String,
    pub short_term_duration_days: i64,
    pub taxable_percentage: f64,
    pub tax_free_allowance: f64,
}

pub fn tax_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tax/simulate", post(simulate))
        .route("/api/tax/jurisdictions", get(list_jurisdictions))
        .route("/api/tax/rules/:country", get(get_jurisdiction_rules))
}

/// Run the FIFO gain/loss simulation for one tax year
async fn simulate(
    State(state): State<AppState>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TaxReport>>, AppError> {
    let Json(request) = payload?;
    let year = request.tax_year();

    tracing::info!(
        "Simulating {} transactions for {} ({})",
        request.transactions.len(),
        request.country,
        year
    );

    let report = state.simulator.simulate(&request)?;

    tracing::info!(
        "Simulation complete: {} disposals, total gain {:.2}, tax {:.2} at {}%",
        report.transactions.len(),
        report.total_gain,
        report.tax_amount,
        report.tax_rate
    );

    Ok(Json(ApiResponse::success(report)))
}

/// List supported jurisdictions
async fn list_jurisdictions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<JurisdictionInfo>>>, AppError> {
    let jurisdictions = state
        .simulator
        .rules()
        .iter()
        .map(|(code, rule)| JurisdictionInfo {
            code: code.to_string(),
            name: rule.name.clone(),
            currency: rule.currency.clone(),
            short_term_duration_days: rule.short_term_duration_days,
            taxable_percentage: rule.taxable_percentage,
            tax_free_allowance: rule.tax_free_allowance,
        })
        .collect();

    Ok(Json(ApiResponse::success(jurisdictions)))
}

/// Get rules for a specific jurisdiction
async fn get_jurisdiction_rules(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<Json<ApiResponse<TaxRule>>, AppError> {
    let rule = state.simulator.rule(&country)?;
    Ok(Json(ApiResponse::success(rule.clone())))
}
