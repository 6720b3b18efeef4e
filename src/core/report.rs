//! Report generation business logic.
//!
//! Studio-wide figures for the admin dashboard. All functions are
//! framework-agnostic and return structured data for the caller to format.

use crate::{
    core::ledger::BillingPeriod,
    entities::FeeStatus,
    errors::Result,
    store::{FeeFilter, FeeStore},
};
use serde::Serialize;
use tracing::{debug, instrument};

/// Headline figures for one billing period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// The period the monthly figures refer to
    pub period: BillingPeriod,
    /// Students currently enrolled; deactivated students are not counted
    pub active_students: usize,
    /// Pending charges billed for `period`
    pub due_this_period: f64,
    /// Pending charges across every period
    pub total_outstanding: f64,
    /// Settled charges billed for `period`
    pub received_this_period: f64,
}

/// Builds the dashboard summary for `period`.
///
/// Money figures include charges of deactivated students, matching
/// [`crate::core::ledger::unpaid_balances`]; only the head count leaves them out.
///
/// # Arguments
/// * `store` - Persistence provider
/// * `period` - Billing period for the monthly figures
///
/// # Returns
/// A `DashboardSummary` with the four headline figures
#[instrument(skip(store))]
pub async fn dashboard(store: &dyn FeeStore, period: BillingPeriod) -> Result<DashboardSummary> {
    let active_students = store
        .list_students()
        .await?
        .iter()
        .filter(|s| s.is_active)
        .count();

    let pending = store
        .list_fee_records(&FeeFilter {
            status: Some(FeeStatus::Pending),
            ..FeeFilter::default()
        })
        .await?;
    let total_outstanding: f64 = pending.iter().map(|r| r.amount).sum();
    let due_this_period: f64 = pending
        .iter()
        .filter(|r| r.month == period.month() && r.year == period.year())
        .map(|r| r.amount)
        .sum();

    let received_this_period: f64 = store
        .list_fee_records(&FeeFilter {
            status: Some(FeeStatus::Settled),
            month: Some(period.month()),
            year: Some(period.year()),
            student_id: None,
        })
        .await?
        .iter()
        .map(|r| r.amount)
        .sum();

    debug!(
        "Dashboard for {}: {} active, {} due, {} outstanding, {} received",
        period, active_students, due_this_period, total_outstanding, received_this_period
    );

    Ok(DashboardSummary {
        period,
        active_students,
        due_this_period,
        total_outstanding,
        received_this_period,
    })
}
