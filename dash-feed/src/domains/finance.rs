//! Finance ledger
//!
//! The ledger sheet is sparse, so most monetary columns fall back to values
//! derived from gross revenue and expense. Derivations are deterministic.

use super::Domain;
use crate::coerce::{self, number_or, number_or_else, placeholder_id, text_or, NormalizeContext};
use crate::config::{sheet_candidates, ExportVariant, SourceConfig, FINANCE_SHEET_ID};
use crate::filter::{parse_record_date, Criteria, DateRange, Record};
use crate::metrics::{self, GroupTotals};
use chrono::Datelike;
use dash_common::RawRecord;
use serde::{Deserialize, Serialize};

const SHEET_GID: &str = "0";

const DEFAULT_GROSS_REVENUE: f64 = 60_000.0;
const DEFAULT_BUDGET_ALLOCATED: f64 = 45_000.0;
const DEFAULT_GST_RATE: f64 = 0.18;

/// Period-over-period change shown per region
const REGION_PERCENT_CHANGE: &[(&str, f64)] = &[
    ("Middle East", -21.3),
    ("North America", -29.1),
    ("Australia", -29.4),
    ("Europe", -36.5),
    ("Asia", -37.7),
];

pub struct Finance;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceRecord {
    pub finance_id: String,
    pub transaction_date: String,
    pub month: String,
    pub quarter: String,
    pub financial_year: String,
    pub department_name: String,
    pub cost_center: String,
    pub project_name: String,
    pub revenue_type: String,
    pub customer_id: String,
    pub customer_region: String,
    pub gross_revenue: f64,
    pub discount_amount: f64,
    pub net_revenue: f64,
    pub expense_type: String,
    pub expense_category: String,
    pub vendor_name: String,
    pub expense_amount: f64,
    pub gst_rate: f64,
    pub gst_amount: f64,
    pub taxable_amount: f64,
    pub payment_mode: String,
    pub payment_status: String,
    pub cash_inflow: f64,
    pub cash_outflow: f64,
    pub net_cash_flow: f64,
    pub total_cost: f64,
    pub gross_profit: f64,
    pub profit_margin_percent: f64,
    pub budget_allocated: f64,
    pub budget_used: f64,
    pub budget_variance: f64,
    pub forecasted_revenue: f64,
    pub approval_status: String,
    pub risk_flag: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for FinanceRecord {
    const DIMENSIONS: &'static [&'static str] = &[
        "financialYears",
        "quarters",
        "months",
        "departments",
        "costCenters",
        "projects",
        "revenueTypes",
        "expenseTypes",
        "expenseCategories",
        "vendors",
        "customerRegions",
        "paymentModes",
        "paymentStatuses",
        "approvalStatuses",
        "riskFlags",
    ];

    fn id(&self) -> &str {
        &self.finance_id
    }

    fn date(&self) -> &str {
        &self.transaction_date
    }

    fn dimension(&self, key: &str) -> Option<&str> {
        let value = match key {
            "financialYears" => &self.financial_year,
            "quarters" => &self.quarter,
            "months" => &self.month,
            "departments" => &self.department_name,
            "costCenters" => &self.cost_center,
            "projects" => &self.project_name,
            "revenueTypes" => &self.revenue_type,
            "expenseTypes" => &self.expense_type,
            "expenseCategories" => &self.expense_category,
            "vendors" => &self.vendor_name,
            "customerRegions" => &self.customer_region,
            "paymentModes" => &self.payment_mode,
            "paymentStatuses" => &self.payment_status,
            "approvalStatuses" => &self.approval_status,
            "riskFlags" => &self.risk_flag,
            _ => return None,
        };
        Some(value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinanceCriteria {
    pub date_range: DateRange,
    pub financial_years: Vec<String>,
    pub quarters: Vec<String>,
    pub months: Vec<String>,
    pub departments: Vec<String>,
    pub cost_centers: Vec<String>,
    pub projects: Vec<String>,
    pub revenue_types: Vec<String>,
    pub expense_types: Vec<String>,
    pub expense_categories: Vec<String>,
    pub vendors: Vec<String>,
    pub customer_regions: Vec<String>,
    pub payment_modes: Vec<String>,
    pub payment_statuses: Vec<String>,
    pub approval_statuses: Vec<String>,
    pub risk_flags: Vec<String>,
    pub search_query: String,
}

impl Criteria for FinanceCriteria {
    fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    fn selections(&self) -> Vec<(&'static str, &[String])> {
        vec![
            ("financialYears", self.financial_years.as_slice()),
            ("quarters", self.quarters.as_slice()),
            ("months", self.months.as_slice()),
            ("departments", self.departments.as_slice()),
            ("costCenters", self.cost_centers.as_slice()),
            ("projects", self.projects.as_slice()),
            ("revenueTypes", self.revenue_types.as_slice()),
            ("expenseTypes", self.expense_types.as_slice()),
            ("expenseCategories", self.expense_categories.as_slice()),
            ("vendors", self.vendors.as_slice()),
            ("customerRegions", self.customer_regions.as_slice()),
            ("paymentModes", self.payment_modes.as_slice()),
            ("paymentStatuses", self.payment_statuses.as_slice()),
            ("approvalStatuses", self.approval_statuses.as_slice()),
            ("riskFlags", self.risk_flags.as_slice()),
        ]
    }

    fn search(&self) -> &str {
        &self.search_query
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStats {
    pub region: String,
    /// Net revenue
    pub revenue: f64,
    pub transactions: usize,
    pub percent_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceKpis {
    pub gross_revenue: f64,
    pub net_revenue: f64,
    pub total_expenses: f64,
    pub gross_profit: f64,
    pub profit_margin: f64,
    pub net_cash_flow: f64,
    pub budget_utilization: f64,
    pub budget_variance: f64,
    pub forecast_accuracy: f64,
    pub high_risk_transactions: usize,
    pub region_breakdown: Vec<RegionStats>,
}

fn region_percent_change(region: &str) -> f64 {
    REGION_PERCENT_CHANGE
        .iter()
        .find(|(name, _)| *name == region)
        .map_or(0.0, |(_, change)| *change)
}

/// `Q1`..`Q4` and the full month name of a transaction date
fn calendar_labels(date: &str) -> (String, String) {
    match parse_record_date(date) {
        Some(d) => (
            format!("Q{}", d.month0() / 3 + 1),
            d.format("%B").to_string(),
        ),
        None => ("Q1".to_string(), "January".to_string()),
    }
}

impl Domain for Finance {
    type Record = FinanceRecord;
    type Criteria = FinanceCriteria;
    type Kpis = FinanceKpis;

    const KEY: &'static str = "finance";

    fn default_config() -> SourceConfig {
        SourceConfig::new(
            Self::KEY,
            sheet_candidates(
                FINANCE_SHEET_ID,
                SHEET_GID,
                &[ExportVariant::Export, ExportVariant::Gviz, ExportVariant::Published],
            ),
        )
    }

    fn normalize(raw: &RawRecord, index: usize, ctx: &NormalizeContext) -> Option<FinanceRecord> {
        let text = |aliases: &[&str], fallback: &str| text_or(raw, aliases, fallback);

        let gross = number_or(raw, &["gross_revenue", "revenue", "income"], DEFAULT_GROSS_REVENUE);
        let expense = number_or_else(raw, &["expense_amount", "expenses", "cost"], || {
            (gross * 0.7).floor()
        });
        let net = number_or_else(raw, &["net_revenue"], || gross - (gross * 0.1).floor());
        let gross_profit = number_or_else(raw, &["gross_profit"], || net - expense);

        let transaction_date = coerce::text(raw, &["transaction_date", "date"])
            .map(str::to_string)
            .unwrap_or_else(|| ctx.fetch_date());
        let (derived_quarter, derived_month) = calendar_labels(&transaction_date);

        Some(FinanceRecord {
            finance_id: coerce::text(raw, &["finance_id"])
                .map(str::to_string)
                .unwrap_or_else(|| placeholder_id("FIN", index, 6)),
            month: text(&["month"], &derived_month),
            quarter: text(&["quarter"], &derived_quarter),
            transaction_date,
            financial_year: text(&["financial_year", "fy"], "FY2024"),
            department_name: text(&["department_name", "department"], "Sales"),
            cost_center: text(&["cost_center"], "CC001"),
            project_name: text(&["project_name", "project"], "General Operations"),
            revenue_type: text(&["revenue_type"], "Product Sales"),
            customer_id: text(&["customer_id"], ""),
            customer_region: text(&["customer_region", "region"], "North America"),
            gross_revenue: gross,
            discount_amount: number_or_else(raw, &["discount_amount"], || (gross * 0.05).floor()),
            net_revenue: net,
            expense_type: text(&["expense_type"], "Operating"),
            expense_category: text(&["expense_category"], "General"),
            vendor_name: text(&["vendor_name", "vendor"], "Vendor A"),
            expense_amount: expense,
            gst_rate: number_or(raw, &["gst_rate"], DEFAULT_GST_RATE),
            gst_amount: number_or_else(raw, &["gst_amount"], || (net * 0.18).floor()),
            taxable_amount: number_or_else(raw, &["taxable_amount"], || (net * 0.82).floor()),
            payment_mode: text(&["payment_mode"], "Bank Transfer"),
            payment_status: text(&["payment_status"], "Paid"),
            cash_inflow: number_or(raw, &["cash_inflow"], net),
            cash_outflow: number_or(raw, &["cash_outflow"], expense),
            net_cash_flow: number_or(raw, &["net_cash_flow"], net - expense),
            total_cost: number_or(raw, &["total_cost"], expense),
            gross_profit,
            profit_margin_percent: number_or_else(raw, &["profit_margin_percent"], || {
                if net > 0.0 {
                    gross_profit / net * 100.0
                } else {
                    0.0
                }
            }),
            budget_allocated: number_or(raw, &["budget_allocated"], DEFAULT_BUDGET_ALLOCATED),
            budget_used: number_or(raw, &["budget_used"], expense),
            budget_variance: number_or(raw, &["budget_variance"], 0.0),
            forecasted_revenue: number_or_else(raw, &["forecasted_revenue"], || {
                (gross * 1.1).floor()
            }),
            approval_status: text(&["approval_status"], "Approved"),
            risk_flag: text(&["risk_flag"], "No"),
            created_at: text(&["created_at"], ""),
            updated_at: text(&["updated_at"], ""),
        })
    }

    fn aggregate(records: &[FinanceRecord]) -> FinanceKpis {
        let net_revenue = metrics::sum(records, |r| r.net_revenue);
        let gross_profit = metrics::sum(records, |r| r.gross_profit);
        let budget_allocated = metrics::sum(records, |r| r.budget_allocated);
        let budget_used = metrics::sum(records, |r| r.budget_used);
        let forecasted = metrics::sum(records, |r| r.forecasted_revenue);

        let regions = GroupTotals::collect(records, |r| r.customer_region.as_str(), |r| r.net_revenue);
        let region_breakdown = regions
            .iter()
            .map(|(region, revenue, transactions)| RegionStats {
                region: region.to_string(),
                revenue,
                transactions,
                percent_change: region_percent_change(region),
            })
            .collect();

        FinanceKpis {
            gross_revenue: metrics::sum(records, |r| r.gross_revenue),
            net_revenue,
            total_expenses: metrics::sum(records, |r| r.expense_amount),
            gross_profit,
            profit_margin: if net_revenue > 0.0 { gross_profit / net_revenue } else { 0.0 },
            net_cash_flow: metrics::sum(records, |r| r.net_cash_flow),
            budget_utilization: if budget_allocated > 0.0 {
                budget_used / budget_allocated
            } else {
                0.0
            },
            budget_variance: metrics::sum(records, |r| r.budget_variance),
            forecast_accuracy: if forecasted > 0.0 { net_revenue / forecasted } else { 0.0 },
            high_risk_transactions: metrics::count(records, |r| r.risk_flag == "Yes"),
            region_breakdown,
        }
    }

    fn insights(records: &[FinanceRecord], kpis: &FinanceKpis) -> Vec<String> {
        if records.is_empty() {
            return Vec::new();
        }
        let mut insights = Vec::new();

        let departments = GroupTotals::collect(records, |r| r.department_name.as_str(), |r| r.gross_profit);
        if let Some((department, profit)) = departments.top() {
            insights.push(format!(
                "💰 {} is the most profitable department with ${}M in gross profit.",
                department,
                metrics::fixed(profit / 1_000_000.0, 2)
            ));
        }

        let over_budget: Vec<&FinanceRecord> =
            records.iter().filter(|r| r.budget_variance < 0.0).collect();
        if !over_budget.is_empty() {
            let overspend: f64 = over_budget.iter().map(|r| r.budget_variance).sum::<f64>().abs();
            insights.push(format!(
                "⚠️ {} transactions exceeded budget by ${}K total.",
                over_budget.len(),
                metrics::fixed(overspend / 1000.0, 0)
            ));
        }

        let high_risk: Vec<&FinanceRecord> = records.iter().filter(|r| r.risk_flag == "Yes").collect();
        if !high_risk.is_empty() {
            let pending = high_risk.iter().filter(|r| r.approval_status != "Approved").count();
            insights.push(format!(
                "🚨 {} high-risk transactions identified, {} pending approval.",
                high_risk.len(),
                pending
            ));
        }

        let vendors = GroupTotals::collect(records, |r| r.vendor_name.as_str(), |r| r.expense_amount);
        if let Some((vendor, expense)) = vendors.top() {
            insights.push(format!(
                "📊 {} accounts for highest vendor expenses at ${}K.",
                vendor,
                metrics::fixed(expense / 1000.0, 0)
            ));
        }

        if kpis.forecast_accuracy < 0.90 {
            insights.push(format!(
                "📉 Forecast accuracy at {}% - review revenue projections.",
                metrics::pct(kpis.forecast_accuracy)
            ));
        } else if kpis.forecast_accuracy > 1.10 {
            insights.push(format!(
                "📈 Revenue exceeded forecast by {}% - update projections.",
                metrics::pct(kpis.forecast_accuracy - 1.0)
            ));
        }

        if kpis.net_cash_flow < 0.0 {
            insights.push(format!(
                "💸 Negative net cash flow of ${}K - review cash management.",
                metrics::fixed((kpis.net_cash_flow / 1000.0).abs(), 0)
            ));
        }

        if kpis.profit_margin < 0.20 {
            insights.push(format!(
                "📉 Profit margin at {}% - consider cost optimization strategies.",
                metrics::pct(kpis.profit_margin)
            ));
        }

        insights
    }
}
