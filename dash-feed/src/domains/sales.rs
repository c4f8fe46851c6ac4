//! Sales transactions

use super::Domain;
use crate::coerce::{self, integer_or, number_or, placeholder_id, text_or, NormalizeContext};
use crate::config::{sheet_candidates, ExportVariant, SourceConfig, DEPARTMENT_SHEET_ID};
use crate::filter::{Criteria, DateRange, Record};
use crate::metrics::{self, ratio, GroupTotals};
use dash_common::RawRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SHEET_GID: &str = "643477074";

pub struct Sales;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub sale_id: String,
    pub date: String,
    pub customer_id: String,
    pub customer_region: String,
    pub product_id: String,
    pub product_category: String,
    pub unit_price: f64,
    pub quantity: f64,
    pub discount_percent: f64,
    pub sales_agent: String,
    pub payment_method: String,
    pub subscription_type: String,
    pub renewal_status: String,
    pub total_revenue: f64,
    pub gross_sales: f64,
    pub discount_amount: f64,
    pub discount_pct_row: f64,
    pub revenue_per_unit: f64,
}

impl Record for SaleRecord {
    const DIMENSIONS: &'static [&'static str] = &[
        "regions",
        "categories",
        "agents",
        "paymentMethods",
        "subscriptionTypes",
        "selectedProduct",
    ];

    fn id(&self) -> &str {
        &self.sale_id
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn dimension(&self, key: &str) -> Option<&str> {
        let value = match key {
            "regions" => &self.customer_region,
            "categories" => &self.product_category,
            "agents" => &self.sales_agent,
            "paymentMethods" => &self.payment_method,
            "subscriptionTypes" => &self.subscription_type,
            "selectedProduct" => &self.product_id,
            _ => return None,
        };
        Some(value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalesCriteria {
    pub date_range: DateRange,
    pub regions: Vec<String>,
    pub categories: Vec<String>,
    pub agents: Vec<String>,
    pub payment_methods: Vec<String>,
    pub subscription_types: Vec<String>,
    pub search_query: String,
    /// Single product drill-down
    pub selected_product: Option<String>,
}

impl Criteria for SalesCriteria {
    fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    fn selections(&self) -> Vec<(&'static str, &[String])> {
        vec![
            ("regions", self.regions.as_slice()),
            ("categories", self.categories.as_slice()),
            ("agents", self.agents.as_slice()),
            ("paymentMethods", self.payment_methods.as_slice()),
            ("subscriptionTypes", self.subscription_types.as_slice()),
            ("selectedProduct", self.selected_product.as_slice()),
        ]
    }

    fn search(&self) -> &str {
        &self.search_query
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesKpis {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub aov: f64,
    pub total_quantity: f64,
    pub gross_sales: f64,
    pub total_discount: f64,
    pub discount_pct: f64,
    pub unique_customers: usize,
    pub renewal_rate: f64,
    pub churn_rate: f64,
}

impl Domain for Sales {
    type Record = SaleRecord;
    type Criteria = SalesCriteria;
    type Kpis = SalesKpis;

    const KEY: &'static str = "sales";

    fn default_config() -> SourceConfig {
        SourceConfig::new(
            Self::KEY,
            sheet_candidates(DEPARTMENT_SHEET_ID, SHEET_GID, &[ExportVariant::Gviz]),
        )
        .with_poll_interval(Duration::from_secs(300))
        .with_cooldown(Duration::from_secs(30))
    }

    fn normalize(raw: &RawRecord, index: usize, _ctx: &NormalizeContext) -> Option<SaleRecord> {
        let text = |key: &str| text_or(raw, &[key], "");

        let unit_price = number_or(raw, &["unit_price"], 0.0);
        let quantity = integer_or(raw, &["quantity"], 0.0);
        let total_revenue = number_or(raw, &["total_revenue"], 0.0);
        let gross_sales = unit_price * quantity;
        let discount_amount = gross_sales - total_revenue;

        let sale_id = coerce::text(raw, &["sale_id"])
            .map(str::to_string)
            .unwrap_or_else(|| placeholder_id("SALE-", index, 6));

        Some(SaleRecord {
            sale_id,
            date: text("date"),
            customer_id: text("customer_id"),
            customer_region: text("customer_region"),
            product_id: text("product_id"),
            product_category: text("product_category"),
            unit_price,
            quantity,
            discount_percent: number_or(raw, &["discount_percent"], 0.0),
            sales_agent: text("sales_agent"),
            payment_method: text("payment_method"),
            subscription_type: text("subscription_type"),
            renewal_status: text("renewal_status"),
            total_revenue,
            gross_sales,
            discount_amount,
            discount_pct_row: ratio(discount_amount, gross_sales),
            revenue_per_unit: ratio(total_revenue, quantity),
        })
    }

    fn aggregate(records: &[SaleRecord]) -> SalesKpis {
        let total_revenue = metrics::sum(records, |r| r.total_revenue);
        let gross_sales = metrics::sum(records, |r| r.gross_sales);
        let total_discount = gross_sales - total_revenue;
        let total_orders = metrics::distinct(records, |r| r.sale_id.as_str());
        let n = records.len() as f64;

        SalesKpis {
            total_revenue,
            total_orders,
            aov: ratio(total_revenue, total_orders as f64),
            total_quantity: metrics::sum(records, |r| r.quantity),
            gross_sales,
            total_discount,
            discount_pct: ratio(total_discount, gross_sales),
            unique_customers: metrics::distinct(records, |r| r.customer_id.as_str()),
            renewal_rate: ratio(metrics::count(records, |r| r.renewal_status == "Renewed") as f64, n),
            churn_rate: ratio(metrics::count(records, |r| r.renewal_status == "Expired") as f64, n),
        }
    }

    fn insights(records: &[SaleRecord], kpis: &SalesKpis) -> Vec<String> {
        if records.is_empty() {
            return Vec::new();
        }
        let mut insights = Vec::new();

        let regions = GroupTotals::collect(records, |r| r.customer_region.as_str(), |r| r.total_revenue);
        if let Some((region, revenue)) = regions.top() {
            insights.push(format!(
                "🏆 {} leads all regions with ${} in revenue ({}% of total).",
                region,
                metrics::money(revenue),
                metrics::pct(ratio(revenue, kpis.total_revenue))
            ));
        }

        let agents = GroupTotals::collect(records, |r| r.sales_agent.as_str(), |r| r.total_revenue);
        if let Some((agent, revenue)) = agents.top() {
            insights.push(format!(
                "⭐ Top agent: {} with ${} in revenue.",
                agent,
                metrics::money(revenue)
            ));
        }

        insights
    }
}
