//! Customer support tickets

use super::Domain;
use crate::coerce::{self, integer_or, number_or, text_or, NormalizeContext};
use crate::config::{sheet_candidates, ExportVariant, SourceConfig, DEPARTMENT_SHEET_ID};
use crate::filter::{self, Criteria, DateRange, Record};
use crate::metrics::{self, ratio, GroupTotals};
use dash_common::RawRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SHEET_GID: &str = "1450544414";

/// Rows with fewer tokens are export noise
const MIN_ROW_WIDTH: usize = 3;

const SLA_BREACH_ALERT: f64 = 0.20;
const CSAT_LOW: f64 = 3.5;
const CSAT_EXCELLENT: f64 = 4.5;
const ESCALATION_ALERT: f64 = 0.15;

pub struct Support;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportRecord {
    pub ticket_id: String,
    pub ticket_created_at: String,
    pub ticket_resolved_at: String,
    pub ticket_status: String,
    pub priority: String,
    pub issue_category: String,
    pub issue_subcategory: String,
    pub support_channel: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_region: String,
    pub agent_id: String,
    pub agent_name: String,
    pub agent_team: String,
    pub first_response_time_minutes: f64,
    pub resolution_time_minutes: f64,
    pub sla_target_minutes: f64,
    pub sla_breached_flag: String,
    pub escalation_flag: String,
    pub ticket_reopen_count: f64,
    pub customer_satisfaction_score: f64,
    pub feedback_comments: String,
    pub product_name: String,
    pub contact_reason: String,
}

impl Record for SupportRecord {
    const DIMENSIONS: &'static [&'static str] = &[
        "statuses",
        "priorities",
        "issueCategories",
        "channels",
        "agents",
        "teams",
        "regions",
        "products",
        "slaBreached",
        "escalated",
    ];

    fn id(&self) -> &str {
        &self.ticket_id
    }

    fn date(&self) -> &str {
        &self.ticket_created_at
    }

    fn dimension(&self, key: &str) -> Option<&str> {
        let value = match key {
            "statuses" => &self.ticket_status,
            "priorities" => &self.priority,
            "issueCategories" => &self.issue_category,
            "channels" => &self.support_channel,
            "agents" => &self.agent_name,
            "teams" => &self.agent_team,
            "regions" => &self.customer_region,
            "products" => &self.product_name,
            "slaBreached" => &self.sla_breached_flag,
            "escalated" => &self.escalation_flag,
            _ => return None,
        };
        Some(value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SupportCriteria {
    pub search_query: String,
    pub date_range: DateRange,
    pub statuses: Vec<String>,
    pub priorities: Vec<String>,
    pub issue_categories: Vec<String>,
    pub channels: Vec<String>,
    pub agents: Vec<String>,
    pub teams: Vec<String>,
    pub regions: Vec<String>,
    pub products: Vec<String>,
    pub sla_breached: Vec<String>,
    pub escalated: Vec<String>,
}

impl Criteria for SupportCriteria {
    fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    fn selections(&self) -> Vec<(&'static str, &[String])> {
        vec![
            ("statuses", self.statuses.as_slice()),
            ("priorities", self.priorities.as_slice()),
            ("issueCategories", self.issue_categories.as_slice()),
            ("channels", self.channels.as_slice()),
            ("agents", self.agents.as_slice()),
            ("teams", self.teams.as_slice()),
            ("regions", self.regions.as_slice()),
            ("products", self.products.as_slice()),
            ("slaBreached", self.sla_breached.as_slice()),
            ("escalated", self.escalated.as_slice()),
        ]
    }

    fn search(&self) -> &str {
        &self.search_query
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportKpis {
    pub total_tickets: usize,
    /// Open or Pending
    pub open_tickets: usize,
    pub resolved_closed_tickets: usize,
    pub sla_compliance: f64,
    pub sla_breach_rate: f64,
    pub avg_first_response_time: f64,
    pub avg_resolution_time: f64,
    /// Mean over tickets that carry a score
    pub avg_csat: f64,
    pub escalation_rate: f64,
    pub reopen_rate: f64,
}

impl Domain for Support {
    type Record = SupportRecord;
    type Criteria = SupportCriteria;
    type Kpis = SupportKpis;

    const KEY: &'static str = "support";

    fn default_config() -> SourceConfig {
        SourceConfig::new(
            Self::KEY,
            sheet_candidates(
                DEPARTMENT_SHEET_ID,
                SHEET_GID,
                &[ExportVariant::Export, ExportVariant::Gviz, ExportVariant::Published],
            ),
        )
    }

    fn normalize(raw: &RawRecord, index: usize, _ctx: &NormalizeContext) -> Option<SupportRecord> {
        if raw.width() < MIN_ROW_WIDTH {
            return None;
        }
        let n = index + 1;
        let text = |aliases: &[&str], fallback: &str| text_or(raw, aliases, fallback);
        let or_else = |aliases: &[&str], fallback: String| {
            coerce::text(raw, aliases).map(str::to_string).unwrap_or(fallback)
        };

        Some(SupportRecord {
            ticket_id: or_else(&["ticket_id", "id", "ticket"], format!("TKT-{n:06}")),
            ticket_created_at: text(&["ticket_created_at", "created_at", "date_created", "created"], ""),
            ticket_resolved_at: text(
                &["ticket_resolved_at", "resolved_at", "date_resolved", "resolved"],
                "",
            ),
            ticket_status: text(&["ticket_status", "status"], "Open"),
            priority: text(&["priority"], "Medium"),
            issue_category: text(&["issue_category", "category", "type"], "General"),
            issue_subcategory: text(&["issue_subcategory", "subcategory"], ""),
            support_channel: text(&["support_channel", "channel", "source"], "Email"),
            customer_id: or_else(&["customer_id", "cust_id"], format!("CUST-{n}")),
            customer_name: or_else(&["customer_name", "customer"], format!("Customer {n}")),
            customer_email: text(&["customer_email", "email"], ""),
            customer_region: text(&["customer_region", "region"], "Unknown"),
            agent_id: or_else(&["agent_id"], format!("AGT-{n}")),
            agent_name: text(&["agent_name", "agent"], "Unassigned"),
            agent_team: text(&["agent_team", "team"], "Support"),
            first_response_time_minutes: number_or(
                raw,
                &["first_response_time_minutes", "first_response_time", "response_time"],
                0.0,
            ),
            resolution_time_minutes: number_or(
                raw,
                &["resolution_time_minutes", "resolution_time"],
                0.0,
            ),
            sla_target_minutes: number_or(raw, &["sla_target_minutes", "sla_target"], 240.0),
            sla_breached_flag: text(&["sla_breached_flag", "sla_breached"], "No"),
            escalation_flag: text(&["escalation_flag", "escalated"], "No"),
            ticket_reopen_count: integer_or(raw, &["ticket_reopen_count", "reopen_count"], 0.0),
            customer_satisfaction_score: number_or(
                raw,
                &["customer_satisfaction_score", "csat_score", "csat"],
                0.0,
            ),
            feedback_comments: text(&["feedback_comments", "feedback"], ""),
            product_name: text(&["product_name", "product"], "Unknown"),
            contact_reason: text(&["contact_reason", "reason"], "Support Request"),
        })
    }

    fn aggregate(records: &[SupportRecord]) -> SupportKpis {
        let total = records.len() as f64;
        let scored: Vec<&SupportRecord> = records
            .iter()
            .filter(|r| r.customer_satisfaction_score > 0.0)
            .collect();
        let csat_sum: f64 = scored.iter().map(|r| r.customer_satisfaction_score).sum();

        SupportKpis {
            total_tickets: records.len(),
            open_tickets: metrics::count(records, |r| {
                matches!(r.ticket_status.as_str(), "Open" | "Pending")
            }),
            resolved_closed_tickets: metrics::count(records, |r| {
                matches!(r.ticket_status.as_str(), "Resolved" | "Closed")
            }),
            sla_compliance: ratio(metrics::count(records, |r| r.sla_breached_flag == "No") as f64, total),
            sla_breach_rate: ratio(metrics::count(records, |r| r.sla_breached_flag == "Yes") as f64, total),
            avg_first_response_time: metrics::mean(records, |r| r.first_response_time_minutes),
            avg_resolution_time: metrics::mean(records, |r| r.resolution_time_minutes),
            avg_csat: ratio(csat_sum, scored.len() as f64),
            escalation_rate: ratio(metrics::count(records, |r| r.escalation_flag == "Yes") as f64, total),
            reopen_rate: ratio(metrics::count(records, |r| r.ticket_reopen_count > 0.0) as f64, total),
        }
    }

    fn insights(records: &[SupportRecord], kpis: &SupportKpis) -> Vec<String> {
        if records.is_empty() {
            return Vec::new();
        }
        let mut insights = Vec::new();

        if kpis.sla_breach_rate > SLA_BREACH_ALERT {
            insights.push(format!(
                "⚠️ High SLA breach rate ({}%) - Review priority handling and agent capacity.",
                metrics::pct(kpis.sla_breach_rate)
            ));
        }

        let priorities = GroupTotals::collect(records, |r| r.priority.as_str(), |_| 1.0);
        if let Some((priority, count)) = priorities.top() {
            insights.push(format!(
                "📊 {} priority tickets dominate with {} tickets ({}%).",
                priority,
                count,
                metrics::pct(ratio(count, records.len() as f64))
            ));
        }

        if kpis.avg_csat < CSAT_LOW && kpis.avg_csat > 0.0 {
            insights.push(format!(
                "😟 Customer satisfaction below target ({}/5) - Review escalated tickets for improvement areas.",
                metrics::fixed(kpis.avg_csat, 1)
            ));
        } else if kpis.avg_csat >= CSAT_EXCELLENT {
            insights.push(format!(
                "🌟 Excellent CSAT score ({}/5) - Team delivering strong customer experience.",
                metrics::fixed(kpis.avg_csat, 1)
            ));
        }

        if kpis.escalation_rate > ESCALATION_ALERT {
            insights.push(format!(
                "📈 High escalation rate ({}%) - Tier 1 training may reduce escalations.",
                metrics::pct(kpis.escalation_rate)
            ));
        }

        insights
    }

    fn seed() -> Vec<SupportRecord> {
        vec![SupportRecord {
            ticket_id: "TKT-000001".into(),
            ticket_created_at: "2024-01-15".into(),
            ticket_resolved_at: "2024-01-16".into(),
            ticket_status: "Resolved".into(),
            priority: "High".into(),
            issue_category: "Technical".into(),
            issue_subcategory: "Login Issue".into(),
            support_channel: "Email".into(),
            customer_id: "CUST-001".into(),
            customer_name: "John Smith".into(),
            customer_email: "john@example.com".into(),
            customer_region: "North America".into(),
            agent_id: "AGT-001".into(),
            agent_name: "Sarah Johnson".into(),
            agent_team: "Tier 1".into(),
            first_response_time_minutes: 45.0,
            resolution_time_minutes: 180.0,
            sla_target_minutes: 240.0,
            sla_breached_flag: "No".into(),
            escalation_flag: "No".into(),
            ticket_reopen_count: 0.0,
            customer_satisfaction_score: 4.5,
            feedback_comments: "Great support!".into(),
            product_name: "Product A".into(),
            contact_reason: "Technical Support".into(),
        }]
    }

    /// The two flag dimensions always offer both answers
    fn filter_options(records: &[SupportRecord]) -> BTreeMap<&'static str, Vec<String>> {
        let mut options = filter::filter_options(records);
        for flag in ["slaBreached", "escalated"] {
            options.insert(flag, vec!["Yes".to_string(), "No".to_string()]);
        }
        options
    }
}
