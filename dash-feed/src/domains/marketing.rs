//! Marketing campaigns

use super::Domain;
use crate::coerce::{self, integer_or, number_or, number_or_else, placeholder_id, text_or, NormalizeContext};
use crate::config::{sheet_candidates, ExportVariant, SourceConfig, DEPARTMENT_SHEET_ID};
use crate::filter::{Criteria, DateRange, NumericRange, Record};
use crate::metrics::{self, ratio, GroupTotals};
use dash_common::RawRecord;
use serde::{Deserialize, Serialize};

const SHEET_GID: &str = "872851567";

pub struct Marketing;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingRecord {
    pub campaign_id: String,
    pub campaign_name: String,
    pub campaign_type: String,
    pub campaign_start_date: String,
    pub campaign_end_date: String,
    pub campaign_status: String,
    pub marketing_channel: String,
    pub platform_name: String,
    pub ad_format: String,
    pub target_region: String,
    pub target_city: String,
    pub target_audience: String,
    pub impressions: f64,
    pub clicks: f64,
    pub leads_generated: f64,
    pub conversions: f64,
    pub cost_per_click: f64,
    pub cost_per_lead: f64,
    pub total_campaign_cost: f64,
    pub revenue_generated: f64,
    pub roi_percent: f64,
    pub conversion_rate: f64,
    pub click_through_rate: f64,
    pub landing_page_url: String,
    pub bounce_rate: f64,
    pub avg_session_duration: f64,
    pub marketing_manager: String,
    pub agency_name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for MarketingRecord {
    const DIMENSIONS: &'static [&'static str] = &[
        "campaignTypes",
        "campaignStatuses",
        "marketingChannels",
        "platformNames",
        "targetRegions",
        "targetCities",
        "targetAudiences",
        "marketingManagers",
        "agencyNames",
    ];

    fn id(&self) -> &str {
        &self.campaign_id
    }

    fn date(&self) -> &str {
        &self.campaign_start_date
    }

    fn dimension(&self, key: &str) -> Option<&str> {
        let value = match key {
            "campaignTypes" => &self.campaign_type,
            "campaignStatuses" => &self.campaign_status,
            "marketingChannels" => &self.marketing_channel,
            "platformNames" => &self.platform_name,
            "targetRegions" => &self.target_region,
            "targetCities" => &self.target_city,
            "targetAudiences" => &self.target_audience,
            "marketingManagers" => &self.marketing_manager,
            "agencyNames" => &self.agency_name,
            _ => return None,
        };
        Some(value.as_str())
    }

    fn measure(&self, key: &str) -> Option<f64> {
        match key {
            "roiRange" => Some(self.roi_percent),
            "cpcRange" => Some(self.cost_per_click),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketingCriteria {
    pub date_range: DateRange,
    pub campaign_types: Vec<String>,
    pub campaign_statuses: Vec<String>,
    pub marketing_channels: Vec<String>,
    pub platform_names: Vec<String>,
    pub target_regions: Vec<String>,
    pub target_cities: Vec<String>,
    pub target_audiences: Vec<String>,
    pub marketing_managers: Vec<String>,
    pub agency_names: Vec<String>,
    pub roi_range: NumericRange,
    pub cpc_range: NumericRange,
    pub search_query: String,
}

impl Criteria for MarketingCriteria {
    fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    fn selections(&self) -> Vec<(&'static str, &[String])> {
        vec![
            ("campaignTypes", self.campaign_types.as_slice()),
            ("campaignStatuses", self.campaign_statuses.as_slice()),
            ("marketingChannels", self.marketing_channels.as_slice()),
            ("platformNames", self.platform_names.as_slice()),
            ("targetRegions", self.target_regions.as_slice()),
            ("targetCities", self.target_cities.as_slice()),
            ("targetAudiences", self.target_audiences.as_slice()),
            ("marketingManagers", self.marketing_managers.as_slice()),
            ("agencyNames", self.agency_names.as_slice()),
        ]
    }

    fn ranges(&self) -> Vec<(&'static str, &NumericRange)> {
        vec![("roiRange", &self.roi_range), ("cpcRange", &self.cpc_range)]
    }

    fn search(&self) -> &str {
        &self.search_query
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketingKpis {
    pub total_campaign_spend: f64,
    pub total_revenue: f64,
    /// Fraction, not percent
    pub overall_roi: f64,
    pub avg_cpc: f64,
    pub avg_cpl: f64,
    pub total_leads: f64,
    pub total_conversions: f64,
    pub conversion_rate: f64,
    pub avg_ctr: f64,
}

/// `(revenue - cost) / cost * 100`, 0 without spend
pub fn roi_percent(cost: f64, revenue: f64) -> f64 {
    if cost > 0.0 {
        (revenue - cost) / cost * 100.0
    } else {
        0.0
    }
}

impl Domain for Marketing {
    type Record = MarketingRecord;
    type Criteria = MarketingCriteria;
    type Kpis = MarketingKpis;

    const KEY: &'static str = "marketing";

    fn default_config() -> SourceConfig {
        SourceConfig::new(
            Self::KEY,
            sheet_candidates(
                DEPARTMENT_SHEET_ID,
                SHEET_GID,
                &[
                    ExportVariant::Export,
                    ExportVariant::Gviz,
                    ExportVariant::Published,
                    ExportVariant::Shared,
                ],
            ),
        )
    }

    fn normalize(raw: &RawRecord, index: usize, ctx: &NormalizeContext) -> Option<MarketingRecord> {
        let unknown = |key: &str| text_or(raw, &[key], "Unknown");
        let blank = |key: &str| text_or(raw, &[key], "");
        let stamp = |key: &str| {
            coerce::text(raw, &[key])
                .map(str::to_string)
                .unwrap_or_else(|| ctx.fetch_timestamp())
        };

        let impressions = integer_or(raw, &["impressions"], 0.0);
        let clicks = integer_or(raw, &["clicks"], 0.0);
        let leads = integer_or(raw, &["leads_generated"], 0.0);
        let conversions = integer_or(raw, &["conversions"], 0.0);
        let cost = number_or(raw, &["total_campaign_cost"], 0.0);
        let revenue = number_or(raw, &["revenue_generated"], 0.0);

        Some(MarketingRecord {
            campaign_id: coerce::text(raw, &["campaign_id"])
                .map(str::to_string)
                .unwrap_or_else(|| placeholder_id("CMP-", index, 3)),
            campaign_name: coerce::text(raw, &["campaign_name"])
                .map(str::to_string)
                .unwrap_or_else(|| format!("Campaign {}", index + 1)),
            campaign_type: unknown("campaign_type"),
            campaign_start_date: blank("campaign_start_date"),
            campaign_end_date: blank("campaign_end_date"),
            campaign_status: unknown("campaign_status"),
            marketing_channel: unknown("marketing_channel"),
            platform_name: unknown("platform_name"),
            ad_format: unknown("ad_format"),
            target_region: unknown("target_region"),
            target_city: blank("target_city"),
            target_audience: unknown("target_audience"),
            impressions,
            clicks,
            leads_generated: leads,
            conversions,
            cost_per_click: number_or_else(raw, &["cost_per_click"], || ratio(cost, clicks)),
            cost_per_lead: number_or_else(raw, &["cost_per_lead"], || ratio(cost, leads)),
            total_campaign_cost: cost,
            revenue_generated: revenue,
            roi_percent: roi_percent(cost, revenue),
            conversion_rate: number_or_else(raw, &["conversion_rate"], || {
                ratio(conversions, clicks) * 100.0
            }),
            click_through_rate: number_or_else(raw, &["click_through_rate"], || {
                ratio(clicks, impressions) * 100.0
            }),
            landing_page_url: blank("landing_page_url"),
            bounce_rate: number_or(raw, &["bounce_rate"], 0.0),
            avg_session_duration: number_or(raw, &["avg_session_duration"], 0.0),
            marketing_manager: unknown("marketing_manager"),
            agency_name: unknown("agency_name"),
            created_at: stamp("created_at"),
            updated_at: stamp("updated_at"),
        })
    }

    fn aggregate(records: &[MarketingRecord]) -> MarketingKpis {
        let spend = metrics::sum(records, |r| r.total_campaign_cost);
        let revenue = metrics::sum(records, |r| r.revenue_generated);
        let clicks = metrics::sum(records, |r| r.clicks);
        let leads = metrics::sum(records, |r| r.leads_generated);
        let conversions = metrics::sum(records, |r| r.conversions);
        let impressions = metrics::sum(records, |r| r.impressions);

        MarketingKpis {
            total_campaign_spend: spend,
            total_revenue: revenue,
            overall_roi: ratio(revenue - spend, spend),
            avg_cpc: ratio(spend, clicks),
            avg_cpl: ratio(spend, leads),
            total_leads: leads,
            total_conversions: conversions,
            conversion_rate: ratio(conversions, clicks),
            avg_ctr: ratio(clicks, impressions),
        }
    }

    fn insights(records: &[MarketingRecord], _kpis: &MarketingKpis) -> Vec<String> {
        let mut insights = Vec::new();

        let best = records.iter().fold(None::<&MarketingRecord>, |best, r| match best {
            Some(b) if b.roi_percent >= r.roi_percent => Some(b),
            _ => Some(r),
        });
        if let Some(best) = best {
            insights.push(format!(
                "🏆 Highest ROI: \"{}\" with {}% ROI",
                best.campaign_name,
                metrics::fixed(best.roi_percent, 1)
            ));
        }

        let channels = GroupTotals::collect(
            records,
            |r| r.marketing_channel.as_str(),
            |r| r.revenue_generated,
        );
        if let Some((channel, revenue)) = channels.top() {
            insights.push(format!(
                "📢 Best Channel: {} generating ${}K revenue",
                channel,
                metrics::fixed(revenue / 1000.0, 0)
            ));
        }

        insights
    }

    fn seed() -> Vec<MarketingRecord> {
        vec![
            seed_campaign(SeedCampaign {
                id: "CMP-001",
                name: "Google Search Campaign",
                kind: "Search",
                dates: ("2024-01-01", "2024-01-31"),
                channel: "Google Ads",
                platform: "Google",
                ad_format: "Text",
                place: ("North America", "New York", "25-45"),
                funnel: [45000.0, 2250.0, 450.0, 180.0],
                unit_costs: (2.50, 12.50),
                money: (5625.0, 18000.0),
                rates: (220.0, 8.0, 5.0),
                url: "https://example.com/search",
                engagement: (35.0, 180.0),
                owner: ("Sarah Johnson", "In-House"),
                stamp: "2024-01-01T00:00:00Z",
            }),
            seed_campaign(SeedCampaign {
                id: "CMP-002",
                name: "Facebook Social Campaign",
                kind: "Social",
                dates: ("2024-01-15", "2024-02-15"),
                channel: "Facebook",
                platform: "Facebook",
                ad_format: "Image",
                place: ("Europe", "London", "18-35"),
                funnel: [80000.0, 1600.0, 320.0, 96.0],
                unit_costs: (1.25, 6.25),
                money: (2000.0, 9600.0),
                rates: (380.0, 6.0, 2.0),
                url: "https://example.com/social",
                engagement: (45.0, 120.0),
                owner: ("Mike Chen", "Digital Pro"),
                stamp: "2024-01-15T00:00:00Z",
            }),
            seed_campaign(SeedCampaign {
                id: "CMP-003",
                name: "LinkedIn B2B Campaign",
                kind: "Professional",
                dates: ("2024-02-01", "2024-03-01"),
                channel: "LinkedIn",
                platform: "LinkedIn",
                ad_format: "Sponsored Content",
                place: ("Asia", "Tokyo", "30-50"),
                funnel: [25000.0, 750.0, 150.0, 45.0],
                unit_costs: (4.00, 20.00),
                money: (3000.0, 13500.0),
                rates: (350.0, 6.0, 3.0),
                url: "https://example.com/b2b",
                engagement: (25.0, 240.0),
                owner: ("Lisa Rodriguez", "Marketing Plus"),
                stamp: "2024-02-01T00:00:00Z",
            }),
        ]
    }
}

struct SeedCampaign {
    id: &'static str,
    name: &'static str,
    kind: &'static str,
    dates: (&'static str, &'static str),
    channel: &'static str,
    platform: &'static str,
    ad_format: &'static str,
    /// region, city, audience
    place: (&'static str, &'static str, &'static str),
    /// impressions, clicks, leads, conversions
    funnel: [f64; 4],
    /// cost per click, cost per lead
    unit_costs: (f64, f64),
    /// cost, revenue
    money: (f64, f64),
    /// roi %, conversion %, ctr %
    rates: (f64, f64, f64),
    url: &'static str,
    /// bounce %, session seconds
    engagement: (f64, f64),
    /// manager, agency
    owner: (&'static str, &'static str),
    stamp: &'static str,
}

fn seed_campaign(s: SeedCampaign) -> MarketingRecord {
    MarketingRecord {
        campaign_id: s.id.to_string(),
        campaign_name: s.name.to_string(),
        campaign_type: s.kind.to_string(),
        campaign_start_date: s.dates.0.to_string(),
        campaign_end_date: s.dates.1.to_string(),
        campaign_status: "Active".to_string(),
        marketing_channel: s.channel.to_string(),
        platform_name: s.platform.to_string(),
        ad_format: s.ad_format.to_string(),
        target_region: s.place.0.to_string(),
        target_city: s.place.1.to_string(),
        target_audience: s.place.2.to_string(),
        impressions: s.funnel[0],
        clicks: s.funnel[1],
        leads_generated: s.funnel[2],
        conversions: s.funnel[3],
        cost_per_click: s.unit_costs.0,
        cost_per_lead: s.unit_costs.1,
        total_campaign_cost: s.money.0,
        revenue_generated: s.money.1,
        roi_percent: s.rates.0,
        conversion_rate: s.rates.1,
        click_through_rate: s.rates.2,
        landing_page_url: s.url.to_string(),
        bounce_rate: s.engagement.0,
        avg_session_duration: s.engagement.1,
        marketing_manager: s.owner.0.to_string(),
        agency_name: s.owner.1.to_string(),
        created_at: s.stamp.to_string(),
        updated_at: s.stamp.to_string(),
    }
}
