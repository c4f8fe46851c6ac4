//! Read-side projections of a data source

use crate::domains::Domain;
use crate::filter;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything the presentation layer needs for one department page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainView<R, C, K> {
    /// Records passing the criteria
    pub data: Vec<R>,
    /// The full collection
    pub raw_data: Vec<R>,
    pub loading: bool,
    pub is_using_live_data: bool,
    pub criteria: C,
    pub filter_options: BTreeMap<&'static str, Vec<String>>,
    /// Computed over `data`
    pub kpis: K,
    pub insights: Vec<String>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

pub type ViewOf<D> = DomainView<<D as Domain>::Record, <D as Domain>::Criteria, <D as Domain>::Kpis>;

/// Inputs for a view, captured under the source's state lock
pub struct Snapshot<D: Domain> {
    pub records: Vec<D::Record>,
    pub loading: bool,
    pub live: bool,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl<D: Domain> Snapshot<D> {
    /// Filter, aggregate and summarize for `criteria`
    pub fn into_view(self, criteria: D::Criteria) -> ViewOf<D> {
        let data = filter::apply(&self.records, &criteria);
        let kpis = D::aggregate(&data);
        let insights = D::insights(&data, &kpis);
        let filter_options = D::filter_options(&self.records);

        DomainView {
            data,
            raw_data: self.records,
            loading: self.loading,
            is_using_live_data: self.live,
            criteria,
            filter_options,
            kpis,
            insights,
            last_refreshed: self.last_refreshed,
        }
    }
}

/// Per-source summary for `GET /api/sources`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub key: &'static str,
    pub records: usize,
    pub loading: bool,
    pub is_using_live_data: bool,
    pub last_refreshed: Option<DateTime<Utc>>,
    /// Cache entry missing or past its ttl
    pub stale: bool,
    pub enabled: bool,
    pub fetching: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::marketing::MarketingCriteria;
    use crate::domains::Marketing;

    #[test]
    fn test_view_filters_data_but_keeps_raw() {
        let snapshot = Snapshot::<Marketing> {
            records: Marketing::seed(),
            loading: false,
            live: false,
            last_refreshed: None,
        };
        let first_channel = snapshot.records[0].marketing_channel.clone();
        let criteria = MarketingCriteria {
            marketing_channels: vec![first_channel.clone()],
            ..Default::default()
        };

        let view = snapshot.into_view(criteria);
        assert_eq!(view.raw_data.len(), 3);
        assert!(!view.data.is_empty());
        assert!(view.data.iter().all(|r| r.marketing_channel == first_channel));
        assert_eq!(view.kpis, Marketing::aggregate(&view.data));
        assert!(!view.filter_options["marketingChannels"].is_empty());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["isUsingLiveData"], false);
        assert!(json["rawData"].is_array());
        assert!(json["filterOptions"].is_object());
    }
}
