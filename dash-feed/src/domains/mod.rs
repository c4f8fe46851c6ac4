//! Department domains
//!
//! Each department is a unit type implementing [`Domain`]: its record and
//! criteria types, row normalizer, KPI aggregation, insight rules and source
//! defaults. The polling and filter engines are generic over this trait.

pub mod finance;
pub mod hr;
pub mod marketing;
pub mod sales;
pub mod support;

pub use finance::Finance;
pub use hr::Hr;
pub use marketing::Marketing;
pub use sales::Sales;
pub use support::Support;

use crate::coerce::NormalizeContext;
use crate::config::SourceConfig;
use crate::filter::{self, Criteria, Record};
use dash_common::RawRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// One department's data pipeline, minus the transport
pub trait Domain: Send + Sync + Sized + 'static {
    type Record: Record;
    type Criteria: Criteria;
    type Kpis: Clone + Debug + Default + PartialEq + Serialize + Send + Sync + 'static;

    /// Source name, used in routes, config tables and cache keys
    const KEY: &'static str;

    /// Built-in source configuration
    fn default_config() -> SourceConfig;

    /// Map one raw row onto a record, `None` drops the row
    ///
    /// `index` is the 0-based position of the row among the data rows.
    fn normalize(raw: &RawRecord, index: usize, ctx: &NormalizeContext) -> Option<Self::Record>;

    fn aggregate(records: &[Self::Record]) -> Self::Kpis;

    /// Threshold-gated summaries in fixed priority order
    fn insights(records: &[Self::Record], kpis: &Self::Kpis) -> Vec<String>;

    /// Records shown when every candidate failed and nothing was retained
    fn seed() -> Vec<Self::Record> {
        Vec::new()
    }

    /// Selectable values per criteria field
    fn filter_options(records: &[Self::Record]) -> BTreeMap<&'static str, Vec<String>> {
        filter::filter_options(records)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use dash_common::RawRecord;

    pub fn raw(pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord::from_pairs(pairs.iter().copied())
    }
}
