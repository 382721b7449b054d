use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use crate::error::{MlErr, Result};

/// The most interval buckets a trace may hold across all of its series.
pub const MAX_BUCKETS: u64 = 1 << 24;

/// Per query arrival counts, bucketed into fixed length intervals.
///
/// Every series spans the same amount of intervals, starting at the earliest event of the
/// whole trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    interval_us: u64,
    intervals: usize,
    series: BTreeMap<i64, Vec<f32>>,
}

impl Trace {
    /// Buckets `(query_id, timestamp_us)` events.
    ///
    /// # Arguments
    /// * `events` - The query arrivals, in any order.
    /// * `interval_us` - The bucket length in microseconds, must be positive.
    ///
    /// # Returns
    /// The trace, or `MlErr::SeriesTooLong` if all the series together would hold more than
    /// `MAX_BUCKETS` buckets.
    pub fn from_events(events: &[(i64, u64)], interval_us: u64) -> Result<Self> {
        let interval_us = interval_us.max(1);
        let (Some(start), Some(end)) = (
            events.iter().map(|&(_, ts)| ts).min(),
            events.iter().map(|&(_, ts)| ts).max(),
        ) else {
            return Ok(Self {
                interval_us,
                intervals: 0,
                series: BTreeMap::new(),
            });
        };

        let queries = events.iter().map(|&(id, _)| id).collect::<BTreeSet<_>>().len();
        let buckets = ((end - start) / interval_us)
            .saturating_add(1)
            .saturating_mul(queries as u64);
        if buckets > MAX_BUCKETS {
            return Err(MlErr::SeriesTooLong {
                buckets,
                max: MAX_BUCKETS,
            });
        }

        let bucket = |ts: u64| ((ts - start) / interval_us) as usize;
        let intervals = bucket(end) + 1;

        let mut series: BTreeMap<i64, Vec<f32>> = BTreeMap::new();
        for &(query_id, ts) in events {
            let counts = series
                .entry(query_id)
                .or_insert_with(|| vec![0.0; intervals]);
            counts[bucket(ts)] += 1.0;
        }

        Ok(Self {
            interval_us,
            intervals,
            series,
        })
    }

    /// Reads a headed CSV file whose first two columns are the query id and the arrival
    /// timestamp in microseconds, any further column is ignored.
    pub fn from_csv(path: &Path, interval_us: u64) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut events = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let field = |n: usize| record.get(n).unwrap_or_default();
            let parse_err = |value: &str| MlErr::Parse {
                path: path.to_path_buf(),
                line: i + 2,
                value: value.to_string(),
            };

            let query_id = field(0).parse::<i64>().map_err(|_| parse_err(field(0)))?;
            let ts = field(1).parse::<u64>().map_err(|_| parse_err(field(1)))?;
            events.push((query_id, ts));
        }

        Self::from_events(&events, interval_us)
    }

    pub fn interval_us(&self) -> u64 {
        self.interval_us
    }

    /// The amount of buckets every series spans.
    pub fn intervals(&self) -> usize {
        self.intervals
    }

    pub fn series(&self) -> &BTreeMap<i64, Vec<f32>> {
        &self.series
    }
}
