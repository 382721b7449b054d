use std::collections::BTreeMap;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::Trace;
use crate::{
    arch::{Method, Regressor},
    dataset::Dataset,
    error::{MlErr, Result},
    training::TrainParams,
};

const MICRO_SEC_PER_SEC: u64 = 1_000_000;

/// How many past intervals feed a prediction and how far ahead it reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastWindow {
    pub seq_len: usize,
    pub horizon_len: usize,
}

impl ForecastWindow {
    /// Ten seconds of history and thirty seconds of horizon, measured in intervals.
    pub fn for_interval(interval_us: u64) -> Self {
        let interval_us = interval_us.max(1);
        Self {
            seq_len: ((10 * MICRO_SEC_PER_SEC / interval_us) as usize).max(1),
            horizon_len: ((30 * MICRO_SEC_PER_SEC / interval_us) as usize).max(1),
        }
    }

    /// The least amount of intervals a trace must span to be trained on.
    pub fn eval_size(&self) -> usize {
        self.seq_len + 2 * self.horizon_len
    }
}

/// An autoregressive model predicting the next interval's count from the previous
/// `seq_len` ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceForecaster {
    seq_len: usize,
    regressor: Regressor,
}

impl SequenceForecaster {
    /// Fits a forecaster on every series of the trace.
    ///
    /// # Arguments
    /// * `trace` - The bucketed arrivals.
    /// * `window` - The history and horizon lengths.
    /// * `method` - The regressor fitted over the sliding windows.
    /// * `params` - The regressor's hyperparameters.
    ///
    /// # Returns
    /// The forecaster, or an error if the trace is shorter than `window.eval_size()`.
    pub fn fit(
        trace: &Trace,
        window: ForecastWindow,
        method: Method,
        params: &TrainParams,
    ) -> Result<Self> {
        let needed = window.eval_size();
        if trace.intervals() < needed {
            return Err(MlErr::SeriesTooShort {
                got: trace.intervals(),
                needed,
            });
        }

        let seq_len = window.seq_len;
        let rows: Vec<Vec<f32>> = trace
            .series()
            .values()
            .flat_map(|series| series.windows(seq_len + 1).map(<[f32]>::to_vec))
            .collect();

        let dataset = Dataset::from_rows(&rows, 1)?;
        let regressor = Regressor::fit(method, &dataset, params)?;

        Ok(Self { seq_len, regressor })
    }

    pub fn method(&self) -> Method {
        self.regressor.method()
    }

    /// Rolls the model forward from the tail of every series.
    ///
    /// # Arguments
    /// * `trace` - The recent arrivals, series shorter than `seq_len` are zero padded.
    /// * `horizon_len` - The amount of intervals to predict.
    ///
    /// # Returns
    /// The non negative predicted counts per query id.
    pub fn forecast(&self, trace: &Trace, horizon_len: usize) -> Result<BTreeMap<i64, Vec<f32>>> {
        let mut predictions = BTreeMap::new();

        for (&query_id, series) in trace.series() {
            let tail = &series[series.len().saturating_sub(self.seq_len)..];
            let mut window = vec![0.0; self.seq_len - tail.len()];
            window.extend_from_slice(tail);

            let mut horizon = Vec::with_capacity(horizon_len);
            for _ in 0..horizon_len {
                let x = ArrayView2::from_shape((1, self.seq_len), window.as_slice())?;
                let next = self.regressor.predict(x)?[[0, 0]].max(0.0);

                horizon.push(next);
                window.remove(0);
                window.push(next);
            }

            predictions.insert(query_id, horizon);
        }

        Ok(predictions)
    }
}
