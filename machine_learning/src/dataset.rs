use std::path::Path;

use ndarray::{Array2, ArrayView2, Axis, s};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::error::{MlErr, Result};

/// An in memory table of samples, features on the left and targets on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The feature matrix, one sample per row.
    /// * `y` - The target matrix, one sample per row.
    ///
    /// # Returns
    /// The dataset or an error if the row counts differ.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                a: "features",
                b: "targets",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        Ok(Self { x, y })
    }

    /// Splits every row into its first `width - y_size` features and last `y_size` targets.
    pub fn from_rows(rows: &[Vec<f32>], y_size: usize) -> Result<Self> {
        let width = rows.first().map(Vec::len).ok_or(MlErr::EmptyDataset)?;
        if width <= y_size {
            return Err(MlErr::SizeMismatch {
                a: "row",
                b: "targets",
                got: width,
                expected: y_size + 1,
            });
        }

        let data = matrix_from_rows(rows)?;
        let x = data.slice(s![.., ..width - y_size]).to_owned();
        let y = data.slice(s![.., width - y_size..]).to_owned();
        Self::new(x, y)
    }

    /// Reads a headed numeric CSV file, see [`Dataset::from_rows`].
    pub fn from_csv(path: &Path, y_size: usize) -> Result<Self> {
        Self::from_rows(&read_csv(path)?, y_size)
    }

    /// Stacks datasets of equal widths on top of each other.
    pub fn concat(datasets: &[Dataset]) -> Result<Self> {
        if datasets.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        let xs: Vec<_> = datasets.iter().map(|d| d.x.view()).collect();
        let ys: Vec<_> = datasets.iter().map(|d| d.y.view()).collect();
        Self::new(
            ndarray::concatenate(Axis(0), &xs)?,
            ndarray::concatenate(Axis(0), &ys)?,
        )
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x.ncols()
    }

    pub fn y_size(&self) -> usize {
        self.y.ncols()
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView2<'_, f32> {
        self.y.view()
    }

    /// Keeps the given rows, in the given order.
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), rows),
            y: self.y.select(Axis(0), rows),
        }
    }

    /// Drops the first `n` rows.
    pub fn skip(&self, n: usize) -> Self {
        let rows: Vec<_> = (n.min(self.len())..self.len()).collect();
        self.select(&rows)
    }

    /// Keeps one row out of every `n`, starting with the first.
    pub fn every_nth(&self, n: usize) -> Self {
        let rows: Vec<_> = (0..self.len()).step_by(n.max(1)).collect();
        self.select(&rows)
    }

    /// Drops the rows whose first target lies above the `1 - ratio` quantile.
    ///
    /// # Arguments
    /// * `ratio` - The fraction of the largest targets to drop, `0` keeps everything.
    pub fn trim(&self, ratio: f32) -> Self {
        if ratio <= 0.0 || self.is_empty() || self.y_size() == 0 {
            return self.clone();
        }

        let mut targets = self.y.column(0).to_vec();
        targets.sort_by(f32::total_cmp);

        let keep = ((1.0 - ratio) * targets.len() as f32).ceil() as usize;
        let threshold = targets[keep.clamp(1, targets.len()) - 1];

        let rows: Vec<_> = (0..self.len())
            .filter(|&i| self.y[[i, 0]] <= threshold)
            .collect();
        self.select(&rows)
    }

    /// Multiplies every target by `factor`.
    pub fn scale_targets(&mut self, factor: f32) {
        self.y.mapv_inplace(|v| v * factor);
    }

    /// Shuffles the rows with a seeded generator and splits them in two.
    ///
    /// # Arguments
    /// * `test_ratio` - The fraction of rows that end up in the test half.
    /// * `seed` - The shuffling seed, equal seeds yield equal splits.
    ///
    /// # Returns
    /// `(train, test)`, the test half may be empty for small datasets.
    pub fn split(&self, test_ratio: f32, seed: u64) -> (Self, Self) {
        let mut rows: Vec<_> = (0..self.len()).collect();
        rows.shuffle(&mut StdRng::seed_from_u64(seed));

        let test_len = ((self.len() as f32) * test_ratio.clamp(0.0, 1.0)).floor() as usize;
        let test_len = if test_len >= self.len() { 0 } else { test_len };

        let (test, train) = rows.split_at(test_len);
        (self.select(train), self.select(test))
    }
}

/// Packs equally long rows into a matrix.
pub fn matrix_from_rows(rows: &[Vec<f32>]) -> Result<Array2<f32>> {
    let width = rows.first().map_or(0, Vec::len);
    let mut data = Vec::with_capacity(rows.len() * width);

    for row in rows {
        if row.len() != width {
            return Err(MlErr::SizeMismatch {
                a: "row",
                b: "first row",
                got: row.len(),
                expected: width,
            });
        }
        data.extend_from_slice(row);
    }

    Ok(Array2::from_shape_vec((rows.len(), width), data)?)
}

/// Reads every record of a headed CSV file as numbers.
pub fn read_csv(path: &Path) -> Result<Vec<Vec<f32>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                field.parse::<f32>().map_err(|_| MlErr::Parse {
                    path: path.to_path_buf(),
                    line: i + 2,
                    value: field.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        rows.push(row);
    }

    Ok(rows)
}
