/// A memoized 1-D Gaussian kernel.
///
/// The table covers `[-n, +n]` at unit spacing, `2n + 1` entries, with
/// `table[i + n] = exp(-0.5 * (i / width)^2)`. It is recomputed only when
/// `(n, width)` change, so callers that spread many peaks with the same
/// parameters pay for one allocation. Keep one cache per worker; the table
/// is not synchronized.
#[derive(Debug, Default)]
pub struct GaussianCache {
    table: Vec<f64>,
    n: usize,
    width: f64,
}

impl GaussianCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the kernel for `(n, width)`, rebuilding the table if the
    /// parameters differ from the cached ones.
    pub fn make(&mut self, n: usize, width: f64) -> &[f64] {
        if self.n != n || self.width != width || self.table.is_empty() {
            self.table.clear();
            self.table.reserve(2 * n + 1);
            for i in -(n as i64)..=(n as i64) {
                self.table.push((-0.5 * (i as f64 / width).powi(2)).exp());
            }
            self.n = n;
            self.width = width;
        }

        &self.table
    }
}
