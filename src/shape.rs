use std::fmt;

/// Dimensions of a row-major `rows x columns x filters` tensor.
///
/// Element `(r, c, f)` lives at `(r * columns + c) * filters + f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorShape {
    pub rows: usize,
    pub columns: usize,
    pub filters: usize,
}

impl TensorShape {
    pub const fn new(rows: usize, columns: usize, filters: usize) -> Self {
        Self {
            rows,
            columns,
            filters,
        }
    }

    // length of a reduced buffer
    pub const fn cells(&self) -> usize {
        self.rows * self.columns
    }

    pub const fn len(&self) -> usize {
        self.cells() * self.filters
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn upscaled(&self, scale: usize) -> Self {
        Self::new(self.rows * scale, self.columns * scale, self.filters)
    }

    /// Element count, or `None` if it does not fit in `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.rows
            .checked_mul(self.columns)?
            .checked_mul(self.filters)
    }

    /// [`upscaled`](Self::upscaled), or `None` if any dimension or the
    /// element count of the result would overflow.
    pub fn checked_upscaled(&self, scale: usize) -> Option<Self> {
        let scaled = Self::new(
            self.rows.checked_mul(scale)?,
            self.columns.checked_mul(scale)?,
            self.filters,
        );
        scaled.checked_len().map(|_| scaled)
    }

    pub const fn reduced(&self) -> Self {
        Self::new(self.rows, self.columns, 1)
    }
}

// columns first, matching the benchmark block names
impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.columns, self.rows, self.filters)
    }
}

// one row per line, each cell as `[f0, f1, ..]`
pub fn render_tensor<T: fmt::Display>(data: &[T], shape: TensorShape) -> String {
    let mut out = String::new();
    if shape.is_empty() || data.len() != shape.len() {
        return out;
    }

    for row in data.chunks_exact(shape.columns * shape.filters) {
        let cells: Vec<String> = row
            .chunks_exact(shape.filters)
            .map(|cell| {
                let values: Vec<String> = cell.iter().map(ToString::to_string).collect();
                format!("[{}]", values.join(", "))
            })
            .collect();
        out.push_str(&cells.join(" "));
        out.push('\n');
    }
    out
}
