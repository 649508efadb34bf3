use serde::Serialize;

/// `(height, width)`
pub type Shape2 = (usize, usize);

/// Row-major single-channel image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    data: Vec<f64>,
    width: usize,
    height: usize,
}
impl Image {
    pub fn new(data: Vec<f64>, shape: Shape2) -> Option<Self> {
        let (height, width) = shape;
        if data.len() != height * width {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    pub fn zeros(shape: Shape2) -> Self {
        let (height, width) = shape;
        Self {
            data: vec![0.; height * width],
            width,
            height,
        }
    }

    pub fn from_fn(shape: Shape2, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let (height, width) = shape;
        let mut data = Vec::with_capacity(height * width);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Returns `None` if the rows are ragged.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Option<Self> {
        let width = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(width * rows.len());
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return None;
            }
            data.extend_from_slice(row);
        }
        Self::new(data, (rows.len(), width))
    }

    pub fn from_gray8(pixels: &[u8], shape: Shape2) -> Option<Self> {
        Self::new(pixels.iter().copied().map(f64::from).collect(), shape)
    }

    /// The 8×8 pattern substituted when no input image is supplied: a
    /// bright centre square crossed by mid-gray bars, with four bright
    /// corner dots.
    pub fn sample() -> Self {
        Self::from_fn((8, 8), |row, col| {
            let bar = |x: usize, from: usize, to: usize| (from..to).contains(&x);
            if (bar(row, 3, 5) && bar(col, 1, 7)) || (bar(row, 1, 7) && bar(col, 3, 5)) {
                return 128.;
            }
            if bar(row, 2, 6) && bar(col, 2, 6) {
                return 255.;
            }
            if matches!((row, col), (1, 1) | (1, 6) | (6, 1) | (6, 6)) {
                return 255.;
            }
            0.
        })
    }

    pub fn shape(&self) -> Shape2 {
        (self.height, self.width)
    }
    pub fn height(&self) -> usize {
        self.height
    }
    pub fn width(&self) -> usize {
        self.width
    }
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if self.height <= row || self.width <= col {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if self.height <= row {
            return None;
        }
        let start = row * self.width;
        Some(&self.data[start..start + self.width])
    }

    /// Cells of the `window` sized block at `origin`, row by row.
    ///
    /// `None` if the block leaves the image.
    pub fn window(&self, origin: Shape2, window: Shape2) -> Option<impl Iterator<Item = f64> + '_> {
        let (row, col) = origin;
        let (h, w) = window;
        if self.height < row + h || self.width < col + w {
            return None;
        }
        Some(
            (row..row + h)
                .flat_map(move |r| self.data[r * self.width + col..r * self.width + col + w].iter())
                .copied(),
        )
    }

    /// Shape after `padding` cells on every edge, or `None` if the shape or
    /// its cell count overflows.
    pub fn padded_shape(&self, padding: usize) -> Option<Shape2> {
        let border = padding.checked_mul(2)?;
        let height = self.height.checked_add(border)?;
        let width = self.width.checked_add(border)?;
        height.checked_mul(width)?;
        Some((height, width))
    }

    /// Surrounds the image by `padding` zero cells on every edge.
    ///
    /// `None` if the padded shape overflows.
    pub fn pad(&self, padding: usize) -> Option<Self> {
        if padding == 0 {
            return Some(self.clone());
        }
        let shape = self.padded_shape(padding)?;
        Some(Self::from_fn(shape, |row, col| {
            if row < padding || col < padding {
                return 0.;
            }
            self.get(row - padding, col - padding).unwrap_or(0.)
        }))
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self {
            data: self.data.iter().map(|x| x * factor).collect(),
            width: self.width,
            height: self.height,
        }
    }

    pub fn max(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::max)
    }
}
