use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Matrix<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn with_columns(cols: usize) -> Self {
        Self {
            rows: 0,
            cols,
            data: Vec::new(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col)
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(row < self.rows && col < self.cols, "matrix index out of range");
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn column(&self, col: usize) -> Vec<T> {
        (0..self.rows)
            .map(|row| self.data[row * self.cols + col].clone())
            .collect()
    }

    pub fn push_row(&mut self, row: Vec<T>) {
        assert_eq!(row.len(), self.cols, "row length must match column count");
        self.data.extend(row);
        self.rows += 1;
    }

    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut selected = Self::with_columns(self.cols);
        for &row in rows {
            selected.push_row(self.row(row).to_vec());
        }
        selected
    }

    pub fn select_columns(&self, cols: &[usize]) -> Self {
        let mut data = Vec::with_capacity(self.rows * cols.len());
        for row in 0..self.rows {
            for &col in cols {
                data.push(self.data[row * self.cols + col].clone());
            }
        }
        Self {
            rows: self.rows,
            cols: cols.len(),
            data,
        }
    }
}

impl Matrix<f64> {
    pub fn same_values(&self, other: &Matrix<f64>) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}
