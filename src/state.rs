use std::ops::Range;
use std::slice::{ChunksExact, ChunksExactMut};
use serde::{Deserialize, Serialize};
use crate::error::Error;




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]


/**
 * A row-major table of field values: one row per cell (or per interface),
 * `num_fields` values per row. This is the storage for the conserved state,
 * for boundary reconstructions, and for flux and source terms.
 */
pub struct StateArray {
    num_rows: usize,
    num_fields: usize,
    data: Vec<f64>,
}




// ============================================================================
impl StateArray {




    /**
     * Allocate a zero-filled array with the given number of rows and fields.
     */
    pub fn zeros(num_rows: usize, num_fields: usize) -> Self {
        Self {
            num_rows,
            num_fields,
            data: vec![0.0; num_rows * num_fields],
        }
    }




    /**
     * Wrap an existing buffer. The buffer length must be `num_rows *
     * num_fields`.
     */
    pub fn from_vec(num_rows: usize, num_fields: usize, data: Vec<f64>) -> Result<Self, Error> {
        if data.len() != num_rows * num_fields {
            return Err(Error::Contract(format!(
                "buffer of length {} cannot hold {} x {} values",
                data.len(),
                num_rows,
                num_fields
            )));
        }
        Ok(Self { num_rows, num_fields, data })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows, self.num_fields)
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.num_fields..(i + 1) * self.num_fields]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.num_fields..(i + 1) * self.num_fields]
    }

    pub fn rows(&self) -> ChunksExact<'_, f64> {
        self.data.chunks_exact(self.num_fields.max(1))
    }

    pub fn rows_mut(&mut self) -> ChunksExactMut<'_, f64> {
        self.data.chunks_exact_mut(self.num_fields.max(1))
    }

    /// The flat data of a contiguous block of rows.
    pub fn select(&self, rows: Range<usize>) -> &[f64] {
        &self.data[rows.start * self.num_fields..rows.end * self.num_fields]
    }

    pub fn select_mut(&mut self, rows: Range<usize>) -> &mut [f64] {
        &mut self.data[rows.start * self.num_fields..rows.end * self.num_fields]
    }

    /// Copy a block of rows within this array, from `src` to the rows
    /// starting at `dst`.
    pub fn copy_rows_within(&mut self, src: Range<usize>, dst: usize) {
        let n = self.num_fields;
        self.data.copy_within(src.start * n..src.end * n, dst * n)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn fill(&mut self, value: f64) {
        for x in self.data.iter_mut() {
            *x = value
        }
    }

    /// Overwrite this array with the contents of another of the same shape.
    pub fn copy_from(&mut self, other: &Self) -> Result<(), Error> {
        self.check_shape(other)?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Return an error unless the other array has the same shape as this
    /// one.
    pub fn check_shape(&self, other: &Self) -> Result<(), Error> {
        if self.shape() != other.shape() {
            Err(Error::Contract(format!(
                "array shape mismatch: {:?} vs {:?}",
                self.shape(),
                other.shape()
            )))
        } else {
            Ok(())
        }
    }

    /// Return the largest absolute difference between two arrays of equal
    /// shape.
    pub fn max_abs_difference(&self, other: &Self) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}




// ============================================================================
#[derive(Clone, Debug, PartialEq)]


/**
 * Values at a fixed number of quadrature points inside each cell: the memory
 * layout is cells × points × fields.
 */
pub struct QuadratureArray {
    num_cells: usize,
    num_points: usize,
    num_fields: usize,
    data: Vec<f64>,
}




// ============================================================================
impl QuadratureArray {

    pub fn zeros(num_cells: usize, num_points: usize, num_fields: usize) -> Self {
        Self {
            num_cells,
            num_points,
            num_fields,
            data: vec![0.0; num_cells * num_points * num_fields],
        }
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    fn offset(&self, cell: usize, point: usize) -> usize {
        (cell * self.num_points + point) * self.num_fields
    }

    pub fn point(&self, cell: usize, point: usize) -> &[f64] {
        let s = self.offset(cell, point);
        &self.data[s..s + self.num_fields]
    }

    pub fn point_mut(&mut self, cell: usize, point: usize) -> &mut [f64] {
        let s = self.offset(cell, point);
        let n = self.num_fields;
        &mut self.data[s..s + n]
    }

    /// All point values of one cell, flattened points × fields.
    pub fn cell(&self, cell: usize) -> &[f64] {
        let s = self.offset(cell, 0);
        &self.data[s..s + self.num_points * self.num_fields]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::{QuadratureArray, StateArray};

    #[test]
    fn rows_are_contiguous() {
        let mut q = StateArray::zeros(4, 2);
        q.row_mut(2).copy_from_slice(&[1.0, 2.0]);
        assert_eq!(q.row(2), &[1.0, 2.0]);
        assert_eq!(q.select(2..3), &[1.0, 2.0]);
        assert_eq!(q.rows().count(), 4);
    }

    #[test]
    fn copy_within_moves_blocks_of_rows() {
        let mut q = StateArray::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        q.copy_rows_within(2..4, 0);
        assert_eq!(q.as_slice(), &[3.0, 4.0, 3.0, 4.0]);
    }

    #[test]
    fn shape_mismatch_is_a_contract_error() {
        let mut a = StateArray::zeros(3, 2);
        let b = StateArray::zeros(2, 3);
        assert!(a.copy_from(&b).is_err());
        assert!(StateArray::from_vec(2, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn quadrature_points_are_indexed_by_cell_then_point() {
        let mut qq = QuadratureArray::zeros(2, 3, 2);
        qq.point_mut(1, 2).copy_from_slice(&[5.0, 6.0]);
        assert_eq!(qq.point(1, 2), &[5.0, 6.0]);
        assert_eq!(&qq.cell(1)[4..6], &[5.0, 6.0]);
    }
}
