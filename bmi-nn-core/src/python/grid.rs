use crate::grid::{Grid, GridId, GridType};
use pyo3::prelude::*;
use std::sync::Arc;

/// Python wrapper for a BMI grid
///
/// Grids are immutable and shared, so cloning the wrapper shares the same grid.
#[pyclass(name = "Grid", module = "bmi_nn.core")]
#[derive(Debug, Clone)]
pub struct PyGrid(pub Arc<Grid>);

#[pymethods]
impl PyGrid {
    #[new]
    #[pyo3(signature = (id, rank, grid_type, shape=None))]
    fn new(id: GridId, rank: usize, grid_type: &str, shape: Option<Vec<usize>>) -> PyResult<Self> {
        let grid_type: GridType = grid_type.parse()?;
        let grid = Grid::new(id, rank, grid_type, shape.unwrap_or_default())?;
        Ok(Self(Arc::new(grid)))
    }

    #[staticmethod]
    fn scalar(id: GridId) -> Self {
        Self(Arc::new(Grid::scalar(id)))
    }

    #[getter]
    fn id(&self) -> GridId {
        self.0.id()
    }

    #[getter]
    fn rank(&self) -> usize {
        self.0.rank()
    }

    #[getter]
    fn grid_type(&self) -> &'static str {
        self.0.grid_type().as_str()
    }

    #[getter]
    fn shape(&self) -> Vec<usize> {
        self.0.shape().to_vec()
    }

    fn size(&self) -> usize {
        self.0.size()
    }

    fn __eq__(&self, other: &PyGrid) -> bool {
        self.0 == other.0
    }

    fn __repr__(&self) -> String {
        format!(
            "Grid(id={}, rank={}, grid_type='{}', shape={:?})",
            self.0.id(),
            self.0.rank(),
            self.0.grid_type(),
            self.0.shape()
        )
    }
}
