//! Grid descriptors for BMI variables
//!
//! A [`Grid`] describes how a variable is discretised: its rank, the per-dimension sizes
//! and the kind of topology (see [`GridType`]). Grids are immutable once built and are
//! shared between all the variables that live on the same discretisation.
//!
//! # Examples
//!
//! ```rust
//! use bmi_nn_core::grid::{Grid, GridType};
//!
//! let scalar = Grid::scalar(0);
//! assert_eq!(scalar.rank(), 0);
//! assert_eq!(scalar.size(), 1);
//!
//! let raster = Grid::new(1, 2, GridType::UniformRectilinear, vec![3, 4]).unwrap();
//! assert_eq!(raster.size(), 12);
//!
//! // Rank and shape must agree
//! assert!(Grid::new(2, 1, GridType::UniformRectilinear, vec![3, 4]).is_err());
//! ```

use crate::errors::{BmiError, BmiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a grid, unique within a model instance
pub type GridId = u32;

/// Kinds of grid recognised by BMI
///
/// See <https://bmi.readthedocs.io/en/stable/#model-grids>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridType {
    /// A single value with no spatial extent
    Scalar,
    /// An unconnected collection of points
    Points,
    /// A one-dimensional array of values
    Vector,
    /// Unstructured mesh described by its node/edge/face connectivity
    Unstructured,
    /// Logically rectangular grid with arbitrary node coordinates
    StructuredQuadrilateral,
    /// Rectangular grid with variable spacing along each axis
    Rectilinear,
    /// Rectangular grid with constant spacing along each axis
    UniformRectilinear,
}

impl GridType {
    /// Canonical BMI name of the grid type
    pub fn as_str(&self) -> &'static str {
        match self {
            GridType::Scalar => "scalar",
            GridType::Points => "points",
            GridType::Vector => "vector",
            GridType::Unstructured => "unstructured",
            GridType::StructuredQuadrilateral => "structured_quadrilateral",
            GridType::Rectilinear => "rectilinear",
            GridType::UniformRectilinear => "uniform_rectilinear",
        }
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GridType {
    type Err = BmiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scalar" => Ok(GridType::Scalar),
            "points" => Ok(GridType::Points),
            "vector" => Ok(GridType::Vector),
            "unstructured" => Ok(GridType::Unstructured),
            "structured_quadrilateral" => Ok(GridType::StructuredQuadrilateral),
            "rectilinear" => Ok(GridType::Rectilinear),
            "uniform_rectilinear" => Ok(GridType::UniformRectilinear),
            other => Err(BmiError::Validation(format!(
                "'{}' is not a known grid type",
                other
            ))),
        }
    }
}

/// Serialised form of a [`Grid`], validated on conversion
#[derive(Debug, Deserialize)]
struct GridDefinition {
    id: GridId,
    rank: usize,
    #[serde(rename = "type")]
    grid_type: GridType,
    #[serde(default)]
    shape: Vec<usize>,
}

impl TryFrom<GridDefinition> for Grid {
    type Error = BmiError;

    fn try_from(value: GridDefinition) -> Result<Self, Self::Error> {
        Grid::new(value.id, value.rank, value.grid_type, value.shape)
    }
}

/// Discretisation of a BMI variable
///
/// Invariants enforced at construction:
/// - `rank == shape.len()`
/// - a [`GridType::Scalar`] grid has rank 0 and an empty shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridDefinition")]
pub struct Grid {
    id: GridId,
    rank: usize,
    #[serde(rename = "type")]
    grid_type: GridType,
    shape: Vec<usize>,
}

impl Grid {
    /// Create a validated grid
    ///
    /// # Errors
    ///
    /// Returns [`BmiError::Validation`] if the rank does not match the length of `shape`,
    /// or if a scalar grid is given a non-zero rank or a non-empty shape.
    pub fn new(
        id: GridId,
        rank: usize,
        grid_type: GridType,
        shape: Vec<usize>,
    ) -> BmiResult<Self> {
        if grid_type == GridType::Scalar && (rank != 0 || !shape.is_empty()) {
            return Err(BmiError::Validation(format!(
                "scalar grid {} must have rank 0 and an empty shape, got rank {} and shape {:?}",
                id, rank, shape
            )));
        }
        if rank != shape.len() {
            return Err(BmiError::Validation(format!(
                "grid {} has rank {} but shape {:?} has {} dimensions",
                id,
                rank,
                shape,
                shape.len()
            )));
        }
        Ok(Self {
            id,
            rank,
            grid_type,
            shape,
        })
    }

    /// Create a rank 0 grid holding a single value
    pub fn scalar(id: GridId) -> Self {
        Self {
            id,
            rank: 0,
            grid_type: GridType::Scalar,
            shape: vec![],
        }
    }

    pub fn id(&self) -> GridId {
        self.id
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn grid_type(&self) -> GridType {
        self.grid_type
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn is_scalar(&self) -> bool {
        self.grid_type == GridType::Scalar
    }

    /// Total number of elements on the grid
    ///
    /// The product of the shape, which is 1 for a rank 0 grid.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }
}
