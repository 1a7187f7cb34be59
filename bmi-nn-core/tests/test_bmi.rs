use bmi_nn_core::bmi::{Bmi, ModelState};
use bmi_nn_core::errors::{BmiError, BmiResult};
use bmi_nn_core::grid::{Grid, GridId, GridType};
use bmi_nn_core::value::{Value, ValueMut, ValueRef, ValueType};
use bmi_nn_core::variable::BmiVariable;
use is_close::is_close;
use ndarray::{array, Array2};
use std::sync::Arc;

/// Model holding a single 2x2 field on a uniform rectilinear grid
struct FieldModel {
    state: ModelState,
    grid: Arc<Grid>,
    field: Value,
    names: Vec<String>,
}

impl FieldModel {
    fn new() -> Self {
        Self {
            state: ModelState::Uninitialized,
            grid: Arc::new(Grid::new(1, 2, GridType::UniformRectilinear, vec![2, 2]).unwrap()),
            field: Value::from(array![[1.0_f64, 2.0], [3.0, 4.0]]),
            names: vec!["temperature".to_string()],
        }
    }

    fn check_name(&self, name: &str) -> BmiResult<()> {
        if self.names.iter().any(|n| n == name) {
            Ok(())
        } else {
            Err(BmiError::UnknownVariable(name.to_string()))
        }
    }

    fn variable(&self, name: &str) -> BmiResult<BmiVariable<'_>> {
        self.check_name(name)?;
        BmiVariable::builder(name)
            .grid(self.grid.clone())
            .units("K")
            .value(self.field.view())
            .build()
    }
}

impl Bmi for FieldModel {
    fn initialize(&mut self, _config_file: &str) -> BmiResult<()> {
        self.state.require(ModelState::Uninitialized)?;
        self.state = ModelState::Initialized;
        Ok(())
    }

    fn update(&mut self) -> BmiResult<()> {
        self.state.require(ModelState::Initialized)?;
        if let Some(field) = self.field.as_array_mut::<f64>() {
            field.mapv_inplace(|v| v + 1.0);
        }
        Ok(())
    }

    fn finalize(&mut self) -> BmiResult<()> {
        self.state = ModelState::Finalized;
        Ok(())
    }

    fn get_input_var_names(&self) -> BmiResult<&[String]> {
        Ok(&self.names)
    }

    fn get_var_grid(&self, name: &str) -> BmiResult<GridId> {
        self.check_name(name)?;
        Ok(self.grid.id())
    }

    fn get_value_ptr(&self, name: &str) -> BmiResult<ValueRef<'_>> {
        self.check_name(name)?;
        self.field.flat(name)
    }

    fn get_value_ptr_mut(&mut self, name: &str) -> BmiResult<ValueMut<'_>> {
        self.check_name(name)?;
        self.field.flat_mut(name)
    }

    fn get_grid_rank(&self, grid: GridId) -> BmiResult<usize> {
        if grid != self.grid.id() {
            return Err(BmiError::UnknownGrid(grid));
        }
        Ok(self.grid.rank())
    }

    fn get_grid_shape(&self, grid: GridId, shape: &mut [usize]) -> BmiResult<()> {
        if grid != self.grid.id() {
            return Err(BmiError::UnknownGrid(grid));
        }
        shape.copy_from_slice(self.grid.shape());
        Ok(())
    }
}

#[test]
fn scalar_variable_on_scalar_grid() {
    let grid = Arc::new(Grid::new(0, 0, GridType::Scalar, vec![]).unwrap());
    let variable = BmiVariable::builder("precipitation")
        .grid(grid)
        .value(Value::scalar(0.0_f32))
        .build()
        .unwrap();

    assert_eq!(variable.value_type(), ValueType::default());
    assert_eq!(variable.itemsize(), ValueType::Float32.itemsize());
    assert_eq!(variable.nbytes(), variable.itemsize());
    assert_eq!(variable.rank(), 0);
}

#[test]
fn flat_pointer_aliases_two_by_two_storage() {
    let mut model = FieldModel::new();
    model.initialize("").unwrap();

    let storage_ptr = model.field.as_array::<f64>().unwrap().as_ptr();
    let flat = model
        .get_value_ptr("temperature")
        .unwrap()
        .as_slice::<f64>()
        .unwrap();
    assert_eq!(flat.len(), 4);
    assert_eq!(flat.as_ptr(), storage_ptr);
    assert_eq!(flat, &[1.0, 2.0, 3.0, 4.0]);

    {
        let flat = model
            .get_value_ptr_mut("temperature")
            .unwrap()
            .into_slice::<f64>()
            .unwrap();
        flat[1] = 20.0;
        flat[2] = 30.0;
    }
    let field = model.field.as_array::<f64>().unwrap();
    assert_eq!(field[[0, 1]], 20.0);
    assert_eq!(field[[1, 0]], 30.0);

    // Model updates are visible through a fresh pointer
    model.update().unwrap();
    let flat = model
        .get_value_ptr("temperature")
        .unwrap()
        .as_slice::<f64>()
        .unwrap();
    assert!(is_close!(flat[1], 21.0));
}

#[test]
fn descriptor_tracks_live_buffer() {
    let mut model = FieldModel::new();
    model.initialize("").unwrap();
    model.update().unwrap();

    let variable = model.variable("temperature").unwrap();
    assert!(variable.value().is_view());
    assert_eq!(variable.rank(), 2);
    assert_eq!(variable.nbytes(), 32);
    assert_eq!(variable.units(), "K");

    let flat = variable.value().flat("temperature").unwrap();
    assert_eq!(flat.as_slice::<f64>().unwrap(), &[2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn non_contiguous_storage_cannot_be_flattened() {
    let mut model = FieldModel::new();
    // Transposed storage is column-major
    model.field = Value::from(Array2::<f64>::zeros((2, 2)).reversed_axes());
    let err = model.get_value_ptr("temperature").unwrap_err();
    assert_eq!(err, BmiError::NonCopyableLayout("temperature".to_string()));

    // The derived defaults surface the same error
    assert!(matches!(
        model.get_var_nbytes("temperature"),
        Err(BmiError::NonCopyableLayout(_))
    ));
}

#[test]
fn unknown_variable_is_reported_before_anything_else() {
    let mut model = FieldModel::new();
    for result in [
        model.get_var_grid("unknown_var").map(|_| ()),
        model.get_var_type("unknown_var").map(|_| ()),
        model.get_value_ptr("unknown_var").map(|_| ()),
        model.variable("unknown_var").map(|_| ()),
    ] {
        assert!(result.unwrap_err().is_unknown_variable());
    }
    assert!(model
        .get_value_ptr_mut("unknown_var")
        .unwrap_err()
        .is_unknown_variable());
}

#[test]
fn capability_probing() {
    let model = FieldModel::new();
    let mut shape = [0_usize; 2];

    model.get_grid_shape(1, &mut shape).unwrap();
    assert_eq!(shape, [2, 2]);
    assert_eq!(model.get_grid_rank(1).unwrap(), 2);
    assert_eq!(model.get_grid_rank(9).unwrap_err(), BmiError::UnknownGrid(9));

    // Capabilities the model did not provide
    let mut spacing = [0.0_f64; 2];
    assert!(model.get_grid_spacing(1, &mut spacing).unwrap_err().is_not_implemented());
    assert!(model.get_grid_size(1).unwrap_err().is_not_implemented());
    assert!(model.get_output_var_names().unwrap_err().is_not_implemented());
    assert_eq!(model.get_input_var_names().unwrap(), &["temperature".to_string()]);
}

#[test]
fn finalize_is_repeatable() {
    let mut model = FieldModel::new();
    model.finalize().unwrap();
    model.finalize().unwrap();
    assert!(matches!(model.update(), Err(BmiError::InvalidState { .. })));
}
