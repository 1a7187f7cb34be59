//! Numeric buffers exchanged through BMI
//!
//! BMI variables are homogeneous arrays of one of a small set of element types
//! ([`ValueType`]). The buffers come in four flavours:
//!
//! - [`Value`]: an owned N-dimensional buffer; this is what a model adapter stores.
//! - [`VariableValue`]: a copy-on-write N-dimensional buffer held by a
//!   [`BmiVariable`](crate::variable::BmiVariable). It usually borrows the adapter's
//!   storage so that derived metadata always reflects the live buffer.
//! - [`ValueRef`] / [`ValueMut`]: flat, contiguous slices as returned by
//!   `get_value_ptr` and as supplied by callers to `get_value`/`set_value`.
//!
//! Flattening never copies. If a buffer is not laid out contiguously in row-major order
//! the conversion fails with [`BmiError::NonCopyableLayout`].
//!
//! ```rust
//! use bmi_nn_core::value::{Value, ValueType};
//! use ndarray::array;
//!
//! let mut value = Value::from(array![[1.0_f32, 2.0], [3.0, 4.0]]);
//! assert_eq!(value.value_type(), ValueType::Float32);
//! assert_eq!(value.nbytes(), 16);
//!
//! let flat = value.flat_mut("example").unwrap().into_slice::<f32>().unwrap();
//! flat[3] = 8.0;
//! assert_eq!(value.as_array::<f32>().unwrap()[[1, 1]], 8.0);
//! ```

use crate::errors::{BmiError, BmiResult};
use ndarray::{Array, ArrayD, ArrayView, CowArray, Dimension, IxDyn};
use num::Zero;
use std::fmt;
use std::str::FromStr;

/// Element type of a BMI variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    Int16,
    Int32,
    Int64,
    #[default]
    Float32,
    Float64,
}

impl ValueType {
    /// Size in bytes of a single element
    pub fn itemsize(&self) -> usize {
        match self {
            ValueType::Int16 => std::mem::size_of::<i16>(),
            ValueType::Int32 => std::mem::size_of::<i32>(),
            ValueType::Int64 => std::mem::size_of::<i64>(),
            ValueType::Float32 => std::mem::size_of::<f32>(),
            ValueType::Float64 => std::mem::size_of::<f64>(),
        }
    }

    /// Canonical name, matching the numpy dtype names
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int16 => "int16",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Float32 => "float32",
            ValueType::Float64 => "float64",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ValueType::Float32 | ValueType::Float64)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = BmiError;

    /// Parse a type name, accepting the aliases used by BMI and numpy.
    ///
    /// The bare `int` and `float` aliases resolve to the 32-bit types.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int16" | "short" => Ok(ValueType::Int16),
            "int" | "int32" | "integer" => Ok(ValueType::Int32),
            "int64" | "long" | "longlong" => Ok(ValueType::Int64),
            "float" | "float32" | "single" | "np.float32" | "numpy.float32" | "np.single"
            | "numpy.single" => Ok(ValueType::Float32),
            "double" | "float64" | "np.float64" | "numpy.float64" => Ok(ValueType::Float64),
            other => Err(BmiError::Validation(format!(
                "'{}' is not a supported BMI data type",
                other
            ))),
        }
    }
}

/// Owned N-dimensional buffer of one of the supported element types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
}

/// Copy-on-write N-dimensional buffer held by a variable descriptor
#[derive(Debug, Clone)]
pub enum VariableValue<'a> {
    Int16(CowArray<'a, i16, IxDyn>),
    Int32(CowArray<'a, i32, IxDyn>),
    Int64(CowArray<'a, i64, IxDyn>),
    Float32(CowArray<'a, f32, IxDyn>),
    Float64(CowArray<'a, f64, IxDyn>),
}

/// Flat, read-only view of a variable's storage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a> {
    Int16(&'a [i16]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Float32(&'a [f32]),
    Float64(&'a [f64]),
}

/// Flat, mutable view of a variable's storage
#[derive(Debug, PartialEq)]
pub enum ValueMut<'a> {
    Int16(&'a mut [i16]),
    Int32(&'a mut [i32]),
    Int64(&'a mut [i64]),
    Float32(&'a mut [f32]),
    Float64(&'a mut [f64]),
}

/// Dispatch an expression over every variant of one of the buffer enums
macro_rules! match_value {
    ($kind:ident, $value:expr, $inner:ident => $body:expr) => {
        match $value {
            $kind::Int16($inner) => $body,
            $kind::Int32($inner) => $body,
            $kind::Int64($inner) => $body,
            $kind::Float32($inner) => $body,
            $kind::Float64($inner) => $body,
        }
    };
}

/// Dispatch over a destination/source pair that must share an element type
macro_rules! match_pair {
    ($name:expr, $dest:expr, $src:expr, ($d:ident, $s:ident) => $body:expr) => {
        match ($dest, $src) {
            (ValueMut::Int16($d), ValueRef::Int16($s)) => $body,
            (ValueMut::Int32($d), ValueRef::Int32($s)) => $body,
            (ValueMut::Int64($d), ValueRef::Int64($s)) => $body,
            (ValueMut::Float32($d), ValueRef::Float32($s)) => $body,
            (ValueMut::Float64($d), ValueRef::Float64($s)) => $body,
            (dest, src) => Err(BmiError::BufferMismatch {
                name: $name.to_string(),
                expected: format!("element type {}", dest.value_type()),
                found: format!("element type {}", src.value_type()),
            }),
        }
    };
}

/// Scalar types that can back a BMI variable
pub trait Element: Copy + Zero + PartialEq + fmt::Debug + Send + Sync + 'static {
    const VALUE_TYPE: ValueType;

    fn into_value(array: ArrayD<Self>) -> Value;
    fn into_variable_value(array: CowArray<'_, Self, IxDyn>) -> VariableValue<'_>;
    fn into_value_ref(slice: &[Self]) -> ValueRef<'_>;
    fn into_value_mut(slice: &mut [Self]) -> ValueMut<'_>;
    fn array_of(value: &Value) -> Option<&ArrayD<Self>>;
    fn array_of_mut(value: &mut Value) -> Option<&mut ArrayD<Self>>;
    fn slice_of(value: ValueRef<'_>) -> Option<&[Self]>;
    fn slice_of_mut(value: ValueMut<'_>) -> Option<&mut [Self]>;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            const VALUE_TYPE: ValueType = ValueType::$variant;

            fn into_value(array: ArrayD<Self>) -> Value {
                Value::$variant(array)
            }

            fn into_variable_value(array: CowArray<'_, Self, IxDyn>) -> VariableValue<'_> {
                VariableValue::$variant(array)
            }

            fn into_value_ref(slice: &[Self]) -> ValueRef<'_> {
                ValueRef::$variant(slice)
            }

            fn into_value_mut(slice: &mut [Self]) -> ValueMut<'_> {
                ValueMut::$variant(slice)
            }

            fn array_of(value: &Value) -> Option<&ArrayD<Self>> {
                match value {
                    Value::$variant(array) => Some(array),
                    _ => None,
                }
            }

            fn array_of_mut(value: &mut Value) -> Option<&mut ArrayD<Self>> {
                match value {
                    Value::$variant(array) => Some(array),
                    _ => None,
                }
            }

            fn slice_of(value: ValueRef<'_>) -> Option<&[Self]> {
                match value {
                    ValueRef::$variant(slice) => Some(slice),
                    _ => None,
                }
            }

            fn slice_of_mut(value: ValueMut<'_>) -> Option<&mut [Self]> {
                match value {
                    ValueMut::$variant(slice) => Some(slice),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(i16, Int16);
impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);

fn length_mismatch(name: &str, expected: usize, found: usize) -> BmiError {
    BmiError::BufferMismatch {
        name: name.to_string(),
        expected: format!("{} elements", expected),
        found: format!("{} elements", found),
    }
}

fn copy_into<T: Copy>(name: &str, dest: &mut [T], src: &[T]) -> BmiResult<()> {
    if dest.len() != src.len() {
        return Err(length_mismatch(name, src.len(), dest.len()));
    }
    dest.copy_from_slice(src);
    Ok(())
}

fn check_indices(name: &str, indices: &[usize], len: usize) -> BmiResult<()> {
    match indices.iter().find(|&&i| i >= len) {
        Some(i) => Err(BmiError::BufferMismatch {
            name: name.to_string(),
            expected: format!("indices below {}", len),
            found: format!("index {}", i),
        }),
        None => Ok(()),
    }
}

fn gather<T: Copy>(name: &str, dest: &mut [T], src: &[T], indices: &[usize]) -> BmiResult<()> {
    if dest.len() != indices.len() {
        return Err(length_mismatch(name, indices.len(), dest.len()));
    }
    check_indices(name, indices, src.len())?;
    for (d, &i) in dest.iter_mut().zip(indices) {
        *d = src[i];
    }
    Ok(())
}

fn scatter<T: Copy>(name: &str, dest: &mut [T], indices: &[usize], src: &[T]) -> BmiResult<()> {
    if src.len() != indices.len() {
        return Err(length_mismatch(name, indices.len(), src.len()));
    }
    check_indices(name, indices, dest.len())?;
    for (&i, &s) in indices.iter().zip(src) {
        dest[i] = s;
    }
    Ok(())
}

impl Value {
    /// Zero-filled buffer of the given type and shape
    pub fn zeros(value_type: ValueType, shape: &[usize]) -> Self {
        let shape = IxDyn(shape);
        match value_type {
            ValueType::Int16 => Value::Int16(ArrayD::zeros(shape)),
            ValueType::Int32 => Value::Int32(ArrayD::zeros(shape)),
            ValueType::Int64 => Value::Int64(ArrayD::zeros(shape)),
            ValueType::Float32 => Value::Float32(ArrayD::zeros(shape)),
            ValueType::Float64 => Value::Float64(ArrayD::zeros(shape)),
        }
    }

    /// Rank 0 buffer holding a single value
    pub fn scalar<T: Element>(value: T) -> Self {
        T::into_value(ArrayD::from_elem(IxDyn(&[]), value))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int16(_) => ValueType::Int16,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Float32(_) => ValueType::Float32,
            Value::Float64(_) => ValueType::Float64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match_value!(Value, self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        match_value!(Value, self, a => a.ndim())
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match_value!(Value, self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn itemsize(&self) -> usize {
        self.value_type().itemsize()
    }

    pub fn nbytes(&self) -> usize {
        self.len() * self.itemsize()
    }

    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::array_of(self)
    }

    pub fn as_array_mut<T: Element>(&mut self) -> Option<&mut ArrayD<T>> {
        T::array_of_mut(self)
    }

    /// Borrow the buffer for use by a variable descriptor
    pub fn view(&self) -> VariableValue<'_> {
        match_value!(Value, self, a => CowArray::from(a.view()).into())
    }

    /// Flat view of the whole buffer without copying
    ///
    /// # Errors
    ///
    /// [`BmiError::NonCopyableLayout`] if the buffer is not contiguous in row-major order.
    pub fn flat(&self, name: &str) -> BmiResult<ValueRef<'_>> {
        match_value!(Value, self, a => a
            .as_slice()
            .map(Element::into_value_ref)
            .ok_or_else(|| BmiError::NonCopyableLayout(name.to_string())))
    }

    /// Mutable flat view of the whole buffer without copying
    ///
    /// # Errors
    ///
    /// [`BmiError::NonCopyableLayout`] if the buffer is not contiguous in row-major order.
    pub fn flat_mut(&mut self, name: &str) -> BmiResult<ValueMut<'_>> {
        match_value!(Value, self, a => a
            .as_slice_mut()
            .map(Element::into_value_mut)
            .ok_or_else(|| BmiError::NonCopyableLayout(name.to_string())))
    }
}

impl<T: Element, D: Dimension> From<Array<T, D>> for Value {
    fn from(array: Array<T, D>) -> Self {
        T::into_value(array.into_dyn())
    }
}

impl<'a> VariableValue<'a> {
    /// Zero-filled owned buffer of the given type and shape
    pub fn zeros(value_type: ValueType, shape: &[usize]) -> Self {
        let shape = IxDyn(shape);
        match value_type {
            ValueType::Int16 => VariableValue::Int16(ArrayD::zeros(shape).into()),
            ValueType::Int32 => VariableValue::Int32(ArrayD::zeros(shape).into()),
            ValueType::Int64 => VariableValue::Int64(ArrayD::zeros(shape).into()),
            ValueType::Float32 => VariableValue::Float32(ArrayD::zeros(shape).into()),
            ValueType::Float64 => VariableValue::Float64(ArrayD::zeros(shape).into()),
        }
    }

    /// Rank 0 owned buffer holding a single value
    pub fn scalar<T: Element>(value: T) -> Self {
        T::into_variable_value(CowArray::from(ArrayD::from_elem(IxDyn(&[]), value)))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            VariableValue::Int16(_) => ValueType::Int16,
            VariableValue::Int32(_) => ValueType::Int32,
            VariableValue::Int64(_) => ValueType::Int64,
            VariableValue::Float32(_) => ValueType::Float32,
            VariableValue::Float64(_) => ValueType::Float64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match_value!(VariableValue, self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        match_value!(VariableValue, self, a => a.ndim())
    }

    pub fn len(&self) -> usize {
        match_value!(VariableValue, self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn itemsize(&self) -> usize {
        self.value_type().itemsize()
    }

    pub fn nbytes(&self) -> usize {
        self.len() * self.itemsize()
    }

    /// True if the buffer borrows storage owned elsewhere
    pub fn is_view(&self) -> bool {
        match_value!(VariableValue, self, a => a.is_view())
    }

    /// Flat view of the whole buffer without copying
    pub fn flat(&self, name: &str) -> BmiResult<ValueRef<'_>> {
        match_value!(VariableValue, self, a => a
            .as_slice()
            .map(Element::into_value_ref)
            .ok_or_else(|| BmiError::NonCopyableLayout(name.to_string())))
    }

    /// Detach the buffer from any borrowed storage
    pub fn into_owned(self) -> Value {
        match_value!(VariableValue, self, a => a.into_owned().into())
    }
}

impl<'a, T: Element, D: Dimension> From<Array<T, D>> for VariableValue<'a> {
    fn from(array: Array<T, D>) -> Self {
        T::into_variable_value(CowArray::from(array.into_dyn()))
    }
}

impl<'a, T: Element, D: Dimension> From<ArrayView<'a, T, D>> for VariableValue<'a> {
    fn from(view: ArrayView<'a, T, D>) -> Self {
        T::into_variable_value(CowArray::from(view.into_dyn()))
    }
}

impl<'a, T: Element> From<CowArray<'a, T, IxDyn>> for VariableValue<'a> {
    fn from(array: CowArray<'a, T, IxDyn>) -> Self {
        T::into_variable_value(array)
    }
}

impl<'a> From<Value> for VariableValue<'a> {
    fn from(value: Value) -> Self {
        match_value!(Value, value, a => a.into())
    }
}

impl<'a> ValueRef<'a> {
    pub fn value_type(&self) -> ValueType {
        match self {
            ValueRef::Int16(_) => ValueType::Int16,
            ValueRef::Int32(_) => ValueType::Int32,
            ValueRef::Int64(_) => ValueType::Int64,
            ValueRef::Float32(_) => ValueType::Float32,
            ValueRef::Float64(_) => ValueType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match_value!(ValueRef, self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn itemsize(&self) -> usize {
        self.value_type().itemsize()
    }

    pub fn nbytes(&self) -> usize {
        self.len() * self.itemsize()
    }

    /// The underlying slice, if the element type is `T`
    pub fn as_slice<T: Element>(self) -> Option<&'a [T]> {
        T::slice_of(self)
    }

    /// Copy into a new one-dimensional buffer
    pub fn to_value(&self) -> Value {
        match_value!(ValueRef, self, s => Array::from(s.to_vec()).into())
    }
}

impl<'a, T: Element> From<&'a [T]> for ValueRef<'a> {
    fn from(slice: &'a [T]) -> Self {
        T::into_value_ref(slice)
    }
}

impl<'a, T: Element> From<&'a Vec<T>> for ValueRef<'a> {
    fn from(vec: &'a Vec<T>) -> Self {
        T::into_value_ref(vec.as_slice())
    }
}

impl<'a> ValueMut<'a> {
    pub fn value_type(&self) -> ValueType {
        match self {
            ValueMut::Int16(_) => ValueType::Int16,
            ValueMut::Int32(_) => ValueType::Int32,
            ValueMut::Int64(_) => ValueType::Int64,
            ValueMut::Float32(_) => ValueType::Float32,
            ValueMut::Float64(_) => ValueType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match_value!(ValueMut, self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn itemsize(&self) -> usize {
        self.value_type().itemsize()
    }

    pub fn nbytes(&self) -> usize {
        self.len() * self.itemsize()
    }

    /// The underlying slice, if the element type is `T`
    pub fn into_slice<T: Element>(self) -> Option<&'a mut [T]> {
        T::slice_of_mut(self)
    }

    /// Reborrow as a read-only view
    pub fn as_value_ref(&self) -> ValueRef<'_> {
        match_value!(ValueMut, self, s => Element::into_value_ref(&**s))
    }

    /// Overwrite every element with the matching element of `src`
    ///
    /// Element types and lengths must agree.
    pub fn copy_from(&mut self, name: &str, src: ValueRef<'_>) -> BmiResult<()> {
        match_pair!(name, self, src, (d, s) => copy_into(name, d, s))
    }

    /// Fill this buffer with `src[indices[i]]`
    pub fn gather_from(
        &mut self,
        name: &str,
        src: ValueRef<'_>,
        indices: &[usize],
    ) -> BmiResult<()> {
        match_pair!(name, self, src, (d, s) => gather(name, d, s, indices))
    }

    /// Write `src[i]` to `self[indices[i]]`
    pub fn scatter_from(
        &mut self,
        name: &str,
        indices: &[usize],
        src: ValueRef<'_>,
    ) -> BmiResult<()> {
        match_pair!(name, self, src, (d, s) => scatter(name, d, indices, s))
    }
}

impl<'a, T: Element> From<&'a mut [T]> for ValueMut<'a> {
    fn from(slice: &'a mut [T]) -> Self {
        T::into_value_mut(slice)
    }
}

impl<'a, T: Element> From<&'a mut Vec<T>> for ValueMut<'a> {
    fn from(vec: &'a mut Vec<T>) -> Self {
        T::into_value_mut(vec.as_mut_slice())
    }
}
