//! Arrow utility functions for extracting survey codes from columns
//!
//! The two source encodings store the same codebook field with different
//! physical types (Parquet keeps integers, the delimited export is inferred
//! per column and may yield floats or strings). These helpers read any of
//! them as an optional `f64` code.

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int8Array, Int16Array, Int32Array,
    Int64Array, LargeStringArray, StringArray, UInt8Array, UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;

/// Extract a numeric code from an Arrow array at the specified index, handling nulls
///
/// Strings are parsed after trimming; unparsable text and NaN count as missing.
///
/// # Returns
/// `Some(f64)` if the value exists and is a number, otherwise `None`
#[must_use]
pub fn arrow_array_to_f64(array: &ArrayRef, index: usize) -> Option<f64> {
    if index >= array.len() || array.is_null(index) {
        return None;
    }

    let value = match array.data_type() {
        DataType::Int8 => f64::from(array.as_any().downcast_ref::<Int8Array>()?.value(index)),
        DataType::Int16 => f64::from(array.as_any().downcast_ref::<Int16Array>()?.value(index)),
        DataType::Int32 => f64::from(array.as_any().downcast_ref::<Int32Array>()?.value(index)),
        DataType::Int64 => array.as_any().downcast_ref::<Int64Array>()?.value(index) as f64,
        DataType::UInt8 => f64::from(array.as_any().downcast_ref::<UInt8Array>()?.value(index)),
        DataType::UInt16 => f64::from(array.as_any().downcast_ref::<UInt16Array>()?.value(index)),
        DataType::UInt32 => f64::from(array.as_any().downcast_ref::<UInt32Array>()?.value(index)),
        DataType::UInt64 => array.as_any().downcast_ref::<UInt64Array>()?.value(index) as f64,
        DataType::Float32 => f64::from(array.as_any().downcast_ref::<Float32Array>()?.value(index)),
        DataType::Float64 => array.as_any().downcast_ref::<Float64Array>()?.value(index),
        DataType::Boolean => {
            if array.as_any().downcast_ref::<BooleanArray>()?.value(index) {
                1.0
            } else {
                0.0
            }
        }
        DataType::Utf8 | DataType::LargeUtf8 => {
            arrow_array_to_string(array, index)?.trim().parse::<f64>().ok()?
        }
        _ => return None,
    };

    value.is_finite().then_some(value)
}

/// Extract a string value from an Arrow array at the specified index, handling nulls
///
/// Numeric identifiers are rendered without a trailing `.0`.
#[must_use]
pub fn arrow_array_to_string(array: &ArrayRef, index: usize) -> Option<String> {
    if index >= array.len() || array.is_null(index) {
        return None;
    }

    match array.data_type() {
        DataType::Utf8 => {
            let string_array = array.as_any().downcast_ref::<StringArray>()?;
            Some(string_array.value(index).to_string())
        }
        DataType::LargeUtf8 => {
            let string_array = array.as_any().downcast_ref::<LargeStringArray>()?;
            Some(string_array.value(index).to_string())
        }
        _ => {
            let value = arrow_array_to_f64(array, index)?;
            if value.fract() == 0.0 && value.abs() < 1e15 {
                Some(format!("{}", value as i64))
            } else {
                Some(value.to_string())
            }
        }
    }
}
