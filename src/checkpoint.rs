//! Saving and loading named parameter tensors as JSON.
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "tensors": {
//!     "fc1.weight": { "dtype": "float32", "shape": [8, 1], "data": [...] },
//!     ...
//!   }
//! }
//! ```
//!
//! JSON has no non-finite numbers, so NaN and infinities are stored as the strings
//! `"NaN"`, `"inf"` and `"-inf"`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use num::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{Result, TensorError};
use crate::nn::Module;
use crate::tensor::{cast, DType, Numeric, RcTensor};

pub const FORMAT_VERSION: u32 = 1;

/// Parameters keyed by their dotted names, in sorted order.
pub type StateDict<T> = BTreeMap<String, RcTensor<T>>;

// `data` stays untyped on both sides: non-finite floats are written as strings, and
// a dtype mismatch is reported as such rather than as a JSON parse failure.
#[derive(Serialize, Deserialize)]
struct TensorRecord {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<Value>,
}

#[derive(Serialize, Deserialize)]
struct Checkpoint {
    format_version: u32,
    tensors: BTreeMap<String, TensorRecord>,
}

fn encode<T: Numeric>(value: T) -> Result<Value> {
    match value.to_f64() {
        Some(v) if v.is_nan() => Ok(Value::from("NaN")),
        Some(v) if v.is_infinite() => Ok(Value::from(if v > 0.0 { "inf" } else { "-inf" })),
        _ => Ok(serde_json::to_value(value)?),
    }
}

fn decode<T: Numeric>(value: Value) -> Result<T> {
    match value.as_str() {
        Some("NaN") => cast(f64::NAN),
        Some("inf") => cast(f64::INFINITY),
        Some("-inf") => cast(f64::NEG_INFINITY),
        _ => Ok(serde_json::from_value(value)?),
    }
}

pub fn to_writer<T: Numeric, W: Write>(state_dict: &StateDict<T>, writer: W) -> Result<()> {
    let checkpoint = Checkpoint {
        format_version: FORMAT_VERSION,
        tensors: state_dict
            .iter()
            .map(|(name, tensor)| -> Result<(String, TensorRecord)> {
                let record = TensorRecord {
                    dtype: T::DTYPE,
                    shape: tensor.shape().to_vec(),
                    data: tensor.to_vec().into_iter().map(encode).collect::<Result<_>>()?,
                };
                Ok((name.clone(), record))
            })
            .collect::<Result<_>>()?,
    };
    serde_json::to_writer(writer, &checkpoint)?;
    Ok(())
}

pub fn from_str<T: Numeric>(contents: &str) -> Result<StateDict<T>> {
    let raw: Checkpoint = serde_json::from_str(contents)?;
    from_raw(raw)
}

fn from_raw<T: Numeric>(raw: Checkpoint) -> Result<StateDict<T>> {
    if raw.format_version != FORMAT_VERSION {
        return Err(TensorError::FormatVersion(raw.format_version));
    }
    raw.tensors
        .into_iter()
        .map(|(name, record)| {
            if record.dtype != T::DTYPE {
                return Err(TensorError::DTypeMismatch {
                    expected: T::DTYPE,
                    got: record.dtype,
                });
            }
            let data = record
                .data
                .into_iter()
                .map(decode)
                .collect::<Result<Vec<T>>>()?;
            let tensor = RcTensor::from_vec(data, record.shape)?;
            Ok((name, tensor))
        })
        .collect()
}

/// Writes `state_dict` to `path`, replacing any existing file.
pub fn save<T: Numeric>(state_dict: &StateDict<T>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    to_writer(state_dict, &mut writer)?;
    writer.flush()?;
    info!(path = %path.display(), tensors = state_dict.len(), "saved checkpoint");
    Ok(())
}

pub fn load<T: Numeric>(path: impl AsRef<Path>) -> Result<StateDict<T>> {
    let path = path.as_ref();
    let raw: Checkpoint = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let state_dict = from_raw(raw)?;
    info!(path = %path.display(), tensors = state_dict.len(), "loaded checkpoint");
    Ok(state_dict)
}

pub fn save_module<T: Numeric, M: Module<T> + ?Sized>(
    module: &M,
    path: impl AsRef<Path>,
) -> Result<()> {
    save(&module.state_dict(), path)
}

/// Loads `path` into the existing parameters of `module` (strict).
pub fn load_module<T: Numeric, M: Module<T> + ?Sized>(
    module: &M,
    path: impl AsRef<Path>,
) -> Result<()> {
    module.load_state_dict(&load(path)?)
}
