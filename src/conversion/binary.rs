//! Numeric arrays stored as raw binary files

use crate::{Result, TreeConfigError};
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Element type of a binary array file. Elements use native byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayDtype {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    #[default]
    F64,
}

impl ArrayDtype {
    /// Size of one element in bytes
    pub fn size(self) -> usize {
        match self {
            ArrayDtype::I8 | ArrayDtype::U8 => 1,
            ArrayDtype::I16 | ArrayDtype::U16 => 2,
            ArrayDtype::I32 | ArrayDtype::U32 | ArrayDtype::F32 => 4,
            ArrayDtype::I64 | ArrayDtype::U64 | ArrayDtype::F64 => 8,
        }
    }
}

impl FromStr for ArrayDtype {
    type Err = TreeConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int8" | "i8" => Ok(ArrayDtype::I8),
            "int16" | "i16" => Ok(ArrayDtype::I16),
            "int32" | "i32" => Ok(ArrayDtype::I32),
            "int64" | "i64" | "int" => Ok(ArrayDtype::I64),
            "uint8" | "u8" => Ok(ArrayDtype::U8),
            "uint16" | "u16" => Ok(ArrayDtype::U16),
            "uint32" | "u32" => Ok(ArrayDtype::U32),
            "uint64" | "u64" => Ok(ArrayDtype::U64),
            "float32" | "f32" => Ok(ArrayDtype::F32),
            "float64" | "f64" | "float" => Ok(ArrayDtype::F64),
            _ => Err(TreeConfigError::InvalidValue {
                conversion: "np_fromfile",
                value: s.to_string(),
                reason: "unknown element type".to_string(),
            }),
        }
    }
}

/// Decoded contents of a binary array file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NumericArray {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl NumericArray {
    pub fn len(&self) -> usize {
        match self {
            NumericArray::I8(values) => values.len(),
            NumericArray::I16(values) => values.len(),
            NumericArray::I32(values) => values.len(),
            NumericArray::I64(values) => values.len(),
            NumericArray::U8(values) => values.len(),
            NumericArray::U16(values) => values.len(),
            NumericArray::U32(values) => values.len(),
            NumericArray::U64(values) => values.len(),
            NumericArray::F32(values) => values.len(),
            NumericArray::F64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> ArrayDtype {
        match self {
            NumericArray::I8(_) => ArrayDtype::I8,
            NumericArray::I16(_) => ArrayDtype::I16,
            NumericArray::I32(_) => ArrayDtype::I32,
            NumericArray::I64(_) => ArrayDtype::I64,
            NumericArray::U8(_) => ArrayDtype::U8,
            NumericArray::U16(_) => ArrayDtype::U16,
            NumericArray::U32(_) => ArrayDtype::U32,
            NumericArray::U64(_) => ArrayDtype::U64,
            NumericArray::F32(_) => ArrayDtype::F32,
            NumericArray::F64(_) => ArrayDtype::F64,
        }
    }
}

macro_rules! decode {
    ($bytes:expr, $ty:ty, $variant:ident) => {
        NumericArray::$variant(
            $bytes
                .chunks_exact(std::mem::size_of::<$ty>())
                .map(|chunk| {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(chunk);
                    <$ty>::from_ne_bytes(buf)
                })
                .collect(),
        )
    };
}

/// Reads `path` as an array of `dtype` elements.
///
/// `offset` bytes are skipped first. At most `count` elements are decoded
/// (all of them when `None`); a trailing partial element is ignored.
pub fn read_array(
    path: &Path,
    dtype: ArrayDtype,
    count: Option<usize>,
    offset: u64,
) -> Result<NumericArray> {
    let data = std::fs::read(path)?;
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let available = (data.len() - start) / dtype.size();
    let elements = count.map_or(available, |count| count.min(available));
    let bytes = &data[start..start + elements * dtype.size()];

    debug!(path = %path.display(), ?dtype, elements, "Decoding binary array");

    Ok(match dtype {
        ArrayDtype::I8 => decode!(bytes, i8, I8),
        ArrayDtype::I16 => decode!(bytes, i16, I16),
        ArrayDtype::I32 => decode!(bytes, i32, I32),
        ArrayDtype::I64 => decode!(bytes, i64, I64),
        ArrayDtype::U8 => decode!(bytes, u8, U8),
        ArrayDtype::U16 => decode!(bytes, u16, U16),
        ArrayDtype::U32 => decode!(bytes, u32, U32),
        ArrayDtype::U64 => decode!(bytes, u64, U64),
        ArrayDtype::F32 => decode!(bytes, f32, F32),
        ArrayDtype::F64 => decode!(bytes, f64, F64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_f64s(values: &[f64]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for value in values {
            file.write_all(&value.to_ne_bytes()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_whole_file() {
        let file = write_f64s(&[1.0, 2.5, -3.0]);
        let array = read_array(file.path(), ArrayDtype::F64, None, 0).unwrap();
        assert_eq!(array, NumericArray::F64(vec![1.0, 2.5, -3.0]));
    }

    #[test]
    fn test_count_and_offset() {
        let file = write_f64s(&[1.0, 2.0, 3.0, 4.0]);
        let array = read_array(file.path(), ArrayDtype::F64, Some(2), 8).unwrap();
        assert_eq!(array, NumericArray::F64(vec![2.0, 3.0]));

        let past_end = read_array(file.path(), ArrayDtype::F64, None, 64).unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_integer_dtype_ignores_partial_element() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&7i32.to_ne_bytes()).unwrap();
        file.write_all(&[0xff, 0xff]).unwrap();
        file.flush().unwrap();

        let array = read_array(file.path(), ArrayDtype::I32, None, 0).unwrap();
        assert_eq!(array, NumericArray::I32(vec![7]));
        assert_eq!(array.dtype(), ArrayDtype::I32);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_array(Path::new("/nonexistent/array.bin"), ArrayDtype::F64, None, 0);
        assert!(matches!(result, Err(TreeConfigError::Io(_))));
    }

    #[test]
    fn test_dtype_names() {
        assert_eq!("float32".parse::<ArrayDtype>().unwrap(), ArrayDtype::F32);
        assert_eq!("INT16".parse::<ArrayDtype>().unwrap(), ArrayDtype::I16);
        assert!("complex128".parse::<ArrayDtype>().is_err());
    }
}
