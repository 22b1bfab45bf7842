//! Conversion between payloads and the columnar wire record.
//!
//! A wire record is an Arrow record batch with exactly one row. Each column
//! is named after an array and holds a struct:
//!
//! ```text
//! <name>: Struct<data: List<Float64>, shape: List<Int64>>
//! ```
//!
//! On the network the batch travels as an Arrow IPC stream.

use crate::payload::{shape_product, NamedArray, Payload};
use crate::{Result, TransportError};
use arrow_array::cast::AsArray;
use arrow_array::types::{ArrowPrimitiveType, Float64Type, Int64Type};
use arrow_array::{
    Array, ArrayRef, ListArray, RecordBatch, RecordBatchOptions, StructArray,
};
use arrow_ipc::reader::StreamReader;
use arrow_ipc::writer::StreamWriter;
use arrow_schema::{Field, Fields, Schema};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Struct field holding the flattened values.
pub const DATA_FIELD: &str = "data";
/// Struct field holding the dimensions.
pub const SHAPE_FIELD: &str = "shape";

/// The columnar record exchanged between client and server.
///
/// Cloning is cheap: Arrow buffers are reference counted and immutable.
#[derive(Debug, Clone)]
pub struct WireRecord {
    batch: RecordBatch,
}

impl WireRecord {
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    /// Column names, one per array.
    pub fn names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Serialize as an Arrow IPC stream.
    pub fn to_ipc_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buffer, self.batch.schema().as_ref())?;
            writer.write(&self.batch)?;
            writer.finish()?;
        }
        Ok(buffer)
    }

    /// Parse an Arrow IPC stream holding exactly one record batch.
    ///
    /// Only the IPC framing is checked here; array contents are validated by
    /// [`ArrayCodec::decode`].
    pub fn from_ipc_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
        let mut batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

        match batches.len() {
            1 => Ok(Self::from_batch(batches.remove(0))),
            0 => Err(TransportError::wire_format(
                "IPC stream contains no record batch",
            )),
            n => Err(TransportError::wire_format(format!(
                "IPC stream contains {} record batches, expected 1",
                n
            ))),
        }
    }
}

/// Encoder/decoder between [`Payload`] and [`WireRecord`].
pub struct ArrayCodec;

impl ArrayCodec {
    /// Encode every array of the payload as one struct column.
    pub fn encode(payload: &Payload) -> Result<WireRecord> {
        let mut fields = Vec::with_capacity(payload.len());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(payload.len());

        for array in payload.iter() {
            let column = encode_array(array)?;
            fields.push(Field::new(array.name(), column.data_type().clone(), false));
            columns.push(Arc::new(column));
        }

        let schema = Arc::new(Schema::new(fields));
        let options = RecordBatchOptions::new().with_row_count(Some(1));
        let batch = RecordBatch::try_new_with_options(schema, columns, &options)?;

        debug!("Encoded {} arrays into wire record", payload.len());
        Ok(WireRecord::from_batch(batch))
    }

    /// Decode a wire record, validating every shape before reshaping.
    pub fn decode(record: &WireRecord) -> Result<Payload> {
        let batch = record.batch();
        if batch.num_columns() == 0 {
            return Ok(Payload::new());
        }
        if batch.num_rows() != 1 {
            return Err(TransportError::wire_format(format!(
                "Wire record has {} rows, expected 1",
                batch.num_rows()
            )));
        }

        let schema = batch.schema();
        let mut payload = Payload::new();
        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            let array = decode_column(field.name(), column.as_ref())?;
            debug!("Decoded array '{}' with shape {:?}", array.name(), array.shape());
            if payload.insert(array).is_some() {
                return Err(TransportError::wire_format(format!(
                    "Duplicate array name: {}",
                    field.name()
                )));
            }
        }

        Ok(payload)
    }
}

fn encode_array(array: &NamedArray) -> Result<StructArray> {
    let shape = array
        .shape()
        .iter()
        .map(|&d| {
            i64::try_from(d).map_err(|_| {
                TransportError::wire_format(format!(
                    "Dimension {} of array '{}' does not fit in int64",
                    d,
                    array.name()
                ))
            })
        })
        .collect::<Result<Vec<i64>>>()?;

    let data = ListArray::from_iter_primitive::<Float64Type, _, _>([Some(
        array.data().into_iter().map(Some),
    )]);
    let shape = ListArray::from_iter_primitive::<Int64Type, _, _>([Some(
        shape.into_iter().map(Some),
    )]);

    let fields = Fields::from(vec![
        Field::new(DATA_FIELD, data.data_type().clone(), false),
        Field::new(SHAPE_FIELD, shape.data_type().clone(), false),
    ]);

    Ok(StructArray::try_new(
        fields,
        vec![Arc::new(data) as ArrayRef, Arc::new(shape) as ArrayRef],
        None,
    )?)
}

fn decode_column(name: &str, column: &dyn Array) -> Result<NamedArray> {
    let structs = column.as_struct_opt().ok_or_else(|| {
        TransportError::wire_format(format!(
            "Column '{}' has type {}, expected a struct of data and shape",
            name,
            column.data_type()
        ))
    })?;
    if structs.is_null(0) {
        return Err(TransportError::wire_format(format!("Column '{}' is null", name)));
    }

    let data = list_values::<Float64Type>(name, structs, DATA_FIELD)?;
    let shape = list_values::<Int64Type>(name, structs, SHAPE_FIELD)?;

    let dims = shape
        .iter()
        .map(|&d| usize::try_from(d).ok())
        .collect::<Option<Vec<usize>>>();

    match dims {
        Some(dims) if shape_product(&dims) == Some(data.len()) => {
            NamedArray::new(name, data, dims)
        }
        _ => Err(TransportError::ShapeMismatch {
            name: name.to_string(),
            shape,
            len: data.len(),
        }),
    }
}

fn list_values<T: ArrowPrimitiveType>(
    name: &str,
    structs: &StructArray,
    field: &str,
) -> Result<Vec<T::Native>> {
    let column = structs.column_by_name(field).ok_or_else(|| {
        TransportError::wire_format(format!("Column '{}' has no '{}' field", name, field))
    })?;
    let list = column.as_list_opt::<i32>().ok_or_else(|| {
        TransportError::wire_format(format!(
            "Field '{}.{}' has type {}, expected a list",
            name,
            field,
            column.data_type()
        ))
    })?;
    if list.is_null(0) {
        return Err(TransportError::wire_format(format!(
            "Field '{}.{}' is null",
            name, field
        )));
    }

    let values = list.value(0);
    let values = values.as_primitive_opt::<T>().ok_or_else(|| {
        TransportError::wire_format(format!(
            "Field '{}.{}' holds {}, expected {}",
            name,
            field,
            values.data_type(),
            T::DATA_TYPE
        ))
    })?;
    if values.null_count() > 0 {
        return Err(TransportError::wire_format(format!(
            "Field '{}.{}' contains nulls",
            name, field
        )));
    }

    Ok(values.values().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::Float64Array;
    use arrow_schema::DataType;
    use ndarray::{array, Array3};

    /// Build a one-column record with arbitrary data and shape lists.
    fn raw_record(name: &str, data: Vec<f64>, shape: Vec<i64>) -> WireRecord {
        let data = ListArray::from_iter_primitive::<Float64Type, _, _>([Some(
            data.into_iter().map(Some),
        )]);
        let shape = ListArray::from_iter_primitive::<Int64Type, _, _>([Some(
            shape.into_iter().map(Some),
        )]);
        let fields = Fields::from(vec![
            Field::new(DATA_FIELD, data.data_type().clone(), false),
            Field::new(SHAPE_FIELD, shape.data_type().clone(), false),
        ]);
        let column =
            StructArray::try_new(fields, vec![Arc::new(data) as ArrayRef, Arc::new(shape)], None)
                .unwrap();
        let schema = Schema::new(vec![Field::new(name, column.data_type().clone(), false)]);
        WireRecord::from_batch(
            RecordBatch::try_new(Arc::new(schema), vec![Arc::new(column) as ArrayRef]).unwrap(),
        )
    }

    #[test]
    fn test_round_trip_matrix() {
        let payload = Payload::new().with(NamedArray::from_array(
            "input",
            array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
        ));

        let record = ArrayCodec::encode(&payload).unwrap();
        assert_eq!(record.names(), vec!["input".to_string()]);

        let decoded = ArrayCodec::decode(&record).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_round_trip_preserves_axis_order() {
        let cube = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| (i * 100 + j * 10 + k) as f64);
        let payload = Payload::new().with(NamedArray::from_array("cube", cube.clone()));

        let decoded = ArrayCodec::decode(&ArrayCodec::encode(&payload).unwrap()).unwrap();
        let out = decoded.get("cube").unwrap().as_array();
        assert_eq!(out.shape(), &[2, 3, 4]);
        assert_eq!(out[[1, 2, 3]], 123.0);
        assert_eq!(out[[0, 1, 0]], 10.0);
    }

    #[test]
    fn test_round_trip_zero_rows() {
        let payload = Payload::new().with(NamedArray::new("input", vec![], vec![0, 2]).unwrap());
        let decoded = ArrayCodec::decode(&ArrayCodec::encode(&payload).unwrap()).unwrap();

        let input = decoded.get("input").unwrap();
        assert_eq!(input.shape(), &[0, 2]);
        assert!(input.is_empty());
    }

    #[test]
    fn test_round_trip_scalar_and_extreme_values() {
        let payload = Payload::new()
            .with(NamedArray::scalar("radius", std::f64::consts::FRAC_1_SQRT_2))
            .with(NamedArray::vector(
                "edges",
                vec![f64::MIN_POSITIVE, f64::MAX, -0.0, 1e-300],
            ));

        let decoded = ArrayCodec::decode(&ArrayCodec::encode(&payload).unwrap()).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.get("radius").unwrap().shape(), &[] as &[usize]);
    }

    #[test]
    fn test_round_trip_through_ipc_bytes() {
        let payload = Payload::new()
            .with(NamedArray::vector("a", vec![1.0, 2.0, 3.0]))
            .with(NamedArray::from_array("b", array![[1.5], [2.5]]));

        let bytes = ArrayCodec::encode(&payload).unwrap().to_ipc_bytes().unwrap();
        let record = WireRecord::from_ipc_bytes(&bytes).unwrap();
        assert_eq!(ArrayCodec::decode(&record).unwrap(), payload);
    }

    #[test]
    fn test_decode_rejects_shape_mismatch() {
        let cases: Vec<(Vec<f64>, Vec<i64>)> = vec![
            (vec![1.0, 2.0, 3.0, 4.0], vec![1, 1]),
            (vec![1.0, 2.0], vec![3]),
            (vec![], vec![1]),
            (vec![1.0], vec![0, 1]),
            (vec![1.0, 2.0], vec![-1, -2]),
            (vec![1.0], vec![i64::MAX, i64::MAX]),
        ];

        for (data, shape) in cases {
            let len = data.len();
            let record = raw_record("input", data, shape.clone());
            match ArrayCodec::decode(&record) {
                Err(TransportError::ShapeMismatch {
                    name,
                    shape: got,
                    len: got_len,
                }) => {
                    assert_eq!(name, "input");
                    assert_eq!(got, shape);
                    assert_eq!(got_len, len);
                }
                other => panic!("Expected ShapeMismatch for {:?}, got: {:?}", shape, other),
            }
        }
    }

    #[test]
    fn test_decode_rejects_non_struct_column() {
        let schema = Schema::new(vec![Field::new("radius", DataType::Float64, false)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Float64Array::from(vec![1.0])) as ArrayRef],
        )
        .unwrap();

        let result = ArrayCodec::decode(&WireRecord::from_batch(batch));
        assert!(matches!(result, Err(TransportError::WireFormat { .. })));
    }

    #[test]
    fn test_decode_rejects_multiple_rows() {
        let data = ListArray::from_iter_primitive::<Float64Type, _, _>([
            Some(vec![Some(1.0)]),
            Some(vec![Some(2.0)]),
        ]);
        let shape = ListArray::from_iter_primitive::<Int64Type, _, _>([
            Some(vec![Some(1)]),
            Some(vec![Some(1)]),
        ]);
        let fields = Fields::from(vec![
            Field::new(DATA_FIELD, data.data_type().clone(), false),
            Field::new(SHAPE_FIELD, shape.data_type().clone(), false),
        ]);
        let column =
            StructArray::try_new(fields, vec![Arc::new(data) as ArrayRef, Arc::new(shape)], None)
                .unwrap();
        let schema = Schema::new(vec![Field::new("x", column.data_type().clone(), false)]);
        let batch =
            RecordBatch::try_new(Arc::new(schema), vec![Arc::new(column) as ArrayRef]).unwrap();

        let result = ArrayCodec::decode(&WireRecord::from_batch(batch));
        assert!(matches!(result, Err(TransportError::WireFormat { .. })));
    }

    #[test]
    fn test_from_ipc_bytes_rejects_truncated_stream() {
        let payload = Payload::new().with(NamedArray::vector("a", vec![1.0, 2.0]));
        let bytes = ArrayCodec::encode(&payload).unwrap().to_ipc_bytes().unwrap();

        let result = WireRecord::from_ipc_bytes(&bytes[..10]);
        assert!(matches!(result, Err(TransportError::WireFormat { .. })));

        let result = WireRecord::from_ipc_bytes(&[]);
        assert!(matches!(result, Err(TransportError::WireFormat { .. })));
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let record = ArrayCodec::encode(&Payload::new()).unwrap();
        assert_eq!(record.num_columns(), 0);
        assert!(ArrayCodec::decode(&record).unwrap().is_empty());
    }
}
