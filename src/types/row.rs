use serde::{Deserialize, Serialize};

use crate::types::{RowId, error::DatabaseError, value::Value};

/// A table row. The row id is the B-tree key and is not part of the
/// encoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub row_id: Option<RowId>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            row_id: None,
            values,
        }
    }

    pub fn with_row_id(row_id: RowId, values: Vec<Value>) -> Self {
        Self {
            row_id: Some(row_id),
            values,
        }
    }

    pub fn get_value(&self, column_index: usize) -> Option<&Value> {
        self.values.get(column_index)
    }

    pub fn size(&self) -> usize {
        4 + self.values.iter().map(Value::serialized_size).sum::<usize>()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.size());

        // Value count
        buffer.extend_from_slice(&(self.values.len() as u32).to_le_bytes());

        for value in &self.values {
            value.write_to(&mut buffer);
        }

        buffer
    }

    pub fn from_bytes(row_id: RowId, bytes: &[u8]) -> Result<Self, DatabaseError> {
        if bytes.len() < 4 {
            return Err(DatabaseError::corruption(format!(
                "row {} is missing its value count",
                row_id
            )));
        }
        let value_count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let mut cursor = 4;

        let mut values = Vec::with_capacity(value_count.min(bytes.len()));
        for _ in 0..value_count {
            let (value, consumed) = Value::read_from(&bytes[cursor..])?;
            values.push(value);
            cursor += consumed;
        }

        if cursor != bytes.len() {
            return Err(DatabaseError::corruption(format!(
                "row {} has {} trailing bytes",
                row_id,
                bytes.len() - cursor
            )));
        }

        Ok(Row::with_row_id(row_id, values))
    }
}
