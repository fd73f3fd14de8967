//! ## tagbus-core::record
//! **Schema-bound sparse records**
//!
//! A [`RecordType`] is an immutable, ordered list of unique field names; the
//! order is canonical for wire layout. A [`Record`] binds to one type and
//! holds a value for any subset of its fields. Unset is a distinct state,
//! not a default value.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::value::Value;

#[derive(Debug)]
struct Schema {
    fields: Vec<String>,
    index: HashMap<String, usize>,
}

/// Shared, read-only field schema. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct RecordType {
    schema: Arc<Schema>,
}

impl RecordType {
    /// Creates a record type from field names in canonical order.
    pub fn create<I, S>(names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields = Vec::new();
        let mut index = HashMap::new();
        for name in names {
            let name = name.into();
            if index.contains_key(&name) {
                return Err(SchemaError::DuplicateField(name));
            }
            index.insert(name.clone(), fields.len());
            fields.push(name);
        }
        Ok(Self {
            schema: Arc::new(Schema { fields, index }),
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.schema.fields
    }

    pub fn len(&self) -> usize {
        self.schema.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schema.fields.is_empty()
    }

    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.schema.index.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.schema.index.contains_key(field)
    }

    fn unknown(&self, field: &str) -> SchemaError {
        SchemaError::UnknownField {
            field: field.to_string(),
            declared: self.schema.fields.join(", "),
        }
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) || self.schema.fields == other.schema.fields
    }
}

impl Eq for RecordType {}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record_type({})", self.schema.fields.join(", "))
    }
}

/// A sparse instance of a [`RecordType`].
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    record_type: RecordType,
    values: Vec<Option<Value>>,
}

impl Record {
    /// A record with every field unset.
    pub fn new(record_type: &RecordType) -> Self {
        Self {
            record_type: record_type.clone(),
            values: vec![None; record_type.len()],
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    /// Assigns `field`, returning the previous value if there was one.
    ///
    /// Fields are not type-locked: a later assignment may change the tag.
    pub fn set(
        &mut self,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, SchemaError> {
        let index = self
            .record_type
            .index_of(field)
            .ok_or_else(|| self.record_type.unknown(field))?;
        Ok(self.values[index].replace(value.into()))
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self, SchemaError> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Reads `field`; `Ok(None)` means declared but unset.
    pub fn get(&self, field: &str) -> Result<Option<&Value>, SchemaError> {
        let index = self
            .record_type
            .index_of(field)
            .ok_or_else(|| self.record_type.unknown(field))?;
        Ok(self.values[index].as_ref())
    }

    /// Returns `field` to the unset state.
    pub fn unset(&mut self, field: &str) -> Result<Option<Value>, SchemaError> {
        let index = self
            .record_type
            .index_of(field)
            .ok_or_else(|| self.record_type.unknown(field))?;
        Ok(self.values[index].take())
    }

    /// Positional assignment by canonical field index.
    pub fn set_at(&mut self, index: usize, value: Value) -> Result<Option<Value>, SchemaError> {
        match self.values.get_mut(index) {
            Some(slot) => Ok(slot.replace(value)),
            None => Err(self.record_type.unknown(&format!("#{index}"))),
        }
    }

    /// Set fields in canonical order as `(index, name, value)`.
    pub fn present(&self) -> impl Iterator<Item = (usize, &str, &Value)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(move |(i, v)| {
                v.as_ref()
                    .map(|v| (i, self.record_type.fields()[i].as_str(), v))
            })
    }

    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (name, value)) in self
            .record_type
            .fields()
            .iter()
            .zip(&self.values)
            .enumerate()
        {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                Some(v) => write!(f, "{name}={v}")?,
                None => write!(f, "{name}=<unset>")?,
            }
        }
        f.write_str("]")
    }
}
