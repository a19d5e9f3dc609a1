//! Structural type discovery
//!
//! Produces a datashape-like description (`N * {field: type, ...}`) of a
//! materialized collection of rows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engines::storage::formats::{Record, Row};

/// Element type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("string"),
        }
    }
}

/// One named column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    /// Some rows lack this column
    pub optional: bool,
}

/// Shape of a collection of rows
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataShape {
    /// Number of rows
    pub length: usize,
    pub fields: Vec<Field>,
}

impl DataShape {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

impl fmt::Display for DataShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} * {{", self.length)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let marker = if field.optional { "?" } else { "" };
            write!(f, "{}: {}{}", field.name, marker, field.ty)?;
        }
        f.write_str("}")
    }
}

/// Things whose structure can be described without outside knowledge
pub trait Discover {
    fn discover(&self) -> DataShape;
}

impl Discover for [Record] {
    fn discover(&self) -> DataShape {
        DataShape {
            length: self.len(),
            fields: Record::FIELDS
                .iter()
                .map(|name| Field {
                    name: name.to_string(),
                    ty: FieldType::String,
                    optional: false,
                })
                .collect(),
        }
    }
}

impl Discover for Vec<Record> {
    fn discover(&self) -> DataShape {
        self.as_slice().discover()
    }
}

impl Discover for [Row] {
    /// Columns appear in first-seen order; a column missing from any row is optional
    fn discover(&self) -> DataShape {
        let mut fields: Vec<Field> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();

        for row in self {
            for key in row.keys() {
                match fields.iter().position(|f| &f.name == key) {
                    Some(i) => counts[i] += 1,
                    None => {
                        fields.push(Field {
                            name: key.clone(),
                            ty: FieldType::String,
                            optional: false,
                        });
                        counts.push(1);
                    }
                }
            }
        }

        for (field, count) in fields.iter_mut().zip(counts) {
            field.optional = count < self.len();
        }

        DataShape {
            length: self.len(),
            fields,
        }
    }
}

/// Describe the structure of `value`
pub fn discover<T: Discover + ?Sized>(value: &T) -> DataShape {
    value.discover()
}
