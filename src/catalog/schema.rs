use crate::db_types::value::DataType;

/// One column of a record schema. `length` is the declared maximum for
/// Varchar and the fixed 4 bytes for Int/Real; schema position determines
/// the on-wire field order.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub data_type: DataType,
    pub length: u32,
}

#[derive(Debug, Clone)]
pub struct Schema {
    attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Position and descriptor of the named attribute.
    pub fn attribute(&self, name: &str) -> Option<(usize, &Attribute)> {
        self.attributes
            .iter()
            .enumerate()
            .find(|(_, attr)| attr.name == name)
    }
}

pub struct SchemaBuilder {
    columns: Vec<Attribute>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn add_int(mut self, column_name: &str) -> Self {
        self.columns.push(Attribute {
            name: column_name.to_string(),
            data_type: DataType::Int,
            length: 4,
        });
        self
    }

    pub fn add_real(mut self, column_name: &str) -> Self {
        self.columns.push(Attribute {
            name: column_name.to_string(),
            data_type: DataType::Real,
            length: 4,
        });
        self
    }

    pub fn add_varchar(mut self, column_name: &str, length: u32) -> Self {
        self.columns.push(Attribute {
            name: column_name.to_string(),
            data_type: DataType::Varchar,
            length,
        });
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            attributes: self.columns,
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
