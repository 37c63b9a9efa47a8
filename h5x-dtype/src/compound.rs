use std::sync::Arc;

use h5x_error::{H5xError, H5xResult, h5x_bail};

use crate::{ByteOrder, TypeDescriptor};

/// A name for a field in a record.
pub type FieldName = Arc<str>;

/// One named field of a record at a fixed byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundField {
    name: FieldName,
    offset: usize,
    ty: TypeDescriptor,
}

impl CompoundField {
    /// The field name.
    pub fn name(&self) -> &FieldName {
        &self.name
    }

    /// Byte offset of the field from the start of the record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Descriptor of the field.
    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }
}

/// A record type: named fields packed back to back in declaration order.
///
/// Offsets are the running sum of the preceding field sizes, so a record never has gaps and its
/// size is exactly the sum of its field sizes. Records whose in-memory layout has padding cannot
/// be described and are rejected by [`CompoundBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundType {
    fields: Vec<CompoundField>,
    size: usize,
}

impl CompoundType {
    /// Start describing a record named `type_name` whose in-memory size is `size` bytes.
    pub fn builder(type_name: &'static str, size: usize) -> CompoundBuilder {
        CompoundBuilder {
            type_name,
            declared_size: size,
            offset: 0,
            fields: Vec::new(),
        }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[CompoundField] {
        &self.fields
    }

    /// Total size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&CompoundField> {
        self.fields.iter().find(|f| f.name.as_ref() == name)
    }

    pub(crate) fn with_byte_order(&self, order: ByteOrder) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|f| CompoundField {
                    name: f.name.clone(),
                    offset: f.offset,
                    ty: f.ty.with_byte_order(order),
                })
                .collect(),
            size: self.size,
        }
    }
}

/// Assigns sequential offsets to the fields of a record and checks them against the real
/// layout of the Rust type.
#[derive(Debug)]
pub struct CompoundBuilder {
    type_name: &'static str,
    declared_size: usize,
    offset: usize,
    fields: Vec<CompoundField>,
}

impl CompoundBuilder {
    /// Append the next field.
    ///
    /// `memory_offset` is where the field really lives (`offset_of!`). It must equal the running
    /// offset, otherwise the record has padding in front of this field.
    pub fn field(
        mut self,
        name: &str,
        memory_offset: usize,
        ty: TypeDescriptor,
    ) -> H5xResult<Self> {
        if ty.is_variable_length() || matches!(ty, TypeDescriptor::FixedString { .. }) {
            h5x_bail!(
                UnsupportedType: "field `{}` of `{}` has type {}, records may only hold primitives, bitfields and records",
                name,
                self.type_name,
                ty
            );
        }
        if memory_offset != self.offset {
            return Err(H5xError::CompoundLayoutMismatch {
                type_name: self.type_name.into(),
                context: format!("offset of field `{name}`").into(),
                expected: memory_offset,
                computed: self.offset,
            });
        }

        self.offset += ty.size();
        self.fields.push(CompoundField {
            name: name.into(),
            offset: memory_offset,
            ty,
        });
        Ok(self)
    }

    /// Finish the record, checking that the fields account for every byte of it.
    pub fn finish(self) -> H5xResult<TypeDescriptor> {
        if self.fields.is_empty() {
            h5x_bail!(UnsupportedType: "record `{}` has no fields", self.type_name);
        }
        if self.offset != self.declared_size {
            return Err(H5xError::CompoundLayoutMismatch {
                type_name: self.type_name.into(),
                context: "record size".into(),
                expected: self.declared_size,
                computed: self.offset,
            });
        }
        Ok(TypeDescriptor::Compound(CompoundType {
            fields: self.fields,
            size: self.offset,
        }))
    }
}
