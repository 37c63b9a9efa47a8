//! Native type descriptors and the resolver that produces them.

use h5x_dtype::{ByteOrder, TypeClass, TypeDescriptor};
use h5x_error::{H5xResult, h5x_bail, h5x_err};
use h5x_sys::{H5T_VARIABLE, H5T_class_t, H5T_order_t, hid_t};

use crate::handle::{Handle, HandleKind, Ownership, c_name, check_status, check_tri};
use crate::library::Library;

/// A native type.
///
/// Atomic types are borrowed from the predefined table and never closed. Strings, records and
/// variable-length types are constructed for the caller and closed exactly once, either by
/// [`Datatype::close`] or on drop.
#[derive(Debug)]
pub struct Datatype {
    handle: Handle,
}

pub(crate) fn resolve(lib: &Library, descriptor: &TypeDescriptor) -> H5xResult<Datatype> {
    let engine = lib.engine();
    match descriptor {
        TypeDescriptor::Integer { .. }
        | TypeDescriptor::Float { .. }
        | TypeDescriptor::Bitfield { .. } => {
            let id = lib.builtins().atom(descriptor).ok_or_else(|| {
                h5x_err!(UnsupportedType: "no predefined type for {}", descriptor)
            })?;
            Ok(Datatype::borrowed(lib, id))
        }
        TypeDescriptor::FixedString { size } => {
            let mut string = Datatype::borrowed(lib, lib.builtins().string()).copy()?;
            string.set_size(*size)?;
            Ok(string)
        }
        TypeDescriptor::VarLenString => {
            let mut string = Datatype::borrowed(lib, lib.builtins().string()).copy()?;
            string.set_size(H5T_VARIABLE)?;
            Ok(string)
        }
        TypeDescriptor::Compound(compound) => {
            let record = Datatype::owned(
                lib,
                "H5Tcreate",
                engine.type_create(H5T_class_t::H5T_COMPOUND, compound.size()),
            )?;
            for field in compound.fields() {
                let member = resolve(lib, field.ty())?;
                let name = c_name(field.name())?;
                check_status(
                    "H5Tinsert",
                    engine.type_insert(record.id(), &name, field.offset(), member.id()),
                )?;
            }
            Ok(record)
        }
        TypeDescriptor::VarLenArray(base) => {
            if base.is_variable_length() {
                h5x_bail!(UnsupportedType: "nested variable-length type {}", descriptor);
            }
            let base = resolve(lib, base)?;
            Datatype::owned(lib, "H5Tvlen_create", engine.type_vlen_create(base.id()))
        }
    }
}

impl Datatype {
    pub(crate) fn owned(lib: &Library, op: &'static str, id: hid_t) -> H5xResult<Self> {
        Ok(Self {
            handle: Handle::owned(lib.engine(), HandleKind::Datatype, op, id)?,
        })
    }

    fn borrowed(lib: &Library, id: hid_t) -> Self {
        Self {
            handle: Handle::borrowed(lib.engine(), HandleKind::Datatype, id),
        }
    }

    /// The raw engine id.
    pub fn id(&self) -> hid_t {
        self.handle.id()
    }

    /// Whether this type is one of the engine's predefined types.
    pub fn is_borrowed(&self) -> bool {
        self.handle.ownership() == Ownership::Borrowed
    }

    /// The class of this type.
    pub fn class(&self) -> H5xResult<TypeClass> {
        Ok(match self.handle.engine().type_get_class(self.id()) {
            H5T_class_t::H5T_INTEGER => TypeClass::Integer,
            H5T_class_t::H5T_FLOAT => TypeClass::Float,
            H5T_class_t::H5T_STRING => TypeClass::String,
            H5T_class_t::H5T_BITFIELD => TypeClass::Bitfield,
            H5T_class_t::H5T_COMPOUND => TypeClass::Compound,
            H5T_class_t::H5T_VLEN => TypeClass::VarLen,
            H5T_class_t::H5T_NO_CLASS => return Err(h5x_err!(Native: "H5Tget_class", -1)),
            other => h5x_bail!(UnsupportedType: "type class {:?}", other),
        })
    }

    /// Size of one element in a transfer buffer.
    pub fn size(&self) -> H5xResult<usize> {
        match self.handle.engine().type_get_size(self.id()) {
            0 => Err(h5x_err!(Native: "H5Tget_size", -1)),
            size => Ok(size),
        }
    }

    /// Byte order of an atomic type, `None` for types without one.
    pub fn byte_order(&self) -> H5xResult<Option<ByteOrder>> {
        match self.handle.engine().type_get_order(self.id()) {
            H5T_order_t::H5T_ORDER_LE => Ok(Some(ByteOrder::LittleEndian)),
            H5T_order_t::H5T_ORDER_BE => Ok(Some(ByteOrder::BigEndian)),
            H5T_order_t::H5T_ORDER_NONE => Ok(None),
            H5T_order_t::H5T_ORDER_ERROR => Err(h5x_err!(Native: "H5Tget_order", -1)),
            other => h5x_bail!(UnsupportedType: "byte order {:?}", other),
        }
    }

    /// Whether this is a string type transferred as one pointer per element.
    pub fn is_variable_string(&self) -> H5xResult<bool> {
        check_tri(
            "H5Tis_variable_str",
            self.handle.engine().type_is_variable_str(self.id()),
        )
    }

    /// Number of fields of a record type.
    pub fn member_count(&self) -> H5xResult<usize> {
        let count = self.handle.engine().type_get_nmembers(self.id());
        usize::try_from(count).map_err(|_| h5x_err!(Native: "H5Tget_nmembers", count))
    }

    /// Byte offset of the field at `index` of a record type.
    pub fn member_offset(&self, index: usize) -> H5xResult<usize> {
        let count = self.member_count()?;
        if index >= count {
            h5x_bail!("member index {} out of range for {} members", index, count);
        }
        let index = u32::try_from(index).map_err(|_| h5x_err!("member index {} too large", index))?;
        Ok(self.handle.engine().type_get_member_offset(self.id(), index))
    }

    /// An owned, modifiable copy of this type.
    pub fn copy(&self) -> H5xResult<Datatype> {
        Ok(Self {
            handle: Handle::owned(
                self.handle.engine(),
                HandleKind::Datatype,
                "H5Tcopy",
                self.handle.engine().type_copy(self.id()),
            )?,
        })
    }

    /// Set the element size. Use [`H5T_VARIABLE`] to make a string type variable-length.
    pub fn set_size(&mut self, size: usize) -> H5xResult<()> {
        self.ensure_mutable()?;
        check_status(
            "H5Tset_size",
            self.handle.engine().type_set_size(self.id(), size),
        )
    }

    /// Set the byte order of an atomic type.
    pub fn set_byte_order(&mut self, order: ByteOrder) -> H5xResult<()> {
        self.ensure_mutable()?;
        let order = match order.resolved() {
            ByteOrder::BigEndian => H5T_order_t::H5T_ORDER_BE,
            _ => H5T_order_t::H5T_ORDER_LE,
        };
        check_status(
            "H5Tset_order",
            self.handle.engine().type_set_order(self.id(), order),
        )
    }

    fn ensure_mutable(&self) -> H5xResult<()> {
        if self.is_borrowed() {
            h5x_bail!(ImmutableDescriptor: "predefined type {} must be copied first", self.id());
        }
        Ok(())
    }

    /// Close the type if it is owned. Idempotent.
    pub fn close(&mut self) -> H5xResult<()> {
        self.handle.close()
    }
}
