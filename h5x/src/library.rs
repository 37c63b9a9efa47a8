use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use enum_iterator::all;
use h5x_dtype::{ByteOrder, TypeDescriptor};
use h5x_error::{H5xResult, h5x_err};
use h5x_sys::{H5T_builtin, H5T_class_t, H5T_order_t, H5T_sign_t, NativeEngine, hid_t};
use log::debug;

use crate::datatype::{self, Datatype};
use crate::handle::check_id;

/// The flavor of a predefined atomic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomKind {
    /// Two's complement integer.
    Signed,
    /// Unsigned integer.
    Unsigned,
    /// IEEE float.
    Float,
    /// Bit vector.
    Bitfield,
}

impl AtomKind {
    fn of(descriptor: &TypeDescriptor) -> Option<Self> {
        match descriptor {
            TypeDescriptor::Integer { signed: true, .. } => Some(AtomKind::Signed),
            TypeDescriptor::Integer { signed: false, .. } => Some(AtomKind::Unsigned),
            TypeDescriptor::Float { .. } => Some(AtomKind::Float),
            TypeDescriptor::Bitfield { .. } => Some(AtomKind::Bitfield),
            _ => None,
        }
    }
}

type AtomKey = (AtomKind, usize, ByteOrder);

/// The predefined types of an engine, keyed by kind, width and concrete byte order.
///
/// Built once by [`Library::new`] and never modified afterwards. Every id in the table is
/// borrowed from the engine and must never be closed.
#[derive(Debug, Clone)]
pub struct BuiltinTable {
    atoms: HashMap<AtomKey, hid_t>,
    string: hid_t,
}

impl BuiltinTable {
    fn load(engine: &dyn NativeEngine) -> H5xResult<Self> {
        let mut atoms = HashMap::new();
        let mut string = None;

        for which in all::<H5T_builtin>() {
            let id = check_id("H5T builtin lookup", engine.builtin_type(which))?;
            let kind = match engine.type_get_class(id) {
                H5T_class_t::H5T_STRING => {
                    string = Some(id);
                    continue;
                }
                H5T_class_t::H5T_INTEGER => match engine.type_get_sign(id) {
                    H5T_sign_t::H5T_SGN_2 => AtomKind::Signed,
                    H5T_sign_t::H5T_SGN_NONE => AtomKind::Unsigned,
                    H5T_sign_t::H5T_SGN_ERROR => return Err(h5x_err!(Native: "H5Tget_sign", -1)),
                },
                H5T_class_t::H5T_FLOAT => AtomKind::Float,
                H5T_class_t::H5T_BITFIELD => AtomKind::Bitfield,
                H5T_class_t::H5T_NO_CLASS => return Err(h5x_err!(Native: "H5Tget_class", -1)),
                other => {
                    return Err(h5x_err!(
                        UnsupportedType: "predefined type {:?} has class {:?}",
                        which,
                        other
                    ));
                }
            };
            let size = match engine.type_get_size(id) {
                0 => return Err(h5x_err!(Native: "H5Tget_size", -1)),
                size => size,
            };
            let order = match engine.type_get_order(id) {
                H5T_order_t::H5T_ORDER_LE => ByteOrder::LittleEndian,
                H5T_order_t::H5T_ORDER_BE => ByteOrder::BigEndian,
                _ => return Err(h5x_err!(Native: "H5Tget_order", -1)),
            };
            // Native aliases land on the same key as their explicit twin.
            atoms.entry((kind, size, order)).or_insert(id);
        }

        let string = string.ok_or_else(|| h5x_err!(UnsupportedType: "engine has no C string type"))?;
        debug!("loaded {} predefined atomic types", atoms.len());
        Ok(Self { atoms, string })
    }

    /// The predefined type for an atomic descriptor, if the engine has one.
    pub fn atom(&self, descriptor: &TypeDescriptor) -> Option<hid_t> {
        let kind = AtomKind::of(descriptor)?;
        let order = descriptor.byte_order()?.resolved();
        self.atoms.get(&(kind, descriptor.size(), order)).copied()
    }

    /// The one-byte C string type that string descriptors are copied from.
    pub fn string(&self) -> hid_t {
        self.string
    }

    /// Number of distinct atomic types.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Whether the table holds no atomic types.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

struct Inner {
    engine: Arc<dyn NativeEngine>,
    builtins: BuiltinTable,
}

/// An initialized engine together with its predefined type table.
///
/// Cloning is cheap. Every object opened through a library keeps the engine alive.
#[derive(Clone)]
pub struct Library {
    inner: Arc<Inner>,
}

impl Library {
    /// Initialize the library on top of `engine`.
    ///
    /// Fails without side effects if any predefined type is missing or malformed.
    pub fn new<E: NativeEngine + 'static>(engine: Arc<E>) -> H5xResult<Self> {
        let engine: Arc<dyn NativeEngine> = engine;
        let builtins = BuiltinTable::load(engine.as_ref())?;
        Ok(Self {
            inner: Arc::new(Inner { engine, builtins }),
        })
    }

    /// The engine all calls go through.
    pub fn engine(&self) -> &Arc<dyn NativeEngine> {
        &self.inner.engine
    }

    /// The predefined type table.
    pub fn builtins(&self) -> &BuiltinTable {
        &self.inner.builtins
    }

    /// Produce the native type for a descriptor. See [`Datatype`] for which results are
    /// borrowed and which are owned.
    pub fn resolve(&self, descriptor: &TypeDescriptor) -> H5xResult<Datatype> {
        datatype::resolve(self, descriptor)
    }
}

impl Debug for Library {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("engine", &self.inner.engine)
            .field("builtins", &self.inner.builtins.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use h5x_dtype::H5Type;
    use h5x_mem::MemoryEngine;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(i8::type_descriptor().unwrap())]
    #[case(u64::type_descriptor().unwrap())]
    #[case(f32::type_descriptor_ordered(ByteOrder::BigEndian).unwrap())]
    #[case(h5x_dtype::Bits16::type_descriptor().unwrap())]
    fn every_primitive_has_a_builtin(#[case] descriptor: TypeDescriptor) {
        let lib = Library::new(Arc::new(MemoryEngine::new())).unwrap();
        assert!(lib.builtins().atom(&descriptor).is_some());
    }

    #[test]
    fn native_and_explicit_orders_share_an_entry() {
        let lib = Library::new(Arc::new(MemoryEngine::new())).unwrap();
        let native = i32::type_descriptor().unwrap();
        let explicit = native.with_byte_order(ByteOrder::Native.resolved());
        assert_eq!(lib.builtins().atom(&native), lib.builtins().atom(&explicit));
        // Four kinds, four widths, two orders, minus the float widths that do not exist.
        assert_eq!(lib.builtins().len(), 28);
    }
}
