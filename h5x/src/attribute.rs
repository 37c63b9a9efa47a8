use std::marker::PhantomData;

use h5x_dtype::TypeDescriptor;
use h5x_error::{H5xResult, h5x_bail, h5x_err};
use log::{debug, trace};

use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::element::{H5Element, ensure_accepts};
use crate::handle::{Handle, HandleKind, c_name};
use crate::library::Library;
use crate::location::Object;
use crate::transfer::{Target, Transfer};

/// A single named value attached to a file, group or dataset.
#[derive(Debug)]
pub struct Attribute<T: H5Element> {
    lib: Library,
    handle: Handle,
    datatype: Datatype,
    name: String,
    _element: PhantomData<T>,
}

impl<T: H5Element> Attribute<T> {
    /// Attach a new attribute with the default descriptor of `T`.
    pub fn create<O: Object>(owner: &O, name: &str) -> H5xResult<Self> {
        Self::create_with_type(owner, name, &T::descriptor()?)
    }

    /// Attach a new attribute stored with an explicit descriptor.
    pub fn create_with_type<O: Object>(
        owner: &O,
        name: &str,
        descriptor: &TypeDescriptor,
    ) -> H5xResult<Self> {
        let lib = owner.library();
        let stored = lib.resolve(descriptor)?;
        ensure_accepts::<T>(&stored, "attribute", name)?;
        let space = Dataspace::new(lib, &[1])?;
        let cname = c_name(name)?;
        let id = lib
            .engine()
            .attr_create(owner.id(), &cname, stored.id(), space.id());
        let handle = Handle::owned(lib.engine(), HandleKind::Attribute, "H5Acreate", id)?;
        debug!("created {} attribute {name} of {descriptor}", T::KIND);
        Self::from_handle(lib, handle, name)
    }

    /// Open an existing attribute.
    pub fn open<O: Object>(owner: &O, name: &str) -> H5xResult<Self> {
        let lib = owner.library();
        let cname = c_name(name)?;
        let id = lib.engine().attr_open(owner.id(), &cname);
        let handle = Handle::owned(lib.engine(), HandleKind::Attribute, "H5Aopen", id)?;
        debug!("opened attribute {name}");
        Self::from_handle(lib, handle, name)
    }

    fn from_handle(lib: &Library, handle: Handle, name: &str) -> H5xResult<Self> {
        let datatype = Datatype::owned(
            lib,
            "H5Aget_type",
            lib.engine().attr_get_type(handle.id()),
        )?;
        ensure_accepts::<T>(&datatype, "attribute", name)?;
        Ok(Self {
            lib: lib.clone(),
            handle,
            datatype,
            name: name.to_owned(),
            _element: PhantomData,
        })
    }

    /// The attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stored type.
    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    /// Read the value.
    pub fn read(&self) -> H5xResult<T> {
        let extent = self.space()?;
        let transfer = self.transfer(&extent);
        trace!("reading {} attribute {}", T::KIND, self.name);
        T::read_elements(&transfer)?
            .into_iter()
            .next()
            .ok_or_else(|| h5x_err!("attribute {} produced no value", self.name))
    }

    /// Overwrite the value.
    pub fn write(&self, value: T) -> H5xResult<()> {
        let extent = self.space()?;
        let transfer = self.transfer(&extent);
        trace!("writing {} attribute {}", T::KIND, self.name);
        T::write_elements(&transfer, &[value])
    }

    /// Close the attribute. Idempotent.
    pub fn close(&mut self) -> H5xResult<()> {
        self.datatype.close()?;
        self.handle.close()
    }

    fn space(&self) -> H5xResult<Dataspace> {
        let extent = Dataspace::from_id(
            &self.lib,
            "H5Aget_space",
            self.lib.engine().attr_get_space(self.handle.id()),
        )?;
        let points = extent.extent_points()?;
        if points != 1 {
            h5x_bail!(
                "attribute {} holds {} values, only single values are supported",
                self.name,
                points
            );
        }
        Ok(extent)
    }

    fn transfer<'a>(&'a self, extent: &'a Dataspace) -> Transfer<'a> {
        Transfer::new(
            &self.lib,
            Target::Attribute(self.handle.id()),
            &self.datatype,
            Dataspace::all(),
            Dataspace::all(),
            extent,
            1,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use h5x_error::H5xError;
    use h5x_mem::MemoryEngine;

    use super::*;
    use crate::dataset::Dataset;
    use crate::location::{File, Location};

    #[test]
    fn attributes_round_trip_on_every_owner() {
        let engine = Arc::new(MemoryEngine::new());
        let lib = Library::new(engine.clone()).unwrap();
        let file = File::create(&lib, "attrs.h5").unwrap();
        let group = file.create_group("g").unwrap();
        let dataset = Dataset::<u8>::create(&group, "d", &[3]).unwrap();

        Attribute::<String>::create(&file, "title")
            .unwrap()
            .write("experiment".to_owned())
            .unwrap();
        Attribute::<f64>::create(&group, "scale")
            .unwrap()
            .write(0.25)
            .unwrap();
        Attribute::<Vec<u32>>::create(&dataset, "ids")
            .unwrap()
            .write(vec![7, 8, 9])
            .unwrap();

        assert_eq!(
            file.attribute::<String>("title").unwrap().read().unwrap(),
            "experiment"
        );
        assert_eq!(group.attribute::<f64>("scale").unwrap().read().unwrap(), 0.25);
        assert_eq!(
            dataset.attribute::<Vec<u32>>("ids").unwrap().read().unwrap(),
            vec![7, 8, 9]
        );
        assert!(matches!(
            Attribute::<f64>::open(&file, "missing"),
            Err(H5xError::Native { op: "H5Aopen", .. })
        ));
        assert_eq!(engine.outstanding_allocations(), 0);
    }

    #[test]
    fn fixed_string_attributes_are_padded() {
        let engine = Arc::new(MemoryEngine::new());
        let lib = Library::new(engine).unwrap();
        let file = File::create(&lib, "fixed.h5").unwrap();
        let attr = Attribute::<String>::create_with_type(
            &file,
            "unit",
            &TypeDescriptor::FixedString { size: 8 },
        )
        .unwrap();
        attr.write("m/s".to_owned()).unwrap();
        assert_eq!(attr.read().unwrap(), "m/s");
        assert!(matches!(
            attr.write("kilometres".to_owned()),
            Err(H5xError::InvalidArgument(..))
        ));
    }
}
