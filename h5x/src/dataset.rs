//! Typed datasets: the generic transfer engine over every element kind.

use std::marker::PhantomData;

use h5x_dtype::{ByteOrder, TypeDescriptor};
use h5x_error::{H5xError, H5xResult, h5x_bail, h5x_err};
use itertools::Itertools;
use log::{debug, trace};
use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn};

use crate::dataspace::{Dataspace, SelectOp};
use crate::datatype::Datatype;
use crate::element::{H5Element, ensure_accepts};
use crate::handle::{Handle, HandleKind, c_name};
use crate::library::Library;
use crate::location::{Location, Object};
use crate::transfer::{Target, Transfer};

/// An n-dimensional array of `T` stored under a name in a file.
///
/// The element type is fixed when the dataset is created or opened: opening a dataset whose
/// stored type has a class `T` cannot read fails with [`H5xError::UnsupportedType`].
///
/// Every transfer pairs a memory-side dataspace with a file-side one. [`Dataspace::all`] on the
/// memory side means "a buffer shaped like the file side", on the file side it means "the whole
/// dataset".
#[derive(Debug)]
pub struct Dataset<T: H5Element> {
    lib: Library,
    handle: Handle,
    datatype: Datatype,
    name: String,
    _element: PhantomData<T>,
}

impl<T: H5Element> Dataset<T> {
    /// Create a dataset with the default descriptor of `T` and a fixed extent.
    pub fn create<L: Location>(loc: &L, name: &str, dims: &[u64]) -> H5xResult<Self> {
        let space = Dataspace::new(loc.library(), dims)?;
        Self::create_in(loc, name, &T::descriptor()?, &space)
    }

    /// Create a dataset whose extent may later grow up to `maxdims`.
    pub fn create_with_maxdims<L: Location>(
        loc: &L,
        name: &str,
        dims: &[u64],
        maxdims: &[u64],
    ) -> H5xResult<Self> {
        let space = Dataspace::with_max_dimensions(loc.library(), dims, maxdims)?;
        Self::create_in(loc, name, &T::descriptor()?, &space)
    }

    /// Create a dataset stored with an explicit descriptor, e.g. a fixed-length string type or
    /// a narrower integer than `T`.
    pub fn create_with_type<L: Location>(
        loc: &L,
        name: &str,
        descriptor: &TypeDescriptor,
        dims: &[u64],
    ) -> H5xResult<Self> {
        let space = Dataspace::new(loc.library(), dims)?;
        Self::create_in(loc, name, descriptor, &space)
    }

    /// Create a dataset shaped like `data` and write it.
    pub fn create_with_data<L, S, D>(loc: &L, name: &str, data: &ArrayBase<S, D>) -> H5xResult<Self>
    where
        L: Location,
        S: Data<Elem = T>,
        D: Dimension,
    {
        Self::create_with_data_ordered(loc, name, data, ByteOrder::Native)
    }

    /// Create a dataset shaped like `data`, stored in the given byte order, and write it.
    pub fn create_with_data_ordered<L, S, D>(
        loc: &L,
        name: &str,
        data: &ArrayBase<S, D>,
        order: ByteOrder,
    ) -> H5xResult<Self>
    where
        L: Location,
        S: Data<Elem = T>,
        D: Dimension,
    {
        let descriptor = T::descriptor()?.with_byte_order(order);
        let space = Dataspace::new(loc.library(), &shape_of(data.shape()))?;
        let dataset = Self::create_in(loc, name, &descriptor, &space)?;
        dataset.write(data)?;
        Ok(dataset)
    }

    fn create_in<L: Location>(
        loc: &L,
        name: &str,
        descriptor: &TypeDescriptor,
        space: &Dataspace,
    ) -> H5xResult<Self> {
        let lib = loc.library();
        let stored = lib.resolve(descriptor)?;
        ensure_accepts::<T>(&stored, "dataset", name)?;
        let cname = c_name(name)?;
        let id = lib
            .engine()
            .dataset_create(loc.id(), &cname, stored.id(), space.id());
        let handle = Handle::owned(lib.engine(), HandleKind::Dataset, "H5Dcreate", id)?;
        debug!("created {} dataset {name} of {descriptor}", T::KIND);
        Self::from_handle(lib, handle, name)
    }

    /// Open an existing dataset.
    pub fn open<L: Location>(loc: &L, name: &str) -> H5xResult<Self> {
        let lib = loc.library();
        let cname = c_name(name)?;
        let id = lib.engine().dataset_open(loc.id(), &cname);
        let handle = Handle::owned(lib.engine(), HandleKind::Dataset, "H5Dopen", id)?;
        debug!("opened dataset {name}");
        Self::from_handle(lib, handle, name)
    }

    fn from_handle(lib: &Library, handle: Handle, name: &str) -> H5xResult<Self> {
        let datatype = Datatype::owned(
            lib,
            "H5Dget_type",
            lib.engine().dataset_get_type(handle.id()),
        )?;
        ensure_accepts::<T>(&datatype, "dataset", name)?;
        Ok(Self {
            lib: lib.clone(),
            handle,
            datatype,
            name: name.to_owned(),
            _element: PhantomData,
        })
    }

    /// The path the dataset was created or opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stored type.
    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    /// A fresh copy of the dataset's extent, with everything selected.
    pub fn space(&self) -> H5xResult<Dataspace> {
        Dataspace::from_id(
            &self.lib,
            "H5Dget_space",
            self.lib.engine().dataset_get_space(self.handle.id()),
        )
    }

    /// The current extent.
    pub fn dimensions(&self) -> H5xResult<Vec<u64>> {
        self.space()?.dimensions()
    }

    /// Read the whole dataset.
    pub fn read(&self) -> H5xResult<ArrayD<T>> {
        self.read_with(Dataspace::all(), Dataspace::all())
    }

    /// Read the selection of `file` into a buffer shaped like `mem`.
    ///
    /// If `mem` is [`Dataspace::all`] and `file` has an explicit selection, the result is
    /// one-dimensional with one entry per selected point.
    pub fn read_with(&self, mem: &Dataspace, file: &Dataspace) -> H5xResult<ArrayD<T>> {
        let extent = self.space()?;
        let plan = self.plan(mem, file, &extent, None)?;
        let values = self.read_planned(&plan, mem, file, &extent)?;
        ArrayD::from_shape_vec(IxDyn(&plan.shape_usize()?), values)
            .map_err(|e| h5x_err!("buffer does not fit shape {:?}: {}", plan.shape, e))
    }

    /// Read the selection of `file` into `out`, which must already have the shape the transfer
    /// produces. A mismatch fails before anything is read.
    pub fn read_into<D: Dimension>(
        &self,
        mem: &Dataspace,
        file: &Dataspace,
        out: &mut ndarray::Array<T, D>,
    ) -> H5xResult<()> {
        let extent = self.space()?;
        let plan = self.plan(mem, file, &extent, Some(&shape_of(out.shape())))?;
        check_shape(&plan.shape, out.shape())?;
        let values = self.read_planned(&plan, mem, file, &extent)?;
        out.iter_mut().zip(values).for_each(|(dst, src)| *dst = src);
        Ok(())
    }

    /// Overwrite the whole dataset. `data` must have the dataset's shape.
    pub fn write<S, D>(&self, data: &ArrayBase<S, D>) -> H5xResult<()>
    where
        S: Data<Elem = T>,
        D: Dimension,
    {
        self.write_with(Dataspace::all(), Dataspace::all(), data)
    }

    /// Write `data`, laid out as `mem`, into the selection of `file`.
    pub fn write_with<S, D>(
        &self,
        mem: &Dataspace,
        file: &Dataspace,
        data: &ArrayBase<S, D>,
    ) -> H5xResult<()>
    where
        S: Data<Elem = T>,
        D: Dimension,
    {
        let extent = self.space()?;
        let plan = self.plan(mem, file, &extent, Some(&shape_of(data.shape())))?;
        check_shape(&plan.shape, data.shape())?;
        // Logical (row-major) order, whatever the array's memory layout.
        let values = data.iter().cloned().collect_vec();
        let mem = plan.memory_space(mem);
        let transfer = self.transfer(mem, file, &extent, values.len());
        trace!(
            "writing {} {} elements to {}",
            values.len(),
            T::KIND,
            self.name
        );
        T::write_elements(&transfer, &values)
    }

    /// Read the element at `index`.
    ///
    /// Fails with [`H5xError::SelectionInvalid`] without transferring anything if the index lies
    /// outside the extent.
    pub fn get(&self, index: &[u64]) -> H5xResult<T> {
        let (file, mem) = self.point(index)?;
        let transfer = self.transfer(&mem, &file, &file, 1);
        trace!("reading {} element {:?} of {}", T::KIND, index, self.name);
        T::read_elements(&transfer)?
            .into_iter()
            .next()
            .ok_or_else(|| h5x_err!("read of {:?} produced no element", index))
    }

    /// Overwrite the element at `index`.
    pub fn set(&self, index: &[u64], value: T) -> H5xResult<()> {
        let (file, mem) = self.point(index)?;
        let transfer = self.transfer(&mem, &file, &file, 1);
        trace!("writing {} element {:?} of {}", T::KIND, index, self.name);
        T::write_elements(&transfer, &[value])
    }

    /// Read the only element of a one-element dataset.
    pub fn read_scalar(&self) -> H5xResult<T> {
        let dims = self.ensure_scalar()?;
        self.get(&vec![0; dims.len()])
    }

    /// Overwrite the only element of a one-element dataset.
    pub fn write_scalar(&self, value: T) -> H5xResult<()> {
        let dims = self.ensure_scalar()?;
        self.set(&vec![0; dims.len()], value)
    }

    /// Close the dataset. Idempotent.
    pub fn close(&mut self) -> H5xResult<()> {
        self.datatype.close()?;
        self.handle.close()
    }

    fn ensure_scalar(&self) -> H5xResult<Vec<u64>> {
        let dims = self.dimensions()?;
        if dims.iter().product::<u64>() != 1 {
            return Err(H5xError::ShapeMismatch {
                expected: dims,
                actual: vec![1],
            });
        }
        Ok(dims)
    }

    /// A one-point file selection at `index` and the one-element memory space to go with it.
    fn point(&self, index: &[u64]) -> H5xResult<(Dataspace, Dataspace)> {
        let mut file = self.space()?;
        file.select_hyperslab(SelectOp::Set, index, None, &vec![1; index.len()], None)?;
        if !file.is_selection_valid()? {
            h5x_bail!(
                SelectionInvalid: "index {:?} is outside dataset {} of extent {:?}",
                index,
                self.name,
                file.dimensions()?
            );
        }
        Ok((file, Dataspace::new(&self.lib, &[1])?))
    }

    fn plan(
        &self,
        mem: &Dataspace,
        file: &Dataspace,
        extent: &Dataspace,
        hint: Option<&[u64]>,
    ) -> H5xResult<MemoryPlan> {
        if !mem.is_all() {
            return Ok(MemoryPlan {
                shape: mem.dimensions()?,
                synthesized: None,
            });
        }
        if file.is_all() {
            return Ok(MemoryPlan {
                shape: extent.dimensions()?,
                synthesized: None,
            });
        }
        file.ensure_selection_valid()?;
        let points = file.selected_points()?;
        let shape = match hint {
            Some(hint) if hint.iter().product::<u64>() == points => hint.to_vec(),
            _ => vec![points],
        };
        let synthesized = Dataspace::new(&self.lib, &shape)?;
        Ok(MemoryPlan {
            shape,
            synthesized: Some(synthesized),
        })
    }

    fn read_planned(
        &self,
        plan: &MemoryPlan,
        mem: &Dataspace,
        file: &Dataspace,
        extent: &Dataspace,
    ) -> H5xResult<Vec<T>> {
        let len = plan.len()?;
        let transfer = self.transfer(plan.memory_space(mem), file, extent, len);
        trace!("reading {len} {} elements from {}", T::KIND, self.name);
        T::read_elements(&transfer)
    }

    fn transfer<'a>(
        &'a self,
        mem: &'a Dataspace,
        file: &'a Dataspace,
        extent: &'a Dataspace,
        len: usize,
    ) -> Transfer<'a> {
        Transfer::new(
            &self.lib,
            Target::Dataset(self.handle.id()),
            &self.datatype,
            mem,
            file,
            extent,
            len,
        )
    }
}

impl<T: H5Element> Object for Dataset<T> {
    fn handle(&self) -> &Handle {
        &self.handle
    }

    fn library(&self) -> &Library {
        &self.lib
    }
}

/// The memory side of one transfer: the shape of the buffer and, when the caller passed
/// [`Dataspace::all`] against an explicit file selection, the compact space built for it.
struct MemoryPlan {
    shape: Vec<u64>,
    synthesized: Option<Dataspace>,
}

impl MemoryPlan {
    fn len(&self) -> H5xResult<usize> {
        usize::try_from(self.shape.iter().product::<u64>())
            .map_err(|_| h5x_err!("{:?} elements do not fit in memory", self.shape))
    }

    fn shape_usize(&self) -> H5xResult<Vec<usize>> {
        self.shape
            .iter()
            .map(|d| usize::try_from(*d).map_err(|_| h5x_err!("dimension {} is too large", d)))
            .collect()
    }

    /// The space handed to the engine on the memory side.
    fn memory_space<'a>(&'a self, given: &'a Dataspace) -> &'a Dataspace {
        self.synthesized.as_ref().unwrap_or(given)
    }
}

fn shape_of(shape: &[usize]) -> Vec<u64> {
    shape.iter().map(|d| *d as u64).collect()
}

fn check_shape(expected: &[u64], actual: &[usize]) -> H5xResult<()> {
    let actual = shape_of(actual);
    if expected != actual.as_slice() {
        return Err(H5xError::ShapeMismatch {
            expected: expected.to_vec(),
            actual,
        });
    }
    Ok(())
}
