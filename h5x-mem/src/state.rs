use std::collections::HashMap;

use enum_iterator::all;
use h5x_error::{H5xResult, h5x_bail, h5x_err};
use h5x_sys::{H5F_ACC_EXCL, H5F_ACC_RDWR, H5F_ACC_TRUNC, H5S_ALL, H5T_builtin, hid_t};
use log::debug;

use crate::convert::convert;
use crate::raw::{self, Ledger};
use crate::space::Space;
use crate::storage::{DatasetNode, GroupNode, Node, Stored, resolve};
use crate::typedef::TypeDef;

/// Something a handle refers to.
#[derive(Debug, Clone)]
pub(crate) enum Object {
    Type { def: TypeDef, builtin: bool },
    Space(Space),
    File(Location),
    Group(Location),
    Dataset(Location),
    Attr { owner: Location, name: String },
}

/// A path inside a named file, and whether it was reached through a writable file handle.
#[derive(Debug, Clone)]
pub(crate) struct Location {
    pub(crate) file: String,
    pub(crate) path: Vec<String>,
    pub(crate) writable: bool,
}

impl Location {
    fn child(&self, name: &str) -> H5xResult<Location> {
        Ok(Location {
            file: self.file.clone(),
            path: resolve(&self.path, name)?,
            writable: self.writable,
        })
    }
}

#[derive(Debug)]
pub(crate) struct State {
    next_id: hid_t,
    objects: HashMap<hid_t, Object>,
    builtins: HashMap<H5T_builtin, hid_t>,
    files: HashMap<String, GroupNode>,
    pub(crate) ledger: Ledger,
    pub(crate) failed_closes: usize,
}

impl State {
    pub(crate) fn new() -> Self {
        let mut state = Self {
            next_id: H5S_ALL + 1,
            objects: HashMap::new(),
            builtins: HashMap::new(),
            files: HashMap::new(),
            ledger: Ledger::default(),
            failed_closes: 0,
        };
        for which in all::<H5T_builtin>() {
            let id = state.register(Object::Type {
                def: TypeDef::builtin(which),
                builtin: true,
            });
            state.builtins.insert(which, id);
        }
        state
    }

    pub(crate) fn register(&mut self, object: Object) -> hid_t {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, object);
        id
    }

    pub(crate) fn builtin(&self, which: H5T_builtin) -> hid_t {
        self.builtins.get(&which).copied().unwrap_or(-1)
    }

    pub(crate) fn open_handles(&self) -> usize {
        self.objects
            .values()
            .filter(|o| !matches!(o, Object::Type { builtin: true, .. }))
            .count()
    }

    fn object(&self, id: hid_t) -> H5xResult<&Object> {
        match self.objects.get(&id) {
            Some(object) => Ok(object),
            None => h5x_bail!("invalid handle {}", id),
        }
    }

    pub(crate) fn type_def(&self, id: hid_t) -> H5xResult<&TypeDef> {
        match self.object(id)? {
            Object::Type { def, .. } => Ok(def),
            other => h5x_bail!("handle {} is not a type: {:?}", id, other),
        }
    }

    /// A type that may be modified: not predefined.
    pub(crate) fn type_def_mut(&mut self, id: hid_t) -> H5xResult<&mut TypeDef> {
        match self.objects.get_mut(&id) {
            Some(Object::Type {
                def,
                builtin: false,
            }) => Ok(def),
            Some(Object::Type { builtin: true, .. }) => {
                h5x_bail!("predefined type {} is immutable", id)
            }
            _ => h5x_bail!("handle {} is not a type", id),
        }
    }

    pub(crate) fn space(&self, id: hid_t) -> H5xResult<&Space> {
        match self.object(id)? {
            Object::Space(space) => Ok(space),
            other => h5x_bail!("handle {} is not a dataspace: {:?}", id, other),
        }
    }

    pub(crate) fn space_mut(&mut self, id: hid_t) -> H5xResult<&mut Space> {
        match self.objects.get_mut(&id) {
            Some(Object::Space(space)) => Ok(space),
            _ => h5x_bail!("handle {} is not a dataspace", id),
        }
    }

    /// Remove a handle if `accept` says it has the right kind. Failed closes are counted.
    pub(crate) fn close(&mut self, id: hid_t, accept: impl Fn(&Object) -> bool) -> H5xResult<()> {
        let closable = match self.objects.get(&id) {
            Some(Object::Type { builtin: true, .. }) => false,
            Some(object) => accept(object),
            None => false,
        };
        if !closable {
            self.failed_closes += 1;
            h5x_bail!("handle {} cannot be closed here", id);
        }
        self.objects.remove(&id);
        Ok(())
    }

    // Files and groups.

    pub(crate) fn file_create(&mut self, name: &str, flags: u32) -> H5xResult<hid_t> {
        if self.files.contains_key(name) && (flags & H5F_ACC_TRUNC == 0 || flags & H5F_ACC_EXCL != 0)
        {
            h5x_bail!("file `{}` already exists", name);
        }
        debug!("creating file {name}");
        self.files.insert(name.to_string(), GroupNode::default());
        Ok(self.register(Object::File(Location {
            file: name.to_string(),
            path: Vec::new(),
            writable: true,
        })))
    }

    pub(crate) fn file_open(&mut self, name: &str, flags: u32) -> H5xResult<hid_t> {
        if !self.files.contains_key(name) {
            h5x_bail!("file `{}` does not exist", name);
        }
        Ok(self.register(Object::File(Location {
            file: name.to_string(),
            path: Vec::new(),
            writable: flags & H5F_ACC_RDWR != 0,
        })))
    }

    /// The group-like location behind a file or group handle.
    fn container(&self, id: hid_t) -> H5xResult<&Location> {
        match self.object(id)? {
            Object::File(location) | Object::Group(location) => Ok(location),
            other => h5x_bail!("handle {} is not a file or group: {:?}", id, other),
        }
    }

    /// Any location that can carry attributes.
    fn attributable(&self, id: hid_t) -> H5xResult<&Location> {
        match self.object(id)? {
            Object::File(location) | Object::Group(location) | Object::Dataset(location) => {
                Ok(location)
            }
            other => h5x_bail!("handle {} cannot carry attributes: {:?}", id, other),
        }
    }

    fn root(&self, file: &str) -> H5xResult<&GroupNode> {
        match self.files.get(file) {
            Some(root) => Ok(root),
            None => h5x_bail!("file `{}` does not exist", file),
        }
    }

    fn writable_root(&mut self, location: &Location) -> H5xResult<&mut GroupNode> {
        if !location.writable {
            h5x_bail!("file `{}` is open read-only", location.file);
        }
        match self.files.get_mut(&location.file) {
            Some(root) => Ok(root),
            None => h5x_bail!("file `{}` does not exist", location.file),
        }
    }

    pub(crate) fn group_create(&mut self, loc: hid_t, name: &str) -> H5xResult<hid_t> {
        let location = self.container(loc)?.child(name)?;
        self.writable_root(&location)?
            .insert(&location.path, Node::Group(GroupNode::default()))?;
        Ok(self.register(Object::Group(location)))
    }

    pub(crate) fn group_open(&mut self, loc: hid_t, name: &str) -> H5xResult<hid_t> {
        let location = self.container(loc)?.child(name)?;
        if self.root(&location.file)?.group(&location.path).is_none() {
            h5x_bail!("group `/{}` does not exist", location.path.join("/"));
        }
        Ok(self.register(Object::Group(location)))
    }

    pub(crate) fn link_exists(&self, loc: hid_t, name: &str) -> H5xResult<bool> {
        let location = self.container(loc)?.child(name)?;
        Ok(self.root(&location.file)?.exists(&location.path))
    }

    // Datasets.

    pub(crate) fn dataset_create(
        &mut self,
        loc: hid_t,
        name: &str,
        ty: hid_t,
        space: hid_t,
    ) -> H5xResult<hid_t> {
        let location = self.container(loc)?.child(name)?;
        let data = Stored::new(self.type_def(ty)?.clone(), self.space(space)?.clone());
        debug!(
            "creating dataset /{} in {} with {} elements",
            location.path.join("/"),
            location.file,
            data.values.len()
        );
        self.writable_root(&location)?.insert(
            &location.path,
            Node::Dataset(DatasetNode {
                data,
                attrs: Default::default(),
            }),
        )?;
        Ok(self.register(Object::Dataset(location)))
    }

    pub(crate) fn dataset_open(&mut self, loc: hid_t, name: &str) -> H5xResult<hid_t> {
        let location = self.container(loc)?.child(name)?;
        if self.root(&location.file)?.dataset(&location.path).is_none() {
            h5x_bail!("dataset `/{}` does not exist", location.path.join("/"));
        }
        Ok(self.register(Object::Dataset(location)))
    }

    fn stored(&self, id: hid_t) -> H5xResult<&Stored> {
        match self.object(id)? {
            Object::Dataset(location) => self
                .root(&location.file)?
                .dataset(&location.path)
                .map(|d| &d.data)
                .ok_or_else(|| h5x_err!("dataset {} no longer exists", id)),
            Object::Attr { owner, name } => self
                .root(&owner.file)?
                .attrs(&owner.path)
                .and_then(|attrs| attrs.get(name))
                .ok_or_else(|| h5x_err!("attribute `{}` no longer exists", name)),
            other => h5x_bail!("handle {} holds no data: {:?}", id, other),
        }
    }

    fn stored_mut(&mut self, id: hid_t) -> H5xResult<&mut Stored> {
        let object = self.object(id)?.clone();
        match object {
            Object::Dataset(location) => self
                .writable_root(&location)?
                .dataset_mut(&location.path)
                .map(|d| &mut d.data)
                .ok_or_else(|| h5x_err!("dataset {} no longer exists", id)),
            Object::Attr { owner, name } => self
                .writable_root(&owner)?
                .attrs_mut(&owner.path)
                .and_then(|attrs| attrs.get_mut(&name))
                .ok_or_else(|| h5x_err!("attribute `{}` no longer exists", name)),
            other => h5x_bail!("handle {} holds no data: {:?}", id, other),
        }
    }

    pub(crate) fn get_type(&mut self, id: hid_t) -> H5xResult<hid_t> {
        let def = self.stored(id)?.ty.clone();
        Ok(self.register(Object::Type {
            def,
            builtin: false,
        }))
    }

    pub(crate) fn get_space(&mut self, id: hid_t) -> H5xResult<hid_t> {
        let space = self.stored(id)?.space.clone();
        Ok(self.register(Object::Space(space)))
    }

    /// The memory and file dataspaces of a transfer, checked against each other.
    fn transfer_spaces(
        &self,
        extent: &Space,
        mem_space: hid_t,
        file_space: hid_t,
    ) -> H5xResult<(Space, Space)> {
        let file = if file_space == H5S_ALL {
            extent.clone()
        } else {
            let space = self.space(file_space)?;
            if space.dims != extent.dims {
                h5x_bail!(
                    "file dataspace has extent {:?}, the data has {:?}",
                    space.dims,
                    extent.dims
                );
            }
            space.clone()
        };
        let mem = if mem_space == H5S_ALL {
            file.clone()
        } else {
            self.space(mem_space)?.clone()
        };
        if !file.is_valid() || !mem.is_valid() {
            h5x_bail!("selection reaches outside its dataspace");
        }
        if file.npoints() != mem.npoints() {
            h5x_bail!(
                "memory selection has {} points, file selection has {}",
                mem.npoints(),
                file.npoints()
            );
        }
        Ok((mem, file))
    }

    /// # Safety
    ///
    /// `buf` must cover the extent of the memory space in elements of `mem_type`.
    pub(crate) unsafe fn read(
        &mut self,
        id: hid_t,
        mem_type: hid_t,
        mem_space: hid_t,
        file_space: hid_t,
        buf: *mut u8,
    ) -> H5xResult<()> {
        let mem_ty = self.type_def(mem_type)?.clone();
        let stored = self.stored(id)?;
        let (mem, file) = self.transfer_spaces(&stored.space, mem_space, file_space)?;
        let values = file
            .selected()
            .iter()
            .map(|p| convert(&stored.values[file.linear_index(p)], &stored.ty, &mem_ty))
            .collect::<H5xResult<Vec<_>>>()?;

        let step = mem_ty.size();
        let points = mem.selected();
        for (done, (point, value)) in points.iter().zip(&values).enumerate() {
            // SAFETY: every selected memory point lies inside the extent the caller covered.
            let dst = unsafe { buf.add(mem.linear_index(point) * step) };
            // SAFETY: as above.
            if let Err(e) = unsafe { raw::encode(value, &mem_ty, dst, &mut self.ledger) } {
                for point in &points[..done] {
                    // SAFETY: these elements were just written by `encode`.
                    unsafe {
                        raw::reclaim(
                            buf.add(mem.linear_index(point) * step),
                            &mem_ty,
                            &mut self.ledger,
                        )?
                    };
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// # Safety
    ///
    /// `buf` must cover the extent of the memory space in elements of `mem_type`.
    pub(crate) unsafe fn write(
        &mut self,
        id: hid_t,
        mem_type: hid_t,
        mem_space: hid_t,
        file_space: hid_t,
        buf: *const u8,
    ) -> H5xResult<()> {
        let mem_ty = self.type_def(mem_type)?.clone();
        let stored = self.stored(id)?;
        let (mem, file) = self.transfer_spaces(&stored.space, mem_space, file_space)?;
        let step = mem_ty.size();
        let values = mem
            .selected()
            .iter()
            .map(|p| {
                // SAFETY: every selected memory point lies inside the extent the caller covered.
                let value = unsafe { raw::decode(buf.add(mem.linear_index(p) * step), &mem_ty)? };
                convert(&value, &mem_ty, &stored.ty)
            })
            .collect::<H5xResult<Vec<_>>>()?;

        let stored = self.stored_mut(id)?;
        for (point, value) in file.selected().iter().zip(values) {
            let index = file.linear_index(point);
            stored.values[index] = value;
        }
        Ok(())
    }

    /// # Safety
    ///
    /// `buf` must cover the extent of `space` in elements of `ty`.
    pub(crate) unsafe fn vlen_reclaim(
        &mut self,
        ty: hid_t,
        space: hid_t,
        buf: *mut u8,
    ) -> H5xResult<()> {
        let def = self.type_def(ty)?.clone();
        let space = self.space(space)?.clone();
        if !space.is_valid() {
            h5x_bail!("selection reaches outside its dataspace");
        }
        if !def.is_variable() {
            return Ok(());
        }
        let step = def.size();
        for point in space.selected() {
            // SAFETY: the point lies inside the extent the caller covered.
            unsafe {
                raw::reclaim(
                    buf.add(space.linear_index(&point) * step),
                    &def,
                    &mut self.ledger,
                )?
            };
        }
        Ok(())
    }

    // Attributes.

    pub(crate) fn attr_create(
        &mut self,
        obj: hid_t,
        name: &str,
        ty: hid_t,
        space: hid_t,
    ) -> H5xResult<hid_t> {
        let owner = self.attributable(obj)?.clone();
        let data = Stored::new(self.type_def(ty)?.clone(), self.space(space)?.clone());
        let Some(attrs) = self.writable_root(&owner)?.attrs_mut(&owner.path) else {
            h5x_bail!("object `/{}` does not exist", owner.path.join("/"));
        };
        if attrs.contains_key(name) {
            h5x_bail!("attribute `{}` already exists", name);
        }
        attrs.insert(name.to_string(), data);
        Ok(self.register(Object::Attr {
            owner,
            name: name.to_string(),
        }))
    }

    pub(crate) fn attr_open(&mut self, obj: hid_t, name: &str) -> H5xResult<hid_t> {
        let owner = self.attributable(obj)?.clone();
        let exists = self
            .root(&owner.file)?
            .attrs(&owner.path)
            .is_some_and(|attrs| attrs.contains_key(name));
        if !exists {
            h5x_bail!("attribute `{}` does not exist", name);
        }
        Ok(self.register(Object::Attr {
            owner,
            name: name.to_string(),
        }))
    }
}
