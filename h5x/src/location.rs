//! Files, groups and the traits that let datasets and attributes hang off of them.

use h5x_error::H5xResult;
use h5x_sys::{H5F_ACC_EXCL, H5F_ACC_RDONLY, H5F_ACC_RDWR, H5F_ACC_TRUNC, hid_t};
use log::debug;

use crate::attribute::Attribute;
use crate::dataset::Dataset;
use crate::element::H5Element;
use crate::handle::{Handle, HandleKind, c_name, check_tri};
use crate::library::Library;

/// Anything backed by an engine handle that can carry attributes.
pub trait Object {
    /// The handle this object owns.
    fn handle(&self) -> &Handle;

    /// The library the object was created or opened through.
    fn library(&self) -> &Library;

    /// The raw engine id.
    fn id(&self) -> hid_t {
        self.handle().id()
    }

    /// Open the attribute `name` attached to this object.
    fn attribute<T: H5Element>(&self, name: &str) -> H5xResult<Attribute<T>>
    where
        Self: Sized,
    {
        Attribute::open(self, name)
    }
}

/// An object that contains named children: a file or a group.
///
/// Names are paths relative to the location, with `/` separating group levels.
pub trait Location: Object {
    /// Create a new group `name` below this location.
    fn create_group(&self, name: &str) -> H5xResult<Group> {
        let cname = c_name(name)?;
        let lib = self.library();
        let handle = Handle::owned(
            lib.engine(),
            HandleKind::Group,
            "H5Gcreate",
            lib.engine().group_create(self.id(), &cname),
        )?;
        debug!("created group {name}");
        Ok(Group::new(lib, handle, name))
    }

    /// Open the existing group `name` below this location.
    fn group(&self, name: &str) -> H5xResult<Group> {
        let cname = c_name(name)?;
        let lib = self.library();
        let handle = Handle::owned(
            lib.engine(),
            HandleKind::Group,
            "H5Gopen",
            lib.engine().group_open(self.id(), &cname),
        )?;
        debug!("opened group {name}");
        Ok(Group::new(lib, handle, name))
    }

    /// Whether a dataset or group `name` exists below this location.
    fn link_exists(&self, name: &str) -> H5xResult<bool> {
        let cname = c_name(name)?;
        check_tri(
            "H5Lexists",
            self.library().engine().link_exists(self.id(), &cname),
        )
    }

    /// Open the dataset `name` below this location.
    fn dataset<T: H5Element>(&self, name: &str) -> H5xResult<Dataset<T>>
    where
        Self: Sized,
    {
        Dataset::open(self, name)
    }
}

/// A container file.
#[derive(Debug)]
pub struct File {
    lib: Library,
    handle: Handle,
    path: String,
}

impl File {
    /// Create `path`, replacing any existing file.
    pub fn create(lib: &Library, path: &str) -> H5xResult<Self> {
        Self::acquire(lib, path, "H5Fcreate", H5F_ACC_TRUNC)
    }

    /// Create `path`, failing if it already exists.
    pub fn create_new(lib: &Library, path: &str) -> H5xResult<Self> {
        Self::acquire(lib, path, "H5Fcreate", H5F_ACC_EXCL)
    }

    /// Open an existing file for reading.
    pub fn open(lib: &Library, path: &str) -> H5xResult<Self> {
        Self::acquire(lib, path, "H5Fopen", H5F_ACC_RDONLY)
    }

    /// Open an existing file for reading and writing.
    pub fn open_rw(lib: &Library, path: &str) -> H5xResult<Self> {
        Self::acquire(lib, path, "H5Fopen", H5F_ACC_RDWR)
    }

    fn acquire(lib: &Library, path: &str, op: &'static str, flags: u32) -> H5xResult<Self> {
        let cpath = c_name(path)?;
        let engine = lib.engine();
        let id = if op == "H5Fcreate" {
            engine.file_create(&cpath, flags)
        } else {
            engine.file_open(&cpath, flags)
        };
        let handle = Handle::owned(engine, HandleKind::File, op, id)?;
        debug!("{op} {path} (flags {flags:#x})");
        Ok(Self {
            lib: lib.clone(),
            handle,
            path: path.to_owned(),
        })
    }

    /// The path the file was created or opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Close the file. Idempotent.
    pub fn close(&mut self) -> H5xResult<()> {
        self.handle.close()
    }
}

impl Object for File {
    fn handle(&self) -> &Handle {
        &self.handle
    }

    fn library(&self) -> &Library {
        &self.lib
    }
}

impl Location for File {}

/// A group inside a file.
#[derive(Debug)]
pub struct Group {
    lib: Library,
    handle: Handle,
    name: String,
}

impl Group {
    fn new(lib: &Library, handle: Handle, name: &str) -> Self {
        Self {
            lib: lib.clone(),
            handle,
            name: name.to_owned(),
        }
    }

    /// The path the group was opened with, relative to its parent.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Close the group. Idempotent.
    pub fn close(&mut self) -> H5xResult<()> {
        self.handle.close()
    }
}

impl Object for Group {
    fn handle(&self) -> &Handle {
        &self.handle
    }

    fn library(&self) -> &Library {
        &self.lib
    }
}

impl Location for Group {}
