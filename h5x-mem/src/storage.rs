use std::collections::BTreeMap;

use h5x_error::{H5xResult, h5x_bail};

use crate::convert::Value;
use crate::space::Space;
use crate::typedef::TypeDef;

/// The contents of a dataset or attribute.
#[derive(Debug, Clone)]
pub(crate) struct Stored {
    pub(crate) ty: TypeDef,
    pub(crate) space: Space,
    pub(crate) values: Vec<Value>,
}

impl Stored {
    pub(crate) fn new(ty: TypeDef, mut space: Space) -> Self {
        space.select_all();
        let values = vec![Value::fill(&ty); space.extent_points() as usize];
        Self { ty, space, values }
    }
}

pub(crate) type Attributes = BTreeMap<String, Stored>;

#[derive(Debug, Clone)]
pub(crate) struct DatasetNode {
    pub(crate) data: Stored,
    pub(crate) attrs: Attributes,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Group(GroupNode),
    Dataset(DatasetNode),
}

/// A group and, for the root group, a whole file.
#[derive(Debug, Clone, Default)]
pub(crate) struct GroupNode {
    children: BTreeMap<String, Node>,
    pub(crate) attrs: Attributes,
}

/// Resolve `name` relative to the group at `base`. Leading slashes make the name absolute.
pub(crate) fn resolve(base: &[String], name: &str) -> H5xResult<Vec<String>> {
    if name.is_empty() {
        h5x_bail!("empty object name");
    }
    let mut path = if name.starts_with('/') {
        Vec::new()
    } else {
        base.to_vec()
    };
    for part in name.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if part == ".." {
            h5x_bail!("parent references are not supported in `{}`", name);
        }
        path.push(part.to_string());
    }
    Ok(path)
}

impl GroupNode {
    fn node(&self, path: &[String]) -> Option<&Node> {
        let (last, parent) = path.split_last()?;
        self.group(parent)?.children.get(last)
    }

    fn node_mut(&mut self, path: &[String]) -> Option<&mut Node> {
        let (last, parent) = path.split_last()?;
        self.group_mut(parent)?.children.get_mut(last)
    }

    pub(crate) fn group(&self, path: &[String]) -> Option<&GroupNode> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => match self.children.get(first)? {
                Node::Group(group) => group.group(rest),
                Node::Dataset(_) => None,
            },
        }
    }

    pub(crate) fn group_mut(&mut self, path: &[String]) -> Option<&mut GroupNode> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => match self.children.get_mut(first)? {
                Node::Group(group) => group.group_mut(rest),
                Node::Dataset(_) => None,
            },
        }
    }

    pub(crate) fn dataset(&self, path: &[String]) -> Option<&DatasetNode> {
        match self.node(path)? {
            Node::Dataset(dataset) => Some(dataset),
            Node::Group(_) => None,
        }
    }

    pub(crate) fn dataset_mut(&mut self, path: &[String]) -> Option<&mut DatasetNode> {
        match self.node_mut(path)? {
            Node::Dataset(dataset) => Some(dataset),
            Node::Group(_) => None,
        }
    }

    pub(crate) fn exists(&self, path: &[String]) -> bool {
        path.is_empty() || self.node(path).is_some()
    }

    /// Link a new node at `path`. The parent group must exist and the name must be free.
    pub(crate) fn insert(&mut self, path: &[String], node: Node) -> H5xResult<()> {
        let Some((last, parent)) = path.split_last() else {
            h5x_bail!("cannot replace the root group");
        };
        let Some(group) = self.group_mut(parent) else {
            h5x_bail!("parent group `/{}` does not exist", parent.join("/"));
        };
        if group.children.contains_key(last) {
            h5x_bail!("`/{}` already exists", path.join("/"));
        }
        group.children.insert(last.clone(), node);
        Ok(())
    }

    /// Attributes of the group or dataset at `path`.
    pub(crate) fn attrs(&self, path: &[String]) -> Option<&Attributes> {
        if path.is_empty() {
            return Some(&self.attrs);
        }
        match self.node(path)? {
            Node::Group(group) => Some(&group.attrs),
            Node::Dataset(dataset) => Some(&dataset.attrs),
        }
    }

    pub(crate) fn attrs_mut(&mut self, path: &[String]) -> Option<&mut Attributes> {
        if path.is_empty() {
            return Some(&mut self.attrs);
        }
        match self.node_mut(path)? {
            Node::Group(group) => Some(&mut group.attrs),
            Node::Dataset(dataset) => Some(&mut dataset.attrs),
        }
    }
}
