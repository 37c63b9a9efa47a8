//! Dataspaces: the extent of an array region and an optional selection inside it.

use h5x_error::{H5xError, H5xResult, h5x_bail, h5x_err};
use h5x_sys::{H5S_ALL, H5S_UNLIMITED, H5S_seloper_t, hid_t, hsize_t};
use itertools::Itertools;

use crate::handle::{Handle, HandleKind, check_status, check_tri};
use crate::library::Library;

/// How a new hyperslab combines with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectOp {
    /// Replace the current selection.
    Set,
    /// Union.
    Or,
    /// Intersection.
    And,
    /// Symmetric difference.
    Xor,
    /// Points in the hyperslab that are not currently selected.
    NotA,
    /// Currently selected points that are not in the hyperslab.
    NotB,
}

impl From<SelectOp> for H5S_seloper_t {
    fn from(op: SelectOp) -> Self {
        match op {
            SelectOp::Set => H5S_seloper_t::H5S_SELECT_SET,
            SelectOp::Or => H5S_seloper_t::H5S_SELECT_OR,
            SelectOp::And => H5S_seloper_t::H5S_SELECT_AND,
            SelectOp::Xor => H5S_seloper_t::H5S_SELECT_XOR,
            SelectOp::NotA => H5S_seloper_t::H5S_SELECT_NOTA,
            SelectOp::NotB => H5S_seloper_t::H5S_SELECT_NOTB,
        }
    }
}

#[derive(Debug)]
enum Inner {
    All,
    Simple(Handle),
}

/// The extent of an array region, with an optional active selection.
///
/// [`Dataspace::all`] is the sentinel meaning "the whole extent of the object being transferred".
/// It is never created in or closed by the engine.
#[derive(Debug)]
pub struct Dataspace {
    inner: Inner,
}

static ALL: Dataspace = Dataspace { inner: Inner::All };

impl Dataspace {
    /// A simple dataspace with fixed dimensions.
    pub fn new(lib: &Library, dims: &[u64]) -> H5xResult<Self> {
        Self::create(lib, dims, None)
    }

    /// A simple dataspace whose dimensions may grow up to `maxdims`. Use [`UNLIMITED`] for an
    /// unbounded dimension.
    pub fn with_max_dimensions(lib: &Library, dims: &[u64], maxdims: &[u64]) -> H5xResult<Self> {
        Self::create(lib, dims, Some(maxdims))
    }

    fn create(lib: &Library, dims: &[u64], maxdims: Option<&[u64]>) -> H5xResult<Self> {
        if dims.is_empty() {
            h5x_bail!("a dataspace needs at least one dimension");
        }
        if let Some(maxdims) = maxdims {
            if maxdims.len() != dims.len() {
                h5x_bail!(
                    "{} maximum dimensions given for rank {}",
                    maxdims.len(),
                    dims.len()
                );
            }
            if let Some((d, m)) = dims
                .iter()
                .zip(maxdims)
                .find(|(d, m)| **m != UNLIMITED && m < d)
            {
                h5x_bail!("maximum dimension {} is smaller than dimension {}", m, d);
            }
        }
        let id = lib.engine().space_create_simple(dims, maxdims);
        Self::from_id(lib, "H5Screate_simple", id)
    }

    pub(crate) fn from_id(lib: &Library, op: &'static str, id: hid_t) -> H5xResult<Self> {
        Ok(Self {
            inner: Inner::Simple(Handle::owned(lib.engine(), HandleKind::Dataspace, op, id)?),
        })
    }

    /// The process-wide "whole extent" sentinel.
    pub fn all() -> &'static Dataspace {
        &ALL
    }

    /// Whether this is the [`Dataspace::all`] sentinel.
    pub fn is_all(&self) -> bool {
        matches!(self.inner, Inner::All)
    }

    /// The raw engine id, [`H5S_ALL`] for the sentinel.
    pub fn id(&self) -> hid_t {
        match &self.inner {
            Inner::All => H5S_ALL,
            Inner::Simple(handle) => handle.id(),
        }
    }

    fn handle(&self) -> H5xResult<&Handle> {
        match &self.inner {
            Inner::All => h5x_bail!("the All dataspace has no extent of its own"),
            Inner::Simple(handle) => Ok(handle),
        }
    }

    /// Number of dimensions.
    pub fn rank(&self) -> H5xResult<usize> {
        let handle = self.handle()?;
        let rank = handle.engine().space_get_ndims(handle.id());
        usize::try_from(rank).map_err(|_| h5x_err!(Native: "H5Sget_simple_extent_ndims", rank))
    }

    /// Current extent.
    pub fn dimensions(&self) -> H5xResult<Vec<u64>> {
        Ok(self.extent()?.0)
    }

    /// Maximum extent, [`UNLIMITED`] for unbounded dimensions.
    pub fn max_dimensions(&self) -> H5xResult<Vec<u64>> {
        Ok(self.extent()?.1)
    }

    fn extent(&self) -> H5xResult<(Vec<hsize_t>, Vec<hsize_t>)> {
        let handle = self.handle()?;
        let rank = self.rank()?;
        let mut dims = vec![0; rank];
        let mut maxdims = vec![0; rank];
        let status = handle
            .engine()
            .space_get_dims(handle.id(), &mut dims, Some(&mut maxdims));
        if status < 0 {
            return Err(h5x_err!(Native: "H5Sget_simple_extent_dims", status));
        }
        Ok((dims, maxdims))
    }

    /// Total number of points in the extent.
    pub fn extent_points(&self) -> H5xResult<u64> {
        Ok(self.dimensions()?.iter().product())
    }

    /// Combine a hyperslab with the current selection.
    ///
    /// `stride` defaults to 1 and `block` to 1 in every dimension. Every given vector must have
    /// one entry per dimension. The selection is not checked against the extent, use
    /// [`Dataspace::is_selection_valid`] for that.
    pub fn select_hyperslab(
        &mut self,
        op: SelectOp,
        start: &[u64],
        stride: Option<&[u64]>,
        count: &[u64],
        block: Option<&[u64]>,
    ) -> H5xResult<()> {
        let rank = self.rank()?;
        let lengths = [
            ("start", Some(start.len())),
            ("stride", stride.map(<[u64]>::len)),
            ("count", Some(count.len())),
            ("block", block.map(<[u64]>::len)),
        ];
        if let Some((name, len)) = lengths
            .iter()
            .filter_map(|(name, len)| len.map(|len| (name, len)))
            .find(|(_, len)| *len != rank)
        {
            h5x_bail!("hyperslab {} has {} entries for rank {}", name, len, rank);
        }

        let handle = self.handle()?;
        let status =
            handle
                .engine()
                .space_select_hyperslab(handle.id(), op.into(), start, stride, count, block);
        if status < 0 {
            return Err(H5xError::SelectionFailed {
                status: i64::from(status),
            });
        }
        Ok(())
    }

    /// Select the whole extent.
    pub fn select_all(&mut self) -> H5xResult<()> {
        let handle = self.handle()?;
        check_status("H5Sselect_all", handle.engine().space_select_all(handle.id()))
    }

    /// Select nothing.
    pub fn select_none(&mut self) -> H5xResult<()> {
        let handle = self.handle()?;
        check_status("H5Sselect_none", handle.engine().space_select_none(handle.id()))
    }

    /// Number of selected points.
    pub fn selected_points(&self) -> H5xResult<u64> {
        let handle = self.handle()?;
        let npoints = handle.engine().space_get_select_npoints(handle.id());
        u64::try_from(npoints).map_err(|_| h5x_err!(Native: "H5Sget_select_npoints", npoints))
    }

    /// Whether every selected point lies inside the extent. A `false` answer is not an error,
    /// but the selection must not be used for a transfer.
    pub fn is_selection_valid(&self) -> H5xResult<bool> {
        let handle = self.handle()?;
        check_tri(
            "H5Sselect_valid",
            handle.engine().space_select_valid(handle.id()),
        )
    }

    /// Fail with [`H5xError::SelectionInvalid`] unless the selection lies inside the extent.
    pub fn ensure_selection_valid(&self) -> H5xResult<()> {
        if self.is_all() || self.is_selection_valid()? {
            return Ok(());
        }
        Err(h5x_err!(
            SelectionInvalid: "selection of {} points reaches outside extent [{}]",
            self.selected_points()?,
            self.dimensions()?.iter().join(", ")
        ))
    }

    /// Close the dataspace. Idempotent, and a no-op for the sentinel.
    pub fn close(&mut self) -> H5xResult<()> {
        match &mut self.inner {
            Inner::All => Ok(()),
            Inner::Simple(handle) => handle.close(),
        }
    }
}

/// Marker for an unbounded maximum dimension.
pub const UNLIMITED: u64 = H5S_UNLIMITED;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use h5x_mem::MemoryEngine;
    use rstest::rstest;

    use super::*;

    fn library() -> (Arc<MemoryEngine>, Library) {
        let engine = Arc::new(MemoryEngine::new());
        (engine.clone(), Library::new(engine).unwrap())
    }

    #[test]
    fn extent_round_trips() {
        let (_, lib) = library();
        let space = Dataspace::with_max_dimensions(&lib, &[2, 3], &[4, UNLIMITED]).unwrap();
        assert_eq!(space.rank().unwrap(), 2);
        assert_eq!(space.dimensions().unwrap(), vec![2, 3]);
        assert_eq!(space.max_dimensions().unwrap(), vec![4, UNLIMITED]);
        assert_eq!(space.selected_points().unwrap(), 6);
    }

    #[rstest]
    #[case(&[], None)]
    #[case(&[2, 3], Some(&[2][..]))]
    #[case(&[5], Some(&[4][..]))]
    fn malformed_extents_are_rejected(#[case] dims: &[u64], #[case] maxdims: Option<&[u64]>) {
        let (engine, lib) = library();
        assert!(Dataspace::create(&lib, dims, maxdims).is_err());
        assert_eq!(engine.open_handles(), 0);
    }

    #[test]
    fn all_is_never_created_or_closed() {
        let (engine, _) = library();
        let all = Dataspace::all();
        assert!(all.is_all());
        assert_eq!(all.id(), H5S_ALL);
        assert!(all.dimensions().is_err());
        assert_eq!(engine.open_handles(), 0);
        assert!(std::ptr::eq(all, Dataspace::all()));
    }

    #[test]
    fn selections_compose() {
        let (_, lib) = library();
        let mut space = Dataspace::new(&lib, &[4, 4]).unwrap();
        space
            .select_hyperslab(SelectOp::Set, &[0, 0], None, &[2, 4], None)
            .unwrap();
        assert_eq!(space.selected_points().unwrap(), 8);
        space
            .select_hyperslab(SelectOp::And, &[0, 0], None, &[4, 1], None)
            .unwrap();
        assert_eq!(space.selected_points().unwrap(), 2);
        space
            .select_hyperslab(SelectOp::Or, &[0, 1], Some(&[2, 2]), &[2, 2], None)
            .unwrap();
        assert_eq!(space.selected_points().unwrap(), 6);
        space.select_none().unwrap();
        assert_eq!(space.selected_points().unwrap(), 0);
        space.select_all().unwrap();
        assert_eq!(space.selected_points().unwrap(), 16);
    }

    #[test]
    fn rank_mismatch_is_an_argument_error() {
        let (_, lib) = library();
        let mut space = Dataspace::new(&lib, &[4, 4]).unwrap();
        let err = space
            .select_hyperslab(SelectOp::Set, &[0], None, &[1, 1], None)
            .unwrap_err();
        assert!(matches!(err, H5xError::InvalidArgument(..)));
        let err = space
            .select_hyperslab(SelectOp::Set, &[0, 0], Some(&[1]), &[1, 1], None)
            .unwrap_err();
        assert!(matches!(err, H5xError::InvalidArgument(..)));
    }

    #[test]
    fn zero_stride_is_a_native_failure() {
        let (_, lib) = library();
        let mut space = Dataspace::new(&lib, &[4]).unwrap();
        let err = space
            .select_hyperslab(SelectOp::Set, &[0], Some(&[0]), &[2], None)
            .unwrap_err();
        assert!(matches!(err, H5xError::SelectionFailed { .. }));
    }

    #[test]
    fn out_of_range_selection_is_reported_not_raised() {
        let (_, lib) = library();
        let mut space = Dataspace::new(&lib, &[4]).unwrap();
        space
            .select_hyperslab(SelectOp::Set, &[4], None, &[1], None)
            .unwrap();
        assert!(!space.is_selection_valid().unwrap());
        assert!(matches!(
            space.ensure_selection_valid(),
            Err(H5xError::SelectionInvalid(_))
        ));
    }
}
