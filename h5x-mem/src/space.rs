use std::collections::BTreeSet;

use h5x_error::{H5xExpect, H5xResult, h5x_bail, h5x_err};
use h5x_sys::{H5S_UNLIMITED, H5S_seloper_t, hsize_t};
use itertools::Itertools;

/// A set of selected coordinates. Iteration order is row-major.
pub(crate) type Points = BTreeSet<Vec<hsize_t>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selection {
    All,
    Points(Points),
}

/// A simple dataspace: an extent plus a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Space {
    pub(crate) dims: Vec<hsize_t>,
    pub(crate) maxdims: Vec<hsize_t>,
    pub(crate) selection: Selection,
}

impl Space {
    pub(crate) fn new(dims: &[hsize_t], maxdims: Option<&[hsize_t]>) -> H5xResult<Self> {
        if dims.is_empty() {
            h5x_bail!("a simple dataspace needs at least one dimension");
        }
        let maxdims = match maxdims {
            None => dims.to_vec(),
            Some(maxdims) => {
                if maxdims.len() != dims.len() {
                    h5x_bail!(
                        "maximum dimensions have rank {}, dimensions have rank {}",
                        maxdims.len(),
                        dims.len()
                    );
                }
                if let Some((d, m)) = dims
                    .iter()
                    .zip(maxdims)
                    .find(|&(d, m)| *m != H5S_UNLIMITED && m < d)
                {
                    h5x_bail!("maximum dimension {} is smaller than dimension {}", m, d);
                }
                maxdims.to_vec()
            }
        };
        Ok(Self {
            dims: dims.to_vec(),
            maxdims,
            selection: Selection::All,
        })
    }

    pub(crate) fn rank(&self) -> usize {
        self.dims.len()
    }

    pub(crate) fn extent_points(&self) -> u64 {
        self.dims.iter().product()
    }

    /// Row-major linear index of a coordinate.
    pub(crate) fn linear_index(&self, point: &[hsize_t]) -> usize {
        let index = point
            .iter()
            .zip(&self.dims)
            .fold(0u64, |acc, (p, d)| acc * d + p);
        // Stored values live in a Vec of the extent's length.
        usize::try_from(index).ok().h5x_expect("linear index exceeds the address space")
    }

    /// Number of selected points.
    pub(crate) fn npoints(&self) -> u64 {
        match &self.selection {
            Selection::All => self.extent_points(),
            Selection::Points(points) => points.len() as u64,
        }
    }

    /// Whether every selected point lies inside the extent.
    pub(crate) fn is_valid(&self) -> bool {
        match &self.selection {
            Selection::All => true,
            Selection::Points(points) => points
                .iter()
                .all(|p| p.iter().zip(&self.dims).all(|(c, d)| c < d)),
        }
    }

    /// The selected coordinates in row-major order.
    pub(crate) fn selected(&self) -> Vec<Vec<hsize_t>> {
        match &self.selection {
            Selection::All => self
                .dims
                .iter()
                .map(|&d| 0..d)
                .multi_cartesian_product()
                .collect(),
            Selection::Points(points) => points.iter().cloned().collect(),
        }
    }

    fn selected_set(&self) -> Points {
        match &self.selection {
            Selection::All => self.selected().into_iter().collect(),
            Selection::Points(points) => points.clone(),
        }
    }

    pub(crate) fn select_all(&mut self) {
        self.selection = Selection::All;
    }

    pub(crate) fn select_none(&mut self) {
        self.selection = Selection::Points(Points::new());
    }

    pub(crate) fn select_hyperslab(
        &mut self,
        op: H5S_seloper_t,
        start: &[hsize_t],
        stride: Option<&[hsize_t]>,
        count: &[hsize_t],
        block: Option<&[hsize_t]>,
    ) -> H5xResult<()> {
        let rank = self.rank();
        let ones = vec![1; rank];
        let stride = stride.unwrap_or(&ones);
        let block = block.unwrap_or(&ones);
        if start.len() != rank || stride.len() != rank || count.len() != rank || block.len() != rank
        {
            h5x_bail!("hyperslab parameters must have rank {}", rank);
        }
        for i in 0..rank {
            if stride[i] == 0 {
                h5x_bail!("stride in dimension {} is zero", i);
            }
            if count[i] > 1 && block[i] > stride[i] {
                h5x_bail!(
                    "blocks of {} overlap with stride {} in dimension {}",
                    block[i],
                    stride[i],
                    i
                );
            }
        }

        // Blocks never overlap, so a slab with more points than the extent cannot be valid.
        let points = count
            .iter()
            .zip(block)
            .try_fold(1u64, |acc, (c, b)| acc.checked_mul(*c)?.checked_mul(*b));
        let limit = self
            .dims
            .iter()
            .try_fold(1u64, |acc, d| acc.checked_mul(*d))
            .unwrap_or(u64::MAX);
        let slab: Points = match points {
            Some(0) => Points::new(),
            Some(points) if points <= limit => (0..rank)
                .map(|i| slab_coordinates(start[i], stride[i], count[i], block[i]))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| h5x_err!("hyperslab coordinates overflow"))?
                .into_iter()
                .multi_cartesian_product()
                .collect(),
            _ => h5x_bail!(
                "hyperslab selects more points than the extent {:?} holds",
                self.dims
            ),
        };

        let current = self.selected_set();
        let combined = match op {
            H5S_seloper_t::H5S_SELECT_SET => slab,
            H5S_seloper_t::H5S_SELECT_OR => &current | &slab,
            H5S_seloper_t::H5S_SELECT_AND => &current & &slab,
            H5S_seloper_t::H5S_SELECT_XOR => &current ^ &slab,
            H5S_seloper_t::H5S_SELECT_NOTB => &current - &slab,
            H5S_seloper_t::H5S_SELECT_NOTA => &slab - &current,
            H5S_seloper_t::H5S_SELECT_NOOP => h5x_bail!("no selection operation given"),
        };
        self.selection = Selection::Points(combined);
        Ok(())
    }
}

/// The coordinates a hyperslab covers along one dimension, `None` on overflow.
fn slab_coordinates(start: u64, stride: u64, count: u64, block: u64) -> Option<Vec<u64>> {
    let mut coordinates = Vec::new();
    for c in 0..count {
        let base = c.checked_mul(stride)?.checked_add(start)?;
        for b in 0..block {
            coordinates.push(base.checked_add(b)?);
        }
    }
    Some(coordinates)
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    fn slab(space: &mut Space, op: H5S_seloper_t, start: &[u64], count: &[u64]) {
        space.select_hyperslab(op, start, None, count, None).unwrap();
    }

    #[test]
    fn row_selection() {
        let mut space = Space::new(&[4, 4], None).unwrap();
        slab(&mut space, H5S_seloper_t::H5S_SELECT_SET, &[2, 1], &[1, 3]);
        assert_eq!(space.selected(), vec![vec![2, 1], vec![2, 2], vec![2, 3]]);
        assert_eq!(space.npoints(), 3);
        assert!(space.is_valid());
    }

    #[rstest]
    #[case(H5S_seloper_t::H5S_SELECT_OR, 6)]
    #[case(H5S_seloper_t::H5S_SELECT_AND, 2)]
    #[case(H5S_seloper_t::H5S_SELECT_XOR, 4)]
    #[case(H5S_seloper_t::H5S_SELECT_NOTB, 2)]
    #[case(H5S_seloper_t::H5S_SELECT_NOTA, 2)]
    fn combine(#[case] op: H5S_seloper_t, #[case] expected: u64) {
        let mut space = Space::new(&[10], None).unwrap();
        slab(&mut space, H5S_seloper_t::H5S_SELECT_SET, &[0], &[4]);
        slab(&mut space, op, &[2], &[4]);
        assert_eq!(space.npoints(), expected);
    }

    #[test]
    fn strided_blocks() {
        let mut space = Space::new(&[12], None).unwrap();
        space
            .select_hyperslab(
                H5S_seloper_t::H5S_SELECT_SET,
                &[1],
                Some(&[4]),
                &[3],
                Some(&[2]),
            )
            .unwrap();
        let selected: Vec<u64> = space.selected().into_iter().flatten().collect();
        assert_eq!(selected, vec![1, 2, 5, 6, 9, 10]);
    }

    #[test]
    fn out_of_bounds_is_invalid_not_an_error() {
        let mut space = Space::new(&[4], None).unwrap();
        slab(&mut space, H5S_seloper_t::H5S_SELECT_SET, &[4], &[1]);
        assert!(!space.is_valid());
        space.select_all();
        assert!(space.is_valid());
        assert_eq!(space.npoints(), 4);
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut space = Space::new(&[4, 4], None).unwrap();
        assert!(
            space
                .select_hyperslab(H5S_seloper_t::H5S_SELECT_SET, &[0], None, &[1], None)
                .is_err()
        );
        assert!(
            space
                .select_hyperslab(
                    H5S_seloper_t::H5S_SELECT_SET,
                    &[0, 0],
                    Some(&[0, 1]),
                    &[1, 1],
                    None
                )
                .is_err()
        );
        assert!(Space::new(&[], None).is_err());
        assert!(Space::new(&[4], Some(&[2])).is_err());
        assert!(Space::new(&[4], Some(&[H5S_UNLIMITED])).is_ok());
    }

    #[rstest]
    #[case::start(&[u64::MAX - 1], None, &[1], Some(&[3][..]))]
    #[case::stride(&[1], Some(&[u64::MAX][..]), &[2], None)]
    #[case::count(&[0], None, &[u64::MAX], None)]
    #[case::product(&[0, 0], None, &[1 << 40, 1 << 40], None)]
    fn oversized_hyperslabs_are_rejected(
        #[case] start: &[u64],
        #[case] stride: Option<&[u64]>,
        #[case] count: &[u64],
        #[case] block: Option<&[u64]>,
    ) {
        let dims = vec![4; start.len()];
        let mut space = Space::new(&dims, None).unwrap();
        assert!(
            space
                .select_hyperslab(H5S_seloper_t::H5S_SELECT_SET, start, stride, count, block)
                .is_err()
        );
        assert!(space.is_valid());
        assert_eq!(space.npoints(), space.extent_points());
    }

    #[test]
    fn linear_index_is_row_major() {
        let space = Space::new(&[2, 3, 4], None).unwrap();
        assert_eq!(space.linear_index(&[1, 2, 3]), 23);
        assert_eq!(space.linear_index(&[0, 1, 0]), 4);
    }
}
