//! Reading sample lists and the HDF5 ntuples they point at.

pub mod hdf5;
pub mod samples;

/// Optional half-open `[start, stop)` row range, applied to each file's
/// stored rows. `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub start: Option<usize>,
    pub stop: Option<usize>,
}

impl Bounds {
    pub fn none() -> Self { Self::default() }

    pub fn new(start: Option<usize>, stop: Option<usize>) -> Self {
        Self { start, stop }
    }
}
