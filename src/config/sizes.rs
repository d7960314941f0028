//! Target size list parsing

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, ResizeError};

/// Side length of the square bounding box an output must fit within
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SizeTarget(u32);

impl SizeTarget {
    pub fn new(size: u32) -> Self {
        Self(size)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// A zero-sized box cannot hold any pixels
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SizeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered list of target sizes, shared read-only by every resize task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeList(Arc<[SizeTarget]>);

impl SizeList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SizeTarget> + '_ {
        self.0.iter().copied()
    }

    /// Reject an empty list; the pipeline needs at least one size
    pub fn non_empty(self) -> Result<Self> {
        if self.is_empty() {
            return Err(ResizeError::NoSizes);
        }
        Ok(self)
    }
}

impl From<Vec<u32>> for SizeList {
    fn from(sizes: Vec<u32>) -> Self {
        Self(sizes.into_iter().map(SizeTarget).collect())
    }
}

/// Parse a comma-separated list of non-negative sizes.
///
/// Empty fields are skipped, so `"50,,100,"` yields `[50, 100]` and `""`
/// yields an empty list. Duplicates are kept.
pub fn parse_sizes(s: &str) -> Result<SizeList> {
    let mut sizes = Vec::new();

    for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let value: i64 = token
            .parse()
            .map_err(|e: std::num::ParseIntError| match e.kind() {
                std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => {
                    ResizeError::invalid_size(token, "out of the valid range")
                }
                _ => ResizeError::invalid_size(token, "not an integer"),
            })?;

        if value < 0 {
            return Err(ResizeError::invalid_size(token, "less than zero"));
        }

        let value = u32::try_from(value)
            .map_err(|_| ResizeError::invalid_size(token, "out of the valid range"))?;
        sizes.push(SizeTarget(value));
    }

    Ok(SizeList(sizes.into()))
}
