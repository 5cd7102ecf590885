//! Branch-encoded position identifiers and their total order
//!
//! A [`PositionPath`] names a slot in a conceptual binary tree of insertion
//! positions. Each [`Step`] picks a branch (`direction`, `true` = right) and
//! carries a disambiguator that separates concurrent inserts made at the same
//! branch. Ordering two paths walks them root-to-leaf; when one path is a
//! proper prefix of the other, the first extra step of the longer path decides
//! which side of the prefix it lives on.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::DatasetError;

/// One branch choice in a position path.
///
/// Serialized with the short field names used on the wire (`a`, `b`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    /// Branch direction: `false` is left, `true` is right
    #[serde(rename = "a")]
    pub direction: bool,

    /// Tie-breaker between concurrent inserts at the same branch
    #[serde(rename = "b")]
    pub disambiguator: i64,
}

impl Step {
    pub fn new(direction: bool, disambiguator: i64) -> Self {
        Self {
            direction,
            disambiguator,
        }
    }

    pub fn left(disambiguator: i64) -> Self {
        Self::new(false, disambiguator)
    }

    pub fn right(disambiguator: i64) -> Self {
        Self::new(true, disambiguator)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = if self.direction { 'R' } else { 'L' };
        write!(f, "{}{}", side, self.disambiguator)
    }
}

/// Compare two step sequences under the position-path total order.
///
/// Works on plain slices so callers holding borrowed wire data can order
/// paths without building a [`PositionPath`] first.
pub fn compare_steps(a: &[Step], b: &[Step]) -> Ordering {
    for (left, right) in a.iter().zip(b) {
        if left.direction != right.direction {
            // false sorts before true
            return left.direction.cmp(&right.direction);
        }
        if left.disambiguator != right.disambiguator {
            return left.disambiguator.cmp(&right.disambiguator);
        }
    }

    let shared = a.len().min(b.len());
    match a.len().cmp(&b.len()) {
        Ordering::Equal => Ordering::Equal,
        // `b` extends `a`: a right turn puts the extension after the prefix
        Ordering::Less => {
            if b[shared].direction {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        // `a` extends `b`
        Ordering::Greater => {
            if a[shared].direction {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
    }
}

/// Non-empty, root-to-leaf sequence of steps identifying one edit position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Step>", into = "Vec<Step>")]
pub struct PositionPath(Vec<Step>);

impl PositionPath {
    /// Build a path, rejecting an empty step list
    pub fn new(steps: Vec<Step>) -> Result<Self, DatasetError> {
        if steps.is_empty() {
            return Err(DatasetError::EmptyPath);
        }
        Ok(Self(steps))
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with other collections
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The leaf step
    pub fn last(&self) -> &Step {
        // Non-empty by construction
        &self.0[self.0.len() - 1]
    }

    /// True when `self` is a strict prefix of `other`
    pub fn is_prefix_of(&self, other: &PositionPath) -> bool {
        self.len() < other.len() && other.0[..self.len()] == self.0[..]
    }

    /// Extend this path by one step, returning the child path
    pub fn child(&self, step: Step) -> PositionPath {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.extend_from_slice(&self.0);
        steps.push(step);
        PositionPath(steps)
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.0
    }
}

impl TryFrom<Vec<Step>> for PositionPath {
    type Error = DatasetError;

    fn try_from(steps: Vec<Step>) -> Result<Self, Self::Error> {
        PositionPath::new(steps)
    }
}

impl From<PositionPath> for Vec<Step> {
    fn from(path: PositionPath) -> Self {
        path.0
    }
}

impl Ord for PositionPath {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_steps(&self.0, &other.0)
    }
}

impl PartialOrd for PositionPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PositionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for step in &self.0 {
            if !first {
                write!(f, "/")?;
            }
            write!(f, "{}", step)?;
            first = false;
        }
        Ok(())
    }
}
