// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Identifiers for the session's slots.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A [SlotId] identifies one of the session's fixed playback slots. Slots are
/// numbered from zero, and neighbors differ by one.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct SlotId(pub usize);
impl From<usize> for SlotId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}
impl SlotId {
    #[allow(missing_docs)]
    pub fn index(&self) -> usize {
        self.0
    }

    /// The slots on either side of this one, if they exist among `slot_count`
    /// slots.
    pub fn neighbors(&self, slot_count: usize) -> impl Iterator<Item = SlotId> {
        let left = self.0.checked_sub(1);
        let right = Some(self.0 + 1).filter(|r| *r < slot_count);
        left.into_iter().chain(right).map(SlotId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_respect_edges() {
        assert_eq!(
            SlotId(0).neighbors(7).collect::<Vec<_>>(),
            vec![SlotId(1)],
            "leftmost slot has one neighbor"
        );
        assert_eq!(
            SlotId(3).neighbors(7).collect::<Vec<_>>(),
            vec![SlotId(2), SlotId(4)]
        );
        assert_eq!(SlotId(6).neighbors(7).collect::<Vec<_>>(), vec![SlotId(5)]);
        assert_eq!(SlotId(0).neighbors(1).count(), 0);
        assert_eq!(SlotId(3).to_string(), "3");
    }
}
