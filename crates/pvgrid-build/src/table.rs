//! Symmetric pair-state table.
//!
//! One entry per unordered pair of cells, two bits each, packed into a
//! triangular layout. Looking a pair up in either order reads the same entry,
//! so visibility is symmetric by construction.

use pvgrid_core::{CellId, Error, Result};

const BITS_PER_PAIR: usize = 2;
const PAIRS_PER_WORD: usize = u64::BITS as usize / BITS_PER_PAIR;
const STATE_MASK: u64 = 0b11;

/// Resolution state of a pair of cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PairState {
    #[default]
    Unknown,
    Visible,
    Invisible,
}

impl PairState {
    const fn from_bits(bits: u64) -> Self {
        match bits {
            1 => Self::Visible,
            2 => Self::Invisible,
            _ => Self::Unknown,
        }
    }

    const fn to_bits(self) -> u64 {
        match self {
            Self::Unknown => 0,
            Self::Visible => 1,
            Self::Invisible => 2,
        }
    }

    #[inline]
    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Visible and invisible cells of one source cell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibilityRecord {
    pub visible: Vec<CellId>,
    pub invisible: Vec<CellId>,
}

/// Pair states for every unordered pair of cells in a grid.
#[derive(Clone, Debug)]
pub struct VisibilityTable {
    cells: usize,
    words: Vec<u64>,
}

impl VisibilityTable {
    /// Create a table with every pair unknown.
    pub fn new(cells: usize) -> Self {
        let pairs = cells * cells.saturating_sub(1) / 2;
        Self {
            cells,
            words: vec![0; pairs.div_ceil(PAIRS_PER_WORD)],
        }
    }

    #[inline]
    pub const fn cell_count(&self) -> usize {
        self.cells
    }

    /// Slot of the pair in the triangular layout, or `None` for self pairs
    /// and out-of-range ids.
    #[inline]
    fn slot(&self, a: CellId, b: CellId) -> Option<usize> {
        let (lo, hi) = if a < b { (a.index(), b.index()) } else { (b.index(), a.index()) };
        (lo != hi && hi < self.cells).then(|| hi * (hi - 1) / 2 + lo)
    }

    /// State of the pair `(a, b)`; self pairs and unknown ids read as `Unknown`.
    #[inline]
    pub fn get(&self, a: CellId, b: CellId) -> PairState {
        self.slot(a, b).map_or(PairState::Unknown, |slot| {
            let word = self.words[slot / PAIRS_PER_WORD];
            let shift = (slot % PAIRS_PER_WORD) * BITS_PER_PAIR;
            PairState::from_bits((word >> shift) & STATE_MASK)
        })
    }

    /// Resolve the pair `(a, b)` in both directions.
    ///
    /// Returns `Ok(false)` when the pair was already resolved; the first
    /// resolution always wins.
    pub fn set(&mut self, a: CellId, b: CellId, visible: bool) -> Result<bool> {
        if a == b {
            tracing::warn!("Cannot assign visibility of cell {a} against itself");
            return Err(Error::SelfPair(a));
        }
        let slot = self.slot(a, b).ok_or_else(|| {
            Error::OutOfBounds(format!("pair ({a}, {b}) in a table of {} cells", self.cells))
        })?;

        let word = &mut self.words[slot / PAIRS_PER_WORD];
        let shift = (slot % PAIRS_PER_WORD) * BITS_PER_PAIR;
        if PairState::from_bits((*word >> shift) & STATE_MASK).is_resolved() {
            return Ok(false);
        }

        let state = if visible {
            PairState::Visible
        } else {
            PairState::Invisible
        };
        *word |= state.to_bits() << shift;
        Ok(true)
    }

    /// Cells whose pair with `cell` is in `state`, ascending.
    pub fn cells_with(&self, cell: CellId, state: PairState) -> Vec<CellId> {
        (0..self.cells)
            .map(|i| CellId(i as u16))
            .filter(|&other| other != cell && self.get(cell, other) == state)
            .collect()
    }

    /// Cells known to be invisible from `cell`, ascending.
    pub fn invisible_cells(&self, cell: CellId) -> Vec<CellId> {
        self.cells_with(cell, PairState::Invisible)
    }

    /// Derived per-cell record.
    pub fn record(&self, cell: CellId) -> VisibilityRecord {
        let mut record = VisibilityRecord::default();
        for i in 0..self.cells {
            let other = CellId(i as u16);
            match self.get(cell, other) {
                PairState::Visible => record.visible.push(other),
                PairState::Invisible => record.invisible.push(other),
                PairState::Unknown => {}
            }
        }
        record
    }

    /// Number of unordered pairs still unknown.
    pub fn unresolved_pairs(&self) -> usize {
        let pairs = self.cells * self.cells.saturating_sub(1) / 2;
        (0..pairs)
            .filter(|&slot| {
                let word = self.words[slot / PAIRS_PER_WORD];
                (word >> ((slot % PAIRS_PER_WORD) * BITS_PER_PAIR)) & STATE_MASK == 0
            })
            .count()
    }
}
