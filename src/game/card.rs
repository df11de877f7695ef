//! Card Generation
//!
//! Builds 3×9 Tombala cards from a [`SeededRng`]. Every piece of randomness
//! comes from the generator, so the same RNG state always yields the same card.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::rng::SeededRng;

/// Rows on a card.
pub const ROWS: usize = 3;

/// Columns on a card.
pub const COLS: usize = 9;

/// Numbers in every row.
pub const NUMBERS_PER_ROW: usize = 5;

/// Numbers on a full card.
pub const NUMBERS_PER_CARD: usize = ROWS * NUMBERS_PER_ROW;

/// Upper bound of numbers in a single column.
pub const MAX_PER_COLUMN: usize = 3;

/// Placement attempts before generation gives up.
pub const PLACEMENT_ATTEMPTS: u32 = 250;

/// Inclusive value range of each column.
pub const COLUMN_RANGES: [(u8, u8); COLS] = [
    (1, 9),
    (10, 19),
    (20, 29),
    (30, 39),
    (40, 49),
    (50, 59),
    (60, 69),
    (70, 79),
    (80, 90),
];

/// Inclusive `(min, max)` range for a column index.
///
/// # Panics
///
/// Panics if `col >= COLS`.
#[inline]
pub fn column_range(col: usize) -> (u8, u8) {
    COLUMN_RANGES[col]
}

/// Card construction and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    /// Row placement search ran out of attempts.
    #[error("could not place numbers on a card after {attempts} attempts")]
    PlacementExhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// A row does not hold exactly five numbers.
    #[error("row {row} holds {count} numbers, expected 5")]
    RowCount {
        /// Row index.
        row: usize,
        /// Numbers found.
        count: usize,
    },

    /// A column is empty or over-full.
    #[error("column {col} holds {count} numbers, expected 1 to 3")]
    ColumnCount {
        /// Column index.
        col: usize,
        /// Numbers found.
        count: usize,
    },

    /// A value sits in the wrong column.
    #[error("value {value} is outside the range of column {col}")]
    OutOfRange {
        /// Column index.
        col: usize,
        /// Offending value.
        value: u8,
    },

    /// A value appears twice.
    #[error("value {0} appears more than once")]
    Duplicate(u8),
}

/// A 3×9 Tombala card. `None` marks an empty cell.
///
/// Serializes as nested arrays with `null` for empty cells.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card {
    rows: [[Option<u8>; COLS]; ROWS],
}

impl Default for Card {
    fn default() -> Self {
        Self::empty()
    }
}

impl Card {
    /// Card with every cell empty.
    pub const fn empty() -> Self {
        Self { rows: [[None; COLS]; ROWS] }
    }

    /// Wrap a grid as-is. Use [`Card::validate`] to check structure.
    pub const fn from_rows(rows: [[Option<u8>; COLS]; ROWS]) -> Self {
        Self { rows }
    }

    /// Raw grid.
    pub fn rows(&self) -> &[[Option<u8>; COLS]; ROWS] {
        &self.rows
    }

    /// Value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= ROWS` or `col >= COLS`.
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> Option<u8> {
        self.rows[row][col]
    }

    /// Non-empty values, row-major.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.rows.iter().flat_map(|row| row.iter().flatten().copied())
    }

    /// Count of non-empty cells.
    pub fn number_count(&self) -> usize {
        self.numbers().count()
    }

    /// Whether `value` appears anywhere on the card.
    pub fn contains(&self, value: u8) -> bool {
        self.numbers().any(|n| n == value)
    }

    /// Check every structural invariant of a dealt card.
    pub fn validate(&self) -> Result<(), CardError> {
        for (row, cells) in self.rows.iter().enumerate() {
            let count = cells.iter().flatten().count();
            if count != NUMBERS_PER_ROW {
                return Err(CardError::RowCount { row, count });
            }
        }

        let mut seen = BTreeSet::new();
        for col in 0..COLS {
            let (min, max) = column_range(col);
            let mut count = 0;
            for row in 0..ROWS {
                if let Some(value) = self.rows[row][col] {
                    count += 1;
                    if value < min || value > max {
                        return Err(CardError::OutOfRange { col, value });
                    }
                    if !seen.insert(value) {
                        return Err(CardError::Duplicate(value));
                    }
                }
            }
            if count == 0 || count > MAX_PER_COLUMN {
                return Err(CardError::ColumnCount { col, count });
            }
        }

        Ok(())
    }
}

/// Which rows receive a number in each column.
type Placement = [[bool; COLS]; ROWS];

/// Generate a card from the current RNG state.
///
/// 1. Column counts: every column starts at 1, then six random increments
///    (capped at 3) bring the total to 15.
/// 2. Row placement: a weighted random search, retried up to
///    [`PLACEMENT_ATTEMPTS`] times.
/// 3. Values: each column samples its count from its range without
///    replacement; ascending values fill the selected rows top to bottom.
pub fn generate_card(rng: &mut SeededRng) -> Result<Card, CardError> {
    let counts = generate_column_counts(rng);
    let placement = build_placement(&counts, rng)?;

    let mut rows = [[None; COLS]; ROWS];
    for col in 0..COLS {
        let (min, max) = column_range(col);
        let values = sample_without_replacement(min, max, counts[col], rng);
        let selected = (0..ROWS).filter(|&row| placement[row][col]);

        for (row, value) in selected.zip(values) {
            rows[row][col] = Some(value);
        }
    }

    Ok(Card { rows })
}

/// Generate the first card dealt from a fresh RNG seeded with `seed`.
pub fn generate_card_for_seed(seed: &str) -> Result<Card, CardError> {
    generate_card(&mut SeededRng::new(seed))
}

fn generate_column_counts(rng: &mut SeededRng) -> [usize; COLS] {
    let mut counts = [1usize; COLS];
    let mut remaining = NUMBERS_PER_CARD - COLS;

    // Terminates: only six increments are needed and 18 remain available.
    while remaining > 0 {
        let col = rng.next_int(COLS as u32) as usize;
        if counts[col] < MAX_PER_COLUMN {
            counts[col] += 1;
            remaining -= 1;
        }
    }

    counts
}

fn build_placement(counts: &[usize; COLS], rng: &mut SeededRng) -> Result<Placement, CardError> {
    for _ in 0..PLACEMENT_ATTEMPTS {
        if let Some(placement) = try_build_placement(counts, rng) {
            return Ok(placement);
        }
    }

    Err(CardError::PlacementExhausted { attempts: PLACEMENT_ATTEMPTS })
}

/// One placement attempt.
///
/// Each row enters the candidate list once per remaining slot, so rows with
/// more room left are more likely to come first after the shuffle.
fn try_build_placement(counts: &[usize; COLS], rng: &mut SeededRng) -> Option<Placement> {
    let mut capacity = [NUMBERS_PER_ROW; ROWS];
    let mut placement = [[false; COLS]; ROWS];

    for (col, &needed) in counts.iter().enumerate() {
        let open_rows = capacity.iter().filter(|&&c| c > 0).count();
        if open_rows < needed {
            return None;
        }

        let mut tickets: Vec<usize> = (0..ROWS)
            .flat_map(|row| std::iter::repeat(row).take(capacity[row]))
            .collect();
        rng.shuffle(&mut tickets);

        let mut selected = Vec::with_capacity(needed);
        for row in tickets {
            if !selected.contains(&row) {
                selected.push(row);
                if selected.len() == needed {
                    break;
                }
            }
        }

        for row in selected {
            placement[row][col] = true;
            capacity[row] -= 1;
        }
    }

    capacity.iter().all(|&c| c == 0).then_some(placement)
}

fn sample_without_replacement(min: u8, max: u8, count: usize, rng: &mut SeededRng) -> Vec<u8> {
    let mut values: Vec<u8> = (min..=max).collect();
    rng.shuffle(&mut values);
    values.truncate(count);
    values.sort_unstable();
    values
}

// =============================================================================
// TESTS
// =============================================================================
