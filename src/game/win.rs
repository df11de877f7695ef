//! Win Evaluation
//!
//! Pure check of a card against the numbers drawn so far.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

use crate::game::card::{Card, COLS, ROWS};

/// Marked cells of a card.
pub type Marks = [[bool; COLS]; ROWS];

/// Prize stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// First complete row.
    Cinko1,
    /// Second complete row.
    Cinko2,
    /// Every number on the card.
    Tombala,
}

impl Stage {
    /// Award priority, highest first.
    pub const BY_PRIORITY: [Stage; 3] = [Stage::Tombala, Stage::Cinko2, Stage::Cinko1];

    /// Wire key (`cinko1`, `cinko2`, `tombala`).
    pub fn key(self) -> &'static str {
        match self {
            Stage::Cinko1 => "cinko1",
            Stage::Cinko2 => "cinko2",
            Stage::Tombala => "tombala",
        }
    }

    /// Display name for chat.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Cinko1 => "Çinko 1",
            Stage::Cinko2 => "Çinko 2",
            Stage::Tombala => "TOMBALA",
        }
    }
}

/// Outcome of checking one card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// `marks[r][c]` is set iff the cell holds a drawn number.
    pub marks: Marks,
    /// Indices of rows whose every number is drawn, ascending.
    pub completed_rows: Vec<usize>,
    /// Drawn numbers found on the card.
    pub matched_count: usize,
    /// At least one complete row.
    pub cinko1: bool,
    /// At least two complete rows.
    pub cinko2: bool,
    /// Every number on the card drawn.
    pub tombala: bool,
}

impl Evaluation {
    /// Whether the card qualifies for `stage`.
    pub fn qualifies(&self, stage: Stage) -> bool {
        match stage {
            Stage::Cinko1 => self.cinko1,
            Stage::Cinko2 => self.cinko2,
            Stage::Tombala => self.tombala,
        }
    }
}

/// Mark the cells of `card` whose values are in `drawn`.
pub fn mark_card(card: &Card, drawn: &BTreeSet<u8>) -> Marks {
    let mut marks = [[false; COLS]; ROWS];
    for (row, cells) in card.rows().iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            marks[row][col] = cell.is_some_and(|n| drawn.contains(&n));
        }
    }
    marks
}

/// Evaluate `card` against `drawn`.
///
/// Empty cells count as satisfied, so a row is complete once each of its
/// numbers is drawn. Tombala requires every number on the card; on a dealt
/// card that is the same as 15 matches.
pub fn evaluate(card: &Card, drawn: &BTreeSet<u8>) -> Evaluation {
    let marks = mark_card(card, drawn);

    let completed_rows: Vec<usize> = (0..ROWS)
        .filter(|&row| (0..COLS).all(|col| card.cell(row, col).is_none() || marks[row][col]))
        .collect();

    let matched_count = marks.iter().flatten().filter(|&&m| m).count();
    let total = card.number_count();

    Evaluation {
        marks,
        cinko1: !completed_rows.is_empty(),
        cinko2: completed_rows.len() >= 2,
        tombala: total > 0 && matched_count == total,
        completed_rows,
        matched_count,
    }
}
