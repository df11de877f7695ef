//! Draw Pool
//!
//! The shuffled 1..=90 sequence a session draws from, front first.

use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

use crate::core::rng::SeededRng;

/// Lowest number in the bag.
pub const MIN_NUMBER: u8 = 1;

/// Highest number in the bag.
pub const MAX_NUMBER: u8 = 90;

/// Numbers in a full pool.
pub const POOL_SIZE: usize = MAX_NUMBER as usize;

/// Result of drawing from a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Draw {
    /// A number came out of the bag.
    Number(u8),
    /// All 90 numbers are out.
    Exhausted,
}

/// Remaining numbers of a session, in draw order.
///
/// Never replenished: once empty it stays empty until the session reseeds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawPool {
    remaining: VecDeque<u8>,
}

impl DrawPool {
    /// Pool shuffled by the next Fisher-Yates pass of `rng`.
    pub fn shuffled(rng: &mut SeededRng) -> Self {
        let mut numbers: Vec<u8> = (MIN_NUMBER..=MAX_NUMBER).collect();
        rng.shuffle(&mut numbers);
        Self { remaining: numbers.into() }
    }

    /// Remove and return the front number.
    pub fn draw_next(&mut self) -> Draw {
        match self.remaining.pop_front() {
            Some(number) => Draw::Number(number),
            None => Draw::Exhausted,
        }
    }

    /// Numbers still in the bag.
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Remaining numbers in draw order.
    pub fn remaining(&self) -> impl Iterator<Item = u8> + '_ {
        self.remaining.iter().copied()
    }
}

/// Full draw order a fresh session with `seed` will produce.
pub fn draw_order(seed: &str) -> Vec<u8> {
    DrawPool::shuffled(&mut SeededRng::new(seed)).remaining().collect()
}
