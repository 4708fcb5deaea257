//! This crate fills crossword grids from a word list.
//! The grid is modelled as a constraint satisfaction problem: every slot
//! takes one word, crossing slots agree on the shared letter, and no word
//! is used twice.

mod engine;
mod error;
pub mod render;
mod structure;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::ops;

pub use engine::ConstraintEngine;
pub use error::Error;
pub use render::{letter_grid, load_font, save, Rendered};
pub use structure::PuzzleStructure;

/// The direction a slot runs in.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Orientation {
    Across,
    Down,
}

/// One maximal run of fillable cells, to be filled with one word.
///
/// Slots compare by value, and order by position first so that iterating
/// over slots is reproducible.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Slot {
    pub row: usize,
    pub col: usize,
    pub orientation: Orientation,
    pub length: usize,
}

impl Slot {
    pub fn new(row: usize, col: usize, orientation: Orientation, length: usize) -> Self {
        Slot {
            row,
            col,
            orientation,
            length,
        }
    }

    /// The grid cell holding the `k`th letter of the slot.
    pub fn cell(&self, k: usize) -> (usize, usize) {
        match self.orientation {
            Orientation::Across => (self.row, self.col + k),
            Orientation::Down => (self.row + k, self.col),
        }
    }

    /// Iterate over the grid cells covered by the slot, in letter order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.length).map(move |k| self.cell(k))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dir = match self.orientation {
            Orientation::Across => "across",
            Orientation::Down => "down",
        };
        write!(f, "({}, {}) {} : {}", self.row, self.col, dir, self.length)
    }
}

/// A result that may fail while loading a puzzle.
pub type PsResult<T> = Result<T, Error>;

/// A mapping from slots to the words placed in them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Assignment {
    words: BTreeMap<Slot, String>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &Slot) -> Option<&str> {
        self.words.get(slot).map(String::as_str)
    }

    pub fn contains(&self, slot: &Slot) -> bool {
        self.words.contains_key(slot)
    }

    /// Place a word in a slot, returning the word previously there.
    pub fn insert<W: Into<String>>(&mut self, slot: Slot, word: W) -> Option<String> {
        self.words.insert(slot, word.into())
    }

    pub fn remove(&mut self, slot: &Slot) -> Option<String> {
        self.words.remove(slot)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterate over the placed words in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&Slot, &str)> {
        self.words.iter().map(|(slot, word)| (slot, word.as_str()))
    }

    /// The set of distinct words in the assignment.
    pub fn distinct_words(&self) -> BTreeSet<&str> {
        self.words.values().map(String::as_str).collect()
    }
}

impl ops::Index<&Slot> for Assignment {
    type Output = str;

    /// Get the word placed in a slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot has not been assigned.
    fn index(&self, slot: &Slot) -> &str {
        match self.words.get(slot) {
            Some(word) => word,
            None => panic!("unassigned slot {}", slot),
        }
    }
}
