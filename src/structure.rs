//! The fixed geometry of a crossword grid.

use bit_set::BitSet;
use log::debug;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::{Error, Orientation, PsResult, Slot};

/// The character marking a fillable cell in a structure file.
const FILLABLE: char = '_';

/// The grid geometry, the slots derived from it, and the word list.
#[derive(Clone, Debug)]
pub struct PuzzleStructure {
    width: usize,
    height: usize,
    fillable: Vec<Vec<bool>>,
    words: BTreeSet<String>,

    // Slots in structural order.  A slot's index in this list is how the
    // overlap matrix and adjacency sets refer to it.
    slots: Vec<Slot>,

    // overlaps[a][b] holds the offsets into slots a and b of the cell they
    // share, if any.
    overlaps: Vec<Vec<Option<(usize, usize)>>>,

    // The slots crossing each slot.
    adjacent: Vec<BitSet>,
}

impl PuzzleStructure {
    /// Build a structure from a fillable-cell grid and a word list.
    ///
    /// # Panics
    ///
    /// Panics if `fillable` is not `height` rows of `width` cells.
    ///
    /// # Examples
    ///
    /// ```
    /// use crossword_solver::PuzzleStructure;
    ///
    /// let grid = vec![vec![true, true, true], vec![false, true, false]];
    /// let structure = PuzzleStructure::new(3, 2, grid, ["CAT", "DOG"]);
    /// assert_eq!(structure.slots().len(), 2);
    /// ```
    pub fn new<I, W>(width: usize, height: usize, fillable: Vec<Vec<bool>>, words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        match Self::try_new(width, height, fillable, words) {
            Ok(structure) => structure,
            Err(err) => panic!("invalid structure: {}", err),
        }
    }

    /// Build a structure, checking the shape of the fillable-cell grid.
    pub fn try_new<I, W>(
        width: usize,
        height: usize,
        fillable: Vec<Vec<bool>>,
        words: I,
    ) -> PsResult<Self>
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        if fillable.len() != height {
            return Err(Error::RowCount {
                expected: height,
                found: fillable.len(),
            });
        }
        if let Some((row, cells)) = fillable.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(Error::ShapeMismatch {
                row,
                expected: width,
                found: cells.len(),
            });
        }

        let slots = find_slots(width, height, &fillable);
        let overlaps = compute_overlaps(&slots);
        let adjacent = init_adjacent(&overlaps);

        debug!(
            target: "structure",
            "{}x{} grid: {} slots, {} crossings",
            width,
            height,
            slots.len(),
            adjacent.iter().map(BitSet::len).sum::<usize>() / 2
        );

        Ok(PuzzleStructure {
            width,
            height,
            fillable,
            words: words.into_iter().map(Into::into).collect(),
            slots,
            overlaps,
            adjacent,
        })
    }

    /// Parse a structure and a word list from text.
    ///
    /// Each structure line is one grid row, where `_` marks a fillable
    /// cell and anything else a blocked one.  Rows shorter than the
    /// longest row are padded with blocked cells.  The word list holds
    /// one word per line; words are upper-cased and blank lines skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use crossword_solver::PuzzleStructure;
    ///
    /// let structure = PuzzleStructure::parse("___\n#_#\n#_#\n", "cat\ndog\n").unwrap();
    /// assert_eq!((structure.width(), structure.height()), (3, 3));
    /// assert!(structure.words().contains("CAT"));
    /// ```
    pub fn parse(structure: &str, words: &str) -> PsResult<Self> {
        let rows: Vec<&str> = structure.lines().collect();
        let height = rows.len();
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(Error::EmptyStructure);
        }

        let fillable = rows
            .iter()
            .map(|row| {
                let mut cells: Vec<bool> = row.chars().map(|c| c == FILLABLE).collect();
                cells.resize(width, false);
                cells
            })
            .collect();

        let words = words
            .lines()
            .map(str::trim)
            .filter(|word| !word.is_empty())
            .map(str::to_uppercase);

        Self::try_new(width, height, fillable, words)
    }

    /// Read a structure file and a word file, then parse them.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(structure: P, words: Q) -> PsResult<Self> {
        let structure = read_to_string(structure.as_ref())?;
        let words = read_to_string(words.as_ref())?;
        Self::parse(&structure, &words)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_fillable(&self, row: usize, col: usize) -> bool {
        self.fillable
            .get(row)
            .and_then(|cells| cells.get(col))
            .copied()
            .unwrap_or(false)
    }

    /// The slots of the grid, in structural order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn words(&self) -> &BTreeSet<String> {
        &self.words
    }

    /// Get the offsets into `a` and `b` of the cell they share, or None if
    /// they do not cross.
    ///
    /// # Panics
    ///
    /// Panics if either slot is not part of this structure.
    pub fn overlap(&self, a: &Slot, b: &Slot) -> Option<(usize, usize)> {
        self.overlaps[self.index(a)][self.index(b)]
    }

    /// Iterate over the slots crossing `slot`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not part of this structure.
    pub fn neighbors(&self, slot: &Slot) -> impl Iterator<Item = Slot> + '_ {
        self.adjacent[self.index(slot)]
            .iter()
            .map(move |idx| self.slots[idx])
    }

    /// The number of slots crossing `slot`.
    pub fn degree(&self, slot: &Slot) -> usize {
        self.adjacent[self.index(slot)].len()
    }

    /// Find a slot's position in the structural order.
    pub(crate) fn index(&self, slot: &Slot) -> usize {
        match self.slots.binary_search(slot) {
            Ok(idx) => idx,
            Err(_) => panic!("slot {} is not part of this puzzle", slot),
        }
    }

    pub(crate) fn overlap_at(&self, a: usize, b: usize) -> Option<(usize, usize)> {
        self.overlaps[a][b]
    }

    pub(crate) fn adjacent(&self, idx: usize) -> &BitSet {
        &self.adjacent[idx]
    }
}

fn read_to_string(path: &Path) -> PsResult<String> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Find every maximal run of two or more fillable cells.
fn find_slots(width: usize, height: usize, fillable: &[Vec<bool>]) -> Vec<Slot> {
    let mut slots = Vec::new();

    for row in 0..height {
        push_runs(&mut slots, width, |col| fillable[row][col], |col, length| {
            Slot::new(row, col, Orientation::Across, length)
        });
    }

    for col in 0..width {
        push_runs(&mut slots, height, |row| fillable[row][col], |row, length| {
            Slot::new(row, col, Orientation::Down, length)
        });
    }

    slots.sort();
    slots
}

/// Scan one line of cells, pushing a slot for each run found.
fn push_runs<F, S>(slots: &mut Vec<Slot>, len: usize, is_fillable: F, make_slot: S)
where
    F: Fn(usize) -> bool,
    S: Fn(usize, usize) -> Slot,
{
    let mut start = None;

    for pos in 0..=len {
        let open = pos < len && is_fillable(pos);
        match (start, open) {
            (None, true) => start = Some(pos),
            (Some(from), false) => {
                if pos - from >= 2 {
                    slots.push(make_slot(from, pos - from));
                }
                start = None;
            }
            _ => (),
        }
    }
}

/// Compute the shared cell of every pair of slots.
fn compute_overlaps(slots: &[Slot]) -> Vec<Vec<Option<(usize, usize)>>> {
    let n = slots.len();
    let mut overlaps = vec![vec![None; n]; n];

    for a in 0..n {
        for b in (a + 1)..n {
            if let Some((ia, ib)) = crossing(&slots[a], &slots[b]) {
                overlaps[a][b] = Some((ia, ib));
                overlaps[b][a] = Some((ib, ia));
            }
        }
    }

    overlaps
}

/// Find the cell two slots share, as offsets into each.
fn crossing(a: &Slot, b: &Slot) -> Option<(usize, usize)> {
    if a.orientation == b.orientation {
        // Maximal runs in the same direction never share a cell.
        return None;
    }

    let (across, down, swapped) = match a.orientation {
        Orientation::Across => (a, b, false),
        Orientation::Down => (b, a, true),
    };

    let hits_col = across.col <= down.col && down.col < across.col + across.length;
    let hits_row = down.row <= across.row && across.row < down.row + down.length;
    if !(hits_col && hits_row) {
        return None;
    }

    let offsets = (down.col - across.col, across.row - down.row);
    if swapped {
        Some((offsets.1, offsets.0))
    } else {
        Some(offsets)
    }
}

/// Determine which slots cross each slot.
fn init_adjacent(overlaps: &[Vec<Option<(usize, usize)>>]) -> Vec<BitSet> {
    overlaps
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|(_, overlap)| overlap.is_some())
                .map(|(idx, _)| idx)
                .collect()
        })
        .collect()
}
