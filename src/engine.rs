//! Candidate domains, propagation and search.

use log::{debug, trace};
use std::cell::Cell;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use crate::{Assignment, PuzzleStructure, Slot};

/// The solver state for one puzzle.
///
/// The engine runs in three phases: node consistency and arc consistency
/// narrow the domains (and need `&mut self`), then the backtracking search
/// reads the narrowed domains without changing them.
pub struct ConstraintEngine<'a> {
    structure: &'a PuzzleStructure,

    // The candidate words of each slot, indexed like structure.slots().
    domains: Vec<BTreeSet<String>>,

    // The number of guesses taken by the last search.
    num_guesses: Cell<u32>,
}

impl<'a> ConstraintEngine<'a> {
    /// Allocate a new engine, with every slot's domain set to the whole
    /// word list.
    ///
    /// # Examples
    ///
    /// ```
    /// use crossword_solver::{ConstraintEngine, PuzzleStructure};
    ///
    /// let structure = PuzzleStructure::parse("___\n#_#\n#_#\n", "CAT\nACT\nDOG\n").unwrap();
    /// let mut engine = ConstraintEngine::new(&structure);
    /// let assignment = engine.solve().expect("solution");
    /// assert!(engine.consistent(&assignment));
    /// ```
    pub fn new(structure: &'a PuzzleStructure) -> Self {
        let domains = vec![structure.words().clone(); structure.slots().len()];
        ConstraintEngine {
            structure,
            domains,
            num_guesses: Cell::new(0),
        }
    }

    /// Get the current candidate words of a slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not part of the puzzle.
    pub fn domain(&self, slot: &Slot) -> &BTreeSet<String> {
        &self.domains[self.structure.index(slot)]
    }

    /// Get the number of guesses taken by the last search.
    pub fn num_guesses(&self) -> u32 {
        self.num_guesses.get()
    }

    /// Remove every candidate whose length differs from its slot's.
    pub fn enforce_node_consistency(&mut self) {
        for (slot, domain) in self.structure.slots().iter().zip(self.domains.iter_mut()) {
            domain.retain(|word| word_len(word) == slot.length);
        }
    }

    /// Make `x` arc consistent with `y`: remove every candidate of `x`
    /// that no candidate of `y` agrees with at their shared cell.
    ///
    /// Returns true if the domain of `x` changed.
    pub fn revise(&mut self, x: &Slot, y: &Slot) -> bool {
        let xi = self.structure.index(x);
        let yi = self.structure.index(y);
        self.revise_at(xi, yi)
    }

    fn revise_at(&mut self, x: usize, y: usize) -> bool {
        let (ix, iy) = match self.structure.overlap_at(x, y) {
            Some(overlap) => overlap,
            None => return false,
        };

        let supported: BTreeSet<char> = self.domains[y]
            .iter()
            .filter_map(|word| letter_at(word, iy))
            .collect();

        let domain = &mut self.domains[x];
        let before = domain.len();
        domain.retain(|word| letter_at(word, ix).map_or(false, |c| supported.contains(&c)));

        let removed = before - domain.len();
        if removed > 0 {
            trace!(
                target: "engine",
                "revise {} against {}: removed {}, {} left",
                self.structure.slots()[x],
                self.structure.slots()[y],
                removed,
                domain.len()
            );
        }
        removed > 0
    }

    /// Make every slot arc consistent with its neighbors, using the AC-3
    /// worklist.  If `arcs` is None, start from every pair of crossing
    /// slots; otherwise start from `arcs`.
    ///
    /// Returns false if some domain became empty.
    pub fn ac3(&mut self, arcs: Option<&[(Slot, Slot)]>) -> bool {
        let structure = self.structure;
        let mut queue: VecDeque<(usize, usize)> = match arcs {
            Some(arcs) => arcs
                .iter()
                .map(|(x, y)| (structure.index(x), structure.index(y)))
                .collect(),
            None => (0..self.domains.len())
                .flat_map(|x| structure.adjacent(x).iter().map(move |y| (x, y)))
                .collect(),
        };

        while let Some((x, y)) = queue.pop_front() {
            if !self.revise_at(x, y) {
                continue;
            }

            if self.domains[x].is_empty() {
                debug!(
                    target: "engine",
                    "ac3: no candidates left for {}",
                    structure.slots()[x]
                );
                return false;
            }

            // Narrowing x may leave x's other neighbors unsupported.
            for z in structure.adjacent(x).iter() {
                if z != y {
                    queue.push_back((z, x));
                }
            }
        }

        true
    }

    /// Check if every slot has a word.
    pub fn assignment_complete(&self, assignment: &Assignment) -> bool {
        self.structure
            .slots()
            .iter()
            .all(|slot| assignment.contains(slot))
    }

    /// Check that the words are distinct, fit their slots, and agree
    /// with every assigned neighbor at the shared cell.
    pub fn consistent(&self, assignment: &Assignment) -> bool {
        if assignment.distinct_words().len() != assignment.len() {
            return false;
        }

        assignment.iter().all(|(slot, word)| {
            word_len(word) == slot.length
                && self.structure.neighbors(slot).all(|neighbor| {
                    match assignment.get(&neighbor) {
                        Some(other) => self.agrees(slot, word, &neighbor, other),
                        None => true,
                    }
                })
        })
    }

    /// Choose the next slot to fill: the unassigned slot with the fewest
    /// candidates, then the one with the most neighbors, then the first in
    /// structural order.
    ///
    /// Returns None if every slot is assigned.
    pub fn select_unassigned_variable(&self, assignment: &Assignment) -> Option<Slot> {
        // min_by_key keeps the first of equal keys, i.e. structural order.
        self.structure
            .slots()
            .iter()
            .zip(self.domains.iter())
            .filter(|(slot, _)| !assignment.contains(slot))
            .min_by_key(|(slot, domain)| (domain.len(), Reverse(self.structure.degree(slot))))
            .map(|(slot, _)| *slot)
    }

    /// List the candidates of `slot`, least constraining first.
    ///
    /// A word's cost is the number of candidates it rules out across the
    /// unassigned neighbors of `slot`.  Equal costs keep alphabetical
    /// order.
    pub fn order_domain_values(&self, slot: &Slot, assignment: &Assignment) -> Vec<&str> {
        let idx = self.structure.index(slot);

        // For each unassigned neighbor: the offset into `slot`, the
        // neighbor's domain size, and how many of its candidates carry
        // each letter at the shared cell.
        let crossings: Vec<(usize, usize, BTreeMap<char, usize>)> = self
            .structure
            .adjacent(idx)
            .iter()
            .filter(|&n| !assignment.contains(&self.structure.slots()[n]))
            .filter_map(|n| {
                let (i, j) = self.structure.overlap_at(idx, n)?;
                let mut counts = BTreeMap::new();
                for word in self.domains[n].iter() {
                    if let Some(c) = letter_at(word, j) {
                        *counts.entry(c).or_insert(0) += 1;
                    }
                }
                Some((i, self.domains[n].len(), counts))
            })
            .collect();

        let mut values: Vec<(usize, &str)> = self.domains[idx]
            .iter()
            .map(|word| {
                let cost = crossings
                    .iter()
                    .map(|(i, total, counts)| {
                        let agree = letter_at(word, *i)
                            .and_then(|c| counts.get(&c))
                            .copied()
                            .unwrap_or(0);
                        total - agree
                    })
                    .sum();
                (cost, word.as_str())
            })
            .collect();

        // Stable, so ties stay in domain order.
        values.sort_by_key(|&(cost, _)| cost);
        values.into_iter().map(|(_, word)| word).collect()
    }

    /// Search for a complete assignment extending `assignment`.
    ///
    /// Returns None if `assignment` is inconsistent or cannot be
    /// completed from the current domains.
    pub fn backtrack(&self, mut assignment: Assignment) -> Option<Assignment> {
        if !self.consistent(&assignment) {
            return None;
        }

        if self.extend(&mut assignment) {
            Some(assignment)
        } else {
            None
        }
    }

    /// Fill the remaining slots of a consistent assignment in place.
    /// On failure the assignment is left as it was.
    fn extend(&self, assignment: &mut Assignment) -> bool {
        let slot = match self.select_unassigned_variable(assignment) {
            Some(slot) => slot,
            None => return true,
        };

        for word in self.order_domain_values(&slot, assignment) {
            let num_guesses = self.num_guesses.get() + 1;
            self.num_guesses.set(num_guesses);

            if !self.admits(assignment, &slot, word) {
                continue;
            }

            trace!(target: "engine", "guess {} = {}", slot, word);
            assignment.insert(slot, word);
            if self.extend(assignment) {
                return true;
            }
            assignment.remove(&slot);
        }

        false
    }

    /// Check if adding `slot = word` to a consistent assignment keeps it
    /// consistent.
    fn admits(&self, assignment: &Assignment, slot: &Slot, word: &str) -> bool {
        word_len(word) == slot.length
            && assignment.iter().all(|(_, other)| other != word)
            && self.structure.neighbors(slot).all(|neighbor| {
                match assignment.get(&neighbor) {
                    Some(other) => self.agrees(slot, word, &neighbor, other),
                    None => true,
                }
            })
    }

    /// Check if two crossing words share the same letter.
    fn agrees(&self, a: &Slot, word_a: &str, b: &Slot, word_b: &str) -> bool {
        match self.structure.overlap(a, b) {
            Some((ia, ib)) => letter_at(word_a, ia) == letter_at(word_b, ib),
            None => true,
        }
    }

    /// Enforce node and arc consistency, then search for a solution.
    ///
    /// Returns None if the puzzle has no solution.
    pub fn solve(&mut self) -> Option<Assignment> {
        self.num_guesses.set(0);

        self.enforce_node_consistency();
        debug!(
            target: "engine",
            "node consistency: {} candidates over {} slots",
            self.domains.iter().map(BTreeSet::len).sum::<usize>(),
            self.domains.len()
        );

        if !self.ac3(None) || self.domains.iter().any(BTreeSet::is_empty) {
            debug!(target: "engine", "unsatisfiable before search");
            return None;
        }
        debug!(
            target: "engine",
            "arc consistency: {} candidates left",
            self.domains.iter().map(BTreeSet::len).sum::<usize>()
        );

        let solution = self.backtrack(Assignment::new());
        debug!(
            target: "engine",
            "search {} after {} guesses",
            if solution.is_some() { "succeeded" } else { "failed" },
            self.num_guesses()
        );
        solution
    }
}

/// The number of letters in a word.
fn word_len(word: &str) -> usize {
    word.chars().count()
}

/// The `k`th letter of a word.
fn letter_at(word: &str, k: usize) -> Option<char> {
    word.chars().nth(k)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::{Assignment, ConstraintEngine, Orientation, PuzzleStructure, Slot};

    // One across slot whose middle letter starts one down slot.
    const CORNER: &str = "___\n#_#\n#_#\n";

    // Two slots crossing at both middles.
    const PLUS: &str = "#_#\n___\n#_#\n";

    fn across(row: usize, col: usize, length: usize) -> Slot {
        Slot::new(row, col, Orientation::Across, length)
    }

    fn down(row: usize, col: usize, length: usize) -> Slot {
        Slot::new(row, col, Orientation::Down, length)
    }

    fn words(domain: &BTreeSet<String>) -> Vec<&str> {
        domain.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_node_consistency() {
        let structure =
            PuzzleStructure::parse("____\n#_##\n#_##\n", "CAT\nTREE\nDOG\nA\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();
        assert_eq!(words(engine.domain(&across(0, 0, 4))), vec!["TREE"]);
        assert_eq!(words(engine.domain(&down(0, 1, 3))), vec!["CAT", "DOG"]);

        let before = engine.domains.clone();
        engine.enforce_node_consistency();
        assert_eq!(engine.domains, before);
    }

    #[test]
    fn test_revise() {
        let structure = PuzzleStructure::parse(CORNER, "CAT\nACT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();

        let x = across(0, 0, 3);
        let y = down(0, 1, 3);
        assert!(engine.revise(&x, &y));
        assert_eq!(words(engine.domain(&x)), vec!["ACT", "CAT"]);

        // Every survivor has support; a second pass changes nothing.
        for word in engine.domain(&x) {
            let c = word.chars().nth(1);
            assert!(engine.domain(&y).iter().any(|w| w.chars().next() == c));
        }
        assert!(!engine.revise(&x, &y));
        assert_eq!(engine.domain(&x).len(), 2);
    }

    #[test]
    fn test_revise_without_overlap() {
        let structure = PuzzleStructure::parse("___\n###\n___\n", "CAT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();
        assert!(!engine.revise(&across(0, 0, 3), &across(2, 0, 3)));
        assert_eq!(engine.domain(&across(0, 0, 3)).len(), 2);
    }

    #[test]
    fn test_ac3_idempotent() {
        let structure =
            PuzzleStructure::parse("____\n_##_\n____\n", "SALT\nSEA\nTOE\nTEAL\nLATE\nEAT\nAXE\n")
                .unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();
        assert!(engine.ac3(None));
        let once = engine.domains.clone();
        assert!(engine.ac3(None));
        assert_eq!(engine.domains, once);
    }

    #[test]
    fn test_ac3_initial_arcs() {
        let structure = PuzzleStructure::parse(CORNER, "CAT\nACT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();

        let x = across(0, 0, 3);
        let y = down(0, 1, 3);
        // Only y is revised; x has no other neighbor to requeue.
        assert!(engine.ac3(Some(&[(y, x)][..])));
        assert_eq!(words(engine.domain(&x)), vec!["ACT", "CAT", "DOG"]);
        assert_eq!(words(engine.domain(&y)), vec!["ACT", "CAT"]);
    }

    #[test]
    fn test_ac3_empty_domain() {
        let structure = PuzzleStructure::parse(CORNER, "CAT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();
        assert!(!engine.ac3(None));
    }

    #[test]
    fn test_select_minimum_domain() {
        let structure = PuzzleStructure::parse(CORNER, "CAT\nACT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();
        engine.domains[1].remove("DOG");

        let mut assignment = Assignment::new();
        assert_eq!(engine.select_unassigned_variable(&assignment), Some(down(0, 1, 3)));

        assignment.insert(down(0, 1, 3), "CAT");
        assert_eq!(engine.select_unassigned_variable(&assignment), Some(across(0, 0, 3)));

        assignment.insert(across(0, 0, 3), "ACT");
        assert_eq!(engine.select_unassigned_variable(&assignment), None);
    }

    #[test]
    fn test_select_degree_tie_break() {
        // The middle down slot crosses both across slots.
        let structure = PuzzleStructure::parse("___\n#_#\n___\n", "ABC\nDEF\nGHI\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();
        assert_eq!(
            engine.select_unassigned_variable(&Assignment::new()),
            Some(down(0, 1, 3))
        );
    }

    #[test]
    fn test_select_structural_tie_break() {
        let structure = PuzzleStructure::parse(PLUS, "CAT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();
        assert_eq!(
            engine.select_unassigned_variable(&Assignment::new()),
            Some(down(0, 1, 3))
        );
    }

    #[test]
    fn test_order_domain_values() {
        let structure = PuzzleStructure::parse(CORNER, "CAT\nACT\nAIM\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();

        // Letters at the crossing: ACT -> C, AIM -> I, CAT -> A, DOG -> O.
        // The down slot has two words starting with A and one with C.
        let x = across(0, 0, 3);
        let ordered = engine.order_domain_values(&x, &Assignment::new());
        assert_eq!(ordered, vec!["CAT", "ACT", "AIM", "DOG"]);

        // With the neighbor assigned there is nothing left to constrain.
        let mut assignment = Assignment::new();
        assignment.insert(down(0, 1, 3), "AIM");
        let ordered = engine.order_domain_values(&x, &assignment);
        assert_eq!(ordered, vec!["ACT", "AIM", "CAT", "DOG"]);
    }

    #[test]
    fn test_consistent() {
        let structure = PuzzleStructure::parse(CORNER, "CAT\nACT\nDOG\n").unwrap();
        let engine = ConstraintEngine::new(&structure);
        let x = across(0, 0, 3);
        let y = down(0, 1, 3);

        let mut assignment = Assignment::new();
        assert!(engine.consistent(&assignment));

        assignment.insert(x, "CAT");
        assert!(engine.consistent(&assignment));

        assignment.insert(y, "ACT");
        assert!(engine.consistent(&assignment));

        assignment.insert(y, "DOG");
        assert!(!engine.consistent(&assignment));

        assignment.insert(y, "CAT");
        assert!(!engine.consistent(&assignment));

        assignment.remove(&y);
        assignment.insert(x, "TREE");
        assert!(!engine.consistent(&assignment));
    }

    #[test]
    fn test_backtrack_rejects_inconsistent_start() {
        let structure = PuzzleStructure::parse(CORNER, "CAT\nACT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();

        let mut start = Assignment::new();
        start.insert(across(0, 0, 3), "CAT");
        start.insert(down(0, 1, 3), "DOG");
        assert_eq!(engine.backtrack(start), None);
    }

    #[test]
    fn test_backtrack_from_partial() {
        let structure = PuzzleStructure::parse(CORNER, "CAT\nACT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        engine.enforce_node_consistency();

        let mut start = Assignment::new();
        start.insert(across(0, 0, 3), "CAT");
        let solution = engine.backtrack(start).expect("solution");
        assert_eq!(&solution[&down(0, 1, 3)], "ACT");
    }

    #[test]
    fn test_solve_corner() {
        let structure = PuzzleStructure::parse(CORNER, "CAT\nACT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        let solution = engine.solve().expect("solution");

        assert!(engine.assignment_complete(&solution));
        assert!(engine.consistent(&solution));
        assert_eq!(&solution[&across(0, 0, 3)], "ACT");
        assert_eq!(&solution[&down(0, 1, 3)], "CAT");
        assert_eq!(engine.num_guesses(), 3);
    }

    #[test]
    fn test_solve_short_circuits() {
        let structure = PuzzleStructure::parse(CORNER, "CAT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        assert_eq!(engine.solve(), None);
        assert_eq!(engine.num_guesses(), 0);
    }

    #[test]
    fn test_solve_no_words_of_length() {
        let structure = PuzzleStructure::parse("____\n", "CAT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        assert_eq!(engine.solve(), None);
        assert_eq!(engine.num_guesses(), 0);
    }

    #[test]
    fn test_solve_exhausts_search() {
        // Arc consistent, but the only agreeing pairs reuse a word.
        let structure = PuzzleStructure::parse(PLUS, "CAT\nDOG\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        assert_eq!(engine.solve(), None);
        assert!(engine.num_guesses() > 0);
    }

    #[test]
    fn test_solve_without_slots() {
        let structure = PuzzleStructure::parse("_#\n#_\n", "CAT\n").unwrap();
        let mut engine = ConstraintEngine::new(&structure);
        assert_eq!(engine.solve(), Some(Assignment::new()));
    }
}
