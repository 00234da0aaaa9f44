//! FILENAME: engine/src/dependency_graph.rs
//! PURPOSE: Directed dependency graph over cell names.
//! CONTEXT: This module is the heart of the spreadsheet's recalculation
//! machinery. It tracks which cells reference which other cells, detects
//! circular references before a formula change is committed, and computes
//! the recalculation order for dependents using topological sorting.
//!
//! TERMINOLOGY:
//! - Precedents: cells that a formula cell references (its inputs).
//!   If A3 = A1 + A2, then A1 and A2 are precedents of A3.
//! - Dependents: cells that reference a given cell (reverse lookup).
//!   If A3 = A1 + A2, then A3 is a dependent of A1 and A2.

use std::collections::{HashMap, HashSet, VecDeque};

/// Error type for cycle detection.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleError {
    /// The cells involved in the cycle, in order.
    pub cycle_path: Vec<String>,
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Circular reference detected: ")?;
        for (i, cellname) in self.cycle_path.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", cellname)?;
        }
        Ok(())
    }
}

impl std::error::Error for CycleError {}

/// The dependency graph maintains both forward (precedents) and reverse
/// (dependents) mappings for efficient lookups in either direction.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// For each cell, the set of cells its expression directly references.
    /// If A3 = A1 + A2, then precedents[A3] = {A1, A2}.
    precedents: HashMap<String, HashSet<String>>,

    /// For each cell, the set of cells that directly reference it.
    /// If A3 = A1 + A2, then dependents[A1] and dependents[A2] contain A3.
    dependents: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    /// Creates a new, empty dependency graph.
    pub fn new() -> Self {
        DependencyGraph {
            precedents: HashMap::new(),
            dependents: HashMap::new(),
        }
    }

    /// Sets the outgoing edges of a cell, replacing any previous edges.
    /// Does NOT check for cycles; call `would_create_cycle` first.
    pub fn set_dependencies(&mut self, cellname: &str, new_precedents: HashSet<String>) {
        // First, remove old dependencies
        self.clear_dependencies(cellname);

        if !new_precedents.is_empty() {
            // Update the dependents map: for each precedent, add this cell
            for prec in &new_precedents {
                self.dependents
                    .entry(prec.clone())
                    .or_default()
                    .insert(cellname.to_string());
            }

            // Store the precedents for this cell
            self.precedents.insert(cellname.to_string(), new_precedents);
        }
    }

    /// Clears all outgoing edges of a cell.
    /// Call this when a cell becomes a literal value or is cleared.
    pub fn clear_dependencies(&mut self, cellname: &str) {
        if let Some(old_precs) = self.precedents.remove(cellname) {
            // Remove this cell from each precedent's dependents set
            for prec in old_precs {
                if let Some(deps) = self.dependents.get_mut(&prec) {
                    deps.remove(cellname);
                    // Clean up empty sets
                    if deps.is_empty() {
                        self.dependents.remove(&prec);
                    }
                }
            }
        }
    }

    /// Returns the direct precedents of a cell (cells it directly references),
    /// or None if the cell has none.
    pub fn get_precedents(&self, cellname: &str) -> Option<&HashSet<String>> {
        self.precedents.get(cellname)
    }

    /// Returns the direct dependents of a cell (cells that directly reference
    /// it), or None if no cells depend on this cell.
    pub fn get_dependents(&self, cellname: &str) -> Option<&HashSet<String>> {
        self.dependents.get(cellname)
    }

    /// Checks if giving the cell these outgoing edges would create a cycle.
    /// A DFS from each proposed precedent over the committed edges decides
    /// whether the edited cell is reachable.
    pub fn would_create_cycle(&self, cellname: &str, new_precedents: &HashSet<String>) -> bool {
        // A cell referencing itself is a trivial cycle
        if new_precedents.contains(cellname) {
            return true;
        }

        for prec in new_precedents {
            if self.can_reach(prec, cellname) {
                return true;
            }
        }

        false
    }

    /// Checks if `start` can reach `target` by following precedent chains.
    /// If precedent P can reach cell C, then C referencing P would be a cycle.
    fn can_reach(&self, start: &str, target: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }

            if !visited.insert(current) {
                continue;
            }

            // Follow the precedent chain (what does `current` reference?)
            if let Some(precs) = self.precedents.get(current) {
                for prec in precs {
                    if !visited.contains(prec.as_str()) {
                        stack.push(prec);
                    }
                }
            }
        }

        false
    }

    /// Gets all cells that need recalculation when a cell's value changes,
    /// in topological order (inputs before the cells reading them). The
    /// changed cell itself is not included. Fails with CycleError if the
    /// affected cells contain a cycle.
    pub fn get_recalc_order(&self, changed: &str) -> Result<Vec<String>, CycleError> {
        let affected = self.get_all_dependents(changed);

        if affected.is_empty() {
            return Ok(Vec::new());
        }

        self.topological_sort(&affected)
    }

    /// Gets all transitive dependents of a cell (not including the cell
    /// itself), by BFS over the dependents map.
    fn get_all_dependents(&self, cellname: &str) -> HashSet<String> {
        let mut result = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        if let Some(deps) = self.dependents.get(cellname) {
            queue.extend(deps.iter().cloned());
        }

        while let Some(current) = queue.pop_front() {
            if result.contains(&current) {
                continue;
            }

            if let Some(deps) = self.dependents.get(&current) {
                for dep in deps {
                    if !result.contains(dep) {
                        queue.push_back(dep.clone());
                    }
                }
            }
            result.insert(current);
        }

        result
    }

    /// Topologically sorts a subset of cells using Kahn's algorithm, so that
    /// each cell comes after all of its precedents in the subset.
    fn topological_sort(&self, cells: &HashSet<String>) -> Result<Vec<String>, CycleError> {
        // Build the in-degree map, counting only edges within the subset
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        for cell in cells {
            in_degree.insert(cell, 0);
        }

        for cell in cells {
            if let Some(precs) = self.precedents.get(cell) {
                for prec in precs {
                    if cells.contains(prec) {
                        *in_degree.get_mut(cell.as_str()).unwrap() += 1;
                    }
                }
            }
        }

        // Start from the cells with no precedents in the subset
        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&cell, _)| cell)
            .collect();

        let mut result = Vec::with_capacity(cells.len());

        while let Some(cell) = queue.pop_front() {
            result.push(cell.to_string());

            // Decrease the in-degree of all dependents in the subset
            if let Some(deps) = self.dependents.get(cell) {
                for dep in deps {
                    if let Some(deg) = in_degree.get_mut(dep.as_str()) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push_back(dep);
                        }
                    }
                }
            }
        }

        // If we didn't process all cells, there's a cycle
        if result.len() != cells.len() {
            let cycle_path = in_degree
                .iter()
                .filter(|(_, &deg)| deg > 0)
                .map(|(&cell, _)| cell.to_string())
                .collect();
            return Err(CycleError { cycle_path });
        }

        Ok(result)
    }

    /// Returns the number of cells that currently have outgoing edges.
    pub fn formula_cell_count(&self) -> usize {
        self.precedents.len()
    }

    /// Returns the total number of dependency edges.
    pub fn dependency_count(&self) -> usize {
        self.precedents.values().map(|v| v.len()).sum()
    }

    /// Clears the entire dependency graph.
    pub fn clear(&mut self) {
        self.precedents.clear();
        self.dependents.clear();
    }
}
