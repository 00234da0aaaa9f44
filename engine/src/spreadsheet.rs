//! FILENAME: engine/src/spreadsheet.rs
//! PURPOSE: The live cell graph and the driver for edits, recalculation,
//! persistence, and display.
//! CONTEXT: The spreadsheet owns one expression tree per cell plus the
//! dependency graph over cell names. Setting a cell parses its text, rejects
//! circular references before committing anything, rewrites the cell's
//! outgoing edges, evaluates the new expression, and then recalculates and
//! redisplays every transitive dependent.
//!
//! FLOW OF AN EDIT:
//! raw text --> parse --> extract references --> cycle check --> commit
//! (rewrite edges, install expression) --> evaluate --> recalc dependents
//! --> push displayed text to the view

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, warn};
use parser::{parse, CellModel, ExprKind, Expression, Range};

use crate::dependency_extractor::extract_references;
use crate::dependency_graph::DependencyGraph;
use crate::error::SpreadsheetError;
use crate::view::View;

/// The spreadsheet: a sparse map of named cells, the dependency graph over
/// them, and the view that receives display updates.
pub struct Spreadsheet {
    /// One slot per known vertex. The slot is None for a cell that was only
    /// ever created as the target of another cell's reference.
    cells: HashMap<String, Option<Expression>>,
    graph: DependencyGraph,
    view: Box<dyn View>,
}

impl Spreadsheet {
    /// Creates an empty spreadsheet that pushes display updates to `view`.
    pub fn new(view: Box<dyn View>) -> Self {
        Spreadsheet {
            cells: HashMap::new(),
            graph: DependencyGraph::new(),
            view,
        }
    }

    /// Sets the raw text of a cell. Parses the text, rejects the edit if it
    /// would introduce a circular reference, then commits the new expression,
    /// evaluates it, and recalculates and redisplays every dependent.
    /// On any error the spreadsheet is left exactly as it was.
    pub fn set_cell(&mut self, cellname: &str, raw_text: &str) -> Result<(), SpreadsheetError> {
        let cellname = normalize_name(cellname);
        let exp = parse(raw_text)?;
        let references = extract_references(&exp);

        // Nothing may be mutated until the staged expression passes this check
        if self.graph.would_create_cycle(&cellname, &references) {
            return Err(SpreadsheetError::CircularReference(cellname));
        }

        // Commit: create vertices on demand, rewrite the outgoing edges
        self.cells.entry(cellname.clone()).or_insert(None);
        for reference in &references {
            self.cells.entry(reference.clone()).or_insert(None);
        }
        self.graph.set_dependencies(&cellname, references);
        self.cells.insert(cellname.clone(), Some(exp));

        self.evaluate_cell(&cellname)?;
        self.display(&cellname);

        // Recalculate every transitive dependent, inputs first
        let order = self
            .graph
            .get_recalc_order(&cellname)
            .map_err(|_| SpreadsheetError::CircularReference(cellname.clone()))?;
        if !order.is_empty() {
            debug!("set_cell {}: recalculating {} dependent(s)", cellname, order.len());
        }
        for dependent in order {
            self.evaluate_cell(&dependent)?;
            self.display(&dependent);
        }

        Ok(())
    }

    /// Returns the calculated value of the named cell, or 0.0 if the cell is
    /// unknown or empty. Reads the cached value without re-evaluating.
    pub fn get_calculated_value(&self, cellname: &str) -> f64 {
        self.cells
            .get(&normalize_name(cellname))
            .and_then(|slot| slot.as_ref())
            .map_or(0.0, |exp| exp.value())
    }

    /// Returns the raw text of the named cell, or "" if the cell is unknown
    /// or empty.
    pub fn get_raw_text(&self, cellname: &str) -> String {
        self.cells
            .get(&normalize_name(cellname))
            .and_then(|slot| slot.as_ref())
            .map_or_else(String::new, |exp| exp.raw_text().to_string())
    }

    /// Returns true if the named cell holds a formula (a cell reference,
    /// compound expression, or range aggregate).
    pub fn is_formula(&self, cellname: &str) -> bool {
        self.cells
            .get(&normalize_name(cellname))
            .and_then(|slot| slot.as_ref())
            .is_some_and(|exp| exp.is_formula())
    }

    /// Appends the current value of every cell in the range in column-major
    /// order. Unknown or empty cells contribute 0.0.
    pub fn fill_from_range(&self, range: &Range, values: &mut Vec<f64>) {
        for cellname in range.all_cell_names() {
            values.push(self.get_calculated_value(&cellname));
        }
    }

    /// Drops every expression and vertex, then clears the view.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.graph.clear();
        self.view.clear_cells();
    }

    /// Loads a spreadsheet from a reader in the one-cell-per-line format,
    /// replacing the current contents. Each line holds a cell name followed
    /// by the cell's raw text. Lines that fail to apply are logged and
    /// skipped; reading continues until the stream ends.
    pub fn load<R: BufRead>(&mut self, reader: R) -> Result<(), SpreadsheetError> {
        self.clear();
        for line in reader.lines() {
            let line = line?;
            let (cellname, raw_text) = split_line(&line);
            if cellname.is_empty() {
                continue;
            }
            if let Err(err) = self.set_cell(cellname, raw_text) {
                warn!("load: skipping cell {}: {}", cellname, err);
            }
        }
        Ok(())
    }

    /// Writes every non-empty cell as one line `NAME RAWTEXT`, in sorted
    /// name order for deterministic output.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), SpreadsheetError> {
        let mut entries: Vec<(&str, &Expression)> = self
            .cells
            .iter()
            .filter_map(|(name, slot)| slot.as_ref().map(|exp| (name.as_str(), exp)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (cellname, exp) in entries {
            writeln!(writer, "{} {}", cellname, exp.raw_text())?;
        }
        Ok(())
    }

    /// Loads a spreadsheet from the file at `path`.
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SpreadsheetError> {
        let file = File::open(path)?;
        self.load(BufReader::new(file))
    }

    /// Saves the spreadsheet to the file at `path`.
    pub fn save_path<P: AsRef<Path>>(&self, path: P) -> Result<(), SpreadsheetError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Evaluates the named cell's expression against the spreadsheet. The
    /// tree is detached from its slot for the duration of the evaluation so
    /// the spreadsheet can serve as the read-only model, then reattached
    /// with its caches updated.
    fn evaluate_cell(&mut self, cellname: &str) -> Result<(), SpreadsheetError> {
        let detached = match self.cells.get_mut(cellname) {
            Some(slot) => slot.take(),
            None => None,
        };
        let Some(mut exp) = detached else {
            return Ok(());
        };

        let result = exp.evaluate(&*self);

        if let Some(slot) = self.cells.get_mut(cellname) {
            *slot = Some(exp);
        }
        result?;
        Ok(())
    }

    /// Pushes the displayed text of the named cell to the view: a text cell
    /// shows its raw text unchanged; everything else shows the calculated
    /// value formatted as a real.
    fn display(&mut self, cellname: &str) {
        let Some(Some(exp)) = self.cells.get(cellname) else {
            return;
        };
        let text = match exp.kind() {
            ExprKind::Text(_) => exp.raw_text().to_string(),
            _ => format!("{}", exp.value()),
        };
        self.view.display_cell(cellname, &text);
    }
}

impl CellModel for Spreadsheet {
    fn get_calculated_value(&self, cellname: &str) -> f64 {
        Spreadsheet::get_calculated_value(self, cellname)
    }

    fn fill_from_range(&self, range: &Range, values: &mut Vec<f64>) {
        Spreadsheet::fill_from_range(self, range, values)
    }
}

fn normalize_name(cellname: &str) -> String {
    cellname.trim().to_uppercase()
}

/// Splits a persistence line into the cell name and the raw text: the name
/// runs to the first whitespace, and exactly one separator space is dropped
/// from the remainder.
fn split_line(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.find(char::is_whitespace) {
        Some(idx) => {
            let (cellname, rest) = line.split_at(idx);
            (cellname, rest.strip_prefix(' ').unwrap_or(rest))
        }
        None => (line, ""),
    }
}
