//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the spreadsheet engine.
//! CONTEXT: Re-exports the spreadsheet, its dependency graph, and the view
//! trait for use by host applications. The parser crate supplies the
//! expression trees this engine stores and evaluates.

pub mod dependency_extractor;
pub mod dependency_graph;
pub mod error;
pub mod spreadsheet;
pub mod view;

// Re-export commonly used types at the crate root
pub use dependency_extractor::extract_references;
pub use dependency_graph::{CycleError, DependencyGraph};
pub use error::SpreadsheetError;
pub use spreadsheet::Spreadsheet;
pub use view::{NullView, View};

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingView {
        updates: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl View for RecordingView {
        fn clear_cells(&mut self) {
            self.updates.borrow_mut().clear();
        }

        fn display_cell(&mut self, cellname: &str, text: &str) {
            self.updates
                .borrow_mut()
                .push((cellname.to_string(), text.to_string()));
        }
    }

    fn sheet() -> Spreadsheet {
        Spreadsheet::new(Box::new(NullView))
    }

    #[test]
    fn edit_propagates_to_dependents() {
        let mut sheet = sheet();
        sheet.set_cell("A1", "5").unwrap();
        sheet.set_cell("A2", "7").unwrap();
        sheet.set_cell("A3", "=A1+A2").unwrap();
        assert_eq!(sheet.get_calculated_value("A3"), 12.0);

        sheet.set_cell("A1", "10").unwrap();
        assert_eq!(sheet.get_calculated_value("A3"), 17.0);
    }

    #[test]
    fn circular_reference_is_rejected_without_side_effects() {
        let mut sheet = sheet();
        sheet.set_cell("A1", "=A2").unwrap();
        let err = sheet.set_cell("A2", "=A1").unwrap_err();
        assert!(err.is_circular_reference());

        // the failed edit is a no-op
        assert_eq!(sheet.get_raw_text("A2"), "");
        assert_eq!(sheet.get_calculated_value("A2"), 0.0);
        assert_eq!(sheet.get_raw_text("A1"), "=A2");
    }

    #[test]
    fn self_reference_is_rejected() {
        let mut sheet = sheet();
        assert!(sheet.set_cell("A1", "=A1+1").unwrap_err().is_circular_reference());
        assert!(sheet
            .set_cell("B2", "=SUM(B1:B4)")
            .unwrap_err()
            .is_circular_reference());
    }

    #[test]
    fn range_cycle_is_rejected_transitively() {
        let mut sheet = sheet();
        sheet.set_cell("B4", "=SUM(B1:B3)").unwrap();
        // B1 feeding off B4 would close a loop through the range
        assert!(sheet.set_cell("B1", "=B4").unwrap_err().is_circular_reference());
        assert_eq!(sheet.get_raw_text("B1"), "");
    }

    #[test]
    fn range_aggregates_over_cells() {
        let mut sheet = sheet();
        sheet.set_cell("B1", "1").unwrap();
        sheet.set_cell("B2", "2").unwrap();
        sheet.set_cell("B3", "3").unwrap();

        sheet.set_cell("B4", "=SUM(B1:B3)").unwrap();
        assert_eq!(sheet.get_calculated_value("B4"), 6.0);

        sheet.set_cell("B5", "=AVERAGE(B1:B3)").unwrap();
        assert_eq!(sheet.get_calculated_value("B5"), 2.0);

        sheet.set_cell("B6", "=STDEV(B1:B3)").unwrap();
        let expected = (6.0f64).sqrt() / 3.0;
        assert!((sheet.get_calculated_value("B6") - expected).abs() < 1e-12);
    }

    #[test]
    fn aggregates_recalculate_when_inputs_change() {
        let mut sheet = sheet();
        sheet.set_cell("B1", "1").unwrap();
        sheet.set_cell("B2", "2").unwrap();
        sheet.set_cell("B4", "=SUM(B1:B3)").unwrap();
        assert_eq!(sheet.get_calculated_value("B4"), 3.0);

        // B3 was empty inside the range; giving it a value updates the sum
        sheet.set_cell("B3", "4").unwrap();
        assert_eq!(sheet.get_calculated_value("B4"), 7.0);
    }

    #[test]
    fn precedence_applies_in_cells() {
        let mut sheet = sheet();
        sheet.set_cell("C1", "=2+3*4").unwrap();
        assert_eq!(sheet.get_calculated_value("C1"), 14.0);
    }

    #[test]
    fn text_cells_read_as_zero() {
        let mut sheet = sheet();
        sheet.set_cell("D1", "hello world").unwrap();
        assert_eq!(sheet.get_calculated_value("D1"), 0.0);
        assert!(!sheet.is_formula("D1"));
        sheet.set_cell("D2", "=D1+3").unwrap();
        assert_eq!(sheet.get_calculated_value("D2"), 3.0);
    }

    #[test]
    fn division_by_zero_is_infinite() {
        let mut sheet = sheet();
        sheet.set_cell("E1", "=1/0").unwrap();
        let value = sheet.get_calculated_value("E1");
        assert!(value.is_infinite() && value.is_sign_positive());
    }

    #[test]
    fn dash_range_separator_matches_colon() {
        let mut sheet = sheet();
        sheet.set_cell("A1", "10").unwrap();
        sheet.set_cell("A2", "7").unwrap();
        sheet.set_cell("A3", "4").unwrap();
        sheet.set_cell("F1", "=SUM(A1-A3)").unwrap();
        sheet.set_cell("F2", "=SUM(A1:A3)").unwrap();
        assert_eq!(sheet.get_calculated_value("F1"), 21.0);
        assert_eq!(
            sheet.get_calculated_value("F1"),
            sheet.get_calculated_value("F2")
        );
    }

    #[test]
    fn chained_dependents_update_in_one_edit() {
        let view = RecordingView::default();
        let updates = Rc::clone(&view.updates);
        let mut sheet = Spreadsheet::new(Box::new(view));

        sheet.set_cell("A1", "1").unwrap();
        sheet.set_cell("A2", "=A1*2").unwrap();
        sheet.set_cell("A3", "=A2*2").unwrap();

        updates.borrow_mut().clear();
        sheet.set_cell("A1", "5").unwrap();

        assert_eq!(sheet.get_calculated_value("A2"), 10.0);
        assert_eq!(sheet.get_calculated_value("A3"), 20.0);

        // the single edit redisplayed the edited cell and both dependents,
        // each with its new value
        let updates = updates.borrow();
        assert_eq!(
            *updates,
            vec![
                ("A1".to_string(), "5".to_string()),
                ("A2".to_string(), "10".to_string()),
                ("A3".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn diamond_dependents_see_consistent_inputs() {
        let mut sheet = sheet();
        sheet.set_cell("A1", "1").unwrap();
        sheet.set_cell("A2", "=A1+1").unwrap();
        sheet.set_cell("A3", "=A1+2").unwrap();
        sheet.set_cell("A4", "=A2+A3").unwrap();
        assert_eq!(sheet.get_calculated_value("A4"), 5.0);

        sheet.set_cell("A1", "10").unwrap();
        assert_eq!(sheet.get_calculated_value("A4"), 23.0);
    }

    #[test]
    fn save_load_round_trip_preserves_state() {
        let mut sheet = sheet();
        sheet.set_cell("A1", "5").unwrap();
        sheet.set_cell("A2", "=A1*2").unwrap();
        sheet.set_cell("B1", "=SUM(A1:A2)").unwrap();
        sheet.set_cell("D1", "hello world").unwrap();
        sheet.set_cell("E1", "").unwrap();

        let mut buffer = Vec::new();
        sheet.save(&mut buffer).unwrap();

        let mut restored = Spreadsheet::new(Box::new(NullView));
        restored.load(Cursor::new(&buffer)).unwrap();

        for cellname in ["A1", "A2", "B1", "D1", "E1"] {
            assert_eq!(
                restored.get_calculated_value(cellname),
                sheet.get_calculated_value(cellname),
                "value mismatch for {}",
                cellname
            );
            assert_eq!(
                restored.get_raw_text(cellname),
                sheet.get_raw_text(cellname),
                "raw text mismatch for {}",
                cellname
            );
        }

        // the format is stable: saving the restored sheet reproduces the bytes
        let mut again = Vec::new();
        restored.save(&mut again).unwrap();
        assert_eq!(buffer, again);
    }

    #[test]
    fn save_writes_one_line_per_cell() {
        let mut sheet = sheet();
        sheet.set_cell("A2", "=A1+1").unwrap();
        sheet.set_cell("A1", "3").unwrap();

        let mut buffer = Vec::new();
        sheet.save(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        // A1 exists only as a referenced vertex until it is edited; both
        // cells have expressions here and are written sorted by name
        assert_eq!(text, "A1 3\nA2 =A1+1\n");
    }

    #[test]
    fn load_skips_lines_that_fail_to_apply() {
        let mut sheet = sheet();
        let input = "A1 =1+\nA2 42\n";
        sheet.load(Cursor::new(input)).unwrap();

        assert_eq!(sheet.get_raw_text("A1"), "");
        assert_eq!(sheet.get_calculated_value("A2"), 42.0);
    }

    #[test]
    fn load_replaces_existing_contents() {
        let mut sheet = sheet();
        sheet.set_cell("Z9", "99").unwrap();
        sheet.load(Cursor::new("A1 1\n")).unwrap();

        assert_eq!(sheet.get_raw_text("Z9"), "");
        assert_eq!(sheet.get_calculated_value("A1"), 1.0);
    }

    #[test]
    fn save_and_load_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.txt");

        let mut sheet = sheet();
        sheet.set_cell("A1", "2").unwrap();
        sheet.set_cell("A2", "=A1*A1").unwrap();
        sheet.save_path(&path).unwrap();

        let mut restored = Spreadsheet::new(Box::new(NullView));
        restored.load_path(&path).unwrap();
        assert_eq!(restored.get_calculated_value("A2"), 4.0);
        assert_eq!(restored.get_raw_text("A2"), "=A1*A1");
    }
}
