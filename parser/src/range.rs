//! FILENAME: parser/src/range.rs
//! PURPOSE: Cell-name conversions, the rectangular Range type, and the
//! aggregate functions applied to a range of values.
//! CONTEXT: Cell names use A1-style notation. Column letters encode a 0-based
//! column index ("A" = 0, "Z" = 25, "AA" = 26); the digits encode a 1-based
//! row. Row 1 in A1 notation = row 0 internally.

use std::fmt;

/// Names of the aggregate functions allowed in a range expression, uppercase.
pub const FUNCTION_NAMES: [&str; 8] = [
    "AVERAGE", "MAX", "MEAN", "MEDIAN", "MIN", "PRODUCT", "STDEV", "SUM",
];

/// Error for a range constructor given bad coordinates, or a coordinate
/// converter given a negative row or column.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidArgument {
    pub message: String,
}

impl InvalidArgument {
    pub fn new(message: impl Into<String>) -> Self {
        InvalidArgument {
            message: message.into(),
        }
    }
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid argument: {}", self.message)
    }
}

impl std::error::Error for InvalidArgument {}

/// Converts 0-based row and column indices into an A1-style cell name.
/// (0, 0) -> "A1", (0, 25) -> "Z1", (0, 26) -> "AA1", (16, 26) -> "AA17"
pub fn to_cell_name(row: i32, column: i32) -> Result<String, InvalidArgument> {
    if row < 0 || column < 0 {
        return Err(InvalidArgument::new("row/column cannot be negative"));
    }

    let mut letters = String::new();
    let mut col = column + 1; // 1-based
    while col > 0 {
        col -= 1;
        letters.insert(0, (b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    Ok(format!("{}{}", letters, row + 1))
}

/// Converts an A1-style cell name into 0-based (row, column) indices.
/// Returns None if the name is not properly formatted.
/// "A1" -> (0, 0), "B2" -> (1, 1), "AA100" -> (99, 26)
pub fn to_row_column(cellname: &str) -> Option<(i32, i32)> {
    let row = to_row(cellname)?;
    let column = to_column(cellname)?;
    Some((row, column))
}

/// Extracts the alphabetic column prefix of a cell name and converts it to a
/// 0-based column index. Returns None if the string is not properly formatted.
fn to_column(cellname: &str) -> Option<i32> {
    // chomp out the row at the end and keep only the column letters
    let name = cellname.trim().to_uppercase();
    let letters = name.trim_end_matches(|c: char| !c.is_ascii_alphabetic());
    if letters.is_empty() {
        return None;
    }

    let mut column: i64 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        column = column * 26 + (ch as i64 - 'A' as i64 + 1);
        if column > i32::MAX as i64 {
            return None;
        }
    }
    Some((column - 1) as i32)
}

/// Extracts the trailing digit run of a cell name and converts the 1-based
/// row number to a 0-based row index. Returns None if malformed.
fn to_row(cellname: &str) -> Option<i32> {
    // chomp out the column at the start and keep only the row digits
    let name = cellname.trim().to_uppercase();
    let digits = name.trim_start_matches(|c: char| !c.is_ascii_digit());
    match digits.parse::<i32>() {
        Ok(n) if n >= 1 => Some(n - 1),
        _ => None,
    }
}

/// Returns true if the given name is a valid A1-style cell name.
pub fn is_valid_name(cellname: &str) -> bool {
    to_row_column(cellname).is_some()
}

/// Returns true if the given name is one of the known aggregate function
/// names (case-insensitive).
pub fn is_known_function_name(function: &str) -> bool {
    let upper = function.to_uppercase();
    FUNCTION_NAMES.contains(&upper.as_str())
}

/// A rectangular block of cells identified by its top-left and bottom-right
/// cell names, such as B3:C5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    start_cell_name: String,
    end_cell_name: String,
}

impl Range {
    /// Constructs a range enclosing the given start and end cells and all
    /// cells between them, passed as 0-based row and column indices.
    /// Fails unless start_row <= end_row and start_column <= end_column.
    pub fn new(
        start_row: i32,
        start_column: i32,
        end_row: i32,
        end_column: i32,
    ) -> Result<Range, InvalidArgument> {
        let range = Range {
            start_cell_name: to_cell_name(start_row, start_column)?,
            end_cell_name: to_cell_name(end_row, end_column)?,
        };
        if start_row > end_row || start_column > end_column {
            return Err(InvalidArgument::new(format!("invalid range: {}", range)));
        }
        Ok(range)
    }

    /// Constructs a range from two A1-style cell names such as "A4" and "B17".
    /// Both names must be valid; the order of the endpoints is not checked
    /// (a reversed range enumerates no cells).
    pub fn from_names(start_cell_name: &str, end_cell_name: &str) -> Result<Range, InvalidArgument> {
        if !is_valid_name(start_cell_name) {
            return Err(InvalidArgument::new(format!(
                "invalid start cell name: {}",
                start_cell_name
            )));
        }
        if !is_valid_name(end_cell_name) {
            return Err(InvalidArgument::new(format!(
                "invalid end cell name: {}",
                end_cell_name
            )));
        }
        Ok(Range {
            start_cell_name: start_cell_name.trim().to_uppercase(),
            end_cell_name: end_cell_name.trim().to_uppercase(),
        })
    }

    pub fn start_cell_name(&self) -> &str {
        &self.start_cell_name
    }

    pub fn end_cell_name(&self) -> &str {
        &self.end_cell_name
    }

    /// Returns the 0-based row of the start of this range.
    pub fn start_row(&self) -> i32 {
        to_row_column(&self.start_cell_name).map_or(-1, |(row, _)| row)
    }

    /// Returns the 0-based column of the start of this range.
    pub fn start_column(&self) -> i32 {
        to_row_column(&self.start_cell_name).map_or(-1, |(_, column)| column)
    }

    /// Returns the 0-based row of the end of this range.
    pub fn end_row(&self) -> i32 {
        to_row_column(&self.end_cell_name).map_or(-1, |(row, _)| row)
    }

    /// Returns the 0-based column of the end of this range.
    pub fn end_column(&self) -> i32 {
        to_row_column(&self.end_cell_name).map_or(-1, |(_, column)| column)
    }

    /// Returns the names of all cells in this range in column-major order:
    /// for the range B3:C5 that is B3, B4, B5, C3, C4, C5. The same order is
    /// used when filling values for an aggregate function and when creating
    /// dependency edges.
    pub fn all_cell_names(&self) -> Vec<String> {
        let mut cellnames = Vec::new();
        for column in self.start_column()..=self.end_column() {
            for row in self.start_row()..=self.end_row() {
                if let Ok(cellname) = to_cell_name(row, column) {
                    cellnames.push(cellname);
                }
            }
        }
        cellnames
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_cell_name, self.end_cell_name)
    }
}

/// Sum of the values. An empty slice sums to 0.0.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Product of the values. An empty slice multiplies out to 1.0.
pub fn product(values: &[f64]) -> f64 {
    values.iter().product()
}

/// Arithmetic mean. An empty slice divides 0.0 by 0 and yields NaN.
pub fn average(values: &[f64]) -> f64 {
    sum(values) / values.len() as f64
}

/// Smallest value, keeping the first occurrence on ties.
/// An empty slice yields 0.0.
pub fn min_value(values: &[f64]) -> f64 {
    let mut iter = values.iter();
    let Some(&first) = iter.next() else {
        return 0.0;
    };
    iter.fold(first, |best, &n| if n < best { n } else { best })
}

/// Largest value, keeping the first occurrence on ties.
/// An empty slice yields 0.0.
pub fn max_value(values: &[f64]) -> f64 {
    let mut iter = values.iter();
    let Some(&first) = iter.next() else {
        return 0.0;
    };
    iter.fold(first, |best, &n| if n > best { n } else { best })
}

/// Median of the values: the middle element after sorting ascending, or the
/// mean of the two middle elements for an even count. An empty slice yields NaN.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let size = sorted.len();
    if size % 2 == 0 {
        (sorted[size / 2] + sorted[size / 2 - 1]) / 2.0
    } else {
        sorted[size / 2]
    }
}

/// Population standard deviation in the algebraic form
/// sqrt((n * sum(x^2) - sum(x)^2) / n^2). An empty slice yields NaN.
pub fn stdev(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut sum_squares = 0.0;
    for &n in values {
        sum += n;
        sum_squares += n * n;
    }
    let size = values.len() as f64;
    ((size * sum_squares - sum * sum) / (size * size)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cell_name() {
        assert_eq!(to_cell_name(0, 0).unwrap(), "A1");
        assert_eq!(to_cell_name(0, 1).unwrap(), "B1");
        assert_eq!(to_cell_name(0, 25).unwrap(), "Z1");
        assert_eq!(to_cell_name(0, 26).unwrap(), "AA1");
        assert_eq!(to_cell_name(0, 52).unwrap(), "BA1");
        assert_eq!(to_cell_name(16, 26).unwrap(), "AA17");
        assert_eq!(to_cell_name(99, 26).unwrap(), "AA100");
    }

    #[test]
    fn test_to_cell_name_rejects_negative() {
        assert!(to_cell_name(-1, 0).is_err());
        assert!(to_cell_name(0, -1).is_err());
    }

    #[test]
    fn test_to_row_column() {
        assert_eq!(to_row_column("A1"), Some((0, 0)));
        assert_eq!(to_row_column("Z1"), Some((0, 25)));
        assert_eq!(to_row_column("AA1"), Some((0, 26)));
        assert_eq!(to_row_column("BA1"), Some((0, 52)));
        assert_eq!(to_row_column("B2"), Some((1, 1)));
        assert_eq!(to_row_column("AA100"), Some((99, 26)));
    }

    #[test]
    fn test_to_row_column_normalizes() {
        assert_eq!(to_row_column(" a1 "), Some((0, 0)));
        assert_eq!(to_row_column("aa17"), Some((16, 26)));
    }

    #[test]
    fn test_to_row_column_rejects_malformed() {
        assert_eq!(to_row_column(""), None);
        assert_eq!(to_row_column("A"), None);
        assert_eq!(to_row_column("17"), None);
        assert_eq!(to_row_column("A0"), None);
        assert_eq!(to_row_column("1A"), None);
        assert_eq!(to_row_column("A1B"), None);
        assert_eq!(to_row_column("A1B2"), None);
    }

    #[test]
    fn test_roundtrip() {
        for column in 0..200 {
            for row in [0, 1, 17, 99] {
                let cellname = to_cell_name(row, column).unwrap();
                assert_eq!(
                    to_row_column(&cellname),
                    Some((row, column)),
                    "roundtrip failed for {}",
                    cellname
                );
            }
        }
    }

    #[test]
    fn test_is_known_function_name() {
        assert!(is_known_function_name("SUM"));
        assert!(is_known_function_name("sum"));
        assert!(is_known_function_name("StDev"));
        assert!(!is_known_function_name("COUNT"));
        assert!(!is_known_function_name(""));
    }

    #[test]
    fn test_range_new_enforces_order() {
        assert!(Range::new(0, 0, 2, 1).is_ok());
        assert!(Range::new(2, 0, 0, 0).is_err());
        assert!(Range::new(0, 2, 0, 0).is_err());
        assert!(Range::new(-1, 0, 0, 0).is_err());
    }

    #[test]
    fn test_range_from_names() {
        let range = Range::from_names("b3", "c5").unwrap();
        assert_eq!(range.start_cell_name(), "B3");
        assert_eq!(range.end_cell_name(), "C5");
        assert_eq!(range.to_string(), "B3:C5");
        assert!(Range::from_names("B3", "nope").is_err());
        assert!(Range::from_names("", "C5").is_err());
    }

    #[test]
    fn test_all_cell_names_column_major() {
        let range = Range::from_names("B3", "C5").unwrap();
        assert_eq!(
            range.all_cell_names(),
            vec!["B3", "B4", "B5", "C3", "C4", "C5"]
        );
    }

    #[test]
    fn test_reversed_range_enumerates_empty() {
        // from_names does not enforce endpoint order; such a range is empty
        let range = Range::from_names("C5", "B3").unwrap();
        assert!(range.all_cell_names().is_empty());
    }

    #[test]
    fn test_sum_and_product() {
        assert_eq!(sum(&[1.0, 2.0, 3.0]), 6.0);
        assert_eq!(sum(&[]), 0.0);
        assert_eq!(product(&[2.0, 3.0, 4.0]), 24.0);
        assert_eq!(product(&[]), 1.0);
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[1.0, 2.0, 3.0]), 2.0);
        assert!(average(&[]).is_nan());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min_value(&[3.0, 1.0, 2.0]), 1.0);
        assert_eq!(max_value(&[3.0, 1.0, 2.0]), 3.0);
        assert_eq!(min_value(&[5.0]), 5.0);
        assert_eq!(max_value(&[-2.0, -7.0]), -2.0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_stdev_population_form() {
        // sqrt((3 * 14 - 36) / 9) = sqrt(6) / 3
        let result = stdev(&[1.0, 2.0, 3.0]);
        assert!((result - (6.0f64).sqrt() / 3.0).abs() < 1e-12);
        assert_eq!(stdev(&[5.0, 5.0, 5.0]), 0.0);
        assert!(stdev(&[]).is_nan());
    }
}
