//! Formula evaluation for the grid.
//!
//! Evaluation is a pure function of the current [`CellStore`]: nothing is
//! cached, so every read reflects the latest raw values. A formula body is
//! reduced in three passes: range functions are replaced by their aggregate,
//! bare references by their (recursively evaluated) values, and whatever is
//! left must be plain arithmetic for [`evaluate_arithmetic`].

use super::address::{CellId, CellPosition, Range, parse_cell_id};
use super::errors::FormulaError;
use super::models::{CellStore, GridDimensions};
use super::parser::evaluate_arithmetic;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;

/// Group 1 is the character before the name (kept in the output), so
/// `ASUM(..)` is not read as `A` followed by `SUM(..)`.
static RANGE_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^A-Z0-9.])(SUM|AVERAGE|COUNT|MAX|MIN)\(\s*([A-Z]+\d+)\s*:\s*([A-Z]+\d+)\s*\)")
        .expect("range function pattern is valid")
});

/// Longest chain of formula cells followed before giving up with `#ERROR!`.
pub const MAX_EVALUATION_DEPTH: usize = 256;

static CELL_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]+\d+").expect("cell reference pattern is valid"));

static ARITHMETIC_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9\s.+\-*/()]*$").expect("arithmetic pattern is valid"));

/// The display value of one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Error(err) => write!(f, "{}", err),
        }
    }
}

/// Range functions recognized inside formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFunction {
    Sum,
    Average,
    Count,
    Max,
    Min,
}

impl RangeFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SUM" => Some(Self::Sum),
            "AVERAGE" => Some(Self::Average),
            "COUNT" => Some(Self::Count),
            "MAX" => Some(Self::Max),
            "MIN" => Some(Self::Min),
            _ => None,
        }
    }

    /// Aggregates the numeric values of a range. Every function yields 0 over
    /// an empty input.
    pub fn apply(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let total: f64 = values.iter().sum();
        match self {
            Self::Sum => total,
            Self::Average => total / values.len() as f64,
            Self::Count => values.len() as f64,
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

/// Evaluates cells against a borrowed store.
///
/// # Examples
///
/// ```
/// use cellgrid::domain::{CellPosition, CellStore, CellValue, FormulaEvaluator, GridDimensions};
///
/// let mut store = CellStore::default();
/// store.set("A1".parse().unwrap(), "10");
/// store.set("B1".parse().unwrap(), "20");
/// store.set("C1".parse().unwrap(), "=SUM(A1:B1)");
///
/// let evaluator = FormulaEvaluator::new(&store, GridDimensions::new(5, 5));
/// assert_eq!(evaluator.value_at(CellPosition::new(0, 2)), CellValue::Number(30.0));
/// ```
pub struct FormulaEvaluator<'a> {
    store: &'a CellStore,
    dims: GridDimensions,
}

impl<'a> FormulaEvaluator<'a> {
    pub fn new(store: &'a CellStore, dims: GridDimensions) -> Self {
        Self { store, dims }
    }

    /// Evaluates a cell with nothing on the evaluation path.
    pub fn value_at(&self, pos: CellPosition) -> CellValue {
        self.evaluate(pos, &mut Vec::new())
    }

    /// Evaluates the cell at `pos`.
    ///
    /// `path` holds the formula cells currently being evaluated, outermost
    /// first. A cell is pushed for the duration of its own evaluation only,
    /// so a cell referenced twice in one formula (`=A1+A1`) is not mistaken
    /// for a cycle. `path` is left as it was found.
    pub fn evaluate(&self, pos: CellPosition, path: &mut Vec<CellId>) -> CellValue {
        let Some(raw) = self.store.get_at(pos) else {
            return CellValue::Empty;
        };
        if raw.is_empty() {
            return CellValue::Empty;
        }

        let Some(body) = raw.strip_prefix('=') else {
            return parse_literal(raw);
        };

        let id = CellId::from(pos);
        if path.contains(&id) {
            return CellValue::Error(FormulaError::Ref);
        }
        if path.len() >= MAX_EVALUATION_DEPTH {
            return CellValue::Error(FormulaError::Error);
        }

        path.push(id);
        let result = self.evaluate_body(body, path);
        path.pop();

        match result {
            Ok(value) => CellValue::Number(value),
            Err(err) => CellValue::Error(err),
        }
    }

    fn evaluate_body(&self, body: &str, path: &mut Vec<CellId>) -> Result<f64, FormulaError> {
        let upper = body.to_uppercase();
        let with_ranges = replace_all(&RANGE_FUNCTION, &upper, |caps| {
            let aggregate = self.substitute_range(caps, path)?;
            Ok(format!("{}{}", &caps[1], aggregate))
        })?;
        let substituted = replace_all(&CELL_REFERENCE, &with_ranges, |caps| {
            self.substitute_reference(&caps[0], path)
        })?;

        if !ARITHMETIC_ONLY.is_match(&substituted) {
            return Err(FormulaError::Name);
        }

        let value = evaluate_arithmetic(&substituted).map_err(|_| FormulaError::Error)?;
        Ok(round_to_places(value, 4))
    }

    fn substitute_range(&self, caps: &Captures<'_>, path: &mut Vec<CellId>) -> Result<String, FormulaError> {
        let function = RangeFunction::from_name(&caps[2]).ok_or(FormulaError::Name)?;
        let (Ok(start), Ok(end)) = (parse_cell_id(&caps[3]), parse_cell_id(&caps[4])) else {
            return Err(FormulaError::Name);
        };
        if !self.dims.contains(start) || !self.dims.contains(end) {
            return Err(FormulaError::Ref);
        }

        let values: Vec<f64> = Range::new(start, end)
            .bounds()
            .positions()
            .filter_map(|pos| self.evaluate(pos, path).as_number())
            .collect();

        Ok(format_number(function.apply(&values)))
    }

    fn substitute_reference(&self, reference: &str, path: &mut Vec<CellId>) -> Result<String, FormulaError> {
        let pos = parse_cell_id(reference).map_err(|_| FormulaError::Ref)?;
        if !self.dims.contains(pos) {
            return Err(FormulaError::Ref);
        }

        match self.evaluate(pos, path) {
            CellValue::Empty => Ok("0".to_string()),
            CellValue::Number(n) => Ok(format_number(n)),
            CellValue::Text(text) => Ok(text),
            CellValue::Error(err) => Err(err),
        }
    }

    /// Display text for the cell at `pos`.
    pub fn display_value(&self, pos: CellPosition) -> String {
        self.value_at(pos).to_string()
    }
}

/// Non-formula text: a finite number when the whole trimmed text parses,
/// otherwise the literal unchanged.
fn parse_literal(raw: &str) -> CellValue {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(raw.to_string()),
    }
}

fn replace_all<F>(pattern: &Regex, text: &str, mut replacement: F) -> Result<String, FormulaError>
where
    F: FnMut(&Captures<'_>) -> Result<String, FormulaError>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&replacement(&caps)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn format_number(n: f64) -> String {
    // Parenthesized so a negative value cannot merge with a preceding operator.
    if n < 0.0 { format!("({})", n) } else { n.to_string() }
}

fn round_to_places(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    if !rounded.is_finite() {
        value
    } else if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(cells: &[(&str, &str)]) -> CellStore {
        let mut store = CellStore::default();
        for (id, raw) in cells {
            store.set(id.parse().unwrap(), raw);
        }
        store
    }

    fn eval(store: &CellStore, id: &str) -> CellValue {
        let pos = parse_cell_id(id).unwrap();
        FormulaEvaluator::new(store, GridDimensions::default()).value_at(pos)
    }

    fn display(store: &CellStore, id: &str) -> String {
        eval(store, id).to_string()
    }

    #[test]
    fn test_empty_and_literals() {
        let store = store_with(&[("A1", "hello"), ("A2", "12.5"), ("A3", " 7 "), ("A4", "inf"), ("A5", "12abc")]);
        assert_eq!(eval(&store, "B1"), CellValue::Empty);
        assert_eq!(display(&store, "B1"), "");
        assert_eq!(eval(&store, "A1"), CellValue::Text("hello".to_string()));
        assert_eq!(eval(&store, "A2"), CellValue::Number(12.5));
        assert_eq!(eval(&store, "A3"), CellValue::Number(7.0));
        assert_eq!(eval(&store, "A4"), CellValue::Text("inf".to_string()));
        assert_eq!(eval(&store, "A5"), CellValue::Text("12abc".to_string()));
    }

    #[test]
    fn test_simple_arithmetic() {
        let store = store_with(&[("A1", "=2+3"), ("A2", "=10-3"), ("A3", "=4*5"), ("A4", "=15/3"), ("A5", "=(1+2)*3")]);
        assert_eq!(display(&store, "A1"), "5");
        assert_eq!(display(&store, "A2"), "7");
        assert_eq!(display(&store, "A3"), "20");
        assert_eq!(display(&store, "A4"), "5");
        assert_eq!(display(&store, "A5"), "9");
    }

    #[test]
    fn test_rounds_to_four_places() {
        let store = store_with(&[("A1", "=1/3"), ("A2", "=22/7"), ("A3", "=0.00001")]);
        assert_eq!(display(&store, "A1"), "0.3333");
        assert_eq!(display(&store, "A2"), "3.1429");
        assert_eq!(display(&store, "A3"), "0");
    }

    #[test]
    fn test_cell_references() {
        let store = store_with(&[("A1", "10"), ("B1", "20"), ("A2", "-5"), ("C1", "=A1+B1"), ("C2", "=b1/a2"), ("C3", "=A1-A2")]);
        assert_eq!(display(&store, "C1"), "30");
        assert_eq!(display(&store, "C2"), "-4");
        assert_eq!(display(&store, "C3"), "15");
    }

    #[test]
    fn test_empty_reference_counts_as_zero() {
        let store = store_with(&[("A1", "=B1+1"), ("A2", "=B1")]);
        assert_eq!(display(&store, "A1"), "1");
        assert_eq!(display(&store, "A2"), "0");
    }

    #[test]
    fn test_chained_references() {
        let store = store_with(&[("A1", "2"), ("A2", "=A1*3"), ("A3", "=A2+A1")]);
        assert_eq!(display(&store, "A3"), "8");
    }

    #[test]
    fn test_self_reference_is_ref_error() {
        let store = store_with(&[("A1", "=A1")]);
        assert_eq!(display(&store, "A1"), "#REF!");
    }

    #[test]
    fn test_mutual_cycle_is_ref_error() {
        let store = store_with(&[("A1", "=B1"), ("B1", "=A1")]);
        assert_eq!(display(&store, "A1"), "#REF!");
        assert_eq!(display(&store, "B1"), "#REF!");
    }

    #[test]
    fn test_repeated_reference_is_not_a_cycle() {
        let store = store_with(&[("A1", "4"), ("B1", "=A1+A1"), ("C1", "=B1*B1+SUM(A1:B1)")]);
        assert_eq!(display(&store, "B1"), "8");
        assert_eq!(display(&store, "C1"), "76");
    }

    #[test]
    fn test_range_aggregation() {
        let store = store_with(&[
            ("A1", "1"),
            ("A2", "2"),
            ("A3", "x"),
            ("B1", "=SUM(A1:A3)"),
            ("B2", "=COUNT(A1:A3)"),
            ("B3", "=AVERAGE(A1:A3)"),
            ("B4", "=MAX(A3:A1)"),
            ("B5", "=min(a1:a3)"),
        ]);
        assert_eq!(display(&store, "B1"), "3");
        assert_eq!(display(&store, "B2"), "2");
        assert_eq!(display(&store, "B3"), "1.5");
        assert_eq!(display(&store, "B4"), "2");
        assert_eq!(display(&store, "B5"), "1");
    }

    #[test]
    fn test_range_over_no_numbers_is_zero() {
        let store = store_with(&[
            ("A1", "text"),
            ("B1", "=SUM(C1:C5)"),
            ("B2", "=AVERAGE(A1:A1)"),
            ("B3", "=MAX(C1:D2)"),
            ("B4", "=MIN(C1:D2)"),
            ("B5", "=COUNT(C1:D2)"),
        ]);
        for id in ["B1", "B2", "B3", "B4", "B5"] {
            assert_eq!(display(&store, id), "0", "{id}");
        }
    }

    #[test]
    fn test_range_with_negative_results_in_expression() {
        let store = store_with(&[("A1", "-3"), ("A2", "-4"), ("B1", "=10-SUM(A1:A2)"), ("B2", "=2*MIN(A1:A2)")]);
        assert_eq!(display(&store, "B1"), "17");
        assert_eq!(display(&store, "B2"), "-8");
    }

    #[test]
    fn test_range_tolerates_whitespace() {
        let store = store_with(&[("A1", "1"), ("A2", "2"), ("B1", "=SUM( A1 : A2 ) * 2")]);
        assert_eq!(display(&store, "B1"), "6");
    }

    #[test]
    fn test_range_including_itself_skips_own_value() {
        let store = store_with(&[("A1", "5"), ("A2", "=SUM(A1:A3)"), ("A3", "7")]);
        assert_eq!(display(&store, "A2"), "12");
    }

    #[test]
    fn test_invalid_range_endpoint_is_name_error() {
        let store = store_with(&[("A1", "=SUM(A0:A3)")]);
        assert_eq!(display(&store, "A1"), "#NAME?");
    }

    #[test]
    fn test_out_of_bounds_reference_is_ref_error() {
        let store = store_with(&[("A1", "=ZZ999"), ("A2", "=SUM(A1:A1000)")]);
        assert_eq!(display(&store, "A1"), "#REF!");
        assert_eq!(display(&store, "A2"), "#REF!");
    }

    #[test]
    fn test_zero_row_reference_is_ref_error() {
        let store = store_with(&[("A1", "=B0+1")]);
        assert_eq!(display(&store, "A1"), "#REF!");
    }

    #[test]
    fn test_unsupported_function_is_name_error() {
        let store = store_with(&[("A1", "=SQRT(4)"), ("A2", "=MEDIAN(B1:B2)"), ("A3", "=2^3")]);
        assert_eq!(display(&store, "A1"), "#NAME?");
        assert_eq!(display(&store, "A2"), "#NAME?");
        assert_eq!(display(&store, "A3"), "#NAME?");
    }

    #[test]
    fn test_text_reference_is_name_error() {
        let store = store_with(&[("A1", "abc"), ("A2", "=A1+1")]);
        assert_eq!(display(&store, "A2"), "#NAME?");
    }

    #[test]
    fn test_arithmetic_failure_is_error() {
        let store = store_with(&[("A1", "=1/0"), ("A2", "=(1+2"), ("A3", "="), ("A4", "=1..2")]);
        assert_eq!(display(&store, "A1"), "#ERROR!");
        assert_eq!(display(&store, "A2"), "#ERROR!");
        assert_eq!(display(&store, "A3"), "#ERROR!");
        assert_eq!(display(&store, "A4"), "#ERROR!");
    }

    #[test]
    fn test_errors_propagate_through_references() {
        let store = store_with(&[("A1", "=1/0"), ("A2", "=A1+1"), ("A3", "=A2*2")]);
        assert_eq!(display(&store, "A3"), "#ERROR!");
    }

    #[test]
    fn test_error_in_sibling_does_not_affect_others() {
        let store = store_with(&[("A1", "=A1"), ("A2", "=2+2")]);
        assert_eq!(display(&store, "A1"), "#REF!");
        assert_eq!(display(&store, "A2"), "4");
    }

    #[test]
    fn test_live_recompute_without_stale_values() {
        let mut store = CellStore::default();
        store.set("A1".parse().unwrap(), "10");
        store.set("B1".parse().unwrap(), "20");
        store.set("C1".parse().unwrap(), "=SUM(A1:B1)");
        let dims = GridDimensions::new(5, 5);

        let c1 = CellPosition::new(0, 2);
        assert_eq!(FormulaEvaluator::new(&store, dims).value_at(c1), CellValue::Number(30.0));

        store.set("A1".parse().unwrap(), "abc");
        assert_eq!(FormulaEvaluator::new(&store, dims).value_at(c1), CellValue::Number(20.0));
    }

    #[test]
    fn test_function_name_suffix_is_not_a_range_function() {
        let store = store_with(&[("B1", "1"), ("B2", "2"), ("A3", "99"), ("C1", "=ASUM(B1:B2)"), ("C2", "=2SUM(B1:B2)")]);
        assert_eq!(display(&store, "C1"), "#NAME?");
        assert_eq!(display(&store, "C2"), "#NAME?");
    }

    #[test]
    fn test_range_functions_next_to_operators() {
        let store = store_with(&[("B1", "1"), ("B2", "2"), ("C1", "=SUM(B1:B2)+MAX(B1:B2)*(MIN(B1:B2))")]);
        assert_eq!(display(&store, "C1"), "5");
    }

    fn chain(len: usize) -> (CellStore, GridDimensions) {
        let mut store = CellStore::default();
        store.set("A1".parse().unwrap(), "1");
        for row in 2..=len {
            store.set(format!("A{row}").parse().unwrap(), &format!("=A{}+1", row - 1));
        }
        (store, GridDimensions::new(len, 1))
    }

    #[test]
    fn test_long_chain_within_depth_limit() {
        let (store, dims) = chain(MAX_EVALUATION_DEPTH);
        let evaluator = FormulaEvaluator::new(&store, dims);
        let last = CellPosition::new(MAX_EVALUATION_DEPTH - 1, 0);
        assert_eq!(evaluator.value_at(last), CellValue::Number(MAX_EVALUATION_DEPTH as f64));
    }

    #[test]
    fn test_chain_past_depth_limit_is_error() {
        let len = MAX_EVALUATION_DEPTH * 4;
        let (store, dims) = chain(len);
        let evaluator = FormulaEvaluator::new(&store, dims);

        let mut path = Vec::new();
        assert_eq!(
            evaluator.evaluate(CellPosition::new(len - 1, 0), &mut path),
            CellValue::Error(FormulaError::Error)
        );
        assert!(path.is_empty());
    }

    #[test]
    fn test_range_function_apply() {
        let values = [3.0, -1.0, 4.0];
        assert_eq!(RangeFunction::Sum.apply(&values), 6.0);
        assert_eq!(RangeFunction::Average.apply(&values), 2.0);
        assert_eq!(RangeFunction::Count.apply(&values), 3.0);
        assert_eq!(RangeFunction::Max.apply(&values), 4.0);
        assert_eq!(RangeFunction::Min.apply(&values), -1.0);
        assert_eq!(RangeFunction::Max.apply(&[]), 0.0);
    }
}
