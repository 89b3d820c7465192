//! Expected/actual output comparison
//!
//! Outputs are normalized before comparison: line endings are unified, runs of
//! blank lines collapse, and surrounding whitespace is trimmed. If the texts
//! still differ but every non-blank line on both sides is a real number, the
//! lines are compared pairwise within an absolute epsilon.

use serde::{Deserialize, Serialize};

/// Absolute tolerance used for numeric comparison unless configured otherwise
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Comparison settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Collapse every whitespace run (including newlines) to a single space
    pub ignore_whitespace: bool,

    /// Absolute tolerance for numeric lines
    pub epsilon: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            ignore_whitespace: false,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Comparison verdict together with both normalized texts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareResult {
    pub equal: bool,
    pub normalized_expected: String,
    pub normalized_actual: String,
}

/// Stateless output comparator
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputComparator {
    options: CompareOptions,
}

impl OutputComparator {
    pub fn new(options: CompareOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Compare with this comparator's options.
    ///
    /// Two absent outputs are equal; one absent output never equals a present one.
    pub fn compare(&self, expected: Option<&str>, actual: Option<&str>) -> bool {
        compare_with(expected, actual, &self.options)
    }

    /// Compare and return both normalized texts alongside the verdict
    pub fn compare_result(&self, expected: Option<&str>, actual: Option<&str>) -> CompareResult {
        let ignore_whitespace = self.options.ignore_whitespace;
        CompareResult {
            equal: self.compare(expected, actual),
            normalized_expected: normalize(expected.unwrap_or(""), ignore_whitespace),
            normalized_actual: normalize(actual.unwrap_or(""), ignore_whitespace),
        }
    }
}

/// Compare two outputs with explicit options
pub fn compare_with(expected: Option<&str>, actual: Option<&str>, options: &CompareOptions) -> bool {
    let (expected, actual) = match (expected, actual) {
        (None, None) => return true,
        (Some(e), Some(a)) => (e, a),
        _ => return false,
    };

    let expected = normalize(expected, options.ignore_whitespace);
    let actual = normalize(actual, options.ignore_whitespace);

    if expected == actual {
        return true;
    }

    if is_numeric_output(&expected) && is_numeric_output(&actual) {
        return compare_numeric(&expected, &actual, options.epsilon);
    }

    false
}

/// Normalize program output for comparison
pub fn normalize(output: &str, ignore_whitespace: bool) -> String {
    let unified = output.replace("\r\n", "\n").replace('\r', "\n");

    if ignore_whitespace {
        return unified.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    let mut collapsed = String::with_capacity(unified.len());
    let mut previous_newline = false;
    for c in unified.chars() {
        if c == '\n' {
            if previous_newline {
                continue;
            }
            previous_newline = true;
        } else {
            previous_newline = false;
        }
        collapsed.push(c);
    }

    collapsed.trim().to_owned()
}

/// Decimal or exponent notation, plus the exact `NaN` and `Infinity` tokens
fn parse_number(line: &str) -> Option<f64> {
    match line {
        "NaN" => return Some(f64::NAN),
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    let plain = line
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !plain {
        return None;
    }
    line.parse::<f64>().ok()
}

fn is_numeric_output(output: &str) -> bool {
    if output.is_empty() {
        return false;
    }
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .all(|line| parse_number(line).is_some())
}

fn compare_numeric(expected: &str, actual: &str, epsilon: f64) -> bool {
    let expected_lines: Vec<&str> = expected.split('\n').collect();
    let actual_lines: Vec<&str> = actual.split('\n').collect();

    if expected_lines.len() != actual_lines.len() {
        return false;
    }

    expected_lines
        .iter()
        .zip(&actual_lines)
        .all(|(exp, act)| {
            let (exp, act) = (exp.trim(), act.trim());
            match (parse_number(exp), parse_number(act)) {
                (Some(e), Some(a)) => numbers_equal(e, a, epsilon),
                _ => exp == act,
            }
        })
}

fn numbers_equal(expected: f64, actual: f64, epsilon: f64) -> bool {
    match (expected.is_nan(), actual.is_nan()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }
    if expected.is_infinite() || actual.is_infinite() {
        return expected == actual;
    }
    (expected - actual).abs() <= epsilon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(expected: &str, actual: &str) -> bool {
        OutputComparator::default().compare(Some(expected), Some(actual))
    }

    fn cmp_eps(expected: &str, actual: &str, epsilon: f64) -> bool {
        let options = CompareOptions {
            epsilon,
            ..CompareOptions::default()
        };
        compare_with(Some(expected), Some(actual), &options)
    }

    fn cmp_ws(expected: &str, actual: &str) -> bool {
        let options = CompareOptions {
            ignore_whitespace: true,
            ..CompareOptions::default()
        };
        compare_with(Some(expected), Some(actual), &options)
    }

    #[test]
    fn identical_strings_are_equal() {
        assert!(cmp("Hello World", "Hello World"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert!(cmp("Hello World  ", "Hello World"));
        assert!(cmp("  Hello World", "Hello World"));
        assert!(cmp("3\n", "3"));
    }

    #[test]
    fn different_strings_are_not_equal() {
        assert!(!cmp("Hello World", "Hello"));
    }

    #[test]
    fn absent_outputs() {
        let comparator = OutputComparator::default();
        assert!(comparator.compare(None, None));
        assert!(!comparator.compare(None, Some("x")));
        assert!(!comparator.compare(Some("x"), None));
    }

    #[test]
    fn line_endings_are_unified() {
        assert!(cmp("3\r\n", "3\n"));
        assert!(cmp("Line1\r\nLine2", "Line1\nLine2"));
        assert!(cmp("Line1\rLine2", "Line1\nLine2"));
    }

    #[test]
    fn blank_line_runs_collapse() {
        assert!(cmp("a\n\n\nb", "a\nb"));
        assert!(cmp("a\r\n\r\nb", "a\nb"));
    }

    #[test]
    fn inner_spaces_matter_by_default() {
        assert!(!cmp("Hello    World", "Hello World"));
    }

    #[test]
    fn integers_compare_exactly() {
        assert!(cmp("42", "42"));
        assert!(!cmp("42", "43"));
    }

    #[test]
    fn floats_compare_within_epsilon() {
        assert!(cmp_eps("3.14159", "3.14159", 1e-5));
        assert!(cmp_eps("3.14159", "3.14160", 1e-3));
        assert!(!cmp_eps("3.14159", "3.14160", 1e-10));
    }

    #[test]
    fn differently_formatted_numbers_are_equal() {
        assert!(cmp("1.0", "1"));
        assert!(cmp("1e3", "1000"));
        assert!(cmp("0.50", ".5"));
    }

    #[test]
    fn scientific_notation() {
        assert!(cmp("1e10", "1e10"));
        assert!(cmp("1.5e-5", "1.5e-5"));
        assert!(cmp("1.5E-5", "0.000015"));
    }

    #[test]
    fn nan_and_infinity() {
        assert!(cmp("NaN", "NaN"));
        assert!(cmp("Infinity", "Infinity"));
        assert!(cmp("-Infinity", "-Infinity"));
        assert!(cmp("+Infinity", "Infinity"));
        assert!(!cmp("Infinity", "-Infinity"));
        assert!(!cmp("NaN", "1"));
        assert!(!cmp("Infinity", "1e308"));
    }

    #[test]
    fn other_special_spellings_are_text() {
        assert!(!cmp("nan", "NaN"));
        assert!(!cmp("inf", "Infinity"));
        assert!(!cmp("INFINITY", "Infinity"));
        assert!(!cmp("1\ninf", "1\nInfinity"));
        assert!(parse_number("inf").is_none());
        assert!(parse_number("infinity").is_none());
        assert!(parse_number("nan").is_none());
        assert_eq!(parse_number("-2.5E3"), Some(-2500.0));
    }

    #[test]
    fn multi_line_numeric() {
        assert!(cmp("1\n2\n3", "1\n2\n3"));
        assert!(!cmp("1\n2\n3", "1\n2\n4"));
        assert!(cmp("1.0000000001\n2", "1\n2"));
    }

    #[test]
    fn numeric_line_count_must_match() {
        assert!(!cmp("1\n2", "1\n2\n3"));
    }

    #[test]
    fn mixed_text_and_numbers_compare_exactly() {
        assert!(!cmp("answer 1.0", "answer 1"));
    }

    #[test]
    fn ignore_whitespace_collapses_runs() {
        assert!(cmp_ws("Hello    World", "Hello World"));
        assert!(cmp_ws("Hello\n\tWorld", "Hello World"));
        assert!(!cmp_ws("Hello World", "Hello"));
    }

    #[test]
    fn empty_outputs_are_equal() {
        assert!(cmp("", ""));
        assert!(cmp("\n\n", ""));
        assert!(!cmp("", "0"));
    }

    #[test]
    fn compare_result_carries_normalized_texts() {
        let result = OutputComparator::default().compare_result(Some("  Hello  "), Some("Hello"));
        assert!(result.equal);
        assert_eq!(result.normalized_expected, "Hello");
        assert_eq!(result.normalized_actual, "Hello");

        let result = OutputComparator::default().compare_result(Some("3\r\n"), Some("4\n"));
        assert!(!result.equal);
        assert_eq!(result.normalized_expected, "3");
        assert_eq!(result.normalized_actual, "4");
    }

    #[test]
    fn compare_result_with_absent_side() {
        let result = OutputComparator::default().compare_result(None, Some("x"));
        assert!(!result.equal);
        assert_eq!(result.normalized_expected, "");
        assert_eq!(result.normalized_actual, "x");
    }

    #[test]
    fn comparator_uses_its_options() {
        let comparator = OutputComparator::new(CompareOptions {
            ignore_whitespace: true,
            epsilon: 0.5,
        });
        assert!(comparator.compare(Some("a  b"), Some("a b")));
        assert!(comparator.compare(Some("1.0"), Some("1.4")));
        assert_eq!(comparator.options().epsilon, 0.5);
    }
}
