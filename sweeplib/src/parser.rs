use lazy_static::lazy_static;
use regex::Regex;
use crate::error::ParseError;

/// The text the simulator prints right before the hit rate
pub const HIT_RATE_MARKER: &str = "hit rate ";

/// How much of an unreadable value is kept in the error
const MALFORMED_PREVIEW: usize = 64;

lazy_static! {
    // Everything after the marker must be a single decimal literal, whitespace aside
    static ref HIT_RATE_VALUE: Regex = Regex::new(r"^\s*([+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)\s*$")
        .expect("hit rate grammar is a valid regex");
}

/// Reads the hit rate out of the simulator's output
///
/// The value is whatever follows the first `hit rate ` up to the end of the output, and it has to
/// be a plain decimal number. Anything else after the number means the simulator's output format
/// has drifted, so it's rejected rather than skipped over.
///
/// # Arguments
///
/// * `output`: The captured output of one simulator run
///
/// returns: Result<f64, ParseError>, a hit rate in [0, 1]
///
/// # Examples
///
/// ```
/// use sweeplib::parser::parse_hit_rate;
/// assert_eq!(parse_hit_rate("Reading trace...\nhit rate 0.873"), Ok(0.873));
/// assert!(parse_hit_rate("no result").is_err());
/// ```
pub fn parse_hit_rate(output: &str) -> Result<f64, ParseError> {
    let start = output.find(HIT_RATE_MARKER).ok_or(ParseError::MissingMarker)?;
    let tail = &output[start + HIT_RATE_MARKER.len()..];
    let literal = HIT_RATE_VALUE
        .captures(tail)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| malformed(tail))?;
    let hit_rate: f64 = literal.as_str().parse().map_err(|_| malformed(tail))?;
    if !(0.0..=1.0).contains(&hit_rate) {
        return Err(ParseError::OutOfRange(hit_rate));
    }
    Ok(hit_rate)
}

fn malformed(tail: &str) -> ParseError {
    ParseError::Malformed(tail.trim().chars().take(MALFORMED_PREVIEW).collect())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use super::*;

    #[rstest]
    #[case("... hit rate 0.873", 0.873)]
    #[case("... hit rate 1", 1.0)]
    #[case("hit rate 0", 0.0)]
    #[case("hit rate .5", 0.5)]
    #[case("hit rate 5e-1", 0.5)]
    #[case("Cache size: 1024\nmisses 12\nhit rate 0.25\n", 0.25)]
    #[case("hit rate   0.75  \r\n", 0.75)]
    fn reads_trailing_value(#[case] output: &str, #[case] expected: f64) {
        assert_eq!(parse_hit_rate(output), Ok(expected));
    }

    #[test]
    fn missing_marker() {
        assert_eq!(parse_hit_rate(""), Err(ParseError::MissingMarker));
        assert_eq!(parse_hit_rate("Hit Rate 0.5"), Err(ParseError::MissingMarker));
        assert_eq!(parse_hit_rate("hit rate"), Err(ParseError::MissingMarker));
    }

    #[rstest]
    #[case("hit rate ")]
    #[case("hit rate abc")]
    #[case("hit rate 0.5 extra")]
    #[case("hit rate 0.5\nhit rate 0.6")]
    #[case("hit rate 0.5%")]
    #[case("hit rate nan")]
    #[case("hit rate inf")]
    fn rejects_malformed_value(#[case] output: &str) {
        assert!(matches!(parse_hit_rate(output), Err(ParseError::Malformed(_))), "{output:?}");
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(parse_hit_rate("hit rate 1.5"), Err(ParseError::OutOfRange(1.5)));
        assert_eq!(parse_hit_rate("hit rate -0.1"), Err(ParseError::OutOfRange(-0.1)));
        assert_eq!(parse_hit_rate("hit rate 87.3"), Err(ParseError::OutOfRange(87.3)));
    }

    #[test]
    fn uses_first_marker() {
        // The first marker wins, so the rest of the output is part of the value
        assert!(matches!(parse_hit_rate("hit rate hit rate 0.5"), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn long_values_are_truncated_in_errors() {
        let output = format!("hit rate {}", "x".repeat(500));
        match parse_hit_rate(&output) {
            Err(ParseError::Malformed(preview)) => assert_eq!(preview.len(), MALFORMED_PREVIEW),
            other => panic!("unexpected {other:?}"),
        }
    }
}
