use std::fmt::Display;
use crate::config::{AssociativityVariant, SweepPoint, Ways};

/// Prompt answer for "yes"
const YES: &str = "y";
/// Prompt answer for "no"
const NO: &str = "n";

/// Encodes a sweep point as the answers the simulator reads from stdin, one per line
///
/// The order is fixed by the simulator's prompts: cache size, line size, the associativity
/// questions, then the trace file. The cache size is sent as the raw exponent, the simulator does
/// its own interpretation of it.
///
/// Associativity is answered as:
/// * fully associative: `y`
/// * direct mapped: `n`, `y`
/// * n-way: `n`, `n`, then the selector from [`selector`]
///
/// # Arguments
///
/// * `point`: The sweep point to encode
///
/// returns: String, every line newline terminated
///
/// # Examples
///
/// ```
/// use sweeplib::config::{AssociativityVariant, ReplacementPolicy, SweepPoint};
/// use sweeplib::protocol::encode;
/// let point = SweepPoint {
///     cache_size_exponent: 10,
///     line_size: 6,
///     associativity: AssociativityVariant::DirectMapped,
///     policy: ReplacementPolicy::Lru,
///     trace_path: "swim.trace".to_string(),
/// };
/// assert_eq!(encode(&point), "10\n6\nn\ny\nswim.trace\n");
/// ```
pub fn encode(point: &SweepPoint) -> String {
    let mut out = String::new();
    push_line(&mut out, point.cache_size_exponent);
    push_line(&mut out, point.line_size);
    match point.associativity {
        AssociativityVariant::FullyAssociative => {
            push_line(&mut out, YES);
        }
        AssociativityVariant::DirectMapped => {
            push_line(&mut out, NO);
            push_line(&mut out, YES);
        }
        AssociativityVariant::NWay(ways) => {
            push_line(&mut out, NO);
            push_line(&mut out, NO);
            push_line(&mut out, selector(ways));
        }
    }
    push_line(&mut out, &point.trace_path);
    out
}

/// The simulator's menu number for each set size. This follows the simulator's own menu order, it
/// isn't derived from the way count
pub fn selector(ways: Ways) -> u8 {
    match ways {
        Ways::Two => 1,
        Ways::Four => 2,
        Ways::Eight => 3,
        Ways::Sixteen => 4,
    }
}

fn push_line(out: &mut String, token: impl Display) {
    out.push_str(&token.to_string());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;
    use crate::config::ReplacementPolicy;
    use super::*;

    fn point(associativity: AssociativityVariant) -> SweepPoint {
        SweepPoint {
            cache_size_exponent: 12,
            line_size: 6,
            associativity,
            policy: ReplacementPolicy::Fifo,
            trace_path: "trace_files/swim.trace".to_string(),
        }
    }

    #[rstest]
    #[case(Ways::Two, 1)]
    #[case(Ways::Four, 2)]
    #[case(Ways::Eight, 3)]
    #[case(Ways::Sixteen, 4)]
    fn selector_matches_simulator_menu(#[case] ways: Ways, #[case] expected: u8) {
        assert_eq!(selector(ways), expected);
        let encoded = encode(&point(AssociativityVariant::NWay(ways)));
        assert_eq!(encoded, format!("12\n6\nn\nn\n{expected}\ntrace_files/swim.trace\n"));
    }

    #[test]
    fn fully_associative_answers_yes() {
        assert_eq!(encode(&point(AssociativityVariant::FullyAssociative)), "12\n6\ny\ntrace_files/swim.trace\n");
    }

    #[test]
    fn direct_mapped_answers_no_then_yes() {
        assert_eq!(encode(&point(AssociativityVariant::DirectMapped)), "12\n6\nn\ny\ntrace_files/swim.trace\n");
    }

    #[test]
    fn policy_does_not_change_input() {
        let fifo = point(AssociativityVariant::NWay(Ways::Four));
        let lru = SweepPoint { policy: ReplacementPolicy::Lru, ..fifo.clone() };
        assert_eq!(encode(&fifo), encode(&lru));
    }

    fn any_associativity() -> impl Strategy<Value = AssociativityVariant> {
        prop_oneof![
            Just(AssociativityVariant::FullyAssociative),
            Just(AssociativityVariant::DirectMapped),
            prop::sample::select(vec![Ways::Two, Ways::Four, Ways::Eight, Ways::Sixteen]).prop_map(AssociativityVariant::NWay),
        ]
    }

    proptest! {
        #[test]
        fn line_count_depends_only_on_associativity(
            exponent in 1u32..64,
            line_size in 1u32..4096,
            associativity in any_associativity(),
            trace in "[a-z_/]{1,24}\\.trace",
        ) {
            let point = SweepPoint {
                cache_size_exponent: exponent,
                line_size,
                associativity,
                policy: ReplacementPolicy::Lru,
                trace_path: trace.clone(),
            };
            let encoded = encode(&point);
            let lines: Vec<&str> = encoded.lines().collect();
            let expected = match associativity {
                AssociativityVariant::FullyAssociative => 4,
                AssociativityVariant::DirectMapped => 5,
                AssociativityVariant::NWay(_) => 6,
            };
            prop_assert_eq!(lines.len(), expected);
            prop_assert!(encoded.ends_with('\n'));
            prop_assert_eq!(lines[0], exponent.to_string());
            prop_assert_eq!(lines[1], line_size.to_string());
            prop_assert_eq!(*lines.last().unwrap(), trace.as_str());
            // Pure: encoding again gives the same bytes
            prop_assert_eq!(encode(&point), encoded.clone());
        }
    }
}
