use crate::config::ReplacementPolicy;
use crate::error::InvokeError;

/// A deterministic in-process stand-in for the simulator binaries
///
/// It reads the protocol the same way the real simulator does and reports a hit rate that grows
/// with the cache size and the associativity, with FIFO a little behind LRU. Useful for tests and
/// benchmarks where spawning processes would drown out what's being measured
///
/// # Arguments
///
/// * `policy`: The simulator variant being asked for
/// * `input`: The encoded protocol
///
/// returns: Result<String, InvokeError>, output in the simulator's format. Input that doesn't
/// follow the protocol gets output without a hit rate, like a confused simulator would
pub fn synthetic_simulator(policy: ReplacementPolicy, input: &str) -> Result<String, InvokeError> {
    let mut lines = input.lines();
    let exponent: Option<i32> = lines.next().and_then(|line| line.parse().ok());
    let line_size: Option<i32> = lines.next().and_then(|line| line.parse().ok());
    let ways = match (lines.next(), lines.next()) {
        (Some("y"), _) => Some(16.0),
        (Some("n"), Some("y")) => Some(1.0),
        (Some("n"), Some("n")) => lines.next().and_then(|selector| selector.parse::<i32>().ok()).map(|selector| 2f64.powi(selector)),
        _ => None,
    };
    let (Some(exponent), Some(line_size), Some(ways)) = (exponent, line_size, ways) else {
        return Ok("Invalid input\n".to_string());
    };
    let lines_in_cache = 2f64.powi((exponent - line_size).max(0));
    let penalty = match policy {
        ReplacementPolicy::Lru => 1.0,
        ReplacementPolicy::Fifo => 1.1,
    };
    let miss_rate = (penalty / (lines_in_cache * ways.sqrt()).max(1.0)).min(1.0);
    Ok(format!("Cache size {exponent}, line size {line_size}\nhit rate {}", 1.0 - miss_rate))
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_hit_rate;
    use super::*;

    fn hit_rate(policy: ReplacementPolicy, input: &str) -> f64 {
        parse_hit_rate(&synthetic_simulator(policy, input).unwrap()).unwrap()
    }

    #[test]
    fn bigger_caches_hit_more() {
        let small = hit_rate(ReplacementPolicy::Lru, "10\n6\nn\ny\nswim.trace\n");
        let large = hit_rate(ReplacementPolicy::Lru, "14\n6\nn\ny\nswim.trace\n");
        assert!(small < large);
    }

    #[test]
    fn fifo_trails_lru() {
        let input = "12\n6\nn\nn\n2\nswim.trace\n";
        assert!(hit_rate(ReplacementPolicy::Fifo, input) < hit_rate(ReplacementPolicy::Lru, input));
    }

    #[test]
    fn garbage_input_has_no_hit_rate() {
        let output = synthetic_simulator(ReplacementPolicy::Lru, "swim.trace\n").unwrap();
        assert!(parse_hit_rate(&output).is_err());
    }
}
