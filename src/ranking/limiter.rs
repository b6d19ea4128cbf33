//! Truncation of a ranked list

use crate::search::SearchResult;

/// First `max_results` entries of an already ranked list.
///
/// A cap of zero yields an empty list; shorter lists come back unchanged.
pub fn limit_results(results: &[SearchResult], max_results: usize) -> Vec<SearchResult> {
    results.iter().take(max_results).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> Vec<SearchResult> {
        (1..=n).map(|i| SearchResult::new(format!("r{}", i))).collect()
    }

    #[test]
    fn test_takes_prefix() {
        let limited = limit_results(&sample(8), 5);
        assert_eq!(limited.len(), 5);
        assert_eq!(limited, sample(5));
    }

    #[test]
    fn test_zero_cap() {
        assert!(limit_results(&sample(3), 0).is_empty());
    }

    #[test]
    fn test_short_list_unchanged() {
        assert_eq!(limit_results(&sample(3), 12), sample(3));
    }

    #[test]
    fn test_idempotent() {
        let list = sample(9);
        for n in 0..12 {
            let once = limit_results(&list, n);
            assert_eq!(limit_results(&once, n), once);
        }
    }
}
