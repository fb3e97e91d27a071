/// Resolve per-job CPU costs from an optional weight list.
///
/// Missing weights default to 1: a shorter list is padded, a longer list is
/// truncated to `job_count`. A single cost above `capacity` only warns here;
/// admission rejects such a job when its turn comes.
pub fn resolve_costs(job_count: usize, weights: Option<&[u32]>, capacity: u64) -> Vec<u32> {
    let mut costs = vec![1u32; job_count];
    if let Some(weights) = weights {
        for (slot, &w) in costs.iter_mut().zip(weights) {
            *slot = w;
        }
    }

    if let Some(max) = costs.iter().max().copied() {
        if u64::from(max) > capacity {
            tracing::warn!(
                max_cost = max,
                capacity,
                "a single job's cost exceeds the total CPU budget; it will be rejected at admission"
            );
        }
    }
    costs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_weights_defaults_to_ones() {
        assert_eq!(resolve_costs(4, None, 4), vec![1, 1, 1, 1]);
    }

    #[test]
    fn shorter_weights_pad_with_ones() {
        assert_eq!(resolve_costs(3, Some(&[2]), 4), vec![2, 1, 1]);
    }

    #[test]
    fn equal_length_weights_used_as_is() {
        assert_eq!(resolve_costs(3, Some(&[2, 3, 1]), 4), vec![2, 3, 1]);
    }

    #[test]
    fn longer_weights_truncated() {
        assert_eq!(resolve_costs(2, Some(&[2, 3, 4, 5]), 4), vec![2, 3]);
    }

    #[test]
    fn empty_batch_yields_empty_costs() {
        assert!(resolve_costs(0, Some(&[2, 3]), 4).is_empty());
    }

    #[test]
    fn oversized_cost_is_kept_not_clamped() {
        // The warning is advisory; the value passes through unchanged.
        assert_eq!(resolve_costs(2, Some(&[9]), 4), vec![9, 1]);
    }
}
