//! Longest strictly increasing subsequence
//!
//! Used to find the backbone: the largest set of matches that already appear
//! in reference order.

/// Positions of a longest strictly increasing subsequence of `values`.
///
/// Patience sorting in O(n log n): `tails[k]` holds the position of the
/// smallest tail of any increasing run of length `k + 1`, and `prev` links
/// each element to its predecessor for reconstruction. The returned positions
/// are ascending.
///
/// # Examples
/// ```
/// use dictation::order::longest_increasing_subsequence;
///
/// assert_eq!(longest_increasing_subsequence(&[0, 1, 2, 4, 3]), vec![0, 1, 2, 4]);
/// ```
pub fn longest_increasing_subsequence(values: &[usize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; values.len()];

    for (i, &value) in values.iter().enumerate() {
        let slot = tails.partition_point(|&t| values[t] < value);
        prev[i] = slot.checked_sub(1).map(|s| tails[s]);
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        result.push(i);
        cursor = prev[i];
    }
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picked(values: &[usize]) -> Vec<usize> {
        longest_increasing_subsequence(values)
            .into_iter()
            .map(|i| values[i])
            .collect()
    }

    #[test]
    fn test_empty() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
    }

    #[test]
    fn test_already_sorted() {
        assert_eq!(longest_increasing_subsequence(&[0, 1, 2, 3]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_reversed() {
        assert_eq!(longest_increasing_subsequence(&[3, 2, 1, 0]).len(), 1);
    }

    #[test]
    fn test_adjacent_swap_keeps_later_element() {
        // the later, smaller value replaces the tail
        assert_eq!(picked(&[0, 1, 2, 4, 3]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_word_moved_to_front() {
        assert_eq!(picked(&[1, 0, 2, 3, 4]), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_word_moved_to_end() {
        assert_eq!(picked(&[1, 2, 3, 0, 4]), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_strictly_increasing() {
        let values = [5, 1, 8, 3, 9, 4, 10, 2, 7];
        let lis = picked(&values);
        assert!(lis.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(lis.len(), 4);
    }

    #[test]
    fn test_is_longest() {
        // compare against an O(n^2) dynamic program
        let values = [3, 7, 1, 8, 2, 9, 4, 5, 0, 6];
        let mut best = vec![1usize; values.len()];
        for i in 0..values.len() {
            for j in 0..i {
                if values[j] < values[i] {
                    best[i] = best[i].max(best[j] + 1);
                }
            }
        }
        let expected = best.into_iter().max().unwrap_or(0);
        assert_eq!(longest_increasing_subsequence(&values).len(), expected);
    }
}
