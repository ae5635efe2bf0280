use tracing::debug;

use crate::page_range::{RangeError, RangePolicy};

/// Append order for a merge, as 0-based indices into the input list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub order: Vec<usize>,
    pub skipped_tokens: usize,
    pub out_of_range: usize,
}

impl MergePlan {
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Plan the order in which `file_count` inputs are appended.
///
/// Without a sequence (or with a blank one) every file is used once, in list
/// order. A sequence like "1 2 1" names 1-based inputs and may repeat them.
/// Commas are accepted as separators too.
pub fn plan_merge_order(
    file_count: usize,
    sequence: Option<&str>,
    policy: RangePolicy,
) -> Result<MergePlan, RangeError> {
    let sequence = sequence.map(str::trim).unwrap_or_default();
    if sequence.is_empty() {
        return Ok(MergePlan {
            order: (0..file_count).collect(),
            ..Default::default()
        });
    }

    let mut plan = MergePlan::default();
    let tokens = sequence
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());

    for token in tokens {
        let number = match token.parse::<i128>() {
            Ok(n) => n,
            Err(_) => match policy {
                RangePolicy::Strict => return Err(RangeError::MalformedTerm(token.to_string())),
                RangePolicy::Lenient => {
                    debug!(token = %token, "skipping malformed merge sequence entry");
                    plan.skipped_tokens += 1;
                    continue;
                }
            },
        };

        // Zero and negative entries are valid numbers that name no input
        match number.checked_sub(1).and_then(|i| usize::try_from(i).ok()) {
            Some(index) if index < file_count => plan.order.push(index),
            _ => match policy {
                RangePolicy::Strict => {
                    return Err(RangeError::OutOfRange {
                        term: token.to_string(),
                        total: file_count,
                    })
                }
                RangePolicy::Lenient => {
                    debug!(token = %token, file_count, "dropping merge entry outside the input list");
                    plan.out_of_range += 1;
                }
            },
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn order(file_count: usize, sequence: &str) -> Vec<usize> {
        plan_merge_order(file_count, Some(sequence), RangePolicy::Lenient)
            .unwrap()
            .order
    }

    #[test]
    fn test_repetition_preserved() {
        assert_eq!(order(3, "1 2 1"), vec![0, 1, 0]);
    }

    #[test]
    fn test_empty_sequence_uses_list_order() {
        assert_eq!(order(3, ""), vec![0, 1, 2]);
        assert_eq!(order(3, "   "), vec![0, 1, 2]);
        assert_eq!(
            plan_merge_order(2, None, RangePolicy::Strict).unwrap().order,
            vec![0, 1]
        );
    }

    #[test]
    fn test_out_of_range_dropped_and_counted() {
        let plan = plan_merge_order(2, Some("0 1 3 2"), RangePolicy::Lenient).unwrap();
        assert_eq!(plan.order, vec![0, 1]);
        assert_eq!(plan.out_of_range, 2);
    }

    #[test]
    fn test_malformed_tokens_skipped() {
        let plan = plan_merge_order(3, Some("3 x -1 2"), RangePolicy::Lenient).unwrap();
        assert_eq!(plan.order, vec![2, 1]);
        assert_eq!(plan.skipped_tokens, 1);
        assert_eq!(plan.out_of_range, 1);
    }

    #[test]
    fn test_negative_entries_are_out_of_range() {
        let plan = plan_merge_order(2, Some("-3 1 -1 0"), RangePolicy::Lenient).unwrap();
        assert_eq!(plan.order, vec![0]);
        assert_eq!(plan.skipped_tokens, 0);
        assert_eq!(plan.out_of_range, 3);

        assert_eq!(
            plan_merge_order(2, Some("1 -1"), RangePolicy::Strict).unwrap_err(),
            RangeError::OutOfRange {
                term: "-1".to_string(),
                total: 2
            }
        );
    }

    #[test]
    fn test_commas_and_mixed_whitespace() {
        assert_eq!(order(3, "3,1\t2\n3"), vec![2, 0, 1, 2]);
    }

    #[test]
    fn test_nothing_usable_gives_empty_plan() {
        let plan = plan_merge_order(3, Some("9 nine"), RangePolicy::Lenient).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_strict_rejects() {
        assert_eq!(
            plan_merge_order(3, Some("1 x"), RangePolicy::Strict).unwrap_err(),
            RangeError::MalformedTerm("x".to_string())
        );
        assert_eq!(
            plan_merge_order(3, Some("1 4"), RangePolicy::Strict).unwrap_err(),
            RangeError::OutOfRange {
                term: "4".to_string(),
                total: 3
            }
        );
    }
}
