//! Display-order normalisation for reorderable lists
//!
//! Clients send the full list as `(id, order)` pairs after a drag-and-drop.
//! The submitted orders only need to be comparable; they are turned into the
//! dense positions `0..n-1` that the tables store.

use crate::models::OrderItem;
use crate::services::error::{ServiceError, ServiceResult};
use std::collections::HashSet;

/// Validate a reorder request against the stored ids and return
/// `(id, position)` pairs with positions `0..n-1`.
///
/// Items are ranked by their submitted order; equal orders keep the
/// submission order.
pub fn normalize(items: &[OrderItem], existing_ids: &[i64]) -> ServiceResult<Vec<(i64, i64)>> {
    if items.is_empty() {
        return Err(ServiceError::validation("items must not be empty"));
    }

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id) {
            return Err(ServiceError::validation(format!("Duplicate id {}", item.id)));
        }
    }

    let existing: HashSet<i64> = existing_ids.iter().copied().collect();
    if let Some(unknown) = items.iter().find(|item| !existing.contains(&item.id)) {
        return Err(ServiceError::validation(format!("Unknown id {}", unknown.id)));
    }
    if seen.len() != existing.len() {
        return Err(ServiceError::validation(format!(
            "Reorder must include all {} items, got {}",
            existing.len(),
            seen.len()
        )));
    }

    let mut ranked: Vec<&OrderItem> = items.iter().collect();
    ranked.sort_by_key(|item| item.order);

    Ok(ranked
        .into_iter()
        .enumerate()
        .map(|(position, item)| (item.id, position as i64))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(id: i64, order: i64) -> OrderItem {
        OrderItem { id, order }
    }

    #[test]
    fn test_normalize_assigns_dense_positions() {
        let items = [item(3, 10), item(1, 30), item(2, 20)];
        assert_eq!(
            normalize(&items, &[1, 2, 3]).unwrap(),
            vec![(3, 0), (2, 1), (1, 2)]
        );
    }

    #[test]
    fn test_ties_keep_submission_order() {
        let items = [item(5, 0), item(4, 0), item(6, -1)];
        assert_eq!(
            normalize(&items, &[4, 5, 6]).unwrap(),
            vec![(6, 0), (5, 1), (4, 2)]
        );
    }

    #[test]
    fn test_rejections() {
        assert!(normalize(&[], &[1]).is_err());
        assert!(normalize(&[item(1, 0), item(1, 1)], &[1]).is_err());
        assert!(normalize(&[item(1, 0), item(9, 1)], &[1, 2]).is_err());
        assert!(normalize(&[item(1, 0)], &[1, 2]).is_err());
    }

    proptest! {
        #[test]
        fn normalized_positions_are_a_permutation(
            orders in prop::collection::vec(-1000i64..1000, 1..40)
        ) {
            let items: Vec<OrderItem> = orders
                .iter()
                .enumerate()
                .map(|(i, order)| item(i as i64 + 1, *order))
                .collect();
            let ids: Vec<i64> = items.iter().map(|i| i.id).collect();

            let result = normalize(&items, &ids).unwrap();
            let mut positions: Vec<i64> = result.iter().map(|(_, p)| *p).collect();
            positions.sort_unstable();
            prop_assert_eq!(positions, (0..items.len() as i64).collect::<Vec<_>>());

            let by_position: Vec<i64> = result
                .iter()
                .map(|(id, _)| orders[(*id - 1) as usize])
                .collect();
            prop_assert!(by_position.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
