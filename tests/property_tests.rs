use pos_api::models::ItemRef;
use pos_api::services::orders::{aggregate_items, DraftItemInput};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

// A small id pool so generated payloads actually collide on keys.
fn id_pool() -> Vec<Uuid> {
    (0..4u128).map(Uuid::from_u128).collect()
}

fn arb_item() -> impl Strategy<Value = DraftItemInput> {
    (0usize..4, any::<bool>(), 1i32..50, 1i64..10_000).prop_map(
        |(idx, is_variant, quantity, price)| {
            let id = id_pool()[idx];
            DraftItemInput {
                product_id: (!is_variant).then_some(id),
                variant_id: is_variant.then_some(id),
                quantity,
                price: Decimal::from(price),
            }
        },
    )
}

fn key_of(item: &DraftItemInput) -> ItemRef {
    match (item.product_id, item.variant_id) {
        (None, Some(id)) => ItemRef::Variant(id),
        (Some(id), None) => ItemRef::Product(id),
        _ => unreachable!("generator always sets exactly one id"),
    }
}

proptest! {
    /// Aggregation conserves the per-key quantity sum.
    #[test]
    fn aggregation_conserves_quantities(items in prop::collection::vec(arb_item(), 1..20)) {
        let lines = aggregate_items(&items).unwrap();

        let mut expected: HashMap<ItemRef, i64> = HashMap::new();
        for item in &items {
            *expected.entry(key_of(item)).or_default() += i64::from(item.quantity);
        }

        prop_assert_eq!(lines.len(), expected.len());
        for line in &lines {
            prop_assert_eq!(i64::from(line.quantity), expected[&line.item]);
        }
    }

    /// The last occurrence of a key decides the price.
    #[test]
    fn aggregation_keeps_the_last_price(items in prop::collection::vec(arb_item(), 1..20)) {
        let lines = aggregate_items(&items).unwrap();

        let mut last_price: HashMap<ItemRef, Decimal> = HashMap::new();
        for item in &items {
            last_price.insert(key_of(item), item.price);
        }

        for line in &lines {
            prop_assert_eq!(line.price, last_price[&line.item]);
        }
    }

    /// No key appears twice after aggregation.
    #[test]
    fn aggregation_emits_unique_keys(items in prop::collection::vec(arb_item(), 1..20)) {
        let lines = aggregate_items(&items).unwrap();
        let mut seen = std::collections::HashSet::new();
        for line in &lines {
            prop_assert!(seen.insert(line.item), "duplicate key {:?}", line.item);
        }
    }
}
