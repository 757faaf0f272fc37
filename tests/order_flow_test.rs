mod common;

use assert_matches::assert_matches;
use common::{draft_request, product_line, variant_line, TestApp};
use pos_api::errors::ServiceError;
use pos_api::models::ItemRef;
use pos_api::services::orders::{CreateOrderRequest, OrderView};
use pos_api::entities::OrderStatus;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn assert_subtotal_invariant(order: &OrderView) {
    let sum: Decimal = order.items.iter().map(|item| item.subtotal).sum();
    assert_eq!(order.subtotal, sum, "order subtotal must equal item sum");
}

#[tokio::test]
async fn duplicate_lines_merge_with_last_price_winning() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Coffee").await;
    let variant = app.seed_variant(product.id, "Large").await;
    app.seed_variant_stock(variant.id, branch, 10).await;

    let order = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![
                variant_line(variant.id, 2, dec!(1000)),
                variant_line(variant.id, 3, dec!(900)),
            ],
            Some(branch),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].qty, 5);
    assert_eq!(order.items[0].price, dec!(900));
    assert_eq!(order.subtotal, dec!(4500));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_subtotal_invariant(&order);

    // Drafting never touches the balance.
    let stocks = app.services().stocks.list_stocks(Some(branch)).await.unwrap();
    assert_eq!(stocks[0].stock, 10);
}

#[tokio::test]
async fn variant_lines_carry_the_parent_product() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Tea").await;
    let variant = app.seed_variant(product.id, "Green").await;
    app.seed_variant_stock(variant.id, branch, 4).await;

    let order = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![variant_line(variant.id, 1, dec!(500))],
            Some(branch),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(order.items[0].variant_id, Some(variant.id));
    assert_eq!(order.items[0].product_id, Some(product.id));
}

#[tokio::test]
async fn resubmission_merges_into_the_pending_order() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Juice").await;
    let variant = app.seed_variant(product.id, "Orange").await;
    let other = app.seed_variant(product.id, "Apple").await;
    app.seed_variant_stock(variant.id, branch, 20).await;
    app.seed_variant_stock(other.id, branch, 20).await;

    let first = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![variant_line(variant.id, 2, dec!(1000))],
            Some(branch),
            None,
        ))
        .await
        .unwrap();

    let second = app
        .services()
        .orders
        .create_or_update(CreateOrderRequest {
            items: vec![
                variant_line(variant.id, 3, dec!(800)),
                variant_line(other.id, 1, dec!(1200)),
            ],
            notes: Some("rush order".to_string()),
            order_id: Some(first.id),
            branch_id: Some(branch),
            user_id: None,
            customer_id: None,
        })
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.items.len(), 2);

    let merged = second
        .items
        .iter()
        .find(|item| item.variant_id == Some(variant.id))
        .unwrap();
    assert_eq!(merged.qty, 5, "quantities accumulate on merge");
    assert_eq!(merged.price, dec!(800), "incoming price replaces the stored one");
    assert_eq!(merged.subtotal, dec!(4000));

    assert_eq!(second.notes.as_deref(), Some("rush order"));
    assert_subtotal_invariant(&second);
}

#[tokio::test]
async fn closed_orders_are_never_resurrected() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Soda").await;
    let variant = app.seed_variant(product.id, "Can").await;
    app.seed_variant_stock(variant.id, branch, 10).await;

    let first = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![variant_line(variant.id, 1, dec!(300))],
            Some(branch),
            None,
        ))
        .await
        .unwrap();
    app.services().orders.cancel_order(first.id).await.unwrap();

    let second = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![variant_line(variant.id, 1, dec!(300))],
            Some(branch),
            Some(first.id),
        ))
        .await
        .unwrap();

    assert_ne!(second.id, first.id, "a fresh order must be opened");

    let cancelled = app.services().orders.get_order(first.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.items.len(), 1, "the closed order is untouched");
}

#[tokio::test]
async fn unknown_catalog_references_fail_before_any_write() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;

    let err = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![variant_line(Uuid::new_v4(), 1, dec!(100))],
            Some(branch),
            None,
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let orders = app.services().orders.list_orders(1, 20).await.unwrap();
    assert_eq!(orders.total, 0);
}

#[tokio::test]
async fn insufficient_stock_rejects_the_whole_draft() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Milk").await;
    let variant = app.seed_variant(product.id, "1L").await;
    let other = app.seed_variant(product.id, "2L").await;
    app.seed_variant_stock(variant.id, branch, 10).await;
    app.seed_variant_stock(other.id, branch, 1).await;

    let err = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![
                variant_line(variant.id, 2, dec!(100)),
                variant_line(other.id, 3, dec!(100)),
            ],
            Some(branch),
            None,
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let orders = app.services().orders.list_orders(1, 20).await.unwrap();
    assert_eq!(orders.total, 0, "no partial draft may survive");
}

#[tokio::test]
async fn missing_stock_row_rejects_the_draft() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Bread").await;
    let variant = app.seed_variant(product.id, "Loaf").await;
    // No stock row seeded.

    let err = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![variant_line(variant.id, 1, dec!(100))],
            Some(branch),
            None,
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn quantity_update_recomputes_the_order_subtotal() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Cake").await;
    let variant = app.seed_variant(product.id, "Slice").await;
    let other = app.seed_variant(product.id, "Whole").await;
    app.seed_variant_stock(variant.id, branch, 50).await;
    app.seed_variant_stock(other.id, branch, 50).await;

    let order = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![
                variant_line(variant.id, 2, dec!(400)),
                variant_line(other.id, 1, dec!(3000)),
            ],
            Some(branch),
            None,
        ))
        .await
        .unwrap();

    let slice_item = order
        .items
        .iter()
        .find(|item| item.variant_id == Some(variant.id))
        .unwrap();

    let updated = app
        .services()
        .orders
        .update_item_quantity(order.id, slice_item.id, 4)
        .await
        .unwrap();

    let slice_item = updated
        .items
        .iter()
        .find(|item| item.variant_id == Some(variant.id))
        .unwrap();
    assert_eq!(slice_item.qty, 4);
    assert_eq!(slice_item.subtotal, dec!(1600));
    assert_eq!(updated.subtotal, dec!(4600));
    assert_subtotal_invariant(&updated);
}

#[tokio::test]
async fn quantity_below_one_is_rejected() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Pie").await;
    let variant = app.seed_variant(product.id, "Apple").await;
    app.seed_variant_stock(variant.id, branch, 5).await;

    let order = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![variant_line(variant.id, 2, dec!(700))],
            Some(branch),
            None,
        ))
        .await
        .unwrap();

    let err = app
        .services()
        .orders
        .update_item_quantity(order.id, order.items[0].id, 0)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn item_removal_recomputes_the_order_subtotal() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Sandwich").await;
    let variant = app.seed_variant(product.id, "Ham").await;
    let other = app.seed_variant(product.id, "Cheese").await;
    app.seed_variant_stock(variant.id, branch, 10).await;
    app.seed_variant_stock(other.id, branch, 10).await;

    let order = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![
                variant_line(variant.id, 1, dec!(500)),
                variant_line(other.id, 2, dec!(450)),
            ],
            Some(branch),
            None,
        ))
        .await
        .unwrap();

    let ham_item = order
        .items
        .iter()
        .find(|item| item.variant_id == Some(variant.id))
        .unwrap();

    let after = app
        .services()
        .orders
        .remove_item(order.id, ham_item.id)
        .await
        .unwrap();

    assert_eq!(after.items.len(), 1);
    assert_eq!(after.subtotal, dec!(900));
    assert_subtotal_invariant(&after);

    let reloaded = app.services().orders.get_order(order.id).await.unwrap();
    assert_eq!(reloaded.items.len(), 1);
}

#[tokio::test]
async fn terminal_orders_reject_line_mutations() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Wrap").await;
    let variant = app.seed_variant(product.id, "Falafel").await;
    app.seed_variant_stock(variant.id, branch, 10).await;

    let order = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![variant_line(variant.id, 1, dec!(650))],
            Some(branch),
            None,
        ))
        .await
        .unwrap();
    let item_id = order.items[0].id;
    app.services().orders.cancel_order(order.id).await.unwrap();

    let err = app
        .services()
        .orders
        .update_item_quantity(order.id, item_id, 3)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let err = app
        .services()
        .orders
        .remove_item(order.id, item_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let err = app.services().orders.cancel_order(order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn mixed_product_and_variant_lines_share_one_draft() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let bare = app.seed_product("Gift Card").await;
    let parent = app.seed_product("Mug").await;
    let variant = app.seed_variant(parent.id, "Blue").await;
    app.seed_product_stock(bare.id, branch, 7).await;
    app.seed_variant_stock(variant.id, branch, 7).await;

    let order = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![
                product_line(bare.id, 2, dec!(2500)),
                variant_line(variant.id, 1, dec!(1200)),
            ],
            Some(branch),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(order.items.len(), 2);
    assert_eq!(order.subtotal, dec!(6200));
    assert_eq!(order.total_amount, dec!(6200));
    assert_subtotal_invariant(&order);

    let bare_item = order
        .items
        .iter()
        .find(|item| item.product_id == Some(bare.id))
        .unwrap();
    assert_eq!(bare_item.variant_id, None);
    assert_eq!(
        ItemRef::from_columns(bare_item.product_id, bare_item.variant_id),
        Some(ItemRef::Product(bare.id))
    );
}
