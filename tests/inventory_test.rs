mod common;

use assert_matches::assert_matches;
use common::TestApp;
use pos_api::entities::MovementType;
use pos_api::errors::ServiceError;
use pos_api::services::inventory::{CreateStockRequest, UpdateStockRequest};

#[tokio::test]
async fn opening_a_balance_writes_the_opening_movement() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Beans").await;
    let variant = app.seed_variant(product.id, "250g").await;

    let stock = app.seed_variant_stock(variant.id, branch, 12).await;
    assert_eq!(stock.stock, 12);

    let movements = app
        .services()
        .stocks
        .list_movements(1, 50)
        .await
        .unwrap()
        .movements;
    let opening: Vec<_> = movements
        .iter()
        .filter(|m| m.reference_id == Some(stock.id))
        .collect();
    assert_eq!(opening.len(), 1);
    assert_eq!(opening[0].reference_type, MovementType::Adjust);
    assert_eq!(opening[0].qty, 12);
    assert_eq!(opening[0].variant_id, Some(variant.id));
}

#[tokio::test]
async fn manual_adjustment_ledgers_the_signed_delta() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Filter").await;
    let variant = app.seed_variant(product.id, "V60").await;
    let stock = app.seed_variant_stock(variant.id, branch, 10).await;

    let updated = app
        .services()
        .stocks
        .update_stock(
            stock.id,
            UpdateStockRequest {
                stock: Some(7),
                min_stock: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.stock, 7);
    assert_eq!(updated.min_stock, 2);

    let movements = app
        .services()
        .stocks
        .list_movements(1, 50)
        .await
        .unwrap()
        .movements;
    let adjustments: Vec<_> = movements
        .iter()
        .filter(|m| m.reference_id == Some(stock.id))
        .collect();
    // Opening movement plus the delta movement.
    assert_eq!(adjustments.len(), 2);
    assert!(adjustments.iter().any(|m| m.qty == -3));
}

#[tokio::test]
async fn min_stock_only_updates_skip_the_ledger() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Grinder").await;
    let variant = app.seed_variant(product.id, "Hand").await;
    let stock = app.seed_variant_stock(variant.id, branch, 4).await;

    app.services()
        .stocks
        .update_stock(
            stock.id,
            UpdateStockRequest {
                stock: None,
                min_stock: Some(1),
            },
        )
        .await
        .unwrap();

    let movements = app
        .services()
        .stocks
        .list_movements(1, 50)
        .await
        .unwrap()
        .movements;
    let adjustments: Vec<_> = movements
        .iter()
        .filter(|m| m.reference_id == Some(stock.id))
        .collect();
    assert_eq!(adjustments.len(), 1, "only the opening movement exists");
}

#[tokio::test]
async fn duplicate_balance_rows_are_rejected() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Kettle").await;
    let variant = app.seed_variant(product.id, "Gooseneck").await;
    app.seed_variant_stock(variant.id, branch, 5).await;

    let err = app
        .services()
        .stocks
        .create_stock(CreateStockRequest {
            product_id: None,
            variant_id: Some(variant.id),
            branch_id: branch,
            stock: 3,
            min_stock: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn negative_balances_are_rejected_up_front() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Scale").await;
    let variant = app.seed_variant(product.id, "0.1g").await;

    let err = app
        .services()
        .stocks
        .create_stock(CreateStockRequest {
            product_id: None,
            variant_id: Some(variant.id),
            branch_id: branch,
            stock: -1,
            min_stock: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let stock = app.seed_variant_stock(variant.id, branch, 5).await;
    let err = app
        .services()
        .stocks
        .update_stock(
            stock.id,
            UpdateStockRequest {
                stock: Some(-2),
                min_stock: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn balance_rows_need_exactly_one_item_reference() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Tamper").await;
    let variant = app.seed_variant(product.id, "58mm").await;

    let err = app
        .services()
        .stocks
        .create_stock(CreateStockRequest {
            product_id: Some(product.id),
            variant_id: Some(variant.id),
            branch_id: branch,
            stock: 5,
            min_stock: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = app
        .services()
        .stocks
        .create_stock(CreateStockRequest {
            product_id: None,
            variant_id: None,
            branch_id: branch,
            stock: 5,
            min_stock: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
