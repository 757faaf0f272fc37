mod common;

use assert_matches::assert_matches;
use common::{draft_request, variant_line, TestApp};
use pos_api::errors::ServiceError;
use pos_api::services::catalog::{CreateVariantRequest, UpdateProductRequest};
use rust_decimal_macros::dec;

#[tokio::test]
async fn deleting_a_product_soft_deletes_its_variants() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Hoodie").await;
    let variant = app.seed_variant(product.id, "M").await;
    app.seed_variant_stock(variant.id, branch, 5).await;

    app.services()
        .catalog
        .delete_product(product.id)
        .await
        .unwrap();

    let err = app
        .services()
        .catalog
        .get_product(product.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // The variant disappeared with its parent: drafting against it now
    // fails catalog resolution.
    let err = app
        .services()
        .orders
        .create_or_update(draft_request(
            vec![variant_line(variant.id, 1, dec!(2500))],
            Some(branch),
            None,
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn skus_stay_unique_across_live_variants() {
    let app = TestApp::new().await;
    let product = app.seed_product("Shirt").await;

    app.services()
        .catalog
        .create_variant(
            product.id,
            CreateVariantRequest {
                name: "S".to_string(),
                sku: "SHIRT-S".to_string(),
                price: None,
                weight: None,
                color: None,
            },
        )
        .await
        .unwrap();

    let err = app
        .services()
        .catalog
        .create_variant(
            product.id,
            CreateVariantRequest {
                name: "S (restock)".to_string(),
                sku: "SHIRT-S".to_string(),
                price: None,
                weight: None,
                color: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn renaming_a_product_refreshes_its_slug() {
    let app = TestApp::new().await;
    let product = app.seed_product("Old Name").await;
    assert_eq!(product.slug, "old-name");

    let updated = app
        .services()
        .catalog
        .update_product(
            product.id,
            UpdateProductRequest {
                name: Some("New Name!".to_string()),
                price: None,
                description: None,
                category_id: None,
                image_url: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.slug, "new-name");
}

#[tokio::test]
async fn products_list_excludes_deleted_rows() {
    let app = TestApp::new().await;
    let keep = app.seed_product("Keep").await;
    let drop = app.seed_product("Drop").await;

    app.services().catalog.delete_product(drop.id).await.unwrap();

    let products = app.services().catalog.list_products().await.unwrap();
    assert!(products.iter().any(|p| p.id == keep.id));
    assert!(!products.iter().any(|p| p.id == drop.id));
}
