mod common;

use common::{draft_request, variant_line, TestApp};
use pos_api::entities::PaymentMethod;
use pos_api::services::payments::CreatePaymentRequest;
use rust_decimal_macros::dec;

// This test needs a database that hands out real concurrent connections;
// the single-connection SQLite harness serializes everything. Run against
// Postgres with: cargo test -- --ignored concurrent_settlements
#[tokio::test]
#[ignore]
async fn concurrent_settlements_never_oversell_a_stock_row() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Limited Print").await;
    let variant = app.seed_variant(product.id, "Numbered").await;
    let stock = app.seed_variant_stock(variant.id, branch, 10).await;

    // Twenty orders of one unit each against ten units of stock.
    let mut payment_ids = Vec::new();
    for _ in 0..20 {
        let order = app
            .services()
            .orders
            .create_or_update(draft_request(
                vec![variant_line(variant.id, 1, dec!(5000))],
                Some(branch),
                None,
            ))
            .await
            .unwrap();
        let payment = app
            .services()
            .payments
            .create_payment(CreatePaymentRequest {
                order_id: order.id,
                method: PaymentMethod::Cash,
            })
            .await
            .unwrap();
        payment_ids.push(payment.id);
    }

    let mut tasks = Vec::new();
    for payment_id in payment_ids {
        let payments = app.services().payments.clone();
        tasks.push(tokio::spawn(async move {
            payments.verify_payment(payment_id).await.is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            successes += 1;
        }
    }

    assert_eq!(
        successes, 10,
        "exactly ten settlements should succeed; got {}",
        successes
    );

    let remaining = app.services().stocks.get_stock(stock.id).await.unwrap().stock;
    assert_eq!(remaining, 0);
    assert!(remaining >= 0, "stock must never go negative");
}
