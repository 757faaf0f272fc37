use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events published after successful commits. Consumed in-process by
/// [`process_events`]; settlement and draft mutation are the main emitters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderUpdated(Uuid),
    OrderCompleted(Uuid),
    OrderCancelled(Uuid),
    OrderItemRemoved { order_id: Uuid, item_id: Uuid },
    PaymentCreated(Uuid),
    PaymentVerified { payment_id: Uuid, order_id: Uuid },
    StockAdjusted { stock_id: Uuid, delta: i32 },
    StockDeducted { stock_id: Uuid, qty: i32, order_id: Uuid },
    ProductCreated(Uuid),
    ProductDeleted(Uuid),
    BranchCreated(Uuid),
    CustomerCreated(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing channel failures to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a full or closed channel is logged, never fatal.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!(error = %e, ?event, "Dropping domain event");
        }
    }
}

/// Event consumer loop. Runs as a background task for the lifetime of the
/// process; today it only records events in the log.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::PaymentVerified {
                payment_id,
                order_id,
            } => {
                info!(payment_id = %payment_id, order_id = %order_id, "Payment verified");
            }
            Event::StockDeducted {
                stock_id,
                qty,
                order_id,
            } => {
                info!(stock_id = %stock_id, qty = qty, order_id = %order_id, "Stock deducted");
            }
            other => {
                info!(event = ?other, "Domain event");
            }
        }
    }
    info!("Event channel closed; event processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out.
        sender.send_or_log(Event::OrderCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();
        sender.send(Event::OrderCreated(id)).await.unwrap();
        sender.send(Event::OrderCompleted(id)).await.unwrap();

        assert!(matches!(rx.recv().await, Some(Event::OrderCreated(got)) if got == id));
        assert!(matches!(rx.recv().await, Some(Event::OrderCompleted(got)) if got == id));
    }
}
