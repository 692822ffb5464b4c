//! Domain event to notification templates.
//!
//! | Event                  | Kind    | Sound          | Persistent |
//! |------------------------|---------|----------------|------------|
//! | `order_created`        | info    | yes            | yes        |
//! | `order_status_updated` | info    | if now `READY` | no         |
//! | `order_ready_to_serve` | success | yes            | yes        |

use brigade_core::frames::{EventType, NotificationEvent};
use brigade_core::order::OrderStatus;

use crate::model::{NotificationDraft, NotificationKind};

pub const TITLE_ORDER_CREATED: &str = "Nouvelle commande";
pub const TITLE_ORDER_UPDATED: &str = "Commande mise à jour";
pub const TITLE_ORDER_READY: &str = "Commande prête";

/// Build the notification for a domain event. The event is attached as
/// the notification's data.
pub fn draft_from_event(event: &NotificationEvent) -> NotificationDraft {
    let payload = &event.payload;
    let table = &payload.table_number;

    let draft = match event.event_type {
        EventType::OrderCreated => NotificationDraft::new(
            NotificationKind::Info,
            TITLE_ORDER_CREATED,
            format!("Commande reçue pour {table}"),
        )
        .with_sound(true)
        .persistent(true),
        EventType::OrderStatusUpdated => {
            let message = match payload.previous_status {
                Some(previous) => format!("{table}: {previous} → {}", payload.status),
                None => format!("{table}: {}", payload.status),
            };
            NotificationDraft::new(NotificationKind::Info, TITLE_ORDER_UPDATED, message)
                .with_sound(payload.status == OrderStatus::Ready)
        }
        EventType::OrderReadyToServe => NotificationDraft::new(
            NotificationKind::Success,
            TITLE_ORDER_READY,
            format!("{table} - {} plat(s) prêt(s) à servir", payload.dish_count),
        )
        .with_sound(true)
        .persistent(true),
    };

    draft.with_data(event.clone())
}

#[cfg(test)]
mod tests {
    use brigade_core::frames::OrderPayload;
    use brigade_core::target::Audience;

    use super::*;

    fn event(event_type: EventType, status: OrderStatus, previous: Option<OrderStatus>) -> NotificationEvent {
        NotificationEvent {
            event_type,
            target: Audience::All,
            timestamp: chrono::Utc::now(),
            payload: OrderPayload {
                order_id: "o1".into(),
                table_number: "Table 4".into(),
                status,
                previous_status: previous,
                dish_count: 2,
                total_price: 23.5,
            },
            message: String::new(),
        }
    }

    #[test]
    fn order_created_is_persistent_info_with_sound() {
        let draft = draft_from_event(&event(EventType::OrderCreated, OrderStatus::Pending, None));
        assert_eq!(draft.kind, NotificationKind::Info);
        assert_eq!(draft.title, TITLE_ORDER_CREATED);
        assert_eq!(draft.message, "Commande reçue pour Table 4");
        assert!(draft.sound);
        assert!(draft.persistent);
    }

    #[test]
    fn status_update_to_ready_plays_sound() {
        let draft = draft_from_event(&event(
            EventType::OrderStatusUpdated,
            OrderStatus::Ready,
            Some(OrderStatus::InPreparation),
        ));
        assert_eq!(draft.message, "Table 4: IN_PREPARATION → READY");
        assert!(draft.sound);
        assert!(!draft.persistent);
    }

    #[test]
    fn status_update_to_other_status_is_silent() {
        let draft = draft_from_event(&event(
            EventType::OrderStatusUpdated,
            OrderStatus::InPreparation,
            Some(OrderStatus::Pending),
        ));
        assert!(!draft.sound);
    }

    #[test]
    fn status_update_without_previous_status() {
        let draft = draft_from_event(&event(EventType::OrderStatusUpdated, OrderStatus::Delivered, None));
        assert_eq!(draft.message, "Table 4: DELIVERED");
    }

    #[test]
    fn ready_to_serve_counts_dishes() {
        let source = event(EventType::OrderReadyToServe, OrderStatus::Ready, None);
        let draft = draft_from_event(&source);
        assert_eq!(draft.kind, NotificationKind::Success);
        assert_eq!(draft.message, "Table 4 - 2 plat(s) prêt(s) à servir");
        assert!(draft.sound && draft.persistent);
        assert_eq!(draft.data, Some(source));
    }
}
