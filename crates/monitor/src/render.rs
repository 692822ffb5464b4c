//! One-line text rendering for the terminal.

use brigade_core::status::{ConnectionPhase, ConnectionStatus};
use brigade_core::target::Target;
use brigade_notifications::{NotificationKind, UiNotification};

/// `[19:30:00] INFO    Nouvelle commande: Commande reçue pour Table 12`
pub fn notification_line(notification: &UiNotification) -> String {
    let marker = match notification.kind {
        NotificationKind::Info => "INFO",
        NotificationKind::Success => "PRÊT",
        NotificationKind::Warning => "ATTENTION",
        NotificationKind::Error => "ERREUR",
    };
    format!(
        "[{}] {marker:<9} {}: {}",
        notification.timestamp.format("%H:%M:%S"),
        notification.title,
        notification.message,
    )
}

/// `kitchen   connecté`, `service   erreur (Connexion perdue)`, ...
pub fn status_line(target: Target, status: &ConnectionStatus) -> String {
    let state = match status.phase() {
        ConnectionPhase::Idle => "déconnecté".to_string(),
        ConnectionPhase::Connecting => "connexion…".to_string(),
        ConnectionPhase::Connected => "connecté".to_string(),
        ConnectionPhase::Error => format!(
            "erreur ({})",
            status.error.as_deref().unwrap_or_default()
        ),
    };
    format!("{:<9} {state}", target.as_str())
}
