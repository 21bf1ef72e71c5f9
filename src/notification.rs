//! Desktop notifications via freedesktop D-Bus.

use std::collections::HashMap;

use zbus::{Connection, proxy};

/// Longest body shown in a notification, in characters.
const MAX_BODY_CHARS: usize = 200;

#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: Vec<&str>,
        hints: HashMap<&str, zbus::zvariant::Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// Shortens long recognition output for the notification body.
pub fn notification_body(text: &str) -> String {
    if text.chars().count() <= MAX_BODY_CHARS {
        return text.to_string();
    }
    let mut body: String = text.chars().take(MAX_BODY_CHARS).collect();
    body.push_str("...");
    body
}

/// Sends a notification on the session bus.
pub async fn send_notification(summary: &str, body: &str) -> Result<(), String> {
    let connection = Connection::session()
        .await
        .map_err(|e| format!("Failed to connect to session bus: {}", e))?;

    let proxy = NotificationsProxy::new(&connection)
        .await
        .map_err(|e| format!("Failed to create notifications proxy: {}", e))?;

    proxy
        .notify(
            "wayscan",
            0,
            "edit-find",
            summary,
            body,
            vec![],
            HashMap::new(),
            5000,
        )
        .await
        .map_err(|e| format!("Failed to send notification: {}", e))?;

    Ok(())
}

/// Sends the recognized text as a notification without blocking the caller.
pub fn notify_text_async(runtime_handle: &tokio::runtime::Handle, text: String) {
    runtime_handle.spawn(async move {
        let body = notification_body(&text);
        if let Err(e) = send_notification("Text recognized", &body).await {
            log::warn!("{}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_kept() {
        assert_eq!(notification_body("hello"), "hello");
    }

    #[test]
    fn long_text_is_truncated_on_char_boundary() {
        let text = "ä".repeat(250);
        let body = notification_body(&text);
        assert_eq!(body.chars().count(), MAX_BODY_CHARS + 3);
        assert!(body.ends_with("..."));
    }
}
