//! Text rendering of controller snapshots.

use client_core::{media, ImageView, Notification, WorkflowSnapshot};

pub fn render_snapshot(snapshot: &WorkflowSnapshot) -> String {
    let mut lines = vec![format!(
        "[{}] translate: {} | download: {}",
        snapshot.state.label(),
        enabled_label(snapshot.can_translate()),
        enabled_label(snapshot.can_download()),
    )];

    if let Some(source) = &snapshot.source {
        lines.push(format!("  original:   {}", describe_image(source)));
    }
    if let Some(translated) = &snapshot.translated {
        lines.push(format!("  translated: {}", describe_image(translated)));
    }
    if let Some(error) = &snapshot.last_error {
        lines.push(format!("  last error: {error}"));
    }

    lines.join("\n")
}

pub fn render_notification(notification: &Notification) -> String {
    if !notification.is_blocking() {
        return notification.message.clone();
    }

    let stamp = notification.raised_at.format("%H:%M:%S");
    let body = format!("!! {stamp} {} !!", notification.message);
    let rule = "!".repeat(body.chars().count());
    format!("{rule}\n{body}\n{rule}")
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn describe_image(view: &ImageView) -> String {
    let size = human_readable_bytes(view.handle.len() as u64);
    match media::decode_preview(view.handle.bytes()) {
        Ok(preview) => format!(
            "{} ({}x{}, {size}, {})",
            view.label,
            preview.width,
            preview.height,
            view.handle.locator()
        ),
        Err(_) => format!("{} ({size}, {})", view.label, view.handle.locator()),
    }
}

pub fn human_readable_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes < KB {
        return format!("{bytes} B");
    }
    if bytes < MB {
        return format_scaled_unit(bytes, KB, "KB");
    }
    format_scaled_unit(bytes, MB, "MB")
}

fn format_scaled_unit(bytes: u64, unit_size: u64, unit_label: &str) -> String {
    let value = bytes as f64 / unit_size as f64;
    let value_text = format!("{value:.1}");
    let compact_value = value_text.strip_suffix(".0").unwrap_or(&value_text);
    format!("{compact_value} {unit_label}")
}

#[cfg(test)]
mod tests {
    use client_core::HandleRegistry;
    use shared::domain::{Revision, WorkflowState};

    use super::*;

    #[test]
    fn formats_byte_sizes_compactly() {
        assert_eq!(human_readable_bytes(512), "512 B");
        assert_eq!(human_readable_bytes(2048), "2 KB");
        assert_eq!(human_readable_bytes(1536), "1.5 KB");
        assert_eq!(human_readable_bytes(3 * 1024 * 1024), "3 MB");
    }

    #[test]
    fn empty_snapshot_shows_disabled_controls() {
        let snapshot = WorkflowSnapshot {
            state: WorkflowState::Empty,
            revision: Revision(0),
            source: None,
            translated: None,
            last_error: None,
        };
        assert_eq!(
            render_snapshot(&snapshot),
            "[empty] translate: off | download: off"
        );
    }

    #[test]
    fn failed_snapshot_lists_source_and_error() {
        let registry = HandleRegistry::new();
        let snapshot = WorkflowSnapshot {
            state: WorkflowState::Failed,
            revision: Revision(3),
            source: Some(ImageView {
                label: "page.png".to_string(),
                handle: registry.acquire(vec![1u8, 2, 3], "image/png"),
            }),
            translated: None,
            last_error: Some("service unreachable".to_string()),
        };

        let rendered = render_snapshot(&snapshot);
        assert!(rendered.starts_with("[failed] translate: on | download: off"));
        assert!(rendered.contains("original:   page.png (3 B, blob:translator/"));
        assert!(rendered.contains("last error: service unreachable"));
        assert!(!rendered.contains("translated:"));
    }

    #[test]
    fn blocking_notifications_are_framed() {
        let rendered = render_notification(&Notification::error("boom"));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("boom"));
        assert_eq!(lines[0].len(), lines[1].len());

        assert_eq!(render_notification(&Notification::info("saved")), "saved");
    }
}
