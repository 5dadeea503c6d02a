//! Terminal rendering of upload events.

use std::time::Duration;

use boxreg_transfer::SpeedCalculator;
use boxreg_upload::{TransferProgress, TransferStatus, UploadEvent};
use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

const TEMPLATE: &str = "{msg}\n[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {prefix}";

/// A byte-counting bar with a status line above it.
pub fn byte_bar(total: u64, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar
}

/// Renders events until the orchestrator drops its sink.
pub async fn render_upload(mut events: mpsc::UnboundedReceiver<UploadEvent>, total: u64) {
    let bar = byte_bar(total, "");
    let speed = SpeedCalculator::default();
    let mut loaded = 0u64;

    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::Status(status) => {
                if let TransferStatus::Transmitting(p) = &status {
                    loaded = p.bytes_loaded;
                    speed.reset();
                    speed.add_sample(0);
                    bar.set_position(loaded);
                }
                bar.set_message(status.message());
                if status.is_terminal() {
                    bar.set_prefix("");
                    if let TransferStatus::Failed(_) = status {
                        bar.abandon();
                    } else {
                        bar.finish();
                    }
                }
            }
            UploadEvent::Progress(p) => {
                speed.add_sample(p.bytes_loaded.saturating_sub(loaded));
                loaded = p.bytes_loaded;
                bar.set_position(loaded);
                bar.set_message(TransferStatus::Transmitting(p).message());
                bar.set_prefix(rate_label(
                    speed.bytes_per_second(),
                    speed.eta(remaining(&p)),
                ));
            }
            UploadEvent::FieldErrors(fields) => {
                for (field, messages) in fields {
                    bar.println(format!("{field}: {}", messages.join(" ")));
                }
            }
            UploadEvent::Pending(true) => {}
            UploadEvent::Pending(false) => {
                if !bar.is_finished() {
                    bar.finish();
                }
            }
        }
    }

    if !bar.is_finished() {
        bar.finish_and_clear();
    }
}

fn remaining(p: &TransferProgress) -> u64 {
    p.total_size.saturating_sub(p.bytes_loaded)
}

fn rate_label(bytes_per_second: f64, eta: Option<Duration>) -> String {
    if bytes_per_second <= 0.0 {
        return String::new();
    }
    let rate = HumanBytes(bytes_per_second as u64);
    match eta {
        Some(eta) => format!("{rate}/s, {} left", HumanDuration(eta)),
        None => format!("{rate}/s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_label_formats() {
        assert_eq!(rate_label(0.0, None), "");
        assert_eq!(rate_label(1_048_576.0, None), "1.00 MiB/s");
        assert!(rate_label(1_048_576.0, Some(Duration::from_secs(3))).starts_with("1.00 MiB/s, "));
    }

    #[test]
    fn remaining_never_underflows() {
        assert_eq!(remaining(&TransferProgress::new(15, 10)), 0);
        assert_eq!(remaining(&TransferProgress::new(4, 10)), 6);
    }

    #[tokio::test]
    async fn render_drains_until_sender_drops() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(render_upload(rx, 10));
        tx.send(UploadEvent::Pending(true)).unwrap();
        tx.send(UploadEvent::Status(TransferStatus::Transmitting(TransferProgress::new(0, 10))))
            .unwrap();
        tx.send(UploadEvent::Progress(TransferProgress::new(10, 10))).unwrap();
        tx.send(UploadEvent::Status(TransferStatus::Succeeded)).unwrap();
        tx.send(UploadEvent::Pending(false)).unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
