use dl_types::TopOfBookChange;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Prints the mid price of every change that has both sides of the book.
pub async fn print_changes(
    mut changes: Receiver<Arc<TopOfBookChange>>,
    cancellation_token: CancellationToken,
) {
    loop {
        select! {
            next = changes.recv() => match next {
                Ok(change) => {
                    if let Some(line) = format_change(timestamp_ms(), &change) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("Printer lagged, skipped {skipped} changes"),
                Err(RecvError::Closed) => break,
            },
            _ = cancellation_token.cancelled() => break,
        }
    }

    info!("Printer stopped");
}

fn format_change(timestamp_ms: u128, change: &TopOfBookChange) -> Option<String> {
    let mid = change.top_of_book().mid_price()?;
    Some(format!(
        "{timestamp_ms} {} {} {}",
        change.exchange,
        change.pair,
        mid.normalize()
    ))
}

fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
