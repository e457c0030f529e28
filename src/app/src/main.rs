use dl_subscriber::Subscriber;
use std::future::Future;
use std::io;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod printer;

use config::AppConfig;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stdout)
        .init();

    abort_on_panic();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!("Invalid configuration: {error}");
            return;
        }
    };

    info!(
        "Service started. Exchanges: {:?}. Pairs: {}",
        config.exchanges,
        config
            .pairs
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let shutdown = CancellationToken::new();

    let mut subscriber = Subscriber::new(config.exchanges, config.pairs);
    if let Some(url) = config.binance_url {
        subscriber = subscriber.with_binance_url(url);
    }
    if let Some(url) = config.okex_url {
        subscriber = subscriber.with_okex_url(url);
    }

    let mut manager = subscriber.run(shutdown.clone());
    let printer = tokio::spawn(printer::print_changes(
        manager.subscribe_changes(),
        shutdown.clone(),
    ));

    let listeners_stopped = select! {
        _ = shutdown_requested(tokio::signal::ctrl_c()) => false,
        _ = manager.wait() => true,
    };

    if listeners_stopped {
        info!("All listeners stopped");
    } else {
        info!("Ctrl-c received");
    }

    info!("Service stopping");
    shutdown.cancel();
    if !listeners_stopped {
        manager.wait().await;
    }
    let _ = printer.await;
    info!("Service stopped");
}

/// Completes when the signal fires. If the signal cannot be listened for, never
/// completes, leaving the service to run until its listeners stop.
async fn shutdown_requested<F: Future<Output = io::Result<()>>>(signal: F) {
    if let Err(error) = signal.await {
        error!("Unable to listen for ctrl-c: {error}");
        std::future::pending::<()>().await;
    }
}

pub fn abort_on_panic() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        std::process::abort();
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn signal_requests_shutdown() {
        let result = timeout(Duration::from_secs(1), shutdown_requested(async { Ok(()) })).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn failed_signal_does_not_request_shutdown() {
        let signal = async { Err(io::Error::new(io::ErrorKind::Other, "no signal handler")) };

        let result = timeout(Duration::from_millis(100), shutdown_requested(signal)).await;

        assert!(result.is_err());
    }
}
