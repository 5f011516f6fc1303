use crate::album::AlbumAggregator;
use crate::bot::commands::{self, Command};
use crate::bot::{Forwarder, Incoming};
use crate::config::Settings;
use crate::health;
use crate::transport::{Outbound, TelegramOutbound};
use chrono::Local;
use std::sync::Arc;
use teloxide::dispatching::{ShutdownToken, UpdateHandler};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run the Telegram transport runtime until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the runtime cannot be started.
pub async fn run_bot(settings: Arc<Settings>) -> anyhow::Result<()> {
    let bot = Bot::new(settings.telegram_token.clone());
    let shutdown = CancellationToken::new();

    let outbound: Arc<dyn Outbound> = Arc::new(TelegramOutbound::new(bot.clone()));
    let albums = AlbumAggregator::new(
        outbound.clone(),
        settings.creator_chat(),
        settings.album_flush_delay(),
        shutdown.clone(),
    );
    let forwarder = Arc::new(Forwarder::new(
        outbound.clone(),
        albums,
        settings.creator_chat(),
        shutdown.clone(),
    ));
    info!(
        "Forwarding to chat {} (album delay: {} ms).",
        settings.creator_chat_id, settings.album_flush_delay_ms
    );

    let health = settings.health_addr.clone().map(|addr| {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(&addr, shutdown).await {
                error!("Health endpoint failed: {e:#}");
            }
        })
    });

    let mut dispatcher = Dispatcher::builder(bot.clone(), setup_handler())
        .dependencies(dptree::deps![
            outbound,
            forwarder.clone(),
            settings,
            shutdown.clone()
        ])
        .default_handler(|_| async {})
        .build();

    tokio::spawn(shutdown_on_signal(
        dispatcher.shutdown_token(),
        shutdown.clone(),
        forwarder,
    ));

    // Updates received while the bot was down are not replayed.
    let listener = Polling::builder(bot).drop_pending_updates().build();

    info!("Bot is running in polling mode...");
    dispatcher
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    shutdown.cancel();
    if let Some(health) = health {
        if let Err(e) = health.await {
            warn!("Health endpoint task ended abnormally: {e}");
        }
    }
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM, using Ctrl-C only: {e}"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for shutdown signals: {e}");
        std::future::pending::<()>().await;
    }
}

async fn shutdown_on_signal(
    dispatcher: ShutdownToken,
    shutdown: CancellationToken,
    forwarder: Arc<Forwarder>,
) {
    wait_for_signal().await;
    info!("Shutdown signal received...");

    // New messages are ignored and pending albums are dropped from here on.
    shutdown.cancel();
    let pending = forwarder.albums().pending_albums().await;
    if pending > 0 {
        warn!("Dropping {pending} pending album(s).");
    }

    match dispatcher.shutdown() {
        Ok(stopped) => stopped.await,
        Err(_) => info!("Dispatcher was idle, nothing to stop."),
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_message))
}

async fn handle_command(
    msg: Message,
    cmd: Command,
    outbound: Arc<dyn Outbound>,
    settings: Arc<Settings>,
    shutdown: CancellationToken,
) -> Result<(), teloxide::RequestError> {
    let incoming = Incoming::from_message(&msg);
    commands::run(
        outbound.as_ref(),
        &settings,
        cmd,
        &incoming,
        Local::now().date_naive(),
        &shutdown,
    )
    .await;
    respond(())
}

async fn handle_message(
    msg: Message,
    outbound: Arc<dyn Outbound>,
    forwarder: Arc<Forwarder>,
) -> Result<(), teloxide::RequestError> {
    let incoming = Incoming::from_message(&msg);
    if let Err(e) = forwarder.handle(incoming.clone()).await {
        error!("Message handler error: {e:#}");
        commands::apologize(outbound.as_ref(), &incoming).await;
    }
    respond(())
}
