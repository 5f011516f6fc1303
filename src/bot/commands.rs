use crate::bot::Incoming;
use crate::config::Settings;
use crate::logging;
use crate::replies;
use crate::transport::{MessageRef, Outbound};
use anyhow::Result;
use chrono::NaiveDate;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show usage instructions
    #[command(description = "Show usage instructions.")]
    Start,
    /// Send today's log file (allow-listed users only)
    #[command(description = "Get today's log file.")]
    Log,
}

/// Run one command and reply with a generic apology if it fails.
///
/// Commands arriving after `shutdown` was cancelled are ignored.
pub async fn run(
    outbound: &dyn Outbound,
    settings: &Settings,
    cmd: Command,
    incoming: &Incoming,
    today: NaiveDate,
    shutdown: &CancellationToken,
) {
    if shutdown.is_cancelled() {
        debug!("Shutdown in progress, ignoring {cmd:?} from {}", incoming.submitter);
        return;
    }
    info!("Command {cmd:?} from {}.", incoming.submitter);

    let res = match cmd {
        Command::Start => start(outbound, &incoming.source).await,
        Command::Log => {
            send_log(
                outbound,
                settings,
                incoming.submitter.id,
                &incoming.source,
                today,
            )
            .await
        }
    };
    if let Err(e) = res {
        error!("Command error: {e:#}");
        apologize(outbound, incoming).await;
    }
}

/// Reply to `incoming` with the generic internal error notice
pub async fn apologize(outbound: &dyn Outbound, incoming: &Incoming) {
    if let Err(e) = outbound
        .reply(&incoming.source, replies::INTERNAL_ERROR)
        .await
    {
        error!(
            "Failed to send error notice to {}: {e}",
            incoming.submitter
        );
    }
}

/// Start handler
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn start(outbound: &dyn Outbound, source: &MessageRef) -> Result<()> {
    outbound.reply(source, replies::START).await?;
    Ok(())
}

/// Log handler: replies with the log file for `today`.
///
/// Users outside the allow-list always get a rejection and never the file.
///
/// # Errors
///
/// Returns an error if the reply or the upload fails.
pub async fn send_log(
    outbound: &dyn Outbound,
    settings: &Settings,
    user_id: i64,
    source: &MessageRef,
    today: NaiveDate,
) -> Result<()> {
    if !settings.allowed_users().contains(&user_id) {
        warn!("User {user_id} requested logs without permission.");
        outbound.reply(source, replies::ACCESS_DENIED).await?;
        return Ok(());
    }

    let path = logging::log_file_path(&settings.log_dir, today);
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        info!("Sending log file {} to user {user_id}.", path.display());
        outbound.reply_document(source, &path).await?;
    } else {
        info!("Log file {} not found for user {user_id}.", path.display());
        outbound.reply(source, replies::LOGS_NOT_FOUND).await?;
    }
    Ok(())
}
