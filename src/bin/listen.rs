//! Connects a client session to a relay and prints what arrives.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use notification_relay::client::{Identity, NotificationSession};
use notification_relay::config::ClientConfig;
use notification_relay::domain::connection::{ConnectionError, ConnectionStatus};
use notification_relay::domain::foundation::{NotificationId, TeamId, UserId};
use notification_relay::domain::notification::{Notification, SystemNotification};
use notification_relay::ports::NotificationObserver;
use notification_relay::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "relay-listen")]
#[command(about = "Listen to a notification relay as one user")]
struct Cli {
    /// Relay base URL
    #[arg(long, env = "NOTIFICATION_RELAY__CLIENT__BASE_URL", default_value = "http://localhost:8080")]
    base_url: String,

    #[arg(long)]
    user: String,

    #[arg(long)]
    team: Option<String>,

    /// Identity token
    #[arg(long, env = "RELAY_TOKEN")]
    token: String,

    /// Only use the primary channel
    #[arg(long)]
    no_fallback: bool,

    /// Mark each notification read as it arrives
    #[arg(long)]
    auto_read: bool,

    #[arg(long, default_value = "info,notification_relay=debug")]
    log: String,
}

struct PrintingObserver;

impl NotificationObserver for PrintingObserver {
    fn on_status_changed(&self, status: &ConnectionStatus) {
        tracing::info!(
            connected = status.is_connected,
            connecting = status.is_connecting,
            error = status.error.as_deref().unwrap_or("-"),
            "status"
        );
    }

    fn on_notification(&self, notification: &Notification) {
        println!(
            "[{}] {} {}: {}",
            notification.occurred_at.to_rfc3339(),
            notification.kind,
            notification.title,
            notification.message
        );
    }

    fn on_system_notification(&self, alert: &SystemNotification) {
        println!("[system:{:?}] {}: {}", alert.level, alert.title, alert.message);
    }

    fn on_read_acknowledged(&self, id: &NotificationId) {
        tracing::debug!(%id, "read acknowledged");
    }

    fn on_error(&self, error: &ConnectionError) {
        tracing::warn!(%error, "connection error");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log, false);

    let mut config = ClientConfig::for_base_url(cli.base_url);
    config.fallback_enabled = !cli.no_fallback;
    config.validate().context("validating client configuration")?;

    let mut identity = Identity::new(UserId::new(cli.user)?, cli.token);
    if let Some(team) = cli.team {
        identity = identity.with_team(TeamId::new(team)?);
    }

    let session = NotificationSession::start(config, identity, Arc::new(PrintingObserver));
    session.connect()?;

    let mut updates = session.subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                if cli.auto_read {
                    let unread: Vec<NotificationId> = updates
                        .borrow()
                        .notifications
                        .iter()
                        .filter(|n| !n.read)
                        .map(|n| n.id.clone())
                        .collect();
                    for id in unread {
                        session.mark_read(id)?;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.shutdown().await?;
    Ok(())
}
