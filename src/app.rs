use std::sync::Arc;

use anyhow::Result;
use tokio::time::Duration;
use tracing::info;

use crate::client::HttpTransport;
use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::exchange::{ExchangeCoordinator, RejectReason, SubmitOutcome};
use crate::tui::{self, EventHandler};
use crate::ui::conversation::{ConversationAction, ConversationManager};

fn coordinator(config: &Config) -> Result<ExchangeCoordinator> {
    let transport = HttpTransport::new(
        config.endpoint.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    Ok(ExchangeCoordinator::new(
        ConversationStore::new(config.greeting.clone()),
        Arc::new(transport),
    ))
}

/// Interactive chat screen
pub async fn run_chat(config: &Config) -> Result<()> {
    let coordinator = coordinator(config)?;
    info!(endpoint = %config.endpoint, "starting chat");

    let mut events = EventHandler::new(Duration::from_millis(config.ui.tick_millis.max(16)));
    let mut manager = ConversationManager::new(
        coordinator,
        Duration::from_secs(config.ui.toast_seconds),
        events.sender(),
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = async {
        loop {
            terminal.draw(|frame| manager.render(frame))?;

            let Some(event) = events.next().await else {
                break;
            };
            if manager.handle_event(event) == ConversationAction::Exit {
                break;
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    info!(messages = manager.coordinator().store().len(), "chat closed");
    result
}

/// One exchange without the TUI. Returns false if no reply was received.
pub async fn send_once(config: &Config, message: &str) -> Result<bool> {
    let mut coordinator = coordinator(config)?;

    match coordinator.submit(message).await {
        SubmitOutcome::Replied => {
            if let Some(reply) = coordinator.store().last() {
                println!("{}", reply.text());
            }
            Ok(true)
        }
        SubmitOutcome::Failed(notification) => {
            eprintln!("{}: {}", notification.title, notification.description);
            Ok(false)
        }
        SubmitOutcome::Rejected(RejectReason::Empty) => {
            eprintln!("Nothing to send: the message is empty");
            Ok(false)
        }
        SubmitOutcome::Rejected(RejectReason::Pending) => Ok(false),
    }
}
