use std::sync::Arc;
use async_trait::async_trait;
use log::{error, info};
use teloxide::prelude::*;
use teloxide::repls::CommandReplExt;
use teloxide::utils::command::BotCommands;
use crate::error::{Error, ErrorKind, Result};
use crate::models::ChatId;
use crate::notifier::Notifier;
use crate::services::{RateAnalytics, SubscriptionService};
use crate::validation::{normalize_symbol, parse_minutes};

pub mod format;

use format::{format_rate_details, render_digest};

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Current rates, or details for one coin: /rates BTC")]
    Rates(String),
    #[command(description = "Send rates every N minutes: /startauto 10")]
    StartAuto(String),
    #[command(description = "Stop the periodic rates")]
    StopAuto,
}

pub struct TelegramBot {
    bot: Bot,
    analytics: Arc<RateAnalytics>,
    subscriptions: Arc<SubscriptionService>,
    default_interval_minutes: i32,
}

impl TelegramBot {
    pub fn new(
        bot: Bot,
        analytics: Arc<RateAnalytics>,
        subscriptions: Arc<SubscriptionService>,
        default_interval_minutes: i32,
    ) -> Self {
        Self { bot, analytics, subscriptions, default_interval_minutes }
    }

    /// Long-polls for commands until the process exits.
    pub async fn start(self: Arc<Self>) -> Result<()> {
        info!("Telegram bot polling started");
        let bot = self.bot.clone();
        let handler = self.clone();
        Command::repl(bot, move |bot: Bot, msg: Message, cmd: Command| {
            let handler = handler.clone();
            async move {
                let reply = handler.reply_for(msg.chat.id.0, cmd).await;
                if let Err(e) = bot.send_message(msg.chat.id, reply).await {
                    error!("Failed to reply to chat {}: {}", msg.chat.id.0, e);
                }
                respond(())
            }
        })
        .await;
        Ok(())
    }

    /// Text to send back for `command` issued in `chat_id`.
    pub async fn reply_for(&self, chat_id: ChatId, command: Command) -> String {
        let outcome = match command {
            Command::Start => Ok(format!(
                "Hi! I report crypto rates for {}.\nUse /rates to see them or /startauto to get them every {} minutes.",
                self.analytics.tracked().symbols().collect::<Vec<_>>().join(", "),
                self.default_interval_minutes
            )),
            Command::Help => Ok(Command::descriptions().to_string()),
            Command::Rates(arg) => self.rates(arg.trim()).await,
            Command::StartAuto(arg) => self.start_auto(chat_id, arg.trim()).await,
            Command::StopAuto => self
                .subscriptions
                .disable(chat_id)
                .await
                .map(|_| "Periodic rates stopped.".to_string()),
        };
        outcome.unwrap_or_else(|e| user_message(chat_id, &e))
    }

    async fn rates(&self, arg: &str) -> Result<String> {
        if arg.is_empty() {
            let snapshot = self.analytics.get_all_latest().await?;
            return Ok(render_digest(&snapshot));
        }
        let symbol = normalize_symbol(arg)?;
        let stats = self.analytics.get_stats_by_symbol(&symbol, None, None).await?;
        Ok(format_rate_details(&stats))
    }

    async fn start_auto(&self, chat_id: ChatId, arg: &str) -> Result<String> {
        let minutes = if arg.is_empty() {
            self.default_interval_minutes
        } else {
            parse_minutes(arg)?
        };
        self.subscriptions.enable(chat_id, i64::from(minutes)).await?;
        Ok(format!("You will get rates every {} minutes.", minutes))
    }
}

fn user_message(chat_id: ChatId, error: &Error) -> String {
    match (error.kind(), error) {
        (_, Error::CoinNotFound(symbol)) => format!("Unknown coin: {}", symbol),
        (ErrorKind::NotFound, _) => "No rates collected yet, try again later.".to_string(),
        (ErrorKind::Unprocessable, _) => {
            "Not enough history for the 1h change yet, try again later.".to_string()
        }
        (ErrorKind::BadRequest, Error::InvalidInterval(_)) => {
            "The interval must be a positive number of minutes.".to_string()
        }
        (ErrorKind::BadRequest, e) => e.to_string(),
        (ErrorKind::Internal, e) => {
            error!("Command from chat {} failed: {}", chat_id, e);
            "Something went wrong, please try again later.".to_string()
        }
    }
}

/// Delivers digests through the Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.bot
            .send_message(teloxide::types::ChatId(chat_id), text.to_string())
            .await?;
        Ok(())
    }
}
