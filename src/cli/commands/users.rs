//! Users command implementation
//!
//! This module implements the `users` command group that maintains the list
//! of authorized subscribers. The first subscriber added is the
//! administrator and sees every subscription.

use super::{open_services, EXIT_CONFIG, EXIT_OK};
use crate::domain::SubscriberId;
use clap::{Args, Subcommand};

/// Authorized subscriber commands
#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// Authorize a subscriber
    Add(UserArgs),

    /// Revoke a subscriber
    Remove(UserArgs),

    /// List authorized subscribers
    List,
}

/// A single subscriber id
#[derive(Args, Debug)]
pub struct UserArgs {
    /// Subscriber id (for Telegram, the chat id)
    pub subscriber: String,
}

impl UsersCommand {
    /// Execute the selected subcommand
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let subscriber = match self {
            UsersCommand::Add(args) | UsersCommand::Remove(args) => {
                match SubscriberId::new(args.subscriber.as_str()) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        println!("❌ {e}");
                        return Ok(EXIT_CONFIG);
                    }
                }
            }
            UsersCommand::List => None,
        };

        let (_config, services) = match open_services(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };
        let users = &services.stores.users;

        match (self, subscriber) {
            (UsersCommand::Add(_), Some(id)) => {
                if users.add(id.clone()).await? {
                    tracing::info!(subscriber = %id, "Subscriber authorized");
                    println!("✅ Subscriber {id} authorized");
                    if users.is_admin(&id).await? {
                        println!("   👑 {id} is the administrator");
                    }
                } else {
                    println!("ℹ️  Subscriber {id} is already authorized");
                }
                Ok(EXIT_OK)
            }
            (UsersCommand::Remove(_), Some(id)) => {
                if users.remove(&id).await? {
                    tracing::info!(subscriber = %id, "Subscriber revoked");
                    println!("✅ Subscriber {id} revoked");
                    Ok(EXIT_OK)
                } else {
                    println!("❌ Subscriber {id} is not authorized");
                    Ok(EXIT_CONFIG)
                }
            }
            _ => {
                let all = users.all().await?;
                if all.is_empty() {
                    println!("No authorized subscribers.");
                    println!("Run 'recup-monitor users add <ID>' to add the administrator.");
                    return Ok(EXIT_OK);
                }
                println!("Authorized subscribers:");
                for (i, id) in all.iter().enumerate() {
                    let role = if i == 0 { "admin" } else { "user" };
                    println!("  {:<20} {role}", id.as_str());
                }
                Ok(EXIT_OK)
            }
        }
    }
}
