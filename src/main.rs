#![deny(clippy::expect_used, unsafe_code, clippy::unwrap_used)]
#![warn(clippy::nursery, clippy::todo, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! A self-service role selection bot for Discord servers.

use std::path::Path;
use std::sync::Arc;

use autorole_logger::{error, info};
use autorole_storage::Stored;
use clap::Parser;

use crate::bot::BotClient;
use crate::store::snapshot::{Loaded, Snapshot};
use crate::store::GuildConfigStore;
use crate::util::{Arguments, Result};

/// Provides the bot client and its event handling.
pub mod bot;
/// Provides the bot's commands.
pub mod cmd;
/// Provides role selection reconciliation.
pub mod reconcile;
/// Provides the guild configuration store.
pub mod store;
/// Provides commonly used definitions.
pub mod util;

#[tokio::main]
async fn main() -> Result {
    #[cfg(feature = "dotenv")]
    dotenvy::dotenv().ok();

    let arguments = Arguments::parse();
    let logger = autorole_logger::install(
        autorole_logger::Config {
            print: !arguments.log_no_print,
            write: !arguments.log_no_write,
            color: !arguments.log_no_color,
            ..Default::default()
        },
        &arguments.log_write_dir,
    )?;

    let store = Arc::new(self::load_store(&arguments.data_file_dir)?);

    let result = match BotClient::new(Arc::clone(&store)).await {
        Ok(client) => client.start().await,
        Err(error) => Err(error),
    };

    if let Err(ref error) = result {
        error!("the bot stopped unexpectedly - {error}")?;
    }

    self::save_store(&store, &arguments.data_file_dir)?;
    logger.join()?;

    result
}

/// Loads the configuration store from the given data directory.
///
/// A missing file starts the bot with an empty store. An unreadable file is moved aside and the
/// bot starts empty, so the shutdown save never replaces it.
///
/// # Errors
///
/// This function will return an error if an unreadable file could not be moved or the logger has
/// been closed.
fn load_store(dir: &Path) -> Result<GuildConfigStore> {
    let store = GuildConfigStore::new();
    let key = Snapshot::stored(dir.to_string_lossy().into());

    match Snapshot::load(&key)? {
        Loaded::Found(snapshot) => {
            info!("loaded {} guild configuration(s) from '{}'", snapshot.0.len(), key.path().display())?;

            store.load_all(snapshot);
        }
        Loaded::Missing => info!("no configuration file found at '{}', starting empty", key.path().display())?,
        Loaded::Quarantined { error, moved_to } => error!(
            "unable to load '{}', moved it to '{}' and starting empty - {error}",
            key.path().display(),
            moved_to.display()
        )?,
    }

    Ok(store)
}

/// Writes every guild's configuration into the given data directory.
///
/// # Errors
///
/// This function will return an error if the logger has been closed.
fn save_store(store: &GuildConfigStore, dir: &Path) -> Result {
    let key = Snapshot::stored(dir.to_string_lossy().into());
    let snapshot = store.persist_all();

    match key.write(&snapshot) {
        Ok(()) => info!("saved {} guild configuration(s) to '{}'", snapshot.0.len(), key.path().display())?,
        Err(error) => error!("unable to save '{}' - {error}", key.path().display())?,
    }

    Ok(())
}
