use std::sync::Arc;

use anyhow::bail;
use autorole_logger::{error, info, warn};
use futures_util::StreamExt;
use rand::seq::SliceRandom;
use rand::thread_rng;
use tokio::task::JoinSet;
use twilight_cache_inmemory::InMemoryCache;
use twilight_gateway::error::ReceiveMessageError;
use twilight_gateway::stream::{create_recommended, ShardEventStream};
use twilight_gateway::{CloseFrame, Config, ConfigBuilder, Event, Intents, Shard};
use twilight_http::Client;
use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::application::interaction::message_component::MessageComponentInteractionData;
use twilight_model::application::interaction::{Interaction, InteractionData, InteractionType};
use twilight_model::gateway::payload::incoming::{GuildDelete, InteractionCreate, Ready};
use twilight_model::gateway::payload::outgoing::update_presence::UpdatePresencePayload;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};
use twilight_model::id::marker::GuildMarker;
use twilight_model::id::Id;
use twilight_util::builder::embed::EmbedBuilder;

use crate::bot::client::{Api, ApiRef};
use crate::bot::interaction::Ctx;
use crate::store::GuildConfigStore;
use crate::util::extension::InteractionExtension;
use crate::util::{CustomId, Result, FAILURE};

/// Provides the bot's API handles.
pub mod client;
/// Provides guild resolution and lifecycle handling.
pub mod guild;
/// Provides interaction event contexts.
pub mod interaction;

/// The titles of the embed shown when an interaction fails.
pub const ERROR_TITLES: [&str; 5] = [
    "Something went wrong",
    "Something went wrong, sorry about that",
    "That didn't work as expected",
    "An unexpected error occurred",
    "Well, that wasn't supposed to happen",
];
/// The bot's gateway intents.
pub const INTENTS: Intents = Intents::GUILDS.union(Intents::GUILD_MEMBERS).union(Intents::GUILD_EMOJIS_AND_STICKERS);

/// Implements a bot client.
#[derive(Debug)]
pub struct BotClient {
    /// The bot client's HTTP API value.
    http: Arc<Client>,
    /// The bot client's cache value.
    cache: Arc<InMemoryCache>,
    /// The bot client's guild configuration store.
    store: Arc<GuildConfigStore>,
    /// The bot client's gateway shards.
    shards: Box<[Shard]>,
}

impl BotClient {
    /// Returns a new [`BotClient`] that serves the given store.
    ///
    /// # Errors
    ///
    /// This function will return an error if the client could not create gateway shards.
    pub async fn new(store: Arc<GuildConfigStore>) -> Result<Self> {
        let token = crate::util::env::token()?;
        let http = Arc::new(Client::new(token.to_string()));
        let cache = Arc::new(InMemoryCache::new());
        let shards = Self::shards(&http, token.into_string()).await?;

        Ok(Self { http, cache, store, shards })
    }

    /// Returns the bot's gateway configuration.
    ///
    /// # Errors
    ///
    /// This function will return an error if the bot's presence is invalid.
    fn config(token: String) -> Result<Config> {
        let status = if cfg!(debug_assertions) { Status::Idle } else { Status::Online };
        let activity = MinimalActivity { kind: ActivityType::Watching, name: "for /roles".to_string(), url: None };
        let presence = UpdatePresencePayload::new(vec![activity.into()], false, None, status)?;

        Ok(ConfigBuilder::new(token, INTENTS).presence(presence).build())
    }

    /// Creates the bot's gateway shards.
    ///
    /// # Errors
    ///
    /// This function will return an error if the shards could not be created.
    async fn shards(http: &Client, token: String) -> Result<Box<[Shard]>> {
        let config = Self::config(token)?;

        Ok(create_recommended(http, config, |_, b| b.build()).await?.collect())
    }

    /// Starts the bot process, running until a fatal gateway error or an interrupt signal.
    ///
    /// # Errors
    ///
    /// This function will return an error if execution fails.
    pub async fn start(mut self) -> Result {
        let mut tasks = JoinSet::new();
        let mut stream = ShardEventStream::new(self.shards.iter_mut());
        let shutdown = tokio::signal::ctrl_c();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    if let Err(error) = signal {
                        warn!("unable to listen for the interrupt signal: {error}")?;
                    }

                    info!("shutting down")?;
                    break;
                }
                next = stream.next() => {
                    let Some((_, event)) = next else { break };

                    if Self::on_event(&self.http, &self.cache, &self.store, &mut tasks, event).is_err() {
                        break;
                    }
                }
            }
        }

        drop(stream);

        for shard in self.shards.iter_mut() {
            if let Err(error) = shard.close(CloseFrame::NORMAL).await {
                warn!("unable to close shard {}: {error}", shard.id())?;
            }
        }

        while tasks.join_next().await.is_some() {}

        Ok(())
    }

    /// Spawns a task that handles an incoming event.
    ///
    /// # Errors
    ///
    /// This function will return an error if the event was an error.
    fn on_event(
        http: &Arc<Client>,
        cache: &Arc<InMemoryCache>,
        store: &Arc<GuildConfigStore>,
        tasks: &mut JoinSet<Result>,
        event: Result<Event, ReceiveMessageError>,
    ) -> Result {
        let event = match event {
            Ok(event) => event,
            Err(fatal) if fatal.is_fatal() => {
                error!("fatal error receiving event: {fatal}")?;
                return Err(fatal.into());
            }
            Err(error) => return Ok(warn!("error receiving event: {error}")?),
        };

        cache.update(&event);
        tasks.spawn(handle_event(Api::new(Arc::clone(http), Arc::clone(cache), Arc::clone(store)), event));

        Ok(())
    }
}

/// Handles an incoming event in a new task.
///
/// # Errors
///
/// This function will return an error if the event could not be handled.
async fn handle_event(api: Api, event: Event) -> Result {
    let api = api.api_ref();
    let result = match event {
        Event::Ready(event) => handle_ready(api, *event).await,
        Event::GuildCreate(event) => handle_guild_create(api, event.0.id),
        Event::GuildDelete(event) => handle_guild_delete(api, &event),
        Event::InteractionCreate(event) => handle_interaction(api, *event).await,
        _ => Ok(()),
    };

    match result {
        Ok(()) => Ok(()),
        Err(error) => Ok(warn!("error handling event: {error}")?),
    }
}

/// Handles a ready event.
///
/// # Errors
///
/// This function will return an error if the client's command list could not be updated.
async fn handle_ready(api: ApiRef<'_>, event: Ready) -> Result {
    info!("connected to the discord api as {}", event.user.name)?;

    let id = crate::util::env::guild_id()?;
    let client = api.http.interaction(event.application.id);
    let list = client.set_guild_commands(id, &crate::cmd::registry().build_all(id)).await?;
    let count = list.model().await?.len();

    info!("patched {count} guild commands")?;

    Ok(())
}

/// Handles a guild becoming available.
///
/// # Errors
///
/// This function will return an error if the guild could not be activated.
fn handle_guild_create(api: ApiRef<'_>, guild_id: Id<GuildMarker>) -> Result {
    crate::bot::guild::activate(api, guild_id).map(|_| ())
}

/// Handles a guild becoming unavailable.
///
/// # Errors
///
/// This function will return an error if the logger has been closed.
fn handle_guild_delete(api: ApiRef<'_>, event: &GuildDelete) -> Result {
    // Outages keep the configuration live.
    if event.unavailable {
        return Ok(());
    }

    if api.store.archive(event.id) {
        info!("archived configuration for guild {}", event.id)?;
    }

    Ok(())
}

/// Handles an interaction event.
///
/// # Errors
///
/// This function will return an error if the event could not be handled.
async fn handle_interaction(api: ApiRef<'_>, event: InteractionCreate) -> Result {
    info!("received interaction: {}", event.marker())?;

    let result = match event.kind {
        InteractionType::ApplicationCommand => handle_command(api, &event).await,
        InteractionType::MessageComponent => handle_component(api, &event).await,
        _ => Ok(()),
    };

    if let Err(ref error) = result {
        warn!("interaction failed: {} - {error}", event.marker())?;
        handle_error(api, &event.0).await?;
    } else {
        info!("interaction succeeded: {}", event.marker())?;
    }

    result
}

/// Handles a command interaction event.
///
/// # Errors
///
/// This function will return an error if the event could not be handled.
async fn handle_command(api: ApiRef<'_>, event: &Interaction) -> Result {
    let Some(InteractionData::ApplicationCommand(ref data)) = event.data else {
        bail!("missing command data");
    };
    let Some(handler) = crate::cmd::registry().get(&data.name).and_then(|e| e.command()) else {
        bail!("missing command handler for '{}'", data.name);
    };

    let data: &CommandData = data;

    handler.execute(Ctx::new(api, event, data)).await
}

/// Handles a component interaction event.
///
/// # Errors
///
/// This function will return an error if the event could not be handled.
async fn handle_component(api: ApiRef<'_>, event: &Interaction) -> Result {
    let Some(InteractionData::MessageComponent(ref data)) = event.data else {
        bail!("missing component data");
    };

    let custom = data.custom_id.parse::<CustomId>()?;
    let Some(handler) = crate::cmd::registry().get(custom.name()).and_then(|e| e.component()) else {
        bail!("missing component handler for '{}'", custom.name());
    };

    let data: &MessageComponentInteractionData = data;

    handler.execute(Ctx::new(api, event, data), custom).await
}

/// Notifies an executing user that an error has occurred.
///
/// # Errors
///
/// This function will return an error if the logger could not print properly.
async fn handle_error(api: ApiRef<'_>, event: &Interaction) -> Result {
    let title = ERROR_TITLES.choose(&mut thread_rng()).copied().unwrap_or(ERROR_TITLES[0]);
    let embed = EmbedBuilder::new().color(FAILURE).title(title).build();

    // Fails if the interaction was already responded to.
    crate::respond!(as api.http, event => {
        let kind = DeferredChannelMessageWithSource;
        let flags = EPHEMERAL;
    })
    .await
    .ok();

    let result = crate::followup!(as api.http, event => {
        let embeds = &[embed];
        let flags = EPHEMERAL;
    })
    .await;

    if let Err(error) = result {
        error!("unable to notify executing user: {error}")?;
    }

    Ok(())
}
