use twilight_http::client::InteractionClient;
use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::application::interaction::message_component::MessageComponentInteractionData;
use twilight_model::application::interaction::Interaction;
use twilight_model::channel::message::Embed;
use twilight_model::id::marker::GuildMarker;
use twilight_model::id::Id;
use twilight_util::builder::embed::EmbedBuilder;

use crate::bot::client::ApiRef;
use crate::bot::guild::CachedGuildView;
use crate::util::{Result, BRANDING, FAILURE, SUCCESS};

/// A command interaction event context.
pub type CommandCtx<'api, 'evt> = Ctx<'api, 'evt, &'evt CommandData>;

/// A component interaction event context.
pub type ComponentCtx<'api, 'evt> = Ctx<'api, 'evt, &'evt MessageComponentInteractionData>;

/// An interaction event context.
#[derive(Clone, Copy, Debug)]
pub struct Ctx<'api: 'evt, 'evt, T: Send> {
    /// The HTTP and cache APIs.
    pub api: ApiRef<'api>,
    /// The referenced interaction event.
    pub event: &'evt Interaction,
    /// The data of this interaction context.
    pub data: T,
    /// Whether the event has been deferred, and if so whether ephemerally.
    defer_state: Option<bool>,
}

impl<'api: 'evt, 'evt, T: Send> Ctx<'api, 'evt, T> {
    /// Creates a new interaction event [`Ctx<T>`].
    pub const fn new(api: ApiRef<'api>, event: &'evt Interaction, data: T) -> Self {
        Self { api, event, data, defer_state: None }
    }

    /// Returns the interaction client of this interaction event [`Ctx<T>`].
    pub fn client(&self) -> InteractionClient {
        self.api.http.interaction(self.event.application_id)
    }

    /// Returns the guild of the interaction, activating its configuration if needed.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction was not sent from within a guild.
    pub fn guild(&self) -> Result<(Id<GuildMarker>, CachedGuildView<'api>)> {
        let Some(guild_id) = self.event.guild_id else {
            anyhow::bail!("this interaction must be used within a server");
        };

        Ok((guild_id, crate::bot::guild::activate(self.api, guild_id)?))
    }

    /// Defers the interaction, showing a loading message.
    ///
    /// # Errors
    ///
    /// This function will return an error if responding failed.
    pub async fn defer(&mut self, ephemeral: bool) -> Result {
        if self.defer_state.is_some() {
            return Ok(());
        }

        if ephemeral {
            crate::respond!(as self => {
                let kind = DeferredChannelMessageWithSource;
                let flags = EPHEMERAL;
            })
            .await?;
        } else {
            crate::respond!(as self => {
                let kind = DeferredChannelMessageWithSource;
            })
            .await?;
        }

        self.defer_state = Some(ephemeral);

        Ok(())
    }

    /// Responds to the interaction with plain text, following up if the interaction was deferred.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    pub async fn reply(&self, content: impl AsRef<str> + Send) -> Result {
        let content = content.as_ref();

        match self.defer_state {
            Some(_) => {
                crate::followup!(as self => {
                    let content = content;
                    let flags = EPHEMERAL;
                })
                .await?;
            }
            None => {
                crate::respond!(as self => {
                    let kind = ChannelMessageWithSource;
                    let content = content;
                    let flags = EPHEMERAL;
                })
                .await?;
            }
        }

        Ok(())
    }

    /// Responds to the interaction with an embed.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    pub async fn embed(&self, embed: Embed) -> Result {
        match self.defer_state {
            Some(false) => {
                crate::followup!(as self => {
                    let embeds = &[embed];
                })
                .await?;
            }
            Some(true) => {
                crate::followup!(as self => {
                    let embeds = &[embed];
                    let flags = EPHEMERAL;
                })
                .await?;
            }
            None => {
                crate::respond!(as self => {
                    let kind = ChannelMessageWithSource;
                    let embeds = [embed];
                    let flags = EPHEMERAL;
                })
                .await?;
            }
        }

        Ok(())
    }

    /// Responds to the interaction with a colored message.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    async fn complete(&self, color: u32, title: &str, description: Option<&str>) -> Result {
        let mut embed = EmbedBuilder::new().color(color).title(title);

        if let Some(description) = description {
            embed = embed.description(description);
        }

        self.embed(embed.build()).await
    }

    /// Responds to the interaction with a success message.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    #[inline]
    pub async fn success(&self, title: &str, description: Option<&str>) -> Result {
        self.complete(SUCCESS, title, description).await
    }

    /// Responds to the interaction with a notification message.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    #[inline]
    pub async fn notify(&self, title: &str, description: Option<&str>) -> Result {
        self.complete(BRANDING, title, description).await
    }

    /// Responds to the interaction with a failure message.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    #[inline]
    pub async fn failure(&self, title: &str, description: Option<&str>) -> Result {
        self.complete(FAILURE, title, description).await
    }
}

/// Responds to an interaction event.
///
/// # Examples
///
/// ```ignore
/// respond!(as api.http, event => {
///     let kind = DeferredChannelMessageWithSource;
///     let flags = EPHEMERAL;
/// })
/// .await?;
///
/// respond!(as ctx => {
///     let kind = ChannelMessageWithSource;
///     let embeds = [embed.build()];
/// })
/// .await?;
/// ```
#[macro_export]
macro_rules! respond {
    (as $http:expr, $event:expr => { $($args:tt)+ }) => {
        $crate::respond!(@($http.interaction($event.application_id), $event.id, &$event.token, { $($args)+ }))
    };
    (as $ctx:expr => { $($args:tt)+ }) => {
        $crate::respond!(@($ctx.client(), $ctx.event.id, &$ctx.event.token, { $($args)+ }))
    };
    (@($client:expr, $id:expr, $token:expr, {
        let kind = $kind:ident;
        $(let components = $components:expr;)?
        $(let content = $content:expr;)?
        $(let embeds = $embeds:expr;)?
        $(let flags = $($flag:ident)|+;)?
    })) => {
        $client.create_response($id, $token, &::twilight_model::http::interaction::InteractionResponse {
            kind: ::twilight_model::http::interaction::InteractionResponseType::$kind,
            data: Some(
                ::twilight_util::builder::InteractionResponseDataBuilder::new()
                    $(.components($components))?
                    $(.content($content))?
                    $(.embeds($embeds))?
                    $(.flags(::twilight_model::channel::message::MessageFlags::empty()$(.union(::twilight_model::channel::message::MessageFlags::$flag))+))?
                    .build()
            ),
        })
    };
}

/// Follows-up an interaction event response.
///
/// # Examples
///
/// ```ignore
/// followup!(as ctx => {
///     let embeds = &[embed.build()];
///     let flags = EPHEMERAL;
/// })
/// .await?;
/// ```
#[macro_export]
macro_rules! followup {
    (as $http:expr, $event:expr => { $($args:tt)* }) => {
        $crate::followup!(@($http.interaction($event.application_id), &$event.token, { $($args)* }))
    };
    (as $ctx:expr => { $($args:tt)* }) => {
        $crate::followup!(@($ctx.client(), &$ctx.event.token, { $($args)* }))
    };
    (@($client:expr, $token:expr, {
        $(let components = $components:expr;)?
        $(let content = $content:expr;)?
        $(let embeds = $embeds:expr;)?
        $(let flags = $($flag:ident)|+;)?
    })) => {
        $client.create_followup($token)
            $(.components($components)?)?
            $(.content($content)?)?
            $(.embeds($embeds)?)?
            $(.flags(::twilight_model::channel::message::MessageFlags::empty()$(.union(::twilight_model::channel::message::MessageFlags::$flag))+))?
    };
}
