use autorole_logger::{debug, info};
use twilight_cache_inmemory::InMemoryCache;
use twilight_model::id::marker::{EmojiMarker, GuildMarker, RoleMarker};
use twilight_model::id::Id;

use crate::bot::client::ApiRef;
use crate::store::model::{EmojiRef, GuildView, RoleInfo, RoleRank};
use crate::store::Activation;

/// Resolves a guild's roles and emoji through the in-memory cache.
#[derive(Clone, Copy, Debug)]
pub struct CachedGuildView<'api> {
    /// The bot's cache.
    cache: &'api InMemoryCache,
    /// The viewed guild.
    guild_id: Id<GuildMarker>,
}

impl<'api> CachedGuildView<'api> {
    /// Creates a new [`CachedGuildView`].
    #[must_use]
    pub const fn new(cache: &'api InMemoryCache, guild_id: Id<GuildMarker>) -> Self {
        Self { cache, guild_id }
    }

    /// Returns the rank of the guild's default role, held implicitly by every member.
    #[must_use]
    pub fn everyone_rank(&self) -> RoleRank {
        RoleRank::new(0, self.guild_id.cast())
    }

    /// Returns the rank of the highest of the given roles, or the default role's rank if none of
    /// them resolve.
    pub fn top_rank<'r>(&self, roles: impl IntoIterator<Item = &'r Id<RoleMarker>>) -> RoleRank {
        let ranks = roles.into_iter().filter_map(|id| self.role(*id)).map(|role| role.rank);

        ranks.max().unwrap_or_else(|| self.everyone_rank()).max(self.everyone_rank())
    }

    /// Returns the rank of the bot's highest role within the guild.
    #[must_use]
    pub fn bot_rank(&self) -> Option<RoleRank> {
        let user = self.cache.current_user()?;
        let member = self.cache.member(self.guild_id, user.id)?;

        Some(self.top_rank(member.roles()))
    }
}

impl GuildView for CachedGuildView<'_> {
    fn guild_id(&self) -> Id<GuildMarker> {
        self.guild_id
    }

    fn role(&self, id: Id<RoleMarker>) -> Option<RoleInfo> {
        let role = self.cache.role(id)?;

        if role.guild_id() != self.guild_id {
            return None;
        }

        Some(RoleInfo {
            id,
            name: role.name.clone().into_boxed_str(),
            rank: RoleRank::new(role.position, id),
            managed: role.managed,
            everyone: id.get() == self.guild_id.get(),
        })
    }

    fn emoji(&self, id: Id<EmojiMarker>) -> Option<EmojiRef> {
        let emoji = self.cache.emoji(id)?;

        if emoji.guild_id() != self.guild_id {
            return None;
        }

        Some(EmojiRef::Custom { id, name: emoji.name().into(), animated: emoji.animated() })
    }
}

/// Makes the guild's configuration live if it is not already, returning a view of the guild.
///
/// # Errors
///
/// This function will return an error if the logger has been closed.
pub fn activate(api: ApiRef<'_>, guild_id: Id<GuildMarker>) -> crate::util::Result<CachedGuildView<'_>> {
    let view = CachedGuildView::new(api.cache, guild_id);

    match api.store.activate(&view) {
        Activation::AlreadyActive => {}
        Activation::Created => debug!("created configuration for guild {guild_id}")?,
        Activation::Restored { dropped: 0 } => info!("restored configuration for guild {guild_id}")?,
        Activation::Restored { dropped } => {
            info!("restored configuration for guild {guild_id}, dropping {dropped} unresolved autorole(s)")?;
        }
    }

    Ok(view)
}
