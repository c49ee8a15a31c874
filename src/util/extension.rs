use twilight_cache_inmemory::model::CachedGuild;
use twilight_model::application::interaction::Interaction;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::guild::Permissions;
use twilight_model::id::marker::{GuildMarker, RoleMarker};
use twilight_model::id::Id;
use twilight_model::util::ImageHash;

/// Discord content delivery network endpoint base URL.
pub const CDN_URL: &str = "https://cdn.discordapp.com";

/// Provides type extensions for [`Interaction`]s.
pub trait InteractionExtension {
    /// Provides a marker string for the interaction.
    fn marker(&self) -> String;

    /// Returns the roles held by the interacting guild member.
    fn member_roles(&self) -> &[Id<RoleMarker>];

    /// Returns whether the interacting guild member has the given permissions, either directly or
    /// through the administrator permission.
    fn member_has(&self, permissions: Permissions) -> bool;
}

impl InteractionExtension for Interaction {
    fn marker(&self) -> String {
        self.author_id().map_or_else(
            || format!("<{:?} #{}>", self.kind, self.id),
            |id| format!("<{:?} #{} @{id}>", self.kind, self.id),
        )
    }

    fn member_roles(&self) -> &[Id<RoleMarker>] {
        self.member.as_ref().map_or(&[][..], |m| m.roles.as_slice())
    }

    fn member_has(&self, permissions: Permissions) -> bool {
        let Some(granted) = self.member.as_ref().and_then(|m| m.permissions) else {
            return false;
        };

        granted.contains(Permissions::ADMINISTRATOR) || granted.contains(permissions)
    }
}

impl InteractionExtension for InteractionCreate {
    #[inline]
    fn marker(&self) -> String {
        self.0.marker()
    }

    #[inline]
    fn member_roles(&self) -> &[Id<RoleMarker>] {
        self.0.member_roles()
    }

    #[inline]
    fn member_has(&self, permissions: Permissions) -> bool {
        self.0.member_has(permissions)
    }
}

/// Returns the URL of a guild's icon.
#[must_use]
pub fn guild_icon_url(guild_id: Id<GuildMarker>, hash: &ImageHash) -> String {
    let extension = if hash.is_animated() { "gif" } else { "png" };

    format!("{CDN_URL}/icons/{guild_id}/{hash}.{extension}")
}

/// Provides type extensions for cached guilds.
pub trait GuildExtension {
    /// Returns the URL of the guild's icon, if it has one.
    fn icon_url(&self) -> Option<String>;
}

impl GuildExtension for CachedGuild {
    fn icon_url(&self) -> Option<String> {
        self.icon().map(|hash| self::guild_icon_url(self.id(), hash))
    }
}
