use std::cmp::Ordering;
use std::fmt::Display;

use twilight_model::channel::message::ReactionType;
use twilight_model::id::marker::{EmojiMarker, GuildMarker, RoleMarker};
use twilight_model::id::Id;

/// The maximum number of autorole entries per guild.
pub const MAX_AUTOROLES: usize = 25;
/// The maximum length of an entry description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 100;

/// An error returned when an emoji string cannot be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EmojiError {
    /// The given string was empty.
    #[error("expected a non-empty emoji")]
    Empty,
    /// The given string looked like a custom emoji but was not formatted as one.
    #[error("invalid custom emoji formatting")]
    Malformed,
    /// The custom emoji's identifier was not a non-zero integer.
    #[error("expected a non-zero emoji identifier")]
    InvalidId,
    /// The given string is not a standard emoji.
    #[error("expected a standard or custom emoji")]
    NotEmoji,
}

/// A reference to an emoji.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum EmojiRef {
    /// A standard emoji, stored as its literal string.
    Unicode(Box<str>),
    /// A guild's custom emoji.
    Custom {
        /// The emoji's identifier.
        id: Id<EmojiMarker>,
        /// The emoji's name.
        name: Box<str>,
        /// Whether the emoji is animated.
        animated: bool,
    },
}

impl EmojiRef {
    /// Parses an emoji from either its literal string or its `<:name:id>` / `<a:name:id>` mention.
    ///
    /// Standard emoji must be present within the Unicode emoji table.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value is not a recognizable emoji.
    pub fn parse(value: &str) -> Result<Self, EmojiError> {
        let value = value.trim();

        if value.is_empty() {
            return Err(EmojiError::Empty);
        }
        if !value.starts_with('<') {
            return emojis::get(value).map(|_| Self::Unicode(value.into())).ok_or(EmojiError::NotEmoji);
        }

        let Some(inner) = value.strip_prefix('<').and_then(|v| v.strip_suffix('>')) else {
            return Err(EmojiError::Malformed);
        };
        let [prefix, name, id] = inner.split(':').collect::<Vec<_>>()[..] else {
            return Err(EmojiError::Malformed);
        };

        let animated = match prefix {
            "" => false,
            "a" => true,
            _ => return Err(EmojiError::Malformed),
        };

        if name.is_empty() {
            return Err(EmojiError::Malformed);
        }

        let id = id.parse().ok().and_then(Id::new_checked).ok_or(EmojiError::InvalidId)?;

        Ok(Self::Custom { id, name: name.into(), animated })
    }

    /// Returns the identifier of this emoji if it is a custom emoji.
    #[must_use]
    pub const fn custom_id(&self) -> Option<Id<EmojiMarker>> {
        match self {
            Self::Unicode(_) => None,
            Self::Custom { id, .. } => Some(*id),
        }
    }
}

impl Display for EmojiRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unicode(name) => write!(f, "{name}"),
            Self::Custom { id, name, animated: true } => write!(f, "<a:{name}:{id}>"),
            Self::Custom { id, name, animated: false } => write!(f, "<:{name}:{id}>"),
        }
    }
}

impl From<&EmojiRef> for ReactionType {
    fn from(value: &EmojiRef) -> Self {
        match value {
            EmojiRef::Unicode(name) => Self::Unicode { name: name.to_string() },
            EmojiRef::Custom { id, name, animated } => {
                Self::Custom { animated: *animated, id: *id, name: Some(name.to_string()) }
            }
        }
    }
}

/// A single self-assignable role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoroleEntry {
    /// The assigned role.
    pub role_id: Id<RoleMarker>,
    /// The emoji displayed alongside the role.
    pub emoji: EmojiRef,
    /// The role's description, possibly empty.
    pub description: Box<str>,
    /// Whether the role is hidden from members below the guild's member role.
    pub private: bool,
}

impl AutoroleEntry {
    /// Creates a new [`AutoroleEntry`], truncating the description to its maximum length.
    pub fn new(role_id: Id<RoleMarker>, emoji: EmojiRef, description: impl AsRef<str>, private: bool) -> Self {
        let description = description.as_ref().trim().chars().take(MAX_DESCRIPTION_LEN).collect::<String>();

        Self { role_id, emoji, description: description.into_boxed_str(), private }
    }
}

impl Display for AutoroleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self { role_id, emoji, description, private } = self;

        write!(f, "role=<@&{role_id}>, emoji={emoji}, private=**{private}**, description=\"{description}\"")
    }
}

/// A guild's autorole configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuildConfig {
    /// The role required to see private entries, if any.
    pub member_role: Option<Id<RoleMarker>>,
    /// The guild's embed color.
    pub color: Option<u32>,
    /// The guild's entries, in insertion order.
    pub autoroles: Vec<AutoroleEntry>,
}

impl GuildConfig {
    /// Returns the entry for the given role.
    #[must_use]
    pub fn get(&self, role_id: Id<RoleMarker>) -> Option<&AutoroleEntry> {
        self.autoroles.iter().find(|e| e.role_id == role_id)
    }

    /// Returns whether the given role has an entry.
    #[must_use]
    pub fn contains(&self, role_id: Id<RoleMarker>) -> bool {
        self.get(role_id).is_some()
    }

    /// Returns whether no more entries may be added.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.autoroles.len() >= MAX_AUTOROLES
    }
}

/// A role's place in its guild's hierarchy.
///
/// Higher positions rank higher; on equal positions the role with the lower identifier ranks
/// higher, matching the order Discord displays them in.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct RoleRank {
    /// The role's position.
    pub position: i64,
    /// The role's identifier.
    pub id: Id<RoleMarker>,
}

impl RoleRank {
    /// Creates a new [`RoleRank`].
    #[must_use]
    pub const fn new(position: i64, id: Id<RoleMarker>) -> Self {
        Self { position, id }
    }
}

impl PartialOrd for RoleRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RoleRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position.cmp(&other.position).then_with(|| other.id.get().cmp(&self.id.get()))
    }
}

/// A role resolved against its live guild.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleInfo {
    /// The role's identifier.
    pub id: Id<RoleMarker>,
    /// The role's name.
    pub name: Box<str>,
    /// The role's hierarchy rank.
    pub rank: RoleRank,
    /// Whether the role is owned by an integration, bot, or server boosting.
    pub managed: bool,
    /// Whether this is the guild's default role.
    pub everyone: bool,
}

impl RoleInfo {
    /// Returns whether members may be given this role by a bot.
    #[must_use]
    pub const fn is_assignable(&self) -> bool {
        !(self.managed || self.everyone)
    }
}

/// Resolves identifiers against a live guild.
pub trait GuildView {
    /// Returns the guild's identifier.
    fn guild_id(&self) -> Id<GuildMarker>;

    /// Returns the role with the given identifier, if it exists within the guild.
    fn role(&self, id: Id<RoleMarker>) -> Option<RoleInfo>;

    /// Returns the custom emoji with the given identifier, if it belongs to the guild.
    fn emoji(&self, id: Id<EmojiMarker>) -> Option<EmojiRef>;
}
