use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use twilight_model::id::marker::{GuildMarker, RoleMarker};
use twilight_model::id::Id;

use crate::store::model::{AutoroleEntry, GuildConfig, GuildView, RoleInfo, RoleRank};
use crate::store::snapshot::{PersistedGuild, Snapshot};

/// The guild configuration data model.
pub mod model;
/// The persisted configuration format.
pub mod snapshot;

/// Returned when a guild has no live configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("guild {0} has no loaded configuration")]
pub struct NotFoundError(pub Id<GuildMarker>);

/// A rejected attempt to add an autorole entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AddError {
    /// The guild is unknown.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// The guild already has the maximum number of entries.
    #[error("cannot have more than 25 autoroles")]
    TooManyEntries,
    /// The role is managed or is the guild's default role.
    #[error("the role is not assignable")]
    NotAssignable,
    /// The role ranks at or above the bot's highest role.
    #[error("the role is higher than the bot's top role")]
    RoleTooHigh,
}

/// The result of a successful attempt to add an autorole entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The entry was added.
    Added,
    /// The entry was added as private, but no member role is configured so nobody can see it.
    AddedUnreachable,
    /// The role already has an entry and nothing changed.
    AlreadyPresent,
}

/// A rejected attempt to change a guild setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetError {
    /// The guild is unknown.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// The guild's default role cannot be the member role.
    #[error("the default role cannot be the member role")]
    InvalidGate,
    /// The color was not six hexadecimal digits.
    #[error("expected six hexadecimal digits")]
    InvalidFormat,
}

/// The result of a successful attempt to change a guild setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOutcome {
    /// The setting already held the given value.
    Unchanged,
    /// The setting was changed.
    Updated,
}

/// The result of activating a guild.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// The guild already had a live configuration.
    AlreadyActive,
    /// The guild's configuration was restored from a dormant snapshot.
    Restored {
        /// The number of entries that no longer resolved.
        dropped: usize,
    },
    /// The guild was given an empty configuration.
    Created,
}

/// Parses a six digit hexadecimal color code.
#[must_use]
pub fn parse_color(value: &str) -> Option<u32> {
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    u32::from_str_radix(value, 16).ok()
}

/// Stores every guild's autorole configuration in memory.
///
/// Guilds present in the persisted snapshot stay dormant until they become available and are
/// resolved through [`GuildConfigStore::activate`]. Locks are always taken in the order of the
/// guild map, a single guild, then the dormant map, and are never held across an await point.
#[derive(Debug, Default)]
pub struct GuildConfigStore {
    /// The live configurations.
    live: RwLock<HashMap<Id<GuildMarker>, Arc<Mutex<GuildConfig>>>>,
    /// The persisted configurations of guilds that are not yet available.
    dormant: Mutex<BTreeMap<u64, PersistedGuild>>,
}

/// Locks a mutex, recovering its data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl GuildConfigStore {
    /// Creates a new empty [`GuildConfigStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to a guild's live configuration.
    fn guild(&self, guild_id: Id<GuildMarker>) -> Result<Arc<Mutex<GuildConfig>>, NotFoundError> {
        let live = self.live.read().unwrap_or_else(PoisonError::into_inner);

        live.get(&guild_id).map(Arc::clone).ok_or(NotFoundError(guild_id))
    }

    /// Returns a copy of a guild's live configuration.
    ///
    /// # Errors
    ///
    /// This function will return an error if the guild has no live configuration.
    pub fn get(&self, guild_id: Id<GuildMarker>) -> Result<GuildConfig, NotFoundError> {
        let guild = self.guild(guild_id)?;
        let config = lock(&guild).clone();

        Ok(config)
    }

    /// Returns whether the guild has a live configuration.
    #[must_use]
    pub fn is_active(&self, guild_id: Id<GuildMarker>) -> bool {
        self.guild(guild_id).is_ok()
    }

    /// Inserts an empty configuration for the guild, replacing any existing one.
    pub fn init_default(&self, guild_id: Id<GuildMarker>) {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);

        live.insert(guild_id, Arc::default());
    }

    /// Replaces the entire contents of the store with the given snapshot.
    ///
    /// Every guild within the snapshot is kept dormant until it is activated.
    pub fn load_all(&self, snapshot: Snapshot) {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let mut dormant = lock(&self.dormant);

        live.clear();
        *dormant = snapshot.0;
    }

    /// Makes a guild's configuration live, restoring it from its dormant snapshot if one exists.
    pub fn activate(&self, view: &impl GuildView) -> Activation {
        let guild_id = view.guild_id();
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);

        if live.contains_key(&guild_id) {
            return Activation::AlreadyActive;
        }

        let persisted = lock(&self.dormant).remove(&guild_id.get());
        let (config, activation) = match persisted {
            Some(persisted) => {
                let (config, dropped) = persisted.resolve(view);

                (config, Activation::Restored { dropped })
            }
            None => (GuildConfig::default(), Activation::Created),
        };

        live.insert(guild_id, Arc::new(Mutex::new(config)));

        activation
    }

    /// Moves a guild's live configuration back into the dormant map, returning whether it was live.
    pub fn archive(&self, guild_id: Id<GuildMarker>) -> bool {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let Some(guild) = live.remove(&guild_id) else {
            return false;
        };

        let persisted = PersistedGuild::from(&*lock(&guild));

        lock(&self.dormant).insert(guild_id.get(), persisted);

        true
    }

    /// Returns a snapshot of every live and dormant configuration.
    #[must_use]
    pub fn persist_all(&self) -> Snapshot {
        let live = self.live.read().unwrap_or_else(PoisonError::into_inner);
        let mut guilds = BTreeMap::new();

        for (guild_id, guild) in live.iter() {
            guilds.insert(guild_id.get(), PersistedGuild::from(&*lock(guild)));
        }

        for (guild_id, persisted) in lock(&self.dormant).iter() {
            guilds.entry(*guild_id).or_insert_with(|| persisted.clone());
        }

        Snapshot(guilds)
    }

    /// Adds an autorole entry to a guild.
    ///
    /// The given role must describe the entry's role, and the ceiling is the rank of the bot's
    /// highest role. Checks run in order: an existing entry, the entry limit, assignability, then
    /// the role hierarchy.
    ///
    /// # Errors
    ///
    /// This function will return an error if the guild is unknown or the entry is rejected.
    pub fn add_autorole(
        &self,
        guild_id: Id<GuildMarker>,
        entry: AutoroleEntry,
        role: &RoleInfo,
        ceiling: RoleRank,
    ) -> Result<AddOutcome, AddError> {
        let guild = self.guild(guild_id)?;
        let mut config = lock(&guild);

        if config.contains(entry.role_id) {
            return Ok(AddOutcome::AlreadyPresent);
        }
        if config.is_full() {
            return Err(AddError::TooManyEntries);
        }
        if !role.is_assignable() {
            return Err(AddError::NotAssignable);
        }
        if role.rank >= ceiling {
            return Err(AddError::RoleTooHigh);
        }

        let unreachable = entry.private && config.member_role.is_none();

        config.autoroles.push(entry);

        Ok(if unreachable { AddOutcome::AddedUnreachable } else { AddOutcome::Added })
    }

    /// Removes a role's entry from a guild, returning whether an entry was removed.
    ///
    /// # Errors
    ///
    /// This function will return an error if the guild is unknown.
    pub fn remove_autorole(&self, guild_id: Id<GuildMarker>, role_id: Id<RoleMarker>) -> Result<bool, NotFoundError> {
        let guild = self.guild(guild_id)?;
        let mut config = lock(&guild);
        let length = config.autoroles.len();

        config.autoroles.retain(|e| e.role_id != role_id);

        Ok(config.autoroles.len() != length)
    }

    /// Sets a guild's member role.
    ///
    /// # Errors
    ///
    /// This function will return an error if the guild is unknown or the role is the default role.
    pub fn set_member_role(&self, guild_id: Id<GuildMarker>, role: &RoleInfo) -> Result<SetOutcome, SetError> {
        let guild = self.guild(guild_id)?;

        if role.everyone {
            return Err(SetError::InvalidGate);
        }

        let mut config = lock(&guild);

        if config.member_role == Some(role.id) {
            return Ok(SetOutcome::Unchanged);
        }

        config.member_role = Some(role.id);

        Ok(SetOutcome::Updated)
    }

    /// Sets a guild's embed color from a six digit hexadecimal code.
    ///
    /// # Errors
    ///
    /// This function will return an error if the guild is unknown or the code is invalid.
    pub fn set_color(&self, guild_id: Id<GuildMarker>, hex: &str) -> Result<SetOutcome, SetError> {
        let guild = self.guild(guild_id)?;
        let color = self::parse_color(hex).ok_or(SetError::InvalidFormat)?;
        let mut config = lock(&guild);

        if config.color == Some(color) {
            return Ok(SetOutcome::Unchanged);
        }

        config.color = Some(color);

        Ok(SetOutcome::Updated)
    }

    /// Returns the entries visible to a member whose highest role has the given rank.
    ///
    /// Private entries are only visible when the guild's member role still exists and the member
    /// ranks at or above it.
    ///
    /// # Errors
    ///
    /// This function will return an error if the guild is unknown.
    pub fn visible_autoroles(
        &self,
        guild_id: Id<GuildMarker>,
        requester: RoleRank,
        view: &impl GuildView,
    ) -> Result<Vec<AutoroleEntry>, NotFoundError> {
        let config = self.get(guild_id)?;
        let gate = config.member_role.and_then(|id| view.role(id)).filter(|role| !role.everyone);

        if gate.is_some_and(|gate| requester >= gate.rank) {
            Ok(config.autoroles)
        } else {
            Ok(config.autoroles.into_iter().filter(|e| !e.private).collect())
        }
    }
}

#[cfg(test)]
mod tests;
