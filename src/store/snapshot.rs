use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use autorole_macros::Storage;
use autorole_storage::{Error, Json, Key};
use serde::{Deserialize, Serialize};
use twilight_model::id::Id;

use crate::store::model::{AutoroleEntry, EmojiRef, GuildConfig, GuildView, MAX_AUTOROLES};

/// Every guild's persisted configuration, keyed by guild identifier.
#[repr(transparent)]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Storage)]
#[serde(transparent)]
#[format(Json)]
#[location("{}/autoroles", Box<str>)]
pub struct Snapshot(pub BTreeMap<u64, PersistedGuild>);

impl Snapshot {
    /// Reads the snapshot stored at the given key.
    ///
    /// A file that cannot be read is renamed with a `.corrupt` suffix so that it is never
    /// overwritten by a later save.
    ///
    /// # Errors
    ///
    /// This function will return an error if an unreadable file could not be renamed.
    pub fn load(key: &Key<Self, Json>) -> std::io::Result<Loaded> {
        let error = match key.read_if_exists() {
            Ok(Some(snapshot)) => return Ok(Loaded::Found(snapshot)),
            Ok(None) => return Ok(Loaded::Missing),
            Err(error) => error,
        };
        let moved_to = key.path().with_extension("json.corrupt");

        std::fs::rename(key.path(), &moved_to)?;

        Ok(Loaded::Quarantined { error, moved_to })
    }
}

/// The outcome of loading a [`Snapshot`].
#[derive(Debug)]
pub enum Loaded {
    /// The snapshot was read.
    Found(Snapshot),
    /// No snapshot has been written yet.
    Missing,
    /// The snapshot could not be read and was moved aside.
    Quarantined {
        /// The read error.
        error: Error<Json>,
        /// The file's new location.
        moved_to: PathBuf,
    },
}

/// A guild's configuration as written to disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedGuild {
    /// The member role's identifier.
    #[serde(default)]
    pub member_role: Option<u64>,
    /// The embed color as an integer.
    #[serde(default)]
    pub color: Option<u32>,
    /// The guild's entries.
    #[serde(default)]
    pub autoroles: Vec<PersistedEntry>,
}

/// An autorole entry as written to disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEntry {
    /// The role's identifier.
    pub role: u64,
    /// The entry's emoji.
    pub emoji: PersistedEmoji,
    /// The entry's description.
    #[serde(default)]
    pub description: String,
    /// Whether the entry is private.
    #[serde(default)]
    pub private: bool,
}

/// An emoji as written to disk: custom emoji by identifier, standard emoji by their literal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedEmoji {
    /// A custom emoji's identifier.
    Custom(u64),
    /// A standard emoji.
    Unicode(String),
}

impl From<&EmojiRef> for PersistedEmoji {
    fn from(value: &EmojiRef) -> Self {
        match value {
            EmojiRef::Unicode(name) => Self::Unicode(name.to_string()),
            EmojiRef::Custom { id, .. } => Self::Custom(id.get()),
        }
    }
}

impl From<&AutoroleEntry> for PersistedEntry {
    fn from(value: &AutoroleEntry) -> Self {
        Self {
            role: value.role_id.get(),
            emoji: (&value.emoji).into(),
            description: value.description.to_string(),
            private: value.private,
        }
    }
}

impl From<&GuildConfig> for PersistedGuild {
    fn from(value: &GuildConfig) -> Self {
        Self {
            member_role: value.member_role.map(Id::get),
            color: value.color,
            autoroles: value.autoroles.iter().map(Into::into).collect(),
        }
    }
}

impl PersistedGuild {
    /// Resolves this persisted configuration against a live guild, returning the configuration and
    /// the number of entries that were dropped.
    ///
    /// Entries are dropped when their role or custom emoji no longer exists, when their role was
    /// already listed, or when they exceed the entry limit. A member role that no longer exists or
    /// that is the guild's default role is cleared.
    pub fn resolve(&self, view: &impl GuildView) -> (GuildConfig, usize) {
        let member_role = self
            .member_role
            .and_then(Id::new_checked)
            .and_then(|id| view.role(id))
            .filter(|role| !role.everyone)
            .map(|role| role.id);

        let mut seen = HashSet::new();
        let autoroles = self
            .autoroles
            .iter()
            .filter_map(|entry| self::resolve_entry(entry, view))
            .filter(|entry| seen.insert(entry.role_id))
            .take(MAX_AUTOROLES)
            .collect::<Vec<_>>();

        let dropped = self.autoroles.len() - autoroles.len();

        (GuildConfig { member_role, color: self.color.map(|c| c & 0x00FF_FFFF), autoroles }, dropped)
    }
}

/// Resolves a single persisted entry, returning [`None`] if its role or emoji no longer exists.
fn resolve_entry(entry: &PersistedEntry, view: &impl GuildView) -> Option<AutoroleEntry> {
    let role = view.role(Id::new_checked(entry.role)?)?;

    if role.everyone {
        return None;
    }

    let emoji = match entry.emoji {
        PersistedEmoji::Custom(id) => view.emoji(Id::new_checked(id)?)?,
        PersistedEmoji::Unicode(ref name) => EmojiRef::parse(name).ok()?,
    };

    Some(AutoroleEntry::new(role.id, emoji, &entry.description, entry.private))
}

#[cfg(test)]
mod tests {
    use autorole_storage::Stored;

    use super::*;

    #[test]
    fn persisted_layout() {
        let json = r#"{
            "42": {
                "member_role": 7,
                "color": 255,
                "autoroles": [
                    { "role": 10, "emoji": "🎮", "description": "Gamers", "private": false },
                    { "role": 11, "emoji": 555, "description": "", "private": true }
                ]
            },
            "43": { "member_role": null, "color": null, "autoroles": [] }
        }"#;

        let snapshot = serde_json::from_str::<Snapshot>(json).unwrap();
        let guild = &snapshot.0[&42];

        assert_eq!(guild.member_role, Some(7));
        assert_eq!(guild.color, Some(255));
        assert_eq!(guild.autoroles[0].emoji, PersistedEmoji::Unicode("🎮".to_string()));
        assert_eq!(guild.autoroles[1].emoji, PersistedEmoji::Custom(555));
        assert_eq!(snapshot.0[&43], PersistedGuild::default());

        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["42"]["autoroles"][1]["emoji"], serde_json::json!(555));
        assert_eq!(value["43"]["color"], serde_json::Value::Null);
    }

    #[test]
    fn stored_location() {
        let key = Snapshot::stored("data".into());

        assert_eq!(key.path(), std::path::Path::new("data/autoroles.json"));
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let key = Snapshot::stored(dir.path().to_string_lossy().into());

        assert!(matches!(Snapshot::load(&key).unwrap(), Loaded::Missing));

        key.write(&Snapshot::default()).unwrap();

        assert!(matches!(Snapshot::load(&key).unwrap(), Loaded::Found(snapshot) if snapshot.0.is_empty()));
    }

    #[test]
    fn unreadable_file_is_moved_aside() {
        let dir = tempfile::TempDir::new().unwrap();
        let key = Snapshot::stored(dir.path().to_string_lossy().into());

        std::fs::write(key.path(), "{ not json").unwrap();

        let Loaded::Quarantined { error, moved_to } = Snapshot::load(&key).unwrap() else {
            panic!("expected the file to be moved aside");
        };

        assert!(matches!(error, Error::Decoding(_)));
        assert_eq!(moved_to, dir.path().join("autoroles.json.corrupt"));
        assert!(!key.exists().unwrap());
        assert_eq!(std::fs::read_to_string(&moved_to).unwrap(), "{ not json");
        assert!(matches!(Snapshot::load(&key).unwrap(), Loaded::Missing));
    }
}
