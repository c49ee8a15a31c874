use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use twilight_model::id::marker::{EmojiMarker, GuildMarker, RoleMarker};
use twilight_model::id::Id;

use super::*;
use crate::store::model::{EmojiRef, MAX_AUTOROLES};
use crate::store::snapshot::{PersistedEmoji, PersistedEntry};

/// A guild described entirely in memory.
struct Fixture {
    guild_id: Id<GuildMarker>,
    roles: HashMap<Id<RoleMarker>, RoleInfo>,
    emojis: HashMap<Id<EmojiMarker>, EmojiRef>,
}

impl Fixture {
    fn new(guild_id: u64) -> Self {
        let everyone = RoleInfo {
            id: Id::new(guild_id),
            name: "@everyone".into(),
            rank: RoleRank::new(0, Id::new(guild_id)),
            managed: false,
            everyone: true,
        };

        Self { guild_id: Id::new(guild_id), roles: HashMap::from([(everyone.id, everyone)]), emojis: HashMap::new() }
    }

    fn role(mut self, id: u64, position: i64) -> Self {
        let info = RoleInfo {
            id: Id::new(id),
            name: format!("role-{id}").into(),
            rank: RoleRank::new(position, Id::new(id)),
            managed: false,
            everyone: false,
        };

        self.roles.insert(info.id, info);
        self
    }

    fn managed(mut self, id: u64, position: i64) -> Self {
        self = self.role(id, position);

        if let Some(info) = self.roles.get_mut(&Id::new(id)) {
            info.managed = true;
        }

        self
    }

    fn emoji(mut self, id: u64, name: &str) -> Self {
        self.emojis.insert(Id::new(id), EmojiRef::Custom { id: Id::new(id), name: name.into(), animated: false });
        self
    }

    fn info(&self, id: u64) -> RoleInfo {
        self.roles[&Id::new(id)].clone()
    }

    fn everyone(&self) -> RoleInfo {
        self.info(self.guild_id.get())
    }
}

impl GuildView for Fixture {
    fn guild_id(&self) -> Id<GuildMarker> {
        self.guild_id
    }

    fn role(&self, id: Id<RoleMarker>) -> Option<RoleInfo> {
        self.roles.get(&id).cloned()
    }

    fn emoji(&self, id: Id<EmojiMarker>) -> Option<EmojiRef> {
        self.emojis.get(&id).cloned()
    }
}

/// The bot's highest role sits above every fixture role.
fn ceiling() -> RoleRank {
    RoleRank::new(100, Id::new(9_999))
}

fn entry(role: u64, private: bool) -> AutoroleEntry {
    AutoroleEntry::new(Id::new(role), EmojiRef::Unicode("🎮".into()), "", private)
}

fn active(view: &Fixture) -> GuildConfigStore {
    let store = GuildConfigStore::new();

    assert_eq!(store.activate(view), Activation::Created);

    store
}

fn role_ids(entries: &[AutoroleEntry]) -> BTreeSet<u64> {
    entries.iter().map(|e| e.role_id.get()).collect()
}

#[test]
fn add_to_empty_guild() {
    let view = Fixture::new(1).role(10, 5);
    let store = active(&view);

    let outcome = store.add_autorole(view.guild_id, entry(10, false), &view.info(10), ceiling());
    assert_eq!(outcome, Ok(AddOutcome::Added));

    let visible = store.visible_autoroles(view.guild_id, view.everyone().rank, &view).unwrap();
    assert_eq!(role_ids(&visible), BTreeSet::from([10]));
}

#[test]
fn add_twice_is_already_present() {
    let view = Fixture::new(1).role(10, 5);
    let store = active(&view);

    store.add_autorole(view.guild_id, entry(10, false), &view.info(10), ceiling()).unwrap();

    let outcome = store.add_autorole(view.guild_id, entry(10, true), &view.info(10), ceiling());
    assert_eq!(outcome, Ok(AddOutcome::AlreadyPresent));
    assert_eq!(store.get(view.guild_id).unwrap().autoroles.len(), 1);
}

#[test]
fn add_rejections() {
    let view = Fixture::new(1).role(10, 5).managed(11, 6).role(12, 200);
    let store = active(&view);
    let guild_id = view.guild_id;

    let outcome = store.add_autorole(guild_id, entry(11, false), &view.info(11), ceiling());
    assert_eq!(outcome, Err(AddError::NotAssignable));

    let outcome = store.add_autorole(guild_id, entry(1, false), &view.everyone(), ceiling());
    assert_eq!(outcome, Err(AddError::NotAssignable));

    let outcome = store.add_autorole(guild_id, entry(12, false), &view.info(12), ceiling());
    assert_eq!(outcome, Err(AddError::RoleTooHigh));

    // A role level with the bot's own top role cannot be assigned either.
    let outcome = store.add_autorole(guild_id, entry(10, false), &view.info(10), view.info(10).rank);
    assert_eq!(outcome, Err(AddError::RoleTooHigh));

    assert!(store.get(guild_id).unwrap().autoroles.is_empty());
}

#[test]
fn full_guild_rejects_before_other_checks() {
    let mut view = Fixture::new(1).managed(500, 300);

    for id in 0 .. MAX_AUTOROLES as u64 {
        view = view.role(100 + id, 5);
    }

    let store = active(&view);

    for id in 0 .. MAX_AUTOROLES as u64 {
        let outcome = store.add_autorole(view.guild_id, entry(100 + id, false), &view.info(100 + id), ceiling());
        assert_eq!(outcome, Ok(AddOutcome::Added));
    }

    // Both unassignable and above the ceiling, but the limit is reported first.
    let outcome = store.add_autorole(view.guild_id, entry(500, false), &view.info(500), ceiling());
    assert_eq!(outcome, Err(AddError::TooManyEntries));

    // An existing entry is still reported as present.
    let outcome = store.add_autorole(view.guild_id, entry(100, false), &view.info(100), ceiling());
    assert_eq!(outcome, Ok(AddOutcome::AlreadyPresent));
}

#[test]
fn concurrent_adds_respect_the_limit() {
    let mut view = Fixture::new(1);

    for id in 0 .. 40 {
        view = view.role(100 + id, 5);
    }

    let store = Arc::new(active(&view));

    for id in 0 .. MAX_AUTOROLES as u64 - 1 {
        store.add_autorole(view.guild_id, entry(100 + id, false), &view.info(100 + id), ceiling()).unwrap();
    }

    let outcomes = std::thread::scope(|scope| {
        let handles = (MAX_AUTOROLES as u64 - 1 .. 40)
            .map(|id| {
                let store = Arc::clone(&store);
                let view = &view;

                scope.spawn(move || {
                    store.add_autorole(view.guild_id, entry(100 + id, false), &view.info(100 + id), ceiling())
                })
            })
            .collect::<Vec<_>>();

        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });

    let added = outcomes.iter().filter(|o| **o == Ok(AddOutcome::Added)).count();
    let rejected = outcomes.iter().filter(|o| **o == Err(AddError::TooManyEntries)).count();

    assert_eq!(added, 1);
    assert_eq!(rejected, outcomes.len() - 1);
    assert_eq!(store.get(view.guild_id).unwrap().autoroles.len(), MAX_AUTOROLES);
}

#[test]
fn private_without_member_role_is_unreachable() {
    let view = Fixture::new(1).role(10, 5).role(20, 3);
    let store = active(&view);

    let outcome = store.add_autorole(view.guild_id, entry(10, true), &view.info(10), ceiling());
    assert_eq!(outcome, Ok(AddOutcome::AddedUnreachable));

    store.set_member_role(view.guild_id, &view.info(20)).unwrap();

    let view = view.role(11, 4);
    let outcome = store.add_autorole(view.guild_id, entry(11, true), &view.info(11), ceiling());
    assert_eq!(outcome, Ok(AddOutcome::Added));
}

#[test]
fn non_conflicting_adds_commute() {
    let view = Fixture::new(1).role(10, 5).role(11, 6);
    let first = active(&view);
    let second = active(&view);

    first.add_autorole(view.guild_id, entry(10, false), &view.info(10), ceiling()).unwrap();
    first.add_autorole(view.guild_id, entry(11, true), &view.info(11), ceiling()).unwrap();

    second.add_autorole(view.guild_id, entry(11, true), &view.info(11), ceiling()).unwrap();
    second.add_autorole(view.guild_id, entry(10, false), &view.info(10), ceiling()).unwrap();

    let mut first = first.get(view.guild_id).unwrap().autoroles;
    let mut second = second.get(view.guild_id).unwrap().autoroles;

    first.sort_by_key(|e| e.role_id.get());
    second.sort_by_key(|e| e.role_id.get());

    assert_eq!(first, second);
}

#[test]
fn remove_missing_role() {
    let view = Fixture::new(1).role(10, 5);
    let store = active(&view);

    store.add_autorole(view.guild_id, entry(10, false), &view.info(10), ceiling()).unwrap();

    assert_eq!(store.remove_autorole(view.guild_id, Id::new(999)), Ok(false));
    assert_eq!(store.get(view.guild_id).unwrap().autoroles.len(), 1);

    assert_eq!(store.remove_autorole(view.guild_id, Id::new(10)), Ok(true));
    assert!(store.get(view.guild_id).unwrap().autoroles.is_empty());
}

#[test]
fn unknown_guild() {
    let store = GuildConfigStore::new();
    let guild_id = Id::new(77);

    assert_eq!(store.get(guild_id), Err(NotFoundError(guild_id)));
    assert_eq!(store.remove_autorole(guild_id, Id::new(1)), Err(NotFoundError(guild_id)));
    assert_eq!(store.set_color(guild_id, "FFFFFF"), Err(SetError::NotFound(NotFoundError(guild_id))));
}

#[test]
fn init_default_replaces_existing() {
    let view = Fixture::new(1).role(10, 5);
    let store = active(&view);

    store.add_autorole(view.guild_id, entry(10, false), &view.info(10), ceiling()).unwrap();
    store.init_default(view.guild_id);

    assert_eq!(store.get(view.guild_id), Ok(GuildConfig::default()));
}

#[test]
fn set_member_role_outcomes() {
    let view = Fixture::new(1).role(20, 3);
    let store = active(&view);

    assert_eq!(store.set_member_role(view.guild_id, &view.everyone()), Err(SetError::InvalidGate));
    assert_eq!(store.set_member_role(view.guild_id, &view.info(20)), Ok(SetOutcome::Updated));
    assert_eq!(store.set_member_role(view.guild_id, &view.info(20)), Ok(SetOutcome::Unchanged));
    assert_eq!(store.get(view.guild_id).unwrap().member_role, Some(Id::new(20)));
}

#[test]
fn set_color_outcomes() {
    let view = Fixture::new(1);
    let store = active(&view);

    assert_eq!(store.set_color(view.guild_id, "0000FF"), Ok(SetOutcome::Updated));
    assert_eq!(store.set_color(view.guild_id, "0000ff"), Ok(SetOutcome::Unchanged));
    assert_eq!(store.get(view.guild_id).unwrap().color, Some(0x00_00_FF));

    for invalid in ["#0000FF", "0000F", "0000FFF", "GGGGGG", "", "+00FFF"] {
        assert_eq!(store.set_color(view.guild_id, invalid), Err(SetError::InvalidFormat), "{invalid}");
    }

    assert_eq!(store.get(view.guild_id).unwrap().color, Some(0x00_00_FF));
}

#[test]
fn member_role_gates_private_entries() {
    let view = Fixture::new(1).role(10, 5).role(11, 6).role(20, 3).role(21, 2).role(22, 4);
    let store = active(&view);
    let guild_id = view.guild_id;

    store.add_autorole(guild_id, entry(10, false), &view.info(10), ceiling()).unwrap();
    store.add_autorole(guild_id, entry(11, true), &view.info(11), ceiling()).unwrap();

    // Without a member role, nobody sees private entries.
    let visible = store.visible_autoroles(guild_id, view.info(22).rank, &view).unwrap();
    assert_eq!(role_ids(&visible), BTreeSet::from([10]));

    store.set_member_role(guild_id, &view.info(20)).unwrap();

    let below = store.visible_autoroles(guild_id, view.info(21).rank, &view).unwrap();
    let equal = store.visible_autoroles(guild_id, view.info(20).rank, &view).unwrap();
    let above = store.visible_autoroles(guild_id, view.info(22).rank, &view).unwrap();

    assert_eq!(role_ids(&below), BTreeSet::from([10]));
    assert_eq!(role_ids(&equal), BTreeSet::from([10, 11]));
    assert_eq!(role_ids(&above), BTreeSet::from([10, 11]));

    // A deleted member role hides private entries again.
    let mut view = view;
    view.roles.remove(&Id::new(20));

    let visible = store.visible_autoroles(guild_id, view.info(22).rank, &view).unwrap();
    assert_eq!(role_ids(&visible), BTreeSet::from([10]));
}

#[test]
fn persist_then_restore() {
    let view = Fixture::new(1).role(10, 5).role(11, 6).role(20, 3).emoji(700, "blob");
    let store = active(&view);
    let guild_id = view.guild_id;
    let custom = EmojiRef::Custom { id: Id::new(700), name: "blob".into(), animated: false };

    store.add_autorole(guild_id, entry(10, false), &view.info(10), ceiling()).unwrap();
    store
        .add_autorole(guild_id, AutoroleEntry::new(Id::new(11), custom, "Blobs", true), &view.info(11), ceiling())
        .unwrap();
    store.set_member_role(guild_id, &view.info(20)).unwrap();
    store.set_color(guild_id, "24A0DE").unwrap();

    let snapshot = store.persist_all();
    let json = serde_json::to_string(&snapshot).unwrap();
    let snapshot = serde_json::from_str::<Snapshot>(&json).unwrap();

    let restored = GuildConfigStore::new();
    restored.load_all(snapshot);

    assert!(!restored.is_active(guild_id));
    assert_eq!(restored.activate(&view), Activation::Restored { dropped: 0 });
    assert_eq!(restored.get(guild_id), store.get(guild_id));
    assert_eq!(restored.activate(&view), Activation::AlreadyActive);
}

#[test]
fn restore_drops_stale_references() {
    let mut snapshot = Snapshot::default();

    snapshot.0.insert(1, PersistedGuild {
        member_role: Some(1),
        color: Some(0xFF_00_00),
        autoroles: vec![
            PersistedEntry { role: 10, emoji: PersistedEmoji::Unicode("🎮".into()), description: String::new(), private: false },
            PersistedEntry { role: 10, emoji: PersistedEmoji::Unicode("🎲".into()), description: String::new(), private: false },
            PersistedEntry { role: 11, emoji: PersistedEmoji::Unicode("🎮".into()), description: String::new(), private: false },
            PersistedEntry { role: 12, emoji: PersistedEmoji::Custom(404), description: String::new(), private: false },
            PersistedEntry { role: 13, emoji: PersistedEmoji::Unicode("abc".into()), description: String::new(), private: false },
        ],
    });

    let view = Fixture::new(1).role(10, 5).role(12, 6).role(13, 7);
    let store = GuildConfigStore::new();

    store.load_all(snapshot);

    assert_eq!(store.activate(&view), Activation::Restored { dropped: 4 });

    let config = store.get(view.guild_id).unwrap();

    // The default role is never a member role.
    assert_eq!(config.member_role, None);
    assert_eq!(config.color, Some(0xFF_00_00));
    assert_eq!(role_ids(&config.autoroles), BTreeSet::from([10]));
    assert_eq!(config.autoroles[0].emoji, EmojiRef::Unicode("🎮".into()));
}

#[test]
fn archive_keeps_configuration() {
    let view = Fixture::new(1).role(10, 5);
    let store = active(&view);

    store.add_autorole(view.guild_id, entry(10, false), &view.info(10), ceiling()).unwrap();
    let before = store.get(view.guild_id).unwrap();

    assert!(store.archive(view.guild_id));
    assert!(!store.archive(view.guild_id));
    assert!(store.get(view.guild_id).is_err());

    // Archived guilds are still written out.
    assert!(store.persist_all().0.contains_key(&1));

    assert_eq!(store.activate(&view), Activation::Restored { dropped: 0 });
    assert_eq!(store.get(view.guild_id), Ok(before));
}

#[test]
fn load_all_replaces_live_guilds() {
    let view = Fixture::new(1);
    let store = active(&view);

    store.load_all(Snapshot::default());

    assert!(!store.is_active(view.guild_id));
    assert!(store.persist_all().0.is_empty());
}
