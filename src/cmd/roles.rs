use std::collections::BTreeSet;

use anyhow::bail;
use autorole_logger::{info, warn};
use twilight_http::request::AuditLogReason;
use twilight_model::channel::message::component::{ButtonStyle, SelectMenuOption};
use twilight_model::channel::message::Component;
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use crate::bot::client::ApiRef;
use crate::bot::interaction::{CommandCtx, ComponentCtx, Ctx};
use crate::cmd::{CommandEntry, OnCommand, OnComponent};
use crate::reconcile::{reconcile, Delta};
use crate::store::model::{AutoroleEntry, GuildView};
use crate::util::builder::{ActionRowBuilder, ButtonBuilder, SelectMenuBuilder, SelectMenuOptionBuilder};
use crate::util::extension::InteractionExtension;
use crate::util::{CustomId, Result};

/// The component kind of the panel's button.
pub const OPEN: &str = "open";
/// The component kind of the selection menu.
pub const SELECT: &str = "select";
/// The audit log reason attached to every role change.
const REASON: &str = "Autorole";

crate::register_command! {
    ChatInput("roles") {
        let description = "Opens the role selection menu";
        let in_dms = false;
        let handlers = {
            command = self::execute_command;
            component = self::execute_component;
        };
    }
}

/// Returns the button that opens the selection menu from a panel message.
///
/// # Errors
///
/// This function will return an error if the button's identifier is invalid.
pub fn panel_button() -> Result<Component> {
    let custom_id = CustomId::new(self::entry().name, OPEN)?;
    let button = ButtonBuilder::new(ButtonStyle::Primary).custom_id(custom_id).label("Select Role(s)");

    Ok(ActionRowBuilder::new([button]).into())
}

/// Executes the command.
///
/// # Errors
///
/// This function will return an error if the command could not be executed.
async fn execute_command<'api: 'evt, 'evt>(
    cmd: &(dyn OnCommand + Send + Sync),
    ctx: CommandCtx<'api, 'evt>,
) -> Result {
    self::open_menu(cmd.entry(), ctx).await
}

/// Executes a component.
///
/// # Errors
///
/// This function will return an error if the component could not be executed.
async fn execute_component<'api: 'evt, 'evt>(
    cpn: &(dyn OnComponent + Send + Sync),
    ctx: ComponentCtx<'api, 'evt>,
    id: CustomId,
) -> Result {
    match id.kind() {
        OPEN => self::open_menu(cpn.entry(), ctx).await,
        SELECT => self::submit_menu(ctx).await,
        kind => bail!("unknown component kind '{kind}'"),
    }
}

/// Responds with a selection menu of every autorole visible to the interacting member.
///
/// # Errors
///
/// This function will return an error if the interaction could not be responded to.
async fn open_menu<'api: 'evt, 'evt, T: Send + Sync>(entry: &CommandEntry, ctx: Ctx<'api, 'evt, T>) -> Result {
    let (guild_id, view) = ctx.guild()?;

    if ctx.api.store.get(guild_id)?.autoroles.is_empty() {
        return ctx.reply("There are no autoroles configured for this server").await;
    }

    let requester = view.top_rank(ctx.event.member_roles());
    let visible = ctx.api.store.visible_autoroles(guild_id, requester, &view)?;
    let options = self::menu_options(&visible, &view, ctx.event.member_roles());

    if options.is_empty() {
        return ctx.reply("There are no public autoroles available").await;
    }

    let max_values = u8::try_from(options.len())?;
    let menu = SelectMenuBuilder::new(CustomId::new(entry.name, SELECT)?)
        .min_values(0)
        .max_values(max_values)
        .options(options)
        .placeholder("Select your roles");
    let components: [Component; 1] = [ActionRowBuilder::new([menu]).into()];

    crate::respond!(as ctx => {
        let kind = ChannelMessageWithSource;
        let components = components;
        let content = "Choose the roles you would like to have";
        let flags = EPHEMERAL;
    })
    .await?;

    Ok(())
}

/// Applies a submitted selection menu to the interacting member's roles.
///
/// # Errors
///
/// This function will return an error if the interaction could not be responded to.
async fn submit_menu(mut ctx: ComponentCtx<'_, '_>) -> Result {
    ctx.defer(true).await?;

    let (guild_id, _) = ctx.guild()?;
    let Some(user_id) = ctx.event.author_id() else {
        bail!("missing interaction author");
    };
    let Some(ref message) = ctx.event.message else {
        bail!("missing component message");
    };

    let config = ctx.api.store.get(guild_id)?;
    let mut offered = self::offered_roles(&message.components, &ctx.data.custom_id);

    // Entries removed since the menu was opened are left alone.
    offered.retain(|id| config.contains(*id));

    let current = ctx.event.member_roles().iter().copied().collect();
    let selected = self::parse_roles(&ctx.data.values);
    let delta = reconcile(&current, &offered, &selected);

    if delta.is_empty() {
        return ctx.reply("Nothing changed as your selection matches your current roles").await;
    }

    let failed = self::apply(ctx.api, guild_id, user_id, &delta).await?;
    let summary = self::summarize(&delta, &failed);

    if failed.is_empty() {
        info!("updated roles of user {user_id} in guild {guild_id}")?;

        ctx.success("Your roles have been updated", Some(summary.as_str())).await
    } else {
        ctx.failure("Some of your roles could not be updated", Some(summary.as_str())).await
    }
}

/// Applies a delta to a guild member, returning the roles that could not be changed.
///
/// # Errors
///
/// This function will return an error if the logger has been closed.
async fn apply(
    api: ApiRef<'_>,
    guild_id: Id<GuildMarker>,
    user_id: Id<UserMarker>,
    delta: &Delta<Id<RoleMarker>>,
) -> Result<BTreeSet<Id<RoleMarker>>> {
    let mut failed = BTreeSet::new();

    for role_id in &delta.add {
        let request = api.http.add_guild_member_role(guild_id, user_id, *role_id).reason(REASON)?;

        if let Err(error) = request.await {
            warn!("unable to give role {role_id} to user {user_id} - {error}")?;
            failed.insert(*role_id);
        }
    }

    for role_id in &delta.remove {
        let request = api.http.remove_guild_member_role(guild_id, user_id, *role_id).reason(REASON)?;

        if let Err(error) = request.await {
            warn!("unable to take role {role_id} from user {user_id} - {error}")?;
            failed.insert(*role_id);
        }
    }

    Ok(failed)
}

/// Returns the menu options for the given entries, sorted by role name.
///
/// Entries whose role no longer resolves are skipped, and roles the member holds are pre-selected.
fn menu_options(entries: &[AutoroleEntry], view: &impl GuildView, held: &[Id<RoleMarker>]) -> Vec<SelectMenuOption> {
    let mut resolved: Vec<_> =
        entries.iter().filter_map(|entry| view.role(entry.role_id).map(|role| (role.name, entry))).collect();

    resolved.sort_by(|(a, _), (b, _)| a.cmp(b));

    resolved
        .into_iter()
        .map(|(name, entry)| {
            SelectMenuOptionBuilder::new(name, entry.role_id.to_string())
                .description(&*entry.description)
                .emoji(&entry.emoji)
                .default(held.contains(&entry.role_id))
                .build()
        })
        .collect()
}

/// Returns the roles offered by the select menu with the given identifier.
fn offered_roles(components: &[Component], custom_id: &str) -> BTreeSet<Id<RoleMarker>> {
    let menus = components.iter().flat_map(|component| match component {
        Component::ActionRow(row) => row.components.iter().collect(),
        component => vec![component],
    });

    menus
        .filter_map(|component| match component {
            Component::SelectMenu(menu) if menu.custom_id == custom_id => Some(menu),
            _ => None,
        })
        .flat_map(|menu| menu.options.iter().filter_map(|o| o.value.parse().ok()))
        .collect()
}

/// Parses the submitted role identifiers, ignoring malformed values.
fn parse_roles(values: &[String]) -> BTreeSet<Id<RoleMarker>> {
    values.iter().filter_map(|v| v.parse().ok()).collect()
}

/// Describes the changes made to a member's roles.
fn summarize(delta: &Delta<Id<RoleMarker>>, failed: &BTreeSet<Id<RoleMarker>>) -> String {
    let added = delta.add.iter().filter(|id| !failed.contains(id)).map(|id| format!("Added <@&{id}>"));
    let removed = delta.remove.iter().filter(|id| !failed.contains(id)).map(|id| format!("Removed <@&{id}>"));
    let failed = failed.iter().map(|id| format!("Failed to update <@&{id}>"));

    added.chain(removed).chain(failed).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use twilight_model::channel::message::component::{ActionRow, SelectMenu};
    use twilight_model::channel::message::ReactionType;
    use twilight_model::id::marker::EmojiMarker;

    use super::*;
    use crate::store::model::{EmojiRef, RoleInfo, RoleRank};

    struct Roles(HashMap<Id<RoleMarker>, &'static str>);

    impl GuildView for Roles {
        fn guild_id(&self) -> Id<GuildMarker> {
            Id::new(1)
        }

        fn role(&self, id: Id<RoleMarker>) -> Option<RoleInfo> {
            self.0.get(&id).map(|name| RoleInfo {
                id,
                name: (*name).into(),
                rank: RoleRank::new(1, id),
                managed: false,
                everyone: false,
            })
        }

        fn emoji(&self, _: Id<EmojiMarker>) -> Option<EmojiRef> {
            None
        }
    }

    fn entry(role: u64, description: &str) -> AutoroleEntry {
        AutoroleEntry::new(Id::new(role), EmojiRef::Unicode("🎨".into()), description, false)
    }

    fn ids(values: &[u64]) -> BTreeSet<Id<RoleMarker>> {
        values.iter().map(|v| Id::new(*v)).collect()
    }

    #[test]
    fn options_sort_by_name_and_mark_held_roles() {
        let view = Roles(HashMap::from([(Id::new(10), "Painter"), (Id::new(11), "Artist")]));
        let entries = [entry(10, "Paints things"), entry(11, ""), entry(12, "Deleted")];
        let options = menu_options(&entries, &view, &[Id::new(10)]);

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].label, "Artist");
        assert_eq!(options[0].value, "11");
        assert_eq!(options[0].description, None);
        assert!(!options[0].default);
        assert_eq!(options[1].label, "Painter");
        assert_eq!(options[1].description.as_deref(), Some("Paints things"));
        assert!(options[1].default);
        assert_eq!(options[1].emoji, Some(ReactionType::Unicode { name: "🎨".to_string() }));
    }

    #[test]
    fn offered_roles_read_from_matching_menu() {
        let menu = |custom_id: &str, values: &[&str]| {
            Component::SelectMenu(SelectMenu {
                custom_id: custom_id.to_string(),
                disabled: false,
                max_values: None,
                min_values: None,
                options: values.iter().map(|v| SelectMenuOptionBuilder::new("role", *v).build()).collect(),
                placeholder: None,
            })
        };
        let components = [
            Component::ActionRow(ActionRow { components: vec![menu("roles:select", &["10", "11", "nope"])] }),
            Component::ActionRow(ActionRow { components: vec![menu("other:select", &["12"])] }),
        ];

        assert_eq!(offered_roles(&components, "roles:select"), ids(&[10, 11]));
        assert!(offered_roles(&components, "roles:missing").is_empty());
    }

    #[test]
    fn summary_lists_changes_and_failures() {
        let delta = Delta { add: ids(&[1, 2]), remove: ids(&[3]) };
        let summary = summarize(&delta, &ids(&[2]));

        assert_eq!(summary, "Added <@&1>\nRemoved <@&3>\nFailed to update <@&2>");
    }

    #[test]
    fn malformed_selections_are_ignored() {
        let values = ["5".to_string(), "0".to_string(), "x".to_string()];

        assert_eq!(parse_roles(&values), ids(&[5]));
    }
}
