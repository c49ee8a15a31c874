use anyhow::bail;
use autorole_logger::info;
use twilight_model::channel::message::embed::EmbedField;
use twilight_model::guild::Permissions;
use twilight_model::id::marker::{GuildMarker, RoleMarker};
use twilight_model::id::Id;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder, ImageSource};

use crate::bot::interaction::CommandCtx;
use crate::cmd::{CommandOptionResolver, OnCommand};
use crate::store::model::{AutoroleEntry, EmojiRef, GuildConfig, GuildView, RoleRank};
use crate::store::{AddError, AddOutcome, GuildConfigStore, SetError, SetOutcome};
use crate::util::extension::{GuildExtension, InteractionExtension};
use crate::util::Result;

/// The maximum number of characters within an embed description.
const DESCRIPTION_LEN: usize = 4096;
/// The maximum number of characters within an embed field value.
const FIELD_LEN: usize = 1024;

crate::register_command! {
    ChatInput("admin") {
        let description = "Manages this server's autoroles";
        let in_dms = false;
        let require = MANAGE_ROLES;
        let options = [
            SubCommand("panel") {
                let description = "Posts the autorole panel in this channel";
                let options = [
                    String("title") {
                        let description = "The panel's title";
                        let required = false;
                        let maximum = 256;
                    },
                    String("description") {
                        let description = "The panel's description";
                        let required = false;
                        let maximum = 4000;
                    },
                ];
            },
            SubCommand("add") {
                let description = "Registers a role as an autorole";
                let options = [
                    String("emoji") {
                        let description = "The emoji shown beside the role";
                        let required = true;
                    },
                    Role("role") {
                        let description = "The role to register";
                        let required = true;
                    },
                    String("description") {
                        let description = "The role's description";
                        let required = false;
                        let maximum = 100;
                    },
                    Boolean("private") {
                        let description = "Whether only members may see the role";
                        let required = false;
                    },
                ];
            },
            SubCommand("remove") {
                let description = "Unregisters an autorole";
                let options = [
                    Role("role") {
                        let description = "The role to unregister";
                        let required = true;
                    },
                ];
            },
            SubCommand("set") {
                let description = "Configures this server's autorole settings";
                let options = [
                    Role("member_role") {
                        let description = "The lowest role allowed to see private autoroles";
                        let required = false;
                    },
                    String("color") {
                        let description = "The panel's color as a six digit hex code";
                        let required = false;
                    },
                ];
            },
            SubCommand("view") {
                let description = "Displays this server's autorole configuration";
            },
        ];
        let handlers = {
            command = self::execute_command;
        };
    }
}

/// Executes the command.
///
/// # Errors
///
/// This function will return an error if the command could not be executed.
async fn execute_command<'api: 'evt, 'evt>(
    _: &(dyn OnCommand + Send + Sync),
    ctx: CommandCtx<'api, 'evt>,
) -> Result {
    if !ctx.event.member_has(Permissions::MANAGE_ROLES) {
        return ctx.reply("You need the Manage Roles permission to use this command").await;
    }

    let resolver = CommandOptionResolver::new(ctx.data);
    let (name, resolver) = resolver.subcommand()?;

    match name {
        "panel" => self::panel(ctx, resolver).await,
        "add" => self::add(ctx, resolver).await,
        "remove" => self::remove(ctx, resolver).await,
        "set" => self::set(ctx, resolver).await,
        "view" => self::view(ctx).await,
        _ => bail!("unknown or missing subcommand"),
    }
}

/// Posts the autorole panel.
///
/// # Errors
///
/// This function will return an error if the panel could not be posted.
async fn panel<'api: 'evt, 'evt>(ctx: CommandCtx<'api, 'evt>, resolver: CommandOptionResolver<'evt>) -> Result {
    let (guild_id, view) = ctx.guild()?;
    let Some(channel_id) = ctx.event.channel.as_ref().map(|c| c.id) else {
        bail!("command must be used in a channel");
    };

    let config = ctx.api.store.get(guild_id)?;

    if config.autoroles.is_empty() {
        return ctx.reply("There are no autoroles registered").await;
    }

    let mut embed = self::panel_embed(&config, &view);

    if let Some(title) = resolver.get_str("title")? {
        embed = embed.title(title);
    }
    if let Some(description) = resolver.get_str("description")? {
        embed = embed.description(description);
    }

    let footer = ctx.api.cache.guild(guild_id).map(|guild| (guild.name().to_string(), guild.icon_url()));

    if let Some((name, icon)) = footer {
        let mut footer = EmbedFooterBuilder::new(name);

        if let Some(icon) = icon {
            footer = footer.icon_url(ImageSource::url(icon)?);
        }

        embed = embed.footer(footer);
    }

    let embed = embed.validate()?.build();
    let components = [crate::cmd::roles::panel_button()?];

    ctx.api.http.create_message(channel_id).embeds(&[embed])?.components(&components)?.await?;

    info!("posted an autorole panel in channel {channel_id} of guild {guild_id}")?;

    ctx.reply("Note: the panel does not update itself when autoroles change, although its button always lists the current roles")
        .await
}

/// Registers an autorole.
///
/// # Errors
///
/// This function will return an error if the role could not be registered.
async fn add<'api: 'evt, 'evt>(ctx: CommandCtx<'api, 'evt>, resolver: CommandOptionResolver<'evt>) -> Result {
    let (guild_id, view) = ctx.guild()?;
    let emoji = crate::cmd::required("emoji", resolver.get_str("emoji")?)?;
    let role_id = *crate::cmd::required("role", resolver.get_role_id("role")?)?;
    let description = resolver.get_str("description")?.unwrap_or_default();
    let private = resolver.get_bool("private")?.copied().unwrap_or_default();

    let request = AddRequest { emoji, role_id, description, private };
    let (added, reply) = self::register(&ctx.api.store, guild_id, &view, view.bot_rank(), &request)?;

    if added {
        info!("added autorole {role_id} in guild {guild_id}")?;
    }

    ctx.reply(reply).await
}

/// Unregisters an autorole.
///
/// # Errors
///
/// This function will return an error if the role could not be unregistered.
async fn remove<'api: 'evt, 'evt>(ctx: CommandCtx<'api, 'evt>, resolver: CommandOptionResolver<'evt>) -> Result {
    let (guild_id, _) = ctx.guild()?;
    let role_id = *crate::cmd::required("role", resolver.get_role_id("role")?)?;

    if ctx.api.store.remove_autorole(guild_id, role_id)? {
        info!("removed autorole {role_id} in guild {guild_id}")?;

        ctx.reply(format!("Removed <@&{role_id}> from autoroles")).await
    } else {
        ctx.reply(format!("Nothing changed as <@&{role_id}> is not in autoroles")).await
    }
}

/// Updates the guild's settings.
///
/// # Errors
///
/// This function will return an error if the settings could not be updated.
async fn set<'api: 'evt, 'evt>(ctx: CommandCtx<'api, 'evt>, resolver: CommandOptionResolver<'evt>) -> Result {
    let (guild_id, view) = ctx.guild()?;
    let mut lines = Vec::with_capacity(2);

    if let Some(role_id) = resolver.get_role_id("member_role")? {
        let Some(role) = view.role(*role_id) else {
            bail!("unknown role {role_id}");
        };

        lines.push(self::describe_member_role(ctx.api.store.set_member_role(guild_id, &role), *role_id)?);
    }
    if let Some(color) = resolver.get_str("color")? {
        lines.push(self::describe_color(ctx.api.store.set_color(guild_id, color), color)?);
    }

    if lines.is_empty() {
        ctx.reply("Nothing changed as no option was set ❌").await
    } else {
        ctx.reply(lines.join("\n")).await
    }
}

/// Displays the guild's configuration.
///
/// # Errors
///
/// This function will return an error if the configuration could not be displayed.
async fn view<'api: 'evt, 'evt>(ctx: CommandCtx<'api, 'evt>) -> Result {
    let (guild_id, _) = ctx.guild()?;
    let text = self::describe_config(&ctx.api.store.get(guild_id)?);

    ctx.notify("Autorole configuration", Some(text.as_str())).await
}

/// The options of an `/admin add` request.
struct AddRequest<'evt> {
    /// The emoji shown beside the role.
    emoji: &'evt str,
    /// The role to register.
    role_id: Id<RoleMarker>,
    /// The role's description.
    description: &'evt str,
    /// Whether only members may see the role.
    private: bool,
}

/// Registers an autorole, returning whether it was added alongside the reply.
///
/// A role that is already registered is reported before its emoji is checked.
///
/// # Errors
///
/// This function will return an error if the guild or role is unknown, or the bot's rank is missing.
fn register(
    store: &GuildConfigStore,
    guild_id: Id<GuildMarker>,
    view: &impl GuildView,
    ceiling: Option<RoleRank>,
    request: &AddRequest<'_>,
) -> Result<(bool, String)> {
    let role_id = request.role_id;

    if store.get(guild_id)?.contains(role_id) {
        return Ok((false, self::describe_add(Ok(AddOutcome::AlreadyPresent), role_id, request.private)?));
    }

    let emoji = match EmojiRef::parse(request.emoji) {
        Ok(EmojiRef::Custom { id, .. }) => view.emoji(id),
        Ok(emoji) => Some(emoji),
        Err(_) => None,
    };
    let Some(emoji) = emoji else {
        return Ok((false, "Invalid emoji".to_string()));
    };
    let Some(role) = view.role(role_id) else {
        bail!("unknown role {role_id}");
    };
    let Some(ceiling) = ceiling else {
        bail!("the bot's member is not cached for guild {guild_id}");
    };

    let entry = AutoroleEntry::new(role_id, emoji, request.description, request.private);
    let result = store.add_autorole(guild_id, entry, &role, ceiling);
    let added = matches!(result, Ok(AddOutcome::Added | AddOutcome::AddedUnreachable));

    Ok((added, self::describe_add(result, role_id, request.private)?))
}

/// Returns the panel embed with its role fields, colored only when the guild sets a color.
fn panel_embed(config: &GuildConfig, view: &impl GuildView) -> EmbedBuilder {
    let mut embed = EmbedBuilder::new();

    if let Some(color) = config.color {
        embed = embed.color(color);
    }

    let (public, private) = self::panel_lines(&config.autoroles, view);
    let public = self::panel_fields("Open Roles:", &public);
    let private = self::panel_fields("Member/Invite Roles:", &private);

    for field in public.into_iter().chain(private) {
        embed = embed.field(field);
    }

    embed
}

/// Packs lines into inline fields whose values stay within [`FIELD_LEN`] characters.
///
/// Fields after the first are marked as continued.
fn panel_fields(name: &str, lines: &[String]) -> Vec<EmbedField> {
    let mut values = Vec::new();
    let mut value = String::new();

    for line in lines {
        if !value.is_empty() && value.chars().count() + line.chars().count() + 1 > FIELD_LEN {
            values.push(std::mem::take(&mut value));
        }
        if !value.is_empty() {
            value.push('\n');
        }

        value.push_str(line);
    }

    if !value.is_empty() {
        values.push(value);
    }

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let name = if index == 0 { name.to_string() } else { format!("{name} (cont.)") };

            EmbedFieldBuilder::new(name, value).inline().build()
        })
        .collect()
}

/// Returns the panel's public and private lines, each sorted by role name.
fn panel_lines(entries: &[AutoroleEntry], view: &impl GuildView) -> (Vec<String>, Vec<String>) {
    let mut resolved: Vec<_> =
        entries.iter().filter_map(|entry| view.role(entry.role_id).map(|role| (role.name, entry))).collect();

    resolved.sort_by(|(a, _), (b, _)| a.cmp(b));

    let (private, public): (Vec<_>, Vec<_>) = resolved.into_iter().partition(|(_, entry)| entry.private);
    let line = |(_, entry): (Box<str>, &AutoroleEntry)| format!("{} <@&{}>", entry.emoji, entry.role_id);

    (public.into_iter().map(line).collect(), private.into_iter().map(line).collect())
}

/// Describes the outcome of registering an autorole.
///
/// # Errors
///
/// This function will return an error if the guild was unknown.
fn describe_add(result: Result<AddOutcome, AddError>, role_id: Id<RoleMarker>, private: bool) -> Result<String> {
    Ok(match result {
        Ok(AddOutcome::Added) if private => format!("Added <@&{role_id}> to autoroles as private"),
        Ok(AddOutcome::Added) => format!("Added <@&{role_id}> to autoroles"),
        Ok(AddOutcome::AddedUnreachable) => format!(
            "Added <@&{role_id}> to autoroles as private, however no member_role is set, so nobody can see it yet. Set one with `/admin set`"
        ),
        Ok(AddOutcome::AlreadyPresent) => format!("Nothing changed as <@&{role_id}> is already in autoroles"),
        Err(AddError::TooManyEntries) => {
            format!("Failed to add <@&{role_id}>. There cannot be more than 25 autoroles, remove another one first")
        }
        Err(AddError::NotAssignable) => format!("Failed to add <@&{role_id}>. This role cannot be assigned"),
        Err(AddError::RoleTooHigh) => {
            format!("Failed to add <@&{role_id}>. This role is not below the bot's highest role")
        }
        Err(error @ AddError::NotFound(_)) => return Err(error.into()),
    })
}

/// Describes the outcome of setting the member role.
///
/// # Errors
///
/// This function will return an error if the guild was unknown.
fn describe_member_role(result: Result<SetOutcome, SetError>, role_id: Id<RoleMarker>) -> Result<String> {
    Ok(match result {
        Ok(SetOutcome::Updated) => format!("Set member_role to <@&{role_id}> ✔️"),
        Ok(SetOutcome::Unchanged) => format!("The member_role was already set to <@&{role_id}> ❓"),
        Err(SetError::InvalidGate | SetError::InvalidFormat) => {
            format!("Cannot set member_role to <@&{role_id}> ❌")
        }
        Err(error @ SetError::NotFound(_)) => return Err(error.into()),
    })
}

/// Describes the outcome of setting the panel color.
///
/// # Errors
///
/// This function will return an error if the guild was unknown.
fn describe_color(result: Result<SetOutcome, SetError>, color: &str) -> Result<String> {
    let color = color.to_ascii_uppercase();

    Ok(match result {
        Ok(SetOutcome::Updated) => format!("Set color to #{color} ✔️"),
        Ok(SetOutcome::Unchanged) => format!("The color was already set to #{color} ❓"),
        Err(SetError::InvalidFormat | SetError::InvalidGate) => format!("#{color} is not a valid color code ❌"),
        Err(error @ SetError::NotFound(_)) => return Err(error.into()),
    })
}

/// Describes a guild's configuration, truncated to fit within an embed.
fn describe_config(config: &GuildConfig) -> String {
    let member_role = config.member_role.map_or_else(|| "None".to_string(), |id| format!("<@&{id}>"));
    let color = config.color.map_or_else(|| "None".to_string(), |color| format!("#{color:06X}"));
    let mut text = format!("**member_role:** {member_role}\n**color:** {color}\n\n**autoroles:**");

    if config.autoroles.is_empty() {
        text.push_str("\nNone");
    }

    for entry in &config.autoroles {
        text.push('\n');
        text.push_str(&entry.to_string());
    }

    if text.chars().count() > DESCRIPTION_LEN {
        text = text.chars().take(DESCRIPTION_LEN - 1).collect();
        text.push('…');
    }

    text
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use twilight_model::id::marker::EmojiMarker;

    use super::*;
    use crate::store::model::RoleInfo;
    use crate::store::{Activation, NotFoundError};

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

    #[test]
    fn panel_splits_public_and_private_roles() {
        let view = Roles(HashMap::from([(Id::new(10), "Zebra"), (Id::new(11), "Apple"), (Id::new(12), "Mango")]));
        let custom = EmojiRef::Custom { id: Id::new(5), name: "wave".into(), animated: false };
        let entries = [
            AutoroleEntry::new(Id::new(10), EmojiRef::Unicode("🦓".into()), "", false),
            AutoroleEntry::new(Id::new(11), custom, "", false),
            AutoroleEntry::new(Id::new(12), EmojiRef::Unicode("🥭".into()), "", true),
            AutoroleEntry::new(Id::new(13), EmojiRef::Unicode("👻".into()), "", false),
        ];
        let (public, private) = panel_lines(&entries, &view);

        assert_eq!(public, ["<:wave:5> <@&11>", "🦓 <@&10>"]);
        assert_eq!(private, ["🥭 <@&12>"]);
    }

    #[test]
    fn panel_fields_fit_within_embed_limits() {
        let ids = (1 ..= 25).map(|n| Id::new(1_000_000_000_000_000_000 + n));
        let view = Roles(ids.clone().map(|id| (id, "Role")).collect());
        let emoji = EmojiRef::Custom { id: Id::new(1_100_000_000_000_000_000), name: "a".repeat(32).into(), animated: true };
        let autoroles = ids.map(|id| AutoroleEntry::new(id, emoji.clone(), "", false)).collect();
        let config = GuildConfig { member_role: None, color: None, autoroles };

        let embed = panel_embed(&config, &view).validate().unwrap().build();
        let names: Vec<_> = embed.fields.iter().map(|field| field.name.as_str()).collect();

        assert_eq!(names, ["Open Roles:", "Open Roles: (cont.)", "Open Roles: (cont.)"]);
        assert!(embed.fields.iter().all(|field| field.inline && field.value.chars().count() <= FIELD_LEN));
        assert_eq!(embed.fields.iter().flat_map(|field| field.value.lines()).count(), 25);
    }

    #[test]
    fn panel_is_colored_only_when_set() {
        let view = Roles(HashMap::from([(Id::new(10), "Games")]));
        let mut config = GuildConfig {
            member_role: None,
            color: None,
            autoroles: vec![AutoroleEntry::new(Id::new(10), EmojiRef::Unicode("🎮".into()), "", true)],
        };

        let embed = panel_embed(&config, &view).build();

        assert_eq!(embed.color, None);
        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.fields[0].name, "Member/Invite Roles:");
        assert_eq!(embed.fields[0].value, "🎮 <@&10>");

        config.color = Some(0x00_AB_CD);

        assert_eq!(panel_embed(&config, &view).build().color, Some(0x00_AB_CD));
    }

    #[test]
    fn registered_roles_are_reported_before_the_emoji() {
        let view = Roles(HashMap::from([(Id::new(10), "Games"), (Id::new(11), "Music")]));
        let guild_id = view.guild_id();
        let ceiling = Some(RoleRank::new(100, Id::new(9_999)));
        let store = GuildConfigStore::new();

        assert_eq!(store.activate(&view), Activation::Created);

        let request = |emoji, role_id| AddRequest { emoji, role_id: Id::new(role_id), description: "", private: false };

        assert_eq!(register(&store, guild_id, &view, ceiling, &request("🎮", 10)).unwrap(), (true, "Added <@&10> to autoroles".into()));
        assert_eq!(
            register(&store, guild_id, &view, ceiling, &request("é", 10)).unwrap(),
            (false, "Nothing changed as <@&10> is already in autoroles".into())
        );
        assert_eq!(register(&store, guild_id, &view, ceiling, &request("é", 11)).unwrap(), (false, "Invalid emoji".into()));
        assert_eq!(register(&store, guild_id, &view, ceiling, &request("<:gone:5>", 11)).unwrap().1, "Invalid emoji");
        assert!(register(&store, guild_id, &view, None, &request("🎵", 11)).is_err());
        assert!(register(&store, guild_id, &view, ceiling, &request("🎵", 12)).is_err());
        assert_eq!(store.get(guild_id).unwrap().autoroles.len(), 1);
    }

    #[test]
    fn add_outcomes_are_described() {
        let role = Id::new(10);

        assert_eq!(describe_add(Ok(AddOutcome::Added), role, false).unwrap(), "Added <@&10> to autoroles");
        assert_eq!(describe_add(Ok(AddOutcome::Added), role, true).unwrap(), "Added <@&10> to autoroles as private");
        assert!(describe_add(Ok(AddOutcome::AddedUnreachable), role, true).unwrap().contains("/admin set"));
        assert!(describe_add(Err(AddError::TooManyEntries), role, false).unwrap().contains("25"));
        assert!(describe_add(Err(NotFoundError(Id::new(1)).into()), role, false).is_err());
    }

    #[test]
    fn set_outcomes_are_described() {
        assert_eq!(describe_color(Ok(SetOutcome::Updated), "ff00aa").unwrap(), "Set color to #FF00AA ✔️");
        assert_eq!(describe_color(Err(SetError::InvalidFormat), "red").unwrap(), "#RED is not a valid color code ❌");
        assert_eq!(
            describe_member_role(Ok(SetOutcome::Unchanged), Id::new(3)).unwrap(),
            "The member_role was already set to <@&3> ❓"
        );
        assert_eq!(describe_member_role(Err(SetError::InvalidGate), Id::new(1)).unwrap(), "Cannot set member_role to <@&1> ❌");
    }

    #[test]
    fn config_description() {
        let mut config = GuildConfig { member_role: Some(Id::new(4)), color: Some(0x00_AB_CD), autoroles: vec![] };

        assert_eq!(describe_config(&config), "**member_role:** <@&4>\n**color:** #00ABCD\n\n**autoroles:**\nNone");

        config.autoroles.push(AutoroleEntry::new(Id::new(9), EmojiRef::Unicode("🎮".into()), "Games", false));

        assert!(describe_config(&config).ends_with("role=<@&9>, emoji=🎮, private=**false**, description=\"Games\""));

        let emoji = EmojiRef::Custom { id: Id::new(1_100_000_000_000_000_000), name: "a".repeat(32).into(), animated: true };
        let entry = |n: u64| AutoroleEntry::new(Id::new(1_000_000_000_000_000_000 + n), emoji.clone(), "x".repeat(100), true);

        config.autoroles = (1 ..= 25).map(entry).collect();

        assert_eq!(describe_config(&config).chars().count(), DESCRIPTION_LEN);
    }
}
