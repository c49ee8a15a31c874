use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use anyhow::bail;
use autorole_logger::warn;
use twilight_model::application::command::Command;
use twilight_model::application::interaction::application_command::{
    CommandData, CommandDataOption, CommandOptionValue,
};
use twilight_model::id::marker::{GuildMarker, RoleMarker};
use twilight_model::id::Id;

use crate::bot::interaction::{CommandCtx, ComponentCtx};
use crate::util::{CustomId, Result};

/// The server administration command.
pub mod admin;
/// The role selection command and its components.
pub mod roles;

/// The bot's command registry.
static REGISTRY: OnceLock<CommandRegistry> = OnceLock::new();

/// Initializes the command registry.
macro_rules! init_registry {
    ($($init:expr),* $(,)?) => {
        /// Returns a reference to the bot's command registry.
        pub fn registry() -> &'static CommandRegistry {
            REGISTRY.get_or_init(|| {
                let mut registry = CommandRegistry::new();

                $({
                    let entry = $init();

                    if !registry.register(entry) {
                        ::autorole_logger::warn!("the '{}' command has already been registered", entry.name).ok();
                    }
                })*

                registry
            })
        }
    };
}

init_registry![self::admin::entry, self::roles::entry];

/// A builder function.
pub type BuildFn = fn(&CommandEntry, Id<GuildMarker>) -> Result<Command>;

/// Maintains a list of registered commands and their associated interaction handlers.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    /// The inner map of commands, keyed by name.
    inner: BTreeMap<&'static str, CommandEntry>,
}

impl CommandRegistry {
    /// Creates a new [`CommandRegistry`].
    #[must_use]
    pub const fn new() -> Self {
        Self { inner: BTreeMap::new() }
    }

    /// Returns the command entry with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.inner.get(name)
    }

    /// Returns an iterator over this [`CommandRegistry`].
    pub fn iter(&self) -> impl Iterator<Item = &CommandEntry> {
        self.inner.values()
    }

    /// Builds all registered commands for the given guild, skipping any that fail to build.
    #[must_use]
    pub fn build_all(&self, guild_id: Id<GuildMarker>) -> Box<[Command]> {
        let commands = self.iter().filter_map(|e| match e.build(guild_id) {
            Ok(command) => Some(command),
            Err(error) => {
                warn!("the '{}' command failed to build - {error}", e.name).ok();
                None
            }
        });

        commands.collect()
    }

    /// Registers the given command entry, returning whether it was successfully registered.
    pub fn register(&mut self, entry: CommandEntry) -> bool {
        if self.inner.contains_key(entry.name) {
            return false;
        }

        self.inner.insert(entry.name, entry).is_none()
    }
}

/// An entry within the command registry.
#[derive(Clone, Copy, Debug)]
pub struct CommandEntry {
    /// The command's name.
    pub name: &'static str,
    /// Constructs a Discord command from the entry.
    builder: BuildFn,
    /// A list of getters for the command's interaction event handlers.
    handlers: CommandEntryHandlers,
}

impl CommandEntry {
    /// Creates a new [`CommandEntry`].
    pub const fn new(name: &'static str, builder: BuildFn, handlers: CommandEntryHandlers) -> Self {
        Self { name, builder, handlers }
    }

    /// Returns a constructed Discord command from this [`CommandEntry`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the command could not be constructed.
    #[inline]
    pub fn build(&self, guild_id: Id<GuildMarker>) -> Result<Command> {
        (self.builder)(self, guild_id)
    }

    /// Returns the command handler of this [`CommandEntry`].
    #[must_use]
    pub fn command(&self) -> Option<Box<dyn OnCommand + Send + Sync>> {
        self.handlers.command.map(|f| f(self))
    }

    /// Returns the component handler of this [`CommandEntry`].
    #[must_use]
    pub fn component(&self) -> Option<Box<dyn OnComponent + Send + Sync>> {
        self.handlers.component.map(|f| f(self))
    }
}

/// Maintains a list of getters for a command's interaction event handlers.
#[allow(clippy::type_complexity)]
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandEntryHandlers {
    /// Returns a command interaction event handler.
    pub command: Option<fn(&CommandEntry) -> Box<dyn OnCommand + Send + Sync>>,
    /// Returns a component interaction event handler.
    pub component: Option<fn(&CommandEntry) -> Box<dyn OnComponent + Send + Sync>>,
}

impl CommandEntryHandlers {
    /// Creates a new [`CommandEntryHandlers`].
    #[must_use]
    pub const fn new() -> Self {
        Self { command: None, component: None }
    }
}

/// Handles a command interaction event.
#[async_trait::async_trait]
pub trait OnCommand {
    /// Returns a reference to the source command entry.
    fn entry(&self) -> &CommandEntry;

    /// Responds to a command interaction event.
    ///
    /// # Errors
    ///
    /// This function will return an error if event handling failed.
    async fn execute<'api: 'evt, 'evt>(&self, ctx: CommandCtx<'api, 'evt>) -> Result;
}

/// Handles a component interaction event.
#[async_trait::async_trait]
pub trait OnComponent {
    /// Returns a reference to the source command entry.
    fn entry(&self) -> &CommandEntry;

    /// Responds to a component interaction event.
    ///
    /// # Errors
    ///
    /// This function will return an error if event handling failed.
    async fn execute<'api: 'evt, 'evt>(&self, ctx: ComponentCtx<'api, 'evt>, id: CustomId) -> Result;
}

/// Creates a command registry entry.
///
/// ```ignore
/// register_command! {
///     ChatInput("test") {
///         let description = "A test command";
///         let in_dms = false;
///         let require = MANAGE_ROLES;
///         let options = [
///             SubCommand("run") {
///                 let description = "Runs the test";
///                 let options = [
///                     String("name") {
///                         let description = "The test's name";
///                         let required = true;
///                         let maximum = 100;
///                     },
///                 ];
///             },
///         ];
///         let handlers = {
///             command = self::on_command;
///             component = self::on_component;
///         };
///     }
/// }
/// ```
#[macro_export]
macro_rules! register_command {
    {
        $kind:ident($name:literal) {
            let description = $description:literal;
            $(let in_dms = $dms:literal;)?
            $(let require = $($permission:ident)|+;)?
            $(let options = [$($option_kind:ident($option_name:literal) {$($args:tt)*}),* $(,)?];)?
            $(let handlers = {
                $(command = $command:expr;)?
                $(component = $component:expr;)?
            };)?
        }
    } => {
        /// Returns this command's entry.
        pub fn entry() -> $crate::cmd::CommandEntry {
            fn build(
                entry: &$crate::cmd::CommandEntry,
                guild_id: ::twilight_model::id::Id<::twilight_model::id::marker::GuildMarker>,
            ) -> $crate::util::Result<::twilight_model::application::command::Command> {
                let builder = ::twilight_util::builder::command::CommandBuilder::new(
                        entry.name,
                        $description,
                        ::twilight_model::application::command::CommandType::$kind,
                    )
                    .guild_id(guild_id)
                    $(.default_member_permissions(::twilight_model::guild::Permissions::empty()$(.union(::twilight_model::guild::Permissions::$permission))+))?
                    $(.dm_permission($dms))?
                    $($(.option($crate::register_command!(@option $option_kind($option_name) { $($args)* })))*)?;

                ::std::result::Result::Ok(builder.validate()?.build())
            }

            #[allow(unused_mut)]
            let mut handlers = $crate::cmd::CommandEntryHandlers::new();

            $(
                $(handlers.command = {
                    struct Struct($crate::cmd::CommandEntry);

                    #[::async_trait::async_trait]
                    impl $crate::cmd::OnCommand for Struct {
                        fn entry(&self) -> &$crate::cmd::CommandEntry { &self.0 }

                        #[inline]
                        async fn execute<'api: 'evt, 'evt>(&self, ctx: $crate::bot::interaction::CommandCtx<'api, 'evt>) -> $crate::util::Result {
                            $command(self, ctx).await
                        }
                    }

                    Some(|e| ::std::boxed::Box::new(Struct(*e)))
                };)?
                $(handlers.component = {
                    struct Struct($crate::cmd::CommandEntry);

                    #[::async_trait::async_trait]
                    impl $crate::cmd::OnComponent for Struct {
                        fn entry(&self) -> &$crate::cmd::CommandEntry { &self.0 }

                        #[inline]
                        async fn execute<'api: 'evt, 'evt>(&self, ctx: $crate::bot::interaction::ComponentCtx<'api, 'evt>, id: $crate::util::CustomId) -> $crate::util::Result {
                            $component(self, ctx, id).await
                        }
                    }

                    Some(|e| ::std::boxed::Box::new(Struct(*e)))
                };)?
            )?

            $crate::cmd::CommandEntry::new($name, build, handlers)
        }
    };
    (@option Boolean($name:literal) {
        let description = $description:literal;
        $(let required = $required:literal;)?
    }) => {{
        ::twilight_util::builder::command::BooleanBuilder::new($name, $description)
            $(.required($required))?
    }};
    (@option Role($name:literal) {
        let description = $description:literal;
        $(let required = $required:literal;)?
    }) => {{
        ::twilight_util::builder::command::RoleBuilder::new($name, $description)
            $(.required($required))?
    }};
    (@option String($name:literal) {
        let description = $description:literal;
        $(let required = $required:literal;)?
        $(let minimum = $minimum:literal;)?
        $(let maximum = $maximum:literal;)?
    }) => {{
        ::twilight_util::builder::command::StringBuilder::new($name, $description)
            $(.required($required))?
            $(.min_length($minimum))?
            $(.max_length($maximum))?
    }};
    (@option SubCommand($name:literal) {
        let description = $description:literal;
        $(let options = [$($option_kind:ident($option_name:literal) {$($args:tt)*}),* $(,)?];)?
    }) => {{
        ::twilight_util::builder::command::SubCommandBuilder::new($name, $description)
            $($(.option($crate::register_command!(@option $option_kind($option_name) { $($args)* })))*)?
    }};
}

/// Resolves and tracks a command's provided options.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandOptionResolver<'evt> {
    /// The inner map of options and their values.
    options: HashMap<&'evt str, &'evt CommandOptionValue>,
}

impl<'evt> CommandOptionResolver<'evt> {
    /// Creates a new [`CommandOptionResolver`] with the given options.
    #[must_use]
    fn new_from(options: &'evt [CommandDataOption]) -> Self {
        Self { options: options.iter().map(|o| (&(*o.name), &o.value)).collect() }
    }

    /// Creates a new [`CommandOptionResolver`] with the given data.
    #[inline]
    #[must_use]
    pub fn new(data: &'evt CommandData) -> Self {
        Self::new_from(&data.options)
    }

    /// Returns a reference to a stored [`CommandOptionValue`] with the given name.
    ///
    /// # Errors
    ///
    /// This function will return an error if the requested option does not exist.
    fn get(&self, name: &str) -> Result<&'evt CommandOptionValue> {
        let Some(value) = self.options.get(name) else {
            bail!("missing value for option '{name}'");
        };

        Ok(*value)
    }

    /// Returns the name and options of the sub-command that was invoked.
    ///
    /// # Errors
    ///
    /// This function will return an error if no sub-command was invoked.
    pub fn subcommand(&self) -> Result<(&'evt str, Self)> {
        let Some((name, options)) = self.options.iter().find_map(|(name, value)| match *value {
            CommandOptionValue::SubCommand(ref options) => Some((*name, options)),
            _ => None,
        }) else {
            bail!("missing sub-command");
        };

        Ok((name, Self::new_from(options)))
    }
}

/// Generates getter methods for the [`CommandOptionResolver`] struct.
///
/// Each getter returns [`None`] when the option was not provided.
macro_rules! command_option_resolver_getter {
    ($(
        $(#[$attribute:meta])*
        fn $name:ident() -> $variant:ident as $return:ty;
    )*) => {
        impl<'evt> CommandOptionResolver<'evt> {$(
            $(#[$attribute])*
            pub fn $name(&self, name: &str) -> Result<Option<&'evt $return>> {
                let Ok(value) = self.get(name) else {
                    return Ok(None);
                };
                let CommandOptionValue::$variant(ref value) = *value else {
                    bail!("invalid type for option '{name}'");
                };
                let value: &'evt $return = value;

                Ok(Some(value))
            }
        )*}
    };
}

command_option_resolver_getter! {
    /// Returns a reference to a stored [`bool`] with the given name.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value associated with the given option name is an
    /// invalid type.
    fn get_bool() -> Boolean as bool;

    /// Returns a reference to a stored [`Id<RoleMarker>`] with the given name.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value associated with the given option name is an
    /// invalid type.
    fn get_role_id() -> Role as Id<RoleMarker>;

    /// Returns a reference to a stored [`str`] with the given name.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value associated with the given option name is an
    /// invalid type.
    fn get_str() -> String as str;
}

/// Returns the value of a required option.
///
/// # Errors
///
/// This function will return an error if the option was not provided.
pub fn required<'a, T: ?Sized>(name: &str, value: Option<&'a T>) -> Result<&'a T> {
    let Some(value) = value else {
        bail!("missing value for option '{name}'");
    };

    Ok(value)
}
