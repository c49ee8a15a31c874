use anyhow::anyhow;
use twilight_model::id::marker::GuildMarker;
use twilight_model::id::Id;

use super::Result;

/// Returns the bot's client token.
///
/// This can be configured using the `CLIENT_TOKEN` environment variable.
///
/// # Errors
///
/// This function will return an error if the variable was not set.
#[inline]
pub fn token() -> Result<Box<str>> {
    std::env::var("CLIENT_TOKEN").map(String::into_boxed_str).map_err(|_| anyhow!("the 'CLIENT_TOKEN' variable must be set"))
}

/// Returns the identifier of the guild that the bot's commands are registered within.
///
/// This can be configured using the `GUILD_ID` environment variable.
///
/// # Errors
///
/// This function will return an error if the variable was not set or is equal to zero.
#[inline]
pub fn guild_id() -> Result<Id<GuildMarker>> { self::generic_id("GUILD_ID") }

/// Returns a generic identifier from the environment.
///
/// # Errors
///
/// This function will return an error if the variable was not set or is equal to zero.
fn generic_id<T>(key: &str) -> Result<Id<T>> {
    let Ok(var) = std::env::var(key) else {
        return Err(anyhow!("the '{key}' variable must be set"));
    };

    Id::new_checked(var.trim().parse()?).ok_or_else(|| anyhow!("expected a non-zero identifier for '{key}'"))
}
