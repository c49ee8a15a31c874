//! Provides procedural macro definitions for the autorole Discord bot.
#![deny(clippy::expect_used, unsafe_code, clippy::unwrap_used)]
#![warn(clippy::nursery, clippy::todo, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use proc_macro::TokenStream;

mod storage;

/// Derives the `autorole_storage::Stored` trait for the deriving type.
///
/// The `format` attribute names the storage format, and the `location` attribute provides a
/// format string followed by the types of its arguments. The key's extension is supplied by the
/// format.
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Storage)]
/// #[format(Json)]
/// #[location("{}/guilds/{}", Box<str>, u64)]
/// struct Data {
///     roles: Vec<u64>,
/// }
/// ```
#[inline]
#[proc_macro_derive(Storage, attributes(format, location))]
pub fn storage(input: TokenStream) -> TokenStream {
    crate::storage::procedure(input)
}
