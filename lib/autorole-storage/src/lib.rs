//! Provides a file-based data storage interface for the autorole Discord bot.
#![deny(clippy::expect_used, unsafe_code, clippy::unwrap_used)]
#![warn(clippy::nursery, clippy::todo, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use std::fmt::{Debug, Display};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[cfg(feature = "json")] pub use crate::formats::*;
#[cfg(feature = "json")] mod formats;

/// A possible storage error.
#[derive(Debug, thiserror::Error)]
pub enum Error<F: Format> {
    /// An IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A [`Format`] encoding error.
    #[error("{0}")]
    Encoding(F::EncodingError),
    /// A [`Format`] decoding error.
    #[error("{0}")]
    Decoding(F::DecodingError),
}

/// A data storage format.
///
/// Formats should be zero-sized, cheap to copy, and provide a [`Default`] implementation so that
/// keys may be built directly from a path.
pub trait Format: Debug {
    /// The type returned in the event of an error during encoding.
    type EncodingError: Debug + Display;
    /// The type returned in the event of an error during decoding.
    type DecodingError: Debug + Display;

    /// Returns the file extension for this [`Format`].
    fn extension(&self) -> String;

    /// Encodes a given value of type `T` into a byte array.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value could not be encoded.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, Self::EncodingError>;

    /// Decodes a given byte slice into a value of type `T`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the bytes could not be decoded.
    fn decode<T: for<'de> Deserialize<'de>>(&self, bytes: &[u8]) -> Result<T, Self::DecodingError>;
}

/// A typed reference to a file within the file system.
///
/// The key's path always carries its format's extension.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Key<T, F>
where
    T: Serialize + for<'de> Deserialize<'de>,
    F: Format,
{
    /// The value's file path.
    path: Box<Path>,
    /// The value's format.
    format: F,
    /// Type marker.
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> Key<T, F>
where
    T: Serialize + for<'de> Deserialize<'de>,
    F: Format,
{
    /// Creates a new [`Key<T, F>`], replacing any extension of the path with the format's.
    pub fn new(path: impl AsRef<Path>, format: F) -> Self {
        let path = path.as_ref().with_extension(format.extension()).into_boxed_path();

        Self { path, format, _marker: PhantomData }
    }

    /// Creates a new [`Key<T, F>`] with a defaulted format.
    pub fn new_default(path: impl AsRef<Path>) -> Self
    where
        F: Default,
    {
        Self::new(path, F::default())
    }

    /// Returns the file path of this [`Key<T, F>`].
    pub const fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether this [`Key<T, F>`] exists within the file system.
    ///
    /// # Errors
    ///
    /// This function will return an error if the path could not be verified.
    pub fn exists(&self) -> Result<bool, Error<F>> {
        self.path.try_exists().map_err(Into::into)
    }

    /// Reads and decodes this [`Key<T, F>`]'s associated file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the data could not be read or decoded.
    pub fn read(&self) -> Result<T, Error<F>> {
        let bytes = std::fs::read(&self.path)?;

        self.format.decode(&bytes).map_err(Error::Decoding)
    }

    /// Reads and decodes this [`Key<T, F>`]'s associated file, returning [`None`] if it does not
    /// exist.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file exists but could not be read or decoded.
    pub fn read_if_exists(&self) -> Result<Option<T>, Error<F>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => self.format.decode(&bytes).map(Some).map_err(Error::Decoding),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Encodes and writes the given value into this [`Key<T, F>`]'s associated file, creating any
    /// missing parent directories.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value could not be encoded or written.
    pub fn write(&self, value: &T) -> Result<(), Error<F>> {
        let bytes = self.format.encode(value).map_err(Error::Encoding)?;

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        std::fs::write(&self.path, bytes).map_err(Into::into)
    }

    /// Removes the file associated with this [`Key<T, F>`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the file could not be removed.
    pub fn remove(&self) -> Result<(), Error<F>> {
        std::fs::remove_file(&self.path).map_err(Into::into)
    }
}

impl<T, F, S> From<S> for Key<T, F>
where
    T: Serialize + for<'de> Deserialize<'de>,
    F: Format + Default,
    S: AsRef<Path>,
{
    fn from(value: S) -> Self {
        Self::new_default(value)
    }
}

/// Provides a data storage key builder for the implementing type.
///
/// This is usually derived through `autorole_macros::Storage`.
pub trait Stored: Serialize + for<'de> Deserialize<'de> {
    /// The arguments provided when creating a new [`Key<T, F>`].
    type Arguments;
    /// The expected [`Format`] of this type.
    type Format: Format;

    /// Creates a new [`Key<T, F>`] with the provided arguments.
    fn stored(arguments: Self::Arguments) -> Key<Self, Self::Format>;
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use std::path::PathBuf;

    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        count: u32,
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("autorole-storage-{}", std::process::id())).join(name)
    }

    #[test]
    fn key_uses_format_extension() {
        let key = Key::<Counter, Json>::from("data/counter");
        assert_eq!(key.path(), Path::new("data/counter.json"));

        let key = Key::<Counter, Json>::from("data/counter.txt");
        assert_eq!(key.path(), Path::new("data/counter.json"));
    }

    #[test]
    fn write_then_read() {
        let key = Key::<Counter, Json>::from(scratch("write_then_read"));
        let value = Counter { name: "roles".to_string(), count: 3 };

        key.write(&value).unwrap();
        assert!(key.exists().unwrap());
        assert_eq!(key.read().unwrap(), value);

        key.remove().unwrap();
        assert!(!key.exists().unwrap());
    }

    #[test]
    fn missing_file_reads_as_none() {
        let key = Key::<Counter, Json>::from(scratch("missing"));

        assert!(key.read_if_exists().unwrap().is_none());
        assert!(matches!(key.read(), Err(Error::Io(_))));
    }

    #[test]
    fn corrupt_file_is_a_decoding_error() {
        let key = Key::<Counter, Json>::from(scratch("corrupt"));

        std::fs::create_dir_all(key.path().parent().unwrap()).unwrap();
        std::fs::write(key.path(), b"{ not json").unwrap();

        assert!(matches!(key.read_if_exists(), Err(Error::Decoding(_))));

        key.remove().unwrap();
    }
}
