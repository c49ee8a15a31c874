use std::fmt::Display;
use std::str::FromStr;

use anyhow::{anyhow, bail};

/// A component custom identifier formatted as `name:kind`.
///
/// The name selects the command that handles the component, and the kind selects the component
/// within that command.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct CustomId {
    /// The owning command's name.
    name: Box<str>,
    /// The component's kind.
    kind: Box<str>,
}

impl CustomId {
    /// The maximum number of allowed bytes within a stringified identifier.
    pub const MAX_LEN: usize = 100;

    /// Creates a new [`CustomId`].
    ///
    /// # Errors
    ///
    /// This function will return an error if either part is empty or contains a separator, or the
    /// identifier is too long.
    pub fn new(name: impl AsRef<str>, kind: impl AsRef<str>) -> anyhow::Result<Self> {
        let (name, kind) = (name.as_ref(), kind.as_ref());

        if name.is_empty() || kind.is_empty() {
            bail!("expected a non-empty name and kind");
        }
        if name.contains(':') || kind.contains(':') {
            bail!("identifier parts cannot contain ':'");
        }
        if name.len() + kind.len() + 1 > Self::MAX_LEN {
            bail!("max size exceeded (> {} bytes)", Self::MAX_LEN);
        }

        Ok(Self { name: name.into(), kind: kind.into() })
    }

    /// Returns the owning command's name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &str {
        &self.name
    }

    /// Returns the component's kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &str {
        &self.kind
    }
}

impl FromStr for CustomId {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (name, kind) = value.split_once(':').ok_or_else(|| anyhow!("missing component kind in '{value}'"))?;

        Self::new(name, kind)
    }
}

impl From<CustomId> for String {
    fn from(value: CustomId) -> Self {
        value.to_string()
    }
}

impl Display for CustomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let id = "roles:select".parse::<CustomId>().unwrap();

        assert_eq!(id.name(), "roles");
        assert_eq!(id.kind(), "select");
        assert_eq!(id.to_string(), "roles:select");
        assert_eq!(id, CustomId::new("roles", "select").unwrap());
    }

    #[test]
    fn reject_invalid() {
        assert!("roles".parse::<CustomId>().is_err());
        assert!(":open".parse::<CustomId>().is_err());
        assert!("roles:".parse::<CustomId>().is_err());
        assert!("roles:open:extra".parse::<CustomId>().is_err());
        assert!(CustomId::new("roles", "x".repeat(CustomId::MAX_LEN)).is_err());
    }
}
