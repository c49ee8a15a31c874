use twilight_model::channel::message::component::{
    ActionRow, Button, ButtonStyle, SelectMenu, SelectMenuOption,
};
use twilight_model::channel::message::{Component, ReactionType};

/// The maximum number of components within a single action row.
pub const ROW_WIDTH: usize = 5;
/// The maximum number of options within a select menu.
pub const MENU_OPTIONS: usize = 25;

/// Create an action row with a builder.
#[must_use = "must be built into an action row"]
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRowBuilder(ActionRow);

impl ActionRowBuilder {
    /// Creates a new action row builder, keeping at most five components.
    pub fn new(components: impl IntoIterator<Item = impl Into<Component>>) -> Self {
        let components = components.into_iter().take(ROW_WIDTH).map(Into::into).collect();

        Self(ActionRow { components })
    }

    /// Build into an action row.
    #[inline]
    #[must_use = "should be used as part of a component"]
    pub fn build(self) -> ActionRow {
        self.0
    }
}

impl From<ActionRowBuilder> for Component {
    #[inline]
    fn from(value: ActionRowBuilder) -> Self {
        Self::ActionRow(value.build())
    }
}

/// Create a button with a builder.
#[must_use = "must be built into a button"]
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonBuilder(Button);

impl ButtonBuilder {
    /// Creates a new button builder.
    #[inline]
    pub fn new(style: ButtonStyle) -> Self {
        Self(Button { custom_id: None, disabled: false, emoji: None, label: None, style, url: None })
    }

    /// Add a custom identifier.
    pub fn custom_id(mut self, custom_id: impl Into<String>) -> Self {
        self.0.custom_id = Some(custom_id.into());

        self
    }

    /// Add a label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.0.label = Some(label.into());

        self
    }

    /// Build into a button.
    #[inline]
    #[must_use = "should be used as part of a component"]
    pub fn build(self) -> Button {
        self.0
    }
}

impl From<ButtonBuilder> for Component {
    #[inline]
    fn from(value: ButtonBuilder) -> Self {
        Self::Button(value.build())
    }
}

/// Create a select menu with a builder.
///
/// The menu's value bounds are derived from its options when built unless set explicitly.
#[must_use = "must be built into a select menu"]
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectMenuBuilder(SelectMenu);

impl SelectMenuBuilder {
    /// Creates a new select menu builder.
    #[inline]
    pub fn new(custom_id: impl Into<String>) -> Self {
        Self(SelectMenu {
            custom_id: custom_id.into(),
            disabled: false,
            max_values: None,
            min_values: None,
            options: vec![],
            placeholder: None,
        })
    }

    /// Add maximum values.
    pub const fn max_values(mut self, max_values: u8) -> Self {
        self.0.max_values = Some(max_values);

        self
    }

    /// Add minimum values.
    pub const fn min_values(mut self, min_values: u8) -> Self {
        self.0.min_values = Some(min_values);

        self
    }

    /// Add options, keeping at most twenty-five in total.
    pub fn options(mut self, options: impl IntoIterator<Item = impl Into<SelectMenuOption>>) -> Self {
        let remaining = MENU_OPTIONS.saturating_sub(self.0.options.len());

        self.0.options.extend(options.into_iter().take(remaining).map(Into::into));

        self
    }

    /// Add a placeholder.
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.0.placeholder = Some(placeholder.into());

        self
    }

    /// Build into a select menu.
    #[inline]
    #[must_use = "should be used as part of a component"]
    pub fn build(self) -> SelectMenu {
        self.0
    }
}

impl From<SelectMenuBuilder> for Component {
    #[inline]
    fn from(value: SelectMenuBuilder) -> Self {
        Self::SelectMenu(value.build())
    }
}

/// Create a select menu option with a builder.
#[must_use = "must be built into a select menu option"]
#[repr(transparent)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectMenuOptionBuilder(SelectMenuOption);

impl SelectMenuOptionBuilder {
    /// Creates a new select menu option builder.
    #[inline]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self(SelectMenuOption { default: false, description: None, emoji: None, label: label.into(), value: value.into() })
    }

    /// Sets whether the option is selected by default.
    pub const fn default(mut self, default: bool) -> Self {
        self.0.default = default;

        self
    }

    /// Add a description, skipping empty descriptions.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();

        self.0.description = (!description.is_empty()).then_some(description);

        self
    }

    /// Add an emoji.
    pub fn emoji(mut self, emoji: impl Into<ReactionType>) -> Self {
        self.0.emoji = Some(emoji.into());

        self
    }

    /// Build into a select menu option.
    #[inline]
    #[must_use = "should be used as part of a select menu"]
    pub fn build(self) -> SelectMenuOption {
        self.0
    }
}

impl From<SelectMenuOptionBuilder> for SelectMenuOption {
    #[inline]
    fn from(value: SelectMenuOptionBuilder) -> Self {
        value.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_keeps_at_most_twenty_five_options() {
        let options = (0 .. 30).map(|n| SelectMenuOptionBuilder::new(n.to_string(), n.to_string()));
        let menu = SelectMenuBuilder::new("menu").options(options).build();

        assert_eq!(menu.options.len(), MENU_OPTIONS);
        assert_eq!(menu.options[24].value, "24");
    }

    #[test]
    fn empty_description_is_omitted() {
        let option = SelectMenuOptionBuilder::new("a", "1").description("").build();
        assert_eq!(option.description, None);

        let option = SelectMenuOptionBuilder::new("a", "1").description("text").default(true).build();
        assert_eq!(option.description.as_deref(), Some("text"));
        assert!(option.default);
    }
}
