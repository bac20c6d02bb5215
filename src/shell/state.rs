//! View state owned by the window shell

use crate::locale::LANGUAGES;
use crate::vdd::Display;

/// Which content the window shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// Display list with the action buttons
    #[default]
    List,
    /// Embedded custom-resolution page
    Custom,
}

/// Result of a close request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The custom view was dismissed; the window stays visible
    ReturnedToList,
    /// The window was hidden to the tray
    HiddenToTray,
}

/// Result of an exit request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Resources released and the host asked to quit
    Exited,
    /// The user declined the confirmation prompt
    Cancelled,
}

/// Result of an add-display request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The driver accepted the request; a notification will follow
    Requested,
    /// The display limit was reached and the user was warned
    LimitReached,
    /// The driver rejected the request and the user was warned
    Failed,
    /// An earlier request has not been answered yet; nothing was sent
    Pending,
}

/// Who started an update check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    /// Automatic check when the window first loads
    Startup,
    /// "Check for update" menu item
    Menu,
}

/// Embedded custom-resolution page
///
/// Created fresh each time the custom view opens and dropped when it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomView {
    /// Localized page title
    pub title: String,
    /// Localized hint text
    pub hint: String,
}

/// One language menu item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageEntry {
    /// Language display name
    pub name: &'static str,
    /// Whether this is the active language
    pub checked: bool,
}

/// Language selection menu; once built, exactly one entry is checked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageMenu {
    entries: Vec<LanguageEntry>,
}

impl LanguageMenu {
    /// Build the menu over [`LANGUAGES`], checking `active`
    ///
    /// An unsupported `active` checks the first entry.
    pub fn build(active: &str) -> Self {
        let index = LANGUAGES.iter().position(|l| *l == active).unwrap_or(0);
        let entries = LANGUAGES
            .iter()
            .enumerate()
            .map(|(i, name)| LanguageEntry {
                name,
                checked: i == index,
            })
            .collect();
        Self { entries }
    }

    /// Check `name` and uncheck every other entry; false if `name` is not in the menu
    pub fn select(&mut self, name: &str) -> bool {
        if !self.entries.iter().any(|e| e.name == name) {
            return false;
        }
        for entry in &mut self.entries {
            entry.checked = entry.name == name;
        }
        true
    }

    /// Name of the checked entry
    pub fn checked(&self) -> Option<&'static str> {
        self.entries.iter().find(|e| e.checked).map(|e| e.name)
    }

    /// Number of checked entries
    pub fn checked_count(&self) -> usize {
        self.entries.iter().filter(|e| e.checked).count()
    }

    /// Entries in menu order
    pub fn entries(&self) -> &[LanguageEntry] {
        &self.entries
    }

    /// True before the menu is built
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the window renders, owned by one `Shell`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    /// Current content
    pub view: ViewMode,
    /// Present while `view` is `Custom`
    pub custom: Option<CustomView>,
    /// Rendered display items, rebuilt on every notification
    pub displays: Vec<Display>,
    /// "No display" placeholder visibility
    pub placeholder_visible: bool,
    /// A mutation request is outstanding; the add control is disabled
    pub pending_refresh: bool,
    /// Language selection menu
    pub languages: LanguageMenu,
    /// An update check is running
    pub update_in_flight: bool,
    /// Enablement of the "Check for update" menu item
    pub update_menu_enabled: bool,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            view: ViewMode::List,
            custom: None,
            displays: Vec::new(),
            placeholder_visible: false,
            pending_refresh: false,
            languages: LanguageMenu::default(),
            update_in_flight: false,
            update_menu_enabled: true,
        }
    }
}

impl ShellState {
    /// Whether the add control accepts input
    pub fn add_enabled(&self) -> bool {
        !self.pending_refresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_state() {
        let state = ShellState::default();
        assert_eq!(state.view, ViewMode::List);
        assert!(state.displays.is_empty());
        assert!(!state.placeholder_visible);
        assert!(state.add_enabled());
        assert!(state.update_menu_enabled);
        assert!(state.languages.is_empty());
    }

    #[test]
    fn test_build_checks_configured_language() {
        let menu = LanguageMenu::build("Tiếng Việt");
        assert_eq!(menu.entries().len(), LANGUAGES.len());
        assert_eq!(menu.checked(), Some("Tiếng Việt"));
        assert_eq!(menu.checked_count(), 1);
    }

    #[test]
    fn test_build_with_unknown_language_checks_first() {
        let menu = LanguageMenu::build("Klingon");
        assert_eq!(menu.checked(), Some(LANGUAGES[0]));
        assert_eq!(menu.checked_count(), 1);
    }

    #[test]
    fn test_select_unknown_keeps_selection() {
        let mut menu = LanguageMenu::build("简体中文");
        assert!(!menu.select("Deutsch"));
        assert_eq!(menu.checked(), Some("简体中文"));
    }

    proptest! {
        #[test]
        fn prop_exactly_one_language_checked(
            initial in prop::sample::select(vec!["English", "Tiếng Việt", "简体中文", "bogus"]),
            picks in prop::collection::vec(
                prop::sample::select(vec!["English", "Tiếng Việt", "简体中文", "", "fr"]),
                0..20,
            ),
        ) {
            let mut menu = LanguageMenu::build(initial);
            prop_assert_eq!(menu.checked_count(), 1);
            for pick in picks {
                let accepted = menu.select(pick);
                prop_assert_eq!(menu.checked_count(), 1);
                if accepted {
                    prop_assert_eq!(menu.checked(), Some(pick));
                }
            }
        }
    }
}
