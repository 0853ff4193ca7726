use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuState {
    #[default]
    Closed,
    Open,
}

/// Keys the trigger button reacts to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKey {
    Enter,
    Space,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MenuEvent {
    TriggerClick,
    TriggerKey { key: TriggerKey },
    ItemActivated,
    OutsideClick,
    Escape,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusTarget {
    MenuFirstItem,
    MenuTrigger,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MenuTransition {
    pub state: MenuState,
    /// `None` when the event did not change the state.
    pub focus: Option<FocusTarget>,
}

impl MenuState {
    pub fn is_open(self) -> bool {
        self == MenuState::Open
    }

    pub fn apply(self, event: MenuEvent) -> MenuTransition {
        match (self, event) {
            (MenuState::Closed, MenuEvent::TriggerClick | MenuEvent::TriggerKey { .. }) => {
                MenuTransition {
                    state: MenuState::Open,
                    focus: Some(FocusTarget::MenuFirstItem),
                }
            }
            (MenuState::Open, _) => MenuTransition {
                state: MenuState::Closed,
                focus: Some(FocusTarget::MenuTrigger),
            },
            (MenuState::Closed, _) => MenuTransition {
                state: MenuState::Closed,
                focus: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_toggles_and_moves_focus() {
        let opened = MenuState::Closed.apply(MenuEvent::TriggerClick);
        assert_eq!(opened.state, MenuState::Open);
        assert_eq!(opened.focus, Some(FocusTarget::MenuFirstItem));
        let closed = opened.state.apply(MenuEvent::TriggerClick);
        assert_eq!(closed.state, MenuState::Closed);
        assert_eq!(closed.focus, Some(FocusTarget::MenuTrigger));
    }

    #[test]
    fn enter_and_space_open_like_a_click() {
        for key in [TriggerKey::Enter, TriggerKey::Space] {
            let t = MenuState::Closed.apply(MenuEvent::TriggerKey { key });
            assert!(t.state.is_open());
        }
    }

    #[test]
    fn every_dismissal_closes_an_open_menu() {
        for event in [
            MenuEvent::Escape,
            MenuEvent::OutsideClick,
            MenuEvent::ItemActivated,
        ] {
            let t = MenuState::Open.apply(event);
            assert_eq!(t.state, MenuState::Closed);
            assert_eq!(t.focus, Some(FocusTarget::MenuTrigger));
        }
    }

    #[test]
    fn dismissing_a_closed_menu_is_a_no_op() {
        for event in [
            MenuEvent::Escape,
            MenuEvent::OutsideClick,
            MenuEvent::ItemActivated,
        ] {
            let t = MenuState::Closed.apply(event);
            assert_eq!(
                t,
                MenuTransition {
                    state: MenuState::Closed,
                    focus: None
                }
            );
        }
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let event: MenuEvent =
            serde_json::from_str(r#"{"event":"trigger_key","key":"space"}"#).unwrap();
        assert_eq!(
            event,
            MenuEvent::TriggerKey {
                key: TriggerKey::Space
            }
        );
    }
}
