//! Transient success and failure notices

use std::collections::VecDeque;

use iconbridge_shared::{Locale, Message, PanelMessage};

/// Notices kept before the oldest is dropped
pub const MAX_NOTIFICATIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: usize,
    pub level: NotificationLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notifications {
    locale: Locale,
    items: VecDeque<Notification>,
    next_id: usize,
}

impl Notifications {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            items: VecDeque::new(),
            next_id: 0,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dismiss(&mut self, id: usize) {
        self.items.retain(|n| n.id != id);
    }

    /// Remove and return every pending notice, oldest first
    pub fn drain(&mut self) -> Vec<Notification> {
        self.items.drain(..).collect()
    }

    pub fn push(&mut self, level: NotificationLevel, text: String) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push_back(Notification { id, level, text });
        while self.items.len() > MAX_NOTIFICATIONS {
            self.items.pop_front();
        }
        id
    }

    pub fn apply(&mut self, message: &PanelMessage) {
        let (level, text) = match message {
            PanelMessage::TokenSaved { .. } => {
                (NotificationLevel::Success, self.render(&Message::TokenSaved))
            }
            PanelMessage::TokenCleared { .. } => {
                (NotificationLevel::Success, self.render(&Message::TokenCleared))
            }
            PanelMessage::TokenValid { payload, .. } => (
                NotificationLevel::Success,
                self.render(&Message::TokenValid {
                    login: &payload.login,
                }),
            ),
            PanelMessage::SaveArchive { .. } => {
                (NotificationLevel::Success, self.render(&Message::ArchiveCreated))
            }
            PanelMessage::Error { message, .. } => (
                NotificationLevel::Failure,
                self.render(&Message::ErrorNotice { message }),
            ),
            _ => return,
        };
        self.push(level, text);
    }

    fn render(&self, message: &Message<'_>) -> String {
        self.locale.render(message)
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iconbridge_shared::protocol::TokenValidPayload;
    use iconbridge_shared::RepositoryKind;

    #[test]
    fn test_messages_become_localized_notices() {
        let mut notifications = Notifications::new(Locale::Ru);
        notifications.apply(&PanelMessage::TokenValid {
            payload: TokenValidPayload {
                kind: RepositoryKind::PublicIcons,
                login: "octocat".to_string(),
            },
            req_id: None,
        });
        notifications.apply(&PanelMessage::error("Bad credentials (401)"));

        let items = notifications.drain();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].level, NotificationLevel::Success);
        assert_eq!(items[0].text, "Токен валиден (octocat)");
        assert_eq!(items[1].level, NotificationLevel::Failure);
        assert_eq!(items[1].text, "Ошибка: Bad credentials (401)");
        assert!(notifications.is_empty());
    }

    #[test]
    fn test_silent_messages() {
        let mut notifications = Notifications::default();
        notifications.apply(&PanelMessage::selection(1));
        notifications.apply(&PanelMessage::Ignored);
        assert!(notifications.is_empty());
    }

    #[test]
    fn test_queue_is_bounded() {
        let mut notifications = Notifications::default();
        for i in 0..5 {
            notifications.push(NotificationLevel::Success, format!("n{}", i));
        }
        assert_eq!(notifications.len(), MAX_NOTIFICATIONS);
        assert_eq!(notifications.iter().next().map(|n| n.text.as_str()), Some("n2"));

        let latest = notifications.latest().map(|n| n.id);
        if let Some(id) = latest {
            notifications.dismiss(id);
        }
        assert_eq!(notifications.latest().map(|n| n.text.as_str()), Some("n3"));
    }
}
