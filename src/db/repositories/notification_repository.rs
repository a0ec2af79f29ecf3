use std::sync::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::error::StoreError;
use crate::db::models::{NewNotification, Notification};

#[derive(Default)]
pub struct NotificationRepository {
    notifications: RwLock<Vec<Notification>>,
}

impl NotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, new_notification: NewNotification) -> Result<Notification, StoreError> {
        let notification = Notification {
            id: Uuid::now_v7(),
            title: new_notification.title,
            message: new_notification.message,
            notification_type: new_notification.notification_type,
            read: false,
            created_at: OffsetDateTime::now_utc(),
            link: new_notification.link,
            payload: new_notification.payload,
        };

        self.notifications
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .push(notification.clone());
        Ok(notification)
    }

    /// Newest first.
    pub fn list(&self) -> Result<Vec<Notification>, StoreError> {
        let notifications = self.notifications.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(notifications.iter().rev().cloned().collect())
    }

    /// The read flag is the only field that ever changes after creation.
    pub fn set_read(&self, notification_id: Uuid, read: bool) -> Result<Notification, StoreError> {
        let mut notifications = self.notifications.write().map_err(|_| StoreError::LockPoisoned)?;
        let notification = notifications
            .iter_mut()
            .find(|notification| notification.id == notification_id)
            .ok_or(StoreError::NotificationNotFound(notification_id))?;
        notification.read = read;
        Ok(notification.clone())
    }

    pub fn unread_count(&self) -> usize {
        self.notifications
            .read()
            .map(|notifications| notifications.iter().filter(|n| !n.read).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NotificationType;

    fn new_notification(title: &str) -> NewNotification {
        NewNotification {
            title: title.to_string(),
            message: "Report moved".to_string(),
            notification_type: NotificationType::Info,
            link: None,
            payload: None,
        }
    }

    #[test]
    fn test_create_and_list_newest_first() {
        let repo = NotificationRepository::new();
        repo.create(new_notification("first")).unwrap();
        repo.create(new_notification("second")).unwrap();

        let listed = repo.list().unwrap();
        assert_eq!(listed[0].title, "second");
        assert_eq!(listed[1].title, "first");
        assert_eq!(repo.unread_count(), 2);
    }

    #[test]
    fn test_set_read_toggles_flag_only() {
        let repo = NotificationRepository::new();
        let created = repo.create(new_notification("first")).unwrap();

        let read = repo.set_read(created.id, true).unwrap();
        assert!(read.read);
        assert_eq!(read.title, created.title);
        assert_eq!(read.created_at, created.created_at);
        assert_eq!(repo.unread_count(), 0);

        let unread = repo.set_read(created.id, false).unwrap();
        assert!(!unread.read);
    }

    #[test]
    fn test_set_read_unknown_notification() {
        let repo = NotificationRepository::new();
        let id = Uuid::new_v4();
        assert_eq!(
            repo.set_read(id, true),
            Err(StoreError::NotificationNotFound(id))
        );
    }
}
