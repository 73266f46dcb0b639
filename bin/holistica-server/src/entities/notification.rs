use crate::entities::{dao::Notification, parse_ts, Store};
use std::future::Future;

type NotificationRow = (String, String, String, String, i64, String);

fn notification_from_row(row: NotificationRow) -> Notification {
    let (id, user_id, assunto, conteudo, lida, created_at) = row;
    Notification {
        id,
        user_id,
        assunto,
        conteudo,
        lida: lida != 0,
        created_at: parse_ts(&created_at, "notifications.created_at"),
    }
}

pub trait NotificationStore: Send + Sync + 'static {
    fn create_notification(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Notifications addressed to `user_id`, newest first.
    fn list_notifications(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<Notification>, sqlx::Error>> + Send;
    fn get_notification(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Notification>, sqlx::Error>> + Send;
    fn set_notification_read(
        &self,
        id: &str,
        lida: bool,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn delete_notification(&self, id: &str)
        -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

impl NotificationStore for Store {
    async fn create_notification(&self, notification: &Notification) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, assunto, conteudo, lida, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(&notification.assunto)
        .bind(&notification.conteudo)
        .bind(notification.lida as i64)
        .bind(notification.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, sqlx::Error> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT id, user_id, assunto, conteudo, lida, created_at \
             FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(notification_from_row).collect())
    }

    async fn get_notification(&self, id: &str) -> Result<Option<Notification>, sqlx::Error> {
        let row: Option<NotificationRow> = sqlx::query_as(
            "SELECT id, user_id, assunto, conteudo, lida, created_at \
             FROM notifications WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(notification_from_row))
    }

    async fn set_notification_read(&self, id: &str, lida: bool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE notifications SET lida = ?1 WHERE id = ?2")
            .bind(lida as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_notification(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM notifications WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
