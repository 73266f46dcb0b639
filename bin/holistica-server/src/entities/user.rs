use crate::entities::{dao::User, parse_ts, Store};
use std::future::Future;

/// `SELECT` column list shared by every user query.
const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, \
                            telefone, data_nascimento, endereco, created_at, updated_at";

type UserRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn user_from_row(row: UserRow) -> User {
    let (
        id,
        email,
        password_hash,
        first_name,
        last_name,
        role,
        telefone,
        data_nascimento,
        endereco,
        created_at,
        updated_at,
    ) = row;
    User {
        id,
        email,
        password_hash,
        first_name,
        last_name,
        role,
        telefone,
        data_nascimento,
        endereco,
        created_at: parse_ts(&created_at, "users.created_at"),
        updated_at: parse_ts(&updated_at, "users.updated_at"),
    }
}

pub trait UserStore: Send + Sync + 'static {
    fn get_user(&self, id: &str) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    fn get_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    /// Persist the mutable profile fields of `user` (email, names, contact
    /// data). Role and password are not touched.
    fn update_user(&self, user: &User) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn update_password(
        &self,
        id: &str,
        password_hash: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

impl UserStore for Store {
    async fn get_user(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(user_from_row))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(user_from_row))
    }

    async fn update_user(&self, user: &User) -> Result<(), sqlx::Error> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE users SET email = ?1, first_name = ?2, last_name = ?3, telefone = ?4, \
             data_nascimento = ?5, endereco = ?6, updated_at = ?7 WHERE id = ?8",
        )
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.telefone)
        .bind(&user.data_nascimento)
        .bind(&user.endereco)
        .bind(&updated_at)
        .bind(&user.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), sqlx::Error> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(password_hash)
            .bind(&updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
