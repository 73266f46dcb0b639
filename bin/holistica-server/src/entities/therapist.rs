use crate::entities::{
    dao::{Therapist, User},
    parse_ts, Store,
};
use std::future::Future;

type TherapistRow = (String, String, String, String, String);

fn therapist_from_row(row: TherapistRow) -> Therapist {
    let (id, user_id, especialidade, crp, created_at) = row;
    Therapist {
        id,
        user_id,
        especialidade,
        crp,
        created_at: parse_ts(&created_at, "therapists.created_at"),
    }
}

pub trait TherapistStore: Send + Sync + 'static {
    /// Insert the account and therapist rows in one transaction.
    fn register_therapist(
        &self,
        user: &User,
        therapist: &Therapist,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_therapist(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Therapist>, sqlx::Error>> + Send;
    fn get_therapist_by_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Therapist>, sqlx::Error>> + Send;
    fn update_professional(
        &self,
        id: &str,
        especialidade: &str,
        crp: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn count_patients(
        &self,
        therapist_id: &str,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
}

impl TherapistStore for Store {
    async fn register_therapist(
        &self,
        user: &User,
        therapist: &Therapist,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, role, \
             telefone, data_nascimento, endereco, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.role)
        .bind(&user.telefone)
        .bind(&user.data_nascimento)
        .bind(&user.endereco)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO therapists (id, user_id, especialidade, crp, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&therapist.id)
        .bind(&therapist.user_id)
        .bind(&therapist.especialidade)
        .bind(&therapist.crp)
        .bind(therapist.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_therapist(&self, id: &str) -> Result<Option<Therapist>, sqlx::Error> {
        let row: Option<TherapistRow> = sqlx::query_as(
            "SELECT id, user_id, especialidade, crp, created_at FROM therapists WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(therapist_from_row))
    }

    async fn get_therapist_by_user(&self, user_id: &str) -> Result<Option<Therapist>, sqlx::Error> {
        let row: Option<TherapistRow> = sqlx::query_as(
            "SELECT id, user_id, especialidade, crp, created_at FROM therapists WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(therapist_from_row))
    }

    async fn update_professional(
        &self,
        id: &str,
        especialidade: &str,
        crp: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE therapists SET especialidade = ?1, crp = ?2 WHERE id = ?3")
            .bind(especialidade)
            .bind(crp)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_patients(&self, therapist_id: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM patients WHERE therapist_id = ?1")
                .bind(therapist_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
