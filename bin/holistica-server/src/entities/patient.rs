use crate::entities::{
    dao::{Patient, PatientProfile, User},
    parse_ts, Store,
};
use std::future::Future;

/// Column list for the `patients JOIN users` profile shape.
const PROFILE_COLUMNS: &str = "p.id, p.user_id, p.therapist_id, u.first_name, u.last_name, \
                               u.email, u.telefone, u.data_nascimento, u.endereco, p.created_at";

type ProfileRow = (
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn profile_from_row(row: ProfileRow) -> PatientProfile {
    let (
        id,
        user_id,
        therapist_id,
        first_name,
        last_name,
        email,
        telefone,
        data_nascimento,
        endereco,
        created_at,
    ) = row;
    PatientProfile {
        id,
        user_id,
        therapist_id,
        first_name,
        last_name,
        email,
        telefone,
        data_nascimento,
        endereco,
        created_at: parse_ts(&created_at, "patients.created_at"),
    }
}

pub trait PatientStore: Send + Sync + 'static {
    /// Insert the account and patient rows in one transaction, so a
    /// half-registered patient can never be observed.
    fn register_patient(
        &self,
        user: &User,
        patient: &Patient,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_patient(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Patient>, sqlx::Error>> + Send;
    fn get_patient_by_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Patient>, sqlx::Error>> + Send;
    fn get_patient_profile(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<PatientProfile>, sqlx::Error>> + Send;
    /// Patients assigned to `therapist_id`, most recent first.
    fn list_patient_profiles(
        &self,
        therapist_id: &str,
    ) -> impl Future<Output = Result<Vec<PatientProfile>, sqlx::Error>> + Send;
    /// Case-insensitive substring search over name and email, scoped to
    /// the therapist's own patients.
    fn search_patient_profiles(
        &self,
        therapist_id: &str,
        term: &str,
    ) -> impl Future<Output = Result<Vec<PatientProfile>, sqlx::Error>> + Send;
    /// Remove the patient and every record that references them: messages,
    /// sessions, reports, notifications, tokens, and the account itself.
    /// Runs in one transaction.
    fn delete_patient_cascade(
        &self,
        patient_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

impl PatientStore for Store {
    async fn register_patient(&self, user: &User, patient: &Patient) -> Result<(), sqlx::Error> {
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
            "INSERT INTO patients (id, user_id, therapist_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&patient.id)
        .bind(&patient.user_id)
        .bind(&patient.therapist_id)
        .bind(patient.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_patient(&self, id: &str) -> Result<Option<Patient>, sqlx::Error> {
        let row: Option<(String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT id, user_id, therapist_id, created_at FROM patients WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, user_id, therapist_id, created_at)| Patient {
            id,
            user_id,
            therapist_id,
            created_at: parse_ts(&created_at, "patients.created_at"),
        }))
    }

    async fn get_patient_by_user(&self, user_id: &str) -> Result<Option<Patient>, sqlx::Error> {
        let row: Option<(String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT id, user_id, therapist_id, created_at FROM patients WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, user_id, therapist_id, created_at)| Patient {
            id,
            user_id,
            therapist_id,
            created_at: parse_ts(&created_at, "patients.created_at"),
        }))
    }

    async fn get_patient_profile(&self, id: &str) -> Result<Option<PatientProfile>, sqlx::Error> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM patients p JOIN users u ON u.id = p.user_id \
             WHERE p.id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(profile_from_row))
    }

    async fn list_patient_profiles(
        &self,
        therapist_id: &str,
    ) -> Result<Vec<PatientProfile>, sqlx::Error> {
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM patients p JOIN users u ON u.id = p.user_id \
             WHERE p.therapist_id = ?1 ORDER BY p.created_at DESC"
        ))
        .bind(therapist_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(profile_from_row).collect())
    }

    async fn search_patient_profiles(
        &self,
        therapist_id: &str,
        term: &str,
    ) -> Result<Vec<PatientProfile>, sqlx::Error> {
        // `%` and `_` in the term are literal characters, not wildcards.
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM patients p JOIN users u ON u.id = p.user_id \
             WHERE p.therapist_id = ?1 \
               AND (u.first_name LIKE ?2 ESCAPE '\\' \
                    OR u.last_name LIKE ?2 ESCAPE '\\' \
                    OR u.email LIKE ?2 ESCAPE '\\') \
             ORDER BY u.first_name, u.last_name"
        ))
        .bind(therapist_id)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(profile_from_row).collect())
    }

    async fn delete_patient_cascade(
        &self,
        patient_id: &str,
        user_id: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM messages WHERE session_id IN \
             (SELECT id FROM sessions WHERE patient_id = ?1)",
        )
        .bind(patient_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM sessions WHERE patient_id = ?1")
            .bind(patient_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM reports WHERE patient_id = ?1")
            .bind(patient_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM patients WHERE id = ?1")
            .bind(patient_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM auth_tokens WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM notifications WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
