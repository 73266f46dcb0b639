use crate::entities::{dao::Report, parse_ts, Store};
use std::future::Future;

type ReportRow = (String, String, String, String, String, String, String);

fn report_from_row(row: ReportRow) -> Report {
    let (id, therapist_id, patient_id, titulo, conteudo, created_at, updated_at) = row;
    Report {
        id,
        therapist_id,
        patient_id,
        titulo,
        conteudo,
        created_at: parse_ts(&created_at, "reports.created_at"),
        updated_at: parse_ts(&updated_at, "reports.updated_at"),
    }
}

type ReportNameRow = (String, String, String, String, String, String, String, String);

fn report_name_from_row(row: ReportNameRow) -> (Report, String) {
    let (id, therapist_id, patient_id, titulo, conteudo, created_at, updated_at, nome) = row;
    (
        report_from_row((id, therapist_id, patient_id, titulo, conteudo, created_at, updated_at)),
        nome,
    )
}

pub trait ReportStore: Send + Sync + 'static {
    fn create_report(&self, report: &Report)
        -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_report(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Report>, sqlx::Error>> + Send;
    /// Report joined with the patient's full name.
    fn get_report_with_name(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<(Report, String)>, sqlx::Error>> + Send;
    /// Reports authored by the therapist, newest first, with patient names.
    fn list_reports_for_therapist(
        &self,
        therapist_id: &str,
    ) -> impl Future<Output = Result<Vec<(Report, String)>, sqlx::Error>> + Send;
    /// Persist title and content of `report`.
    fn update_report(&self, report: &Report)
        -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn delete_report(&self, id: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

impl ReportStore for Store {
    async fn create_report(&self, report: &Report) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO reports (id, therapist_id, patient_id, titulo, conteudo, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&report.id)
        .bind(&report.therapist_id)
        .bind(&report.patient_id)
        .bind(&report.titulo)
        .bind(&report.conteudo)
        .bind(report.created_at.to_rfc3339())
        .bind(report.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_report(&self, id: &str) -> Result<Option<Report>, sqlx::Error> {
        let row: Option<ReportRow> = sqlx::query_as(
            "SELECT id, therapist_id, patient_id, titulo, conteudo, created_at, updated_at \
             FROM reports WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(report_from_row))
    }

    async fn get_report_with_name(&self, id: &str) -> Result<Option<(Report, String)>, sqlx::Error> {
        let row: Option<ReportNameRow> = sqlx::query_as(
            "SELECT r.id, r.therapist_id, r.patient_id, r.titulo, r.conteudo, \
             r.created_at, r.updated_at, u.first_name || ' ' || u.last_name \
             FROM reports r \
             JOIN patients p ON p.id = r.patient_id \
             JOIN users u ON u.id = p.user_id \
             WHERE r.id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(report_name_from_row))
    }

    async fn list_reports_for_therapist(
        &self,
        therapist_id: &str,
    ) -> Result<Vec<(Report, String)>, sqlx::Error> {
        let rows: Vec<ReportNameRow> = sqlx::query_as(
            "SELECT r.id, r.therapist_id, r.patient_id, r.titulo, r.conteudo, \
             r.created_at, r.updated_at, u.first_name || ' ' || u.last_name \
             FROM reports r \
             JOIN patients p ON p.id = r.patient_id \
             JOIN users u ON u.id = p.user_id \
             WHERE r.therapist_id = ?1 ORDER BY r.created_at DESC",
        )
        .bind(therapist_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(report_name_from_row).collect())
    }

    async fn update_report(&self, report: &Report) -> Result<(), sqlx::Error> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        sqlx::query("UPDATE reports SET titulo = ?1, conteudo = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(&report.titulo)
            .bind(&report.conteudo)
            .bind(&updated_at)
            .bind(&report.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_report(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM reports WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
