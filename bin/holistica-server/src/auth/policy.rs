//! Record-level access rules.
//!
//! Authentication says who is calling; these functions say what they may
//! touch. Every denial is a 403 with a Portuguese client message and no
//! hint about whether the record exists.

use crate::auth::AuthIdentity;
use crate::entities::dao::{Patient, Therapist};
use crate::error::ServerError;

/// A patient may access their own record; a therapist may access patients
/// assigned to them.
pub fn can_access_patient(identity: &AuthIdentity, patient: &Patient) -> Result<(), ServerError> {
    match identity {
        AuthIdentity::Patient { patient: own, .. } if own.id == patient.id => Ok(()),
        AuthIdentity::Therapist { therapist, .. }
            if patient.therapist_id.as_deref() == Some(therapist.id.as_str()) =>
        {
            Ok(())
        }
        _ => Err(ServerError::Forbidden(
            "acesso negado a este paciente".to_owned(),
        )),
    }
}

/// Only the assigned therapist may write clinical reports about a patient.
pub fn can_author_report<'a>(
    identity: &'a AuthIdentity,
    patient: &Patient,
) -> Result<&'a Therapist, ServerError> {
    let therapist = identity.as_therapist()?;
    if patient.therapist_id.as_deref() == Some(therapist.id.as_str()) {
        Ok(therapist)
    } else {
        Err(ServerError::Forbidden(
            "este paciente não está atribuído a você".to_owned(),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::dao::{User, ROLE_PACIENTE, ROLE_TERAPEUTA};
    use chrono::Utc;

    fn user(role: &str) -> User {
        let now = Utc::now();
        User {
            id: format!("user-{role}"),
            email: format!("{role}@example.com"),
            password_hash: "x".into(),
            first_name: "Conta".into(),
            last_name: "Teste".into(),
            role: role.into(),
            telefone: None,
            data_nascimento: None,
            endereco: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn patient(id: &str, therapist_id: Option<&str>) -> Patient {
        Patient {
            id: id.into(),
            user_id: format!("user-of-{id}"),
            therapist_id: therapist_id.map(str::to_owned),
            created_at: Utc::now(),
        }
    }

    fn therapist(id: &str) -> Therapist {
        Therapist {
            id: id.into(),
            user_id: format!("user-of-{id}"),
            especialidade: "TCC".into(),
            crp: "06/00000".into(),
            created_at: Utc::now(),
        }
    }

    fn patient_identity(p: Patient) -> AuthIdentity {
        AuthIdentity::Patient { user: user(ROLE_PACIENTE), patient: p }
    }

    fn therapist_identity(t: Therapist) -> AuthIdentity {
        AuthIdentity::Therapist { user: user(ROLE_TERAPEUTA), therapist: t }
    }

    #[test]
    fn patient_reaches_own_record() {
        let identity = patient_identity(patient("p1", None));
        can_access_patient(&identity, &patient("p1", None)).unwrap();
    }

    #[test]
    fn patient_cannot_reach_other_patient() {
        let identity = patient_identity(patient("p1", None));
        let err = can_access_patient(&identity, &patient("p2", None)).unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));
    }

    #[test]
    fn assigned_therapist_reaches_patient() {
        let identity = therapist_identity(therapist("t1"));
        can_access_patient(&identity, &patient("p1", Some("t1"))).unwrap();
    }

    #[test]
    fn unassigned_therapist_is_denied() {
        let identity = therapist_identity(therapist("t1"));
        let err = can_access_patient(&identity, &patient("p1", Some("t2"))).unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));
        let err = can_access_patient(&identity, &patient("p2", None)).unwrap_err();
        assert!(matches!(err, ServerError::Forbidden(_)));
    }

    #[test]
    fn report_author_must_be_assigned_therapist() {
        let identity = therapist_identity(therapist("t1"));
        assert!(can_author_report(&identity, &patient("p1", Some("t1"))).is_ok());
        assert!(can_author_report(&identity, &patient("p1", Some("t2"))).is_err());

        let patient_id = patient_identity(patient("p1", Some("t1")));
        assert!(can_author_report(&patient_id, &patient("p1", Some("t1"))).is_err());
    }
}
