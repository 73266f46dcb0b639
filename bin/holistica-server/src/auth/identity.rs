use crate::entities::dao::{Patient, Therapist, User};
use crate::error::ServerError;

/// The authenticated caller, resolved from the bearer token by
/// [`crate::middleware::auth::auth_middleware`] and injected as a request
/// extension.
///
/// Carrying the role-specific row alongside the account means handlers
/// never re-query to learn who is calling.
#[derive(Debug, Clone)]
pub enum AuthIdentity {
    Patient { user: User, patient: Patient },
    Therapist { user: User, therapist: Therapist },
}

impl AuthIdentity {
    pub fn user(&self) -> &User {
        match self {
            AuthIdentity::Patient { user, .. } => user,
            AuthIdentity::Therapist { user, .. } => user,
        }
    }

    pub fn is_therapist(&self) -> bool {
        matches!(self, AuthIdentity::Therapist { .. })
    }

    /// The caller's patient record, or 403 for therapists.
    pub fn as_patient(&self) -> Result<&Patient, ServerError> {
        match self {
            AuthIdentity::Patient { patient, .. } => Ok(patient),
            AuthIdentity::Therapist { .. } => Err(ServerError::Forbidden(
                "acesso restrito a pacientes".to_owned(),
            )),
        }
    }

    /// The caller's therapist record, or 403 for patients.
    pub fn as_therapist(&self) -> Result<&Therapist, ServerError> {
        match self {
            AuthIdentity::Therapist { therapist, .. } => Ok(therapist),
            AuthIdentity::Patient { .. } => Err(ServerError::Forbidden(
                "acesso restrito a terapeutas".to_owned(),
            )),
        }
    }
}
