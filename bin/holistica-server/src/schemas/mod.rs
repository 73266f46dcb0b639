//! Request/response DTOs, grouped by API surface.
//!
//! Wire field names follow the web frontend's Portuguese vocabulary
//! (`texto`, `remetente`, `criado_em`); the `to_response` conversions on
//! the entity types live next to the DTOs they produce.

pub mod ia;
pub mod usuarios;
