use crate::routes::ia;
use crate::routes::usuarios;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "holistica-server",
    description = "API da plataforma Holística de acompanhamento terapêutico",
    version = "0.1.0",
    contact(name = "holistica")
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(usuarios::api_docs());
    root.merge(ia::api_docs());
    root
}
