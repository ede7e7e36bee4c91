//! OpenAPI document served next to the Swagger UI.

use utoipa::OpenApi;

use crate::routes::chat::ChatApi;
use crate::routes::health::HealthApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "sqlgate-server",
    description = "SQL-intent chat router"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(HealthApi::openapi());
    root.merge(ChatApi::openapi());
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = get_docs();
        assert!(doc.paths.paths.contains_key("/api/chat"));
        assert!(doc.paths.paths.contains_key("/health"));
        let schemas = doc.components.map(|c| c.schemas).unwrap_or_default();
        assert!(schemas.contains_key("ChatRequest"));
    }
}
