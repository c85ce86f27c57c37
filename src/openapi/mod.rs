use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MRP API",
        version = "0.1.0",
        description = r#"
# MRP API

Part catalog, bills of materials, build orders, suppliers and stock.

## Authentication

Obtain a token from `POST /api/auth/login/` and send it in the Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

The login also sets a session cookie, which is what the HTML pages use.

## Errors

```json
{
  "error": "Bad Request",
  "message": "Invalid operation: Build BO-0002 is not active",
  "request_id": "6c0e...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8000", description = "Local development")),
    tags(
        (name = "auth", description = "Login and current user"),
        (name = "parts", description = "Part catalog"),
        (name = "bom", description = "Bills of materials"),
        (name = "builds", description = "Build orders and their outputs"),
        (name = "companies", description = "Suppliers, manufacturers, customers and supplier parts"),
        (name = "stock", description = "Stock items and locations")
    ),
    paths(
        crate::handlers::auth::login,
        crate::handlers::auth::current_user,

        crate::handlers::parts::list_parts,
        crate::handlers::parts::get_part,
        crate::handlers::parts::list_categories,
        crate::handlers::parts::get_category,

        crate::handlers::bom::list_bom_items,
        crate::handlers::bom::download_bom,

        crate::handlers::builds::list_builds,
        crate::handlers::builds::create_build,
        crate::handlers::builds::get_build,
        crate::handlers::builds::update_build,
        crate::handlers::builds::cancel_build,
        crate::handlers::builds::hold_build,
        crate::handlers::builds::issue_build,
        crate::handlers::builds::complete_build,
        crate::handlers::builds::list_outputs,
        crate::handlers::builds::create_output,
        crate::handlers::builds::complete_output,
        crate::handlers::builds::build_status_codes,

        crate::handlers::companies::list_companies,
        crate::handlers::companies::get_company,
        crate::handlers::companies::list_supplier_parts,
        crate::handlers::companies::get_supplier_part,

        crate::handlers::stock::list_stock,
        crate::handlers::stock::get_stock_item,
        crate::handlers::stock::list_locations,
        crate::handlers::stock::get_location,
        crate::handlers::stock::stock_status_codes,
    ),
    components(
        schemas(
            crate::auth::LoginCredentials,
            crate::auth::TokenResponse,
            crate::auth::AuthUser,
            crate::services::build::CreateBuild,
            crate::services::build::UpdateBuild,
            crate::services::build::CreateOutput,
            crate::services::build::CompleteOutput,
            crate::handlers::builds::CancelBuildRequest,
            crate::handlers::builds::CompleteBuildRequest,
            crate::status::BuildStatus,
            crate::status::StockStatus,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    security(("bearer_auth" = []), ("session_cookie" = []))
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    crate::config::DEFAULT_SESSION_COOKIE,
                ))),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_build_routes() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("MRP API"));
        assert!(json.contains("/api/build/{pk}/cancel/"));
        assert!(json.contains("/api/part/{pk}/bom-download/"));
        assert!(json.contains("bearer_auth"));
        assert!(json.contains("/api/stock/{pk}/"));
        assert!(json.contains("/api/company/part/{pk}/"));
    }
}
