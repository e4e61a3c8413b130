//! Serves the generated document and the Swagger UI page built from it.

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use dras_openapi::RenderedSpec;
use dras_openapi::builder::{SPEC_JSON_PATH, SPEC_YAML_PATH};
use std::sync::Arc;

pub const SWAGGER_UI_PATH: &str = "/swagger-ui";
/// Default asset location; needs network access from the browser.
pub const SWAGGER_UI_CDN: &str = "https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/5.11.0";

#[derive(Clone)]
struct DocsState {
    spec: RenderedSpec,
    swagger_html: Arc<str>,
}

/// Routes for `/spec/oas.json`, `/spec/oas.yaml`, `/swagger-ui/*` and `/health`.
///
/// The Swagger UI page loads its scripts and stylesheet from `assets`.
pub fn router(spec: RenderedSpec, assets: &str) -> Router {
    let swagger_html: Arc<str> = swagger_ui_html(&spec.json, assets).into();
    let state = DocsState { spec, swagger_html };

    Router::new()
        .route(SPEC_JSON_PATH, get(spec_json))
        .route(SPEC_YAML_PATH, get(spec_yaml))
        .route(SWAGGER_UI_PATH, get(swagger_ui))
        .route(&format!("{SWAGGER_UI_PATH}/"), get(swagger_ui))
        .route(&format!("{SWAGGER_UI_PATH}/{{*rest}}"), get(swagger_ui))
        .route("/health", get(health))
        .with_state(state)
}

async fn spec_json(State(state): State<DocsState>) -> Response {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        )],
        state.spec.json.to_string(),
    )
        .into_response()
}

async fn spec_yaml(State(state): State<DocsState>) -> Response {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/yaml; charset=utf-8"),
        )],
        state.spec.yaml.to_string(),
    )
        .into_response()
}

async fn swagger_ui(State(state): State<DocsState>) -> Html<String> {
    Html(state.swagger_html.to_string())
}

async fn health() -> &'static str {
    "ok"
}

/// Swagger UI page with the document inlined and "try it out" switched on.
fn swagger_ui_html(spec_json: &str, assets: &str) -> String {
    // A literal `</script>` inside the inlined JSON would end the script element early.
    let inline_spec = spec_json.replace("</", "<\\/");
    SWAGGER_UI_TEMPLATE
        .replace("{{ASSETS}}", assets.trim_end_matches('/'))
        .replace("{{SPEC}}", &inline_spec)
}

const SWAGGER_UI_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <title>CRUD REST API</title>
    <link rel="stylesheet" type="text/css" href="{{ASSETS}}/swagger-ui.css" />
    <style>
      html { box-sizing: border-box; overflow-y: scroll; }
      *, *:before, *:after { box-sizing: inherit; }
      body { margin: 0; background: #fafafa; }
    </style>
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="{{ASSETS}}/swagger-ui-bundle.js" charset="UTF-8"></script>
    <script src="{{ASSETS}}/swagger-ui-standalone-preset.js" charset="UTF-8"></script>
    <script>
      window.onload = function () {
        window.ui = SwaggerUIBundle({
          spec: {{SPEC}},
          dom_id: "#swagger-ui",
          deepLinking: true,
          tryItOutEnabled: true,
          presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
          plugins: [SwaggerUIBundle.plugins.DownloadUrl],
          layout: "StandaloneLayout"
        });
      };
    </script>
  </body>
</html>
"##;
