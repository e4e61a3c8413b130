use crate::error::Result;
use openapiv3::OpenAPI;
use std::sync::Arc;

/// A built document together with its serialized forms.
///
/// Rendering happens once; handlers only clone the `Arc`s.
#[derive(Debug, Clone)]
pub struct RenderedSpec {
    pub document: Arc<OpenAPI>,
    pub json: Arc<str>,
    pub yaml: Arc<str>,
}

impl RenderedSpec {
    /// Serialize `document` to pretty JSON and YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if either serializer rejects the document.
    pub fn render(document: OpenAPI) -> Result<Self> {
        let json = serde_json::to_string_pretty(&document)?;
        let yaml = serde_yaml::to_string(&document)?;
        Ok(Self {
            document: Arc::new(document),
            json: json.into(),
            yaml: yaml.into(),
        })
    }
}
