//! Build the `OpenAPI` document describing the per-table REST surface.

use crate::error::{OpenApiGenError, Result};
use crate::model::TableSchema;
use openapiv3::{
    ArrayType, Components, ExternalDocumentation, Info, MediaType, ObjectType, OpenAPI,
    Operation, Parameter, ParameterData, ParameterSchemaOrContent, PathItem, PathStyle,
    ReferenceOr, RequestBody, Response, Schema, SchemaData, SchemaKind, StatusCode, StringType,
    Tag, Type,
};
use std::collections::HashSet;

pub const OPENAPI_VERSION: &str = "3.0.0";
pub const SPEC_YAML_PATH: &str = "/spec/oas.yaml";
pub const SPEC_JSON_PATH: &str = "/spec/oas.json";

const JSON_MIME_TYPE: &str = "application/json";

/// Knobs that change which operations end up in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecOptions {
    /// Describe the create/update/delete operations as well as the reads.
    pub include_writes: bool,
}

/// Build the document for `tables`.
///
/// Paths, schemas and per-table tags follow the order of `tables`; callers that need a
/// reproducible document should pass tables sorted by name.
///
/// # Errors
///
/// Returns [`OpenApiGenError::DuplicateTable`] if two entries share a name.
pub fn build_spec(tables: &[TableSchema], options: SpecOptions) -> Result<OpenAPI> {
    let mut spec = OpenAPI {
        openapi: OPENAPI_VERSION.to_string(),
        info: Info {
            title: "CRUD REST API".to_string(),
            description: Some(
                "A REST API server with CRUD operations for a Postgres database.".to_string(),
            ),
            version: "1.0".to_string(),
            ..Default::default()
        },
        tags: vec![
            download_tag("OAS 3.0 Specification - YAML", "YAML", SPEC_YAML_PATH),
            download_tag("OAS 3.0 Specification - JSON", "JSON", SPEC_JSON_PATH),
        ],
        ..Default::default()
    };
    let mut components = Components::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for table in tables {
        if !seen.insert(table.name.as_str()) {
            return Err(OpenApiGenError::DuplicateTable(table.name.clone()));
        }

        components
            .schemas
            .insert(table.name.clone(), ReferenceOr::Item(table_schema(table)));

        spec.tags.push(Tag {
            name: table.name.clone(),
            description: Some(format!("Entities of the {} table.", table.name)),
            external_docs: None,
            extensions: Default::default(),
        });

        spec.paths.paths.insert(
            format!("/{}", table.name),
            ReferenceOr::Item(collection_path_item(table, options)),
        );
        spec.paths.paths.insert(
            format!("/{}/{{id}}", table.name),
            ReferenceOr::Item(item_path_item(table, options)),
        );
        tracing::debug!(table = %table.name, columns = table.columns.len(), "described table");
    }

    spec.components = Some(components);
    Ok(spec)
}

fn download_tag(name: &str, label: &str, url: &str) -> Tag {
    Tag {
        name: name.to_string(),
        description: Some(format!(
            "Download the OAS specification in {label} format"
        )),
        external_docs: Some(ExternalDocumentation {
            description: Some(label.to_string()),
            url: url.to_string(),
            extensions: Default::default(),
        }),
        extensions: Default::default(),
    }
}

/// Column types are not introspected, so every property is a plain string.
fn table_schema(table: &TableSchema) -> Schema {
    let mut object = ObjectType::default();
    for column in &table.columns {
        object
            .properties
            .insert(column.clone(), ReferenceOr::Item(Box::new(string_schema())));
    }
    Schema {
        schema_data: SchemaData::default(),
        schema_kind: SchemaKind::Type(Type::Object(object)),
    }
}

fn string_schema() -> Schema {
    Schema {
        schema_data: SchemaData::default(),
        schema_kind: SchemaKind::Type(Type::String(StringType::default())),
    }
}

fn schema_ref(table: &TableSchema) -> ReferenceOr<Schema> {
    ReferenceOr::ref_(&format!("#/components/schemas/{}", table.name))
}

fn array_of(table: &TableSchema) -> ReferenceOr<Schema> {
    ReferenceOr::Item(Schema {
        schema_data: SchemaData::default(),
        schema_kind: SchemaKind::Type(Type::Array(ArrayType {
            items: Some(ReferenceOr::Reference {
                reference: format!("#/components/schemas/{}", table.name),
            }),
            min_items: None,
            max_items: None,
            unique_items: false,
        })),
    })
}

fn response(description: String, schema: Option<ReferenceOr<Schema>>) -> ReferenceOr<Response> {
    let mut resp = Response {
        description,
        ..Default::default()
    };
    if let Some(schema) = schema {
        resp.content.insert(
            JSON_MIME_TYPE.to_string(),
            MediaType {
                schema: Some(schema),
                ..Default::default()
            },
        );
    }
    ReferenceOr::Item(resp)
}

fn operation(table: &TableSchema, operation_id: String, description: String) -> Operation {
    Operation {
        tags: vec![table.name.clone()],
        description: Some(description),
        operation_id: Some(operation_id),
        ..Default::default()
    }
}

fn id_parameter(table: &TableSchema) -> ReferenceOr<Parameter> {
    ReferenceOr::Item(Parameter::Path {
        parameter_data: ParameterData {
            name: "id".to_string(),
            description: Some(format!("Value of the {} column.", table.id_column())),
            required: true,
            deprecated: None,
            format: ParameterSchemaOrContent::Schema(ReferenceOr::Item(string_schema())),
            example: None,
            examples: Default::default(),
            explode: None,
            extensions: Default::default(),
        },
        style: PathStyle::Simple,
    })
}

fn entity_body(table: &TableSchema) -> ReferenceOr<RequestBody> {
    let mut body = RequestBody {
        description: Some(format!("A {} entity.", table.name)),
        required: true,
        ..Default::default()
    };
    body.content.insert(
        JSON_MIME_TYPE.to_string(),
        MediaType {
            schema: Some(schema_ref(table)),
            ..Default::default()
        },
    );
    ReferenceOr::Item(body)
}

fn not_found(table: &TableSchema) -> ReferenceOr<Response> {
    response(format!("No {} entity matches the id.", table.name), None)
}

fn collection_path_item(table: &TableSchema, options: SpecOptions) -> PathItem {
    let name = &table.name;

    let mut list = operation(
        table,
        format!("list_{name}"),
        format!("Retrieve all entities from the {name} table."),
    );
    list.responses.responses.insert(
        StatusCode::Code(200),
        response(format!("An array of {name} entities."), Some(array_of(table))),
    );

    let mut item = PathItem {
        get: Some(list),
        ..Default::default()
    };

    if options.include_writes {
        let mut create = operation(
            table,
            format!("create_{name}"),
            format!("Insert an entity into the {name} table."),
        );
        create.request_body = Some(entity_body(table));
        create.responses.responses.insert(
            StatusCode::Code(201),
            response(format!("The created {name} entity."), Some(schema_ref(table))),
        );
        item.post = Some(create);
    }

    item
}

fn item_path_item(table: &TableSchema, options: SpecOptions) -> PathItem {
    let name = &table.name;

    let mut get = operation(
        table,
        format!("get_{name}"),
        format!("Retrieve one entity from the {name} table by id."),
    );
    get.parameters.push(id_parameter(table));
    get.responses.responses.insert(
        StatusCode::Code(200),
        response(format!("A {name} entity."), Some(schema_ref(table))),
    );
    get.responses
        .responses
        .insert(StatusCode::Code(404), not_found(table));

    let mut item = PathItem {
        get: Some(get),
        ..Default::default()
    };

    if options.include_writes {
        let mut update = operation(
            table,
            format!("update_{name}"),
            format!("Update one entity of the {name} table by id."),
        );
        update.parameters.push(id_parameter(table));
        update.request_body = Some(entity_body(table));
        update.responses.responses.insert(
            StatusCode::Code(200),
            response(format!("The updated {name} entity."), Some(schema_ref(table))),
        );
        update
            .responses
            .responses
            .insert(StatusCode::Code(404), not_found(table));
        item.put = Some(update);

        let mut delete = operation(
            table,
            format!("delete_{name}"),
            format!("Delete one entity of the {name} table by id."),
        );
        delete.parameters.push(id_parameter(table));
        delete.responses.responses.insert(
            StatusCode::Code(204),
            response(format!("The {name} entity was deleted."), None),
        );
        delete
            .responses
            .responses
            .insert(StatusCode::Code(404), not_found(table));
        item.delete = Some(delete);
    }

    item
}
