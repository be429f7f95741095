//! Schema definitions for providers, resources, and data sources.
//!
//! A [`Schema`] is a versioned tree of attributes and nested blocks that
//! Terraform uses to decode configuration and validate plans. Build them with
//! [`SchemaBuilder`] and [`AttributeBuilder`] rather than filling the structs
//! in by hand; the builders keep required/optional flags consistent.
//!
//! Attributes can carry three kinds of hooks that run inside the framework:
//! [`Validator`]s reject bad config values, [`PlanModifier`]s adjust planned
//! values (replace-on-change, copy-from-state), and [`Default`]s fill in
//! optional attributes the practitioner left unset.

use crate::types::{AttributePath, Diagnostic};
use std::collections::HashMap;

/// Versioned schema for a provider, resource, or data source.
///
/// Bump `version` whenever a change to the block requires migrating state
/// written by an older release.
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

/// A configuration block: attributes plus any nested block types.
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

/// How a description string should be rendered in docs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// Wire-level type of an attribute value.
///
/// These mirror Terraform's own type system and must stay in sync with it.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    /// Terraform numbers are always decoded as f64.
    Number,
    Bool,
    /// Ordered, duplicates allowed.
    List(Box<AttributeType>),
    /// Unordered, duplicates collapse.
    Set(Box<AttributeType>),
    /// Keys are always strings.
    Map(Box<AttributeType>),
    /// Fixed set of named fields.
    Object(HashMap<String, AttributeType>),
}

/// A single attribute in a block.
///
/// Construct via [`AttributeBuilder`]; the fields are public only so the
/// gRPC layer can translate them onto the wire.
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Box<dyn Validator>>,
    pub plan_modifiers: Vec<Box<dyn PlanModifier>>,
    pub default: Option<Box<dyn Default>>,
    pub nested_type: Option<NestedType>,
    pub deprecated: bool,
}

// Hand-written because the hook trait objects are not Debug.
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .field("nested_type", &self.nested_type)
            .field("deprecated", &self.deprecated)
            .finish()
    }
}

// Clones carry the declarative shape only. Validators, plan modifiers, and
// defaults are not cloneable trait objects, and nothing downstream of a
// schema clone runs them.
impl Clone for Attribute {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            r#type: self.r#type.clone(),
            description: self.description.clone(),
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            validators: vec![],
            plan_modifiers: vec![],
            default: None,
            nested_type: self.nested_type.clone(),
            deprecated: self.deprecated,
        }
    }
}

/// Object structure for an attribute whose type nests further attributes.
#[derive(Debug, Clone)]
pub struct NestedType {
    pub attributes: Vec<Attribute>,
    pub nesting: ObjectNestingMode,
}

/// Nesting mode for [`NestedType`] attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectNestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
}

/// A named block nested inside another block.
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

/// How repeated instances of a nested block are collected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

/// Validates a configured attribute value during plan.
pub trait Validator: Send + Sync {
    /// Shown in documentation and error output.
    fn description(&self) -> String;
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

pub struct ValidatorRequest {
    pub config_value: crate::types::DynamicValue,
    pub path: AttributePath,
}

pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Adjusts an attribute's planned value.
///
/// The stock modifiers cover the common cases: forcing replacement when a
/// value changes and carrying a known state value into an unknown plan.
pub trait PlanModifier: Send + Sync {
    /// Shown in documentation and error output.
    fn description(&self) -> String;
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

pub struct PlanModifierRequest {
    pub config_value: crate::types::DynamicValue,
    pub state_value: crate::types::DynamicValue,
    pub plan_value: crate::types::DynamicValue,
    pub path: AttributePath,
}

pub struct PlanModifierResponse {
    pub plan_value: crate::types::DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Supplies a value for an optional attribute the configuration left null.
pub trait Default: Send + Sync {
    /// Shown in documentation and error output.
    fn description(&self) -> String;
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

pub struct DefaultRequest {
    pub path: AttributePath,
}

pub struct DefaultResponse {
    pub value: crate::types::DynamicValue,
}

/// Fluent constructor for [`Attribute`].
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                nested_type: None,
                deprecated: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    /// Practitioner must set this attribute. Clears the optional flag.
    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    /// Practitioner may set this attribute. Clears the required flag.
    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    /// Value is produced by the provider rather than the configuration.
    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Redact the value from plan output and logs.
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    pub fn nested_type(mut self, nested: NestedType) -> Self {
        self.attribute.nested_type = Some(nested);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// Fluent constructor for [`Schema`].
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    block_types: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    /// Set the schema version. The root block mirrors it.
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dynamic, DynamicValue};

    #[test]
    fn builder_flags_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("Alert name shown in the dashboard")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "Alert name shown in the dashboard");
    }

    #[test]
    fn required_and_optional_are_mutually_exclusive() {
        let attr = AttributeBuilder::new("description", AttributeType::String)
            .required()
            .optional()
            .build();
        assert!(attr.optional);
        assert!(!attr.required);

        let attr = AttributeBuilder::new("description", AttributeType::String)
            .optional()
            .required()
            .build();
        assert!(attr.required);
        assert!(!attr.optional);
    }

    #[test]
    fn schema_version_propagates_to_root_block() {
        let schema = SchemaBuilder::new()
            .version(2)
            .description("Role grants inside the organization")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .build();

        assert_eq!(schema.version, 2);
        assert_eq!(schema.block.version, 2);
        assert_eq!(schema.block.attributes.len(), 2);
        assert_eq!(
            schema.block.description,
            "Role grants inside the organization"
        );
    }

    #[test]
    fn object_attribute_keeps_field_types() {
        let object_type = AttributeType::Object(HashMap::from([
            ("enable".to_string(), AttributeType::Bool),
            ("text".to_string(), AttributeType::String),
        ]));

        let attr = AttributeBuilder::new("remediation_text", object_type)
            .optional()
            .build();

        assert!(attr.optional);
        if let AttributeType::Object(fields) = &attr.r#type {
            assert_eq!(fields.len(), 2);
            assert!(matches!(fields.get("enable"), Some(AttributeType::Bool)));
            assert!(matches!(fields.get("text"), Some(AttributeType::String)));
        } else {
            panic!("Expected Object type");
        }
    }

    #[test]
    fn sensitive_flag_is_independent_of_computed() {
        let attr = AttributeBuilder::new("api_token", AttributeType::String)
            .optional()
            .sensitive()
            .build();

        assert!(attr.sensitive);
        assert!(!attr.computed);
    }

    #[test]
    fn cloning_an_attribute_drops_its_hooks() {
        struct Never;
        impl Validator for Never {
            fn description(&self) -> String {
                "never valid".to_string()
            }
            fn validate(&self, _request: ValidatorRequest) -> ValidatorResponse {
                ValidatorResponse {
                    diagnostics: vec![Diagnostic::error("invalid", "always")],
                }
            }
        }
        struct Empty;
        impl Default for Empty {
            fn description(&self) -> String {
                "empty string".to_string()
            }
            fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
                DefaultResponse {
                    value: DynamicValue::new(Dynamic::String(String::new())),
                }
            }
        }

        let attr = AttributeBuilder::new("query", AttributeType::String)
            .optional()
            .validator(Box::new(Never))
            .default(Box::new(Empty))
            .build();
        assert_eq!(attr.validators.len(), 1);
        assert!(attr.default.is_some());

        let copy = attr.clone();
        assert!(copy.validators.is_empty());
        assert!(copy.default.is_none());
        assert_eq!(copy.name, "query");
        assert!(copy.optional);
    }

    #[test]
    fn nested_block_carries_its_own_attributes() {
        let block = NestedBlock {
            type_name: "filter_data".to_string(),
            block: Block {
                version: 0,
                attributes: vec![AttributeBuilder::new("category", AttributeType::String)
                    .required()
                    .build()],
                block_types: vec![],
                description: String::new(),
                description_kind: StringKind::Plain,
                deprecated: false,
            },
            nesting: NestingMode::List,
            min_items: 0,
            max_items: 0,
        };

        let schema = SchemaBuilder::new().block(block).build();
        assert_eq!(schema.block.block_types.len(), 1);
        assert_eq!(schema.block.block_types[0].type_name, "filter_data");
        assert_eq!(schema.block.block_types[0].nesting, NestingMode::List);
    }
}
