//! Magic spell metadata schema
//!
//! The metadata file describes every property a spell may carry, the type of
//! each property and the action/effect classes with their own fields. It is
//! loaded once and never modified afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::SchemaError;

/// Field name → property key
pub type FieldMap = BTreeMap<String, String>;

/// Option value → optional description
pub type Options = BTreeMap<String, Option<String>>;

/// Definition of a single property
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PropertyDef {
    pub field: Option<String>,
    #[serde(rename = "type")]
    pub type_key: String,
    #[serde(deserialize_with = "string_or_list")]
    pub description: Vec<String>,
    pub importance: f64,
}

/// Definition of a value type
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TypeDef {
    #[serde(deserialize_with = "options_map")]
    pub options: Options,
    pub value_type: Option<String>,
    pub key_type: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub description: Vec<String>,
}

impl TypeDef {
    pub fn is_list(&self) -> bool {
        self.value_type.is_some()
    }

    pub fn is_map(&self) -> bool {
        self.key_type.is_some()
    }
}

/// Scalar flavour of a type, derived from its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Milliseconds,
    Percentage,
    Integer,
    Double,
    Color,
    Other,
}

impl ValueKind {
    pub fn from_type_key(type_key: &str) -> Self {
        match type_key {
            "milliseconds" => ValueKind::Milliseconds,
            "percentage" => ValueKind::Percentage,
            "integer" => ValueKind::Integer,
            "double" => ValueKind::Double,
            "color" => ValueKind::Color,
            _ => ValueKind::Other,
        }
    }

    /// Numeric kinds only complete by prefix
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueKind::Milliseconds | ValueKind::Percentage | ValueKind::Integer | ValueKind::Double
        )
    }
}

/// Named lookup tables, each mapping a field name to a property key
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Contexts {
    #[serde(alias = "properties")]
    pub spell_properties: FieldMap,
    #[serde(alias = "parameters")]
    pub spell_parameters: FieldMap,
    pub effect_parameters: FieldMap,
    pub effectlib_parameters: FieldMap,
    pub action_parameters: FieldMap,
    pub compound_action_parameters: FieldMap,
    pub action_classes: BTreeMap<String, String>,
    pub effectlib_classes: BTreeMap<String, String>,
    pub actions: BTreeMap<String, FieldMap>,
    pub effects: BTreeMap<String, FieldMap>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ClassMeta {
    #[serde(deserialize_with = "defaults_map")]
    parameters: BTreeMap<String, String>,
    category: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    description: Vec<String>,
    importance: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetadata {
    properties: BTreeMap<String, PropertyDef>,
    types: BTreeMap<String, TypeDef>,
    #[serde(alias = "spell_context")]
    context: Contexts,
    actions: BTreeMap<String, ClassMeta>,
    effectlib_effects: BTreeMap<String, ClassMeta>,
    #[serde(deserialize_with = "defaults_map")]
    action_parameters: BTreeMap<String, String>,
    #[serde(deserialize_with = "defaults_map")]
    effectlib_parameters: BTreeMap<String, String>,
}

/// One action or effect class
#[derive(Debug, Clone, Default)]
pub struct ClassDef {
    /// Short name as written in a `class:` field
    pub name: String,
    /// Metadata key, absent when the class is only known by its field map
    pub key: Option<String>,
    pub fields: FieldMap,
    /// Property key → default value
    pub defaults: BTreeMap<String, String>,
    pub category: Option<String>,
    pub description: Vec<String>,
    pub importance: f64,
}

impl ClassDef {
    pub fn is_compound(&self) -> bool {
        self.category.as_deref() == Some("compound")
    }
}

/// Flat registry of one class family keyed by short name
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    suffix: &'static str,
    classes: BTreeMap<String, ClassDef>,
    by_key: BTreeMap<String, String>,
}

impl ClassRegistry {
    fn build(
        suffix: &'static str,
        short_names: &BTreeMap<String, String>,
        field_maps: &BTreeMap<String, FieldMap>,
        meta: &BTreeMap<String, ClassMeta>,
    ) -> Self {
        let mut registry = Self {
            suffix,
            classes: BTreeMap::new(),
            by_key: BTreeMap::new(),
        };

        for (short, key) in short_names {
            let fields = field_maps
                .get(&format!("{}{}", short, suffix))
                .or_else(|| field_maps.get(short))
                .cloned()
                .unwrap_or_default();
            let class_meta = meta.get(key).cloned().unwrap_or_default();
            registry.by_key.insert(key.clone(), short.clone());
            registry.classes.insert(
                short.clone(),
                ClassDef {
                    name: short.clone(),
                    key: Some(key.clone()),
                    fields,
                    defaults: class_meta.parameters,
                    category: class_meta.category,
                    description: class_meta.description,
                    importance: class_meta.importance,
                },
            );
        }

        // Classes with fields but no registered short name
        for (full_name, fields) in field_maps {
            let short = full_name.strip_suffix(suffix).unwrap_or(full_name);
            registry
                .classes
                .entry(short.to_string())
                .or_insert_with(|| ClassDef {
                    name: short.to_string(),
                    fields: fields.clone(),
                    ..ClassDef::default()
                });
        }

        registry
    }

    pub fn suffix(&self) -> &'static str {
        self.suffix
    }

    /// Look a class up by short (`Fireball`) or suffixed (`FireballAction`) name
    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name).or_else(|| {
            name.strip_suffix(self.suffix)
                .and_then(|short| self.classes.get(short))
        })
    }

    /// Look a class up by its metadata key
    pub fn by_key(&self, key: &str) -> Option<&ClassDef> {
        self.by_key.get(key).and_then(|short| self.classes.get(short))
    }

    /// Registered short names with their metadata keys
    pub fn names(&self) -> Options {
        self.classes
            .values()
            .filter_map(|class| class.key.clone().map(|key| (class.name.clone(), Some(key))))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Suffix appended to action class names
pub const ACTION_SUFFIX: &str = "Action";
/// Suffix appended to effectlib class names
pub const EFFECT_SUFFIX: &str = "Effect";

/// The loaded metadata
#[derive(Debug, Clone, Default)]
pub struct MagicSchema {
    pub properties: BTreeMap<String, PropertyDef>,
    pub types: BTreeMap<String, TypeDef>,
    pub context: Contexts,
    pub actions: ClassRegistry,
    pub effects: ClassRegistry,
    /// Generic action parameter defaults, property key → value
    pub action_defaults: BTreeMap<String, String>,
    /// Generic effectlib parameter defaults, property key → value
    pub effectlib_defaults: BTreeMap<String, String>,
}

impl MagicSchema {
    /// Parse metadata from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        let raw: RawMetadata = serde_json::from_str(text)?;
        Ok(Self::from_raw(raw))
    }

    /// Build from an already parsed JSON value
    pub fn from_value(value: JsonValue) -> Result<Self, SchemaError> {
        let raw: RawMetadata = serde_json::from_value(value)?;
        Ok(Self::from_raw(raw))
    }

    /// Load the metadata file from disk
    pub async fn load(path: &Path) -> Result<Self, SchemaError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SchemaError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&text)
    }

    fn from_raw(raw: RawMetadata) -> Self {
        let actions = ClassRegistry::build(
            ACTION_SUFFIX,
            &raw.context.action_classes,
            &raw.context.actions,
            &raw.actions,
        );
        let effects = ClassRegistry::build(
            EFFECT_SUFFIX,
            &raw.context.effectlib_classes,
            &raw.context.effects,
            &raw.effectlib_effects,
        );
        debug!(
            properties = raw.properties.len(),
            types = raw.types.len(),
            actions = actions.len(),
            effects = effects.len(),
            "Built metadata schema"
        );

        Self {
            properties: raw.properties,
            types: raw.types,
            context: raw.context,
            actions,
            effects,
            action_defaults: raw.action_parameters,
            effectlib_defaults: raw.effectlib_parameters,
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropertyDef> {
        self.properties.get(key)
    }

    pub fn type_def(&self, type_key: &str) -> Option<&TypeDef> {
        self.types.get(type_key)
    }

    /// Type key and definition of a property
    pub fn property_type(&self, property_key: &str) -> Option<(&str, &TypeDef)> {
        let property = self.property(property_key)?;
        let type_def = self.type_def(&property.type_key)?;
        Some((property.type_key.as_str(), type_def))
    }

    /// Options of a type, empty when the type is unknown
    pub fn options(&self, type_key: &str) -> Options {
        self.type_def(type_key)
            .map(|type_def| type_def.options.clone())
            .unwrap_or_default()
    }

    /// Context entries and properties that point at missing definitions
    pub fn dangling_references(&self) -> Vec<String> {
        let context = &self.context;
        let flat = [
            ("spell_properties", &context.spell_properties),
            ("spell_parameters", &context.spell_parameters),
            ("effect_parameters", &context.effect_parameters),
            ("effectlib_parameters", &context.effectlib_parameters),
            ("action_parameters", &context.action_parameters),
            ("compound_action_parameters", &context.compound_action_parameters),
        ];
        let per_class = context
            .actions
            .iter()
            .chain(context.effects.iter())
            .map(|(class, fields)| (class.as_str(), fields));

        let mut problems = Vec::new();
        for (context_name, fields) in flat.into_iter().chain(per_class) {
            for (field, key) in fields {
                if !self.properties.contains_key(key) {
                    problems.push(format!(
                        "{}.{} refers to missing property {}",
                        context_name, field, key
                    ));
                }
            }
        }
        for (key, property) in &self.properties {
            if !self.types.contains_key(&property.type_key) {
                problems.push(format!(
                    "property {} has missing type {}",
                    key, property.type_key
                ));
            }
        }
        problems
    }
}

/// Render a default value literal, `null` meaning no default
fn literal(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Array(items) => Some(
            items
                .iter()
                .filter_map(literal)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        other => Some(other.to_string()),
    }
}

fn defaults_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, JsonValue>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| literal(&value).map(|value| (key, value)))
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOptions {
    Map(BTreeMap<String, JsonValue>),
    List(Vec<String>),
}

fn options_map<'de, D>(deserializer: D) -> Result<Options, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawOptions>::deserialize(deserializer)? {
        Some(RawOptions::Map(map)) => map
            .into_iter()
            .map(|(value, description)| (value, literal(&description)))
            .collect(),
        Some(RawOptions::List(values)) => values.into_iter().map(|value| (value, None)).collect(),
        None => Options::new(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        Some(StringOrList::One(text)) => vec![text],
        Some(StringOrList::Many(lines)) => lines,
        None => Vec::new(),
    })
}
