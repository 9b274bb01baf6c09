//! Map a hierarchy path onto the schema entries valid at that position

use std::collections::BTreeMap;

use tracing::debug;

use super::{CompletionOptions, Cursor, Dialect, Target};
use crate::hierarchy::{walk_hierarchy, SpellPath};
use crate::parser::{indent_width, is_list_item, leaf_key, TextBuffer};
use crate::scanner::{map_or_list_value_type, CollectionKind, ListPosition, Parent, Scanner};
use crate::schema::{ClassDef, ClassRegistry, FieldMap, MagicSchema, Options};

const ACTION_TRIGGERS: [(&str, &str); 4] = [
    ("cast", "cast_actions"),
    ("alternate_up", "alternate_up_actions"),
    ("alternate_down", "alternate_down_actions"),
    ("alternate_sneak", "alternate_sneak_actions"),
];

const EFFECT_TRIGGERS: [(&str, &str); 12] = [
    ("cast", "cast_effect_list"),
    ("tick", "tick_effect_list"),
    ("hit", "hit_effect_list"),
    ("hit_entity", "hit_entity_effect_list"),
    ("hit_block", "hit_block_effect_list"),
    ("blockmiss", "blockmiss_effect_list"),
    ("prehit", "prehit_effect_list"),
    ("step", "step_effect_list"),
    ("reflect", "reflect_effect_list"),
    ("miss", "miss_effect_list"),
    ("headshot", "headshot_effect_list"),
    ("projectile", "projectile_effect_list"),
];

const NEW_ACTION: (&str, &str) = ("- class", "Add a new action to this list");
const NEW_EFFECT: (&str, &str) = ("- location", "Add a new effect to this list");

/// Where candidate descriptions are looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DescriptionSource {
    /// Values are property keys
    Properties,
    /// Values are action class keys
    Actions,
    /// Values are effectlib class keys
    Effects,
    /// Values are the descriptions themselves
    Literal,
}

/// Unranked candidates for one request
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawCandidates {
    pub primary: Options,
    pub inherited: Option<Options>,
    pub default_value: Option<String>,
    /// Type key of the value being completed
    pub value_type: Option<String>,
    pub source: DescriptionSource,
    pub suffix: &'static str,
    pub target: Target,
}

impl RawCandidates {
    fn keys() -> Self {
        Self {
            primary: Options::new(),
            inherited: None,
            default_value: None,
            value_type: None,
            source: DescriptionSource::Properties,
            suffix: ": ",
            target: Target::Key,
        }
    }

    fn values() -> Self {
        Self {
            suffix: "",
            source: DescriptionSource::Literal,
            target: Target::Value,
            ..Self::keys()
        }
    }
}

fn field_options(fields: &FieldMap) -> Options {
    fields
        .iter()
        .map(|(field, key)| (field.clone(), Some(key.clone())))
        .collect()
}

fn fixed_options(entries: &[(&str, &str)]) -> Options {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), Some(value.to_string())))
        .collect()
}

/// Prefix every candidate with a list dash unless the line already has one
fn make_list(options: Options, line: &str) -> Options {
    if is_list_item(line) {
        return options;
    }
    options
        .into_iter()
        .map(|(key, value)| (format!("- {}", key), value))
        .collect()
}

/// One polymorphic class family: actions or effectlib effects
struct ClassFamily<'s> {
    registry: &'s ClassRegistry,
    generic: &'s FieldMap,
    generic_defaults: &'s BTreeMap<String, String>,
    compound: Option<&'s FieldMap>,
    source: DescriptionSource,
}

impl<'s> ClassFamily<'s> {
    fn actions(schema: &'s MagicSchema) -> Self {
        Self {
            registry: &schema.actions,
            generic: &schema.context.action_parameters,
            generic_defaults: &schema.action_defaults,
            compound: Some(&schema.context.compound_action_parameters),
            source: DescriptionSource::Actions,
        }
    }

    fn effects(schema: &'s MagicSchema) -> Self {
        Self {
            registry: &schema.effects,
            generic: &schema.context.effectlib_parameters,
            generic_defaults: &schema.effectlib_defaults,
            compound: None,
            source: DescriptionSource::Effects,
        }
    }

    /// Property key of `field`, generic parameters first, then the class
    fn property_key(&self, class: Option<&ClassDef>, field: &str) -> Option<String> {
        self.generic
            .get(field)
            .or_else(|| class.and_then(|class| class.fields.get(field)))
            .or_else(|| {
                class
                    .filter(|class| class.is_compound())
                    .and(self.compound)
                    .and_then(|compound| compound.get(field))
            })
            .cloned()
    }

    /// Default of a property, the class's own before the generic one
    fn default_for(&self, class: Option<&ClassDef>, property_key: &str) -> Option<String> {
        class
            .and_then(|class| class.defaults.get(property_key))
            .or_else(|| self.generic_defaults.get(property_key))
            .cloned()
    }

    /// Generic parameters a class inherits
    fn inherited(&self, class: Option<&ClassDef>) -> Options {
        let mut inherited = field_options(self.generic);
        if let (Some(compound), Some(true)) = (self.compound, class.map(ClassDef::is_compound)) {
            inherited.extend(field_options(compound));
        }
        inherited
    }
}

/// Everything known about the cursor position
pub(crate) struct Request<'a, B: TextBuffer + ?Sized> {
    pub schema: &'a MagicSchema,
    pub scanner: Scanner<'a, B>,
    pub path: SpellPath,
    pub line: usize,
    /// Indentation of the cursor line, clamped to the cursor column
    pub indent: usize,
    /// The cursor line already has `key:`; complete its value
    pub leaf: bool,
    pub dialect: Dialect,
    /// Drop keys already present beside the cursor
    pub exclude_siblings: bool,
}

impl<'a, B: TextBuffer + ?Sized> Request<'a, B> {
    pub fn new(
        schema: &'a MagicSchema,
        buffer: &'a B,
        cursor: Cursor,
        options: CompletionOptions,
    ) -> Self {
        let text = buffer.line(cursor.line);
        let ancestors = walk_hierarchy(buffer, cursor.line, cursor.col, options.tab_size);
        let path = SpellPath::normalize(&ancestors, options.dialect.root_properties(schema));
        let leaf = leaf_key(text).is_some();
        debug!(path = ?path.segments(), leaf, "Resolved hierarchy");

        Self {
            schema,
            scanner: Scanner::new(buffer, options.tab_size),
            path,
            line: cursor.line,
            indent: indent_width(text, options.tab_size).min(cursor.col),
            leaf,
            dialect: options.dialect,
            exclude_siblings: true,
        }
    }

    /// Treat the key on `line` as if it were being typed, for lookups of
    /// the property behind an existing key.
    pub fn for_existing_key(
        schema: &'a MagicSchema,
        buffer: &'a B,
        line: usize,
        options: CompletionOptions,
    ) -> Option<(Self, String)> {
        let text = buffer.line(line);
        let key = leaf_key(text)?.to_string();
        let col = text.chars().count();
        let mut request = Self::new(schema, buffer, Cursor::new(line, col), options);
        request.path.clear_field();
        request.leaf = false;
        request.exclude_siblings = false;
        Some((request, key))
    }

    /// Property key behind an existing `key` at this position
    pub fn property_for_key(&self, key: &str) -> Option<String> {
        let raw = resolve_candidates(self);
        if raw.source != DescriptionSource::Properties {
            return None;
        }
        raw.primary
            .get(key)
            .or_else(|| raw.inherited.as_ref()?.get(key))
            .cloned()
            .flatten()
    }

    /// Default value of a class parameter at this position
    pub fn default_for_property(&self, property_key: &str) -> Option<String> {
        let family = self.class_family()?;
        let class = self.current_class(family.registry);
        family.default_for(class, property_key)
    }

    /// The class family governing the cursor's block, if any
    fn class_family(&self) -> Option<ClassFamily<'a>> {
        match (self.dialect, self.path.get(1)) {
            (Dialect::Spells, "actions") => Some(ClassFamily::actions(self.schema)),
            (Dialect::Spells, "effects") if self.path.get(3) == "effectlib" => {
                Some(ClassFamily::effects(self.schema))
            }
            (Dialect::Effects, "effectlib") => Some(ClassFamily::effects(self.schema)),
            _ => None,
        }
    }

    fn current_line(&self) -> &str {
        self.scanner.buffer().line(self.line)
    }

    fn list_position(&self) -> ListPosition {
        self.scanner.list_position(self.line, self.indent)
    }

    /// Dash-prefix candidates when the cursor starts a new list element
    fn check_list(&self, options: Options) -> Options {
        if self.list_position() == ListPosition::NewItem {
            make_list(options, self.current_line())
        } else {
            options
        }
    }

    fn current_class(&self, registry: &'a ClassRegistry) -> Option<&'a ClassDef> {
        let name = self
            .scanner
            .current_class(self.line, self.indent, Some(registry.suffix()))?;
        registry.get(&name)
    }

    /// Candidates one level inside a map- or list-typed property
    fn collection_candidates(&self, property_key: Option<&str>) -> RawCandidates {
        let mut raw = RawCandidates::keys();
        raw.source = DescriptionSource::Literal;
        let Some(collection) = property_key.and_then(|key| map_or_list_value_type(self.schema, key))
        else {
            return raw;
        };
        match collection.kind {
            CollectionKind::Map => raw.primary = collection.options,
            CollectionKind::List => {
                raw.primary = make_list(collection.options, self.current_line());
                raw.suffix = "";
            }
        }
        raw
    }

    /// The property behind the key enclosing the cursor, resolved through the
    /// class declared beside that key.
    fn enclosing_property(&self, parent: &Parent, family: &ClassFamily<'_>) -> Option<String> {
        let class = self
            .scanner
            .current_class(parent.line, parent.indent, Some(family.registry.suffix()))
            .and_then(|name| family.registry.get(&name));
        family.property_key(class, &parent.key)
    }
}

/// Resolve raw candidates for a request
pub(crate) fn resolve_candidates<B: TextBuffer + ?Sized>(request: &Request<'_, B>) -> RawCandidates {
    let mut raw = match (request.dialect, request.leaf) {
        (Dialect::Spells, true) => spell_values(request),
        (Dialect::Spells, false) => spell_keys(request),
        (Dialect::Effects, true) => effect_values(request),
        (Dialect::Effects, false) => effect_keys(request),
    };

    if raw.target == Target::Key && request.exclude_siblings {
        let siblings = request.scanner.collect_siblings(request.line, request.indent);
        raw.primary.retain(|key, _| !siblings.contains_key(key));
        if let Some(inherited) = raw.inherited.as_mut() {
            inherited.retain(|key, _| !siblings.contains_key(key));
        }
    }
    raw
}

/// Value candidates for a property key, with the default if one is known
fn property_values(schema: &MagicSchema, property_key: Option<&str>, default: Option<String>) -> RawCandidates {
    let mut raw = RawCandidates::values();
    raw.default_value = default;
    let Some(property_key) = property_key else {
        return raw;
    };
    if let Some((type_key, type_def)) = schema.property_type(property_key) {
        raw.value_type = Some(type_key.to_string());
        raw.primary = if type_def.options.is_empty() {
            map_or_list_value_type(schema, property_key)
                .map(|collection| collection.options)
                .unwrap_or_default()
        } else {
            type_def.options.clone()
        };
    }
    raw
}

fn class_names(family: &ClassFamily<'_>) -> RawCandidates {
    RawCandidates {
        primary: family.registry.names(),
        source: family.source,
        target: Target::Class,
        ..RawCandidates::values()
    }
}

/// Values of a class parameter: the property comes from the generic layer or
/// the class, the default from the class or the generic layer.
fn class_parameter_values<'a, B: TextBuffer + ?Sized>(
    request: &Request<'a, B>,
    family: &ClassFamily<'a>,
) -> RawCandidates {
    let class = request.current_class(family.registry);
    let property_key = family.property_key(class, request.path.field());
    let default = property_key
        .as_deref()
        .and_then(|key| family.default_for(class, key));
    property_values(request.schema, property_key.as_deref(), default)
}

fn spell_values<B: TextBuffer + ?Sized>(request: &Request<'_, B>) -> RawCandidates {
    let schema = request.schema;
    let context = &schema.context;
    let path = &request.path;
    let depth = path.len();
    let field = path.field();
    let section = path.get(1);

    if depth == 2 {
        debug!("Spell property value");
        return property_values(schema, context.spell_properties.get(field).map(String::as_str), None);
    }
    if depth == 3 && section == "parameters" {
        if let Some(key) = context.spell_parameters.get(field) {
            return property_values(schema, Some(key), None);
        }
        debug!("Parameter value from declared action classes");
        let mut raw = RawCandidates::values();
        for class in request.scanner.find_declared_action_classes(path.spell_line()) {
            let key = schema.actions.get(&class).and_then(|class| class.fields.get(field));
            if let Some(key) = key {
                let values = property_values(schema, Some(key), None);
                raw.value_type = raw.value_type.or(values.value_type);
                raw.primary.extend(values.primary);
            }
        }
        return raw;
    }
    if depth >= 3 && section == "actions" && field == "class" {
        return class_names(&ClassFamily::actions(schema));
    }
    if depth >= 4 && section == "effects" && path.parent() == "effectlib" && field == "class" {
        return class_names(&ClassFamily::effects(schema));
    }
    if depth >= 3 && section == "actions" {
        return class_parameter_values(request, &ClassFamily::actions(schema));
    }
    if depth >= 4 && section == "effects" && path.parent() == "effectlib" {
        return class_parameter_values(request, &ClassFamily::effects(schema));
    }
    if depth >= 4 && section == "effects" {
        return property_values(schema, context.effect_parameters.get(field).map(String::as_str), None);
    }
    RawCandidates::values()
}

fn spell_keys<B: TextBuffer + ?Sized>(request: &Request<'_, B>) -> RawCandidates {
    let schema = request.schema;
    let context = &schema.context;
    let path = &request.path;
    let depth = path.len();
    let section = path.get(1);

    if request.scanner.is_misaligned_list_item(request.line, request.indent) {
        debug!("Misaligned list item");
        return RawCandidates::keys();
    }

    let mut raw = RawCandidates::keys();
    if depth == 2 {
        raw.primary = field_options(&context.spell_properties);
    } else if depth >= 3 && section == "parameters" {
        return parameter_keys(request);
    } else if depth == 4 && section == "effects" {
        let options = field_options(&context.effect_parameters);
        let after_list_item = request
            .scanner
            .previous_sibling(request.line, request.indent)
            .is_some_and(|sibling| sibling.starts_with('-'));
        raw.primary = if after_list_item {
            make_list(options, request.current_line())
        } else {
            request.check_list(options)
        };
    } else if depth >= 5 && section == "effects" && path.get(3) == "effectlib" {
        let family = ClassFamily::effects(schema);
        let class = request.current_class(family.registry);
        raw.primary = class.map(|class| field_options(&class.fields)).unwrap_or_default();
        raw.inherited = Some(family.inherited(class));
    } else if depth >= 5 && section == "effects" {
        let family = ClassFamily::effects(schema);
        let key = request
            .scanner
            .parent_key(request.line, request.indent)
            .and_then(|parent| {
                context
                    .effect_parameters
                    .get(&parent.key)
                    .cloned()
                    .or_else(|| request.enclosing_property(&parent, &family))
            });
        return request.collection_candidates(key.as_deref());
    } else if depth >= 3 && section == "actions" {
        return action_keys(request);
    } else if depth == 3 && (section == "costs" || section == "active_costs") {
        raw.primary = schema.options("cost_type");
        raw.source = DescriptionSource::Literal;
    } else if depth == 3 && section == "effects" {
        raw.primary = fixed_options(&EFFECT_TRIGGERS);
        if request.list_position() == ListPosition::NewItem {
            raw.primary.extend(fixed_options(&[NEW_EFFECT]));
        }
    }
    raw
}

/// New keys inside `parameters`, drawn from the actions the spell declares
fn parameter_keys<B: TextBuffer + ?Sized>(request: &Request<'_, B>) -> RawCandidates {
    let schema = request.schema;
    let path = &request.path;

    let mut fields = FieldMap::new();
    for class in request.scanner.find_declared_action_classes(path.spell_line()) {
        if let Some(class) = schema.actions.get(&class) {
            fields.extend(class.fields.clone());
        }
    }

    if path.len() == 3 {
        let mut raw = RawCandidates::keys();
        raw.primary = field_options(&fields);
        raw.inherited = Some(field_options(&schema.context.spell_parameters));
        return raw;
    }

    let enclosing = path.parent();
    let key = fields
        .get(enclosing)
        .or_else(|| schema.context.spell_parameters.get(enclosing));
    request.collection_candidates(key.map(String::as_str))
}

/// New keys inside an action list
fn action_keys<B: TextBuffer + ?Sized>(request: &Request<'_, B>) -> RawCandidates {
    let schema = request.schema;
    let depth = request.path.len();
    let family = ClassFamily::actions(schema);
    let position = request.list_position();
    let parent = request.scanner.parent_key(request.line, request.indent);

    let mut raw = match request.current_class(family.registry) {
        Some(class) => {
            let mut raw = RawCandidates::keys();
            raw.primary = request.check_list(field_options(&class.fields));
            raw.inherited = Some(request.check_list(family.inherited(Some(class))));
            raw
        }
        None if request
            .scanner
            .current_class(request.line, request.indent, None)
            .is_some() =>
        {
            // Declared but unknown class: only the generic layer applies
            let mut raw = RawCandidates::keys();
            raw.inherited = Some(request.check_list(family.inherited(None)));
            raw
        }
        None if depth == 3 => {
            let mut raw = RawCandidates::keys();
            raw.primary = fixed_options(&ACTION_TRIGGERS);
            raw
        }
        None => {
            let key = parent
                .as_ref()
                .and_then(|parent| request.enclosing_property(parent, &family));
            request.collection_candidates(key.as_deref())
        }
    };

    let in_action_list = parent.as_ref().is_some_and(|parent| parent.key == "actions");
    if depth > 3 && (in_action_list || position == ListPosition::NewItem) {
        raw.primary.extend(fixed_options(&[NEW_ACTION]));
    }
    raw
}

fn effect_values<B: TextBuffer + ?Sized>(request: &Request<'_, B>) -> RawCandidates {
    let schema = request.schema;
    let path = &request.path;
    let depth = path.len();
    let field = path.field();

    if depth == 2 {
        let key = schema.context.effect_parameters.get(field);
        return property_values(schema, key.map(String::as_str), None);
    }
    if depth >= 3 && path.get(1) == "effectlib" {
        if field == "class" {
            return class_names(&ClassFamily::effects(schema));
        }
        return class_parameter_values(request, &ClassFamily::effects(schema));
    }
    RawCandidates::values()
}

fn effect_keys<B: TextBuffer + ?Sized>(request: &Request<'_, B>) -> RawCandidates {
    let schema = request.schema;
    let path = &request.path;
    let depth = path.len();

    if request.scanner.is_misaligned_list_item(request.line, request.indent) {
        return RawCandidates::keys();
    }

    if depth == 2 {
        let mut raw = RawCandidates::keys();
        raw.primary = request.check_list(field_options(&schema.context.effect_parameters));
        return raw;
    }
    let family = ClassFamily::effects(schema);
    if depth >= 3 && path.get(1) == "effectlib" {
        let class = request.current_class(family.registry);
        let mut raw = RawCandidates::keys();
        raw.primary = class.map(|class| field_options(&class.fields)).unwrap_or_default();
        raw.inherited = Some(family.inherited(class));
        return raw;
    }

    let key = request
        .scanner
        .parent_key(request.line, request.indent)
        .and_then(|parent| {
            schema
                .context
                .effect_parameters
                .get(&parent.key)
                .cloned()
                .or_else(|| request.enclosing_property(&parent, &family))
        });
    request.collection_candidates(key.as_deref())
}
