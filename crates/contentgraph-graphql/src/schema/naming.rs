//! Name derivation for synthesized types, fields and enum values.
//!
//! All names are derived from content model identifiers, so two runs over
//! the same model always produce the same schema.

use convert_case::{Case, Casing};

/// Prefix carried by enum values that would otherwise be invalid names.
pub const ENUM_VALUE_PREFIX: &str = "__";

/// Suffix of the raw field wrapper accessor (`fieldTagsRaw`).
pub const RAW_FIELD_SUFFIX: &str = "Raw";

/// Type name for an identifier: `taxonomy_term` -> `TaxonomyTerm`.
#[must_use]
pub fn type_name(id: &str) -> String {
    id.to_case(Case::Pascal)
}

/// Field name for an identifier: `field_tags` -> `fieldTags`.
#[must_use]
pub fn field_name(id: &str) -> String {
    id.to_case(Case::Camel)
}

/// Concrete type of a kind without sub-kinds.
#[must_use]
pub fn kind_type_name(kind: &str) -> String {
    type_name(kind)
}

/// Concrete type of one sub-kind: `node` + `article` -> `NodeArticle`.
#[must_use]
pub fn sub_kind_type_name(kind: &str, sub_kind: &str) -> String {
    format!("{}{}", type_name(kind), type_name(sub_kind))
}

/// Interface shared by all sub-kinds of a kind.
#[must_use]
pub fn kind_interface_name(kind: &str) -> String {
    format!("{}Interface", type_name(kind))
}

/// Union over all exposed sub-kinds of a kind.
#[must_use]
pub fn kind_union_name(kind: &str) -> String {
    format!("{}Union", type_name(kind))
}

/// Union dedicated to one reference field.
#[must_use]
pub fn field_union_name(owner_type: &str, field: &str) -> String {
    format!("{owner_type}{}Union", type_name(field))
}

/// Wrapper list type for a type tag.
#[must_use]
pub fn item_list_name(tag: &str) -> String {
    format!("FieldItemList{}", type_name(tag))
}

/// Wrapper item type for a type tag.
#[must_use]
pub fn item_type_name(tag: &str) -> String {
    format!("FieldItemType{}", type_name(tag))
}

/// Structured value type for a mapping field or nested property path on
/// `owner`: (`User`, `field_address`) -> `UserFieldAddressRecord`.
#[must_use]
pub fn record_type_name(owner: &str, path: &str) -> String {
    format!("{owner}{}Record", type_name(path))
}

/// Raw field accessor name: `field_tags` -> `fieldTagsRaw`.
#[must_use]
pub fn raw_field_name(machine_name: &str) -> String {
    format!("{}{RAW_FIELD_SUFFIX}", field_name(machine_name))
}

/// Query root field loading one entity: `taxonomy_term` -> `taxonomyTerm`.
#[must_use]
pub fn load_field_name(kind: &str) -> String {
    field_name(kind)
}

/// Query root connection field: `node` -> `nodeItems`, `node`/`article` -> `nodeArticleItems`.
#[must_use]
pub fn connection_field_name(kind: &str, sub_kind: Option<&str>) -> String {
    match sub_kind {
        Some(sub_kind) => format!("{}{}Items", field_name(kind), type_name(sub_kind)),
        None => format!("{}Items", field_name(kind)),
    }
}

/// Connection type name for a kind or sub-kind.
#[must_use]
pub fn connection_type_name(kind: &str, sub_kind: Option<&str>) -> String {
    match sub_kind {
        Some(sub_kind) => format!("{}Connection", sub_kind_type_name(kind, sub_kind)),
        None => format!("{}Connection", type_name(kind)),
    }
}

/// Edge type name for a kind or sub-kind.
#[must_use]
pub fn edge_type_name(kind: &str, sub_kind: Option<&str>) -> String {
    match sub_kind {
        Some(sub_kind) => format!("{}Edge", sub_kind_type_name(kind, sub_kind)),
        None => format!("{}Edge", type_name(kind)),
    }
}

/// Returns `true` if `id` is a machine name (`[a-z0-9_]+`).
#[must_use]
pub fn is_machine_name(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Encodes a machine name as an enum value.
///
/// The value is the upper-cased identifier. Identifiers starting with a digit
/// (invalid as names) or already starting with the prefix (ambiguous on the
/// way back) get [`ENUM_VALUE_PREFIX`]. Returns `None` for identifiers that
/// are not machine names.
#[must_use]
pub fn encode_enum_value(raw: &str) -> Option<String> {
    if !is_machine_name(raw) {
        return None;
    }
    let upper = raw.to_ascii_uppercase();
    let needs_prefix = raw.starts_with(|c: char| c.is_ascii_digit())
        || raw.starts_with(ENUM_VALUE_PREFIX);
    Some(if needs_prefix {
        format!("{ENUM_VALUE_PREFIX}{upper}")
    } else {
        upper
    })
}

/// Decodes an enum value back into the machine name it was built from.
#[must_use]
pub fn decode_enum_value(value: &str) -> String {
    value
        .strip_prefix(ENUM_VALUE_PREFIX)
        .unwrap_or(value)
        .to_ascii_lowercase()
}

/// Validates a GraphQL name (`[_A-Za-z][_0-9A-Za-z]*`).
#[must_use]
pub fn is_valid_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
