// src/types.rs

//! C1 Type Mapper — pure functions from SQL type strings to graph
//! primitive types, index tokenizers, and upsert eligibility.

/// Graph-side primitive type a SQL column maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphType {
    Int,
    Float,
    Bool,
    /// `date`, `datetime`, and `timestamp` all unify under this variant;
    /// Dgraph has no separate date-only scalar.
    Datetime,
    String,
}

impl GraphType {
    pub fn as_dgraph_str(&self) -> &'static str {
        match self {
            GraphType::Int => "int",
            GraphType::Float => "float",
            GraphType::Bool => "bool",
            GraphType::Datetime => "datetime",
            GraphType::String => "string",
        }
    }
}

/// Index tokenizer Dgraph should use for a predicate of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tokenizer {
    Int,
    Float,
    Bool,
    Hour,
    Term,
    Exact,
}

impl Tokenizer {
    pub fn as_dgraph_str(&self) -> &'static str {
        match self {
            Tokenizer::Int => "int",
            Tokenizer::Float => "float",
            Tokenizer::Bool => "bool",
            Tokenizer::Hour => "hour",
            Tokenizer::Term => "term",
            Tokenizer::Exact => "exact",
        }
    }
}

/// Column-name substrings that promote a string predicate from the
/// `term` tokenizer to `exact`.
const EXACT_HINT_NAMES: &[&str] = &["id", "email", "username", "slug"];

/// Column-name substrings that mark a predicate eligible for `@upsert`
/// (in addition to primary keys).
const UNIQUE_HINT_NAMES: &[&str] = &["email", "username", "slug", "code", "uuid"];

/// Map a SQL column type string to its graph primitive type.
///
/// Never fails: unrecognized inputs fall through to `GraphType::String`.
pub fn map_sql_type(sql_type: &str) -> GraphType {
    let lower = sql_type.to_ascii_lowercase();
    let base = lower
        .split(|c: char| c == '(' || c == ' ')
        .next()
        .unwrap_or(&lower);

    // tinyint(1) and the boolean families must be checked before the
    // general integer check below, since `tinyint` would otherwise match
    // the integer branch first.
    if base == "boolean" || base == "bool" {
        return GraphType::Bool;
    }
    if base == "tinyint" && lower.contains("(1)") {
        return GraphType::Bool;
    }

    match base {
        "int" | "integer" | "bigint" | "smallint" | "mediumint" | "tinyint" => GraphType::Int,
        "float" | "double" | "decimal" | "numeric" | "real" => GraphType::Float,
        "date" | "datetime" | "timestamp" => GraphType::Datetime,
        "json" => GraphType::String,
        _ => GraphType::String,
    }
}

/// Determine the index tokenizer for a column given its mapped type and
/// column name (the string-type default is overridden to `exact` for
/// columns that look like identifiers or unique lookup keys).
pub fn tokenizer_for(graph_type: GraphType, column_name: &str) -> Tokenizer {
    match graph_type {
        GraphType::Int => Tokenizer::Int,
        GraphType::Float => Tokenizer::Float,
        GraphType::Bool => Tokenizer::Bool,
        GraphType::Datetime => Tokenizer::Hour,
        GraphType::String => {
            let lower = column_name.to_ascii_lowercase();
            if EXACT_HINT_NAMES.iter().any(|hint| lower.contains(hint)) {
                Tokenizer::Exact
            } else {
                Tokenizer::Term
            }
        }
    }
}

/// Whether a predicate should carry the `@upsert` directive: it is a
/// primary key, or its column name matches one of the unique-hint names.
pub fn wants_upsert(column_name: &str, is_primary_key: bool) -> bool {
    if is_primary_key {
        return true;
    }
    let lower = column_name.to_ascii_lowercase();
    UNIQUE_HINT_NAMES.iter().any(|hint| lower.contains(hint))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_families_map_to_int() {
        for t in ["int", "INT", "bigint", "smallint", "mediumint", "int(11)"] {
            assert_eq!(map_sql_type(t), GraphType::Int, "{t}");
        }
    }

    #[test]
    fn tinyint_one_is_bool_but_wider_tinyint_is_int() {
        assert_eq!(map_sql_type("tinyint(1)"), GraphType::Bool);
        assert_eq!(map_sql_type("tinyint(4)"), GraphType::Int);
        assert_eq!(map_sql_type("tinyint"), GraphType::Int);
        assert_eq!(map_sql_type("boolean"), GraphType::Bool);
        assert_eq!(map_sql_type("bool"), GraphType::Bool);
    }

    #[test]
    fn floating_and_fixed_decimal_map_to_float() {
        for t in ["float", "double", "decimal(10,2)", "numeric(5,0)"] {
            assert_eq!(map_sql_type(t), GraphType::Float, "{t}");
        }
    }

    #[test]
    fn date_family_unifies_under_datetime() {
        for t in ["date", "datetime", "timestamp"] {
            assert_eq!(map_sql_type(t), GraphType::Datetime, "{t}");
        }
    }

    #[test]
    fn json_and_unknown_types_fall_through_to_string() {
        assert_eq!(map_sql_type("json"), GraphType::String);
        assert_eq!(map_sql_type("enum('a','b')"), GraphType::String);
        assert_eq!(map_sql_type("some_made_up_type"), GraphType::String);
    }

    #[test]
    fn tokenizer_defaults_to_term_for_strings_except_id_like_columns() {
        assert_eq!(
            tokenizer_for(GraphType::String, "description"),
            Tokenizer::Term
        );
        assert_eq!(tokenizer_for(GraphType::String, "id"), Tokenizer::Exact);
        assert_eq!(
            tokenizer_for(GraphType::String, "author_id"),
            Tokenizer::Exact
        );
        assert_eq!(
            tokenizer_for(GraphType::String, "email"),
            Tokenizer::Exact
        );
        assert_eq!(
            tokenizer_for(GraphType::String, "username"),
            Tokenizer::Exact
        );
    }

    #[test]
    fn tokenizer_for_non_string_types_ignores_column_name() {
        assert_eq!(tokenizer_for(GraphType::Int, "anything"), Tokenizer::Int);
        assert_eq!(
            tokenizer_for(GraphType::Datetime, "created_at"),
            Tokenizer::Hour
        );
    }

    #[test]
    fn upsert_marks_primary_keys_and_unique_hint_names() {
        assert!(wants_upsert("id", true));
        assert!(wants_upsert("email", false));
        assert!(wants_upsert("username", false));
        assert!(wants_upsert("slug", false));
        assert!(wants_upsert("code", false));
        assert!(wants_upsert("uuid", false));
        assert!(!wants_upsert("description", false));
    }
}
