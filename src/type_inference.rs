//! Mapping from validation tokens to OpenAPI `{type, format}` pairs.

/// Tokens that carry type information, in no particular order
const ALLOWED_TYPES: &[&str] = &[
    "string",
    "int",
    "integer",
    "number",
    "date",
    "date_format",
    "url",
    "uuid",
    "email",
    "boolean",
    "bool",
    "array",
];

/// OpenAPI type and optional format inferred from a token list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMapping {
    /// `None` when no token names a known type
    pub schema_type: Option<String>,
    pub format: Option<String>,
}

impl TypeMapping {
    fn new(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: format.map(str::to_string),
        }
    }
}

/// Infer the OpenAPI type of a field from its validation tokens.
///
/// The first token naming a known type wins. Parameterised tokens such as
/// `date_format:Y-m-d H:i` are matched on the part before the colon.
pub fn infer(tokens: &[String]) -> TypeMapping {
    let Some(token) = tokens.iter().find(|token| ALLOWED_TYPES.contains(&token_name(token))) else {
        return TypeMapping::default();
    };

    match token_name(token) {
        "bool" | "boolean" => TypeMapping::new("boolean", None),
        "int" | "integer" => TypeMapping::new("integer", None),
        "date" => TypeMapping::new("string", Some("date")),
        "date_format" => {
            let pattern = token.split_once(':').map(|(_, p)| p).unwrap_or_default();
            if has_time_component(pattern) {
                TypeMapping::new("string", Some("date-time"))
            } else {
                TypeMapping::new("string", Some("date"))
            }
        }
        "url" => TypeMapping::new("string", Some("url")),
        "uuid" => TypeMapping::new("string", Some("uuid")),
        "email" => TypeMapping::new("string", Some("email")),
        other => TypeMapping::new(other, None),
    }
}

fn token_name(token: &str) -> &str {
    token.split(':').next().unwrap_or(token).trim()
}

fn has_time_component(pattern: &str) -> bool {
    pattern.contains("H:i") || pattern.contains("h:i")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn mapping(list: &[&str]) -> (Option<String>, Option<String>) {
        let result = infer(&tokens(list));
        (result.schema_type, result.format)
    }

    #[test]
    fn test_normalized_types() {
        assert_eq!(mapping(&["bool"]), (Some("boolean".into()), None));
        assert_eq!(mapping(&["boolean"]), (Some("boolean".into()), None));
        assert_eq!(mapping(&["int"]), (Some("integer".into()), None));
        assert_eq!(mapping(&["integer"]), (Some("integer".into()), None));
        assert_eq!(mapping(&["number"]), (Some("number".into()), None));
        assert_eq!(mapping(&["string"]), (Some("string".into()), None));
        assert_eq!(mapping(&["array"]), (Some("array".into()), None));
    }

    #[test]
    fn test_string_formats() {
        assert_eq!(mapping(&["date"]), (Some("string".into()), Some("date".into())));
        assert_eq!(mapping(&["email"]), (Some("string".into()), Some("email".into())));
        assert_eq!(mapping(&["url"]), (Some("string".into()), Some("url".into())));
        assert_eq!(mapping(&["uuid"]), (Some("string".into()), Some("uuid".into())));
    }

    #[test]
    fn test_date_format_with_time() {
        assert_eq!(
            mapping(&["date_format:Y-m-d H:i:s"]),
            (Some("string".into()), Some("date-time".into()))
        );
        assert_eq!(
            mapping(&["date_format:h:i A"]),
            (Some("string".into()), Some("date-time".into()))
        );
        assert_eq!(
            mapping(&["date_format:Y-m-d"]),
            (Some("string".into()), Some("date".into()))
        );
    }

    #[test]
    fn test_first_type_token_wins() {
        assert_eq!(
            mapping(&["required", "max:255", "email", "string"]),
            (Some("string".into()), Some("email".into()))
        );
        assert_eq!(mapping(&["nullable", "int", "string"]), (Some("integer".into()), None));
    }

    #[test]
    fn test_unknown_tokens_have_no_type() {
        assert_eq!(infer(&tokens(&["required", "max:20"])), TypeMapping::default());
        assert_eq!(infer(&[]), TypeMapping::default());
        assert_eq!(infer(&tokens(&["datetime"])), TypeMapping::default());
    }
}
