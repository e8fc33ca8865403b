//! Validation rules found in struct tags.
//!
//! A struct tag such as `json:"mobile" validate:"required,mobile"` carries a
//! comma-separated rule list. Each rule is either one of the validator's
//! built-in tags or a custom tag that needs a registered function.

use regex::Regex;
use std::sync::LazyLock;

/// Tags the validator engine implements itself.
pub const BUILTIN_RULES: &[&str] = &[
    "required",
    "email",
    "url",
    "ip",
    "min",
    "max",
    "len",
    "eq",
    "ne",
    "lt",
    "lte",
    "gt",
    "gte",
    "oneof",
    "numeric",
    "alpha",
    "alphanum",
    "omitempty",
];

/// Custom rules that are always registered, with their function names.
pub const SEEDED_RULES: &[(&str, &str)] = &[("idcard", "validateIdCard"), ("mobile", "validateMobile")];

static VALIDATE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)validate:"([^"]*)""#).expect("valid regex"));

/// Whether a rule is handled by the engine or needs a registered function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    BuiltIn,
    Custom,
}

/// One rule from a `validate` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub tag: String,
    /// Parameters after `=`, split on whitespace (`oneof=a b c`).
    pub params: Option<Vec<String>>,
}

impl Rule {
    /// Parse a single rule token such as `gt=0` or `mobile`.
    ///
    /// Returns `None` for empty tokens.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }

        let (tag, params) = match token.split_once('=') {
            Some((tag, params)) => (
                tag.trim(),
                Some(params.split_whitespace().map(str::to_string).collect()),
            ),
            None => (token, None),
        };

        if tag.is_empty() {
            return None;
        }

        Some(Self {
            tag: tag.to_string(),
            params,
        })
    }

    pub fn kind(&self) -> RuleKind {
        if is_builtin(&self.tag) {
            RuleKind::BuiltIn
        } else {
            RuleKind::Custom
        }
    }

    pub fn is_custom(&self) -> bool {
        self.kind() == RuleKind::Custom
    }

    /// Name of the Go function implementing this rule.
    pub fn function_name(&self) -> String {
        function_name(&self.tag)
    }
}

/// Whether `tag` is one of the engine's built-in rules.
pub fn is_builtin(tag: &str) -> bool {
    BUILTIN_RULES.contains(&tag)
}

/// Go function name for a custom tag.
///
/// Seeded tags keep their fixed names. Other tags become `validate` followed
/// by the tag with its first letter upper-cased; characters that cannot
/// appear in a Go identifier are replaced by `_`.
pub fn function_name(tag: &str) -> String {
    if let Some((_, name)) = SEEDED_RULES.iter().find(|(seeded, _)| *seeded == tag) {
        return (*name).to_string();
    }

    let mut name = String::from("validate");
    for (i, c) in tag.chars().enumerate() {
        let c = if c.is_alphanumeric() || c == '_' { c } else { '_' };
        if i == 0 {
            name.extend(c.to_uppercase());
        } else {
            name.push(c);
        }
    }
    name
}

/// Extract the rules of the `validate` key from a full struct tag.
///
/// Tokens are split on `,` and `|` alternatives are listed separately.
/// Empty tokens are dropped. A tag without a `validate` key yields nothing.
pub fn extract_rules(tag: &str) -> Vec<Rule> {
    let Some(captures) = VALIDATE_TAG.captures(tag) else {
        return Vec::new();
    };
    let Some(list) = captures.get(1) else {
        return Vec::new();
    };

    list.as_str()
        .split(',')
        .flat_map(|token| token.split('|'))
        .filter_map(Rule::parse)
        .collect()
}
