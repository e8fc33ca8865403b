//! Declaration scanner for generated Go types files.
//!
//! This module parses a types file and extracts the request types that need
//! a `Validate` method, along with the types that already have one.

use crate::detect;
use crate::error::{CliResult, ParseError};
use crate::rules::{extract_rules, Rule};
use crate::syntax::{self, SourceTree};
use std::collections::BTreeSet;
use std::path::Path;

/// A struct field with its raw tag text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name (the type name for embedded fields).
    pub name: String,

    /// Full tag text without quotes, empty when the field has no tag.
    pub raw_annotation: String,
}

impl FieldSpec {
    /// Rules of the field's `validate` key.
    pub fn rules(&self) -> Vec<Rule> {
        extract_rules(&self.raw_annotation)
    }
}

/// A struct type that needs a `Validate` method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCandidate {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl TypeCandidate {
    /// Rules of every field, in field order.
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.fields.iter().flat_map(FieldSpec::rules)
    }
}

/// Result of scanning one types file.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Package name of the file.
    pub package: String,

    /// Candidate types in declaration order.
    pub candidates: Vec<TypeCandidate>,

    /// Types that already have a `Validate` method.
    pub existing_entry_points: BTreeSet<String>,

    /// The parsed file.
    pub tree: SourceTree,
}

/// Parser that finds candidate request types in Go source.
#[derive(Debug, Clone)]
pub struct DeclarationParser {
    /// Struct names ending with this suffix are candidates without tags.
    request_suffix: String,
}

impl Default for DeclarationParser {
    fn default() -> Self {
        Self::new("Req")
    }
}

impl DeclarationParser {
    /// Create a parser with the given request type suffix.
    pub fn new(request_suffix: impl Into<String>) -> Self {
        Self {
            request_suffix: request_suffix.into(),
        }
    }

    /// Parse `content` and collect candidates.
    ///
    /// A struct is a candidate if its name ends with the request suffix or
    /// any of its fields carries a non-empty `validate` rule list.
    pub fn scan(&self, content: &str, file_path: &Path) -> CliResult<ScanOutcome> {
        let tree = parse_source(content, file_path)?;

        let candidates = tree
            .structs()
            .filter_map(|(name, fields)| {
                let fields: Vec<FieldSpec> = fields
                    .iter()
                    .flat_map(|field| {
                        let tag = field.tag.clone().unwrap_or_default();
                        field.names.iter().map(move |name| FieldSpec {
                            name: name.clone(),
                            raw_annotation: tag.clone(),
                        })
                    })
                    .collect();

                let suffixed = !self.request_suffix.is_empty() && name.ends_with(&self.request_suffix);
                let annotated = fields.iter().any(|field| !field.rules().is_empty());

                (suffixed || annotated).then(|| TypeCandidate {
                    name: name.to_string(),
                    fields,
                })
            })
            .collect();

        Ok(ScanOutcome {
            package: tree.package.name.clone(),
            candidates,
            existing_entry_points: detect::entry_point_receivers(content),
            tree,
        })
    }
}

/// Parse Go source, attaching the file path to syntax errors.
pub fn parse_source(content: &str, file_path: &Path) -> Result<SourceTree, ParseError> {
    syntax::parse(content).map_err(|e| {
        ParseError::syntax(file_path.to_path_buf(), e.line, e.column, e.message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    const SOURCE: &str = r#"// Code generated by goctl. DO NOT EDIT.
package types

type LoginReq struct {
	Mobile   string `json:"mobile" validate:"required,mobile"`
	Password string `json:"password"`
}

type LoginResp struct {
	Token string `json:"token"`
}

type CreateItemReq struct {
	Name, Alias string `json:"name" validate:"required,max=32"`
	Code        string `json:"code" validate:"uuid"`
}

type ItemQuery struct {
	Page int `form:"page" validate:"gte=1"`
}

type Empty struct{}

func (r *LoginReq) Validate() error {
	return validate.Struct(r)
}
"#;

    fn scan() -> ScanOutcome {
        DeclarationParser::default()
            .scan(SOURCE, Path::new("types.go"))
            .unwrap()
    }

    #[test]
    fn test_candidates_by_suffix_and_tags() {
        let outcome = scan();
        let names: Vec<_> = outcome.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["LoginReq", "CreateItemReq", "ItemQuery"]);
        assert_eq!(outcome.package, "types");
    }

    #[test]
    fn test_multi_name_fields_share_the_tag() {
        let outcome = scan();
        let create = &outcome.candidates[1];
        let names: Vec<_> = create.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Alias", "Code"]);
        assert_eq!(create.fields[0].raw_annotation, create.fields[1].raw_annotation);
    }

    #[test]
    fn test_rules_in_field_order() {
        let outcome = scan();
        let tags: Vec<_> = outcome.candidates[1].rules().map(|r| r.tag).collect();
        assert_eq!(tags, vec!["required", "max", "required", "max", "uuid"]);
    }

    #[test]
    fn test_existing_entry_points() {
        let outcome = scan();
        assert!(outcome.existing_entry_points.contains("LoginReq"));
        assert_eq!(outcome.existing_entry_points.len(), 1);
    }

    #[test]
    fn test_custom_suffix() {
        let outcome = DeclarationParser::new("Resp")
            .scan(SOURCE, Path::new("types.go"))
            .unwrap();
        let names: Vec<_> = outcome.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["LoginReq", "LoginResp", "CreateItemReq", "ItemQuery"]);
    }

    #[test]
    fn test_syntax_error_names_file() {
        let err = DeclarationParser::default()
            .scan("package types\n\ntype A struct {\n", Path::new("api/types.go"))
            .unwrap_err();
        match err {
            CliError::Parse(ParseError::Syntax { file, line, .. }) => {
                assert_eq!(file, Path::new("api/types.go"));
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
