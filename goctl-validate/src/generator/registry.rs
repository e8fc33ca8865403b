//! Registry file (`validation.go`) rendering.
//!
//! Three cases:
//! - no file yet: render the complete file from templates;
//! - the rule map is found: splice missing entries into it and append
//!   missing functions, leaving everything else untouched;
//! - no rule map (legacy or foreign layout): regenerate the file around its
//!   declarations, moving hand-written `RegisterValidation` calls into the
//!   map and dropping imports nothing uses any more.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, info};

use crate::delta::{Delta, MissingFunction, RegistryState, RequiredRules};
use crate::detect::RULE_MAP_VAR;
use crate::error::CliResult;
use crate::parser::parse_source;
use crate::rules::function_name;
use crate::syntax::{tokenize, Decl, DeclKind, SourceTree, Token};

use super::document::{add_import, FunctionNode, GoDocument, ImportLine, ImportNode, MapNode, MapValue, Node};
use super::legacy::{self, RegisteredFunction};
use super::templates::{self, REGISTRY_INIT, RULE_MAP_DOC, VALIDATOR_IMPORT};
use super::RenderOutcome;

/// Everything the registry renderer needs besides the existing text.
#[derive(Debug, Clone, Copy)]
pub struct RegistryInput<'a> {
    pub package: &'a str,
    pub delta: &'a Delta,
    pub state: &'a RegistryState,
    pub required: &'a RequiredRules,
}

/// Render the registry file for `input`.
///
/// `existing` is the current file text, if the file exists. The result is
/// not yet passed through the formatter gate.
pub fn render_registry(
    path: &Path,
    existing: Option<&str>,
    input: RegistryInput<'_>,
) -> CliResult<RenderOutcome> {
    let Some(existing) = existing else {
        debug!(path = %path.display(), "registry file missing, rendering from template");
        return Ok(RenderOutcome::Created(render_new(input)));
    };

    if input.delta.registry_is_current() {
        debug!(path = %path.display(), "registry file is current");
        return Ok(RenderOutcome::Unchanged);
    }

    let tree = parse_source(existing, path)?;
    match input.state.map_literal {
        Some(map) => {
            debug!(
                path = %path.display(),
                entries = input.delta.missing_map_entries.len(),
                functions = input.delta.missing_functions.len(),
                "merging into existing rule map"
            );
            let mut doc = GoDocument::new(existing);
            if !input.delta.missing_map_entries.is_empty() {
                let entries = input
                    .delta
                    .missing_map_entries
                    .iter()
                    .map(|entry| (entry.tag.clone(), MapValue::Ident(entry.function.clone())))
                    .collect();
                doc.replace(
                    map.open..map.close + 1,
                    Node::MapLiteral(MapNode::extend(map.body(existing), entries)),
                );
            }

            let (functions, needs_regexp) = function_nodes(&input.delta.missing_functions);
            if needs_regexp && tree.import_for("regexp").is_none() {
                add_import(&mut doc, &tree, ImportLine::new("regexp"));
            }
            for function in functions {
                doc.push(Node::Function(function));
            }
            Ok(RenderOutcome::Updated(doc.render()))
        }
        None => {
            info!(
                path = %path.display(),
                "no {} map found, regenerating registry file",
                RULE_MAP_VAR
            );
            Ok(RenderOutcome::Regenerated(regenerate(existing, &tree, input)))
        }
    }
}

fn render_new(input: RegistryInput<'_>) -> String {
    let entries: Vec<(String, String)> = input
        .delta
        .missing_map_entries
        .iter()
        .map(|entry| (entry.tag.clone(), entry.function.clone()))
        .collect();
    let (functions, needs_regexp) = function_nodes(&input.delta.missing_functions);

    let mut imports = vec![ImportLine::new(VALIDATOR_IMPORT)];
    if needs_regexp {
        imports.push(ImportLine::new("regexp"));
    }

    registry_document(input.package, imports, entries, &[], functions)
}

fn regenerate(existing: &str, tree: &SourceTree, input: RegistryInput<'_>) -> String {
    // Every tag registered by the old file stays registered, under the
    // function it was registered with.
    let mut entries: BTreeMap<String, String> = input
        .state
        .entry_functions
        .iter()
        .map(|(tag, function)| (tag.clone(), function.clone()))
        .collect();

    let mut taken: BTreeSet<String> = input.state.declared_functions.clone();
    taken.extend(input.delta.missing_functions.iter().map(|f| f.name.clone()));
    let mut kept: Vec<String> = Vec::new();
    let mut lifted: Vec<FunctionNode> = Vec::new();
    let mut lifted_tags: BTreeSet<String> = BTreeSet::new();

    for decl in &tree.decls {
        if is_replaced(decl) {
            continue;
        }
        let DeclKind::Func(func) = &decl.kind else {
            kept.push(existing[decl.full_span()].to_string());
            continue;
        };
        if func.receiver.is_some() || func.name != "init" {
            kept.push(existing[decl.full_span()].to_string());
            continue;
        }
        let Some(rewrite) = legacy::rewrite_init(existing, decl, func) else {
            kept.push(existing[decl.full_span()].to_string());
            continue;
        };
        for registration in rewrite.registrations {
            match registration.function {
                RegisteredFunction::Named(function) => {
                    entries.entry(registration.tag).or_insert(function);
                }
                RegisteredFunction::Literal(literal) => {
                    if entries.contains_key(&registration.tag) {
                        continue;
                    }
                    let name = unique_name(&function_name(&registration.tag), &taken);
                    debug!(tag = %registration.tag, function = %name, "lifting inline validation function");
                    taken.insert(name.clone());
                    lifted.push(FunctionNode {
                        text: legacy::lift_literal(&name, &literal),
                    });
                    lifted_tags.insert(registration.tag.clone());
                    entries.insert(registration.tag, name);
                }
            }
        }
        kept.extend(rewrite.text);
    }

    for rule in input.required.iter() {
        entries
            .entry(rule.tag.clone())
            .or_insert_with(|| input.state.function_for(&rule.tag));
    }

    let missing: Vec<MissingFunction> = input
        .delta
        .missing_functions
        .iter()
        .filter(|function| !lifted_tags.contains(&function.tag))
        .cloned()
        .collect();
    let (generated, needs_regexp) = function_nodes(&missing);
    let functions: Vec<FunctionNode> = lifted.into_iter().chain(generated).collect();

    let mut imports: Vec<ImportLine> = tree
        .imports
        .iter()
        .flat_map(|decl| decl.specs.iter())
        .map(|spec| ImportLine {
            name: spec.name.clone().filter(|name| {
                spec.path != VALIDATOR_IMPORT || name != "validator"
            }),
            path: spec.path.clone(),
        })
        .collect();
    // The rule map is typed `validator.Func`.
    imports.push(ImportLine::new(VALIDATOR_IMPORT));
    if needs_regexp {
        imports.push(ImportLine::new("regexp"));
    }

    let mut body = format!("var {} = map[string]validator.Func{{}}\n\n{}", RULE_MAP_VAR, REGISTRY_INIT);
    for text in kept.iter().map(String::as_str).chain(functions.iter().map(|f| f.text.as_str())) {
        body.push('\n');
        body.push_str(text);
    }
    let imports = used_imports(imports, &body);

    registry_document(&tree.package.name, imports, entries, &kept, functions)
}

/// Stray rule map variables, superseded by the regenerated map.
fn is_replaced(decl: &Decl) -> bool {
    matches!(&decl.kind, DeclKind::Var(names) if names.iter().any(|name| name == RULE_MAP_VAR))
}

/// `base`, or `base` with the smallest numeric suffix not in `taken`.
fn unique_name(base: &str, taken: &BTreeSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}{}", base, n))
        .find(|name| !taken.contains(name))
        .unwrap_or_else(|| base.to_string())
}

/// Drop imports whose package name is not used as a qualifier in `body`.
///
/// Blank and dot imports, and imports whose name cannot be told from the
/// path, are kept. Everything is kept when `body` does not tokenize.
fn used_imports(imports: Vec<ImportLine>, body: &str) -> Vec<ImportLine> {
    let Ok(tokens) = tokenize(body) else {
        return imports;
    };
    let qualifiers: BTreeSet<&str> = tokens
        .windows(2)
        .filter(|pair| pair[0].token == Token::Ident && pair[1].token == Token::Dot)
        .map(|pair| &body[pair[0].span.clone()])
        .collect();

    imports
        .into_iter()
        .filter(|line| match package_name(line) {
            Some(name) if !qualifiers.contains(name) => {
                debug!(path = %line.path, "dropping unused import");
                false
            }
            _ => true,
        })
        .collect()
}

/// Name an import binds, when it can be told from the import line.
fn package_name(line: &ImportLine) -> Option<&str> {
    match line.name.as_deref() {
        Some("_") | Some(".") => return None,
        Some(name) => return Some(name),
        None => {}
    }

    let mut elements = line.path.rsplit('/');
    let last = elements.next()?;
    let is_major_version =
        last.len() > 1 && last.starts_with('v') && last[1..].bytes().all(|b| b.is_ascii_digit());
    let name = if is_major_version { elements.next()? } else { last };

    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

fn registry_document(
    package: &str,
    imports: Vec<ImportLine>,
    entries: impl IntoIterator<Item = (String, String)>,
    kept: &[String],
    functions: Vec<FunctionNode>,
) -> String {
    let entries = entries
        .into_iter()
        .map(|(tag, function)| (tag, MapValue::Ident(function)))
        .collect();

    let mut doc = GoDocument::empty();
    doc.push(Node::Text(format!("package {}\n\n", package)));
    doc.push(Node::ImportDecl(ImportNode { lines: imports }));
    doc.push(Node::Text(format!(
        "\n{}\nvar {} = map[string]validator.Func",
        RULE_MAP_DOC, RULE_MAP_VAR
    )));
    doc.push(Node::MapLiteral(MapNode::new(entries)));
    doc.push(Node::Text(format!("\n\n{}", REGISTRY_INIT)));
    for text in kept {
        doc.push(Node::Function(FunctionNode {
            text: format!("{}\n", text),
        }));
    }
    for function in functions {
        doc.push(Node::Function(function));
    }
    doc.render()
}

/// Function nodes for `missing`, and whether any of them uses `regexp`.
fn function_nodes(missing: &[MissingFunction]) -> (Vec<FunctionNode>, bool) {
    let mut needs_regexp = false;
    let nodes = missing
        .iter()
        .map(|function| {
            let text = match templates::seeded_function(&function.name) {
                Some(body) => {
                    needs_regexp = true;
                    body.to_string()
                }
                None => templates::custom_function(&function.tag, &function.name),
            };
            FunctionNode { text }
        })
        .collect();
    (nodes, needs_regexp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::DeltaComputer;
    use crate::parser::DeclarationParser;

    const TYPES: &str = "package types\n\ntype CreateReq struct {\n\tId   string `validate:\"required,uuid\"`\n\tTel  string `validate:\"mobile\"`\n}\n";

    fn render(existing: Option<&str>) -> RenderOutcome {
        let outcome = DeclarationParser::default()
            .scan(TYPES, Path::new("types.go"))
            .unwrap();
        let computer = DeltaComputer::new(true);
        let required = computer.required(&outcome.candidates);
        let state = existing.map(RegistryState::from_source).unwrap_or_default();
        let delta = computer.compute(&outcome, &state);
        render_registry(
            Path::new("validation.go"),
            existing,
            RegistryInput {
                package: "types",
                delta: &delta,
                state: &state,
                required: &required,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_new_file_layout() {
        let RenderOutcome::Created(text) = render(None) else {
            panic!("expected a new file");
        };
        assert!(text.starts_with(
            "package types\n\nimport (\n\t\"regexp\"\n\n\t\"github.com/go-playground/validator/v10\"\n)\n\n// registerValidation"
        ));
        assert!(text.contains(
            "var registerValidation = map[string]validator.Func{\n\t\"idcard\": validateIdCard,\n\t\"mobile\": validateMobile,\n\t\"uuid\": validateUuid,\n}\n"
        ));
        assert!(text.contains("for tag, fn := range registerValidation {"));

        let id_card = text.find("func validateIdCard").unwrap();
        let mobile = text.find("func validateMobile").unwrap();
        let uuid = text.find("func validateUuid").unwrap();
        assert!(id_card < mobile && mobile < uuid);
        assert!(crate::syntax::parse(&text).is_ok());
    }

    #[test]
    fn test_rerender_is_unchanged() {
        let RenderOutcome::Created(text) = render(None) else {
            panic!("expected a new file");
        };
        assert_eq!(render(Some(&text)), RenderOutcome::Unchanged);
    }

    #[test]
    fn test_merge_preserves_hand_written_functions() {
        let existing = r#"package types

import "github.com/go-playground/validator/v10"

var registerValidation = map[string]validator.Func{
	"mobile": validateMobile, // phone numbers
}

func init() {
	for tag, fn := range registerValidation {
		_ = validate.RegisterValidation(tag, fn)
	}
}

// validateMobile accepts anything for now.
func validateMobile(fl validator.FieldLevel) bool {
	return len(fl.Field().String()) > 0
}
"#;
        let RenderOutcome::Updated(text) = render(Some(existing)) else {
            panic!("expected an update");
        };
        assert!(text.contains("\t\"mobile\": validateMobile, // phone numbers\n\t\"idcard\": validateIdCard,\n\t\"uuid\": validateUuid,\n}"));
        assert!(text.contains("return len(fl.Field().String()) > 0"));
        assert_eq!(text.matches("func validateMobile").count(), 1);
        assert!(text.contains("func validateIdCard"));
        assert!(text.starts_with(
            "package types\n\nimport \"github.com/go-playground/validator/v10\"\nimport \"regexp\"\n\nvar registerValidation"
        ));
        assert!(crate::syntax::parse(&text).is_ok());
    }

    #[test]
    fn test_legacy_file_is_regenerated() {
        let existing = r#"package types

import (
	"regexp"

	"github.com/go-playground/validator/v10"
)

func init() {
	_ = validate.RegisterValidation("mobile", checkMobile)
	_ = validate.RegisterValidation("idcard", validateIdCard)
}

// checkMobile is hand written.
func checkMobile(fl validator.FieldLevel) bool {
	ok, _ := regexp.MatchString(`^1\d{10}$`, fl.Field().String())
	return ok
}

func validateIdCard(fl validator.FieldLevel) bool {
	return true
}
"#;
        let RenderOutcome::Regenerated(text) = render(Some(existing)) else {
            panic!("expected regeneration");
        };
        assert!(text.contains("\t\"idcard\": validateIdCard,\n\t\"mobile\": checkMobile,\n\t\"uuid\": validateUuid,\n"));
        assert!(!text.contains("RegisterValidation(\"mobile\""));
        assert!(text.contains("// checkMobile is hand written.\nfunc checkMobile"));
        assert!(!text.contains("func validateMobile"));
        assert_eq!(text.matches("func validateIdCard").count(), 1);
        assert_eq!(text.matches("\"regexp\"").count(), 1);
        assert!(crate::syntax::parse(&text).is_ok());

        assert_eq!(render(Some(&text)), RenderOutcome::Unchanged);
    }

    #[test]
    fn test_legacy_init_keeps_other_statements() {
        let existing = r#"package types

import (
	"log"
	"reflect"
	"strings"

	"github.com/go-playground/validator/v10"
)

func init() {
	validate.RegisterTagNameFunc(func(fld reflect.StructField) string {
		return strings.SplitN(fld.Tag.Get("json"), ",", 2)[0]
	})
	if err := validate.RegisterValidation("zip", func(fl validator.FieldLevel) bool {
		return len(fl.Field().String()) == 5
	}); err != nil {
		log.Fatal(err)
	}
	_ = validate.RegisterValidation("mobile", checkMobile)
}

func checkMobile(fl validator.FieldLevel) bool {
	return len(fl.Field().String()) == 11
}
"#;
        let RenderOutcome::Regenerated(text) = render(Some(existing)) else {
            panic!("expected regeneration");
        };
        assert!(text.contains(
            "func init() {\n\tvalidate.RegisterTagNameFunc(func(fld reflect.StructField) string {\n\t\treturn strings.SplitN(fld.Tag.Get(\"json\"), \",\", 2)[0]\n\t})\n}\n"
        ));
        assert!(text.contains(
            "func validateZip(fl validator.FieldLevel) bool {\n\treturn len(fl.Field().String()) == 5\n}\n"
        ));
        assert!(text.contains(
            "\t\"idcard\": validateIdCard,\n\t\"mobile\": checkMobile,\n\t\"uuid\": validateUuid,\n\t\"zip\": validateZip,\n"
        ));
        assert!(!text.contains("RegisterValidation(\""));
        assert_eq!(text.matches("func validateZip").count(), 1);
        assert!(text.starts_with(
            "package types\n\nimport (\n\t\"reflect\"\n\t\"regexp\"\n\t\"strings\"\n\n\t\"github.com/go-playground/validator/v10\"\n)\n"
        ));
        assert!(crate::syntax::parse(&text).is_ok());

        assert_eq!(render(Some(&text)), RenderOutcome::Unchanged);
    }

    #[test]
    fn test_aliased_validator_import_on_regeneration() {
        let existing = "package types\n\nimport v \"github.com/go-playground/validator/v10\"\n\nfunc init() {\n\t_ = validate.RegisterValidation(\"mobile\", checkMobile)\n}\n\nfunc checkMobile(fl v.FieldLevel) bool {\n\treturn true\n}\n";
        let RenderOutcome::Regenerated(text) = render(Some(existing)) else {
            panic!("expected regeneration");
        };
        assert!(text.contains(
            "\n\t\"github.com/go-playground/validator/v10\"\n\tv \"github.com/go-playground/validator/v10\"\n)\n"
        ));
        assert!(text.contains("var registerValidation = map[string]validator.Func{"));

        let unused = existing.replace("fl v.FieldLevel", "fl validator.FieldLevel");
        let RenderOutcome::Regenerated(text) = render(Some(&unused)) else {
            panic!("expected regeneration");
        };
        assert!(!text.contains("\tv \""));
        assert_eq!(text.matches("\"github.com/go-playground/validator/v10\"").count(), 1);
        assert!(crate::syntax::parse(&text).is_ok());
    }

    #[test]
    fn test_package_names_of_imports() {
        assert_eq!(package_name(&ImportLine::new(VALIDATOR_IMPORT)), Some("validator"));
        assert_eq!(package_name(&ImportLine::new("net/http")), Some("http"));
        assert_eq!(package_name(&ImportLine::named("v", VALIDATOR_IMPORT)), Some("v"));
        assert_eq!(package_name(&ImportLine::named("_", "embed")), None);
        assert_eq!(package_name(&ImportLine::new("gopkg.in/yaml.v3")), None);
        assert_eq!(package_name(&ImportLine::new("github.com/go-playground/universal-translator")), None);
    }
}
