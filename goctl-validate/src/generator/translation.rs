//! Translation file (`translator.go`) rendering.
//!
//! Messages are only ever added. A tag that already has a message keeps it,
//! whatever the text.

use std::path::Path;

use tracing::debug;

use crate::config::Language;
use crate::delta::TranslationState;
use crate::detect::TRANSLATION_MAP_VAR;
use crate::error::{CliError, CliResult, MergeError};
use crate::parser::parse_source;

use super::document::{GoDocument, ImportLine, ImportNode, MapNode, MapValue, Node};
use super::templates::{
    self, locale_spec, TRANSLATION_HELPERS, TRANSLATION_MAP_DOC, TRANSLATOR_IMPORT, VALIDATOR_IMPORT,
};
use super::RenderOutcome;

/// Function of older translation files that registers messages one by one.
pub const LEGACY_TRANSLATION_FUNC: &str = "registerCustomTranslations";

/// Everything the translation renderer needs besides the existing text.
#[derive(Debug, Clone, Copy)]
pub struct TranslationInput<'a> {
    pub package: &'a str,
    pub language: Language,
    /// Tags without a message, sorted.
    pub missing: &'a [String],
    pub state: &'a TranslationState,
}

/// Render the translation file for `input`.
pub fn render_translation(
    path: &Path,
    existing: Option<&str>,
    input: TranslationInput<'_>,
) -> CliResult<RenderOutcome> {
    let Some(existing) = existing else {
        debug!(path = %path.display(), "translation file missing, rendering from template");
        return Ok(RenderOutcome::Created(render_new(input)));
    };

    if input.missing.is_empty() {
        debug!(path = %path.display(), "translation file is current");
        return Ok(RenderOutcome::Unchanged);
    }

    let mut doc = GoDocument::new(existing);
    if let Some(map) = input.state.map_literal {
        debug!(
            path = %path.display(),
            messages = input.missing.len(),
            "merging into existing message map"
        );
        doc.replace(
            map.open..map.close + 1,
            Node::MapLiteral(MapNode::extend(map.body(existing), messages(input))),
        );
        return Ok(RenderOutcome::Updated(doc.render()));
    }

    let tree = parse_source(existing, path)?;
    let body = tree
        .find_func(LEGACY_TRANSLATION_FUNC)
        .filter(|func| func.receiver.is_none())
        .and_then(|func| func.body.clone())
        .ok_or_else(|| {
            CliError::merge(
                path,
                MergeError::anchor_not_found(format!(
                    "{} map or {} function",
                    TRANSLATION_MAP_VAR, LEGACY_TRANSLATION_FUNC
                )),
            )
        })?;

    debug!(
        path = %path.display(),
        messages = input.missing.len(),
        "adding registrations to {}", LEGACY_TRANSLATION_FUNC
    );
    let close = body.end - 1;
    let mut statements = String::new();
    if !existing[..close].ends_with('\n') {
        statements.push('\n');
    }
    for tag in input.missing {
        statements.push_str(&templates::legacy_translation(
            tag,
            templates::default_message(input.language, tag),
        ));
    }
    doc.insert(close, Node::Text(statements));
    Ok(RenderOutcome::Updated(doc.render()))
}

fn messages(input: TranslationInput<'_>) -> Vec<(String, MapValue)> {
    input
        .missing
        .iter()
        .map(|tag| {
            let message = templates::default_message(input.language, tag);
            (tag.clone(), MapValue::Str(message.to_string()))
        })
        .collect()
}

fn render_new(input: TranslationInput<'_>) -> String {
    let locale = locale_spec(input.language);
    let imports = vec![
        ImportLine::new("errors"),
        ImportLine::new("strings"),
        ImportLine::new(locale.locale_import()),
        ImportLine::named("ut", TRANSLATOR_IMPORT),
        ImportLine::new(VALIDATOR_IMPORT),
        ImportLine::named(locale.translations_alias, locale.translations_import),
    ];

    let mut doc = GoDocument::empty();
    doc.push(Node::Text(format!("package {}\n\n", input.package)));
    doc.push(Node::ImportDecl(ImportNode { lines: imports }));
    doc.push(Node::Text(format!(
        "\nvar trans ut.Translator\n\n{}\nvar {} = map[string]string",
        TRANSLATION_MAP_DOC, TRANSLATION_MAP_VAR
    )));
    doc.push(Node::MapLiteral(MapNode::new(messages(input))));
    doc.push(Node::Text(format!(
        "\n\n{}\n{}",
        locale.init_function(),
        TRANSLATION_HELPERS
    )));
    doc.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(existing: Option<&str>, missing: &[&str], language: Language) -> CliResult<RenderOutcome> {
        let missing: Vec<String> = missing.iter().map(|t| t.to_string()).collect();
        let state = existing.map(TranslationState::from_source).unwrap_or_default();
        render_translation(
            Path::new("translator.go"),
            existing,
            TranslationInput {
                package: "types",
                language,
                missing: &missing,
                state: &state,
            },
        )
    }

    #[test]
    fn test_new_file() {
        let RenderOutcome::Created(text) = render(None, &["idcard", "mobile", "uuid"], Language::Zh).unwrap() else {
            panic!("expected a new file");
        };
        assert!(text.contains(
            "import (\n\t\"errors\"\n\t\"strings\"\n\n\t\"github.com/go-playground/locales/zh\"\n"
        ));
        assert!(text.contains(
            "\tzhTranslations \"github.com/go-playground/validator/v10/translations/zh\"\n)\n"
        ));
        assert!(text.contains("\t\"uuid\": \"{0}格式不正确\",\n}"));
        assert!(text.contains("func Translate(err error) error {"));
        assert!(crate::syntax::parse(&text).is_ok());

        let state = TranslationState::from_source(&text);
        assert_eq!(state.registered.len(), 3);
    }

    #[test]
    fn test_english_locale() {
        let RenderOutcome::Created(text) = render(None, &["mobile"], Language::En).unwrap() else {
            panic!("expected a new file");
        };
        assert!(text.contains("enTranslations.RegisterDefaultTranslations(validate, trans)"));
        assert!(text.contains("\"mobile\": \"{0} must be a valid mobile number\""));
    }

    #[test]
    fn test_existing_messages_are_kept() {
        let existing = "package types\n\nvar translationMessages = map[string]string{\n\t\"mobile\": \"手机号不对\",\n}\n";
        let RenderOutcome::Updated(text) = render(Some(existing), &["uuid"], Language::Zh).unwrap() else {
            panic!("expected an update");
        };
        assert_eq!(
            text,
            "package types\n\nvar translationMessages = map[string]string{\n\t\"mobile\": \"手机号不对\",\n\t\"uuid\": \"{0}格式不正确\",\n}\n"
        );
    }

    #[test]
    fn test_nothing_missing_is_unchanged() {
        let existing = "package types\n";
        assert_eq!(render(Some(existing), &[], Language::Zh).unwrap(), RenderOutcome::Unchanged);
    }

    #[test]
    fn test_legacy_function_gets_statements() {
        let existing = "package types\n\nfunc registerCustomTranslations() {\n\t_ = trans.Add(\"mobile\", \"{0}\", false)\n}\n";
        let RenderOutcome::Updated(text) = render(Some(existing), &["uuid"], Language::En).unwrap() else {
            panic!("expected an update");
        };
        assert!(text.starts_with(
            "package types\n\nfunc registerCustomTranslations() {\n\t_ = trans.Add(\"mobile\", \"{0}\", false)\n\t_ = trans.Add(\"uuid\", \"{0} must be a valid UUID\", false)\n"
        ));
        assert!(text.ends_with("\t})\n}\n"));
        assert!(crate::syntax::parse(&text).is_ok());
    }

    #[test]
    fn test_missing_anchor_is_an_error() {
        let err = render(Some("package types\n\nfunc other() {}\n"), &["uuid"], Language::Zh).unwrap_err();
        match err {
            CliError::Merge { file, source: MergeError::AnchorNotFound { anchor } } => {
                assert_eq!(file, Path::new("translator.go"));
                assert!(anchor.contains(LEGACY_TRANSLATION_FUNC));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
