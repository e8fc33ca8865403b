//! Text detector for artifacts this plugin has already emitted.
//!
//! The syntax tree says what must exist; this module says what already
//! exists. Every pattern used to recognise previously generated code lives
//! here so that changes to the emitted shapes and their detection move
//! together. Bump [`DETECTOR_VERSION`] whenever a pattern changes.

use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::syntax::{comment_spans, matching_close};

/// Version of the detection patterns.
pub const DETECTOR_VERSION: u32 = 2;

/// Name of the package-level rule map in the registry file.
pub const RULE_MAP_VAR: &str = "registerValidation";

/// Name of the package-level message map in the translation file.
pub const TRANSLATION_MAP_VAR: &str = "translationMessages";

static ENTRY_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"func\s*\(\s*(?:\w+\s+)?\*?\s*(\w+)\s*\)\s*Validate\s*\(\s*\)").expect("valid regex")
});

static TOP_LEVEL_FUNC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^func\s+([A-Za-z_]\w*)\s*[(\[]").expect("valid regex"));

static RULE_MAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"var\s+registerValidation\s*=\s*map\s*\[\s*string\s*\]\s*validator\.Func\s*\{")
        .expect("valid regex")
});

static TRANSLATION_MAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"var\s+translationMessages\s*=\s*map\s*\[\s*string\s*\]\s*string\s*\{")
        .expect("valid regex")
});

static MAP_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""((?:[^"\\\n]|\\.)+)"\s*:\s*([A-Za-z_][\w.]*)?"#).expect("valid regex")
});

static LEGACY_REGISTRATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"RegisterValidation\(\s*"([^"]+)"\s*,\s*(?:([A-Za-z_][\w.]*)\s*[,)])?"#)
        .expect("valid regex")
});

static LEGACY_TRANSLATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:RegisterTranslation|trans\.Add)\(\s*"([^"]+)""#).expect("valid regex")
});

static VALIDATE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^var\s+validate\b").expect("valid regex"));

/// Location of a map literal's braces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapLiteral {
    /// Offset of `{`.
    pub open: usize,
    /// Offset of the matching `}`.
    pub close: usize,
}

impl MapLiteral {
    /// Text between the braces.
    pub fn body<'a>(&self, source: &'a str) -> &'a str {
        &source[self.open + 1..self.close]
    }

    /// Keys of the literal, in source order.
    pub fn keys(&self, source: &str) -> Vec<String> {
        map_entries(self.body(source))
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    /// Entries of the literal with identifier values, in source order.
    pub fn entries(&self, source: &str) -> Vec<(String, Option<String>)> {
        map_entries(self.body(source))
    }
}

/// `source` with every comment blanked out.
///
/// Comment characters become spaces and line breaks stay, so byte offsets
/// into the result are valid offsets into `source`. All patterns below run
/// on this text; code that is commented out does not count as existing.
pub fn without_comments(source: &str) -> Cow<'_, str> {
    let spans = comment_spans(source);
    if spans.is_empty() {
        return Cow::Borrowed(source);
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&source[cursor..span.start]);
        for c in source[span.clone()].chars() {
            if c == '\n' {
                out.push('\n');
            } else {
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
        }
        cursor = span.end;
    }
    out.push_str(&source[cursor..]);
    Cow::Owned(out)
}

/// Types that already have a `Validate()` method.
///
/// Value receivers count too, since adding a pointer method next to one
/// would redeclare it.
pub fn entry_point_receivers(source: &str) -> BTreeSet<String> {
    ENTRY_POINT
        .captures_iter(&without_comments(source))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Names of all top-level functions (no receiver).
pub fn declared_functions(source: &str) -> BTreeSet<String> {
    TOP_LEVEL_FUNC
        .captures_iter(&without_comments(source))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Find the `registerValidation` map literal.
pub fn locate_rule_map(source: &str) -> Option<MapLiteral> {
    locate_map(&RULE_MAP, source)
}

/// Find the `translationMessages` map literal.
pub fn locate_translation_map(source: &str) -> Option<MapLiteral> {
    locate_map(&TRANSLATION_MAP, source)
}

fn locate_map(pattern: &Regex, source: &str) -> Option<MapLiteral> {
    let stripped = without_comments(source);
    let found = pattern.find(&stripped)?;
    let open = found.end() - 1;
    let close = matching_close(source, open).ok()?;
    Some(MapLiteral { open, close })
}

/// Quoted keys (`"tag":`) in a map literal body, with the value when it is
/// an identifier.
pub fn map_entries(body: &str) -> Vec<(String, Option<String>)> {
    MAP_ENTRY
        .captures_iter(&without_comments(body))
        .filter_map(|c| {
            let key = c.get(1)?.as_str().to_string();
            Some((key, c.get(2).map(|m| m.as_str().to_string())))
        })
        .collect()
}

/// A `validate.RegisterValidation("tag", fn)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRegistration {
    pub tag: String,
    /// The registered function when it is passed by name.
    pub function: Option<String>,
}

/// Registrations made by direct `RegisterValidation` calls.
pub fn legacy_registrations(source: &str) -> Vec<LegacyRegistration> {
    LEGACY_REGISTRATION
        .captures_iter(&without_comments(source))
        .filter_map(|c| {
            let tag = c.get(1)?.as_str().to_string();
            let function = c
                .get(2)
                .map(|m| m.as_str().to_string())
                .filter(|name| name != "func");
            Some(LegacyRegistration { tag, function })
        })
        .collect()
}

/// Tags with a translation registered through `trans.Add` or
/// `RegisterTranslation` calls.
pub fn legacy_translations(source: &str) -> BTreeSet<String> {
    LEGACY_TRANSLATION
        .captures_iter(&without_comments(source))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether a top-level `var validate` appears in the text.
///
/// Only used for files the parser rejects.
pub fn declares_validate_var(source: &str) -> bool {
    VALIDATE_VAR.is_match(&without_comments(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_points_tolerate_whitespace() {
        let source = "func (r *LoginReq) Validate() error {}\nfunc( * StatusReq )Validate ( ) error {}\nfunc (r LoginResp) Validate() error {}\n";
        let found: Vec<_> = entry_point_receivers(source).into_iter().collect();
        assert_eq!(found, vec!["LoginReq", "LoginResp", "StatusReq"]);
    }

    #[test]
    fn test_declared_functions_skip_methods() {
        let source = "func validateMobile(fl validator.FieldLevel) bool {}\nfunc (r *A) Validate() error {}\nfunc init() {}\n";
        let found: Vec<_> = declared_functions(source).into_iter().collect();
        assert_eq!(found, vec!["init", "validateMobile"]);
    }

    #[test]
    fn test_rule_map_is_located() {
        let source = "var registerValidation = map[string]validator.Func{\n\t\"mobile\": validateMobile, // mobile\n\t\"idcard\": validateIdCard,\n}\n";
        let map = locate_rule_map(source).unwrap();
        assert_eq!(&source[map.open..=map.open], "{");
        assert_eq!(map.close, source.len() - 2);
        assert_eq!(map.keys(source), vec!["mobile", "idcard"]);
        assert_eq!(
            map.entries(source)[1],
            ("idcard".to_string(), Some("validateIdCard".to_string()))
        );

        let messages = "{\n\t\"uuid\": \"{0} is not a UUID\",\n}";
        assert_eq!(map_entries(messages), vec![("uuid".to_string(), None)]);
    }

    #[test]
    fn test_rule_map_missing() {
        assert!(locate_rule_map("package types\n").is_none());
        assert!(locate_translation_map("var translationMessages = map[string]int{}").is_none());
    }

    #[test]
    fn test_legacy_patterns() {
        let source = "_ = validate.RegisterValidation(\"mobile\", validateMobile)\n_ = trans.Add(\"uuid\", \"{0}\", false)\n_ = validate.RegisterTranslation(\"idcard\", trans, nil, nil)\n";
        assert_eq!(
            legacy_registrations(source),
            vec![LegacyRegistration {
                tag: "mobile".to_string(),
                function: Some("validateMobile".to_string()),
            }]
        );
        let inline = legacy_registrations("v.RegisterValidation(\"x\", func(fl validator.FieldLevel) bool {")[0].clone();
        assert_eq!(inline.function, None);
        let translated: Vec<_> = legacy_translations(source).into_iter().collect();
        assert_eq!(translated, vec!["idcard", "uuid"]);
    }

    #[test]
    fn test_commented_code_is_not_detected() {
        let source = "// func (r *LoginReq) Validate() error {\n/*\nfunc validateUuid(fl validator.FieldLevel) bool {\n*/\nfunc validateMobile(fl validator.FieldLevel) bool {}\n";
        assert!(entry_point_receivers(source).is_empty());
        let found: Vec<_> = declared_functions(source).into_iter().collect();
        assert_eq!(found, vec!["validateMobile"]);

        let registry = "var registerValidation = map[string]validator.Func{\n\t\"mobile\": validateMobile,\n\t// \"uuid\": validateUuid,\n\t/* \"zip\": validateZip, */\n}\n";
        let map = locate_rule_map(registry).unwrap();
        assert_eq!(map.keys(registry), vec!["mobile"]);
        assert_eq!(map.close, registry.len() - 2);

        assert!(legacy_registrations("// validate.RegisterValidation(\"zip\", validateZip)\n").is_empty());
        assert!(locate_rule_map("// var registerValidation = map[string]validator.Func{}\n").is_none());
    }

    #[test]
    fn test_blanking_keeps_offsets() {
        let source = "a // é\nb /* x\ny */ c";
        let blanked = without_comments(source);
        assert_eq!(blanked.len(), source.len());
        assert_eq!(blanked.find('b'), source.find('b'));
        assert_eq!(blanked.find('c'), source.find('c'));
        assert_eq!(blanked.lines().count(), source.lines().count());
        assert!(matches!(without_comments("a b"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_validate_var_fallback() {
        assert!(declares_validate_var("package a\nvar validate = validator.New()\n"));
        assert!(!declares_validate_var("package a\nvar validator2 = 1\n\tvar validate = x\n"));
    }
}
