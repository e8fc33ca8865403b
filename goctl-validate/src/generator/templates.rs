//! Go source snippets emitted by the generators.

use crate::config::Language;

/// Import path of the validator engine.
pub const VALIDATOR_IMPORT: &str = "github.com/go-playground/validator/v10";

/// Import path of the universal translator.
pub const TRANSLATOR_IMPORT: &str = "github.com/go-playground/universal-translator";

/// Declaration of the shared validator instance.
pub const VALIDATE_VAR: &str = "var validate = validator.New()";

pub const RULE_MAP_DOC: &str = "// registerValidation maps every validation tag to its implementation.";

pub const REGISTRY_INIT: &str = r#"// init registers every entry of registerValidation with the shared validator.
func init() {
	for tag, fn := range registerValidation {
		_ = validate.RegisterValidation(tag, fn)
	}
}
"#;

pub const VALIDATE_MOBILE: &str = r#"// validateMobile reports whether the field holds a mainland China mobile number.
func validateMobile(fl validator.FieldLevel) bool {
	match, _ := regexp.MatchString(`^1[3-9]\d{9}$`, fl.Field().String())
	return match
}
"#;

pub const VALIDATE_ID_CARD: &str = r#"// validateIdCard reports whether the field holds a 15 or 18 digit ID card number.
func validateIdCard(fl validator.FieldLevel) bool {
	match, _ := regexp.MatchString(`(^\d{15}$)|(^\d{18}$)|(^\d{17}(\d|X|x)$)`, fl.Field().String())
	return match
}
"#;

/// Body of a seeded rule function, if `function` is one.
pub fn seeded_function(function: &str) -> Option<&'static str> {
    match function {
        "validateMobile" => Some(VALIDATE_MOBILE),
        "validateIdCard" => Some(VALIDATE_ID_CARD),
        _ => None,
    }
}

/// Stub for a custom rule the user has to implement.
pub fn custom_function(tag: &str, function: &str) -> String {
    format!(
        "// {function} implements the \"{tag}\" validation tag.\n\
         func {function}(fl validator.FieldLevel) bool {{\n\
         \t// Implement the {tag} rule here.\n\
         \treturn true\n\
         }}\n"
    )
}

/// `Validate` method for a request type.
pub fn entry_point(type_name: &str) -> String {
    format!("func (r *{type_name}) Validate() error {{\n\treturn validate.Struct(r)\n}}\n")
}

pub const TRANSLATION_MAP_DOC: &str =
    "// translationMessages maps validation tags to messages; {0} is the field name.";

pub const TRANSLATION_HELPERS: &str = r#"// registerTranslation hooks message up as the translation of tag.
func registerTranslation(tag, message string) {
	_ = validate.RegisterTranslation(tag, trans, func(ut ut.Translator) error {
		return ut.Add(tag, message, true)
	}, func(ut ut.Translator, fe validator.FieldError) string {
		t, _ := ut.T(tag, fe.Field())
		return t
	})
}

// Translate converts validation errors into a single localized error.
func Translate(err error) error {
	if err == nil {
		return nil
	}

	var errs validator.ValidationErrors
	if !errors.As(err, &errs) {
		return err
	}

	messages := make([]string, 0, len(errs))
	for _, e := range errs {
		messages = append(messages, e.Translate(trans))
	}
	return errors.New(strings.Join(messages, ", "))
}
"#;

/// Statements registering one message inside a legacy
/// `registerCustomTranslations` function.
pub fn legacy_translation(tag: &str, message: &str) -> String {
    let tag = go_quote(tag);
    let message = go_quote(message);
    format!(
        "\t_ = trans.Add({tag}, {message}, false)\n\
         \t_ = validate.RegisterTranslation({tag}, trans, func(ut ut.Translator) error {{\n\
         \t\treturn nil\n\
         \t}}, func(ut ut.Translator, fe validator.FieldError) string {{\n\
         \t\tt, _ := ut.T({tag}, fe.Field())\n\
         \t\treturn t\n\
         \t}})\n"
    )
}

/// Go packages and names used by the translation file for a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleSpec {
    /// Locale package name, also its import path suffix.
    pub locale: &'static str,
    /// Import path of the validator translations package.
    pub translations_import: &'static str,
    /// Alias of the translations import.
    pub translations_alias: &'static str,
}

impl LocaleSpec {
    pub fn locale_import(&self) -> String {
        format!("github.com/go-playground/locales/{}", self.locale)
    }

    pub fn init_function(&self) -> String {
        format!(
            "// init builds the translator and registers every entry of translationMessages.\n\
             func init() {{\n\
             \tlocale := {locale}.New()\n\
             \tuni := ut.New(locale, locale)\n\
             \ttrans, _ = uni.GetTranslator({name})\n\
             \t_ = {alias}.RegisterDefaultTranslations(validate, trans)\n\
             \n\
             \tfor tag, message := range translationMessages {{\n\
             \t\tregisterTranslation(tag, message)\n\
             \t}}\n\
             }}\n",
            locale = self.locale,
            name = go_quote(self.locale),
            alias = self.translations_alias,
        )
    }
}

/// Locale packages for `language`.
pub fn locale_spec(language: Language) -> LocaleSpec {
    match language {
        Language::Zh => LocaleSpec {
            locale: "zh",
            translations_import: "github.com/go-playground/validator/v10/translations/zh",
            translations_alias: "zhTranslations",
        },
        Language::ZhTw => LocaleSpec {
            locale: "zh_Hant_TW",
            translations_import: "github.com/go-playground/validator/v10/translations/zh_tw",
            translations_alias: "zhTwTranslations",
        },
        Language::En => LocaleSpec {
            locale: "en",
            translations_import: "github.com/go-playground/validator/v10/translations/en",
            translations_alias: "enTranslations",
        },
    }
}

/// Default message for `tag` in `language`.
pub fn default_message(language: Language, tag: &str) -> &'static str {
    match language {
        Language::Zh => match tag {
            "mobile" => "{0}手机号码格式不正确",
            "idcard" => "{0}身份证号码格式不正确",
            "uuid" => "{0}格式不正确",
            "datetime" => "{0}日期格式不正确",
            _ => "{0}格式不符合要求",
        },
        Language::ZhTw => match tag {
            "mobile" => "{0}手機號碼格式不正確",
            "idcard" => "{0}身分證號碼格式不正確",
            "uuid" => "{0}格式不正確",
            "datetime" => "{0}日期格式不正確",
            _ => "{0}格式不符合要求",
        },
        Language::En => match tag {
            "mobile" => "{0} must be a valid mobile number",
            "idcard" => "{0} must be a valid ID card number",
            "uuid" => "{0} must be a valid UUID",
            "datetime" => "{0} must be a valid date",
            _ => "{0} is not in the expected format",
        },
    }
}

/// Quote `value` as a Go interpreted string literal.
pub fn go_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_function_shape() {
        let stub = custom_function("uuid", "validateUuid");
        assert!(stub.starts_with("// validateUuid implements the \"uuid\" validation tag.\n"));
        assert!(stub.contains("func validateUuid(fl validator.FieldLevel) bool {\n"));
        assert!(stub.ends_with("\treturn true\n}\n"));
    }

    #[test]
    fn test_entry_point_shape() {
        assert_eq!(
            entry_point("StatusReq"),
            "func (r *StatusReq) Validate() error {\n\treturn validate.Struct(r)\n}\n"
        );
    }

    #[test]
    fn test_seeded_bodies() {
        assert!(seeded_function("validateMobile").unwrap().contains(r"^1[3-9]\d{9}$"));
        assert!(seeded_function("validateIdCard").is_some());
        assert!(seeded_function("validateUuid").is_none());
    }

    #[test]
    fn test_locales() {
        let spec = locale_spec(Language::ZhTw);
        assert_eq!(spec.locale_import(), "github.com/go-playground/locales/zh_Hant_TW");
        assert!(spec.init_function().contains("uni.GetTranslator(\"zh_Hant_TW\")"));
        assert!(spec.init_function().contains("zhTwTranslations.RegisterDefaultTranslations"));
    }

    #[test]
    fn test_default_messages() {
        assert_eq!(default_message(Language::Zh, "mobile"), "{0}手机号码格式不正确");
        assert_eq!(default_message(Language::Zh, "new_tag"), "{0}格式不符合要求");
        assert_eq!(default_message(Language::En, "uuid"), "{0} must be a valid UUID");
    }

    #[test]
    fn test_go_quote() {
        assert_eq!(go_quote("a\"b\\c"), r#""a\"b\\c""#);
    }
}
