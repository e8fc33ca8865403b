//! Difference between what the registry files must contain and what they do.
//!
//! The required side comes from the parsed types file; the existing side
//! comes from the text detector run over the registry and translation files.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::detect::{self, LegacyRegistration, MapLiteral};
use crate::parser::{ScanOutcome, TypeCandidate};
use crate::rules::{function_name, SEEDED_RULES};

/// What the registry file already declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryState {
    /// Names of top-level functions.
    pub declared_functions: BTreeSet<String>,

    /// Tags with an entry in the rule map or a legacy registration call.
    pub declared_map_entries: BTreeSet<String>,

    /// Function registered for each tag, when given by name.
    pub entry_functions: BTreeMap<String, String>,

    /// Legacy `RegisterValidation("tag", fn)` calls.
    pub legacy_registrations: Vec<LegacyRegistration>,

    /// Location of the rule map literal.
    pub map_literal: Option<MapLiteral>,

    /// Text of the rule map literal, braces included.
    pub raw_map_literal_text: Option<String>,
}

impl RegistryState {
    /// State of a registry file that does not exist yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Detect the registry artifacts in `source`.
    pub fn from_source(source: &str) -> Self {
        let map_literal = detect::locate_rule_map(source);
        let legacy_registrations = detect::legacy_registrations(source);

        let map_entries = map_literal
            .map(|map| map.entries(source))
            .unwrap_or_default();

        let mut declared_map_entries = BTreeSet::new();
        let mut entry_functions = BTreeMap::new();
        for (tag, function) in map_entries {
            if let Some(function) = function {
                entry_functions.entry(tag.clone()).or_insert(function);
            }
            declared_map_entries.insert(tag);
        }
        for registration in &legacy_registrations {
            if let Some(function) = &registration.function {
                entry_functions
                    .entry(registration.tag.clone())
                    .or_insert_with(|| function.clone());
            }
            declared_map_entries.insert(registration.tag.clone());
        }

        Self {
            declared_functions: detect::declared_functions(source),
            declared_map_entries,
            entry_functions,
            legacy_registrations,
            map_literal,
            raw_map_literal_text: map_literal.map(|map| source[map.open..=map.close].to_string()),
        }
    }

    /// Add functions declared elsewhere in the same package.
    pub fn with_package_functions(mut self, functions: impl IntoIterator<Item = String>) -> Self {
        self.declared_functions.extend(functions);
        self
    }

    /// The function registered for `tag`, or its default name.
    pub fn function_for(&self, tag: &str) -> String {
        self.entry_functions
            .get(tag)
            .cloned()
            .unwrap_or_else(|| function_name(tag))
    }

    /// Whether the function implementing `tag` is declared.
    ///
    /// Qualified names (`pkg.Func`) live in another package and count as
    /// declared.
    pub fn has_function(&self, tag: &str) -> bool {
        let function = self.function_for(tag);
        function.contains('.') || self.declared_functions.contains(&function)
    }
}

/// What the translation file already registers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationState {
    /// Tags with a message.
    pub registered: BTreeSet<String>,

    /// Location of the message map literal.
    pub map_literal: Option<MapLiteral>,
}

impl TranslationState {
    pub fn from_source(source: &str) -> Self {
        let map_literal = detect::locate_translation_map(source);
        let mut registered: BTreeSet<String> = map_literal
            .map(|map| map.keys(source).into_iter().collect())
            .unwrap_or_default();
        registered.extend(detect::legacy_translations(source));

        Self {
            registered,
            map_literal,
        }
    }
}

/// A custom tag used with different parameter lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConflict {
    pub tag: String,
    /// Parameters of the first occurrence, which are kept.
    pub kept: Option<Vec<String>>,
    /// Parameters of the later occurrence.
    pub ignored: Option<Vec<String>>,
    /// Type of the later occurrence.
    pub type_name: String,
}

/// A custom rule that must be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredRule {
    pub tag: String,
    pub function: String,
    /// Parameters of the first reference.
    pub params: Option<Vec<String>>,
    /// Whether any candidate references the rule.
    pub referenced: bool,
}

/// The custom rules a registry must contain, keyed by tag.
#[derive(Debug, Clone, Default)]
pub struct RequiredRules {
    rules: BTreeMap<String, RequiredRule>,
    conflicts: Vec<RuleConflict>,
}

impl RequiredRules {
    /// Seeded rules plus, when `custom_validation` is on, every custom rule
    /// referenced by `candidates`. First-seen parameters win.
    pub fn collect(candidates: &[TypeCandidate], custom_validation: bool) -> Self {
        let mut required = Self::default();
        for (tag, function) in SEEDED_RULES {
            required.rules.insert(
                tag.to_string(),
                RequiredRule {
                    tag: tag.to_string(),
                    function: function.to_string(),
                    params: None,
                    referenced: false,
                },
            );
        }

        if !custom_validation {
            return required;
        }

        for candidate in candidates {
            for rule in candidate.rules().filter(|rule| rule.is_custom()) {
                match required.rules.get_mut(&rule.tag) {
                    Some(existing) if !existing.referenced => {
                        existing.params = rule.params;
                        existing.referenced = true;
                    }
                    Some(existing) => {
                        if existing.params != rule.params {
                            let conflict = RuleConflict {
                                tag: rule.tag.clone(),
                                kept: existing.params.clone(),
                                ignored: rule.params,
                                type_name: candidate.name.clone(),
                            };
                            debug!(
                                tag = %conflict.tag,
                                kept = ?conflict.kept,
                                ignored = ?conflict.ignored,
                                type_name = %conflict.type_name,
                                "conflicting parameters for custom rule, keeping the first"
                            );
                            required.conflicts.push(conflict);
                        }
                    }
                    None => {
                        let function = rule.function_name();
                        required.rules.insert(
                            rule.tag.clone(),
                            RequiredRule {
                                tag: rule.tag,
                                function,
                                params: rule.params,
                                referenced: true,
                            },
                        );
                    }
                }
            }
        }

        required
    }

    /// Required rules sorted by tag.
    pub fn iter(&self) -> impl Iterator<Item = &RequiredRule> {
        self.rules.values()
    }

    pub fn get(&self, tag: &str) -> Option<&RequiredRule> {
        self.rules.get(tag)
    }

    pub fn conflicts(&self) -> &[RuleConflict] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A map entry to add: `"tag": function`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub tag: String,
    pub function: String,
}

/// A function to add for `tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFunction {
    pub tag: String,
    pub name: String,
}

/// Everything that has to be added to reach the required state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Sorted by tag, at most one per function name.
    pub missing_functions: Vec<MissingFunction>,

    /// Sorted by tag.
    pub missing_map_entries: Vec<MapEntry>,

    /// Sorted by type name.
    pub missing_entry_point_types: Vec<String>,

    pub conflicts: Vec<RuleConflict>,
}

impl Delta {
    /// Whether the registry file needs no change.
    pub fn registry_is_current(&self) -> bool {
        self.missing_functions.is_empty() && self.missing_map_entries.is_empty()
    }

    /// Whether nothing at all needs to change.
    pub fn is_empty(&self) -> bool {
        self.registry_is_current() && self.missing_entry_point_types.is_empty()
    }
}

/// Computes [`Delta`]s.
#[derive(Debug, Clone, Copy)]
pub struct DeltaComputer {
    custom_validation: bool,
}

impl DeltaComputer {
    pub fn new(custom_validation: bool) -> Self {
        Self { custom_validation }
    }

    /// Rules the registry of a file with these candidates must contain.
    pub fn required(&self, candidates: &[TypeCandidate]) -> RequiredRules {
        RequiredRules::collect(candidates, self.custom_validation)
    }

    /// Compare a scanned types file against its registry.
    pub fn compute(&self, outcome: &ScanOutcome, registry: &RegistryState) -> Delta {
        let required = self.required(&outcome.candidates);
        compute_delta(&outcome.candidates, &outcome.existing_entry_points, &required, registry)
    }
}

/// Compute the delta from already collected rules.
pub fn compute_delta(
    candidates: &[TypeCandidate],
    existing_entry_points: &BTreeSet<String>,
    required: &RequiredRules,
    registry: &RegistryState,
) -> Delta {
    let mut planned: BTreeSet<String> = BTreeSet::new();
    let missing_functions = required
        .iter()
        .filter(|rule| !registry.has_function(&rule.tag))
        .map(|rule| MissingFunction {
            tag: rule.tag.clone(),
            name: registry.function_for(&rule.tag),
        })
        .filter(|function| planned.insert(function.name.clone()))
        .collect();

    let missing_map_entries = required
        .iter()
        .filter(|rule| !registry.declared_map_entries.contains(&rule.tag))
        .map(|rule| MapEntry {
            tag: rule.tag.clone(),
            function: registry.function_for(&rule.tag),
        })
        .collect();

    let missing_entry_point_types: BTreeSet<String> = candidates
        .iter()
        .filter(|candidate| !existing_entry_points.contains(&candidate.name))
        .map(|candidate| candidate.name.clone())
        .collect();

    Delta {
        missing_functions,
        missing_map_entries,
        missing_entry_point_types: missing_entry_point_types.into_iter().collect(),
        conflicts: required.conflicts().to_vec(),
    }
}

/// Required tags without a registered translation, sorted.
pub fn missing_translations(required: &RequiredRules, state: &TranslationState) -> Vec<String> {
    required
        .iter()
        .filter(|rule| !state.registered.contains(&rule.tag))
        .map(|rule| rule.tag.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::DeclarationParser;
    use std::path::Path;

    fn outcome(source: &str) -> ScanOutcome {
        DeclarationParser::default()
            .scan(source, Path::new("types.go"))
            .unwrap()
    }

    const TYPES: &str = r#"package types

type ZetaReq struct {
	Code string `validate:"uuid"`
	Zip  string `validate:"zip=5"`
}

type AlphaReq struct {
	Mobile string `validate:"required,mobile"`
	Zip    string `validate:"zip=9"`
}
"#;

    #[test]
    fn test_empty_registry_needs_everything_sorted() {
        let delta = DeltaComputer::new(true).compute(&outcome(TYPES), &RegistryState::empty());

        let functions: Vec<_> = delta.missing_functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            functions,
            vec!["validateIdCard", "validateMobile", "validateUuid", "validateZip"]
        );
        let entries: Vec<_> = delta.missing_map_entries.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(entries, vec!["idcard", "mobile", "uuid", "zip"]);
        assert_eq!(delta.missing_entry_point_types, vec!["AlphaReq", "ZetaReq"]);
    }

    #[test]
    fn test_first_seen_params_win() {
        let computer = DeltaComputer::new(true);
        let required = computer.required(&outcome(TYPES).candidates);

        assert_eq!(required.get("zip").unwrap().params, Some(vec!["5".to_string()]));
        assert_eq!(required.conflicts().len(), 1);
        let conflict = &required.conflicts()[0];
        assert_eq!(conflict.tag, "zip");
        assert_eq!(conflict.ignored, Some(vec!["9".to_string()]));
        assert_eq!(conflict.type_name, "AlphaReq");
    }

    #[test]
    fn test_custom_validation_off_keeps_seeded_only() {
        let delta = DeltaComputer::new(false).compute(&outcome(TYPES), &RegistryState::empty());
        let entries: Vec<_> = delta.missing_map_entries.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(entries, vec!["idcard", "mobile"]);
    }

    #[test]
    fn test_existing_registry_is_subtracted() {
        let registry = RegistryState::from_source(
            r#"package types

var registerValidation = map[string]validator.Func{
	"mobile": validateMobile,
	"idcard": validateIdCard,
}

func validateMobile(fl validator.FieldLevel) bool { return true }

func validateIdCard(fl validator.FieldLevel) bool { return true }

func validateUuid(fl validator.FieldLevel) bool { return true }
"#,
        );
        assert!(registry.has_function("uuid"));
        assert!(registry.map_literal.is_some());
        assert!(registry
            .raw_map_literal_text
            .as_deref()
            .is_some_and(|text| text.starts_with("{\n\t\"mobile\"") && text.ends_with('}')));

        let delta = DeltaComputer::new(true).compute(&outcome(TYPES), &registry);
        let functions: Vec<_> = delta.missing_functions.iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(functions, vec!["zip"]);
        let entries: Vec<_> = delta.missing_map_entries.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(entries, vec!["uuid", "zip"]);
    }

    #[test]
    fn test_registered_function_name_is_respected() {
        let registry = RegistryState::from_source(
            "package types\n\nvar registerValidation = map[string]validator.Func{\n\t\"mobile\": checkMobile,\n}\n\nfunc checkMobile(fl validator.FieldLevel) bool { return true }\n",
        );
        assert_eq!(registry.function_for("mobile"), "checkMobile");
        assert!(registry.has_function("mobile"));

        let delta = DeltaComputer::new(true).compute(&outcome(TYPES), &registry);
        let functions: Vec<_> = delta.missing_functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(functions, vec!["validateIdCard", "validateUuid", "validateZip"]);
    }

    #[test]
    fn test_package_functions_count_as_declared() {
        let registry = RegistryState::empty()
            .with_package_functions(vec!["validateMobile".to_string(), "validateUuid".to_string()]);
        let delta = DeltaComputer::new(true).compute(&outcome(TYPES), &registry);
        let functions: Vec<_> = delta.missing_functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(functions, vec!["validateIdCard", "validateZip"]);
        assert_eq!(delta.missing_map_entries.len(), 4);
    }

    #[test]
    fn test_legacy_registrations_count_as_entries() {
        let registry = RegistryState::from_source(
            "package types\n\nfunc init() {\n\t_ = validate.RegisterValidation(\"uuid\", validateUuid)\n}\n",
        );
        assert!(registry.map_literal.is_none());
        assert!(registry.declared_map_entries.contains("uuid"));
        assert_eq!(registry.legacy_registrations[0].tag, "uuid");
        assert_eq!(
            registry.legacy_registrations[0].function.as_deref(),
            Some("validateUuid")
        );
    }

    #[test]
    fn test_sanitised_names_are_not_duplicated() {
        let source = "package types\n\ntype AReq struct {\n\tA string `validate:\"zip-code\"`\n\tB string `validate:\"zip_code\"`\n}\n";
        let delta = DeltaComputer::new(true).compute(&outcome(source), &RegistryState::empty());
        let functions: Vec<_> = delta.missing_functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            functions,
            vec!["validateIdCard", "validateMobile", "validateZip_code"]
        );
        assert_eq!(delta.missing_map_entries.len(), 4);
    }

    #[test]
    fn test_existing_entry_points_are_skipped() {
        let source = "package types\n\ntype LoginReq struct {\n\tM string `validate:\"mobile\"`\n}\n\nfunc (r *LoginReq) Validate() error {\n\treturn validate.Struct(r)\n}\n";
        let delta = DeltaComputer::new(true).compute(&outcome(source), &RegistryState::empty());
        assert!(delta.missing_entry_point_types.is_empty());
    }

    #[test]
    fn test_missing_translations() {
        let required = DeltaComputer::new(true).required(&outcome(TYPES).candidates);
        let state = TranslationState::from_source(
            "package types\n\nvar translationMessages = map[string]string{\n\t\"mobile\": \"{0} bad\",\n}\n\nfunc f() { _ = trans.Add(\"zip\", \"x\", false) }\n",
        );
        assert_eq!(missing_translations(&required, &state), vec!["idcard", "uuid"]);
    }
}
