//! Entry-Point Injector.
//!
//! Appends `Validate` methods to a types file and makes sure the shared
//! validator instance is declared. Everything else in the file is left
//! byte for byte as it was.

use tracing::debug;

use crate::generator::document::{add_import, FunctionNode, GoDocument, ImportLine, Node};
use crate::generator::templates::{self, VALIDATE_VAR, VALIDATOR_IMPORT};
use crate::syntax::SourceTree;

/// Name of the shared validator instance.
pub const SHARED_INSTANCE: &str = "validate";

/// Add `Validate` methods for `missing_types` to `source`.
///
/// `tree` is the parse of `source`. When `declared_elsewhere` is set, the
/// shared instance lives in another file of the package and is not added.
/// Returns `None` when the file needs no change.
pub fn inject(
    source: &str,
    tree: &SourceTree,
    missing_types: &[String],
    declared_elsewhere: bool,
) -> Option<String> {
    let mut doc = GoDocument::new(source);

    if !declared_elsewhere && !tree.declares_var(SHARED_INSTANCE) {
        debug!("declaring shared validator instance");
        let declaration = match validator_qualifier(tree) {
            Some(None) => VALIDATE_VAR.to_string(),
            Some(Some(".")) => format!("var {} = New()", SHARED_INSTANCE),
            Some(Some(alias)) => format!("var {} = {}.New()", SHARED_INSTANCE, alias),
            None => {
                add_import(&mut doc, tree, ImportLine::new(VALIDATOR_IMPORT));
                VALIDATE_VAR.to_string()
            }
        };
        let at = tree.last_import_end().unwrap_or(tree.package.span.end);
        doc.insert(at, Node::Text(format!("\n\n{}", declaration)));
    }

    let mut types: Vec<&String> = missing_types.iter().collect();
    types.sort();
    types.dedup();
    for type_name in types {
        debug!(type_name = %type_name, "adding Validate method");
        doc.push(Node::Function(FunctionNode {
            text: templates::entry_point(type_name),
        }));
    }

    doc.is_modified().then(|| doc.render())
}

/// Name under which the validator package is reachable: `Some(None)` for a
/// plain import, `Some(Some(name))` for a named or dot import. Blank imports
/// do not count.
fn validator_qualifier(tree: &SourceTree) -> Option<Option<&str>> {
    tree.imports
        .iter()
        .flat_map(|decl| decl.specs.iter())
        .filter(|spec| spec.path == VALIDATOR_IMPORT)
        .map(|spec| spec.name.as_deref())
        .find(|name| *name != Some("_"))
}
