//! Rendering of the generated Go files.
//!
//! The renderers build a [`document::GoDocument`] over the existing text (or
//! an empty one) and return the rendered result. Nothing here touches disk
//! or runs the formatter gate.

pub mod document;
pub mod legacy;
pub mod registry;
pub mod templates;
pub mod translation;

pub use registry::{render_registry, RegistryInput};
pub use translation::{render_translation, TranslationInput};

/// What a renderer did to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The file already holds everything required.
    Unchanged,

    /// The file did not exist and was rendered from templates.
    Created(String),

    /// Missing pieces were merged into the existing text.
    Updated(String),

    /// The existing file had no recognisable layout and was rebuilt around
    /// its declarations.
    Regenerated(String),
}

impl RenderOutcome {
    /// New text of the file, if it changes.
    pub fn text(&self) -> Option<&str> {
        match self {
            RenderOutcome::Unchanged => None,
            RenderOutcome::Created(text)
            | RenderOutcome::Updated(text)
            | RenderOutcome::Regenerated(text) => Some(text),
        }
    }

    /// Consume the outcome, returning the new text if the file changes.
    pub fn into_text(self) -> Option<String> {
        match self {
            RenderOutcome::Unchanged => None,
            RenderOutcome::Created(text)
            | RenderOutcome::Updated(text)
            | RenderOutcome::Regenerated(text) => Some(text),
        }
    }

    /// Short label for progress output.
    pub fn label(&self) -> &'static str {
        match self {
            RenderOutcome::Unchanged => "unchanged",
            RenderOutcome::Created(_) => "created",
            RenderOutcome::Updated(_) => "updated",
            RenderOutcome::Regenerated(_) => "regenerated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_text() {
        assert_eq!(RenderOutcome::Unchanged.text(), None);
        assert_eq!(RenderOutcome::Updated("x".to_string()).text(), Some("x"));
        assert_eq!(RenderOutcome::Regenerated("y".to_string()).label(), "regenerated");
    }
}
