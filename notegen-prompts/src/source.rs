//! Composition of a creator submission into the opaque source-notes text.

use serde::{Deserialize, Serialize};

/// Structured creator submission.
///
/// Rendered by [`SourceNotes::to_context`] into the sectioned plain text that
/// gets bound into every template.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNotes {
    /// Idea title (user supplied or generated).
    pub title: String,
    /// Optional short summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Reference links.
    #[serde(default)]
    pub links: Vec<String>,
}

impl SourceNotes {
    /// Creates a submission with only a title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the free-form notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Appends a reference link, ignoring blank entries.
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        let link = link.into();
        if !link.trim().is_empty() {
            self.links.push(link.trim().to_owned());
        }
        self
    }

    /// Replaces the title, keeping everything else.
    #[must_use]
    pub fn retitled(&self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self.clone()
        }
    }

    /// Returns `true` when every part is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty()
            && self.summary.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.notes.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.links.is_empty()
    }

    /// Renders the sectioned context text.
    #[must_use]
    pub fn to_context(&self) -> String {
        format!(
            "TITLE\n{}\n\nSUMMARY\n{}\n\nNOTES\n{}\n\nLINKS\n{}\n",
            self.title.trim(),
            self.summary.as_deref().unwrap_or_default().trim(),
            self.notes.as_deref().unwrap_or_default().trim(),
            self.links.join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_all_sections() {
        let notes = SourceNotes::new("Note Forge")
            .with_summary("Turns notes into pages.")
            .with_notes("Two outputs: public and private.")
            .with_link("https://example.com/a")
            .with_link("  ")
            .with_link("https://example.com/b");

        assert_eq!(
            notes.to_context(),
            "TITLE\nNote Forge\n\nSUMMARY\nTurns notes into pages.\n\nNOTES\n\
             Two outputs: public and private.\n\nLINKS\nhttps://example.com/a, https://example.com/b\n"
        );
    }

    #[test]
    fn missing_parts_render_empty_sections() {
        let context = SourceNotes::new("Only a title").to_context();
        assert!(context.contains("SUMMARY\n\n"));
        assert!(context.ends_with("LINKS\n\n"));
    }

    #[test]
    fn blank_detection() {
        assert!(SourceNotes::default().is_blank());
        assert!(!SourceNotes::default().with_notes("x").is_blank());
    }
}
