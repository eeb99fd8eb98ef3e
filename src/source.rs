use tracing::debug;

/// The canonical text field the editor mirrors.
///
/// Editor writes go through [`SourceField::write`] and are terminal: they are
/// never reported back as external changes. Anything arriving through
/// [`SourceField::observe`] that differs from the current value is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceField {
    value: String,
}

impl SourceField {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Store a value serialized by the editor.
    pub(crate) fn write(&mut self, value: String) {
        debug!("Source field updated: {}", value);
        self.value = value;
    }

    /// Accept a value reported by the host. Returns `true` when it is a
    /// genuine external change; an echo of the editor's own write is ignored.
    pub fn observe(&mut self, value: &str) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value.to_string();
        true
    }
}
