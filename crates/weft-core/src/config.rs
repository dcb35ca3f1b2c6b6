/// Knobs for a [`BindingService`](crate::BindingService).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingConfig {
    /// Convert panics raised by binders (or by the view tree while a
    /// collection change is applied) into diagnostics instead of unwinding.
    pub catch_panics: bool,
    /// Emit a verbose record for every collection change processed.
    pub trace_changes: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            trace_changes: cfg!(debug_assertions),
        }
    }
}

impl BindingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catch_panics(mut self, on: bool) -> Self {
        self.catch_panics = on;
        self
    }

    pub fn trace_changes(mut self, on: bool) -> Self {
        self.trace_changes = on;
        self
    }
}
