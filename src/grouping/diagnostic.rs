// ============================================================================
// spark-groups - Diagnostics
// Non-fatal conditions reported while building a grouped collection
// ============================================================================

use std::fmt;
use std::rc::Rc;

use tracing::warn;

/// A non-fatal condition worth telling the caller about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// No close signal was configured. Subscriptions on the base collection
    /// live until the grouped collection is closed or dropped.
    MissingCloseSignal,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingCloseSignal => f.write_str(
                "grouped collection built without a close signal; \
                 its subscriptions persist until it is closed or dropped",
            ),
        }
    }
}

/// Receives diagnostics.
pub type DiagnosticSink = Rc<dyn Fn(&Diagnostic)>;

/// The sink used when none is configured: log at `warn`.
pub fn log_diagnostic(diagnostic: &Diagnostic) {
    warn!(?diagnostic, "{diagnostic}");
}

pub(crate) fn default_sink() -> DiagnosticSink {
    Rc::new(log_diagnostic)
}
