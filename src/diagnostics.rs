// ABOUTME: Diagnostics accumulator for non-fatal findings during planning.
// ABOUTME: Collects warnings that shouldn't fail a plan but should be shown to users.

/// Collects non-fatal warnings during planning.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during planning.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A published version matched no release series and was skipped.
    pub fn unmatched_version(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::UnmatchedVersion,
            message: message.into(),
        }
    }

    /// A contract-changing plan was dropped because it was partial.
    pub fn dropped_plan(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DroppedPlan,
            message: message.into(),
        }
    }
}

/// Categories of non-fatal warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    UnmatchedVersion,
    DroppedPlan,
}
