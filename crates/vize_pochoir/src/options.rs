//! Optimizer options.

use serde::{Deserialize, Serialize};

/// Static folding options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizeOptions {
    /// Execute each synthesized render function once against the static
    /// instance before accepting it.
    pub validate: bool,

    /// Fold comments that are identical in both passes
    pub fold_comments: bool,

    /// Remove static component slots from the render tree, moving their
    /// styles into the enclosing slot
    pub hoist_styles: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            validate: true,
            fold_comments: true,
            hoist_styles: true,
        }
    }
}
