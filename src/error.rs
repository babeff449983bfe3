// Error types shared by the screen, its features and the suggestion providers.
// None of these are allowed to abort the screen except ScreenError.

use std::time::Duration;

/// Failure to bind a feature to its view and lifetime owner.
///
/// Binding failures are isolated: the screen reports them and keeps
/// composing the remaining features.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("view '{view}' is not part of the screen hierarchy")]
    ViewNotInHierarchy { view: String },

    #[error("feature '{feature}' is already attached")]
    AlreadyAttached { feature: &'static str },

    #[error("handle for feature '{feature}' was torn down and cannot be reused")]
    HandleDetached { feature: &'static str },

    #[error("lifetime owner already destroyed, cannot bind '{feature}'")]
    OwnerDestroyed { feature: &'static str },
}

/// A single suggestion source failing. Swallowed by the aggregator.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider '{provider}' backend error: {message}")]
    Backend {
        provider: &'static str,
        message: String,
    },

    #[error("provider '{provider}' timed out after {after:?}")]
    Timeout {
        provider: &'static str,
        after: Duration,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("tag '{tag}' already identifies a different kind of screen")]
    TagConflict { tag: String },
}

/// Screen-level composition failure. Only a missing required view is fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScreenError {
    #[error("required view '{0}' is missing from the screen hierarchy")]
    MissingView(String),
}

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
