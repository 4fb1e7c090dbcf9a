//! Error types for the live binary.
//!
//! [`LiveError`] wraps every failure that ends the live loop or aborts
//! startup.

/// Top-level error for the live binary.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: colitrack_core::ConfigError,
    },

    /// The viewport controller could not be built.
    #[error("viewport error: {source}")]
    Viewport {
        /// The underlying geo error.
        #[from]
        source: colitrack_geo::GeoError,
    },

    /// A backend call failed in a way that stops the loop.
    #[error("backend error: {source}")]
    Api {
        /// The underlying API error.
        #[from]
        source: colitrack_api::ApiError,
    },

    /// The view server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: colitrack_observer::StartupError,
    },
}
