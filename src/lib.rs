//! Binary prediction-market execution engine — main library.
//!
//! Following Clean Architecture principles.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI args/config)
//! - **engine**: Core business logic (re-exported from the `engine` workspace member)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use bop_engine::bin_common::{load_config_from_env, ConfigType};
//! use bop_engine::engine::ExecutionEngine;
//! ```

// Re-export the workspace library for convenience.
pub use engine;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables
    //!
    //! Provides shared functionality for the presentation layer (binaries)
    //! following Clean Architecture principles.

    pub mod cli;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
}
