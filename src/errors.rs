//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`PenumbraError`] covers the fallible edges of the
//! shadow subsystem:
//! - Settings validation and JSON loading
//! - Scene registration with stale or unknown keys
//!
//! Per-frame shadow decisions (culling, fading, atlas pressure) are never
//! errors; they are reported through return values and `log` output.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, PenumbraError>`.
//!
//! ```rust,ignore
//! use penumbra::errors::Result;
//! use penumbra::renderer::settings::ShadowSettings;
//!
//! fn load(json: &str) -> Result<ShadowSettings> {
//!     ShadowSettings::from_json(json)
//! }
//! ```

use thiserror::Error;

use crate::scene::{LightKey, MaterialKey, PrimitiveKey};

/// The main error type for the Penumbra engine.
#[derive(Error, Debug)]
pub enum PenumbraError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A settings value is out of range or inconsistent with another value.
    #[error("Invalid shadow settings: {0}")]
    InvalidSettings(String),

    /// Settings JSON could not be parsed.
    #[error("Failed to parse settings: {0}")]
    SettingsParse(#[from] serde_json::Error),

    // ========================================================================
    // Scene Errors
    // ========================================================================
    /// The light key does not refer to a live light.
    #[error("Unknown light: {0:?}")]
    UnknownLight(LightKey),

    /// The primitive key does not refer to a live primitive.
    #[error("Unknown primitive: {0:?}")]
    UnknownPrimitive(PrimitiveKey),

    /// The material key does not refer to a live material.
    #[error("Unknown material: {0:?}")]
    UnknownMaterial(MaterialKey),

    /// Attaching the shadow child would create a parent cycle or re-parent
    /// a primitive that already has a shadow parent.
    #[error("Invalid shadow parent link: {child:?} -> {parent:?}")]
    InvalidShadowParent {
        /// The primitive being attached
        child: PrimitiveKey,
        /// The requested parent
        parent: PrimitiveKey,
    },
}

/// Alias for `Result<T, PenumbraError>`.
pub type Result<T> = std::result::Result<T, PenumbraError>;
