//! Error taxonomy for container conversion.
//!
//! Structural and format errors are fatal for the file being converted.
//! Reference-skeleton lookup misses are never surfaced here: cross-game bone
//! correspondence is inherently partial, so those bones are skipped and
//! logged instead (see `convert::retarget`).

use thiserror::Error;

use crate::profile::Game;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// Bad magic, truncated tables, or otherwise unrecoverable input.
    #[error("malformed container: {reason}")]
    Malformed { reason: String },

    /// Curve format code outside the known enumeration.
    #[error("unsupported curve format code {0:#06x}")]
    UnsupportedFormatCode(u16),

    /// The profile pair has no defined transform path. Surfaced before any
    /// mutation begins.
    #[error("no conversion path from {src:?} to {dst:?}")]
    VersionIncompatible { src: Game, dst: Game },
}

impl ConvertError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}
