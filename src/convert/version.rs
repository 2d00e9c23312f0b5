//! Storage-format substitution at the version boundaries.
//!
//! Changes only how rotation samples are stored on disk, never the decoded
//! values. The legacy revision cannot hold 16-bit scaled rotations and the
//! pre-generation-5 revisions cannot hold the full-range scaled variant, so
//! curves crossing those boundaries get their format tags rewritten here.

use crate::model::{CurveFormat, GmtFile};
use crate::profile::{GameProfile, VERSION_GEN5, VERSION_LEGACY};

/// half-float -> scaled substitution applied when leaving the legacy format.
fn scaled_from_half(format: CurveFormat) -> Option<CurveFormat> {
    Some(match format {
        CurveFormat::RotQuatHalfFloat => CurveFormat::RotQuatScaled,
        CurveFormat::RotXwHalfFloat => CurveFormat::RotXwScaled,
        CurveFormat::RotYwHalfFloat => CurveFormat::RotYwScaled,
        CurveFormat::RotZwHalfFloat => CurveFormat::RotZwScaled,
        _ => return None,
    })
}

/// scaled -> half-float substitution applied when entering the legacy format.
fn half_from_scaled(format: CurveFormat) -> Option<CurveFormat> {
    Some(match format {
        CurveFormat::RotQuatScaled => CurveFormat::RotQuatHalfFloat,
        CurveFormat::RotXwScaled => CurveFormat::RotXwHalfFloat,
        CurveFormat::RotYwScaled => CurveFormat::RotYwHalfFloat,
        CurveFormat::RotZwScaled => CurveFormat::RotZwHalfFloat,
        _ => return None,
    })
}

/// Rewrite curve format tags so every curve is representable in the
/// destination revision. No-op when source and destination share a version.
pub fn remap_formats(file: &mut GmtFile, src: GameProfile, dst: GameProfile) {
    if src.version == dst.version {
        return;
    }

    let mut remap = |f: &mut dyn FnMut(CurveFormat) -> Option<CurveFormat>| {
        for anm in &mut file.animations {
            for bone in &mut anm.bones {
                for curve in &mut bone.curves {
                    if let Some(replacement) = f(curve.format) {
                        curve.format = replacement;
                    }
                }
            }
        }
    };

    if src.version == VERSION_LEGACY {
        remap(&mut scaled_from_half);
    }
    if dst.version < VERSION_GEN5 {
        if src.version >= VERSION_GEN5 {
            remap(&mut |f| {
                (f == CurveFormat::RotQuatIntScaled).then_some(CurveFormat::RotQuatScaled)
            });
        }
        if dst.version == VERSION_LEGACY {
            remap(&mut half_from_scaled);
        }
    }
}
