//! The conversion pipeline.
//!
//! A conversion decodes the container, then applies a fixed sequence of
//! passes gated on the source/destination profile pair: storage-format
//! substitution, bone renaming, root-track reset, root split/merge, finger
//! rest fix, hip reparenting and optional skeleton retargeting. The order
//! matters: renaming runs before any pass that looks bones up by name, and
//! the hip pass runs on the destination's root layout.

pub mod reparent;
pub mod retarget;
pub mod topology;
pub mod version;

use glam::Vec3;

use crate::error::ConvertError;
use crate::formats::gmt;
use crate::names;
use crate::profile::Game;
use crate::skeleton::RefSkeleton;

/// Root-track reset behavior.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ResetMode {
    #[default]
    None,
    /// Re-zero against the track's own first root sample.
    Origin,
    /// Re-zero against a caller-supplied scene offset, lifted by
    /// `add_height`.
    Scene { offset: Vec3, add_height: f32 },
}

/// Caller-selected translation work beyond the mandatory layout passes.
#[derive(Debug, Clone, Default)]
pub struct TranslationOptions {
    /// Recompute parent-relative tracks against the target hierarchy.
    pub reparent: bool,
    /// Retarget the face subtree.
    pub face: bool,
    /// Retarget both hand subtrees.
    pub hand: bool,
    /// Retarget the body, excluding face and hands.
    pub body: bool,
    /// Rest pose the animation was authored against.
    pub source_skeleton: Option<RefSkeleton>,
    /// Rest pose of the skeleton the animation will play on.
    pub target_skeleton: Option<RefSkeleton>,
    pub reset: ResetMode,
}

impl TranslationOptions {
    /// Whether any skeleton-driven retarget pass is requested.
    pub fn has_retarget(&self) -> bool {
        self.reparent || self.face || self.hand || self.body
    }

    fn has_reset(&self) -> bool {
        self.reset != ResetMode::None
    }
}

/// Convert a motion container between two game profiles.
///
/// `motion` marks looping motion clips; scene-placed cutscene tracks
/// distribute the root differently. A conversion between profiles of the
/// same format version does nothing by itself and is refused unless a
/// retarget or reset operation gives it work to do.
pub fn convert(
    bytes: &[u8],
    src: Game,
    dst: Game,
    motion: bool,
    opts: &TranslationOptions,
) -> Result<Vec<u8>, ConvertError> {
    let src_p = src.profile();
    let dst_p = dst.profile();
    if src_p.version == dst_p.version && !opts.has_retarget() && !opts.has_reset() {
        return Err(ConvertError::VersionIncompatible { src, dst });
    }

    let mut file = gmt::decode(bytes)?;
    file.version = dst_p.version;
    version::remap_formats(&mut file, src_p, dst_p);

    // Toward current naming the Dragon-Engine face layer applies only for a
    // DE destination; toward legacy naming it must always be peeled off.
    let de_layer = if dst_p.new_bones {
        dst_p.dragon_engine
    } else {
        true
    };
    for anm in &mut file.animations {
        for bone in &mut anm.bones {
            let renamed = names::rename_bone(bone.name.as_str(), dst_p.new_bones, de_layer);
            if renamed != bone.name.as_str() {
                bone.name.rename(renamed);
            }
        }
    }

    match opts.reset {
        ResetMode::None => {}
        ResetMode::Origin => {
            for anm in &mut file.animations {
                topology::reset_vector(anm, src_p.new_bones, true, motion, None, 0.0);
            }
        }
        ResetMode::Scene { offset, add_height } => {
            for anm in &mut file.animations {
                topology::reset_vector(
                    anm,
                    src_p.new_bones,
                    src_p.dragon_engine,
                    false,
                    Some(offset),
                    add_height,
                );
            }
        }
    }

    let target = opts.target_skeleton.as_ref();
    let graphs = &mut file.graphs;
    if src_p.new_bones {
        if !dst_p.new_bones || (src_p.dragon_engine && !dst_p.dragon_engine) {
            for anm in &mut file.animations {
                topology::merge_root(anm, graphs, src_p, dst_p);
            }
        } else if !src_p.dragon_engine && dst_p.dragon_engine {
            for anm in &mut file.animations {
                topology::split_root(anm, src_p, dst_p, motion, target);
            }
        }
    } else if dst_p.new_bones {
        for anm in &mut file.animations {
            topology::split_root(anm, src_p, dst_p, motion, target);
        }
    }

    if dst_p.new_bones && !dst_p.dragon_engine {
        for anm in &mut file.animations {
            topology::finger_pos(anm, graphs, target);
        }
    }

    if src_p.dragon_engine && !dst_p.dragon_engine {
        for anm in &mut file.animations {
            reparent::de_to_old_kosi(anm, graphs);
        }
    } else if !src_p.dragon_engine && dst_p.dragon_engine {
        for anm in &mut file.animations {
            reparent::old_to_de_kosi(anm, graphs);
        }
    }

    if opts.has_retarget() {
        match (&opts.source_skeleton, &opts.target_skeleton) {
            (Some(source), Some(target)) => {
                for anm in &mut file.animations {
                    retarget::transform_bones(
                        anm,
                        source,
                        target,
                        dst_p.new_bones,
                        dst_p.dragon_engine,
                        opts,
                    );
                }
            }
            _ => tracing::warn!(
                "retarget requested without both reference skeletons, skipping"
            ),
        }
    }

    file.refresh();
    Ok(gmt::encode(&file))
}
