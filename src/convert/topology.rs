//! Root-bone layout conversion.
//!
//! The legacy skeletons drive the whole body from one root bone; generation 5
//! split its role across a horizontal carrier (`vector`) and a vertical one
//! (`center`), and the Dragon Engine moved everything onto `vector`. These
//! passes redistribute the root curves between the two layouts, fix finger
//! rest positions, and re-zero the root track for scene placement.

use glam::Vec3;

use crate::model::{Animation, Bone, Curve, CurveValues, GraphRegistry, add_curves};
use crate::names;
use crate::profile::GameProfile;
use crate::skeleton::RefSkeleton;

/// Rest height of the root bone in pre-Dragon-Engine skeletons.
pub const PRE_DE_CENTER_HEIGHT: f32 = 1.14;

/// Subtract `delta` from every sample of the bone's first position curve,
/// neutralizing it first. No-op when the bone has no position curve.
fn offset_position(bone: &mut Bone, delta: Vec3) {
    if let Some(pos) = bone.position_curve_mut() {
        pos.neutralize();
        if let CurveValues::Vec3(v) = &mut pos.values {
            for p in v {
                *p -= delta;
            }
        }
    }
}

/// Split the single legacy root into the center/vector pair (or collapse
/// everything onto `vector` for a Dragon-Engine destination).
///
/// `motion` distinguishes looping motion clips from scene-placed cutscene
/// tracks; they disagree about which carrier keeps the vertical component.
pub fn split_root(
    anm: &mut Animation,
    src: GameProfile,
    dst: GameProfile,
    motion: bool,
    target: Option<&RefSkeleton>,
) {
    let Some(c_index) = anm.bone_containing("center") else {
        return;
    };
    let v_index = anm.bone_containing("vector");
    let mut center = anm.bones[c_index].clone();
    let mut vector = match v_index {
        Some(i) => anm.bones[i].clone(),
        None => Bone::new("vector_c_n"),
    };

    if dst.dragon_engine {
        if !motion {
            // Scene track: re-root against the rest pose, then move every
            // root curve onto vector.
            if center.curves.iter().any(Curve::is_position) {
                let origin = target
                    .and_then(|s| {
                        s.index_containing("center").map(|i| s.bone(i).global_pos)
                    })
                    .unwrap_or(Vec3::new(0.0, PRE_DE_CENTER_HEIGHT, 0.0));
                offset_position(&mut center, origin);
                vector.curves = std::mem::take(&mut center.curves);
            }
        } else if !src.new_bones {
            // Motion clip from a single-root source: vector takes the full
            // track, center keeps only the vertical component.
            let verticals: Vec<Curve> = center
                .position_curves()
                .map(Curve::to_vertical)
                .collect();
            vector.curves = std::mem::replace(&mut center.curves, verticals);
        }
    } else {
        // Pre-DE split layout: vector carries the horizontal motion and the
        // root rotation; center keeps the vertical for motion clips.
        let mut moved: Vec<Curve> = center
            .position_curves()
            .map(Curve::to_horizontal)
            .collect();
        moved.extend(center.rotation_curves().cloned());
        vector.curves = moved;
        if motion {
            center.curves = center
                .position_curves()
                .map(Curve::to_vertical)
                .collect();
        }
    }

    anm.bones[c_index] = center;
    match v_index {
        Some(i) => anm.bones[i] = vector,
        None => anm.bones.insert(c_index + 1, vector),
    }
}

/// Collapse the center/vector pair back onto a single root.
///
/// Also drops the `sync` carrier bone, which has no legacy counterpart.
pub fn merge_root(anm: &mut Animation, graphs: &mut GraphRegistry, src: GameProfile, dst: GameProfile) {
    if let Some(c_index) = anm.bone_containing("center") {
        let Some(v_index) = anm.bone_containing("vector") else {
            tracing::warn!("split root without a vector bone, leaving layout unchanged");
            return;
        };

        if src.dragon_engine {
            // Everything already lives on vector.
            let mut root = anm.bones[v_index].clone();
            root.name
                .rename(if dst.new_bones { "center_c_n" } else { "center_n" });
            anm.bones[c_index] = root;
        } else {
            let vector = anm.bones[v_index].clone();
            let center = &anm.bones[c_index];
            let mut curves: Vec<Curve> = center
                .position_curves()
                .map(Curve::to_vertical)
                .zip(vector.position_curves())
                .map(|(c, v)| add_curves(&c, v, graphs))
                .collect();
            curves.extend(vector.rotation_curves().cloned());
            anm.bones[c_index].curves = curves;
        }

        if !dst.new_bones {
            anm.bones.remove(v_index);
        }
    }

    if let Some(sync) = anm.bone_named("sync_c_n") {
        anm.bones.remove(sync);
    }
}

/// Give hand bones without a position curve a one-keyframe rest position.
///
/// The pre-DE split-layout games sample finger positions from the animation
/// rather than the bind pose, so a converted file must carry them. Rest
/// positions come from the target skeleton when supplied, otherwise from the
/// built-in reference hand.
pub fn finger_pos(anm: &mut Animation, graphs: &mut GraphRegistry, target: Option<&RefSkeleton>) {
    let zero = graphs.intern(vec![0]);
    for bone in &mut anm.bones {
        let name = bone.name.as_str();
        if !names::HAND_BONES.iter().any(|h| h == name) {
            continue;
        }
        if bone.curves.iter().any(Curve::is_position) {
            continue;
        }
        let rest = match target {
            Some(skel) => match skel.get(name) {
                Some(b) => b.local_pos,
                None => {
                    tracing::warn!(bone = name, "hand bone missing from target skeleton");
                    continue;
                }
            },
            None => match names::REFERENCE_HAND_REST.get(name) {
                Some(v) => *v,
                None => continue,
            },
        };
        bone.curves.insert(0, Curve::new_position(zero, vec![rest]));
    }
}

/// First sample of the root track in model space: the vector bone's first
/// position, lifted by the center bone's first height when both exist.
pub fn vector_org(anm: &Animation) -> Vec3 {
    let vector = anm.bone_containing("vector");
    let center = anm.bone_containing("center");

    let (root, lift) = match (vector, center) {
        (None, None) => return Vec3::ZERO,
        (None, Some(c)) => (c, 0.0),
        (Some(v), center) => {
            let lift = center
                .and_then(|c| anm.bones[c].position_curves().next())
                .and_then(Curve::position_samples)
                .and_then(|samples| samples.first().map(|p| p.y))
                .unwrap_or(0.0);
            (v, lift)
        }
    };

    let Some(first) = anm.bones[root]
        .position_curves()
        .next()
        .and_then(Curve::position_samples)
        .and_then(|samples| samples.first().copied())
    else {
        return Vec3::ZERO;
    };
    first + Vec3::new(0.0, lift, 0.0)
}

/// Re-zero the root track against `offset` (defaults to the track's own
/// first sample).
///
/// `is_de` reflects which skeleton convention the height correction applies
/// to; `motion` additionally keeps the original height for looping clips.
pub fn reset_vector(
    anm: &mut Animation,
    new_bones: bool,
    is_de: bool,
    motion: bool,
    offset: Option<Vec3>,
    add_offset: f32,
) {
    let offset = offset.unwrap_or_else(|| vector_org(anm));

    let names: &[&str] = match (new_bones, is_de) {
        (false, _) => &["center"],
        (true, true) => &["vector"],
        (true, false) => &["vector", "center"],
    };

    for name in names {
        let mut height = add_offset;
        if !is_de {
            height += PRE_DE_CENTER_HEIGHT;
            if *name == "vector" {
                height = offset.y;
            }
        }
        if motion {
            height += offset.y;
        }

        let Some(index) = anm.bone_containing(name) else {
            return;
        };
        if anm.bones[index].position_curves().next().is_none() {
            return;
        }
        offset_position(
            &mut anm.bones[index],
            offset - Vec3::new(0.0, height, 0.0),
        );
    }
}
