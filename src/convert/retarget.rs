//! Rest-pose retargeting between two reference skeletons.
//!
//! Animated positions are parent-relative offsets from the rest pose, so
//! moving a clip onto a skeleton with different proportions means shifting
//! each track by the difference of the two rest poses. The source skeleton
//! is renamed to the animation's naming convention before any lookup;
//! cross-game correspondence is partial, so misses skip the bone with a
//! warning instead of failing the conversion.

use glam::Vec3;
use hashbrown::HashMap;

use crate::model::{Animation, Bone, Curve, CurveValues};
use crate::names;
use crate::skeleton::RefSkeleton;

use super::TranslationOptions;

/// Parent substitutions recorded by the reparent pass, keyed by bone name.
/// The subtree pass consults these so later deltas are computed against the
/// parent the bone now follows, not the one the source skeleton records.
type ParentOverrides = HashMap<String, (String, Vec3)>;

fn shift_position(bone: &mut Bone, delta: Vec3) {
    if let Some(pos) = bone.position_curve_mut() {
        pos.neutralize();
        if let CurveValues::Vec3(v) = &mut pos.values {
            for p in v {
                *p += delta;
            }
        }
    }
}

/// Apply the enabled retarget passes to one animation.
///
/// `new_bones`/`is_de` are the destination profile's naming flags; the
/// source skeleton is renamed through them so its names line up with the
/// already-renamed animation bones.
pub fn transform_bones(
    anm: &mut Animation,
    source: &RefSkeleton,
    target: &RefSkeleton,
    new_bones: bool,
    is_de: bool,
    opts: &TranslationOptions,
) {
    let source = source.renamed(new_bones, is_de);
    let mut overrides = ParentOverrides::new();

    if opts.reparent {
        reparent_pass(anm, &source, target, &mut overrides);
    }
    if opts.face {
        let root = if new_bones { "face_c_n" } else { "face" };
        translate(anm, &source, target, &overrides, root, &[], is_de);
    }
    if opts.hand {
        translate(anm, &source, target, &overrides, "ude3_r_n", &[], is_de);
        translate(anm, &source, target, &overrides, "ude3_l_n", &[], is_de);
    }
    if opts.body {
        if new_bones {
            translate(
                anm,
                &source,
                target,
                &overrides,
                "center_c_n",
                &["face_c_n", "ude3_r_n", "ude3_l_n"],
                is_de,
            );
        } else {
            translate(
                anm,
                &source,
                target,
                &overrides,
                "center",
                &["face", "ude3_r_n", "ude3_l_n"],
                is_de,
            );
        }
    }
}

/// Move each animated bone from its source parent onto the parent the
/// target skeleton gives it, shifting the track by the rest-pose delta
/// between the two parents.
fn reparent_pass(
    anm: &mut Animation,
    source: &RefSkeleton,
    target: &RefSkeleton,
    overrides: &mut ParentOverrides,
) {
    for bone_t in target.bones() {
        let Some(anm_index) = anm.bone_named(&bone_t.name) else {
            continue;
        };
        let s_index = source.index_of(&bone_t.name);
        let parent_s_global = s_index.map(|i| source.parent_global(i)).unwrap_or(Vec3::ZERO);

        // The new parent: the target parent's counterpart in the source
        // skeleton when it has one, otherwise the target parent itself.
        let parent_t = bone_t.parent.map(|p| target.bone(p));
        let parent_new = parent_t
            .map(|pt| {
                source
                    .get(&pt.name)
                    .map(|b| (b.name.clone(), b.global_pos))
                    .unwrap_or_else(|| (pt.name.clone(), pt.global_pos))
            })
            .unwrap_or_default();

        if s_index.is_some() {
            overrides.insert(bone_t.name.clone(), parent_new.clone());
        }

        shift_position(
            &mut anm.bones[anm_index],
            parent_s_global - parent_new.1,
        );
    }
}

/// Retarget every animated descendant of `start` in the source skeleton,
/// skipping the subtrees rooted at `stops`.
fn translate(
    anm: &mut Animation,
    source: &RefSkeleton,
    target: &RefSkeleton,
    overrides: &ParentOverrides,
    start: &str,
    stops: &[&str],
    is_de: bool,
) {
    let Some(start_index) = source.index_containing(start) else {
        tracing::warn!(root = start, "retarget root missing from source skeleton");
        return;
    };

    let mut stop_names: Vec<&str> = Vec::new();
    for stop in stops {
        if let Some(stop_index) = source.index_containing(stop) {
            stop_names.extend(
                source
                    .descendants(stop_index)
                    .into_iter()
                    .map(|i| source.bone(i).name.as_str()),
            );
        }
    }

    for i in source.descendants(start_index) {
        let b_s = source.bone(i);
        if stop_names.contains(&b_s.name.as_str()) {
            continue;
        }
        let Some(t_index) = target.index_of(&b_s.name) else {
            tracing::warn!(bone = %b_s.name, "bone missing from target skeleton");
            continue;
        };
        let b_t = target.bone(t_index);

        let (p_s_name, p_s_global) = overrides.get(&b_s.name).cloned().unwrap_or_else(|| {
            b_s.parent
                .map(|p| (source.bone(p).name.clone(), source.bone(p).global_pos))
                .unwrap_or_default()
        });

        // Prefer the target ancestor matching the source parent's name over
        // the direct target parent.
        let mut p_t_global = b_t.parent.map(|p| target.bone(p).global_pos).unwrap_or(Vec3::ZERO);
        for a in target.ancestors(t_index) {
            if target.bone(a).name == p_s_name {
                p_t_global = target.bone(a).global_pos;
                break;
            }
        }

        let Some(anm_index) = anm.bone_named(&b_s.name) else {
            continue;
        };
        let delta = (p_s_global - b_s.global_pos) + (b_t.global_pos - p_t_global);
        shift_position(&mut anm.bones[anm_index], delta);
    }

    if start.contains("face") && is_de {
        synthesize_lip_sides(anm, target);
    }
}

/// The Dragon-Engine face rigs animate an upper lip-side bone the older rigs
/// never carried. Derive it from the lower lip-side track, offset by the
/// rest-pose difference between the two bones.
fn synthesize_lip_sides(anm: &mut Animation, target: &RefSkeleton) {
    for (side_name, btm_name) in [
        ("_lip_side_r_n", "_lip_btm_side1_r_n"),
        ("_lip_side_l_n", "_lip_btm_side1_l_n"),
    ] {
        let de_name = names::DE_FACE_FROM_CURRENT
            .get(side_name)
            .map(String::as_str)
            .unwrap_or(side_name);
        let Some(side_t) = target.get(side_name).or_else(|| target.get(de_name)) else {
            continue;
        };
        let Some(btm_t) = target.get(btm_name) else {
            continue;
        };
        let Some(btm_index) = anm.bone_named(btm_name) else {
            continue;
        };
        let Some(btm_pos) = anm.bones[btm_index].position_curves().next() else {
            continue;
        };
        let Some(samples) = btm_pos.position_samples() else {
            continue;
        };

        let delta = side_t.global_pos - btm_t.global_pos;
        let mut side = Bone::new(de_name);
        side.curves.push(Curve::new_position(
            btm_pos.graph,
            samples.into_iter().map(|p| p + delta).collect(),
        ));
        anm.bones.push(side);
    }
}

/// Flat face retarget: shift each animated bone directly under the two face
/// regions (face carrier and jaw) by its rest-pose delta, without walking
/// the full subtree.
pub fn translate_face_flat(anm: &mut Animation, source: &RefSkeleton, target: &RefSkeleton) {
    let roots = [source.face_roots().0, source.face_roots().1];
    for region_s_index in roots.into_iter().flatten() {
        let region_s = source.bone(region_s_index);
        let Some(region_t_index) = target.index_of(&region_s.name) else {
            tracing::warn!(region = %region_s.name, "face region missing from target skeleton");
            continue;
        };
        let region_t = target.bone(region_t_index);

        for &child in source.children_of(region_s_index) {
            let b_s = source.bone(child);
            let Some(b_t) = target
                .children_of(region_t_index)
                .iter()
                .map(|&i| target.bone(i))
                .find(|b| b.name == b_s.name)
            else {
                continue;
            };
            let Some(anm_index) = anm.bone_named(&b_s.name) else {
                continue;
            };
            let delta =
                (region_s.global_pos - b_s.global_pos) + (b_t.global_pos - region_t.global_pos);
            shift_position(&mut anm.bones[anm_index], delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GmtFile, GraphRegistry};
    use crate::skeleton::test_support::chain;

    fn options(face: bool, body: bool, reparent: bool) -> TranslationOptions {
        TranslationOptions {
            reparent,
            face,
            hand: false,
            body,
            ..TranslationOptions::default()
        }
    }

    fn body_skeleton(arm_y: f32) -> RefSkeleton {
        chain(&[
            ("center_c_n", None, Vec3::new(0.0, 1.0, 0.0)),
            ("mune_c_n", Some(0), Vec3::new(0.0, 1.4, 0.0)),
            ("ude1_r_n", Some(1), Vec3::new(-0.2, arm_y, 0.0)),
        ])
    }

    fn arm_anim(graphs: &mut GraphRegistry) -> Animation {
        let g = graphs.intern(vec![0, 2]);
        let mut anm = Animation::new("a");
        let mut arm = Bone::new("ude1_r_n");
        arm.curves.push(Curve::new_position(
            g,
            vec![Vec3::new(-0.2, 0.0, 0.0), Vec3::new(-0.3, 0.1, 0.0)],
        ));
        anm.bones.push(arm);
        anm
    }

    fn pos_values(bone: &Bone) -> Vec<Vec3> {
        bone.position_curves()
            .next()
            .and_then(Curve::position_samples)
            .unwrap()
    }

    #[test]
    fn test_identity_retarget_is_noop() {
        let mut file = GmtFile::new(0);
        let mut anm = arm_anim(&mut file.graphs);
        let before = pos_values(&anm.bones[0]);

        let skel = body_skeleton(1.35);
        transform_bones(&mut anm, &skel, &skel, true, false, &options(false, true, false));
        assert_eq!(pos_values(&anm.bones[0]), before);
    }

    #[test]
    fn test_body_retarget_shifts_by_rest_delta() {
        let mut file = GmtFile::new(0);
        let mut anm = arm_anim(&mut file.graphs);
        let before = pos_values(&anm.bones[0]);

        let source = body_skeleton(1.35);
        // Target carries the arm 0.05 lower relative to the chest.
        let target = body_skeleton(1.30);
        transform_bones(
            &mut anm,
            &source,
            &target,
            true,
            false,
            &options(false, true, false),
        );

        let after = pos_values(&anm.bones[0]);
        // The chest is unchanged, so only the arm's rest height moves the track.
        for (a, b) in after.iter().zip(&before) {
            assert!((*a - (*b + Vec3::new(0.0, -0.05, 0.0))).length() < 1e-6);
        }
    }

    #[test]
    fn test_missing_bone_skipped() {
        let mut file = GmtFile::new(0);
        let mut anm = arm_anim(&mut file.graphs);
        let before = pos_values(&anm.bones[0]);

        let source = body_skeleton(1.35);
        let target = chain(&[("center_c_n", None, Vec3::new(0.0, 1.0, 0.0))]);
        transform_bones(
            &mut anm,
            &source,
            &target,
            true,
            false,
            &options(false, true, false),
        );
        assert_eq!(pos_values(&anm.bones[0]), before);
    }

    #[test]
    fn test_lip_side_synthesis() {
        let mut file = GmtFile::new(0);
        let g = file.graphs.intern(vec![0]);
        let mut anm = Animation::new("a");
        let mut btm = Bone::new("_lip_btm_side1_r_n");
        btm.curves
            .push(Curve::new_position(g, vec![Vec3::new(0.01, 0.0, 0.0)]));
        anm.bones.push(btm);

        let target = chain(&[
            ("face_c_n", None, Vec3::new(0.0, 1.6, 0.0)),
            ("_lip_top_side1_r_n", Some(0), Vec3::new(-0.02, 1.55, 0.08)),
            ("_lip_btm_side1_r_n", Some(0), Vec3::new(-0.02, 1.53, 0.08)),
        ]);
        synthesize_lip_sides(&mut anm, &target);

        let side = &anm.bones[anm.bone_named("_lip_top_side1_r_n").unwrap()];
        assert_eq!(
            pos_values(side),
            vec![Vec3::new(0.01, 0.02, 0.0)]
        );
    }

    #[test]
    fn test_flat_face_translate() {
        let mut file = GmtFile::new(0);
        let g = file.graphs.intern(vec![0]);
        let mut anm = Animation::new("a");
        let mut brow = Bone::new("_brow_c_n");
        brow.curves
            .push(Curve::new_position(g, vec![Vec3::new(0.0, 0.05, 0.0)]));
        anm.bones.push(brow);

        let source = chain(&[
            ("face_c_n", None, Vec3::new(0.0, 1.60, 0.0)),
            ("_brow_c_n", Some(0), Vec3::new(0.0, 1.70, 0.05)),
        ]);
        let target = chain(&[
            ("face_c_n", None, Vec3::new(0.0, 1.60, 0.0)),
            ("_brow_c_n", Some(0), Vec3::new(0.0, 1.72, 0.05)),
        ]);
        translate_face_flat(&mut anm, &source, &target);
        let v = pos_values(&anm.bones[0]);
        assert!((v[0] - Vec3::new(0.0, 0.07, 0.0)).length() < 1e-6);
    }
}
