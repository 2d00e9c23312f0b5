//! Hip-chain reparenting.
//!
//! Pre-Dragon-Engine skeletons keep the two hip bones (`ketu`, `kosi`) as
//! siblings under the root; the Dragon Engine parents `kosi` under `ketu`.
//! Animated rotations are local to the parent, so crossing that boundary
//! composes the parent rotation into (or out of) the child track. Parent
//! samples are looked up step-hold when the two tracks disagree on keyframes.

use glam::Quat;

use crate::model::{Animation, Curve, CurveValues, GraphRegistry};

/// Clone `template` with every rotation sample replaced by identity.
fn identity_filled(template: &Curve) -> Curve {
    let mut c = template.clone();
    c.values = match &c.values {
        CurveValues::Quat(v) => CurveValues::Quat(vec![Quat::IDENTITY; v.len()]),
        CurveValues::AxisW(v) => CurveValues::AxisW(vec![[0.0, 1.0]; v.len()]),
        other => other.clone(),
    };
    c
}

fn zero_values(curve: &mut Curve) {
    curve.values = match &curve.values {
        CurveValues::Single(v) => CurveValues::Single(vec![0.0; v.len()]),
        CurveValues::AxisW(v) => CurveValues::AxisW(vec![[0.0, 0.0]; v.len()]),
        CurveValues::Vec3(v) => CurveValues::Vec3(vec![glam::Vec3::ZERO; v.len()]),
        CurveValues::Quat(v) => CurveValues::Quat(vec![Quat::from_xyzw(0.0, 0.0, 0.0, 0.0); v.len()]),
    };
}

/// Rewrite `child` rotation samples as `op(parent_sample, child_sample)`,
/// with the parent sampled step-hold on the child's keyframes.
fn compose_rotations(
    parent: &Curve,
    child: &mut Curve,
    graphs: &GraphRegistry,
    op: impl Fn(Quat, Quat) -> Quat,
) {
    child.neutralize();
    let child_frames = graphs.get(child.graph).keyframes().to_vec();
    let parent_graph = graphs.get(parent.graph);
    if let CurveValues::Quat(values) = &mut child.values {
        for (i, &frame) in child_frames.iter().enumerate() {
            let p = parent.quat_at(parent_graph.step_hold_index(frame));
            values[i] = op(p, values[i]);
        }
    }
}

/// Make `kosi` a child of `ketu`: zero its position track and divide the
/// parent rotation out of its rotation track. A missing child rotation track
/// is identity-filled on the parent's keyframes first.
pub fn old_to_de_kosi(anm: &mut Animation, graphs: &GraphRegistry) {
    let (Some(ke_i), Some(ko_i)) = (anm.bone_containing("ketu"), anm.bone_containing("kosi"))
    else {
        return;
    };
    let parent_rots: Vec<Curve> = anm.bones[ke_i].rotation_curves().cloned().collect();
    let kosi = &mut anm.bones[ko_i];

    let mut curves: Vec<Curve> = kosi
        .position_curves()
        .cloned()
        .map(|mut c| {
            zero_values(&mut c);
            c
        })
        .collect();

    let mut rotations: Vec<Curve> = kosi.rotation_curves().cloned().collect();
    if rotations.is_empty() {
        rotations = parent_rots.iter().map(identity_filled).collect();
    }
    for (ke, ko) in parent_rots.iter().zip(&mut rotations) {
        compose_rotations(ke, ko, graphs, |p, c| p.inverse() * c);
    }
    curves.extend(rotations);
    kosi.curves = curves;
}

/// Make `kosi` a sibling of `ketu` again: copy the parent position track
/// onto it and fold the parent rotation back into its rotation track.
pub fn de_to_old_kosi(anm: &mut Animation, graphs: &GraphRegistry) {
    let (Some(ke_i), Some(ko_i)) = (anm.bone_containing("ketu"), anm.bone_containing("kosi"))
    else {
        return;
    };
    let parent_poss: Vec<Curve> = anm.bones[ke_i].position_curves().cloned().collect();
    let parent_rots: Vec<Curve> = anm.bones[ke_i].rotation_curves().cloned().collect();
    let kosi = &mut anm.bones[ko_i];

    let mut positions: Vec<Curve> = kosi.position_curves().cloned().collect();
    if positions.is_empty() {
        positions = parent_poss.clone();
    } else {
        for (ke, ko) in parent_poss.iter().zip(&mut positions) {
            let Some(samples) = ke.position_samples() else {
                continue;
            };
            ko.neutralize();
            let frames = graphs.get(ko.graph).keyframes().to_vec();
            let parent_graph = graphs.get(ke.graph);
            if let CurveValues::Vec3(values) = &mut ko.values {
                for (i, &frame) in frames.iter().enumerate() {
                    values[i] = samples
                        .get(parent_graph.step_hold_index(frame))
                        .copied()
                        .unwrap_or(glam::Vec3::ZERO);
                }
            }
        }
    }
    let mut curves = positions;

    let mut rotations: Vec<Curve> = kosi.rotation_curves().cloned().collect();
    if rotations.is_empty() {
        rotations = parent_rots.iter().map(identity_filled).collect();
    }
    for (ke, ko) in parent_rots.iter().zip(&mut rotations) {
        compose_rotations(ke, ko, graphs, |p, c| p * c);
    }
    curves.extend(rotations);
    kosi.curves = curves;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bone, GmtFile};
    use glam::Vec3;

    fn quats_close(a: Quat, b: Quat, tol: f32) -> bool {
        (a.x - b.x).abs() < tol
            && (a.y - b.y).abs() < tol
            && (a.z - b.z).abs() < tol
            && (a.w - b.w).abs() < tol
    }

    fn hip_anim(graphs: &mut GraphRegistry) -> Animation {
        let g = graphs.intern(vec![0, 4, 8]);
        let mut anm = Animation::new("a");

        let mut ketu = Bone::new("ketu_c_n");
        ketu.curves.push(Curve::new_position(
            g,
            vec![
                Vec3::new(0.0, 0.9, 0.0),
                Vec3::new(0.1, 0.9, 0.0),
                Vec3::new(0.2, 0.9, 0.0),
            ],
        ));
        ketu.curves.push(Curve::new_rotation(
            g,
            vec![
                Quat::from_rotation_y(0.3),
                Quat::from_rotation_y(0.6),
                Quat::from_rotation_y(0.9),
            ],
        ));

        let mut kosi = Bone::new("kosi_c_n");
        kosi.curves.push(Curve::new_position(
            g,
            vec![Vec3::new(0.0, 0.85, 0.0); 3],
        ));
        kosi.curves.push(Curve::new_rotation(
            g,
            vec![
                Quat::from_rotation_x(0.2),
                Quat::from_rotation_x(0.4),
                Quat::from_rotation_x(0.6),
            ],
        ));
        anm.bones.push(ketu);
        anm.bones.push(kosi);
        anm
    }

    #[test]
    fn test_old_to_de_zeroes_position() {
        let mut file = GmtFile::new(0);
        let mut anm = hip_anim(&mut file.graphs);
        old_to_de_kosi(&mut anm, &file.graphs);
        let kosi = &anm.bones[1];
        let pos = kosi.position_curves().next().unwrap();
        assert_eq!(pos.values, CurveValues::Vec3(vec![Vec3::ZERO; 3]));
    }

    #[test]
    fn test_reparent_roundtrip_restores_rotation() {
        let mut file = GmtFile::new(0);
        let mut anm = hip_anim(&mut file.graphs);
        let original: Vec<Quat> = (0..3)
            .map(|i| anm.bones[1].rotation_curves().next().unwrap().quat_at(i))
            .collect();

        old_to_de_kosi(&mut anm, &file.graphs);
        de_to_old_kosi(&mut anm, &file.graphs);

        let rot = anm.bones[1].rotation_curves().next().unwrap();
        for (i, q) in original.iter().enumerate() {
            assert!(quats_close(rot.quat_at(i), *q, 1e-5));
        }
        // Sibling layout: kosi position equals ketu position again.
        let ke_pos = anm.bones[0].position_curves().next().unwrap().position_samples();
        let ko_pos = anm.bones[1].position_curves().next().unwrap().position_samples();
        assert_eq!(ke_pos, ko_pos);
    }

    #[test]
    fn test_missing_child_rotation_identity_filled() {
        let mut file = GmtFile::new(0);
        let mut anm = hip_anim(&mut file.graphs);
        anm.bones[1].curves.retain(|c| c.is_position());

        old_to_de_kosi(&mut anm, &file.graphs);
        let rot = anm.bones[1].rotation_curves().next().unwrap();
        // Identity child under op(p, c) = p^-1 * c gives p^-1.
        assert!(quats_close(
            rot.quat_at(1),
            Quat::from_rotation_y(0.6).inverse(),
            1e-5
        ));
    }

    #[test]
    fn test_step_hold_parent_lookup() {
        let mut file = GmtFile::new(0);
        let g_parent = file.graphs.intern(vec![0, 8]);
        let g_child = file.graphs.intern(vec![0, 4, 8]);
        let mut anm = Animation::new("a");

        let mut ketu = Bone::new("ketu_c_n");
        ketu.curves.push(Curve::new_rotation(
            g_parent,
            vec![Quat::from_rotation_y(0.5), Quat::from_rotation_y(1.0)],
        ));
        let mut kosi = Bone::new("kosi_c_n");
        kosi.curves
            .push(Curve::new_rotation(g_child, vec![Quat::IDENTITY; 3]));
        anm.bones.push(ketu);
        anm.bones.push(kosi);

        old_to_de_kosi(&mut anm, &file.graphs);
        let rot = anm.bones[1].rotation_curves().next().unwrap();
        // Frame 4 holds the parent's sample at 0, not the one at 8.
        assert!(quats_close(
            rot.quat_at(1),
            Quat::from_rotation_y(0.5).inverse(),
            1e-5
        ));
    }
}
