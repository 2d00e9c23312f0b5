//! Back-to-back concatenation of animation and camera containers.
//!
//! Cutscenes ship as one file per take; playback wants one container. Curves
//! are zipped by position, the second timeline is shifted past the end of
//! the first, and values are appended. Keyframe indices are 16-bit, so a
//! pair whose combined length would overflow is refused and starts a new
//! output file instead of failing the batch.

use crate::formats::cmt::{self, CmtFile};
use crate::formats::gmt;
use crate::model::{CurveValues, GmtFile, MAX_KEYFRAME};

/// Result of one pairwise merge. `Overflow` is an expected outcome, not an
/// error: the caller starts a new output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged,
    Overflow,
}

/// One encoded output container and how many inputs it absorbed.
#[derive(Debug, Clone)]
pub struct MergedFile {
    pub bytes: Vec<u8>,
    pub parts: usize,
}

/// Last keyframe across the animation's timelines.
fn last_keyframe(file: &GmtFile) -> u32 {
    file.animations
        .first()
        .map(|anm| anm.last_keyframe(&file.graphs) as u32)
        .unwrap_or(0)
}

/// Append `second`'s first animation after `first`'s, curve by curve.
pub fn merge_into(first: &mut GmtFile, second: &GmtFile) -> MergeOutcome {
    if first.animations.is_empty() || second.animations.is_empty() {
        tracing::debug!("merge with an empty container is a no-op");
        return MergeOutcome::Merged;
    }
    // Every shifted keyframe is at most last_a + 1 + last_b, which must
    // still fit in a u16.
    if last_keyframe(first) + 1 + last_keyframe(second) > MAX_KEYFRAME as u32 {
        return MergeOutcome::Overflow;
    }

    let anm_b = second.animations[0].clone();
    let anm_a = &mut first.animations[0];
    for (bone_a, bone_b) in anm_a.bones.iter_mut().zip(&anm_b.bones) {
        for (curve_a, curve_b) in bone_a.curves.iter_mut().zip(&bone_b.curves) {
            curve_a.neutralize();
            let mut curve_b = curve_b.clone();
            curve_b.neutralize();

            let shift = first.graphs.get(curve_a.graph).last().saturating_add(1);
            let mut keyframes = first.graphs.get(curve_a.graph).keyframes().to_vec();
            keyframes.extend(
                second
                    .graphs
                    .get(curve_b.graph)
                    .keyframes()
                    .iter()
                    .map(|&k| k + shift),
            );

            match (&mut curve_a.values, curve_b.values) {
                (CurveValues::Vec3(a), CurveValues::Vec3(b)) => a.extend(b),
                (CurveValues::Quat(a), CurveValues::Quat(b)) => a.extend(b),
                (a, b) => {
                    tracing::warn!(
                        "curve pair disagrees on arity after neutralize ({a:?} vs {b:?}), skipping"
                    );
                    continue;
                }
            }
            curve_a.graph = first.graphs.intern(keyframes);
        }
    }

    first.refresh();
    MergeOutcome::Merged
}

/// Merge a batch of motion containers into as few outputs as the keyframe
/// ceiling allows. Never fails: an overflowing pair closes the current
/// output and opens the next one.
pub fn merge_motions(files: Vec<GmtFile>) -> Vec<MergedFile> {
    let mut out = Vec::new();
    let mut iter = files.into_iter();
    let Some(mut acc) = iter.next() else {
        return out;
    };
    let mut parts = 1;

    for next in iter {
        match merge_into(&mut acc, &next) {
            MergeOutcome::Merged => parts += 1,
            MergeOutcome::Overflow => {
                out.push(MergedFile {
                    bytes: gmt::encode(&acc),
                    parts,
                });
                acc = next;
                parts = 1;
            }
        }
    }
    out.push(MergedFile {
        bytes: gmt::encode(&acc),
        parts,
    });
    out
}

/// Append `second`'s camera tracks frame data after `first`'s, track by
/// track. Camera frames are stored densely with 32-bit counts, so this
/// never overflows.
pub fn merge_camera_into(first: &mut CmtFile, second: &CmtFile) {
    for (track_a, track_b) in first.animations.iter_mut().zip(&second.animations) {
        track_a.frames.extend(track_b.frames.iter().copied());
    }
}

/// Merge a batch of camera containers into one output.
pub fn merge_cameras(files: Vec<CmtFile>) -> Vec<MergedFile> {
    let mut iter = files.into_iter();
    let Some(mut acc) = iter.next() else {
        return Vec::new();
    };
    let mut parts = 1;
    for next in iter {
        merge_camera_into(&mut acc, &next);
        parts += 1;
    }
    vec![MergedFile {
        bytes: cmt::encode(&acc),
        parts,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::cmt::{CameraFrame, CameraTrack};
    use crate::model::{Animation, Bone, Curve};
    use crate::profile::VERSION_GEN5;
    use glam::Vec3;

    fn motion(keyframes: Vec<u16>) -> GmtFile {
        let mut file = GmtFile::new(VERSION_GEN5);
        let n = keyframes.len();
        let g = file.graphs.intern(keyframes);
        let mut anm = Animation::new("take");
        let mut bone = Bone::new("center_c_n");
        bone.curves.push(Curve::new_position(
            g,
            (0..n).map(|i| Vec3::splat(i as f32)).collect(),
        ));
        anm.bones.push(bone);
        file.animations.push(anm);
        file.refresh();
        file
    }

    #[test]
    fn test_merge_shifts_second_timeline() {
        let mut a = motion(vec![0, 5, 10]);
        let b = motion(vec![0, 3]);
        assert_eq!(merge_into(&mut a, &b), MergeOutcome::Merged);

        let curve = &a.animations[0].bones[0].curves[0];
        assert_eq!(a.graphs.get(curve.graph).keyframes(), &[0, 5, 10, 11, 14]);
        assert_eq!(curve.values.len(), 5);
        assert_eq!(a.animations[0].frame_count, 5);
    }

    #[test]
    fn test_merge_overflow_refused() {
        let mut a = motion(vec![0, 60_000]);
        let b = motion(vec![0, 6_000]);
        assert_eq!(merge_into(&mut a, &b), MergeOutcome::Overflow);
        // Refusal leaves the first container untouched.
        let curve = &a.animations[0].bones[0].curves[0];
        assert_eq!(a.graphs.get(curve.graph).keyframes(), &[0, 60_000]);
    }

    #[test]
    fn test_merge_at_keyframe_ceiling() {
        // 60000 + 1 + 5535 = 65536 does not fit in a u16.
        let mut a = motion(vec![0, 60_000]);
        assert_eq!(merge_into(&mut a, &motion(vec![0, 5_535])), MergeOutcome::Overflow);

        // One keyframe less lands exactly on the ceiling.
        let mut a = motion(vec![0, 60_000]);
        assert_eq!(merge_into(&mut a, &motion(vec![0, 5_534])), MergeOutcome::Merged);
        let curve = &a.animations[0].bones[0].curves[0];
        assert_eq!(
            a.graphs.get(curve.graph).keyframes(),
            &[0, 60_000, 60_001, MAX_KEYFRAME]
        );
    }

    #[test]
    fn test_merge_motions_partitions_on_overflow() {
        let files = vec![
            motion(vec![0, 30_000]),
            motion(vec![0, 30_000]),
            motion(vec![0, 30_000]),
        ];
        let out = merge_motions(files);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].parts, 2);
        assert_eq!(out[1].parts, 1);
    }

    #[test]
    fn test_merge_chains_sequentially() {
        let mut acc = motion(vec![0, 4]);
        merge_into(&mut acc, &motion(vec![0, 2]));
        merge_into(&mut acc, &motion(vec![0, 1]));

        let curve = &acc.animations[0].bones[0].curves[0];
        assert_eq!(acc.graphs.get(curve.graph).keyframes(), &[0, 4, 5, 7, 8, 9]);
        assert_eq!(curve.values.len(), 6);
    }

    #[test]
    fn test_merge_cameras_concatenates_frames() {
        let mut a = CmtFile::new(VERSION_GEN5);
        a.animations.push(CameraTrack {
            frame_rate: 30.0,
            format: 0,
            frames: vec![CameraFrame::default(); 3],
        });
        let mut b = CmtFile::new(VERSION_GEN5);
        b.animations.push(CameraTrack {
            frame_rate: 30.0,
            format: 0,
            frames: vec![CameraFrame::default(); 2],
        });

        let out = merge_cameras(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].parts, 2);
        let parsed = cmt::decode(&out[0].bytes).unwrap();
        assert_eq!(parsed.animations[0].frames.len(), 5);
    }
}
