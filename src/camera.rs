//! Camera-track scene placement.
//!
//! Cutscene cameras are authored against a scene origin; replaying one in a
//! different scene means shifting every positional sample by the new origin.
//! Pre-Dragon-Engine scenes additionally measure height from the root bone's
//! rest height rather than the floor.

use glam::Vec3;

use crate::convert::topology::PRE_DE_CENTER_HEIGHT;
use crate::error::ConvertError;
use crate::formats::cmt;

/// Shift every camera position and focus sample by `-offset`, keeping
/// `add_height` (plus the pre-DE rest height where it applies) of elevation.
pub fn reset_origin(
    bytes: &[u8],
    offset: Vec3,
    add_height: f32,
    dragon_engine: bool,
) -> Result<Vec<u8>, ConvertError> {
    let mut file = cmt::decode(bytes)?;

    let mut height = add_height;
    if !dragon_engine {
        height += PRE_DE_CENTER_HEIGHT;
    }
    let shift = offset - Vec3::new(0.0, height, 0.0);

    for track in &mut file.animations {
        for frame in &mut track.frames {
            frame.pos -= shift;
            frame.focus -= shift;
        }
    }
    Ok(cmt::encode(&file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::cmt::{CameraFrame, CameraTrack, CmtFile};
    use crate::profile::VERSION_DRAGON;

    fn sample() -> Vec<u8> {
        let mut file = CmtFile::new(VERSION_DRAGON);
        file.animations.push(CameraTrack {
            frame_rate: 30.0,
            format: 0,
            frames: vec![CameraFrame {
                pos: Vec3::new(2.0, 3.0, 4.0),
                fov: 45.0,
                focus: Vec3::new(2.0, 1.5, 0.0),
                roll: 0.0,
            }],
        });
        cmt::encode(&file)
    }

    #[test]
    fn test_reset_origin_dragon_engine() {
        let out = reset_origin(&sample(), Vec3::new(2.0, 1.0, 4.0), 0.0, true).unwrap();
        let file = cmt::decode(&out).unwrap();
        let frame = &file.animations[0].frames[0];
        assert_eq!(frame.pos, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(frame.focus, Vec3::new(0.0, 0.5, -4.0));
        // Non-positional channels are untouched.
        assert_eq!(frame.fov, 45.0);
    }

    #[test]
    fn test_reset_origin_pre_de_keeps_rest_height() {
        let out = reset_origin(&sample(), Vec3::new(0.0, 1.0, 0.0), 0.0, false).unwrap();
        let file = cmt::decode(&out).unwrap();
        let frame = &file.animations[0].frames[0];
        assert!((frame.pos.y - (3.0 - 1.0 + PRE_DE_CENTER_HEIGHT)).abs() < 1e-6);
    }
}
