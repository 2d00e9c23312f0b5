//! CMT camera container codec (.cmt)
//!
//! Companion format to the animation container: per-frame camera state with
//! no keyframe graphs, every frame stored explicitly.
//!
//! # Layout
//! ```text
//! Header (32 bytes):
//! 0x00: magic           b"CMTP"
//! 0x04: endianness i8   - -1 = little-endian
//! 0x05: signedness u8   - 1
//! 0x06: pad u16
//! 0x08: version u32
//! 0x0C: file_size u32   - patched after the full buffer is written
//! 0x10: anm_count u32
//! 0x14: reserved u32 x3
//!
//! Track record (16 bytes):
//! 0x00: frame_rate f32
//! 0x04: frame_count u32
//! 0x08: data_offset u32
//! 0x0C: format u32
//!
//! Frame (32 bytes): pos xyz f32, fov f32, focus xyz f32, roll f32
//! ```
//!
//! Track data runs follow the record table back to back; each record's
//! data_offset is absolute.

use glam::Vec3;

use super::{patch_u32, put_f32, put_u32, read_f32, read_u32};
use crate::error::ConvertError;

pub const CMT_MAGIC: &[u8; 4] = b"CMTP";
pub const CMT_EXT: &str = "cmt";

const HEADER_SIZE: usize = 32;
const TRACK_RECORD_SIZE: usize = 16;
const FRAME_SIZE: usize = 32;

/// One sampled camera state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraFrame {
    pub pos: Vec3,
    pub fov: f32,
    pub focus: Vec3,
    pub roll: f32,
}

/// One camera take: a dense run of frames at a fixed rate.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraTrack {
    pub frame_rate: f32,
    pub format: u32,
    pub frames: Vec<CameraFrame>,
}

#[derive(Debug, Clone, Default)]
pub struct CmtFile {
    pub version: u32,
    pub animations: Vec<CameraTrack>,
}

impl CmtFile {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            animations: Vec::new(),
        }
    }
}

pub fn decode(bytes: &[u8]) -> Result<CmtFile, ConvertError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ConvertError::malformed("file shorter than header"));
    }
    if &bytes[0..4] != CMT_MAGIC {
        return Err(ConvertError::malformed("bad magic, expected CMTP"));
    }
    if bytes[4] as i8 != -1 {
        return Err(ConvertError::malformed("unsupported endianness flag"));
    }
    let version = read_u32(bytes, 0x08)?;
    let file_size = read_u32(bytes, 0x0C)? as usize;
    if file_size != bytes.len() {
        tracing::debug!(
            stored = file_size,
            actual = bytes.len(),
            "header file size disagrees with buffer length"
        );
    }
    let anm_count = read_u32(bytes, 0x10)? as usize;

    let mut file = CmtFile::new(version);
    for t in 0..anm_count {
        let rec = HEADER_SIZE + t * TRACK_RECORD_SIZE;
        let frame_rate = read_f32(bytes, rec)?;
        let frame_count = read_u32(bytes, rec + 4)? as usize;
        let data_offset = read_u32(bytes, rec + 8)? as usize;
        let format = read_u32(bytes, rec + 12)?;

        let mut frames = Vec::with_capacity(frame_count);
        for f in 0..frame_count {
            let at = data_offset + f * FRAME_SIZE;
            frames.push(CameraFrame {
                pos: Vec3::new(
                    read_f32(bytes, at)?,
                    read_f32(bytes, at + 4)?,
                    read_f32(bytes, at + 8)?,
                ),
                fov: read_f32(bytes, at + 12)?,
                focus: Vec3::new(
                    read_f32(bytes, at + 16)?,
                    read_f32(bytes, at + 20)?,
                    read_f32(bytes, at + 24)?,
                ),
                roll: read_f32(bytes, at + 28)?,
            });
        }
        file.animations.push(CameraTrack {
            frame_rate,
            format,
            frames,
        });
    }
    Ok(file)
}

pub fn encode(file: &CmtFile) -> Vec<u8> {
    let data_start = HEADER_SIZE + file.animations.len() * TRACK_RECORD_SIZE;

    let mut buf = Vec::with_capacity(
        data_start
            + file
                .animations
                .iter()
                .map(|t| t.frames.len() * FRAME_SIZE)
                .sum::<usize>(),
    );
    buf.extend_from_slice(CMT_MAGIC);
    buf.push((-1i8) as u8);
    buf.push(1);
    buf.extend_from_slice(&0u16.to_le_bytes());
    put_u32(&mut buf, file.version);
    put_u32(&mut buf, 0); // file_size, patched below
    put_u32(&mut buf, file.animations.len() as u32);
    put_u32(&mut buf, 0);
    put_u32(&mut buf, 0);
    put_u32(&mut buf, 0);

    let mut data_offset = data_start as u32;
    for track in &file.animations {
        put_f32(&mut buf, track.frame_rate);
        put_u32(&mut buf, track.frames.len() as u32);
        put_u32(&mut buf, data_offset);
        put_u32(&mut buf, track.format);
        data_offset += (track.frames.len() * FRAME_SIZE) as u32;
    }
    for track in &file.animations {
        for frame in &track.frames {
            put_f32(&mut buf, frame.pos.x);
            put_f32(&mut buf, frame.pos.y);
            put_f32(&mut buf, frame.pos.z);
            put_f32(&mut buf, frame.fov);
            put_f32(&mut buf, frame.focus.x);
            put_f32(&mut buf, frame.focus.y);
            put_f32(&mut buf, frame.focus.z);
            put_f32(&mut buf, frame.roll);
        }
    }

    let size = buf.len() as u32;
    patch_u32(&mut buf, 0x0C, size);
    buf
}
