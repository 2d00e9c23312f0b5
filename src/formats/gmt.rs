//! GMT animation container codec (.gmt)
//!
//! Little-endian container holding named animations, bone curve lists and
//! shared keyframe graphs. One decoder handles every known format revision;
//! the version field only selects which curve formats and rename tables
//! apply downstream, never a different layout.
//!
//! # Layout
//! ```text
//! Header (64 bytes):
//! 0x00: magic           b"GSGT"
//! 0x04: endianness u8   - 2 = little-endian
//! 0x05: signedness u8   - 1 = signed scaled values
//! 0x06: pad u16
//! 0x08: version u32
//! 0x0C: file_size u32   - patched after the full buffer is written
//! 0x10: anim_count u32       0x14: anim_table_offset u32
//! 0x18: graph_count u32      0x1C: graph_table_offset u32
//! 0x20: curve_count u32      0x24: curve_table_offset u32
//! 0x28: bone_map_count u32   0x2C: bone_map_offset u32
//! 0x30: name_count u32       0x34: name_table_offset u32
//! 0x38: value_block_offset u32
//! 0x3C: reserved u32
//!
//! Animation record (32 bytes):
//! 0x00: name_index u32       0x04: frame_count u32
//! 0x08: bone_map_start u32   0x0C: bone_map_count u32
//! 0x10: curve_start u32      0x14: curve_count u32
//! 0x18: reserved u32 x2
//!
//! Bone-map record (8 bytes):  name_index u32, curve_start u16, curve_count u16
//! Curve record (16 bytes):    graph_offset u32 (into graph table),
//!                             value_offset u32 (into value block),
//!                             format u16, property u16, reserved u32
//! Graph entry:                keyframe_count u16, keyframe u16 x count,
//!                             zero-padded to 4-byte alignment
//! Name record (32 bytes):     hash u32, NUL-padded string
//! Value block:                per-curve runs; stride is fully determined by
//!                             the format code (components x 2 or 4 bytes)
//! ```
//!
//! Every header count is recomputed from content at encode time.

use glam::{Quat, Vec3};
use half::f16;
use hashbrown::HashMap;

use super::{patch_u32, put_f32, put_i16, put_u16, put_u32, read_f32, read_i16, read_u16, read_u32};
use crate::error::ConvertError;
use crate::model::name::NAME_RECORD_SIZE;
use crate::model::{Animation, Bone, BoneName, Curve, CurveFormat, CurveValues, GmtFile};

pub const GMT_MAGIC: &[u8; 4] = b"GSGT";
pub const GMT_EXT: &str = "gmt";

const HEADER_SIZE: usize = 64;
const ANIM_RECORD_SIZE: usize = 32;
const BONE_MAP_RECORD_SIZE: usize = 8;
const CURVE_RECORD_SIZE: usize = 16;

/// Scale divisor of the standard 16-bit scaled-integer encoding.
const SCALED_ONE: f32 = 16384.0;
/// Scale divisor of the full-range scaled-integer variant.
const INT_SCALED_ONE: f32 = 32767.0;

/// Decode a GMT container.
pub fn decode(bytes: &[u8]) -> Result<GmtFile, ConvertError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ConvertError::malformed("file shorter than header"));
    }
    if &bytes[0..4] != GMT_MAGIC {
        return Err(ConvertError::malformed("bad magic, expected GSGT"));
    }
    if bytes[4] != 2 {
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

    let anim_count = read_u32(bytes, 0x10)? as usize;
    let anim_offset = read_u32(bytes, 0x14)? as usize;
    let graph_offset = read_u32(bytes, 0x1C)? as usize;
    let curve_count = read_u32(bytes, 0x20)? as usize;
    let curve_offset = read_u32(bytes, 0x24)? as usize;
    let bone_map_count = read_u32(bytes, 0x28)? as usize;
    let bone_map_offset = read_u32(bytes, 0x2C)? as usize;
    let name_count = read_u32(bytes, 0x30)? as usize;
    let name_offset = read_u32(bytes, 0x34)? as usize;
    let value_offset = read_u32(bytes, 0x38)? as usize;

    let mut names = Vec::with_capacity(name_count);
    for i in 0..name_count {
        let start = name_offset + i * NAME_RECORD_SIZE;
        let record = bytes
            .get(start..start + NAME_RECORD_SIZE)
            .ok_or_else(|| ConvertError::malformed("truncated name table"))?;
        let name = BoneName::from_record(record)
            .ok_or_else(|| ConvertError::malformed("short name record"))?;
        names.push(name);
    }
    let name_at = |index: usize| -> Result<BoneName, ConvertError> {
        names
            .get(index)
            .cloned()
            .ok_or_else(|| ConvertError::malformed(format!("name index {index} out of range")))
    };

    let mut file = GmtFile::new(version);
    for a in 0..anim_count {
        let rec = anim_offset + a * ANIM_RECORD_SIZE;
        let name = name_at(read_u32(bytes, rec)? as usize)?;
        let bm_start = read_u32(bytes, rec + 0x08)? as usize;
        let bm_count = read_u32(bytes, rec + 0x0C)? as usize;
        if bm_start + bm_count > bone_map_count {
            return Err(ConvertError::malformed("bone-map span out of range"));
        }

        let mut anm = Animation::new("");
        anm.name = name;
        for b in bm_start..bm_start + bm_count {
            let rec = bone_map_offset + b * BONE_MAP_RECORD_SIZE;
            let name = name_at(read_u32(bytes, rec)? as usize)?;
            let curve_start = read_u16(bytes, rec + 4)? as usize;
            let bone_curves = read_u16(bytes, rec + 6)? as usize;
            if curve_start + bone_curves > curve_count {
                return Err(ConvertError::malformed("curve span out of range"));
            }

            let mut bone = Bone::new("");
            bone.name = name;
            for c in curve_start..curve_start + bone_curves {
                let rec = curve_offset + c * CURVE_RECORD_SIZE;
                let graph_rel = read_u32(bytes, rec)? as usize;
                let value_rel = read_u32(bytes, rec + 4)? as usize;
                let format = CurveFormat::from_code(read_u16(bytes, rec + 8)?)?;

                let keyframes = read_graph(bytes, graph_offset + graph_rel)?;
                let sample_count = keyframes.len();
                let graph = file.graphs.intern(keyframes);
                let values =
                    decode_values(bytes, value_offset + value_rel, format, sample_count)?;
                bone.curves.push(Curve {
                    format,
                    graph,
                    values,
                });
            }
            anm.bones.push(bone);
        }
        file.animations.push(anm);
    }

    file.refresh();
    Ok(file)
}

/// Encode a GMT container. Every derived field (counts, name table, frame
/// counts, graph table) is recomputed from content here, so the caller's
/// stale state cannot reach the output.
pub fn encode(file: &GmtFile) -> Vec<u8> {
    let names = file.name_table();
    // Animation names occupy the head of the table; bone name indices follow
    // in animation order.
    let mut next_bone_name = file.animations.len();

    let mut anim_table = Vec::new();
    let mut bone_map_table = Vec::new();
    let mut curve_table = Vec::new();
    let mut graph_blob: Vec<u8> = Vec::new();
    let mut graph_offsets: HashMap<Vec<u16>, u32> = HashMap::new();
    let mut value_blob: Vec<u8> = Vec::new();

    let mut bone_map_total = 0u32;
    let mut curve_total = 0u32;
    for (a, anm) in file.animations.iter().enumerate() {
        let frame_count = anm
            .curves()
            .map(|c| file.graphs.get(c.graph).len() as u32)
            .max()
            .unwrap_or(0);

        put_u32(&mut anim_table, a as u32);
        put_u32(&mut anim_table, frame_count);
        put_u32(&mut anim_table, bone_map_total);
        put_u32(&mut anim_table, anm.bones.len() as u32);
        put_u32(&mut anim_table, curve_total);
        put_u32(&mut anim_table, anm.curve_count() as u32);
        put_u32(&mut anim_table, 0);
        put_u32(&mut anim_table, 0);

        for bone in &anm.bones {
            put_u32(&mut bone_map_table, next_bone_name as u32);
            next_bone_name += 1;
            put_u16(&mut bone_map_table, curve_total as u16);
            put_u16(&mut bone_map_table, bone.curves.len() as u16);

            for curve in &bone.curves {
                let keyframes = file.graphs.get(curve.graph).keyframes().to_vec();
                let graph_rel = *graph_offsets.entry(keyframes.clone()).or_insert_with(|| {
                    let offset = graph_blob.len() as u32;
                    put_u16(&mut graph_blob, keyframes.len() as u16);
                    for &k in &keyframes {
                        put_u16(&mut graph_blob, k);
                    }
                    while graph_blob.len() % 4 != 0 {
                        graph_blob.push(0);
                    }
                    offset
                });

                let value_rel = value_blob.len() as u32;
                encode_values(&mut value_blob, curve);

                put_u32(&mut curve_table, graph_rel);
                put_u32(&mut curve_table, value_rel);
                put_u16(&mut curve_table, curve.format.code());
                put_u16(&mut curve_table, curve.format.property_code());
                put_u32(&mut curve_table, 0);
                curve_total += 1;
            }
            bone_map_total += 1;
        }
    }

    let anim_offset = HEADER_SIZE;
    let bone_map_offset = anim_offset + anim_table.len();
    let curve_offset = bone_map_offset + bone_map_table.len();
    let graph_offset = curve_offset + curve_table.len();
    let name_offset = graph_offset + graph_blob.len();
    let value_offset = name_offset + names.len() * NAME_RECORD_SIZE;

    let mut buf = Vec::with_capacity(value_offset + value_blob.len());
    buf.extend_from_slice(GMT_MAGIC);
    buf.push(2); // little-endian
    buf.push(1); // signed scaled values
    put_u16(&mut buf, 0);
    put_u32(&mut buf, file.version);
    put_u32(&mut buf, 0); // file_size, patched below
    put_u32(&mut buf, file.animations.len() as u32);
    put_u32(&mut buf, anim_offset as u32);
    put_u32(&mut buf, graph_offsets.len() as u32);
    put_u32(&mut buf, graph_offset as u32);
    put_u32(&mut buf, curve_total);
    put_u32(&mut buf, curve_offset as u32);
    put_u32(&mut buf, bone_map_total);
    put_u32(&mut buf, bone_map_offset as u32);
    put_u32(&mut buf, names.len() as u32);
    put_u32(&mut buf, name_offset as u32);
    put_u32(&mut buf, value_offset as u32);
    put_u32(&mut buf, 0);

    buf.extend_from_slice(&anim_table);
    buf.extend_from_slice(&bone_map_table);
    buf.extend_from_slice(&curve_table);
    buf.extend_from_slice(&graph_blob);
    for name in &names {
        buf.extend_from_slice(&name.to_record());
    }
    buf.extend_from_slice(&value_blob);

    let size = buf.len() as u32;
    patch_u32(&mut buf, 0x0C, size);
    buf
}

fn read_graph(bytes: &[u8], offset: usize) -> Result<Vec<u16>, ConvertError> {
    let count = read_u16(bytes, offset)? as usize;
    let mut keyframes = Vec::with_capacity(count);
    for i in 0..count {
        keyframes.push(read_u16(bytes, offset + 2 + i * 2)?);
    }
    if !keyframes.windows(2).all(|w| w[0] < w[1]) {
        return Err(ConvertError::malformed(
            "graph keyframes not strictly ascending",
        ));
    }
    Ok(keyframes)
}

fn decode_values(
    bytes: &[u8],
    offset: usize,
    format: CurveFormat,
    count: usize,
) -> Result<CurveValues, ConvertError> {
    let stride = format.value_stride();
    let width = format.component_width();
    let component = |sample: usize, c: usize| -> Result<f32, ConvertError> {
        let at = offset + sample * stride + c * width;
        match format {
            f if f.component_width() == 4 => read_f32(bytes, at),
            CurveFormat::RotQuatIntScaled => {
                Ok(read_i16(bytes, at)? as f32 / INT_SCALED_ONE)
            }
            f if is_half(f) => Ok(f16::from_bits(read_u16(bytes, at)?).to_f32()),
            _ => Ok(read_i16(bytes, at)? as f32 / SCALED_ONE),
        }
    };

    Ok(match format.component_count() {
        1 => {
            let mut v = Vec::with_capacity(count);
            for s in 0..count {
                v.push(component(s, 0)?);
            }
            CurveValues::Single(v)
        }
        2 => {
            let mut v = Vec::with_capacity(count);
            for s in 0..count {
                v.push([component(s, 0)?, component(s, 1)?]);
            }
            CurveValues::AxisW(v)
        }
        3 => {
            let mut v = Vec::with_capacity(count);
            for s in 0..count {
                v.push(Vec3::new(
                    component(s, 0)?,
                    component(s, 1)?,
                    component(s, 2)?,
                ));
            }
            CurveValues::Vec3(v)
        }
        _ => {
            let mut v = Vec::with_capacity(count);
            for s in 0..count {
                v.push(Quat::from_xyzw(
                    component(s, 0)?,
                    component(s, 1)?,
                    component(s, 2)?,
                    component(s, 3)?,
                ));
            }
            CurveValues::Quat(v)
        }
    })
}

fn encode_values(buf: &mut Vec<u8>, curve: &Curve) {
    // A curve whose value arity drifted from its format tag is re-canonicalized
    // so the stride invariant holds on disk.
    if !curve.arity_matches() {
        let mut fixed = curve.clone();
        fixed.neutralize();
        return encode_values(buf, &fixed);
    }
    let format = curve.format;
    let mut put = |v: f32| match format {
        f if f.component_width() == 4 => put_f32(buf, v),
        CurveFormat::RotQuatIntScaled => {
            put_i16(buf, quantize(v, INT_SCALED_ONE));
        }
        f if is_half(f) => put_u16(buf, f16::from_f32(v).to_bits()),
        _ => put_i16(buf, quantize(v, SCALED_ONE)),
    };
    match &curve.values {
        CurveValues::Single(v) => v.iter().for_each(|&x| put(x)),
        CurveValues::AxisW(v) => v.iter().for_each(|&[a, w]| {
            put(a);
            put(w);
        }),
        CurveValues::Vec3(v) => v.iter().for_each(|&p| {
            put(p.x);
            put(p.y);
            put(p.z);
        }),
        CurveValues::Quat(v) => v.iter().for_each(|&q| {
            put(q.x);
            put(q.y);
            put(q.z);
            put(q.w);
        }),
    }
}

fn is_half(format: CurveFormat) -> bool {
    matches!(
        format,
        CurveFormat::RotQuatHalfFloat
            | CurveFormat::RotXwHalfFloat
            | CurveFormat::RotYwHalfFloat
            | CurveFormat::RotZwHalfFloat
    )
}

fn quantize(v: f32, one: f32) -> i16 {
    (v * one)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::VERSION_GEN5;

    fn sample_file() -> GmtFile {
        let mut file = GmtFile::new(VERSION_GEN5);
        let g3 = file.graphs.intern(vec![0, 5, 10]);
        let g1 = file.graphs.intern(vec![0]);

        let mut anm = Animation::new("walk");
        let mut center = Bone::new("center_c_n");
        center.curves.push(Curve::new_position(
            g3,
            vec![
                Vec3::new(0.25, 1.0, -0.5),
                Vec3::new(0.5, 1.125, -0.25),
                Vec3::new(0.75, 1.25, 0.0),
            ],
        ));
        center.curves.push(Curve {
            format: CurveFormat::RotQuatScaled,
            graph: g3,
            values: CurveValues::Quat(vec![
                Quat::IDENTITY,
                Quat::from_xyzw(0.0, 0.5, 0.0, 0.86767578),
                Quat::from_xyzw(0.0, 0.70710677, 0.0, 0.70710677),
            ]),
        });
        anm.bones.push(center);

        let mut kosi = Bone::new("kosi_c_n");
        kosi.curves.push(Curve {
            format: CurveFormat::PosX,
            graph: g1,
            values: CurveValues::Single(vec![0.125]),
        });
        anm.bones.push(kosi);
        file.animations.push(anm);
        file.refresh();
        file
    }

    #[test]
    fn test_container_roundtrip() {
        let file = sample_file();
        let bytes = encode(&file);
        assert_eq!(&bytes[0..4], GMT_MAGIC);
        let parsed = decode(&bytes).unwrap();

        assert_eq!(parsed.version, file.version);
        assert_eq!(parsed.animations.len(), 1);
        let anm = &parsed.animations[0];
        assert_eq!(anm.name.as_str(), "walk");
        assert_eq!(anm.frame_count, 3);
        assert_eq!(anm.bones.len(), 2);
        assert_eq!(anm.bones[0].name.as_str(), "center_c_n");

        // f32 and quantized scaled values chosen to be exactly representable.
        assert_eq!(anm.bones[0].curves[0], file.animations[0].bones[0].curves[0]);
        assert_eq!(anm.bones[1].curves[0], file.animations[0].bones[1].curves[0]);
        // Graphs shared by sequence: the two distinct timelines survive.
        assert_eq!(parsed.graphs.get(anm.bones[0].curves[0].graph).keyframes(), &[0, 5, 10]);
        assert_eq!(parsed.graphs.get(anm.bones[1].curves[0].graph).keyframes(), &[0]);
    }

    #[test]
    fn test_file_size_patched() {
        let bytes = encode(&sample_file());
        assert_eq!(read_u32(&bytes, 0x0C).unwrap() as usize, bytes.len());
    }

    #[test]
    fn test_scaled_quat_within_one_step() {
        let mut file = GmtFile::new(VERSION_GEN5);
        let g = file.graphs.intern(vec![0]);
        let q = Quat::from_xyzw(0.3, 0.1, -0.2, 0.927);
        let mut anm = Animation::new("a");
        let mut bone = Bone::new("b");
        bone.curves.push(Curve {
            format: CurveFormat::RotQuatScaled,
            graph: g,
            values: CurveValues::Quat(vec![q]),
        });
        anm.bones.push(bone);
        file.animations.push(anm);

        let parsed = decode(&encode(&file)).unwrap();
        let out = parsed.animations[0].bones[0].curves[0].quat_at(0);
        let step = 1.0 / SCALED_ONE;
        for (a, b) in [(q.x, out.x), (q.y, out.y), (q.z, out.z), (q.w, out.w)] {
            assert!((a - b).abs() <= step, "{a} vs {b}");
        }
    }

    #[test]
    fn test_half_float_within_one_step() {
        let mut file = GmtFile::new(VERSION_GEN5);
        let g = file.graphs.intern(vec![0]);
        let mut anm = Animation::new("a");
        let mut bone = Bone::new("b");
        bone.curves.push(Curve {
            format: CurveFormat::RotXwHalfFloat,
            graph: g,
            values: CurveValues::AxisW(vec![[0.333, 0.943]]),
        });
        anm.bones.push(bone);
        file.animations.push(anm);

        let parsed = decode(&encode(&file)).unwrap();
        match &parsed.animations[0].bones[0].curves[0].values {
            CurveValues::AxisW(v) => {
                assert!((v[0][0] - 0.333).abs() < 1e-3);
                assert!((v[0][1] - 0.943).abs() < 1e-3);
            }
            other => panic!("expected axis+w values, got {other:?}"),
        }
    }

    #[test]
    fn test_int_scaled_quat_roundtrip_exact() {
        let mut file = GmtFile::new(VERSION_GEN5);
        let g = file.graphs.intern(vec![0, 3]);
        // Exactly representable on the 1/32767 grid.
        let values = vec![
            Quat::from_xyzw(16384.0 / 32767.0, -8191.0 / 32767.0, 0.0, 1.0),
            Quat::from_xyzw(0.0, 32767.0 / 32767.0, -1.0 / 32767.0, 0.0),
        ];
        let mut anm = Animation::new("a");
        let mut bone = Bone::new("b");
        bone.curves.push(Curve {
            format: CurveFormat::RotQuatIntScaled,
            graph: g,
            values: CurveValues::Quat(values.clone()),
        });
        anm.bones.push(bone);
        file.animations.push(anm);

        let parsed = decode(&encode(&file)).unwrap();
        let curve = &parsed.animations[0].bones[0].curves[0];
        assert_eq!(curve.format, CurveFormat::RotQuatIntScaled);
        assert_eq!(curve.values, CurveValues::Quat(values));
    }

    #[test]
    fn test_float_rotation_roundtrip_exact() {
        let mut file = GmtFile::new(VERSION_GEN5);
        let g = file.graphs.intern(vec![0]);
        let q = Quat::from_xyzw(0.30001, -0.1237, 0.0071, 0.9461);
        let mut anm = Animation::new("a");
        let mut bone = Bone::new("b");
        bone.curves.push(Curve {
            format: CurveFormat::RotQuatFloat,
            graph: g,
            values: CurveValues::Quat(vec![q]),
        });
        bone.curves.push(Curve {
            format: CurveFormat::RotXwFloat,
            graph: g,
            values: CurveValues::AxisW(vec![[0.333, 0.943]]),
        });
        anm.bones.push(bone);
        file.animations.push(anm);

        let parsed = decode(&encode(&file)).unwrap();
        let bone = &parsed.animations[0].bones[0];
        assert_eq!(bone.curves[0].format, CurveFormat::RotQuatFloat);
        assert_eq!(bone.curves[0].values, CurveValues::Quat(vec![q]));
        assert_eq!(bone.curves[1].values, CurveValues::AxisW(vec![[0.333, 0.943]]));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&sample_file());
        bytes[0] = b'X';
        assert!(matches!(
            decode(&bytes),
            Err(ConvertError::Malformed { .. })
        ));
    }

    #[test]
    fn test_truncated() {
        let bytes = encode(&sample_file());
        assert!(matches!(
            decode(&bytes[..bytes.len() - 8]),
            Err(ConvertError::Malformed { .. })
        ));
        assert!(matches!(
            decode(&bytes[..16]),
            Err(ConvertError::Malformed { .. })
        ));
    }

    #[test]
    fn test_unknown_format_code() {
        let file = sample_file();
        let mut bytes = encode(&file);
        // First curve record sits right after the animation table and the two
        // bone-map records; format code lives at +8.
        let curve_offset = read_u32(&bytes, 0x24).unwrap() as usize;
        bytes[curve_offset + 8] = 0x7F;
        assert!(matches!(
            decode(&bytes),
            Err(ConvertError::UnsupportedFormatCode(0x7F))
        ));
    }

    #[test]
    fn test_graph_dedup_on_encode() {
        let mut file = GmtFile::new(VERSION_GEN5);
        let g = file.graphs.intern(vec![0, 2]);
        let mut anm = Animation::new("a");
        for name in ["b0", "b1"] {
            let mut bone = Bone::new(name);
            bone.curves
                .push(Curve::new_position(g, vec![Vec3::ZERO, Vec3::ONE]));
            anm.bones.push(bone);
        }
        file.animations.push(anm);

        let bytes = encode(&file);
        assert_eq!(read_u32(&bytes, 0x18).unwrap(), 1); // graph_count
        let parsed = decode(&bytes).unwrap();
        assert_eq!(parsed.graphs.len(), 1);
    }

    #[test]
    fn test_decode_graph_validation() {
        // Swap two keyframes in the blob so the graph is no longer ascending.
        let file = sample_file();
        let mut bytes = encode(&file);
        let graph_offset = read_u32(&bytes, 0x1C).unwrap() as usize;
        // Swap the first two keyframes of the first graph entry.
        let a = read_u16(&bytes, graph_offset + 2).unwrap();
        let b = read_u16(&bytes, graph_offset + 4).unwrap();
        bytes[graph_offset + 2..graph_offset + 4].copy_from_slice(&b.to_le_bytes());
        bytes[graph_offset + 4..graph_offset + 6].copy_from_slice(&a.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(ConvertError::Malformed { .. })
        ));
    }
}
