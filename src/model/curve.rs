//! Curves: one animated property's timeline for one bone.
//!
//! `CurveFormat` is the closed enumeration of on-disk encodings; arity and
//! byte stride are lookup tables keyed on the enum, never string inspection.
//! Values are held decoded (f32) in a tagged union whose arity matches the
//! format; quantization happens only at the codec boundary.

use glam::{Quat, Vec3};

use crate::error::ConvertError;
use crate::model::graph::{Graph, GraphId, GraphRegistry};

/// Reduced-encoding axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Animated channel a curve drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Position,
    Rotation,
}

/// Closed enumeration of curve storage formats.
///
/// Positions are stored as full vec3 or a single axis; rotations as a full
/// quaternion or a reduced two-axis (axis + w) projection, each in 32-bit
/// float, 16-bit half-float or 16-bit scaled-integer components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveFormat {
    PosVec3,
    PosX,
    PosY,
    PosZ,
    RotQuatFloat,
    RotQuatHalfFloat,
    RotQuatScaled,
    RotQuatIntScaled,
    RotXwFloat,
    RotYwFloat,
    RotZwFloat,
    RotXwHalfFloat,
    RotYwHalfFloat,
    RotZwHalfFloat,
    RotXwScaled,
    RotYwScaled,
    RotZwScaled,
}

impl CurveFormat {
    /// On-disk format code.
    pub fn code(self) -> u16 {
        match self {
            CurveFormat::PosVec3 => 0x01,
            CurveFormat::PosX => 0x02,
            CurveFormat::PosY => 0x03,
            CurveFormat::PosZ => 0x04,
            CurveFormat::RotQuatFloat => 0x10,
            CurveFormat::RotQuatHalfFloat => 0x11,
            CurveFormat::RotQuatScaled => 0x12,
            CurveFormat::RotQuatIntScaled => 0x1E,
            CurveFormat::RotXwFloat => 0x20,
            CurveFormat::RotYwFloat => 0x21,
            CurveFormat::RotZwFloat => 0x22,
            CurveFormat::RotXwHalfFloat => 0x30,
            CurveFormat::RotYwHalfFloat => 0x31,
            CurveFormat::RotZwHalfFloat => 0x32,
            CurveFormat::RotXwScaled => 0x40,
            CurveFormat::RotYwScaled => 0x41,
            CurveFormat::RotZwScaled => 0x42,
        }
    }

    pub fn from_code(code: u16) -> Result<Self, ConvertError> {
        Ok(match code {
            0x01 => CurveFormat::PosVec3,
            0x02 => CurveFormat::PosX,
            0x03 => CurveFormat::PosY,
            0x04 => CurveFormat::PosZ,
            0x10 => CurveFormat::RotQuatFloat,
            0x11 => CurveFormat::RotQuatHalfFloat,
            0x12 => CurveFormat::RotQuatScaled,
            0x1E => CurveFormat::RotQuatIntScaled,
            0x20 => CurveFormat::RotXwFloat,
            0x21 => CurveFormat::RotYwFloat,
            0x22 => CurveFormat::RotZwFloat,
            0x30 => CurveFormat::RotXwHalfFloat,
            0x31 => CurveFormat::RotYwHalfFloat,
            0x32 => CurveFormat::RotZwHalfFloat,
            0x40 => CurveFormat::RotXwScaled,
            0x41 => CurveFormat::RotYwScaled,
            0x42 => CurveFormat::RotZwScaled,
            _ => return Err(ConvertError::UnsupportedFormatCode(code)),
        })
    }

    pub fn channel(self) -> Channel {
        match self {
            CurveFormat::PosVec3 | CurveFormat::PosX | CurveFormat::PosY | CurveFormat::PosZ => {
                Channel::Position
            }
            _ => Channel::Rotation,
        }
    }

    /// On-disk property code: which channel the curve drives.
    pub fn property_code(self) -> u16 {
        match self.channel() {
            Channel::Position => 1,
            Channel::Rotation => 2,
        }
    }

    /// Components per sample (1, 2, 3 or 4).
    pub fn component_count(self) -> usize {
        match self {
            CurveFormat::PosX | CurveFormat::PosY | CurveFormat::PosZ => 1,
            CurveFormat::RotXwFloat
            | CurveFormat::RotYwFloat
            | CurveFormat::RotZwFloat
            | CurveFormat::RotXwHalfFloat
            | CurveFormat::RotYwHalfFloat
            | CurveFormat::RotZwHalfFloat
            | CurveFormat::RotXwScaled
            | CurveFormat::RotYwScaled
            | CurveFormat::RotZwScaled => 2,
            CurveFormat::PosVec3 => 3,
            CurveFormat::RotQuatFloat
            | CurveFormat::RotQuatHalfFloat
            | CurveFormat::RotQuatScaled
            | CurveFormat::RotQuatIntScaled => 4,
        }
    }

    /// Bytes per component (2 or 4).
    pub fn component_width(self) -> usize {
        match self {
            CurveFormat::PosVec3
            | CurveFormat::PosX
            | CurveFormat::PosY
            | CurveFormat::PosZ
            | CurveFormat::RotQuatFloat
            | CurveFormat::RotXwFloat
            | CurveFormat::RotYwFloat
            | CurveFormat::RotZwFloat => 4,
            _ => 2,
        }
    }

    /// Bytes per sample.
    pub fn value_stride(self) -> usize {
        self.component_count() * self.component_width()
    }

    /// Axis carried by a reduced encoding, if any.
    pub fn axis(self) -> Option<Axis> {
        match self {
            CurveFormat::PosX
            | CurveFormat::RotXwFloat
            | CurveFormat::RotXwHalfFloat
            | CurveFormat::RotXwScaled => Some(Axis::X),
            CurveFormat::PosY
            | CurveFormat::RotYwFloat
            | CurveFormat::RotYwHalfFloat
            | CurveFormat::RotYwScaled => Some(Axis::Y),
            CurveFormat::PosZ
            | CurveFormat::RotZwFloat
            | CurveFormat::RotZwHalfFloat
            | CurveFormat::RotZwScaled => Some(Axis::Z),
            _ => None,
        }
    }
}

/// Decoded sample storage; arity mirrors [`CurveFormat::component_count`].
#[derive(Debug, Clone, PartialEq)]
pub enum CurveValues {
    /// Single-axis position samples.
    Single(Vec<f32>),
    /// Reduced rotation samples: `[axis, w]`.
    AxisW(Vec<[f32; 2]>),
    /// Full position samples.
    Vec3(Vec<Vec3>),
    /// Full rotation samples.
    Quat(Vec<Quat>),
}

impl CurveValues {
    pub fn len(&self) -> usize {
        match self {
            CurveValues::Single(v) => v.len(),
            CurveValues::AxisW(v) => v.len(),
            CurveValues::Vec3(v) => v.len(),
            CurveValues::Quat(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub format: CurveFormat,
    pub graph: GraphId,
    pub values: CurveValues,
}

impl Curve {
    pub fn new_position(graph: GraphId, values: Vec<Vec3>) -> Self {
        Self {
            format: CurveFormat::PosVec3,
            graph,
            values: CurveValues::Vec3(values),
        }
    }

    pub fn new_rotation(graph: GraphId, values: Vec<Quat>) -> Self {
        Self {
            format: CurveFormat::RotQuatScaled,
            graph,
            values: CurveValues::Quat(values),
        }
    }

    pub fn is_position(&self) -> bool {
        self.format.channel() == Channel::Position
    }

    pub fn is_rotation(&self) -> bool {
        self.format.channel() == Channel::Rotation
    }

    /// Whether the value arity matches the format tag.
    pub fn arity_matches(&self) -> bool {
        matches!(
            (&self.values, self.format.component_count()),
            (CurveValues::Single(_), 1)
                | (CurveValues::AxisW(_), 2)
                | (CurveValues::Vec3(_), 3)
                | (CurveValues::Quat(_), 4)
        )
    }

    /// Canonicalize a reduced encoding to its full vec3/quaternion form.
    ///
    /// Idempotent; never zeroes an axis that was already populated.
    /// Unrepresented position axes become 0.0; the unrepresented rotation
    /// axes form the identity quaternion around the stored axis+w pair. The
    /// canonical rotation tag is derived once from the pre-canonical source
    /// width (2-byte sources take the scaled tag, 4-byte sources the
    /// half-float tag); an already-canonical tag stays as it is.
    pub fn neutralize(&mut self) {
        match self.format.channel() {
            Channel::Position => {
                if let CurveValues::Single(samples) = &self.values {
                    let axis = self.format.axis().unwrap_or(Axis::X);
                    let expand = |v: &f32| match axis {
                        Axis::X => Vec3::new(*v, 0.0, 0.0),
                        Axis::Y => Vec3::new(0.0, *v, 0.0),
                        Axis::Z => Vec3::new(0.0, 0.0, *v),
                    };
                    self.values = CurveValues::Vec3(samples.iter().map(expand).collect());
                }
                self.format = CurveFormat::PosVec3;
            }
            Channel::Rotation => {
                if let CurveValues::AxisW(samples) = &self.values {
                    let axis = self.format.axis().unwrap_or(Axis::X);
                    let expand = |[v, w]: &[f32; 2]| match axis {
                        Axis::X => Quat::from_xyzw(*v, 0.0, 0.0, *w),
                        Axis::Y => Quat::from_xyzw(0.0, *v, 0.0, *w),
                        Axis::Z => Quat::from_xyzw(0.0, 0.0, *v, *w),
                    };
                    self.values = CurveValues::Quat(samples.iter().map(expand).collect());
                }
                self.format = match self.format {
                    CurveFormat::RotQuatScaled | CurveFormat::RotQuatHalfFloat => self.format,
                    f if f.component_width() == 2 => CurveFormat::RotQuatScaled,
                    _ => CurveFormat::RotQuatHalfFloat,
                };
            }
        }
    }

    /// Project a position curve onto the horizontal plane (vertical axis
    /// zeroed). Reduced x/z encodings already carry no vertical motion and
    /// pass through unchanged.
    pub fn to_horizontal(&self) -> Curve {
        let values = match (&self.values, self.format) {
            (CurveValues::Vec3(v), CurveFormat::PosVec3) => {
                CurveValues::Vec3(v.iter().map(|p| Vec3::new(p.x, 0.0, p.z)).collect())
            }
            (CurveValues::Single(v), CurveFormat::PosY) => {
                CurveValues::Single(v.iter().map(|_| 0.0).collect())
            }
            _ => self.values.clone(),
        };
        Curve {
            format: self.format,
            graph: self.graph,
            values,
        }
    }

    /// Project a position curve onto the vertical axis alone.
    pub fn to_vertical(&self) -> Curve {
        let values = match (&self.values, self.format) {
            (CurveValues::Vec3(v), CurveFormat::PosVec3) => {
                CurveValues::Vec3(v.iter().map(|p| Vec3::new(0.0, p.y, 0.0)).collect())
            }
            (CurveValues::Single(v), CurveFormat::PosX | CurveFormat::PosZ) => {
                CurveValues::Single(v.iter().map(|_| 0.0).collect())
            }
            _ => self.values.clone(),
        };
        Curve {
            format: self.format,
            graph: self.graph,
            values,
        }
    }

    /// Rotation sample `i` as a quaternion, expanding reduced encodings.
    /// Returns identity for non-rotation or out-of-range samples.
    pub fn quat_at(&self, i: usize) -> Quat {
        match &self.values {
            CurveValues::Quat(v) => v.get(i).copied().unwrap_or(Quat::IDENTITY),
            CurveValues::AxisW(v) => match (v.get(i), self.format.axis()) {
                (Some([a, w]), Some(Axis::X)) => Quat::from_xyzw(*a, 0.0, 0.0, *w),
                (Some([a, w]), Some(Axis::Y)) => Quat::from_xyzw(0.0, *a, 0.0, *w),
                (Some([a, w]), Some(Axis::Z)) => Quat::from_xyzw(0.0, 0.0, *a, *w),
                _ => Quat::IDENTITY,
            },
            _ => Quat::IDENTITY,
        }
    }

    /// Neutralized position samples, or `None` for rotation curves.
    pub fn position_samples(&self) -> Option<Vec<Vec3>> {
        let mut c = self.clone();
        if !c.is_position() {
            return None;
        }
        c.neutralize();
        match c.values {
            CurveValues::Vec3(v) => Some(v),
            _ => None,
        }
    }
}

/// Elementwise sum of two position curves.
///
/// Both operands are neutralized to vec3 first. If the keyframe sets differ,
/// each curve is resampled onto the union of keyframe indices using
/// step-hold lookup (latest native keyframe ≤ target; never interpolate,
/// never look ahead). The union graph is interned into `graphs`.
pub fn add_curves(a: &Curve, b: &Curve, graphs: &mut GraphRegistry) -> Curve {
    let mut a = a.clone();
    let mut b = b.clone();
    a.neutralize();
    b.neutralize();

    let ga = graphs.get(a.graph).clone();
    let gb = graphs.get(b.graph).clone();
    let union = union_keyframes(ga.keyframes(), gb.keyframes());

    let va = match &a.values {
        CurveValues::Vec3(v) => resample_vec3(v, &ga, &union),
        _ => return a,
    };
    let vb = match &b.values {
        CurveValues::Vec3(v) => resample_vec3(v, &gb, &union),
        _ => return a,
    };
    let sum = va.iter().zip(&vb).map(|(x, y)| *x + *y).collect();

    Curve {
        format: CurveFormat::PosVec3,
        graph: graphs.intern(union),
        values: CurveValues::Vec3(sum),
    }
}

/// Merge two ascending keyframe sequences, deduplicated.
pub fn union_keyframes(a: &[u16], b: &[u16]) -> Vec<u16> {
    let mut union = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let next = match (a.get(i), b.get(j)) {
            (Some(&x), Some(&y)) if x == y => {
                i += 1;
                j += 1;
                x
            }
            (Some(&x), Some(&y)) if x < y => {
                i += 1;
                x
            }
            (Some(_), Some(&y)) => {
                j += 1;
                y
            }
            (Some(&x), None) => {
                i += 1;
                x
            }
            (None, Some(&y)) => {
                j += 1;
                y
            }
            (None, None) => break,
        };
        union.push(next);
    }
    union
}

/// Step-hold resample of `values` (sampled on `graph`) onto `target` frames.
pub fn resample_vec3(values: &[Vec3], graph: &Graph, target: &[u16]) -> Vec<Vec3> {
    target
        .iter()
        .map(|&f| {
            values
                .get(graph.step_hold_index(f))
                .copied()
                .unwrap_or(Vec3::ZERO)
        })
        .collect()
}
