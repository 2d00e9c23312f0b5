//! In-memory animation container model.
//!
//! The container is constructed fresh by the codec on decode. Derived fields
//! (per-animation frame counts, the name table, header counts) are invalid
//! until [`GmtFile::refresh`] runs; the encoder re-derives every count from
//! content, so hand-maintained header state can never leak to disk.

pub mod curve;
pub mod graph;
pub mod name;

pub use curve::{Axis, Channel, Curve, CurveFormat, CurveValues, add_curves};
pub use graph::{Graph, GraphId, GraphRegistry, MAX_KEYFRAME};
pub use name::BoneName;

/// One bone's ordered curve list.
///
/// After canonicalization a bone holds at most one position and one rotation
/// curve; reduced single/dual-axis encodings may coexist transiently before
/// that.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: BoneName,
    pub curves: Vec<Curve>,
}

impl Bone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: BoneName::new(name),
            curves: Vec::new(),
        }
    }

    pub fn position_curves(&self) -> impl Iterator<Item = &Curve> {
        self.curves.iter().filter(|c| c.is_position())
    }

    pub fn rotation_curves(&self) -> impl Iterator<Item = &Curve> {
        self.curves.iter().filter(|c| c.is_rotation())
    }

    pub fn position_curve_mut(&mut self) -> Option<&mut Curve> {
        self.curves.iter_mut().find(|c| c.is_position())
    }

    pub fn rotation_curve_mut(&mut self) -> Option<&mut Curve> {
        self.curves.iter_mut().find(|c| c.is_rotation())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: BoneName,
    pub bones: Vec<Bone>,
    /// Derived: max timeline length across the animation's graphs. Stale
    /// until [`GmtFile::refresh`] runs.
    pub frame_count: u32,
}

impl Animation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: BoneName::new(name),
            bones: Vec::new(),
            frame_count: 0,
        }
    }

    pub fn curves(&self) -> impl Iterator<Item = &Curve> {
        self.bones.iter().flat_map(|b| b.curves.iter())
    }

    pub fn curve_count(&self) -> usize {
        self.bones.iter().map(|b| b.curves.len()).sum()
    }

    /// Unique graph ids in first-use order.
    pub fn graph_ids(&self) -> Vec<GraphId> {
        let mut ids = Vec::new();
        for c in self.curves() {
            if !ids.contains(&c.graph) {
                ids.push(c.graph);
            }
        }
        ids
    }

    /// Last keyframe index across all of the animation's timelines.
    pub fn last_keyframe(&self, graphs: &GraphRegistry) -> u16 {
        self.curves()
            .map(|c| graphs.get(c.graph).last())
            .max()
            .unwrap_or(0)
    }

    /// First bone whose name is exactly `name`.
    pub fn bone_named(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name.as_str() == name)
    }

    /// First bone whose name contains `fragment`.
    pub fn bone_containing(&self, fragment: &str) -> Option<usize> {
        self.bones
            .iter()
            .position(|b| b.name.as_str().contains(fragment))
    }
}

/// A decoded animation container.
#[derive(Debug, Clone, Default)]
pub struct GmtFile {
    pub version: u32,
    pub animations: Vec<Animation>,
    pub graphs: GraphRegistry,
}

impl GmtFile {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            animations: Vec::new(),
            graphs: GraphRegistry::new(),
        }
    }

    /// Recompute every derived field from content. Must run after structural
    /// edits (bone insertion/removal, curve list rewrites, merges) and before
    /// the container is used again; the encoder re-derives counts itself.
    pub fn refresh(&mut self) {
        for anm in &mut self.animations {
            let mut frame_count = 0u32;
            for bone in &anm.bones {
                for curve in &bone.curves {
                    frame_count = frame_count.max(self.graphs.get(curve.graph).len() as u32);
                }
            }
            anm.frame_count = frame_count;
        }
    }

    /// Container name table: animation names first, then each animation's
    /// bone names in order. Derived, never stored.
    pub fn name_table(&self) -> Vec<BoneName> {
        let mut names: Vec<BoneName> = self.animations.iter().map(|a| a.name.clone()).collect();
        for anm in &self.animations {
            names.extend(anm.bones.iter().map(|b| b.name.clone()));
        }
        names
    }
}
