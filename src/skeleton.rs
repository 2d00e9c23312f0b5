//! Read-only reference skeletons.
//!
//! A reference skeleton supplies rest-pose bone positions and parent links
//! for the retarget engine. It is external data (typically read from a model
//! description by the caller); this module only indexes it. The name index
//! and children lists are precomputed once at construction and never mutated
//! afterwards.

use glam::Vec3;
use hashbrown::HashMap;

use crate::names;

/// One reference bone record as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RefBone {
    pub name: String,
    /// Rest-pose position relative to the parent.
    pub local_pos: Vec3,
    /// Rest-pose position in model space.
    pub global_pos: Vec3,
    /// Parent index into the skeleton's bone list; `None` for roots.
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct RefSkeleton {
    bones: Vec<RefBone>,
    by_name: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
}

impl RefSkeleton {
    /// Index a caller-supplied bone list. Parent indices must refer to
    /// earlier entries or be `None`.
    pub fn from_bones(bones: Vec<RefBone>) -> Self {
        let mut by_name = HashMap::with_capacity(bones.len());
        let mut children = vec![Vec::new(); bones.len()];
        for (i, bone) in bones.iter().enumerate() {
            by_name.insert(bone.name.clone(), i);
            if let Some(p) = bone.parent {
                debug_assert!(p < i);
                children[p].push(i);
            }
        }
        Self {
            bones,
            by_name,
            children,
        }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[RefBone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> &RefBone {
        &self.bones[index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&RefBone> {
        self.index_of(name).map(|i| &self.bones[i])
    }

    /// First bone whose name contains `fragment`.
    pub fn index_containing(&self, fragment: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name.contains(fragment))
    }

    pub fn children_of(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    /// Parent rest position in model space; origin for roots.
    pub fn parent_global(&self, index: usize) -> Vec3 {
        self.bones[index]
            .parent
            .map(|p| self.bones[p].global_pos)
            .unwrap_or(Vec3::ZERO)
    }

    /// All descendants of `index` in depth-first order, excluding `index`.
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.children[index].iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.children[i].iter().rev());
        }
        out
    }

    /// Ancestors of `index`, nearest first.
    pub fn ancestors(&self, index: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut cur = self.bones[index].parent;
        while let Some(p) = cur {
            chain.push(p);
            cur = self.bones[p].parent;
        }
        chain
    }

    /// Copy with every bone renamed through the static tables, so reference
    /// names match an animation's already-renamed bone names.
    pub fn renamed(&self, new_bones: bool, de_layer: bool) -> RefSkeleton {
        let bones = self
            .bones
            .iter()
            .map(|b| RefBone {
                name: names::rename_bone(&b.name, new_bones, de_layer),
                ..b.clone()
            })
            .collect();
        Self::from_bones(bones)
    }

    /// The two face-region subtree roots (face carrier and jaw), if present.
    pub fn face_roots(&self) -> (Option<usize>, Option<usize>) {
        (self.index_containing("face"), self.index_containing("_jaw"))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Small two-arm test skeleton builder used across the retarget tests.
    pub fn chain(bones: &[(&str, Option<usize>, Vec3)]) -> RefSkeleton {
        let bones = bones
            .iter()
            .map(|(name, parent, global)| RefBone {
                name: name.to_string(),
                local_pos: parent
                    .map(|p| *global - bones[p].2)
                    .unwrap_or(*global),
                global_pos: *global,
                parent: *parent,
            })
            .collect();
        RefSkeleton::from_bones(bones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RefSkeleton {
        test_support::chain(&[
            ("center_c_n", None, Vec3::new(0.0, 1.0, 0.0)),
            ("ketu_c_n", Some(0), Vec3::new(0.0, 0.9, 0.0)),
            ("kosi_c_n", Some(0), Vec3::new(0.0, 0.85, 0.0)),
            ("face_c_n", Some(1), Vec3::new(0.0, 1.6, 0.0)),
            ("_jaw_c_n", Some(3), Vec3::new(0.0, 1.55, 0.05)),
        ])
    }

    #[test]
    fn test_index_and_children() {
        let skel = sample();
        assert_eq!(skel.index_of("kosi_c_n"), Some(2));
        assert_eq!(skel.children_of(0), &[1, 2]);
        assert_eq!(skel.parent_global(1), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(skel.parent_global(0), Vec3::ZERO);
    }

    #[test]
    fn test_descendants_depth_first() {
        let skel = sample();
        assert_eq!(skel.descendants(0), vec![1, 3, 4, 2]);
        assert!(skel.descendants(4).is_empty());
    }

    #[test]
    fn test_renamed_lookup() {
        let legacy = test_support::chain(&[("center_n", None, Vec3::ZERO)]);
        let current = legacy.renamed(true, false);
        assert!(current.get("center_c_n").is_some());
        assert!(current.get("center_n").is_none());
    }
}
