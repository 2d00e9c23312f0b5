//! Skeletal-animation container conversion for the GMT/CMT formats
//!
//! Converts motion (.gmt) and camera (.cmt) containers between the format
//! revisions used across the supported game titles: curve storage
//! substitution, bone renaming, root-bone layout changes, hip reparenting,
//! rest-pose retargeting, and batch merging of cutscene takes.
//!
//! # Modules
//!
//! - [`formats`] - byte-exact GMT/CMT codecs
//! - [`model`] - decoded container model (animations, bones, curves, graphs)
//! - [`profile`] - per-game version/topology descriptors
//! - [`names`] - static bone-rename tables
//! - [`skeleton`] - read-only reference skeletons for retargeting
//! - [`convert`] - the conversion pipeline
//! - [`merge`] - back-to-back container concatenation
//! - [`camera`] - camera-track scene placement

pub mod camera;
pub mod convert;
pub mod error;
pub mod formats;
pub mod merge;
pub mod model;
pub mod names;
pub mod profile;
pub mod skeleton;

pub use camera::reset_origin;
pub use convert::{ResetMode, TranslationOptions, convert};
pub use error::ConvertError;
pub use formats::cmt::{CMT_EXT, CMT_MAGIC, CameraFrame, CameraTrack, CmtFile};
pub use formats::gmt::{GMT_EXT, GMT_MAGIC};
pub use merge::{MergeOutcome, MergedFile, merge_cameras, merge_into, merge_motions};
pub use model::{
    Animation, Bone, BoneName, Curve, CurveFormat, CurveValues, GmtFile, Graph, GraphId,
    GraphRegistry, MAX_KEYFRAME,
};
pub use profile::{Game, GameProfile};
pub use skeleton::{RefBone, RefSkeleton};
