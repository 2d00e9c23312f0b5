//! Static bone-rename tables.
//!
//! Two bidirectional layers: legacy naming ⇄ current (generation-5) naming,
//! plus a Dragon-Engine face sub-table layered on top of the current naming.
//! Renaming is a table lookup with identity fallback; unknown names pass
//! through unchanged. The tables are immutable configuration data, built once
//! and never mutated afterwards.

use std::sync::LazyLock;

use glam::Vec3;
use hashbrown::HashMap;

type RenameTable = HashMap<&'static str, &'static str>;

/// legacy -> current naming (root, torso, weapon, hand and face carriers).
pub static CURRENT_FROM_LEGACY: LazyLock<HashMap<String, String>> = LazyLock::new(|| {
    let mut map: HashMap<String, String> = HashMap::new();
    let base: RenameTable = HashMap::from_iter([
        ("pattern_n", "pattern_c_n"),
        ("center_n", "center_c_n"),
        ("ketu_n", "ketu_c_n"),
        ("kosi_n", "kosi_c_n"),
        ("mune_n", "mune_c_n"),
        ("kubi_n", "kubi_c_n"),
        ("face", "face_c_n"),
        ("ude3_r2_n", "ude2_twist_r_sup"),
        ("ude3_l2_n", "ude2_twist_l_sup"),
        ("buki_r_n", "buki1_r_n"),
        ("buki_l_n", "buki1_l_n"),
    ]);
    for (old, new) in base {
        map.insert(old.to_string(), new.to_string());
    }
    for (old, new) in hand_pairs() {
        map.insert(old, new);
    }
    for (old, new) in face_pairs() {
        map.insert(old, new);
    }
    map
});

/// current -> legacy naming (inverse of [`CURRENT_FROM_LEGACY`]).
pub static LEGACY_FROM_CURRENT: LazyLock<HashMap<String, String>> = LazyLock::new(|| {
    CURRENT_FROM_LEGACY
        .iter()
        .map(|(k, v)| (v.clone(), k.clone()))
        .collect()
});

/// current -> Dragon-Engine face naming (lip region only).
pub static DE_FACE_FROM_CURRENT: LazyLock<HashMap<String, String>> = LazyLock::new(|| {
    let pairs: RenameTable = HashMap::from_iter([
        ("_lip_top_c_n", "_lip_top1_c_n"),
        ("_lip_top_r_n", "_lip_top1_r_n"),
        ("_lip_top_l_n", "_lip_top1_l_n"),
        ("_lip_side_r_n", "_lip_top_side1_r_n"),
        ("_lip_side_l_n", "_lip_top_side1_l_n"),
        ("_lip_btm_c_n", "_lip_btm1_c_n"),
        ("_lip_btm_r_n", "_lip_btm1_r_n"),
        ("_lip_btm_l_n", "_lip_btm1_l_n"),
        ("_lip_side2_r_n", "_lip_btm_side1_r_n"),
        ("_lip_side2_l_n", "_lip_btm_side1_l_n"),
    ]);
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
});

/// Dragon-Engine face -> current naming (inverse of [`DE_FACE_FROM_CURRENT`]).
pub static CURRENT_FROM_DE_FACE: LazyLock<HashMap<String, String>> = LazyLock::new(|| {
    DE_FACE_FROM_CURRENT
        .iter()
        .map(|(k, v)| (v.clone(), k.clone()))
        .collect()
});

/// Current names of the hand bones (used by the finger rest-position fix).
pub static HAND_BONES: LazyLock<Vec<String>> =
    LazyLock::new(|| hand_pairs().into_iter().map(|(_, new)| new).collect());

fn hand_pairs() -> Vec<(String, String)> {
    let mut pairs = vec![
        ("kou_r".to_string(), "kou_r_n".to_string()),
        ("kou_l".to_string(), "kou_l_n".to_string()),
    ];
    for finger in ["naka", "hito", "oya", "koyu", "kusu"] {
        for joint in 1..4 {
            for side in ["r", "l"] {
                pairs.push((
                    format!("{finger}{joint}_{side}"),
                    format!("{finger}{joint}_{side}_n"),
                ));
            }
        }
    }
    pairs
}

fn face_pairs() -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = [
        ("_brow", "_brow_c_n"),
        ("_eyebrow_r2", "_eyebrow2_r_n"),
        ("_eyebrow_l2", "_eyebrow2_l_n"),
        ("_jaw", "_jaw_c_n"),
        ("_chin", "_chin_c_n"),
        ("_throat", "_throat_c_n"),
    ]
    .into_iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect();

    // (legacy stem, current stem, sides)
    let stems: [(&str, &str, &[&str]); 14] = [
        ("eyebrow", "eyebrow", &["r", "l"]),
        ("temple", "eyebrow3", &["r", "l"]),
        ("eyelid", "eyelid", &["r", "l"]),
        ("eyelid_und", "eyelid_und", &["r", "l"]),
        ("eye", "eye", &["r", "l"]),
        ("nose_side", "cheek1", &["r", "l"]),
        ("cheek", "cheek3", &["r", "l"]),
        ("cheek2", "cheek2", &["r", "l"]),
        ("puff", "cheek_btm1", &["r", "l"]),
        ("nostril", "nose_side", &["r", "l"]),
        ("lip_top", "lip_top", &["r", "l", "c"]),
        ("lip_top_side", "lip_side", &["r", "l"]),
        ("lip_btm", "lip_btm", &["r", "l", "c"]),
        ("lip_btm_side", "lip_side2", &["r", "l"]),
    ];
    for (old, new, sides) in stems {
        for side in sides {
            pairs.push((format!("_{old}_{side}"), format!("_{new}_{side}_n")));
        }
    }
    pairs
}

/// Rename one bone through the layered tables, with identity fallback.
///
/// `new_bones` selects direction (toward current or toward legacy naming),
/// `de_layer` additionally applies the Dragon-Engine face layer in the same
/// direction.
pub fn rename_bone(name: &str, new_bones: bool, de_layer: bool) -> String {
    if new_bones {
        let n = CURRENT_FROM_LEGACY
            .get(name)
            .map(String::as_str)
            .unwrap_or(name);
        if de_layer {
            DE_FACE_FROM_CURRENT
                .get(n)
                .map(String::as_str)
                .unwrap_or(n)
                .to_string()
        } else {
            n.to_string()
        }
    } else {
        let n = LEGACY_FROM_CURRENT
            .get(name)
            .map(String::as_str)
            .unwrap_or(name);
        if de_layer {
            CURRENT_FROM_DE_FACE
                .get(n)
                .map(String::as_str)
                .unwrap_or(n)
                .to_string()
        } else {
            n.to_string()
        }
    }
}

/// Reference rest positions for the left-hand bones, used when no target
/// skeleton is supplied to the finger fix. Right side is the left mirrored
/// in X.
pub static REFERENCE_HAND_REST: LazyLock<HashMap<String, Vec3>> = LazyLock::new(|| {
    let left: [(&str, [f32; 3]); 16] = [
        ("kou_l_n", [0.014080048, 0.008924007, -0.014490001]),
        ("koyu1_l_n", [0.080514252, 0.006762028, -0.018353999]),
        ("koyu2_l_n", [0.039763331, -0.004830003, 0.0]),
        ("koyu3_l_n", [0.017862439, 0.0, 0.0]),
        ("kusu1_l_n", [0.087274253, 0.015456080, 0.002898000]),
        ("kusu2_l_n", [0.048453331, -0.001932025, 0.0]),
        ("kusu3_l_n", [0.023639977, 0.0, 0.0]),
        ("naka1_l_n", [0.105850041, 0.033074021, 0.013524003]),
        ("naka2_l_n", [0.053464293, -0.004830003, 0.0]),
        ("naka3_l_n", [0.029133320, 0.0, 0.0]),
        ("hito1_l_n", [0.101990044, 0.028244019, 0.039605998]),
        ("hito2_l_n", [0.045734286, 0.0, 0.0]),
        ("hito3_l_n", [0.026233315, 0.0, 0.0]),
        ("oya1_l_n", [0.009250045, -0.004599929, 0.031877998]),
        ("oya2_l_n", [0.071814209, 0.0, 0.000000044]),
        ("oya3_l_n", [0.034933388, 0.0, -0.000000098]),
    ];
    let mut map = HashMap::new();
    for (name, [x, y, z]) in left {
        map.insert(name.to_string(), Vec3::new(x, y, z));
        let right = format!("{}r_n", &name[..name.len() - 3]);
        map.insert(right, Vec3::new(-x, y, z));
    }
    map
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_to_current() {
        assert_eq!(rename_bone("center_n", true, false), "center_c_n");
        assert_eq!(rename_bone("ketu_n", true, false), "ketu_c_n");
        assert_eq!(rename_bone("naka1_r", true, false), "naka1_r_n");
        // Identity fallback for unknown names.
        assert_eq!(rename_bone("sync_c_n", true, false), "sync_c_n");
    }

    #[test]
    fn test_rename_de_face_layer() {
        assert_eq!(rename_bone("_lip_top_c", true, true), "_lip_top1_c_n");
        assert_eq!(
            rename_bone("_lip_top_side1_r_n", false, true),
            "_lip_side_r_n"
        );
    }

    #[test]
    fn test_rename_roundtrip() {
        for legacy in ["center_n", "kosi_n", "buki_r_n", "hito2_l"] {
            let current = rename_bone(legacy, true, false);
            assert_eq!(rename_bone(&current, false, false), legacy);
        }
    }

    #[test]
    fn test_hand_rest_mirrored() {
        let left = REFERENCE_HAND_REST["naka1_l_n"];
        let right = REFERENCE_HAND_REST["naka1_r_n"];
        assert_eq!(right, Vec3::new(-left.x, left.y, left.z));
    }
}
