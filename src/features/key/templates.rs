//! Krumhansl-Schmuckler key profiles
//!
//! Defines the 24 rotated pitch-class templates (12 major + 12 minor) that key
//! estimation correlates against. The model is built once at startup and
//! shared by reference; it is never rebuilt per track.
//!
//! # Reference
//!
//! Krumhansl, C. L. (1990). *Cognitive Foundations of Musical Pitch*.
//! Oxford University Press.

use crate::analysis::result::Key;

/// Major base profile (tonic at index 0)
pub const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Minor base profile (tonic at index 0)
pub const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Number of key profiles (12 major + 12 minor)
pub const NUM_KEYS: usize = 24;

/// One rotated template and its key label
#[derive(Debug, Clone, PartialEq)]
pub struct KeyProfile {
    /// Pitch-class weights
    pub weights: [f32; 12],

    /// Key this template characterizes
    pub key: Key,
}

/// The 24 key profiles, in canonical order: major 0-11, then minor 0-11
///
/// The order doubles as the tie-break for key selection.
#[derive(Debug, Clone)]
pub struct KeyProfileModel {
    profiles: Vec<KeyProfile>,
}

impl KeyProfileModel {
    /// Build all 24 rotated profiles
    pub fn new() -> Self {
        let mut profiles = Vec::with_capacity(NUM_KEYS);

        for i in 0..12 {
            profiles.push(KeyProfile {
                weights: rotate_right(&MAJOR_PROFILE, i),
                key: Key::Major(i as u32),
            });
        }

        for i in 0..12 {
            profiles.push(KeyProfile {
                weights: rotate_right(&MINOR_PROFILE, i),
                key: Key::Minor(i as u32),
            });
        }

        Self { profiles }
    }

    /// All profiles in canonical order
    pub fn profiles(&self) -> &[KeyProfile] {
        &self.profiles
    }

    /// Profile at canonical position `idx` (0-23)
    pub fn get(&self, idx: usize) -> Option<&KeyProfile> {
        self.profiles.get(idx)
    }

    /// Human-readable labels in canonical order (e.g., "C major", ..., "B minor")
    pub fn labels(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.key.label()).collect()
    }
}

impl Default for KeyProfileModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotate a pitch-class vector right by `shift` semitones
///
/// `out[j] = v[(j - shift) mod 12]`, so the tonic weight moves to index `shift`.
pub fn rotate_right(v: &[f32; 12], shift: usize) -> [f32; 12] {
    let mut out = [0.0f32; 12];
    for (j, slot) in out.iter_mut().enumerate() {
        *slot = v[(j + 12 - shift % 12) % 12];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_has_24_profiles() {
        let model = KeyProfileModel::new();
        assert_eq!(model.profiles().len(), NUM_KEYS);
        assert!(model.get(24).is_none());
    }

    #[test]
    fn test_rotations_reproduce_entries() {
        let model = KeyProfileModel::new();
        for i in 0..12 {
            assert_eq!(model.get(i).unwrap().weights, rotate_right(&MAJOR_PROFILE, i));
            assert_eq!(model.get(i).unwrap().key, Key::Major(i as u32));
            assert_eq!(
                model.get(12 + i).unwrap().weights,
                rotate_right(&MINOR_PROFILE, i)
            );
            assert_eq!(model.get(12 + i).unwrap().key, Key::Minor(i as u32));
        }
    }

    #[test]
    fn test_rotation_is_cyclic() {
        assert_eq!(rotate_right(&MAJOR_PROFILE, 12), MAJOR_PROFILE);
        assert_eq!(rotate_right(&MINOR_PROFILE, 0), MINOR_PROFILE);
        let twice = rotate_right(&rotate_right(&MAJOR_PROFILE, 5), 7);
        assert_eq!(twice, MAJOR_PROFILE);
    }

    #[test]
    fn test_rotation_moves_tonic_weight() {
        let d_major = rotate_right(&MAJOR_PROFILE, 2);
        assert_eq!(d_major[2], 6.35);
        // Dominant of D is A (index 9)
        assert_eq!(d_major[9], 5.19);
    }

    #[test]
    fn test_labels() {
        let labels = KeyProfileModel::new().labels();
        assert_eq!(labels[0], "C major");
        assert_eq!(labels[1], "C# major");
        assert_eq!(labels[11], "B major");
        assert_eq!(labels[12], "C minor");
        assert_eq!(labels[21], "A minor");
    }
}
