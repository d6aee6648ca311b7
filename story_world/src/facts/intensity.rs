//! Emotion categories and intensities.

use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Category of an emotional link between two characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EmotionKind {
    /// Friendship, gratitude, hatred between peers.
    Brotherly,
    /// Love or rejection.
    Amorous,
    /// Matches either category.
    Generic,
}

impl EmotionKind {
    /// Equal categories, or either side generic.
    pub fn compatible(self, other: EmotionKind) -> bool {
        self == other || self == EmotionKind::Generic || other == EmotionKind::Generic
    }
}

/// Strength of an emotion, -3..=3.
///
/// `Proportional` is resolved when the action is committed, from how strongly
/// the reacting character is linked to the one the action affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Intensity {
    Level(i8),
    Proportional { base: i8 },
}

impl Intensity {
    /// The literal level, if already resolved.
    pub fn level(self) -> Option<i8> {
        match self {
            Intensity::Level(level) => Some(level),
            Intensity::Proportional { .. } => None,
        }
    }

    pub fn is_positive(self) -> bool {
        self.signum() > 0
    }

    pub fn signum(self) -> i8 {
        match self {
            Intensity::Level(level) => level.signum(),
            Intensity::Proportional { base } => base.signum(),
        }
    }

    pub fn magnitude(self) -> u8 {
        match self {
            Intensity::Level(level) => level.unsigned_abs(),
            Intensity::Proportional { base } => base.unsigned_abs(),
        }
    }
}

// Rows: link strength 1..=3. Columns: base -3..=3.
const PROPORTIONAL_TABLE: [[i8; 7]; 3] = [
    [-1, -1, -1, 0, 1, 1, 1],
    [-2, -2, -1, 0, 1, 2, 2],
    [-3, -3, -2, 0, 2, 3, 3],
];

/// Resolve a proportional intensity through the fixed policy table.
///
/// Inputs outside the table are rejected rather than clamped.
pub fn resolve_proportional(link_strength: i8, base: i8) -> Result<i8, WorldError> {
    if !(1..=3).contains(&link_strength) || !(-3..=3).contains(&base) {
        return Err(WorldError::ProportionalOutOfDomain {
            strength: link_strength,
            base,
        });
    }
    Ok(PROPORTIONAL_TABLE[(link_strength - 1) as usize][(base + 3) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotion_compatibility() {
        assert!(EmotionKind::Brotherly.compatible(EmotionKind::Brotherly));
        assert!(EmotionKind::Generic.compatible(EmotionKind::Amorous));
        assert!(!EmotionKind::Brotherly.compatible(EmotionKind::Amorous));
    }

    #[test]
    fn test_table_corners() {
        assert_eq!(resolve_proportional(1, -3).unwrap(), -1);
        assert_eq!(resolve_proportional(3, 3).unwrap(), 3);
        assert_eq!(resolve_proportional(2, 0).unwrap(), 0);
        assert_eq!(resolve_proportional(3, -1).unwrap(), -2);
    }

    #[test]
    fn test_out_of_domain_is_rejected() {
        assert!(resolve_proportional(0, 2).is_err());
        assert!(resolve_proportional(4, 2).is_err());
        assert_eq!(
            resolve_proportional(2, -4).unwrap_err(),
            WorldError::ProportionalOutOfDomain {
                strength: 2,
                base: -4
            }
        );
    }

    #[test]
    fn test_intensity_polarity() {
        assert!(Intensity::Level(2).is_positive());
        assert!(!Intensity::Level(-2).is_positive());
        assert_eq!(Intensity::Proportional { base: -2 }.signum(), -1);
        assert_eq!(Intensity::Level(-3).magnitude(), 3);
        assert_eq!(Intensity::Proportional { base: 1 }.level(), None);
    }
}
