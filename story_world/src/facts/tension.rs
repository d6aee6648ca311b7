//! Tension kinds and their defeat relation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::WorldError;

/// Kinds of dramatic tension a fact can express.
///
/// Retained kinds persist in a character's working memory. Resolution kinds
/// (`LifeNormal`, `HealthNormal`, `PrisonerFree`, `DangerOver`) are never
/// stored; they only exist to defeat the tension they resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TensionKind {
    ActorDead,
    LifeAtRisk,
    HealthAtRisk,
    Prisoner,
    PotentialDanger,
    LoveCompetition,
    ClashingEmotions,

    LifeNormal,
    HealthNormal,
    PrisonerFree,
    DangerOver,
}

impl TensionKind {
    pub const ALL: [TensionKind; 11] = [
        TensionKind::ActorDead,
        TensionKind::LifeAtRisk,
        TensionKind::HealthAtRisk,
        TensionKind::Prisoner,
        TensionKind::PotentialDanger,
        TensionKind::LoveCompetition,
        TensionKind::ClashingEmotions,
        TensionKind::LifeNormal,
        TensionKind::HealthNormal,
        TensionKind::PrisonerFree,
        TensionKind::DangerOver,
    ];

    /// Two-letter abbreviation used by the catalog and exemplar files.
    pub fn abbreviation(self) -> &'static str {
        match self {
            TensionKind::ActorDead => "Ad",
            TensionKind::LifeAtRisk => "Lr",
            TensionKind::HealthAtRisk => "Hr",
            TensionKind::Prisoner => "Pr",
            TensionKind::PotentialDanger => "Pd",
            TensionKind::LoveCompetition => "Lc",
            TensionKind::ClashingEmotions => "Ce",
            TensionKind::LifeNormal => "Ln",
            TensionKind::HealthNormal => "Hn",
            TensionKind::PrisonerFree => "Pf",
            TensionKind::DangerOver => "Do",
        }
    }

    /// The tension this kind cancels, if it is a resolution kind.
    pub fn defeats(self) -> Option<TensionKind> {
        match self {
            TensionKind::LifeNormal => Some(TensionKind::LifeAtRisk),
            TensionKind::HealthNormal => Some(TensionKind::HealthAtRisk),
            TensionKind::PrisonerFree => Some(TensionKind::Prisoner),
            TensionKind::DangerOver => Some(TensionKind::PotentialDanger),
            _ => None,
        }
    }

    /// Whether facts of this kind stay in working memory once added.
    pub fn is_retained(self) -> bool {
        self.defeats().is_none()
    }

    /// Life or health at risk; these stay visible in every retrieval tier.
    pub fn is_risk(self) -> bool {
        matches!(self, TensionKind::LifeAtRisk | TensionKind::HealthAtRisk)
    }
}

impl std::fmt::Display for TensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for TensionKind {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TensionKind::ALL
            .into_iter()
            .find(|kind| kind.abbreviation().eq_ignore_ascii_case(s))
            .ok_or_else(|| WorldError::UnknownTension(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviation_round_trip() {
        for kind in TensionKind::ALL {
            assert_eq!(kind.abbreviation().parse::<TensionKind>().unwrap(), kind);
        }
        assert_eq!("lr".parse::<TensionKind>().unwrap(), TensionKind::LifeAtRisk);
    }

    #[test]
    fn test_unknown_abbreviation() {
        assert_eq!(
            "Zz".parse::<TensionKind>().unwrap_err(),
            WorldError::UnknownTension("Zz".to_string())
        );
    }

    #[test]
    fn test_defeat_relation() {
        assert_eq!(TensionKind::PrisonerFree.defeats(), Some(TensionKind::Prisoner));
        assert_eq!(TensionKind::Prisoner.defeats(), None);
        assert!(!TensionKind::LifeNormal.is_retained());
        assert!(TensionKind::LoveCompetition.is_retained());
    }

    #[test]
    fn test_risk_classification() {
        assert!(TensionKind::LifeAtRisk.is_risk());
        assert!(TensionKind::HealthAtRisk.is_risk());
        assert!(!TensionKind::Prisoner.is_risk());
    }
}
