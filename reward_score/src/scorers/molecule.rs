//! Molecule-generation scorer.
//!
//! Stages run strictly in order and each gates the next:
//! format (`<SMILES>…</SMILES>`), validity (oracle parse), then seven bounded
//! property rewards. A failed stage truncates the sum at that stage.

use super::components;
use crate::extract::{single_block, truncate_chars};
use crate::oracle::{OracleResult, PropertyOracle};
use crate::{GroundTruth, GroundTruthKind, Result, ScoreBreakdown, ScoreError, Scorer};
use serde::{Deserialize, Serialize};

pub const SMILES_OPEN: &str = "<SMILES>";
pub const SMILES_CLOSE: &str = "</SMILES>";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoleculeRewards {
    pub format_ok: f64,
    pub format_failed: f64,
    pub valid: f64,
    pub invalid: f64,
    /// SA reward when the oracle has no synthetic-accessibility estimator.
    pub sa_neutral: f64,
}

impl Default for MoleculeRewards {
    fn default() -> Self {
        Self {
            format_ok: 1.0,
            format_failed: -5.0,
            valid: 0.5,
            invalid: -3.0,
            sa_neutral: 1.0,
        }
    }
}

impl MoleculeRewards {
    pub fn validate(&self) -> Result<()> {
        let all = [
            self.format_ok,
            self.format_failed,
            self.valid,
            self.invalid,
            self.sa_neutral,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(ScoreError::InvalidConfig(
                "molecule rewards must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct MoleculeScorer<O> {
    oracle: O,
    rewards: MoleculeRewards,
}

impl<O: PropertyOracle> MoleculeScorer<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            rewards: MoleculeRewards::default(),
        }
    }

    pub fn with_rewards(oracle: O, rewards: MoleculeRewards) -> Result<Self> {
        rewards.validate()?;
        Ok(Self { oracle, rewards })
    }

    #[tracing::instrument(level = "trace", skip_all, fields(oracle = self.oracle.name()))]
    pub fn score_response(&self, response: &str) -> ScoreBreakdown {
        let r = &self.rewards;

        let smiles = match single_block(response, SMILES_OPEN, SMILES_CLOSE) {
            Some(s) if !s.is_empty() => s,
            _ => {
                tracing::debug!(
                    response = %truncate_chars(response, 100),
                    "molecule: format check failed"
                );
                return ScoreBreakdown::single(components::FORMAT, r.format_failed);
            }
        };
        let mut out = ScoreBreakdown::single(components::FORMAT, r.format_ok);

        let mol = match self.oracle.parse(smiles) {
            Ok(Some(mol)) => mol,
            Ok(None) => {
                tracing::debug!(smiles, "molecule: not a valid structure");
                out.push(components::VALIDITY, r.invalid);
                return out;
            }
            Err(e) => {
                tracing::debug!(smiles, %e, "molecule: oracle could not parse");
                out.push(components::VALIDITY, r.invalid);
                return out;
            }
        };
        out.push(components::VALIDITY, r.valid);

        let o = &self.oracle;
        out.push(
            components::QED,
            degrade(components::QED, o.drug_likeness(&mol), qed_reward),
        );
        let sa = match o.synthetic_accessibility(&mol) {
            Ok(Some(sa)) => sa_reward(sa),
            Ok(None) => r.sa_neutral,
            Err(e) => {
                tracing::debug!(%e, "molecule: sa unavailable for this structure");
                0.0
            }
        };
        out.push(components::SA, sa);
        out.push(
            components::LOGP,
            degrade(components::LOGP, o.log_p(&mol), logp_reward),
        );
        out.push(
            components::MW,
            degrade(components::MW, o.molecular_weight(&mol), mw_reward),
        );
        out.push(
            components::TPSA,
            degrade(components::TPSA, o.polar_surface_area(&mol), tpsa_reward),
        );
        out.push(
            components::LIPINSKI,
            degrade(components::LIPINSKI, o.violation_count(&mol), lipinski_reward),
        );
        let rings = degrade(
            components::DOMAIN_SPECIFIC,
            o.aromatic_ring_count(&mol),
            aromatic_ring_reward,
        );
        let rotatable = degrade(
            components::DOMAIN_SPECIFIC,
            o.rotatable_bond_count(&mol),
            rotatable_bond_reward,
        );
        out.push(components::DOMAIN_SPECIFIC, rings + rotatable);

        tracing::debug!(breakdown = %out, "molecule: scored");
        out
    }
}

impl<O> Scorer for MoleculeScorer<O>
where
    O: PropertyOracle + Send + Sync,
{
    fn name(&self) -> &'static str {
        "molecule"
    }

    fn ground_truth_kind(&self) -> GroundTruthKind {
        GroundTruthKind::Unused
    }

    fn score(&self, response: &str, ground_truth: &GroundTruth) -> Result<ScoreBreakdown> {
        if let GroundTruth::RoleMap(_) = ground_truth {
            return Err(ScoreError::GroundTruthMismatch {
                scorer: self.name(),
                expected: GroundTruthKind::Unused,
                actual: ground_truth.kind(),
            });
        }
        Ok(self.score_response(response))
    }
}

/// A failed property query contributes zero.
fn degrade<T>(property: &'static str, value: OracleResult<T>, reward: impl FnOnce(T) -> f64) -> f64 {
    match value {
        Ok(v) => reward(v),
        Err(e) => {
            tracing::debug!(property, %e, "molecule: property unavailable");
            0.0
        }
    }
}

/// Drug-likeness: 0 below 0.5, then linear to 2.0 at 1.0.
pub fn qed_reward(qed: f64) -> f64 {
    if !qed.is_finite() || qed < 0.5 {
        return 0.0;
    }
    ((qed - 0.5) * 4.0).min(2.0)
}

/// Synthetic accessibility, lower is better: 2.0 at 1 down to 0.5 at 4, then
/// down to 0.05 at 7, zero beyond.
pub fn sa_reward(sa: f64) -> f64 {
    if !sa.is_finite() {
        return 0.0;
    }
    if sa <= 4.0 {
        (2.0 - (sa - 1.0) * 0.5).min(2.0)
    } else if sa <= 7.0 {
        (0.5 - (sa - 4.0) * 0.15).max(0.0)
    } else {
        0.0
    }
}

/// Lipophilicity: peak 1.5 at 2.5 inside [1, 4], partial ramp on [0, 1),
/// tail on (4, 5], zero elsewhere.
pub fn logp_reward(logp: f64) -> f64 {
    if (1.0..=4.0).contains(&logp) {
        1.5 - (logp - 2.5).abs() * 0.3
    } else if (0.0..1.0).contains(&logp) {
        logp * 0.8
    } else if logp > 4.0 && logp <= 5.0 {
        (0.5 - (logp - 4.0) * 0.3).max(0.0)
    } else {
        0.0
    }
}

/// Molecular weight: 1.0 on [200, 500], ramps on [150, 200) and (500, 600].
pub fn mw_reward(mw: f64) -> f64 {
    band_reward(mw, 150.0, 200.0, 500.0, 600.0)
}

/// Polar surface area: 1.0 on [40, 120], ramps on [20, 40) and (120, 140].
pub fn tpsa_reward(tpsa: f64) -> f64 {
    band_reward(tpsa, 20.0, 40.0, 120.0, 140.0)
}

/// Full reward inside `[lo, hi]`, half-height ramp up from `outer_lo`, linear
/// ramp down to zero at `outer_hi`.
fn band_reward(v: f64, outer_lo: f64, lo: f64, hi: f64, outer_hi: f64) -> f64 {
    if (lo..=hi).contains(&v) {
        1.0
    } else if (outer_lo..lo).contains(&v) {
        (v - outer_lo) / (lo - outer_lo) * 0.5
    } else if v > hi && v <= outer_hi {
        (1.0 - (v - hi) / (outer_hi - hi)).max(0.0)
    } else {
        0.0
    }
}

/// Rule-of-five: 0 violations 1.5, 1 -> 1.0, 2 -> 0.5, more -> 0.
pub fn lipinski_reward(violations: u32) -> f64 {
    match violations {
        0 => 1.5,
        1 => 1.0,
        2 => 0.5,
        _ => 0.0,
    }
}

pub fn aromatic_ring_reward(rings: u32) -> f64 {
    match rings {
        2..=4 => 0.6,
        1 | 5 => 0.3,
        _ => 0.0,
    }
}

pub fn rotatable_bond_reward(bonds: u32) -> f64 {
    match bonds {
        5..=10 => 0.4,
        3..=4 | 11..=12 => 0.2,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::test_support::{Descriptors, TableOracle};
    use crate::oracle::{OracleError, UnavailableOracle};

    const GEFITINIB_LIKE: &str = "COc1cc2ncnc(Nc3ccc(F)c(Cl)c3)c2cc1OCCCN1CCOCC1";

    fn drug_like() -> Descriptors {
        Descriptors {
            qed: 0.75,
            sa: 2.0,
            logp: 2.5,
            mw: 350.0,
            tpsa: 80.0,
            hbd: 1,
            hba: 7,
            aromatic_rings: 3,
            rotatable_bonds: 8,
        }
    }

    fn scorer() -> MoleculeScorer<TableOracle> {
        let oracle = TableOracle {
            sa_available: true,
            ..Default::default()
        }
        .with(GEFITINIB_LIKE, drug_like());
        MoleculeScorer::new(oracle)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_smiles_is_a_format_failure() {
        let b = scorer().score_response("<SMILES></SMILES>");
        assert_eq!(b.total(), -5.0);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn missing_or_repeated_tags_fail_format() {
        let s = scorer();
        assert_eq!(s.score_response("the molecule is CCO").total(), -5.0);
        assert_eq!(
            s.score_response("<SMILES>CCO</SMILES> or <SMILES>CCN</SMILES>").total(),
            -5.0
        );
    }

    #[test]
    fn unparseable_smiles_stops_at_validity() {
        let b = scorer().score_response("<SMILES>INVALID_SMILES_STRING</SMILES>");
        assert_eq!(b.total(), 1.0 - 3.0);
        assert_eq!(b.get(components::QED), None);
    }

    #[test]
    fn unavailable_oracle_degrades_to_validity_penalty() {
        let b = MoleculeScorer::new(UnavailableOracle).score_response("<SMILES>CCO</SMILES>");
        assert_eq!(b.total(), -2.0);
    }

    #[test]
    fn drug_like_molecule_full_breakdown() {
        let text = format!("Here you go: <smiles> {GEFITINIB_LIKE} </smiles>");
        let b = scorer().score_response(&text);
        assert_eq!(b.get(components::FORMAT), Some(1.0));
        assert_eq!(b.get(components::VALIDITY), Some(0.5));
        assert!(close(b.get(components::QED).unwrap(), 1.0));
        assert!(close(b.get(components::SA).unwrap(), 1.5));
        assert!(close(b.get(components::LOGP).unwrap(), 1.5));
        assert_eq!(b.get(components::MW), Some(1.0));
        assert_eq!(b.get(components::TPSA), Some(1.0));
        assert_eq!(b.get(components::LIPINSKI), Some(1.5));
        assert!(close(b.get(components::DOMAIN_SPECIFIC).unwrap(), 1.0));
        assert!(close(b.total(), 1.0 + 0.5 + 1.0 + 1.5 + 1.5 + 1.0 + 1.0 + 1.5 + 1.0));
    }

    #[test]
    fn scoring_is_deterministic() {
        let s = scorer();
        let text = format!("<SMILES>{GEFITINIB_LIKE}</SMILES>");
        let first = s.score_response(&text);
        for _ in 0..5 {
            assert_eq!(s.score_response(&text), first);
        }
    }

    #[test]
    fn missing_sa_estimator_is_neutral() {
        let oracle = TableOracle::default().with("CCO", drug_like());
        let b = MoleculeScorer::new(oracle).score_response("<SMILES>CCO</SMILES>");
        assert_eq!(b.get(components::SA), Some(1.0));
    }

    struct FlakyOracle;

    impl PropertyOracle for FlakyOracle {
        type Molecule = ();

        fn name(&self) -> &'static str {
            "flaky"
        }
        fn parse(&self, _smiles: &str) -> OracleResult<Option<()>> {
            Ok(Some(()))
        }
        fn drug_likeness(&self, _mol: &()) -> OracleResult<f64> {
            Err(OracleError::Computation("kekulize".to_string()))
        }
        fn synthetic_accessibility(&self, _mol: &()) -> OracleResult<Option<f64>> {
            Err(OracleError::Computation("fragment".to_string()))
        }
        fn log_p(&self, _mol: &()) -> OracleResult<f64> {
            Ok(2.5)
        }
        fn molecular_weight(&self, _mol: &()) -> OracleResult<f64> {
            Err(OracleError::Computation("valence".to_string()))
        }
        fn polar_surface_area(&self, _mol: &()) -> OracleResult<f64> {
            Ok(f64::NAN)
        }
        fn h_bond_donors(&self, _mol: &()) -> OracleResult<u32> {
            Ok(0)
        }
        fn h_bond_acceptors(&self, _mol: &()) -> OracleResult<u32> {
            Ok(0)
        }
        fn aromatic_ring_count(&self, _mol: &()) -> OracleResult<u32> {
            Ok(2)
        }
        fn rotatable_bond_count(&self, _mol: &()) -> OracleResult<u32> {
            Err(OracleError::Computation("rotors".to_string()))
        }
    }

    #[test]
    fn failing_properties_contribute_zero() {
        let b = MoleculeScorer::new(FlakyOracle).score_response("<SMILES>C</SMILES>");
        assert_eq!(b.get(components::QED), Some(0.0));
        assert_eq!(b.get(components::SA), Some(0.0));
        assert_eq!(b.get(components::LOGP), Some(1.5));
        assert_eq!(b.get(components::MW), Some(0.0));
        assert_eq!(b.get(components::TPSA), Some(0.0));
        // default violation count needs molecular weight, which fails
        assert_eq!(b.get(components::LIPINSKI), Some(0.0));
        assert!(close(b.get(components::DOMAIN_SPECIFIC).unwrap(), 0.6));
    }

    #[test]
    fn property_curves() {
        assert_eq!(qed_reward(0.4), 0.0);
        assert_eq!(qed_reward(1.0), 2.0);
        assert_eq!(sa_reward(1.0), 2.0);
        assert_eq!(sa_reward(4.0), 0.5);
        assert!(close(sa_reward(6.0), 0.2));
        assert_eq!(sa_reward(8.0), 0.0);
        assert!(close(logp_reward(0.5), 0.4));
        assert!(close(logp_reward(4.5), 0.35));
        assert_eq!(logp_reward(-1.0), 0.0);
        assert_eq!(logp_reward(5.5), 0.0);
        assert_eq!(mw_reward(175.0), 0.25);
        assert_eq!(mw_reward(550.0), 0.5);
        assert_eq!(mw_reward(100.0), 0.0);
        assert_eq!(mw_reward(700.0), 0.0);
        assert_eq!(tpsa_reward(30.0), 0.25);
        assert_eq!(tpsa_reward(130.0), 0.5);
        assert_eq!(lipinski_reward(1), 1.0);
        assert_eq!(lipinski_reward(4), 0.0);
        assert_eq!(aromatic_ring_reward(5), 0.3);
        assert_eq!(aromatic_ring_reward(0), 0.0);
        assert_eq!(rotatable_bond_reward(12), 0.2);
        assert_eq!(rotatable_bond_reward(13), 0.0);
    }

    #[test]
    fn role_map_ground_truth_is_a_mismatch() {
        let gt = GroundTruth::RoleMap(Default::default());
        assert!(scorer().score("<SMILES>C</SMILES>", &gt).is_err());
        assert!(scorer().score("<SMILES>C</SMILES>", &GroundTruth::Unused).is_ok());
    }
}
