//! Boundary to the external cheminformatics property oracle.
//!
//! Every call may fail. The molecule scorer maps failures to a neutral or zero
//! contribution; nothing here panics or propagates into the batch.

use std::sync::Mutex;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("property oracle unavailable: {0}")]
    Unavailable(String),

    #[error("property computation failed: {0}")]
    Computation(String),
}

pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// Physicochemical descriptors for a parsed molecular structure.
///
/// Implementations that are safe for concurrent read-only queries can be used
/// directly by the molecule scorer. Wrap anything else in [`SerializedOracle`].
pub trait PropertyOracle {
    type Molecule;

    fn name(&self) -> &'static str;

    /// `Ok(None)` when the text is not a valid structure.
    fn parse(&self, smiles: &str) -> OracleResult<Option<Self::Molecule>>;

    /// Quantitative drug-likeness estimate in `[0, 1]`.
    fn drug_likeness(&self, mol: &Self::Molecule) -> OracleResult<f64>;

    /// Synthetic accessibility in `[1, 10]`, lower is easier. `Ok(None)` when no
    /// estimator is installed.
    fn synthetic_accessibility(&self, mol: &Self::Molecule) -> OracleResult<Option<f64>>;

    fn log_p(&self, mol: &Self::Molecule) -> OracleResult<f64>;

    fn molecular_weight(&self, mol: &Self::Molecule) -> OracleResult<f64>;

    fn polar_surface_area(&self, mol: &Self::Molecule) -> OracleResult<f64>;

    fn h_bond_donors(&self, mol: &Self::Molecule) -> OracleResult<u32>;

    fn h_bond_acceptors(&self, mol: &Self::Molecule) -> OracleResult<u32>;

    /// Rule-of-five violations: MW > 500, logP > 5, H-bond donors > 5,
    /// H-bond acceptors > 10.
    fn violation_count(&self, mol: &Self::Molecule) -> OracleResult<u32> {
        let checks = [
            self.molecular_weight(mol)? > 500.0,
            self.log_p(mol)? > 5.0,
            self.h_bond_donors(mol)? > 5,
            self.h_bond_acceptors(mol)? > 10,
        ];
        Ok(checks.iter().filter(|v| **v).count() as u32)
    }

    fn aromatic_ring_count(&self, mol: &Self::Molecule) -> OracleResult<u32>;

    fn rotatable_bond_count(&self, mol: &Self::Molecule) -> OracleResult<u32>;
}

/// Stand-in for runs without a cheminformatics backend. Nothing parses, so
/// molecule scoring stops at the validity stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableOracle;

impl UnavailableOracle {
    fn err<T>() -> OracleResult<T> {
        Err(OracleError::Unavailable(
            "no cheminformatics backend configured".to_string(),
        ))
    }
}

impl PropertyOracle for UnavailableOracle {
    type Molecule = ();

    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn parse(&self, _smiles: &str) -> OracleResult<Option<()>> {
        Self::err()
    }

    fn drug_likeness(&self, _mol: &()) -> OracleResult<f64> {
        Self::err()
    }

    fn synthetic_accessibility(&self, _mol: &()) -> OracleResult<Option<f64>> {
        Ok(None)
    }

    fn log_p(&self, _mol: &()) -> OracleResult<f64> {
        Self::err()
    }

    fn molecular_weight(&self, _mol: &()) -> OracleResult<f64> {
        Self::err()
    }

    fn polar_surface_area(&self, _mol: &()) -> OracleResult<f64> {
        Self::err()
    }

    fn h_bond_donors(&self, _mol: &()) -> OracleResult<u32> {
        Self::err()
    }

    fn h_bond_acceptors(&self, _mol: &()) -> OracleResult<u32> {
        Self::err()
    }

    fn aromatic_ring_count(&self, _mol: &()) -> OracleResult<u32> {
        Self::err()
    }

    fn rotatable_bond_count(&self, _mol: &()) -> OracleResult<u32> {
        Self::err()
    }
}

/// Serialises every call to a non-reentrant oracle behind one lock.
pub struct SerializedOracle<O> {
    inner: Mutex<O>,
}

impl<O: PropertyOracle> SerializedOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&O) -> OracleResult<T>) -> OracleResult<T> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| OracleError::Unavailable("oracle lock poisoned".to_string()))?;
        f(&guard)
    }
}

impl<O: PropertyOracle> PropertyOracle for SerializedOracle<O> {
    type Molecule = O::Molecule;

    fn name(&self) -> &'static str {
        "serialized"
    }

    fn parse(&self, smiles: &str) -> OracleResult<Option<O::Molecule>> {
        self.with(|o| o.parse(smiles))
    }

    fn drug_likeness(&self, mol: &O::Molecule) -> OracleResult<f64> {
        self.with(|o| o.drug_likeness(mol))
    }

    fn synthetic_accessibility(&self, mol: &O::Molecule) -> OracleResult<Option<f64>> {
        self.with(|o| o.synthetic_accessibility(mol))
    }

    fn log_p(&self, mol: &O::Molecule) -> OracleResult<f64> {
        self.with(|o| o.log_p(mol))
    }

    fn molecular_weight(&self, mol: &O::Molecule) -> OracleResult<f64> {
        self.with(|o| o.molecular_weight(mol))
    }

    fn polar_surface_area(&self, mol: &O::Molecule) -> OracleResult<f64> {
        self.with(|o| o.polar_surface_area(mol))
    }

    fn h_bond_donors(&self, mol: &O::Molecule) -> OracleResult<u32> {
        self.with(|o| o.h_bond_donors(mol))
    }

    fn h_bond_acceptors(&self, mol: &O::Molecule) -> OracleResult<u32> {
        self.with(|o| o.h_bond_acceptors(mol))
    }

    fn violation_count(&self, mol: &O::Molecule) -> OracleResult<u32> {
        self.with(|o| o.violation_count(mol))
    }

    fn aromatic_ring_count(&self, mol: &O::Molecule) -> OracleResult<u32> {
        self.with(|o| o.aromatic_ring_count(mol))
    }

    fn rotatable_bond_count(&self, mol: &O::Molecule) -> OracleResult<u32> {
        self.with(|o| o.rotatable_bond_count(mol))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;

    /// Descriptor table keyed by SMILES text. Unknown text does not parse.
    #[derive(Debug, Clone, Default)]
    pub struct TableOracle {
        pub rows: HashMap<String, Descriptors>,
        pub sa_available: bool,
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct Descriptors {
        pub qed: f64,
        pub sa: f64,
        pub logp: f64,
        pub mw: f64,
        pub tpsa: f64,
        pub hbd: u32,
        pub hba: u32,
        pub aromatic_rings: u32,
        pub rotatable_bonds: u32,
    }

    impl TableOracle {
        pub fn with(mut self, smiles: &str, d: Descriptors) -> Self {
            self.rows.insert(smiles.to_string(), d);
            self
        }
    }

    impl PropertyOracle for TableOracle {
        type Molecule = Descriptors;

        fn name(&self) -> &'static str {
            "table"
        }

        fn parse(&self, smiles: &str) -> OracleResult<Option<Descriptors>> {
            Ok(self.rows.get(smiles).copied())
        }

        fn drug_likeness(&self, mol: &Descriptors) -> OracleResult<f64> {
            Ok(mol.qed)
        }

        fn synthetic_accessibility(&self, mol: &Descriptors) -> OracleResult<Option<f64>> {
            Ok(self.sa_available.then_some(mol.sa))
        }

        fn log_p(&self, mol: &Descriptors) -> OracleResult<f64> {
            Ok(mol.logp)
        }

        fn molecular_weight(&self, mol: &Descriptors) -> OracleResult<f64> {
            Ok(mol.mw)
        }

        fn polar_surface_area(&self, mol: &Descriptors) -> OracleResult<f64> {
            Ok(mol.tpsa)
        }

        fn h_bond_donors(&self, mol: &Descriptors) -> OracleResult<u32> {
            Ok(mol.hbd)
        }

        fn h_bond_acceptors(&self, mol: &Descriptors) -> OracleResult<u32> {
            Ok(mol.hba)
        }

        fn aromatic_ring_count(&self, mol: &Descriptors) -> OracleResult<u32> {
            Ok(mol.aromatic_rings)
        }

        fn rotatable_bond_count(&self, mol: &Descriptors) -> OracleResult<u32> {
            Ok(mol.rotatable_bonds)
        }
    }
}
