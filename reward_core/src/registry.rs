//! Data-source → scorer registry.
//!
//! Lookup accepts canonical scorer ids (e.g. "logic_puzzle") and aliases
//! (e.g. "kk", "knights_knaves"), after trimming and ASCII lowercasing.

use crate::{Error, Result};
use reward_score::{
    LogicPuzzleScorer, MoleculeScorer, PropertyOracle, RuleScorer, Scorer,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Canonical scorer ids
pub const RULE: &str = "rule";
pub const LOGIC_PUZZLE: &str = "logic_puzzle";
pub const MOLECULE: &str = "molecule";

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("format", RULE),
    ("kk", LOGIC_PUZZLE),
    ("newkk", LOGIC_PUZZLE),
    ("logic_rl", LOGIC_PUZZLE),
    ("knights_knaves", LOGIC_PUZZLE),
    ("chem", MOLECULE),
    ("chemistry", MOLECULE),
    ("smiles", MOLECULE),
];

#[derive(Default, Clone)]
pub struct ScorerRegistry {
    scorers: HashMap<String, Arc<dyn Scorer>>,
    aliases: HashMap<String, String>,
}

impl std::fmt::Debug for ScorerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerRegistry")
            .field("ids", &self.ids())
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl ScorerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the rule, logic-puzzle and molecule scorers at their
    /// default constants, plus the built-in aliases.
    #[tracing::instrument(level = "debug", skip_all, fields(oracle = oracle.name()))]
    pub fn with_builtin<O>(oracle: O) -> Result<Self>
    where
        O: PropertyOracle + Send + Sync + 'static,
    {
        let mut reg = Self::new();
        reg.register(RULE, Arc::new(RuleScorer::default()))?;
        reg.register(LOGIC_PUZZLE, Arc::new(LogicPuzzleScorer::default()))?;
        reg.register(MOLECULE, Arc::new(MoleculeScorer::new(oracle)))?;
        for (alias, id) in BUILTIN_ALIASES {
            reg.alias(alias, id)?;
        }
        Ok(reg)
    }

    pub fn register(&mut self, id: &str, scorer: Arc<dyn Scorer>) -> Result<()> {
        let id = normalize(id);
        if id.is_empty() {
            return Err(Error::InvalidConfig("scorer id is empty".to_string()));
        }
        if self.scorers.contains_key(&id) || self.aliases.contains_key(&id) {
            return Err(Error::Conflict(format!("scorer already registered: {id}")));
        }
        tracing::debug!(id = %id, scorer = scorer.name(), "registered scorer");
        self.scorers.insert(id, scorer);
        Ok(())
    }

    /// Points `alias` at an already registered canonical id.
    pub fn alias(&mut self, alias: &str, id: &str) -> Result<()> {
        let alias = normalize(alias);
        let id = normalize(id);
        if !self.scorers.contains_key(&id) {
            return Err(Error::InvalidConfig(format!(
                "alias {alias} targets unknown scorer {id}"
            )));
        }
        if self.scorers.contains_key(&alias) || self.aliases.contains_key(&alias) {
            return Err(Error::Conflict(format!("alias already registered: {alias}")));
        }
        self.aliases.insert(alias, id);
        Ok(())
    }

    pub fn get(&self, data_source: &str) -> Option<Arc<dyn Scorer>> {
        let key = normalize(data_source);
        if let Some(s) = self.scorers.get(&key) {
            return Some(Arc::clone(s));
        }
        self.aliases
            .get(&key)
            .and_then(|id| self.scorers.get(id))
            .map(Arc::clone)
    }

    /// Resolves a data source to its canonical scorer id.
    pub fn resolve(&self, data_source: &str) -> Option<&str> {
        let key = normalize(data_source);
        if let Some((id, _)) = self.scorers.get_key_value(&key) {
            return Some(id.as_str());
        }
        self.aliases.get(&key).map(String::as_str)
    }

    /// Canonical ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.scorers
            .keys()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }
}

fn normalize(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}
