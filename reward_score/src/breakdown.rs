use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub value: f64,
}

/// Named, additive decomposition of a sample's reward, in the order the scorer
/// produced it. The total is the sum of the components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    components: Vec<Component>,
}

impl ScoreBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(name: impl Into<String>, value: f64) -> Self {
        let mut out = Self::new();
        out.push(name, value);
        out
    }

    /// Appends a component. Pushing an existing name adds to it in place.
    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.components.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.value += value,
            None => self.components.push(Component { name, value }),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value)
    }

    pub fn total(&self) -> f64 {
        self.components.iter().map(|c| c.value).sum()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl std::fmt::Display for ScoreBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in &self.components {
            write!(f, "{}={:.2}, ", c.name, c.value)?;
        }
        write!(f, "total={:.2}", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_sums() {
        let b = ScoreBreakdown::new()
            .with("format", 1.0)
            .with("validity", 0.5)
            .with("qed", 0.25);
        let names: Vec<&str> = b.components().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["format", "validity", "qed"]);
        assert_eq!(b.total(), 1.75);
        assert_eq!(b.get("validity"), Some(0.5));
        assert_eq!(b.get("sa"), None);
    }

    #[test]
    fn repeated_name_accumulates() {
        let mut b = ScoreBreakdown::single("keyword_quality", 1.0);
        b.push("keyword_quality", 1.0);
        assert_eq!(b.len(), 1);
        assert_eq!(b.get("keyword_quality"), Some(2.0));
    }

    #[test]
    fn display_lists_components_then_total() {
        let b = ScoreBreakdown::single("format", -2.0);
        assert_eq!(b.to_string(), "format=-2.00, total=-2.00");
    }
}
