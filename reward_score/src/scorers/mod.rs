//! Domain scorers. Each returns a [`crate::ScoreBreakdown`] whose component
//! names come from [`components`].

pub mod logic;
pub mod molecule;
pub mod rule;

/// Breakdown component names shared by the scorers and reward diagnostics.
pub mod components {
    pub const FORMAT: &str = "format";
    pub const THINK_CONTENT: &str = "think_content";
    pub const ANSWER_CONTENT: &str = "answer_content";

    pub const LENGTH: &str = "length";
    pub const KEYWORD_QUALITY: &str = "keyword_quality";
    pub const ANSWER_MATCH: &str = "answer_match";

    pub const VALIDITY: &str = "validity";
    pub const QED: &str = "qed";
    pub const SA: &str = "sa";
    pub const LOGP: &str = "logp";
    pub const MW: &str = "mw";
    pub const TPSA: &str = "tpsa";
    pub const LIPINSKI: &str = "lipinski";
    pub const DOMAIN_SPECIFIC: &str = "domain_specific";
}
