use crate::{Result, ScoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    ThinkStart,
    ThinkEnd,
    AnswerStart,
    AnswerEnd,
}

impl TagKind {
    /// Scan order. Also the order the tags must appear in the response.
    pub const ALL: [TagKind; 4] = [
        TagKind::ThinkStart,
        TagKind::ThinkEnd,
        TagKind::AnswerStart,
        TagKind::AnswerEnd,
    ];

    pub fn literal(self) -> &'static str {
        match self {
            TagKind::ThinkStart => "<think>",
            TagKind::ThinkEnd => "</think>",
            TagKind::AnswerStart => "<answer>",
            TagKind::AnswerEnd => "</answer>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpan {
    pub kind: TagKind,
    pub offset: usize,
}

impl TagSpan {
    /// Byte offset just past the delimiter.
    pub fn end(&self) -> usize {
        self.offset + self.kind.literal().len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "tag", rename_all = "snake_case")]
pub enum RejectReason {
    Missing(TagKind),
    Duplicate(TagKind),
    WrongOrder,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Missing(_) => "missing_tag",
            RejectReason::Duplicate(_) => "duplicate_tag",
            RejectReason::WrongOrder => "wrong_order",
        }
    }
}

/// Structural verdict for a `<think>…</think><answer>…</answer>` response.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// `score` is the whole structural score of the response; nothing else is
    /// evaluated once a response is rejected.
    Rejected { score: f64, reason: RejectReason },
    /// Both blocks, trimmed. Only produced when every tag occurs exactly once and
    /// in order.
    Accepted { think: String, answer: String },
}

impl Extraction {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Extraction::Accepted { .. })
    }
}

/// Fixed rewards and penalties for the structural check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureRewards {
    /// Awarded per tag once all four are present exactly once.
    pub tag_present: f64,
    pub missing_or_duplicate: f64,
    pub order_correct: f64,
    pub order_incorrect: f64,
}

impl Default for StructureRewards {
    fn default() -> Self {
        Self {
            tag_present: 0.5,
            missing_or_duplicate: -2.0,
            order_correct: 1.0,
            order_incorrect: -3.0,
        }
    }
}

impl StructureRewards {
    /// Structural score of an accepted response.
    pub fn accepted_score(&self) -> f64 {
        self.tag_present * TagKind::ALL.len() as f64 + self.order_correct
    }

    pub fn wrong_order_score(&self) -> f64 {
        self.tag_present * TagKind::ALL.len() as f64 + self.order_incorrect
    }

    pub fn validate(&self) -> Result<()> {
        let all = [
            self.tag_present,
            self.missing_or_duplicate,
            self.order_correct,
            self.order_incorrect,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(ScoreError::InvalidConfig(
                "structure rewards must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Two-tier structural check: existence/uniqueness of each tag, then ordering,
/// then content extraction. Each tier short-circuits.
#[derive(Debug, Clone, Default)]
pub struct TagExtractor {
    rewards: StructureRewards,
}

impl TagExtractor {
    pub fn new(rewards: StructureRewards) -> Self {
        Self { rewards }
    }

    pub fn rewards(&self) -> &StructureRewards {
        &self.rewards
    }

    #[tracing::instrument(level = "trace", skip_all, fields(len = text.len()))]
    pub fn extract(&self, text: &str) -> Extraction {
        // ASCII lowering keeps byte offsets aligned with `text`.
        let lowered = text.to_ascii_lowercase();

        let mut spans = Vec::with_capacity(TagKind::ALL.len());
        for kind in TagKind::ALL {
            match locate_unique(&lowered, kind.literal()) {
                Ok(offset) => spans.push(TagSpan { kind, offset }),
                Err(found) => {
                    let reason = if found == 0 {
                        RejectReason::Missing(kind)
                    } else {
                        RejectReason::Duplicate(kind)
                    };
                    return Extraction::Rejected {
                        score: self.rewards.missing_or_duplicate,
                        reason,
                    };
                }
            }
        }

        if !spans.windows(2).all(|w| w[0].offset < w[1].offset) {
            return Extraction::Rejected {
                score: self.rewards.wrong_order_score(),
                reason: RejectReason::WrongOrder,
            };
        }

        let think = text[spans[0].end()..spans[1].offset].trim().to_string();
        let answer = text[spans[2].end()..spans[3].offset].trim().to_string();
        Extraction::Accepted { think, answer }
    }
}

/// Trimmed inner text of the single `open … close` block in `text`.
///
/// Returns `None` unless each delimiter occurs exactly once (ASCII
/// case-insensitive) and `open` precedes `close`.
pub fn single_block<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let lowered = text.to_ascii_lowercase();
    let open_at = locate_unique(&lowered, &open.to_ascii_lowercase()).ok()?;
    let close_at = locate_unique(&lowered, &close.to_ascii_lowercase()).ok()?;
    let inner_start = open_at + open.len();
    if inner_start > close_at {
        return None;
    }
    Some(text[inner_start..close_at].trim())
}

/// Offset of the only non-overlapping occurrence of `needle`, or the number of
/// occurrences seen (0, or 2 once a duplicate is found).
fn locate_unique(haystack: &str, needle: &str) -> std::result::Result<usize, usize> {
    let mut hits = haystack.match_indices(needle).map(|(i, _)| i);
    let Some(first) = hits.next() else {
        return Err(0);
    };
    if hits.next().is_some() {
        return Err(2);
    }
    Ok(first)
}

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
