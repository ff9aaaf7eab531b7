use crate::{Result, ScoreError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// `<name> is a <knight|knave>`, searched once per line.
static ROLE_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]+)\b\s+is\s+a\s+\b(knight|knave)\b")
        .unwrap_or_else(|e| unreachable!("static role pattern: {e}"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundTruthKind {
    Empty,
    RoleMap,
    Unused,
}

/// Domain-shaped ground truth, built once per sample at batch ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundTruth {
    Empty,
    /// Lowercased entity name -> lowercased role.
    RoleMap(BTreeMap<String, String>),
    Unused,
}

impl GroundTruth {
    pub fn kind(&self) -> GroundTruthKind {
        match self {
            GroundTruth::Empty => GroundTruthKind::Empty,
            GroundTruth::RoleMap(_) => GroundTruthKind::RoleMap,
            GroundTruth::Unused => GroundTruthKind::Unused,
        }
    }

    /// Roles for a logic puzzle; `Empty` reads as an empty map.
    pub fn roles(&self) -> Option<&BTreeMap<String, String>> {
        static NONE: BTreeMap<String, String> = BTreeMap::new();
        match self {
            GroundTruth::RoleMap(m) => Some(m),
            GroundTruth::Empty => Some(&NONE),
            GroundTruth::Unused => None,
        }
    }

    /// Builds the ground truth a scorer of `kind` expects from the upstream
    /// `reward_model.ground_truth` payload.
    ///
    /// For [`GroundTruthKind::RoleMap`] the payload may be `null`, a string of
    /// solution lines, `{"solution_text_format": "<lines>"}`, or
    /// `{"roles": {"<name>": "<role>"}}`. Other shapes are rejected.
    #[tracing::instrument(level = "trace", skip(payload))]
    pub fn from_payload(kind: GroundTruthKind, payload: &serde_json::Value) -> Result<Self> {
        match kind {
            GroundTruthKind::Empty => Ok(GroundTruth::Empty),
            GroundTruthKind::Unused => Ok(GroundTruth::Unused),
            GroundTruthKind::RoleMap => role_map_from_payload(payload),
        }
    }

    /// Parses lines such as `(1) Lily is a knave` into `{"lily": "knave"}`.
    /// Lines without an assignment are skipped; a later line for the same name
    /// overwrites an earlier one.
    pub fn parse_role_assignments(text: &str) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for line in text.lines() {
            if let Some(caps) = ROLE_ASSIGNMENT.captures(line) {
                out.insert(caps[1].to_lowercase(), caps[2].to_lowercase());
            }
        }
        out
    }
}

fn role_map_from_payload(payload: &serde_json::Value) -> Result<GroundTruth> {
    use serde_json::Value;

    let roles = match payload {
        Value::Null => return Ok(GroundTruth::Empty),
        Value::String(s) => GroundTruth::parse_role_assignments(s),
        Value::Object(obj) => {
            if let Some(v) = obj.get("roles") {
                let Value::Object(roles) = v else {
                    return Err(ScoreError::MalformedGroundTruth(
                        "`roles` must be an object of name -> role".to_string(),
                    ));
                };
                let mut out = BTreeMap::new();
                for (name, role) in roles {
                    let Some(role) = role.as_str() else {
                        return Err(ScoreError::MalformedGroundTruth(format!(
                            "role for {name:?} must be a string"
                        )));
                    };
                    let (name, role) = (name.trim(), role.trim());
                    if name.is_empty() || role.is_empty() {
                        return Err(ScoreError::MalformedGroundTruth(format!(
                            "blank entity or role in `roles`: {name:?} -> {role:?}"
                        )));
                    }
                    out.insert(name.to_lowercase(), role.to_lowercase());
                }
                out
            } else {
                match obj.get("solution_text_format") {
                    None | Some(Value::Null) => BTreeMap::new(),
                    Some(Value::String(s)) => GroundTruth::parse_role_assignments(s),
                    Some(other) => {
                        return Err(ScoreError::MalformedGroundTruth(format!(
                            "`solution_text_format` must be a string, got {other}"
                        )));
                    }
                }
            }
        }
        other => {
            return Err(ScoreError::MalformedGroundTruth(format!(
                "expected object or string for role map, got {other}"
            )));
        }
    };

    if roles.is_empty() {
        return Ok(GroundTruth::Empty);
    }
    Ok(GroundTruth::RoleMap(roles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numbered_solution_lines() {
        let roles = GroundTruth::parse_role_assignments(
            "(1) Lily is a knave\n(2) Matthew is a knight\nnoise line\n(3) RILEY IS A KNIGHT",
        );
        assert_eq!(roles.len(), 3);
        assert_eq!(roles["lily"], "knave");
        assert_eq!(roles["matthew"], "knight");
        assert_eq!(roles["riley"], "knight");
    }

    #[test]
    fn role_map_from_solution_text_object() {
        let gt = GroundTruth::from_payload(
            GroundTruthKind::RoleMap,
            &json!({"solution_text_format": "(1) Zoey is a knight"}),
        )
        .unwrap();
        let roles = gt.roles().unwrap();
        assert_eq!(roles.get("zoey").map(String::as_str), Some("knight"));
    }

    #[test]
    fn role_map_from_explicit_roles() {
        let gt = GroundTruth::from_payload(
            GroundTruthKind::RoleMap,
            &json!({"roles": {"Ava": "Knave"}}),
        )
        .unwrap();
        assert_eq!(gt.kind(), GroundTruthKind::RoleMap);
        assert_eq!(gt.roles().unwrap()["ava"], "knave");
    }

    #[test]
    fn absent_solution_is_empty() {
        let gt = GroundTruth::from_payload(GroundTruthKind::RoleMap, &json!({})).unwrap();
        assert_eq!(gt, GroundTruth::Empty);
        let gt = GroundTruth::from_payload(GroundTruthKind::RoleMap, &json!(null)).unwrap();
        assert_eq!(gt, GroundTruth::Empty);
        assert!(gt.roles().unwrap().is_empty());
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for bad in [
            json!(42),
            json!([1, 2]),
            json!({"solution_text_format": 7}),
            json!({"roles": ["ava"]}),
            json!({"roles": {"ava": 1}}),
            json!({"roles": {"  ": "knight"}}),
            json!({"roles": {"ava": " "}}),
        ] {
            let err = GroundTruth::from_payload(GroundTruthKind::RoleMap, &bad).unwrap_err();
            assert!(matches!(err, ScoreError::MalformedGroundTruth(_)), "{bad}");
        }
    }

    #[test]
    fn unused_kind_ignores_payload() {
        let gt = GroundTruth::from_payload(GroundTruthKind::Unused, &json!(42)).unwrap();
        assert_eq!(gt, GroundTruth::Unused);
        assert!(gt.roles().is_none());
    }
}
