use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};
use crate::models::fixture::Fixture;

/// Identifies one group table: `{competition}_{section}_G{group}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueTable {
    pub competition: String,
    pub section: String,
    pub group: String,
}

impl LeagueTable {
    pub fn new(competition: impl Into<String>, section: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            competition: competition.into(),
            section: section.into(),
            group: group.into(),
        }
    }

    pub fn prefix(&self) -> String {
        format!("{}_{}_G{}_P", self.competition, self.section, self.group)
    }

    /// Placeholder for the zero-based table `index`; positions count from 1.
    /// `None` when the position does not fit.
    pub fn source_tag(&self, index: usize) -> Option<String> {
        let position = index.checked_add(1)?;
        Some(format!("{}{}", self.prefix(), position))
    }
}

/// One submitted table position. `team` holds the reason when the submitted
/// value is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub index: usize,
    pub team: Result<String, String>,
}

/// Reads a submitted table.
///
/// Accepts either an array of team names in finishing order or an object
/// keyed by zero-based position. Non-numeric keys and `null` entries are
/// ignored so a partial table can be sent. Positions come back in ascending
/// order.
pub fn parse_submission(body: &Value) -> AppResult<Vec<Placement>> {
    let mut entries: Vec<(usize, &Value)> = match body {
        Value::Array(teams) => teams.iter().enumerate().collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, value)| key.trim().parse::<usize>().ok().map(|index| (index, value)))
            .collect(),
        _ => {
            return Err(AppError::bad_request(
                "league table must be an array or an object keyed by position",
            ))
        }
    };
    entries.sort_by_key(|(index, _)| *index);

    Ok(entries
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(index, value)| Placement {
            index,
            team: match value {
                Value::String(team) if !team.trim().is_empty() => Ok(team.clone()),
                Value::String(_) => Err("team name is empty".to_string()),
                other => Err(format!("team name must be text, got {other}")),
            },
        })
        .collect())
}

/// What happened to one table position.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlacementOutcome {
    #[schema(example = "U11_A_G2_P1")]
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    pub updated: Vec<Fixture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlacementOutcome {
    pub(crate) fn resolved(source: String, team: String, updated: Vec<Fixture>) -> Self {
        Self {
            source,
            team: Some(team),
            updated,
            error: None,
        }
    }

    pub(crate) fn failed(source: String, team: Option<String>, error: String) -> Self {
        Self {
            source,
            team,
            updated: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableReport {
    #[schema(example = "U11_A_G2_P")]
    pub prefix: String,
    pub placements: Vec<PlacementOutcome>,
}

impl TableReport {
    /// Every fixture changed by the submission.
    pub fn updated(&self) -> impl Iterator<Item = &Fixture> {
        self.placements.iter().flat_map(|outcome| outcome.updated.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_tags() {
        let table = LeagueTable::new("U11", "B", "2");
        assert_eq!(table.prefix(), "U11_B_G2_P");
        assert_eq!(table.source_tag(0).as_deref(), Some("U11_B_G2_P1"));
        assert_eq!(table.source_tag(10).as_deref(), Some("U11_B_G2_P11"));
        assert_eq!(table.source_tag(usize::MAX), None);
    }

    #[test]
    fn test_parse_keeps_largest_position_key() {
        let mut body = json!({"0": "B"});
        body[usize::MAX.to_string().as_str()] = json!("A");
        let placements = parse_submission(&body).unwrap();
        let indices: Vec<_> = placements.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, usize::MAX]);
    }

    #[test]
    fn test_parse_array() {
        let placements = parse_submission(&json!(["A", "B", "C"])).unwrap();
        let indices: Vec<_> = placements.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(placements[2].team, Ok("C".to_string()));
    }

    #[test]
    fn test_parse_object_orders_numerically_and_skips_other_keys() {
        let placements = parse_submission(&json!({"10": "K", "2": "C", "0": "A", "name": "ignored"})).unwrap();
        let indices: Vec<_> = placements.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 2, 10]);
    }

    #[test]
    fn test_parse_flags_unusable_values() {
        let placements = parse_submission(&json!({"0": 3, "1": "", "2": null})).unwrap();
        assert_eq!(placements.len(), 2);
        assert!(placements[0].team.is_err());
        assert!(placements[1].team.is_err());
    }

    #[test]
    fn test_parse_rejects_scalars() {
        assert!(parse_submission(&json!("A")).is_err());
    }
}
