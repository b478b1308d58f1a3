//! Interpretation of `$match` responses.

use serde::Serialize;
use serde_json::Value;

/// One candidate concept returned for a term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub id: String,
    pub display_name: String,
    pub url: Option<String>,
    pub concept_class: Option<String>,
    pub score: Option<f64>,
}

/// Candidates for one input term, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRow {
    pub term: String,
    pub candidates: Vec<MatchCandidate>,
}

impl MatchRow {
    pub fn best(&self) -> Option<&MatchCandidate> {
        self.candidates.first()
    }
}

/// Outcome of checking a proposed mapping target against match results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingVerdict {
    pub term: String,
    pub target: String,
    pub valid: bool,
    /// 1-based position of the target among the candidates.
    pub rank: Option<usize>,
    pub score: Option<f64>,
    pub best_match: Option<MatchCandidate>,
    pub reason: String,
}

/// Parses the `$match` response: one `{row, results}` entry per submitted term.
pub fn parse_match_response(body: &Value, terms: &[String]) -> Vec<MatchRow> {
    let Some(entries) = body.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let term = entry["row"]["name"]
                .as_str()
                .map(str::to_string)
                .or_else(|| terms.get(index).cloned())
                .unwrap_or_default();
            let candidates = entry["results"]
                .as_array()
                .map(|results| results.iter().filter_map(parse_candidate).collect())
                .unwrap_or_default();
            MatchRow { term, candidates }
        })
        .collect()
}

fn parse_candidate(value: &Value) -> Option<MatchCandidate> {
    let id = value["id"].as_str()?.to_string();
    let display_name = value["display_name"]
        .as_str()
        .or_else(|| value["name"].as_str())
        .unwrap_or(&id)
        .to_string();
    let meta = &value["search_meta"];
    let score = meta["search_normalized_score"]
        .as_f64()
        .or_else(|| meta["search_score"].as_f64());
    Some(MatchCandidate {
        id,
        display_name,
        url: value["url"].as_str().map(str::to_string),
        concept_class: value["concept_class"].as_str().map(str::to_string),
        score,
    })
}

/// Decides whether `target` is an acceptable match for `row`.
///
/// The target is valid when it is the top candidate, or when it appears
/// anywhere in the candidates with a score of at least `threshold`.
pub fn judge_mapping(row: &MatchRow, target: &str, threshold: f64) -> MappingVerdict {
    let position = row
        .candidates
        .iter()
        .position(|candidate| candidate.id == target);
    let score = position.and_then(|index| row.candidates[index].score);
    let (valid, reason) = match position {
        None => (
            false,
            format!("'{target}' was not among the candidates for '{}'", row.term),
        ),
        Some(0) => (true, "proposed target is the best match".to_string()),
        Some(index) => match score {
            Some(score) if score >= threshold => (
                true,
                format!("ranked #{} with score {score:.2} (threshold {threshold:.2})", index + 1),
            ),
            _ => (
                false,
                format!("ranked #{} below the best match", index + 1),
            ),
        },
    };
    MappingVerdict {
        term: row.term.clone(),
        target: target.to_string(),
        valid,
        rank: position.map(|index| index + 1),
        score,
        best_match: row.best().cloned(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!([
            {
                "row": {"name": "fever"},
                "results": [
                    {
                        "id": "140238",
                        "display_name": "Fever",
                        "url": "/orgs/CIEL/sources/CIEL/concepts/140238/",
                        "concept_class": "Symptom",
                        "search_meta": {"search_normalized_score": 0.97}
                    },
                    {
                        "id": "5088",
                        "display_name": "Temperature",
                        "search_meta": {"search_score": 0.61}
                    }
                ]
            },
            {"results": []}
        ])
    }

    #[test]
    fn rows_fall_back_to_submitted_terms() {
        let rows = parse_match_response(&sample(), &["fever".to_string(), "xyz".to_string()]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].best().map(|c| c.id.as_str()), Some("140238"));
        assert_eq!(rows[0].candidates[1].score, Some(0.61));
        assert_eq!(rows[1].term, "xyz");
        assert!(rows[1].best().is_none());
    }

    #[test]
    fn non_array_response_yields_no_rows() {
        assert!(parse_match_response(&json!({"detail": "x"}), &[]).is_empty());
    }

    #[test]
    fn top_candidate_is_valid() {
        let rows = parse_match_response(&sample(), &[]);
        let verdict = judge_mapping(&rows[0], "140238", 0.8);
        assert!(verdict.valid);
        assert_eq!(verdict.rank, Some(1));
    }

    #[test]
    fn lower_ranked_target_needs_threshold() {
        let rows = parse_match_response(&sample(), &[]);
        assert!(!judge_mapping(&rows[0], "5088", 0.8).valid);
        assert!(judge_mapping(&rows[0], "5088", 0.5).valid);
    }

    #[test]
    fn missing_target_is_invalid_with_best_match_reported() {
        let rows = parse_match_response(&sample(), &[]);
        let verdict = judge_mapping(&rows[0], "999", 0.5);
        assert!(!verdict.valid);
        assert_eq!(verdict.rank, None);
        assert_eq!(verdict.best_match.map(|c| c.id), Some("140238".to_string()));
    }
}
