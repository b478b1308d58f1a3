use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::agent::ToolExecutor;
use crate::llm::tools::{ToolCall, ToolDefinition};
use crate::ocl::OclClient;
use crate::ocl::matching::{judge_mapping, parse_match_response};
use crate::ocl::params::{ExpansionQuery, MAX_LIMIT, MatchRequest};
use crate::ocl::servers::KNOWN_SERVERS;
use crate::toolbox::{ToolError, ToolKind, definition};

const DEFAULT_SUGGESTIONS: u32 = 5;
const DEFAULT_THRESHOLD: f64 = 0.8;

#[derive(Debug, Deserialize)]
struct SuggestArgs {
    #[serde(default)]
    term: Option<String>,
    #[serde(default)]
    terms: Vec<String>,
    target_repo_url: String,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ValidateArgs {
    term: String,
    target_concept: String,
    target_repo_url: String,
    #[serde(default)]
    threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BulkArgs {
    terms: Vec<String>,
    target_repo_url: String,
    #[serde(default = "enabled")]
    semantic: bool,
}

fn enabled() -> bool {
    true
}

/// Executes tool calls against one terminology server.
#[derive(Debug, Clone)]
pub struct OclToolbox {
    client: OclClient,
    enabled: BTreeSet<ToolKind>,
}

impl OclToolbox {
    /// Toolbox with every tool enabled.
    pub fn new(client: OclClient) -> Self {
        Self {
            client,
            enabled: ToolKind::ALL.into_iter().collect(),
        }
    }

    /// Restricts the toolbox to `tools`.
    pub fn with_enabled(mut self, tools: impl IntoIterator<Item = ToolKind>) -> Self {
        self.enabled = tools.into_iter().collect();
        self
    }

    pub fn enabled(&self) -> impl Iterator<Item = ToolKind> + '_ {
        self.enabled.iter().copied()
    }

    pub fn client(&self) -> &OclClient {
        &self.client
    }

    async fn dispatch(&self, kind: ToolKind, args: Value) -> Result<Value, ToolError> {
        let client = &self.client;
        let value = match kind {
            ToolKind::ListServers => {
                let active = client.base_url().as_str();
                json!({
                    "active": active,
                    "authenticated": client.has_token(),
                    "servers": KNOWN_SERVERS,
                })
            }
            ToolKind::SearchOwners => client.search_owners(&decode(kind, args)?).await?,
            ToolKind::SearchRepositories => {
                client.search_repositories(&decode(kind, args)?).await?
            }
            ToolKind::GetRepositoryVersions => {
                client.repository_versions(&decode(kind, args)?).await?
            }
            ToolKind::SearchConcepts => client.search_concepts(&decode(kind, args)?).await?,
            ToolKind::SearchMappings => client.search_mappings(&decode(kind, args)?).await?,
            ToolKind::MatchConcepts => {
                let request: MatchRequest = decode(kind, args)?;
                let body = client.match_concepts(&request).await?;
                json!(parse_match_response(&body, &request.submitted_terms()))
            }
            ToolKind::AddOrUpdateConceptTranslations => {
                client.upsert_concept_names(&decode(kind, args)?).await?
            }
            ToolKind::ListExpansions => {
                let mut query: ExpansionQuery = decode(kind, args)?;
                query.expansion = None;
                client.expansions(&query).await?
            }
            ToolKind::GetExpansion => {
                let query: ExpansionQuery = decode(kind, args)?;
                if query.expansion.as_deref().is_none_or(|id| id.trim().is_empty()) {
                    return Err(invalid(kind, "expansion is required"));
                }
                client.expansions(&query).await?
            }
            ToolKind::CreateMapping => client.create_mapping(&decode(kind, args)?).await?,
            ToolKind::Cascade => client.cascade(&decode(kind, args)?).await?,
            ToolKind::SuggestMappings => self.suggest(decode(kind, args)?).await?,
            ToolKind::ValidateMapping => self.validate(decode(kind, args)?).await?,
            ToolKind::BulkMapTerms => self.bulk_map(kind, decode(kind, args)?).await?,
            ToolKind::SaveRepository => client.save_repository(&decode(kind, args)?).await?,
        };
        Ok(value)
    }

    async fn suggest(&self, args: SuggestArgs) -> Result<Value, ToolError> {
        let mut terms = args.terms;
        if let Some(term) = args.term {
            terms.insert(0, term);
        }
        let request = MatchRequest {
            terms,
            target_repo_url: args.target_repo_url,
            semantic: true,
            limit: Some(args.limit.unwrap_or(DEFAULT_SUGGESTIONS)),
        };
        let body = self.client.match_concepts(&request).await?;
        let rows = parse_match_response(&body, &request.submitted_terms());
        Ok(json!({ "target_repo_url": request.target_repo_url, "suggestions": rows }))
    }

    async fn validate(&self, args: ValidateArgs) -> Result<Value, ToolError> {
        let request = MatchRequest {
            terms: vec![args.term.clone()],
            target_repo_url: args.target_repo_url,
            semantic: true,
            limit: Some(10),
        };
        let body = self.client.match_concepts(&request).await?;
        let rows = parse_match_response(&body, &request.submitted_terms());
        let threshold = args.threshold.unwrap_or(DEFAULT_THRESHOLD);
        let verdict = match rows.first() {
            Some(row) => json!(judge_mapping(row, args.target_concept.trim(), threshold)),
            None => json!({
                "term": args.term,
                "target": args.target_concept,
                "valid": false,
                "reason": "no candidates were returned for the term",
            }),
        };
        Ok(verdict)
    }

    async fn bulk_map(&self, kind: ToolKind, args: BulkArgs) -> Result<Value, ToolError> {
        if args.terms.len() > MAX_LIMIT as usize {
            return Err(invalid(
                kind,
                &format!("at most {MAX_LIMIT} terms per run, got {}", args.terms.len()),
            ));
        }
        let request = MatchRequest {
            terms: args.terms,
            target_repo_url: args.target_repo_url,
            semantic: args.semantic,
            limit: Some(3),
        };
        let body = self.client.match_concepts(&request).await?;
        let rows = parse_match_response(&body, &request.submitted_terms());
        let matched = rows.iter().filter(|row| row.best().is_some()).count();
        let results = rows
            .iter()
            .map(|row| {
                json!({
                    "term": row.term,
                    "best_match": row.best(),
                    "alternatives": row.candidates.len().saturating_sub(1),
                })
            })
            .collect::<Vec<_>>();
        Ok(json!({
            "target_repo_url": request.target_repo_url,
            "matched": matched,
            "unmatched": rows.len() - matched,
            "results": results,
        }))
    }
}

#[async_trait]
impl ToolExecutor for OclToolbox {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.enabled.iter().map(|kind| definition(*kind)).collect()
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let kind: ToolKind = call.name.parse()?;
        if !self.enabled.contains(&kind) {
            return Err(ToolError::Disabled(kind));
        }
        self.dispatch(kind, call.args_object()).await
    }
}

fn decode<T: DeserializeOwned>(kind: ToolKind, args: Value) -> Result<T, ToolError> {
    let args = match args {
        Value::String(raw) => {
            serde_json::from_str(&raw).map_err(|err| invalid(kind, &err.to_string()))?
        }
        other => other,
    };
    serde_json::from_value(args).map_err(|err| invalid(kind, &err.to_string()))
}

fn invalid(tool: ToolKind, message: &str) -> ToolError {
    ToolError::InvalidArguments {
        tool,
        message: message.to_string(),
    }
}
