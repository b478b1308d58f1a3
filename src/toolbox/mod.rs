//! The fixed set of terminology tools exposed to the model.

mod catalog;
mod executor;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::ocl::OclError;

pub use catalog::definition;
pub use executor::OclToolbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    ListServers,
    SearchOwners,
    SearchRepositories,
    GetRepositoryVersions,
    SearchConcepts,
    SearchMappings,
    MatchConcepts,
    AddOrUpdateConceptTranslations,
    ListExpansions,
    GetExpansion,
    CreateMapping,
    Cascade,
    SuggestMappings,
    ValidateMapping,
    BulkMapTerms,
    SaveRepository,
}

impl ToolKind {
    pub const ALL: [ToolKind; 16] = [
        Self::ListServers,
        Self::SearchOwners,
        Self::SearchRepositories,
        Self::GetRepositoryVersions,
        Self::SearchConcepts,
        Self::SearchMappings,
        Self::MatchConcepts,
        Self::AddOrUpdateConceptTranslations,
        Self::ListExpansions,
        Self::GetExpansion,
        Self::CreateMapping,
        Self::Cascade,
        Self::SuggestMappings,
        Self::ValidateMapping,
        Self::BulkMapTerms,
        Self::SaveRepository,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::ListServers => "list_servers",
            Self::SearchOwners => "search_owners",
            Self::SearchRepositories => "search_repositories",
            Self::GetRepositoryVersions => "get_repository_versions",
            Self::SearchConcepts => "search_concepts",
            Self::SearchMappings => "search_mappings",
            Self::MatchConcepts => "match_concepts",
            Self::AddOrUpdateConceptTranslations => "add_or_update_concept_translations",
            Self::ListExpansions => "list_expansions",
            Self::GetExpansion => "get_expansion",
            Self::CreateMapping => "create_mapping",
            Self::Cascade => "cascade",
            Self::SuggestMappings => "suggest_mappings",
            Self::ValidateMapping => "validate_mapping",
            Self::BulkMapTerms => "bulk_map_terms",
            Self::SaveRepository => "save_repository",
        }
    }

    /// Short label shown in the UI.
    pub fn title(self) -> &'static str {
        match self {
            Self::ListServers => "List servers",
            Self::SearchOwners => "Search owners",
            Self::SearchRepositories => "Search repositories",
            Self::GetRepositoryVersions => "Get repository versions",
            Self::SearchConcepts => "Search concepts",
            Self::SearchMappings => "Search mappings",
            Self::MatchConcepts => "Match concepts",
            Self::AddOrUpdateConceptTranslations => "Add or update translations",
            Self::ListExpansions => "List expansions",
            Self::GetExpansion => "Get expansion",
            Self::CreateMapping => "Create mapping",
            Self::Cascade => "Cascade",
            Self::SuggestMappings => "Suggest mappings",
            Self::ValidateMapping => "Validate mapping",
            Self::BulkMapTerms => "Bulk map terms",
            Self::SaveRepository => "Save repository",
        }
    }

    /// One-line summary shown in the UI.
    pub fn summary(self) -> &'static str {
        match self {
            Self::ListServers => "Show available OCL server configurations.",
            Self::SearchOwners => "Find users and organizations that publish terminology.",
            Self::SearchRepositories => "Discover sources and collections by query or owner.",
            Self::GetRepositoryVersions => "List available versions for a repository.",
            Self::SearchConcepts => "Find concepts by query, repository, or filters.",
            Self::SearchMappings => "Find mappings between concepts.",
            Self::MatchConcepts => "Suggest best matches for free text terms.",
            Self::AddOrUpdateConceptTranslations => {
                "Create or update translated names for concepts."
            }
            Self::ListExpansions => "List expansions for a collection version.",
            Self::GetExpansion => "Fetch a specific expansion details.",
            Self::CreateMapping => "Create a mapping between concepts.",
            Self::Cascade => "Explore concept relationships with cascade operations.",
            Self::SuggestMappings => "Get AI-powered mapping suggestions.",
            Self::ValidateMapping => "Validate a proposed mapping using semantic similarity.",
            Self::BulkMapTerms => "Process multiple terms in a single mapping run.",
            Self::SaveRepository => "Save or update repository metadata.",
        }
    }

    /// Whether the tool changes content on the server.
    pub fn writes(self) -> bool {
        matches!(
            self,
            Self::AddOrUpdateConceptTranslations | Self::CreateMapping | Self::SaveRepository
        )
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ToolKind {
    type Err = ToolError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == name.trim())
            .ok_or_else(|| ToolError::Unknown(name.to_string()))
    }
}

/// Catalogue entry returned by `GET /api/tools` and `oclchat tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub writes: bool,
}

pub fn catalog() -> Vec<ToolInfo> {
    ToolKind::ALL
        .into_iter()
        .map(|kind| ToolInfo {
            id: kind.id(),
            name: kind.title(),
            description: kind.summary(),
            writes: kind.writes(),
        })
        .collect()
}

/// Parses tool ids, rejecting unknown names.
pub fn parse_tool_list<I, S>(names: I) -> Result<Vec<ToolKind>, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter(|name| !name.as_ref().trim().is_empty())
        .map(|name| name.as_ref().parse())
        .collect()
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    Unknown(String),
    #[error("tool '{0}' is disabled in the current settings")]
    Disabled(ToolKind),
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: ToolKind, message: String },
    #[error(transparent)]
    Ocl(#[from] OclError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_from_str() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.id().parse::<ToolKind>().unwrap(), kind);
        }
    }

    #[test]
    fn catalog_lists_every_tool_once() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 16);
        assert_eq!(catalog[0].id, "list_servers");
        assert_eq!(catalog.iter().filter(|tool| tool.writes).count(), 3);
    }

    #[test]
    fn tool_lists_reject_unknown_names() {
        let parsed = parse_tool_list(["search_concepts", " ", "cascade"]).unwrap();
        assert_eq!(parsed, vec![ToolKind::SearchConcepts, ToolKind::Cascade]);

        let err = parse_tool_list(["delete_everything"]).unwrap_err();
        assert_eq!(err.to_string(), "unknown tool 'delete_everything'");
    }
}
