//! Typed request parameters for terminology API operations.
//!
//! Every struct deserializes from the JSON arguments a model sends with a
//! tool call, so field names follow the tool schemas in [`crate::toolbox`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ocl::error::OclError;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerType {
    #[default]
    #[serde(rename = "orgs", alias = "org", alias = "organization", alias = "organizations")]
    Orgs,
    #[serde(rename = "users", alias = "user")]
    Users,
}

impl OwnerType {
    pub fn segment(self) -> &'static str {
        match self {
            Self::Orgs => "orgs",
            Self::Users => "users",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepoType {
    #[default]
    #[serde(rename = "sources", alias = "source")]
    Sources,
    #[serde(rename = "collections", alias = "collection")]
    Collections,
}

impl RepoType {
    pub fn segment(self) -> &'static str {
        match self {
            Self::Sources => "sources",
            Self::Collections => "collections",
        }
    }
}

/// Clamps a requested page size into `1..=MAX_LIMIT`.
pub fn page_size(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Identifies one repository, optionally pinned to a version.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoRef {
    #[serde(default)]
    pub owner_type: OwnerType,
    pub owner: String,
    #[serde(default)]
    pub repo_type: RepoType,
    pub repo: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl RepoRef {
    /// Path segments up to and including the version, if any.
    pub fn segments(&self) -> Vec<String> {
        let mut segments = vec![
            self.owner_type.segment().to_string(),
            self.owner.clone(),
            self.repo_type.segment().to_string(),
            self.repo.clone(),
        ];
        if let Some(version) = self.version.as_deref().filter(|v| !v.trim().is_empty()) {
            segments.push(version.to_string());
        }
        segments
    }

    /// Relative URL in the form the `$match` endpoint expects.
    pub fn relative_url(&self) -> String {
        format!("/{}/", self.segments().join("/"))
    }
}

/// Optional repository scope: both `owner` and `repo` must be set to apply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoScope {
    #[serde(default)]
    pub owner_type: OwnerType,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo_type: RepoType,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl RepoScope {
    pub fn as_repo(&self) -> Option<RepoRef> {
        let owner = self.owner.as_deref().filter(|v| !v.trim().is_empty())?;
        let repo = self.repo.as_deref().filter(|v| !v.trim().is_empty())?;
        Some(RepoRef {
            owner_type: self.owner_type,
            owner: owner.to_string(),
            repo_type: self.repo_type,
            repo: repo.to_string(),
            version: self.version.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnerSearch {
    #[serde(default)]
    pub q: Option<String>,
    /// Restricts the search to organizations or users; both when unset.
    #[serde(default)]
    pub owner_type: Option<OwnerType>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositorySearch {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub owner_type: OwnerType,
    /// Sources or collections; both when unset.
    #[serde(default)]
    pub repo_type: Option<RepoType>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionsQuery {
    #[serde(flatten)]
    pub repo: RepoRef,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptSearch {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(flatten)]
    pub scope: RepoScope,
    #[serde(default)]
    pub concept_class: Option<String>,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub include_retired: bool,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingSearch {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(flatten)]
    pub scope: RepoScope,
    #[serde(default)]
    pub from_concept: Option<String>,
    #[serde(default)]
    pub to_concept: Option<String>,
    #[serde(default)]
    pub from_source: Option<String>,
    #[serde(default)]
    pub to_source: Option<String>,
    #[serde(default)]
    pub map_type: Option<String>,
    #[serde(default)]
    pub include_retired: bool,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
}

/// Free-text terms matched against one target repository.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRequest {
    pub terms: Vec<String>,
    pub target_repo_url: String,
    #[serde(default)]
    pub semantic: bool,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl MatchRequest {
    pub fn validate(&self) -> Result<(), OclError> {
        if self.terms.iter().all(|term| term.trim().is_empty()) {
            return Err(OclError::InvalidArgument(
                "at least one non-empty term is required".to_string(),
            ));
        }
        if self.target_repo_url.trim().is_empty() {
            return Err(OclError::InvalidArgument(
                "target_repo_url is required, e.g. /orgs/CIEL/sources/CIEL/".to_string(),
            ));
        }
        Ok(())
    }

    /// Trimmed non-blank terms, in the order they are sent as rows.
    pub fn submitted_terms(&self) -> Vec<String> {
        self.terms
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn body(&self) -> Value {
        let rows = self
            .submitted_terms()
            .into_iter()
            .map(|term| serde_json::json!({ "name": term }))
            .collect::<Vec<_>>();
        serde_json::json!({
            "rows": rows,
            "target_repo_url": normalize_repo_url(&self.target_repo_url),
        })
    }
}

/// Ensures a repository URL is a rooted relative path ending in `/`.
pub fn normalize_repo_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    format!("/{trimmed}/")
}

/// One localized name to create, or update when `uuid` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptName {
    pub name: String,
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale_preferred: Option<bool>,
    #[serde(default, skip_serializing)]
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationUpdate {
    #[serde(default)]
    pub owner_type: OwnerType,
    pub owner: String,
    pub source: String,
    pub concept: String,
    pub names: Vec<ConceptName>,
}

impl TranslationUpdate {
    pub fn concept_segments(&self) -> Vec<String> {
        vec![
            self.owner_type.segment().to_string(),
            self.owner.clone(),
            "sources".to_string(),
            self.source.clone(),
            "concepts".to_string(),
            self.concept.clone(),
            "names".to_string(),
        ]
    }
}

/// A collection version whose expansions are listed or fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionQuery {
    #[serde(default)]
    pub owner_type: OwnerType,
    pub owner: String,
    pub collection: String,
    #[serde(default = "head_version")]
    pub version: String,
    #[serde(default)]
    pub expansion: Option<String>,
}

fn head_version() -> String {
    "HEAD".to_string()
}

impl ExpansionQuery {
    pub fn segments(&self) -> Vec<String> {
        let mut segments = vec![
            self.owner_type.segment().to_string(),
            self.owner.clone(),
            "collections".to_string(),
            self.collection.clone(),
            self.version.clone(),
            "expansions".to_string(),
        ];
        if let Some(expansion) = &self.expansion {
            segments.push(expansion.clone());
        }
        segments
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingDraft {
    #[serde(default)]
    pub owner_type: OwnerType,
    pub owner: String,
    pub source: String,
    pub map_type: String,
    pub from_concept_url: String,
    #[serde(default)]
    pub to_concept_url: Option<String>,
    #[serde(default)]
    pub to_source_url: Option<String>,
    #[serde(default)]
    pub to_concept_code: Option<String>,
    #[serde(default)]
    pub to_concept_name: Option<String>,
    #[serde(default)]
    pub extras: Option<Value>,
}

impl MappingDraft {
    pub fn body(&self) -> Result<Value, OclError> {
        let has_target_url = self.to_concept_url.as_deref().is_some_and(|v| !v.is_empty());
        let has_target_code = self.to_source_url.as_deref().is_some_and(|v| !v.is_empty())
            && self.to_concept_code.as_deref().is_some_and(|v| !v.is_empty());
        if !has_target_url && !has_target_code {
            return Err(OclError::InvalidArgument(
                "a mapping needs to_concept_url, or to_source_url with to_concept_code"
                    .to_string(),
            ));
        }

        let mut body = Map::new();
        body.insert("map_type".to_string(), Value::String(self.map_type.clone()));
        body.insert(
            "from_concept_url".to_string(),
            Value::String(self.from_concept_url.clone()),
        );
        let optional = [
            ("to_concept_url", &self.to_concept_url),
            ("to_source_url", &self.to_source_url),
            ("to_concept_code", &self.to_concept_code),
            ("to_concept_name", &self.to_concept_name),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                body.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
        if let Some(extras) = &self.extras {
            body.insert("extras".to_string(), extras.clone());
        }
        Ok(Value::Object(body))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CascadeQuery {
    #[serde(flatten)]
    pub repo: RepoRef,
    pub concept: String,
    /// Number of levels, or `*` for all.
    #[serde(default)]
    pub cascade_levels: Option<String>,
    /// `sourcetoconcepts` or `sourcemappings`.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub map_types: Option<String>,
    #[serde(default)]
    pub exclude_map_types: Option<String>,
    #[serde(default)]
    pub return_map_types: Option<String>,
    #[serde(default)]
    pub reverse: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    Create,
    Update,
    #[default]
    Upsert,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryDraft {
    #[serde(default)]
    pub owner_type: OwnerType,
    pub owner: String,
    #[serde(default)]
    pub repo_type: RepoType,
    pub id: String,
    #[serde(default)]
    pub mode: SaveMode,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_locale: Option<String>,
    #[serde(default)]
    pub supported_locales: Option<Vec<String>>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub public_access: Option<String>,
    #[serde(default)]
    pub extras: Option<Value>,
}

impl RepositoryDraft {
    pub fn collection_segments(&self) -> Vec<String> {
        vec![
            self.owner_type.segment().to_string(),
            self.owner.clone(),
            self.repo_type.segment().to_string(),
        ]
    }

    pub fn item_segments(&self) -> Vec<String> {
        let mut segments = self.collection_segments();
        segments.push(self.id.clone());
        segments
    }

    /// Metadata fields that were provided; `id` is included on create.
    pub fn body(&self, include_id: bool) -> Value {
        let mut body = Map::new();
        if include_id {
            body.insert("id".to_string(), Value::String(self.id.clone()));
            let name = self.name.clone().unwrap_or_else(|| self.id.clone());
            body.insert("name".to_string(), Value::String(name));
        } else if let Some(name) = &self.name {
            body.insert("name".to_string(), Value::String(name.clone()));
        }
        let text_fields = [
            ("full_name", &self.full_name),
            ("description", &self.description),
            ("default_locale", &self.default_locale),
            ("website", &self.website),
            ("public_access", &self.public_access),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value {
                body.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        if let Some(locales) = &self.supported_locales {
            body.insert(
                "supported_locales".to_string(),
                Value::String(locales.join(",")),
            );
        }
        if let Some(extras) = &self.extras {
            body.insert("extras".to_string(), extras.clone());
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocl::matching::parse_match_response;
    use serde_json::json;

    #[test]
    fn owner_and_repo_types_accept_singular_aliases() {
        let repo: RepoRef = serde_json::from_value(json!({
            "owner_type": "org", "owner": "CIEL", "repo_type": "source", "repo": "CIEL"
        }))
        .unwrap();
        assert_eq!(repo.relative_url(), "/orgs/CIEL/sources/CIEL/");

        let user: OwnerType = serde_json::from_value(json!("user")).unwrap();
        assert_eq!(user, OwnerType::Users);
    }

    #[test]
    fn versioned_repo_url_includes_version() {
        let repo: RepoRef = serde_json::from_value(json!({
            "owner": "WHO", "repo_type": "collections", "repo": "ICD-10", "version": "v2019"
        }))
        .unwrap();
        assert_eq!(repo.relative_url(), "/orgs/WHO/collections/ICD-10/v2019/");
    }

    #[test]
    fn scope_requires_owner_and_repo() {
        let scope = RepoScope {
            owner: Some("CIEL".to_string()),
            ..RepoScope::default()
        };
        assert!(scope.as_repo().is_none());
    }

    #[test]
    fn match_body_skips_blank_terms_and_roots_url() {
        let request = MatchRequest {
            terms: vec!["fever".to_string(), "  ".to_string()],
            target_repo_url: "orgs/CIEL/sources/CIEL".to_string(),
            semantic: true,
            limit: None,
        };
        let body = request.body();
        assert_eq!(body["rows"], json!([{"name": "fever"}]));
        assert_eq!(body["target_repo_url"], "/orgs/CIEL/sources/CIEL/");
    }

    #[test]
    fn rows_without_names_keep_their_own_term() {
        let request = MatchRequest {
            terms: vec!["fever".to_string(), " ".to_string(), " cough ".to_string()],
            target_repo_url: "/orgs/CIEL/sources/CIEL/".to_string(),
            semantic: false,
            limit: None,
        };
        assert_eq!(request.submitted_terms(), vec!["fever", "cough"]);

        let response = json!([
            {"results": [{"id": "140238"}]},
            {"results": [{"id": "143264"}]}
        ]);
        let rows = parse_match_response(&response, &request.submitted_terms());
        assert_eq!(rows[1].term, "cough");
        assert_eq!(rows[1].best().map(|c| c.id.as_str()), Some("143264"));
    }

    #[test]
    fn mapping_draft_requires_a_target() {
        let draft: MappingDraft = serde_json::from_value(json!({
            "owner": "MyOrg", "source": "Maps", "map_type": "SAME-AS",
            "from_concept_url": "/orgs/MyOrg/sources/Local/concepts/1/"
        }))
        .unwrap();
        assert!(matches!(draft.body(), Err(OclError::InvalidArgument(_))));
    }

    #[test]
    fn repository_create_body_defaults_name_to_id() {
        let draft: RepositoryDraft = serde_json::from_value(json!({
            "owner": "MyOrg",
            "id": "Local",
            "supported_locales": ["en", "fr"]
        }))
        .unwrap();
        let body = draft.body(true);
        assert_eq!(body["name"], "Local");
        assert_eq!(body["supported_locales"], "en,fr");
        assert_eq!(draft.mode, SaveMode::Upsert);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(page_size(None), DEFAULT_LIMIT);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(5_000)), MAX_LIMIT);
    }
}
