use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Url};
use serde_json::{Map, Value, json};

use crate::ocl::error::OclError;
use crate::ocl::params::{
    CascadeQuery, ConceptSearch, ExpansionQuery, MappingDraft, MappingSearch, MatchRequest,
    OwnerSearch, OwnerType, RepoType, RepositoryDraft, RepositorySearch, SaveMode,
    TranslationUpdate, VersionsQuery, page_size,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

type Query = Vec<(&'static str, String)>;

/// Async client for one terminology server.
#[derive(Debug, Clone)]
pub struct OclClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl OclClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, OclError> {
        Self::with_http(reqwest::Client::new(), base_url, token)
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: &str,
        token: Option<String>,
    ) -> Result<Self, OclError> {
        let base_url =
            Url::parse(base_url.trim()).map_err(|_| OclError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(OclError::InvalidUrl(base_url.to_string()));
        }
        let token = token.filter(|token| !token.trim().is_empty());
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Resolves path segments against the base URL, with a trailing slash.
    fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url, OclError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| OclError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                let segment = segment.as_ref().trim();
                if segment.is_empty() {
                    return Err(OclError::InvalidArgument(
                        "path component must not be empty".to_string(),
                    ));
                }
                path.push(segment);
            }
            path.push("");
        }
        Ok(url)
    }

    async fn request(
        &self,
        method: Method,
        url: Url,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<Value, OclError> {
        tracing::debug!(%method, %url, "terminology API request");
        let mut request = self
            .http
            .request(method, url)
            .timeout(REQUEST_TIMEOUT)
            .query(query);
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Token {}", token.trim())).map_err(|_| {
                OclError::InvalidArgument("OCL token contains invalid characters".to_string())
            })?;
            request = request.header(AUTHORIZATION, value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(OclError::Api { status, body: text });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    async fn get<S: AsRef<str>>(
        &self,
        segments: &[S],
        query: &[(&'static str, String)],
    ) -> Result<Value, OclError> {
        let url = self.endpoint(segments)?;
        self.request(Method::GET, url, query, None).await
    }

    /// Finds organizations and/or users.
    pub async fn search_owners(&self, search: &OwnerSearch) -> Result<Value, OclError> {
        let query = search_query(search.q.as_deref(), search.limit, None);
        let mut result = Map::new();
        if search.owner_type != Some(OwnerType::Users) {
            result.insert(
                "organizations".to_string(),
                self.get(&["orgs"], &query).await?,
            );
        }
        if search.owner_type != Some(OwnerType::Orgs) {
            result.insert("users".to_string(), self.get(&["users"], &query).await?);
        }
        Ok(Value::Object(result))
    }

    /// Finds sources and/or collections, optionally limited to one owner.
    pub async fn search_repositories(&self, search: &RepositorySearch) -> Result<Value, OclError> {
        let query = search_query(search.q.as_deref(), search.limit, None);
        let owner = search.owner.as_deref().map(str::trim).filter(|v| !v.is_empty());
        let mut result = Map::new();
        for repo_type in [RepoType::Sources, RepoType::Collections] {
            if search.repo_type.is_some_and(|wanted| wanted != repo_type) {
                continue;
            }
            let mut segments = Vec::new();
            if let Some(owner) = owner {
                segments.push(search.owner_type.segment().to_string());
                segments.push(owner.to_string());
            }
            segments.push(repo_type.segment().to_string());
            result.insert(
                repo_type.segment().to_string(),
                self.get(&segments, &query).await?,
            );
        }
        Ok(Value::Object(result))
    }

    pub async fn repository_versions(&self, query: &VersionsQuery) -> Result<Value, OclError> {
        let mut repo = query.repo.clone();
        repo.version = None;
        let mut segments = repo.segments();
        segments.push("versions".to_string());
        let params = vec![("limit", page_size(query.limit).to_string())];
        self.get(&segments, &params).await
    }

    /// Searches concepts globally or inside one repository.
    pub async fn search_concepts(&self, search: &ConceptSearch) -> Result<Value, OclError> {
        let mut segments = search
            .scope
            .as_repo()
            .map(|repo| repo.segments())
            .unwrap_or_default();
        segments.push("concepts".to_string());

        let mut query = search_query(search.q.as_deref(), search.limit, search.page);
        push_opt(&mut query, "conceptClass", &search.concept_class);
        push_opt(&mut query, "datatype", &search.datatype);
        push_opt(&mut query, "locale", &search.locale);
        if search.include_retired {
            query.push(("includeRetired", "true".to_string()));
        }
        query.push(("verbose", "true".to_string()));
        self.get(&segments, &query).await
    }

    pub async fn search_mappings(&self, search: &MappingSearch) -> Result<Value, OclError> {
        let mut segments = search
            .scope
            .as_repo()
            .map(|repo| repo.segments())
            .unwrap_or_default();
        segments.push("mappings".to_string());

        let mut query = search_query(search.q.as_deref(), search.limit, search.page);
        push_opt(&mut query, "fromConcept", &search.from_concept);
        push_opt(&mut query, "toConcept", &search.to_concept);
        push_opt(&mut query, "fromConceptSource", &search.from_source);
        push_opt(&mut query, "toConceptSource", &search.to_source);
        push_opt(&mut query, "mapType", &search.map_type);
        if search.include_retired {
            query.push(("includeRetired", "true".to_string()));
        }
        query.push(("verbose", "true".to_string()));
        self.get(&segments, &query).await
    }

    /// Runs `$match` for free-text terms against a target repository.
    pub async fn match_concepts(&self, request: &MatchRequest) -> Result<Value, OclError> {
        request.validate()?;
        let url = self.endpoint(&["concepts", "$match"])?;
        let mut query = vec![
            ("includeSearchMeta", "true".to_string()),
            ("limit", page_size(request.limit).to_string()),
        ];
        if request.semantic {
            query.push(("semantic", "true".to_string()));
        }
        self.request(Method::POST, url, &query, Some(&request.body()))
            .await
    }

    /// Creates names without a `uuid` and updates the others.
    ///
    /// Each name is applied independently; failures are reported per name.
    pub async fn upsert_concept_names(
        &self,
        update: &TranslationUpdate,
    ) -> Result<Value, OclError> {
        if update.names.is_empty() {
            return Err(OclError::InvalidArgument(
                "at least one name is required".to_string(),
            ));
        }
        let base = update.concept_segments();
        let mut outcomes = Vec::with_capacity(update.names.len());
        for name in &update.names {
            let body = serde_json::to_value(name).map_err(|err| {
                let message = format!("name '{}' is not serializable: {err}", name.name);
                OclError::InvalidArgument(message)
            })?;
            let (method, segments, action) = match name.uuid.as_deref() {
                Some(uuid) if !uuid.trim().is_empty() => {
                    let mut segments = base.clone();
                    segments.push(uuid.to_string());
                    (Method::PUT, segments, "updated")
                }
                _ => (Method::POST, base.clone(), "created"),
            };
            let outcome = match self.endpoint(&segments) {
                Ok(url) => self.request(method, url, &[], Some(&body)).await,
                Err(err) => Err(err),
            };
            outcomes.push(match outcome {
                Ok(saved) => json!({
                    "name": name.name,
                    "locale": name.locale,
                    "status": action,
                    "result": saved,
                }),
                Err(err) => json!({
                    "name": name.name,
                    "locale": name.locale,
                    "status": "failed",
                    "error": err.to_string(),
                }),
            });
        }
        Ok(Value::Array(outcomes))
    }

    /// Lists expansions, or fetches one when `expansion` is set.
    pub async fn expansions(&self, query: &ExpansionQuery) -> Result<Value, OclError> {
        self.get(&query.segments(), &[]).await
    }

    pub async fn create_mapping(&self, draft: &MappingDraft) -> Result<Value, OclError> {
        let body = draft.body()?;
        let url = self.endpoint(&[
            draft.owner_type.segment(),
            draft.owner.as_str(),
            "sources",
            draft.source.as_str(),
            "mappings",
        ])?;
        self.request(Method::POST, url, &[], Some(&body)).await
    }

    pub async fn cascade(&self, query: &CascadeQuery) -> Result<Value, OclError> {
        let mut segments = query.repo.segments();
        segments.push("concepts".to_string());
        segments.push(query.concept.clone());
        segments.push("$cascade".to_string());

        let mut params: Query = Vec::new();
        push_opt(&mut params, "cascadeLevels", &query.cascade_levels);
        push_opt(&mut params, "method", &query.method);
        push_opt(&mut params, "mapTypes", &query.map_types);
        push_opt(&mut params, "excludeMapTypes", &query.exclude_map_types);
        push_opt(&mut params, "returnMapTypes", &query.return_map_types);
        if query.reverse {
            params.push(("reverse", "true".to_string()));
        }
        self.get(&segments, &params).await
    }

    /// Creates or updates repository metadata according to `draft.mode`.
    pub async fn save_repository(&self, draft: &RepositoryDraft) -> Result<Value, OclError> {
        let exists = match draft.mode {
            SaveMode::Create => false,
            SaveMode::Update => true,
            SaveMode::Upsert => match self.get(&draft.item_segments(), &[]).await {
                Ok(_) => true,
                Err(err) if err.is_not_found() => false,
                Err(err) => return Err(err),
            },
        };

        if exists {
            let url = self.endpoint(&draft.item_segments())?;
            self.request(Method::PUT, url, &[], Some(&draft.body(false)))
                .await
        } else {
            let url = self.endpoint(&draft.collection_segments())?;
            self.request(Method::POST, url, &[], Some(&draft.body(true)))
                .await
        }
    }
}

fn search_query(q: Option<&str>, limit: Option<u32>, page: Option<u32>) -> Query {
    let mut query = vec![("limit", page_size(limit).to_string())];
    if let Some(q) = q.map(str::trim).filter(|q| !q.is_empty()) {
        query.push(("q", q.to_string()));
    }
    if let Some(page) = page.filter(|page| *page > 0) {
        query.push(("page", page.to_string()));
    }
    query
}

fn push_opt(query: &mut Query, key: &'static str, value: &Option<String>) {
    if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        query.push((key, value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path_and_adds_trailing_slash() {
        let client = OclClient::new("https://ocl.example.org/api", None).unwrap();
        let url = client.endpoint(&["orgs", "CIEL", "sources"]).unwrap();
        assert_eq!(url.as_str(), "https://ocl.example.org/api/orgs/CIEL/sources/");
    }

    #[test]
    fn endpoint_escapes_segments_but_keeps_operations() {
        let client = OclClient::new("http://api.openconceptlab.org/", None).unwrap();
        let url = client.endpoint(&["concepts", "$match"]).unwrap();
        assert_eq!(url.as_str(), "http://api.openconceptlab.org/concepts/$match/");

        let url = client.endpoint(&["orgs", "My Org"]).unwrap();
        assert_eq!(url.path(), "/orgs/My%20Org/");
    }

    #[test]
    fn empty_segments_are_rejected() {
        let client = OclClient::new("http://api.openconceptlab.org/", None).unwrap();
        assert!(matches!(
            client.endpoint(&["orgs", " "]),
            Err(OclError::InvalidArgument(_))
        ));
    }

    #[test]
    fn unusable_base_urls_are_rejected() {
        assert!(matches!(
            OclClient::new("not a url", None),
            Err(OclError::InvalidUrl(_))
        ));
        assert!(matches!(
            OclClient::new("mailto:someone@example.org", None),
            Err(OclError::InvalidUrl(_))
        ));
    }

    #[test]
    fn blank_token_means_anonymous() {
        let client =
            OclClient::new("http://api.openconceptlab.org/", Some("  ".to_string())).unwrap();
        assert!(!client.has_token());
    }

    #[test]
    fn search_query_omits_blank_text() {
        let query = search_query(Some("  "), Some(5), Some(2));
        assert_eq!(query, vec![("limit", "5".to_string()), ("page", "2".to_string())]);
    }
}
