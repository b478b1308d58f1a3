use crate::llm::tools::{ToolDefinition, ToolFunction, ToolParam, ToolParamType};
use crate::toolbox::ToolKind;

use ToolParamType::{Array, Boolean, Integer, Number, Object, String as Text};

const OWNER_TYPES: &[&str] = &["orgs", "users"];
const REPO_TYPES: &[&str] = &["sources", "collections"];

fn owner_type() -> ToolParam {
    ToolParam::optional("owner_type", Text, "Owner kind; defaults to orgs.").one_of(OWNER_TYPES)
}

fn repo_type() -> ToolParam {
    ToolParam::optional("repo_type", Text, "Repository kind; defaults to sources.")
        .one_of(REPO_TYPES)
}

fn limit() -> ToolParam {
    ToolParam::optional("limit", Integer, "Maximum results to return (1-100, default 10).")
}

fn target_repo_url() -> ToolParam {
    ToolParam::required(
        "target_repo_url",
        Text,
        "Relative URL of the repository to match against, e.g. /orgs/CIEL/sources/CIEL/.",
    )
}

/// Repository identification shared by repo-scoped tools.
fn with_repo(function: ToolFunction, required: bool, versioned: bool) -> ToolFunction {
    let owner = ToolParam::new(
        "owner",
        Text,
        required,
        Some("Owner id (organization mnemonic or username).".to_string()),
    );
    let repo = ToolParam::new(
        "repo",
        Text,
        required,
        Some("Source or collection id.".to_string()),
    );
    let function = function
        .with_param(owner_type())
        .with_param(owner)
        .with_param(repo_type())
        .with_param(repo);
    if versioned {
        function.with_param(ToolParam::optional(
            "version",
            Text,
            "Repository version; latest content when omitted.",
        ))
    } else {
        function
    }
}

/// JSON-schema declaration of one tool.
pub fn definition(kind: ToolKind) -> ToolDefinition {
    let base = ToolFunction::new(kind.id(), kind.summary());
    let function = match kind {
        ToolKind::ListServers => ToolFunction::new(
            kind.id(),
            "List the known OCL servers and which one this session is connected to.",
        ),
        ToolKind::SearchOwners => base
            .with_param(ToolParam::optional("q", Text, "Free-text search."))
            .with_param(
                ToolParam::optional(
                    "owner_type",
                    Text,
                    "Restrict to organizations or users; both when omitted.",
                )
                .one_of(OWNER_TYPES),
            )
            .with_param(limit()),
        ToolKind::SearchRepositories => base
            .with_param(ToolParam::optional("q", Text, "Free-text search."))
            .with_param(owner_type())
            .with_param(ToolParam::optional(
                "owner",
                Text,
                "Only repositories published by this owner.",
            ))
            .with_param(
                ToolParam::optional(
                    "repo_type",
                    Text,
                    "Restrict to sources or collections; both when omitted.",
                )
                .one_of(REPO_TYPES),
            )
            .with_param(limit()),
        ToolKind::GetRepositoryVersions => with_repo(base, true, false).with_param(limit()),
        ToolKind::SearchConcepts => with_repo(
            base.with_param(ToolParam::optional("q", Text, "Free-text search.")),
            false,
            true,
        )
        .with_param(ToolParam::optional(
            "concept_class",
            Text,
            "Filter by concept class, e.g. Diagnosis.",
        ))
        .with_param(ToolParam::optional(
            "datatype",
            Text,
            "Filter by datatype, e.g. Numeric.",
        ))
        .with_param(ToolParam::optional("locale", Text, "Filter by name locale, e.g. fr."))
        .with_param(ToolParam::optional(
            "include_retired",
            Boolean,
            "Include retired concepts.",
        ))
        .with_param(limit())
        .with_param(ToolParam::optional("page", Integer, "Result page, starting at 1.")),
        ToolKind::SearchMappings => with_repo(
            base.with_param(ToolParam::optional("q", Text, "Free-text search.")),
            false,
            true,
        )
        .with_param(ToolParam::optional(
            "from_concept",
            Text,
            "Source concept id or URL.",
        ))
        .with_param(ToolParam::optional("to_concept", Text, "Target concept id or URL."))
        .with_param(ToolParam::optional(
            "from_source",
            Text,
            "Source repository of the from concept.",
        ))
        .with_param(ToolParam::optional(
            "to_source",
            Text,
            "Source repository of the to concept.",
        ))
        .with_param(ToolParam::optional(
            "map_type",
            Text,
            "Mapping type, e.g. SAME-AS.",
        ))
        .with_param(ToolParam::optional(
            "include_retired",
            Boolean,
            "Include retired mappings.",
        ))
        .with_param(limit())
        .with_param(ToolParam::optional("page", Integer, "Result page, starting at 1.")),
        ToolKind::MatchConcepts => base
            .with_param(
                ToolParam::required("terms", Array, "Free-text terms to match.").of(Text),
            )
            .with_param(target_repo_url())
            .with_param(ToolParam::optional(
                "semantic",
                Boolean,
                "Use semantic (embedding) matching.",
            ))
            .with_param(ToolParam::optional(
                "limit",
                Integer,
                "Candidates per term (default 10).",
            )),
        ToolKind::AddOrUpdateConceptTranslations => base
            .with_param(owner_type())
            .with_param(ToolParam::required("owner", Text, "Owner of the source."))
            .with_param(ToolParam::required("source", Text, "Source id."))
            .with_param(ToolParam::required("concept", Text, "Concept id."))
            .with_param(
                ToolParam::required(
                    "names",
                    Array,
                    "Names to save: objects with name, locale, optional name_type, \
                     locale_preferred, and uuid (present to update an existing name).",
                )
                .of(Object),
            ),
        ToolKind::ListExpansions | ToolKind::GetExpansion => {
            let function = base
                .with_param(owner_type())
                .with_param(ToolParam::required("owner", Text, "Owner of the collection."))
                .with_param(ToolParam::required("collection", Text, "Collection id."))
                .with_param(ToolParam::optional(
                    "version",
                    Text,
                    "Collection version; defaults to HEAD.",
                ));
            if kind == ToolKind::GetExpansion {
                function.with_param(ToolParam::required("expansion", Text, "Expansion id."))
            } else {
                function
            }
        }
        ToolKind::CreateMapping => base
            .with_param(owner_type())
            .with_param(ToolParam::required(
                "owner",
                Text,
                "Owner of the source that will hold the mapping.",
            ))
            .with_param(ToolParam::required(
                "source",
                Text,
                "Source that will hold the mapping.",
            ))
            .with_param(ToolParam::required("map_type", Text, "Mapping type, e.g. SAME-AS."))
            .with_param(ToolParam::required(
                "from_concept_url",
                Text,
                "Relative URL of the from concept.",
            ))
            .with_param(ToolParam::optional(
                "to_concept_url",
                Text,
                "Relative URL of the to concept.",
            ))
            .with_param(ToolParam::optional(
                "to_source_url",
                Text,
                "Target source URL when the to concept is not in OCL.",
            ))
            .with_param(ToolParam::optional(
                "to_concept_code",
                Text,
                "Target code used with to_source_url.",
            ))
            .with_param(ToolParam::optional(
                "to_concept_name",
                Text,
                "Target name used with to_source_url.",
            ))
            .with_param(ToolParam::optional("extras", Object, "Custom attributes.")),
        ToolKind::Cascade => with_repo(base, true, true)
            .with_param(ToolParam::required("concept", Text, "Concept id to start from."))
            .with_param(ToolParam::optional(
                "cascade_levels",
                Text,
                "Levels to follow, or * for all.",
            ))
            .with_param(
                ToolParam::optional("method", Text, "Cascade method.")
                    .one_of(&["sourcetoconcepts", "sourcemappings"]),
            )
            .with_param(ToolParam::optional(
                "map_types",
                Text,
                "Comma-separated map types to follow.",
            ))
            .with_param(ToolParam::optional(
                "exclude_map_types",
                Text,
                "Comma-separated map types to skip.",
            ))
            .with_param(ToolParam::optional(
                "return_map_types",
                Text,
                "Comma-separated map types to include in the result.",
            ))
            .with_param(ToolParam::optional(
                "reverse",
                Boolean,
                "Follow mappings towards the concept instead of away from it.",
            )),
        ToolKind::SuggestMappings => base
            .with_param(
                ToolParam::required("terms", Array, "Terms to find mapping targets for.").of(Text),
            )
            .with_param(target_repo_url())
            .with_param(ToolParam::optional(
                "limit",
                Integer,
                "Suggestions per term (default 5).",
            )),
        ToolKind::ValidateMapping => base
            .with_param(ToolParam::required(
                "term",
                Text,
                "Source term or concept name being mapped.",
            ))
            .with_param(ToolParam::required(
                "target_concept",
                Text,
                "Proposed target concept id.",
            ))
            .with_param(target_repo_url())
            .with_param(ToolParam::optional(
                "threshold",
                Number,
                "Minimum score for a target that is not the top candidate (default 0.8).",
            )),
        ToolKind::BulkMapTerms => base
            .with_param(
                ToolParam::required("terms", Array, "Terms to map (at most 100).").of(Text),
            )
            .with_param(target_repo_url())
            .with_param(ToolParam::optional(
                "semantic",
                Boolean,
                "Use semantic matching (default true).",
            )),
        ToolKind::SaveRepository => base
            .with_param(owner_type())
            .with_param(ToolParam::required("owner", Text, "Owner id."))
            .with_param(repo_type())
            .with_param(ToolParam::required("id", Text, "Repository id."))
            .with_param(
                ToolParam::optional(
                    "mode",
                    Text,
                    "create, update, or upsert (default: update when it exists).",
                )
                .one_of(&["create", "update", "upsert"]),
            )
            .with_param(ToolParam::optional("name", Text, "Short name."))
            .with_param(ToolParam::optional("full_name", Text, "Full name."))
            .with_param(ToolParam::optional("description", Text, "Description."))
            .with_param(ToolParam::optional("default_locale", Text, "Default locale."))
            .with_param(
                ToolParam::optional("supported_locales", Array, "Supported locales.").of(Text),
            )
            .with_param(ToolParam::optional("website", Text, "Website URL."))
            .with_param(
                ToolParam::optional("public_access", Text, "Public access level.")
                    .one_of(&["View", "Edit", "None"]),
            )
            .with_param(ToolParam::optional("extras", Object, "Custom attributes.")),
    };
    ToolDefinition::from_function(function)
}
