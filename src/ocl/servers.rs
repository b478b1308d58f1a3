use serde::Serialize;

pub const PRODUCTION_URL: &str = "http://api.openconceptlab.org/";
pub const STAGING_URL: &str = "https://api.staging.openconceptlab.org/";
pub const LOCAL_URL: &str = "http://api.ocl.localhost";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct KnownServer {
    pub name: &'static str,
    pub url: &'static str,
    pub description: &'static str,
}

pub const KNOWN_SERVERS: [KnownServer; 3] = [
    KnownServer {
        name: "production",
        url: PRODUCTION_URL,
        description: "Public OCL terminology server",
    },
    KnownServer {
        name: "staging",
        url: STAGING_URL,
        description: "OCL staging server for testing content changes",
    },
    KnownServer {
        name: "local",
        url: LOCAL_URL,
        description: "OCL instance running on the local docker network",
    },
];

/// Expands a server alias (`production`, `staging`, `local`) to its URL.
///
/// Blank input selects production; anything else is taken as a literal URL.
pub fn resolve_ocl_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return PRODUCTION_URL.to_string();
    }
    KNOWN_SERVERS
        .iter()
        .find(|server| server.name == trimmed)
        .map(|server| server.url.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_expand_to_known_urls() {
        assert_eq!(resolve_ocl_url("staging"), STAGING_URL);
        assert_eq!(resolve_ocl_url(" local "), LOCAL_URL);
        assert_eq!(resolve_ocl_url(""), PRODUCTION_URL);
    }

    #[test]
    fn custom_urls_pass_through() {
        assert_eq!(
            resolve_ocl_url("https://ocl.example.org/api/"),
            "https://ocl.example.org/api/"
        );
    }
}
