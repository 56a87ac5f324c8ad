//! User-Agent string sent with every session request.

/// Project URL advertised in the User-Agent.
const PROJECT_UA_URL: &str = "https://github.com/fierce/ecotaxa-export";

/// Default User-Agent for session requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("ecotaxa-export/{version} (batch-export-tool; +{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_identifies_tool_and_version() {
        let ua = default_user_agent();
        assert!(ua.starts_with("ecotaxa-export/"), "unexpected UA: {ua}");
        assert!(ua.contains(env!("CARGO_PKG_VERSION")));
        assert!(ua.contains(PROJECT_UA_URL));
    }
}
