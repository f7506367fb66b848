use serde::Deserialize;

use crate::error::IngestResult;

/// Subset of a push event payload needed to derive commit references.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PushPayload {
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PushCommit {
    #[serde(default)]
    pub sha: String,
}

impl PushPayload {
    pub fn parse(raw: &[u8]) -> IngestResult<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Commit references to resolve for this push, in payload order.
    ///
    /// Uses the listed commits, skipping empty shas. When none are listed, falls back to the tip
    /// of the push: `head` if present, otherwise `after`.
    pub fn commit_references(&self) -> Vec<&str> {
        let listed: Vec<&str> = self
            .commits
            .iter()
            .map(|commit| commit.sha.as_str())
            .filter(|sha| !sha.is_empty())
            .collect();

        if !listed.is_empty() {
            return listed;
        }

        [self.head.as_deref(), self.after.as_deref()]
            .into_iter()
            .flatten()
            .find(|reference| !reference.is_empty())
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_commits_keep_payload_order() {
        let payload = PushPayload::parse(
            br#"{"head": "tip", "commits": [{"sha": "sha1"}, {"sha": ""}, {"sha": "sha2"}]}"#,
        )
        .unwrap();

        assert_eq!(payload.commit_references(), vec!["sha1", "sha2"]);
    }

    #[test]
    fn empty_commit_list_falls_back_to_head() {
        let payload =
            PushPayload::parse(br#"{"head": "abc123tip", "after": "other", "commits": []}"#)
                .unwrap();

        assert_eq!(payload.commit_references(), vec!["abc123tip"]);
    }

    #[test]
    fn missing_head_falls_back_to_after() {
        let payload = PushPayload::parse(br#"{"head": "", "after": "aftersha"}"#).unwrap();

        assert_eq!(payload.commit_references(), vec!["aftersha"]);
    }

    #[test]
    fn no_reference_at_all_yields_nothing() {
        let payload = PushPayload::parse(br#"{"before": "x"}"#).unwrap();

        assert!(payload.commit_references().is_empty());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(PushPayload::parse(b"").is_err());
        assert!(PushPayload::parse(b"{\"commits\": 3}").is_err());
    }
}
