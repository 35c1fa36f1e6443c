//! Image reference parsing
//!
//! A [`RepoRef`] is the parsed form of a reference string such as
//! `registry.example.com/team/app:v1`. The tag part may be empty (meaning
//! "all tags of the repository"), a single tag, or a comma-separated list.

use crate::error::{Result, TransferError};

/// Parsed image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    registry: String,
    namespace: String,
    repository: String,
    tag: String,
}

impl RepoRef {
    /// Parse a reference string of the form `registry[/namespace…]/repository[:tag]`.
    ///
    /// The tag separator is a `:` occurring after the last `/`, so registry
    /// ports (`registry:5000/team/app`) are preserved. The first segment is
    /// the registry, the last is the repository, and everything between is
    /// the namespace (which may be empty or contain further slashes).
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(TransferError::Parse("empty image reference".to_string()));
        }

        let (without_tag, tag) = match raw.rfind(':') {
            Some(pos) if pos > raw.rfind('/').unwrap_or(0) => {
                (&raw[..pos], raw[pos + 1..].to_string())
            }
            _ => (raw, String::new()),
        };

        let mut segments = without_tag.split('/');
        let registry = segments.next().unwrap_or_default().to_string();
        let rest: Vec<&str> = segments.collect();

        if registry.is_empty() || rest.is_empty() {
            return Err(TransferError::Parse(format!(
                "reference {} must contain at least registry/repository",
                raw
            )));
        }
        if rest.iter().any(|s| s.is_empty()) {
            return Err(TransferError::Parse(format!(
                "reference {} contains an empty path segment",
                raw
            )));
        }

        let repository = rest[rest.len() - 1].to_string();
        let namespace = rest[..rest.len() - 1].join("/");

        Ok(Self {
            registry,
            namespace,
            repository,
            tag,
        })
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Raw tag part: empty, a single tag, or a comma-separated list
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// `namespace/repository`, or just `repository` when there is no namespace
    pub fn repo_with_namespace(&self) -> String {
        if self.namespace.is_empty() {
            self.repository.clone()
        } else {
            format!("{}/{}", self.namespace, self.repository)
        }
    }

    /// `registry/namespace/repository`
    pub fn url_without_tag(&self) -> String {
        format!("{}/{}", self.registry, self.repo_with_namespace())
    }

    /// `namespace/repository[:tag]`
    pub fn repo_with_tag(&self) -> String {
        if self.tag.is_empty() {
            self.repo_with_namespace()
        } else {
            format!("{}:{}", self.repo_with_namespace(), self.tag)
        }
    }

    /// Full reference including the tag when present
    pub fn url(&self) -> String {
        if self.tag.is_empty() {
            self.url_without_tag()
        } else {
            format!("{}:{}", self.url_without_tag(), self.tag)
        }
    }

    /// Whether the tag part is a comma-separated list
    pub fn has_multiple_tags(&self) -> bool {
        self.tag.contains(',')
    }

    /// Individual tags from the comma-separated tag part
    pub fn tags(&self) -> Vec<&str> {
        if self.tag.is_empty() {
            Vec::new()
        } else {
            self.tag.split(',').collect()
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_reference() {
        let r = RepoRef::parse("registry.example.com/team/app:v1").unwrap();
        assert_eq!(r.registry(), "registry.example.com");
        assert_eq!(r.namespace(), "team");
        assert_eq!(r.repository(), "app");
        assert_eq!(r.tag(), "v1");
        assert_eq!(r.repo_with_namespace(), "team/app");
        assert_eq!(r.url_without_tag(), "registry.example.com/team/app");
        assert_eq!(r.repo_with_tag(), "team/app:v1");
        assert_eq!(r.url(), "registry.example.com/team/app:v1");
    }

    #[test]
    fn test_parse_without_tag_means_all_tags() {
        let r = RepoRef::parse("registry.example.com/team/app").unwrap();
        assert_eq!(r.tag(), "");
        assert!(r.tags().is_empty());
        assert_eq!(r.repo_with_tag(), "team/app");
        assert_eq!(r.url(), "registry.example.com/team/app");
    }

    #[test]
    fn test_parse_registry_port_is_not_a_tag() {
        let r = RepoRef::parse("registry.example.com:5000/team/app").unwrap();
        assert_eq!(r.registry(), "registry.example.com:5000");
        assert_eq!(r.tag(), "");

        let r = RepoRef::parse("registry.example.com:5000/team/app:v2").unwrap();
        assert_eq!(r.registry(), "registry.example.com:5000");
        assert_eq!(r.tag(), "v2");
    }

    #[test]
    fn test_parse_multi_tag_list() {
        let r = RepoRef::parse("r1.example/a/b:v1,v2,v3").unwrap();
        assert!(r.has_multiple_tags());
        assert_eq!(r.tags(), vec!["v1", "v2", "v3"]);
    }

    #[test]
    fn test_parse_nested_namespace() {
        let r = RepoRef::parse("registry.example.com/org/team/app:v1").unwrap();
        assert_eq!(r.namespace(), "org/team");
        assert_eq!(r.repository(), "app");
        assert_eq!(r.repo_with_namespace(), "org/team/app");
    }

    #[test]
    fn test_parse_two_segments_has_empty_namespace() {
        let r = RepoRef::parse("registry.example.com/app:v1").unwrap();
        assert_eq!(r.namespace(), "");
        assert_eq!(r.repo_with_namespace(), "app");
        assert_eq!(r.url_without_tag(), "registry.example.com/app");
    }

    #[test]
    fn test_parse_rejects_invalid_references() {
        assert!(RepoRef::parse("").is_err());
        assert!(RepoRef::parse("just-a-name").is_err());
        assert!(RepoRef::parse("registry.example.com//app").is_err());
    }
}
