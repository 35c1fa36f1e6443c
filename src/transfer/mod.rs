//! Transfer seam: the engine's view of the registry client
//!
//! The engine never talks to a registry directly. It resolves references and
//! credentials into [`ImageEndpoint`]s and hands them to an [`ImageClient`],
//! which can list the tags of a source repository and build executable
//! [`TransferJob`]s. The live implementation is
//! [`crate::registry::OciImageClient`]; tests substitute an in-memory stub.

use crate::error::Result;
use async_trait::async_trait;

/// Registry credentials for one side of a transfer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub insecure: bool,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, insecure: bool) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            insecure,
        }
    }

    /// Anonymous access over TLS
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

/// One side of a transfer: a repository plus a resolved tag and credentials.
///
/// `repository` includes the namespace (`team/app`), matching what registry
/// APIs expect. An empty `tag` is only meaningful for tag listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEndpoint {
    pub registry: String,
    pub repository: String,
    pub tag: String,
    pub credentials: Credentials,
}

impl ImageEndpoint {
    pub fn new(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            registry: registry.into(),
            repository: repository.into(),
            tag: tag.into(),
            credentials,
        }
    }

    /// `registry/repository[:tag]`
    pub fn url(&self) -> String {
        if self.tag.is_empty() {
            format!("{}/{}", self.registry, self.repository)
        } else {
            format!("{}/{}:{}", self.registry, self.repository, self.tag)
        }
    }
}

/// A single-tag image transfer, executable exactly once per attempt.
///
/// Implementations carry everything needed to copy one image from its
/// source to its target; [`run`](TransferJob::run) performs the copy.
#[async_trait]
pub trait TransferJob: Send + Sync {
    /// Source as `registry/repository:tag`, for logs and the final report
    fn source_url(&self) -> String;

    /// Target as `registry/repository:tag`
    fn target_url(&self) -> String;

    /// Execute the transfer
    async fn run(&self) -> Result<()>;
}

pub type BoxedJob = Box<dyn TransferJob>;

/// Factory seam over the registry client.
///
/// `list_tags` covers rule expansion of all-tags sources; `build_job` binds
/// a source and target endpoint (same tag on both sides) into an executable
/// job. Both may fail on unreachable registries or bad references, and both
/// failures are expansion failures from the engine's point of view.
#[async_trait]
pub trait ImageClient: Send + Sync {
    async fn list_tags(&self, source: &ImageEndpoint) -> Result<Vec<String>>;

    async fn build_job(&self, source: ImageEndpoint, target: ImageEndpoint) -> Result<BoxedJob>;
}
