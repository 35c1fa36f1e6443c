//! OCI registry backed implementation of the transfer seam
//!
//! [`OciImageClient`] lists tags and builds [`OciTransferJob`]s over
//! `oci-client`. A job pulls the manifest, config, and layers from the
//! source registry and pushes them to the target, authenticating each side
//! with its own credentials.

use crate::error::{Result, TransferError};
use crate::logging::Logger;
use crate::transfer::{BoxedJob, Credentials, ImageClient, ImageEndpoint, TransferJob};
use async_trait::async_trait;
use oci_client::client::{ClientConfig, ClientProtocol};
use oci_client::secrets::RegistryAuth;
use oci_client::{Client, Reference, RegistryOperation};

/// Manifest and layer media types accepted when pulling
const ACCEPTED_MEDIA_TYPES: &[&str] = &[
    "application/vnd.docker.distribution.manifest.v2+json",
    "application/vnd.oci.image.manifest.v1+json",
    "application/vnd.docker.distribution.manifest.list.v2+json",
    "application/vnd.docker.image.rootfs.diff.tar.gzip",
    "application/vnd.oci.image.layer.v1.tar+gzip",
    "application/vnd.oci.image.index.v1+json",
];

/// Live [`ImageClient`] talking to OCI-compatible registries
pub struct OciImageClient {
    logger: Logger,
}

impl OciImageClient {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Build a client for one endpoint. Insecure endpoints fall back to
    /// plain HTTP and accept self-signed certificates.
    fn client_for(credentials: &Credentials) -> Client {
        let mut config = ClientConfig::default();
        config.platform_resolver = Some(Box::new(oci_client::client::linux_amd64_resolver));
        if credentials.insecure {
            config.protocol = ClientProtocol::Http;
            config.accept_invalid_certificates = true;
        }
        Client::new(config)
    }

    fn auth_for(credentials: &Credentials) -> RegistryAuth {
        if credentials.is_anonymous() {
            RegistryAuth::Anonymous
        } else {
            RegistryAuth::Basic(credentials.username.clone(), credentials.password.clone())
        }
    }

    fn reference_for(endpoint: &ImageEndpoint) -> Reference {
        let tag = if endpoint.tag.is_empty() {
            // Tag listing does not use the tag part; the registry and
            // repository are what matter here.
            "latest".to_string()
        } else {
            endpoint.tag.clone()
        };
        Reference::with_tag(endpoint.registry.clone(), endpoint.repository.clone(), tag)
    }
}

#[async_trait]
impl ImageClient for OciImageClient {
    async fn list_tags(&self, source: &ImageEndpoint) -> Result<Vec<String>> {
        let client = Self::client_for(&source.credentials);
        let auth = Self::auth_for(&source.credentials);
        let reference = Self::reference_for(source);

        let response = client
            .list_tags(&reference, &auth, None, None)
            .await
            .map_err(|e| {
                TransferError::Registry(format!("list tags of {} failed: {}", source.url(), e))
            })?;
        Ok(response.tags)
    }

    async fn build_job(&self, source: ImageEndpoint, target: ImageEndpoint) -> Result<BoxedJob> {
        let source_ref = Self::reference_for(&source);
        let target_ref = Self::reference_for(&target);
        Ok(Box::new(OciTransferJob {
            source,
            target,
            source_ref,
            target_ref,
            logger: self.logger.clone(),
        }))
    }
}

/// One single-tag registry-to-registry copy
pub struct OciTransferJob {
    source: ImageEndpoint,
    target: ImageEndpoint,
    source_ref: Reference,
    target_ref: Reference,
    logger: Logger,
}

#[async_trait]
impl TransferJob for OciTransferJob {
    fn source_url(&self) -> String {
        self.source.url()
    }

    fn target_url(&self) -> String {
        self.target.url()
    }

    async fn run(&self) -> Result<()> {
        let source_client = OciImageClient::client_for(&self.source.credentials);
        let source_auth = OciImageClient::auth_for(&self.source.credentials);

        self.logger
            .detail(&format!("Pulling {}", self.source.url()));
        let image = source_client
            .pull(&self.source_ref, &source_auth, ACCEPTED_MEDIA_TYPES.to_vec())
            .await
            .map_err(|e| {
                TransferError::Registry(format!("pull {} failed: {}", self.source.url(), e))
            })?;

        let target_client = OciImageClient::client_for(&self.target.credentials);
        let target_auth = OciImageClient::auth_for(&self.target.credentials);

        target_client
            .auth(&self.target_ref, &target_auth, RegistryOperation::Push)
            .await
            .map_err(|e| {
                TransferError::Registry(format!(
                    "authenticate against {} failed: {}",
                    self.target.registry, e
                ))
            })?;

        self.logger.detail(&format!(
            "Pushing {} layers to {}",
            image.layers.len(),
            self.target.url()
        ));
        target_client
            .push(
                &self.target_ref,
                &image.layers,
                image.config.clone(),
                &target_auth,
                image.manifest.clone(),
            )
            .await
            .map_err(|e| {
                TransferError::Registry(format!("push {} failed: {}", self.target.url(), e))
            })?;

        Ok(())
    }
}
