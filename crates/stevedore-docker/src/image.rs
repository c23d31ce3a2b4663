//! Image builds and pushes

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::image::{BuildImageOptions, PushImageOptions, TagImageOptions};
use bytes::Bytes;

use crate::client::{EngineConfig, connect};
use crate::error::{DockerError, Result};
use crate::output::{StreamLog, build_info_line, push_info_line};

/// Tag used when a reference carries none
pub const DEFAULT_TAG: &str = "latest";

/// What to build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Dockerfile path, relative to the context directory
    pub dockerfile: String,

    /// Build context directory
    pub context: PathBuf,

    /// Tags for the resulting image; the first is used for the build itself
    pub tags: Vec<String>,
}

impl BuildOptions {
    pub fn new(context: impl Into<PathBuf>) -> Self {
        Self {
            dockerfile: "Dockerfile".to_string(),
            context: context.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_dockerfile(mut self, dockerfile: impl Into<String>) -> Self {
        self.dockerfile = dockerfile.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if Path::new(&self.dockerfile).is_absolute() {
            return Err(DockerError::InvalidConfig(format!(
                "dockerfile path '{}' must be relative to the build context",
                self.dockerfile
            )));
        }
        if self.tags.is_empty() {
            return Err(DockerError::InvalidConfig(
                "at least one image tag is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// What to push and with which registry credentials
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Image reference, `repo[:tag]`
    pub reference: String,

    pub username: Option<String>,

    pub password: Option<String>,
}

impl PushOptions {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    fn credentials(&self) -> Option<DockerCredentials> {
        if self.username.is_none() && self.password.is_none() {
            return None;
        }
        Some(DockerCredentials {
            username: self.username.clone(),
            password: self.password.clone(),
            ..Default::default()
        })
    }
}

/// Split `repo[:tag]` into repository and tag
///
/// A colon followed by a `/` belongs to a registry port, not a tag.
pub fn split_reference(reference: &str) -> (&str, &str) {
    match reference.rfind(':') {
        Some(idx) if !reference[idx + 1..].contains('/') => {
            (&reference[..idx], &reference[idx + 1..])
        }
        _ => (reference, DEFAULT_TAG),
    }
}

/// Package a directory tree as an uncompressed tar archive
///
/// Entry names are relative to `dir`; symlinks are stored, not followed.
pub async fn tar_context(dir: &Path) -> Result<Bytes> {
    let dir = dir.to_path_buf();
    let archive = tokio::task::spawn_blocking(move || -> io::Result<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());
        builder.follow_symlinks(false);
        append_tree(&mut builder, &dir, &dir)?;
        builder.into_inner()
    })
    .await
    .map_err(io::Error::other)??;
    Ok(Bytes::from(archive))
}

fn append_tree<W: Write>(builder: &mut tar::Builder<W>, root: &Path, dir: &Path) -> io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let name = path.strip_prefix(root).map_err(io::Error::other)?;
        if entry.file_type()?.is_dir() {
            builder.append_dir(name, &path)?;
            append_tree(builder, root, &path)?;
        } else {
            builder.append_path_with_name(&path, name)?;
        }
    }
    Ok(())
}

/// Connect with `engine` and build an image
pub async fn build_image(engine: &EngineConfig, options: &BuildOptions) -> Result<String> {
    options.validate()?;
    let docker = connect(engine)?;
    build(&docker, options).await
}

/// Build an image from a context directory, returning the build log
///
/// Fails with [`DockerError::StreamFailed`] when the engine reports an error
/// on the final log line. Extra tags are applied after a successful build.
pub async fn build(docker: &Docker, options: &BuildOptions) -> Result<String> {
    options.validate()?;
    let primary = &options.tags[0];

    let context = tar_context(&options.context).await?;
    tracing::debug!(
        context = %options.context.display(),
        dockerfile = %options.dockerfile,
        tag = %primary,
        bytes = context.len(),
        "submitting build context"
    );

    let build_options = BuildImageOptions {
        dockerfile: options.dockerfile.clone(),
        t: primary.clone(),
        rm: true,
        ..Default::default()
    };

    let mut log = StreamLog::new();
    log.consume(
        docker.build_image(build_options, None, Some(context)),
        build_info_line,
    )
    .await?;
    let output = log.finish()?;

    for extra in &options.tags[1..] {
        let (repo, tag) = split_reference(extra);
        docker
            .tag_image(
                primary,
                Some(TagImageOptions {
                    repo: repo.to_string(),
                    tag: tag.to_string(),
                }),
            )
            .await?;
        tracing::debug!(source = %primary, target = %extra, "tagged image");
    }

    Ok(output)
}

/// Connect with `engine` and push an image
pub async fn push_image(engine: &EngineConfig, options: &PushOptions) -> Result<String> {
    let docker = connect(engine)?;
    push(&docker, options).await
}

/// Push an image to its registry, returning the push log
pub async fn push(docker: &Docker, options: &PushOptions) -> Result<String> {
    let (repo, tag) = split_reference(&options.reference);
    tracing::debug!(repo, tag, "pushing image");

    let mut log = StreamLog::new();
    log.consume(
        docker.push_image(repo, Some(PushImageOptions { tag }), options.credentials()),
        push_info_line,
    )
    .await?;
    log.finish()
}
