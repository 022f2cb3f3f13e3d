//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Builder image Dockerfiles for compiling guacamole-server."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
//! Dockerfiles are picked by build system and rendered from templates bundled
//! with this crate. The resulting [`BuilderImage`] names the tag to build and
//! describes the long-lived container the build steps run in.

use askama::Template;
use ensemble_runtime::ContainerSpec;
use strum::{Display, IntoStaticStr};
use tracing::debug;

use crate::error::BuildError;

/// Build system of the sources inside the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BuildSystem {
    /// `autoreconf`, `./configure`, `make`.
    Autotools,
}

/// Optional library a build needs, rendered as its Ubuntu package name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[allow(missing_docs)]
pub enum BuildDependency {
    #[strum(serialize = "libcairo2-dev")]
    Cairo,
    #[strum(serialize = "libjpeg-turbo8-dev")]
    LibJpegTurbo,
    #[strum(serialize = "libpng-dev")]
    LibPng,
    #[strum(serialize = "libtool-bin")]
    LibToolBin,
    #[strum(serialize = "uuid-dev")]
    UuidDev,
    #[strum(serialize = "libavcodec-dev")]
    AvCodec,
    #[strum(serialize = "libavformat-dev")]
    AvFormat,
    #[strum(serialize = "libavutil-dev")]
    AvUtil,
    #[strum(serialize = "libswscale-dev")]
    SwScale,
    #[strum(serialize = "freerdp2-dev")]
    FreeRdp,
    #[strum(serialize = "libpango1.0-dev")]
    Pango,
    #[strum(serialize = "libssh2-1-dev")]
    Ssh2,
    #[strum(serialize = "libtelnet-dev")]
    Telnet,
    #[strum(serialize = "libvncserver-dev")]
    VncServer,
    #[strum(serialize = "libwebsockets-dev")]
    WebSockets,
    #[strum(serialize = "libpulse-dev")]
    Pulse,
    #[strum(serialize = "libssl-dev")]
    Ssl,
    #[strum(serialize = "libvorbis-dev")]
    Vorbis,
    #[strum(serialize = "libwebp-dev")]
    WebP,
}

/// What the builder image has to provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerfileParams {
    /// Build system driving the compile.
    pub build_system: BuildSystem,
    /// Packages installed on top of the build system's own tooling.
    pub build_deps: Vec<BuildDependency>,
}

impl DockerfileParams {
    /// Parameters for `build_system` with no extra packages.
    pub fn new(build_system: BuildSystem) -> Self {
        Self {
            build_system,
            build_deps: Vec::new(),
        }
    }

    /// Also install `deps`.
    pub fn with_build_deps(mut self, deps: impl IntoIterator<Item = BuildDependency>) -> Self {
        self.build_deps.extend(deps);
        self
    }

    /// Name of the template serving these parameters.
    pub fn template_name(&self) -> String {
        format!("builder-{}-ubuntu-lts.dockerfile", self.build_system)
    }

    /// Tag the rendered image is built as.
    pub fn image_tag(&self) -> String {
        format!("guacamole-server-builder:{}-ubuntu-lts", self.build_system)
    }

    fn package_names(&self) -> Vec<&'static str> {
        self.build_deps.iter().map(|dep| dep.into()).collect()
    }
}

/// Source of Dockerfile templates.
pub trait DockerfileTemplates: Send + Sync {
    /// Render `template` with `params`.
    fn render(&self, template: &str, params: &DockerfileParams) -> Result<String, BuildError>;
}

#[derive(Template)]
#[template(path = "builder-autotools-ubuntu-lts.dockerfile", escape = "none")]
struct AutotoolsUbuntuLts<'a> {
    build_deps: &'a [&'static str],
}

/// Templates compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledTemplates;

impl DockerfileTemplates for BundledTemplates {
    fn render(&self, template: &str, params: &DockerfileParams) -> Result<String, BuildError> {
        match template {
            "builder-autotools-ubuntu-lts.dockerfile" => {
                let deps = params.package_names();
                Ok(AutotoolsUbuntuLts { build_deps: &deps }.render()?)
            }
            other => Err(BuildError::UnknownTemplate(other.to_owned())),
        }
    }
}

/// A rendered builder image, not yet built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderImage {
    /// Tag to build the Dockerfile as.
    pub tag: String,
    /// Dockerfile contents.
    pub dockerfile: String,
}

impl BuilderImage {
    /// Descriptor of the idle container build steps are executed in.
    pub fn container_spec(&self, name: impl Into<String>) -> ContainerSpec {
        ContainerSpec::new(self.tag.as_str()).with_name(name)
    }
}

/// Render the builder Dockerfile for `params` from `templates`.
pub fn render_dockerfile(
    templates: &dyn DockerfileTemplates,
    params: &DockerfileParams,
) -> Result<BuilderImage, BuildError> {
    let template = params.template_name();
    let dockerfile = templates.render(&template, params)?;
    let tag = params.image_tag();
    debug!(%template, %tag, %dockerfile, "rendered builder Dockerfile");
    Ok(BuilderImage { tag, dockerfile })
}
