use miette::Diagnostic;
use thiserror::Error;

/// Parse and configuration errors for the trellis data model.
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    /// Version string contains characters outside the accepted alphabet.
    #[error("invalid version string: {input:?}")]
    #[diagnostic(help(
        "versions may contain ASCII letters, digits, '.', '-', and a trailing '~N' repository counter"
    ))]
    Version { input: String },

    /// Malformed range or union expression.
    #[error("invalid version range {input:?}: {reason}")]
    #[diagnostic(help("ranges look like '[1.0,2.0)', '[1.0,)' or a bare version; join ranges with ';'"))]
    Range { input: String, reason: String },

    #[error("invalid artifact id: {input:?}")]
    #[diagnostic(help("artifact ids use the form 'group:name:kind:version'"))]
    ArtifactId { input: String },

    #[error("invalid path spec {input:?}: {reason}")]
    #[diagnostic(help(
        "path specs look like 'runtime', 'runtime+', 'runtime?<' or 'runtime(opt1,opt2(nested))'"
    ))]
    PathSpec { input: String, reason: String },

    /// Configuration file could not be read.
    #[error("failed to read config {path}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse config {path}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
