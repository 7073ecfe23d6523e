use camino::Utf8PathBuf;
use thiserror::Error;

/// Fatal error conditions for the align and support steps
///
#[derive(Error, Debug)]
pub enum GapSupportError {
    #[error("Invalid gap table format in '{filename}' line {line_number}: {msg}")]
    Format {
        filename: String,
        line_number: usize,
        msg: String,
    },

    #[error("Failed to access alignment store '{path}': {msg}")]
    AlignmentStore { path: Utf8PathBuf, msg: String },

    #[error("Output location already exists: '{0}'")]
    OutputCollision(Utf8PathBuf),

    #[error("External tool '{tool}' failed ({status}) running command: '{command}'\n{stderr}")]
    UpstreamToolFailure {
        tool: String,
        command: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GapSupportError {
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type GapSupportResult<T> = Result<T, GapSupportError>;
