use thiserror::Error;

#[derive(Error, Debug)]
pub enum VlbiError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Baseline not found: {0}")]
    BaselineNotFound(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Context not found: {0}")]
    ContextNotFound(String),

    #[error("An element named {0} already exists")]
    DuplicateName(String),

    #[error("Invalid plot parameter: {0}")]
    InvalidPlotParameter(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Unsupported bits per sample: {0}")]
    InvalidSampleFormat(i32),

    #[error("Size mismatch: expected {expected:?}, got {found:?}")]
    SizeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Unable to decode {format} payload: {reason}")]
    Decode { format: String, reason: String },

    #[error("Invalid date string: {0}")]
    InvalidDate(String),

    #[error("Stream {0} holds no samples")]
    EmptyStream(String),

    #[error("Unable to spawn synthesis worker: {0}")]
    WorkerSpawn(String),

    #[error("Synthesis worker for baseline {0} panicked")]
    WorkerPanicked(String),

    #[error("Unable to perform file operation: {0}")]
    Io(#[from] std::io::Error),
}

impl PartialEq for VlbiError {
    fn eq(&self, other: &Self) -> bool {
        use VlbiError::*;
        match (self, other) {
            (NodeNotFound(a), NodeNotFound(b)) => a == b,
            (BaselineNotFound(a), BaselineNotFound(b)) => a == b,
            (ModelNotFound(a), ModelNotFound(b)) => a == b,
            (ContextNotFound(a), ContextNotFound(b)) => a == b,
            (DuplicateName(a), DuplicateName(b)) => a == b,
            (InvalidPlotParameter(a), InvalidPlotParameter(b)) => a == b,
            (InvalidLocation(a), InvalidLocation(b)) => a == b,
            (InvalidSampleFormat(a), InvalidSampleFormat(b)) => a == b,
            (
                SizeMismatch {
                    expected: e1,
                    found: f1,
                },
                SizeMismatch {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,
            (UnsupportedFormat(a), UnsupportedFormat(b)) => a == b,
            (
                Decode {
                    format: f1,
                    reason: r1,
                },
                Decode {
                    format: f2,
                    reason: r2,
                },
            ) => f1 == f2 && r1 == r2,
            (InvalidDate(a), InvalidDate(b)) => a == b,
            (EmptyStream(a), EmptyStream(b)) => a == b,
            (WorkerSpawn(a), WorkerSpawn(b)) => a == b,
            (WorkerPanicked(a), WorkerPanicked(b)) => a == b,

            // io errors are not comparable: same variant is enough
            (Io(_), Io(_)) => true,

            _ => false,
        }
    }
}
