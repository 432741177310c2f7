use thiserror::Error;

#[derive(Error, Debug)]
pub enum CcpError {
    #[error("Solver diverged at iteration {iteration}: {message}")]
    SolverDiverged { iteration: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("geometry grid is required for the field solve")]
    MissingGrid,

    #[error("Grid shape mismatch: declared {declared_nz}x{declared_nr}, got {got_nz}x{got_nr}")]
    GridShapeMismatch {
        declared_nz: usize,
        declared_nr: usize,
        got_nz: usize,
        got_nr: usize,
    },

    #[error("Region id {id} at cell ({iz}, {ir}) is not in the region legend")]
    UnknownRegionId { id: i64, iz: usize, ir: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Linear algebra error: {0}")]
    LinAlg(String),
}

pub type CcpResult<T> = Result<T, CcpError>;
