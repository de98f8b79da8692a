//! Election error types

use lw_kube::KubeApiError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ElectionError>;

#[derive(Error, Debug)]
pub enum ElectionError {
    /// A renewal reply named someone else as holder. The process must
    /// stop acting as leader immediately; exiting is the only safe move.
    #[error("lost leadership to {holder}")]
    LostLeadership { holder: String },

    /// The election ended without this candidate ever leading.
    #[error("election session ended")]
    SessionEnded,

    #[error("lease API error: {0}")]
    Api(#[from] KubeApiError),
}
