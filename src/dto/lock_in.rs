use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
/// Body of `PUT /lock-in`: the team designated as winner, or `null` to reset.
pub struct LockInRequest {
    /// Zero-based team index.
    #[validate(range(max = 4))]
    pub winner: Option<usize>,
}

#[derive(Debug, Serialize)]
/// Winner designation accepted by `PUT /lock-in`.
pub struct LockInResponse {
    /// Winner now in effect.
    pub winner: Option<usize>,
    /// Winner replaced by this request.
    pub previous: Option<usize>,
}
