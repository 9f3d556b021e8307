//! Share Module
//!
//! Share code allocation and the service façade used by the HTTP layer.

mod allocator;
mod service;

pub use allocator::{
    CandidateSource, IdAllocator, RandomDigits, ScriptedCandidates, DEFAULT_ID_RETRIES, ID_LENGTH,
    ID_SPACE,
};
pub use service::ShareService;
