//! ABOUTME: Counters describing how a continuation run stitched its chunks together

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContinuationDiagnostics {
    pub attempts: u32,
    pub exact_matches: u32,
    pub hash_matches: u32,
    pub token_matches: u32,
    pub llm_joins: u32,
    pub fallbacks: u32,
    pub structure_repairs: u32,
}
