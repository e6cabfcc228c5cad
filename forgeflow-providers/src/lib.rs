//! ABOUTME: LLM provider abstraction and the multi-strategy continuation engine
//! ABOUTME: that stitches length-limited completions into one coherent artifact

pub mod backoff;
pub mod content_type;
pub mod continuation;
pub mod diagnostics;
pub mod join;
pub mod overlap;
pub mod repair;
pub mod transport;

pub use content_type::{detect_content_type, ContentType};
pub use continuation::{get_completion_with_continuation, ContinuationOutcome, Message, Role};
pub use diagnostics::ContinuationDiagnostics;
pub use transport::{CompletionRequest, CompletionResponse, FinishReason, LlmTransport, ProviderCapabilities, ProviderManager};
