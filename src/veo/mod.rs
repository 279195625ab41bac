//! Gemini API integration: video generation and image analysis.
//!
//! A generation is submitted as a long-running operation, polled until it
//! reports `done`, and the finished clip is downloaded with the API key
//! appended to its link.

mod analysis;
mod client;
mod poller;

pub use analysis::{analysis_instruction, parse_analysis, AnalysisError, AnalyzedPrompt};
pub use client::{
    api_key_from_env, with_key_param, GenerateVideoResponse, GeneratedSample, Operation,
    OperationError, OperationResponse, VeoClient, VeoError, VideoRef, API_KEY_ENV,
    DEFAULT_ANALYSIS_MODEL, DEFAULT_BASE_URL, DEFAULT_VIDEO_MODEL, FALLBACK_API_KEY_ENV,
};
pub use poller::{
    Clock, OperationSource, PollConfig, PollState, Poller, TokioClock, DEFAULT_POLL_INTERVAL,
};
