//! cinegen library crate.
//!
//! Turns a form of cinematic options into a single prompt, submits it to the
//! Veo video model, polls the long-running operation, and downloads the clip.

pub mod cli;
pub mod config;
pub mod form;
pub mod media;
pub mod options;
pub mod params;
pub mod playback;
pub mod prompt;
pub mod recorder;
pub mod studio;
pub mod veo;
