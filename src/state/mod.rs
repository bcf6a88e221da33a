/// State management module
///
/// This module handles all application state, including:
/// - The session state machine (session.rs)
/// - The workflow controller that drives it (workflow.rs)
/// - Saved projects and their persistence (library.rs, storage.rs)
/// - The API key gate (credential.rs)
/// - Shared data structures (data.rs)
/// - Style parameters for generation (features.rs)

pub mod credential;
pub mod data;
pub mod features;
pub mod library;
pub mod session;
pub mod storage;
pub mod workflow;
