//! VTU Translate - batch translation of Android string resources
//!
//! Parses `strings.xml`, translates the entries in batches through Groq,
//! Gemini or Cerebras with rate-limit aware retries, and writes the
//! translated resource file for the target language.

pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod invoker;
pub mod progress;
pub mod resource;
pub mod scheduler;
pub mod session;
pub mod strings_xml;
pub mod translate;
