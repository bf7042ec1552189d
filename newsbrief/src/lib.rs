// Library interface for newsbrief modules
// This allows tests and the binary to import modules

pub mod app;
pub mod error;
pub mod extraction;
pub mod job;
pub mod notification;
pub mod scheduler;
pub mod scraping;
pub mod summarization;
