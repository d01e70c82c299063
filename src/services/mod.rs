//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own conversation state and the streaming workflow so
//! route handlers stay focused on protocol translation.

pub mod conversation;
pub mod title;
