//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into note use-case APIs.
//! - Keep session/UI layers decoupled from storage details.

pub mod note_service;
