//! Core domain types and configuration for the autosign platform.
//!
//! This crate is dependency-light on purpose: it holds the types shared by
//! every other crate (sign sessions, submission results) and the [`Settings`]
//! provider that the dispatch engine queries for live-tunable configuration.
//!
//! [`Settings`]: settings::Settings

pub mod settings;
pub mod types;
