//! Shared library for Curriculum Designer Lambda functions.
//!
//! This crate provides the activity parser and lesson assembler together with
//! the clients, stores and types used across all Lambda functions.

pub mod assembler;
pub mod assistant;
pub mod canva;
pub mod catalog;
pub mod comments;
pub mod config;
pub mod curriculum;
pub mod error;
pub mod feedback;
pub mod http;
pub mod models;
pub mod oauth;
pub mod parser;
pub mod resources;
pub mod secrets;
pub mod slides;
pub mod store;
pub mod trello;

pub use assembler::assemble;
pub use catalog::ActivityFilter;
pub use config::Config;
pub use curriculum::CurriculumService;
pub use error::{Error, Result};
pub use models::{Activity, Card, LessonPlan, LessonRequest};
pub use parser::{parse_card, parse_cards};
pub use secrets::Credentials;
