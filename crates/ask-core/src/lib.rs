//! Ask Core - Domain types, collaborator trait, and shared configuration
//!
//! This crate defines the abstractions shared by the gateway crates:
//! - Query and answer models (questions, context rows, answers)
//! - The error kinds reported by an answer engine
//! - The `AnswerEngine` trait every engine binding implements
//! - Configuration management
//!
//! Author: hephaex@gmail.com

pub mod config;

pub use config::{
    AppConfig, CacheConfig, ConfigError, EngineConfig, EngineKind, LoggingConfig, ServerConfig,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of context rows requested when the caller does not say otherwise
pub const DEFAULT_TOP_K: usize = 5;

// ============================================================================
// Error Types
// ============================================================================

/// Failure kinds reported by an answer engine
///
/// The display form of every variant is the bare upstream message, so it can
/// be handed back to HTTP clients unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine refused the question or the requested row count
    #[error("{0}")]
    InvalidInput(String),

    /// Nothing to answer from (missing index, unknown collection)
    #[error("{0}")]
    NotFound(String),

    /// The engine did not answer in time
    #[error("{0}")]
    Timeout(String),

    /// The engine could not be reached
    #[error("{0}")]
    Unavailable(String),

    /// Any other failure
    #[error("{0}")]
    Internal(String),
}

impl EngineError {
    /// Stable machine-readable code, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::Timeout(_) => "timeout",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// The failure message without the kind
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(msg)
            | Self::NotFound(msg)
            | Self::Timeout(msg)
            | Self::Unavailable(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// Query and Answer Models
// ============================================================================

/// A question to be answered, with the number of context rows wanted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskQuery {
    /// User's question
    pub question: String,

    /// Maximum number of context rows to retrieve
    pub top_k: usize,
}

impl AskQuery {
    /// Create a query with the default row count
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set top-k
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }
}

/// One retrieved and scored snippet supporting an answer
///
/// Engines send rows as `[source, chunk, modality, score]` arrays; the named
/// object form is accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireRow")]
pub struct ContextRow {
    /// Source document identifier
    pub source: String,

    /// Retrieved text
    pub chunk: String,

    /// Modality tag (e.g. "text", "image", "table")
    pub modality: String,

    /// Relevance score (higher is better)
    pub score: f64,
}

impl ContextRow {
    pub fn new(
        source: impl Into<String>,
        chunk: impl Into<String>,
        modality: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            source: source.into(),
            chunk: chunk.into(),
            modality: modality.into(),
            score,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireRow {
    Tuple(String, String, String, f64),
    Named {
        source: String,
        chunk: String,
        modality: String,
        score: f64,
    },
}

impl From<WireRow> for ContextRow {
    fn from(row: WireRow) -> Self {
        match row {
            WireRow::Tuple(source, chunk, modality, score) => Self {
                source,
                chunk,
                modality,
                score,
            },
            WireRow::Named {
                source,
                chunk,
                modality,
                score,
            } => Self {
                source,
                chunk,
                modality,
                score,
            },
        }
    }
}

/// Generated answer with its supporting rows, in engine order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text
    pub text: String,

    /// Supporting context rows
    pub rows: Vec<ContextRow>,
}

impl Answer {
    pub fn new(text: impl Into<String>, rows: Vec<ContextRow>) -> Self {
        Self {
            text: text.into(),
            rows,
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for answer engines (the retrieval-augmented generation collaborator)
#[async_trait::async_trait]
pub trait AnswerEngine: Send + Sync {
    /// Answer `question` using at most `k` context rows
    async fn answer(&self, question: &str, k: usize) -> Result<Answer>;

    /// Get engine name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
