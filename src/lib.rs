//! ClubMind - Conversational memory and knowledge federation core
//!
//! ClubMind is the stateful heart of the club finance dashboard
//! assistant: it keeps durable per-user conversational state across
//! multi-turn interactions and answers knowledge queries by federating a
//! fast public source with a secure, role-gated financial source.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      AssistantService                          │
//! │   (action surface handed to the external endpoint layer)      │
//! │                                                                │
//! │  ┌──────────────────────────┐   ┌──────────────────────────┐   │
//! │  │     Session side         │   │     Knowledge side       │   │
//! │  │  SessionManager          │   │  SensitivityClassifier   │   │
//! │  │   ├─ ConversationLog ────┼─┐ │  AccessPolicy            │   │
//! │  │   ├─ ContextTracker      │ │ │  KnowledgeRouter         │   │
//! │  │   └─ AnalyticsAggregator │ │ │   ├─ StaticPublicSource  │   │
//! │  │  SessionStore            │ │ │   └─ StaticSecureSource  │   │
//! │  │   ├─ primary backend     │ │ │  ResultRanker            │   │
//! │  │   └─ local fallback      │ │ └──────────────────────────┘   │
//! │  └──────────────────────────┘ │                                │
//! │                               ▼                                │
//! │                EmbeddingProvider → SemanticIndex               │
//! │                (per-club vector recall, write-once)            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every turn: load/create the session, classify the query, gate the
//! secure source by role, fan out, rank the merged results, append to the
//! conversation log, update context and counters, persist with a renewed
//! TTL. If the primary session store is unreachable the stack degrades,
//! one-way, to the local fallback — quality degrades, availability does
//! not.
//!
//! ## Modules
//!
//! - [`service`]: action-based RPC surface
//! - [`session`]: session model, stores, log, context, analytics
//! - [`knowledge`]: classification, authorization, routing, ranking
//! - [`semantic`]: tenant-scoped vector similarity index
//! - [`embedding`]: pluggable text embedding
//! - [`config`]: configuration management

pub mod config;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod semantic;
pub mod service;
pub mod session;

pub use config::ClubMindConfig;
pub use error::{Error, Result};
pub use service::{AssistantService, HealthStatus};
