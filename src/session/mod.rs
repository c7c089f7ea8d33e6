//! Session management — data model, stores, conversation log and rollups
//!
//! One [`Session`] tracks a continuous conversation between a user and the
//! assistant, scoped to a club (tenant). Sessions are persisted through a
//! degrading two-store stack (see [`store`]) and mutated exclusively through
//! the [`SessionManager`] read-modify-write path.

pub mod analytics;
pub mod context;
pub mod log;
pub mod manager;
pub mod store;

pub use analytics::AnalyticsAggregator;
pub use context::ContextTracker;
pub use log::{ConversationLog, MessageDraft};
pub use manager::SessionManager;
pub use store::{LocalSessionStore, MemoryBackend, SessionBackend, SessionStore};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Current time in Unix milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One continuous tracked conversation between a user and the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (unique per club)
    pub session_id: String,
    /// Club (tenant) this session belongs to
    pub tenant_id: String,
    /// User ID
    pub user_id: String,
    /// Creation timestamp (Unix millis)
    pub created_at: i64,
    /// Last activity timestamp, monotonically non-decreasing
    pub last_active_at: i64,
    /// Conversation flow state
    pub conversation: ConversationFlow,
    /// Mutable current-focus context
    pub context: SessionContext,
    /// User preferences, set at creation and never auto-mutated
    pub preferences: Preferences,
    /// Per-session counters
    pub analytics: SessionAnalytics,
}

impl Session {
    /// Create a new session in the `Greeting` state
    pub fn new(tenant_id: &str, user_id: &str, preferences: Option<Preferences>) -> Self {
        let now = now_millis();
        Self {
            session_id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            last_active_at: now,
            conversation: ConversationFlow::default(),
            context: SessionContext::default(),
            preferences: preferences.unwrap_or_default(),
            analytics: SessionAnalytics::default(),
        }
    }

    /// Refresh the activity timestamp, never moving it backwards
    pub fn touch(&mut self) {
        self.last_active_at = self.last_active_at.max(now_millis());
    }

    /// Whether the session has been explicitly ended
    pub fn is_ended(&self) -> bool {
        self.conversation.state == ConversationState::Ended
    }

    /// Session duration so far in milliseconds
    pub fn duration_ms(&self) -> i64 {
        self.last_active_at - self.created_at
    }
}

/// Multi-turn conversation flow attached to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationFlow {
    /// Append-only message log, never reordered or mutated
    pub messages: Vec<Message>,
    /// Topic currently under discussion
    pub current_topic: Option<String>,
    /// Last recognized intent
    pub intent: Option<String>,
    /// Whether the assistant is waiting on the user
    pub awaiting_response: bool,
    /// Conversation state machine position
    pub state: ConversationState,
}

impl Default for ConversationFlow {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            current_topic: None,
            intent: None,
            awaiting_response: false,
            state: ConversationState::Greeting,
        }
    }
}

/// Conversation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Session just created, no turns yet
    Greeting,
    /// Normal multi-turn exchange
    Active,
    /// Assistant asked a clarifying question
    Clarifying,
    /// Terminal: session explicitly ended
    Ended,
}

impl ConversationState {
    /// Terminal states accept no further writes through the manager
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationState::Ended)
    }
}

/// A single conversation message, immutable once appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message ID
    pub id: String,
    /// Assignment timestamp (Unix millis), non-decreasing per session
    pub timestamp: i64,
    /// Who produced the message
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// Recognized intent, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Structured payload attached by the endpoint layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Structured message payloads
///
/// A closed set of known shapes plus one explicit opaque-extension variant
/// for payloads this core does not interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageMetadata {
    /// Reference to a dashboard chart the message talks about
    ChartRef {
        chart_id: String,
    },
    /// Speech pipeline transcript confidence
    VoiceTranscript {
        confidence: f32,
    },
    /// Outcome of a dashboard action triggered by the assistant
    ActionResult {
        action: String,
        success: bool,
    },
    /// Uninterpreted extension payload
    Opaque {
        data: serde_json::Value,
    },
}

/// Mutable current-focus state driving highlighting and intent continuity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionContext {
    /// Focus anchors (entities/metrics the conversation is centered on)
    pub focus: Vec<String>,
    /// Active dashboard scenario
    pub active_scenario: Scenario,
    /// Display hint: at most one highlighted entity, `None` clears it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_entity: Option<String>,
    /// Free-text label of the last recorded action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
}

/// Dashboard scenario the conversation is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    #[default]
    Overview,
    Squad,
    Budget,
    Transfers,
    Matchday,
}

/// Field-level partial update for [`SessionContext`]
///
/// `highlighted_entity` is intentionally absent: set-or-clear goes through
/// `highlight_entity`, which distinguishes "clear" from "leave unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_scenario: Option<Scenario>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
}

/// User preferences, fixed at session creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Response verbosity
    pub response_style: ResponseStyle,
    /// Depth of financial analysis in answers
    pub analysis_depth: AnalysisDepth,
    /// Whether voice output is enabled
    pub voice_enabled: bool,
    /// Metrics the user wants surfaced first
    pub preferred_metrics: Vec<String>,
    /// Alert thresholds on named metrics
    pub alert_thresholds: Vec<AlertThreshold>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            response_style: ResponseStyle::Conversational,
            analysis_depth: AnalysisDepth::Standard,
            voice_enabled: false,
            preferred_metrics: Vec::new(),
            alert_thresholds: Vec::new(),
        }
    }
}

/// Response verbosity preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    Concise,
    Detailed,
    Conversational,
}

/// Analysis depth preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisDepth {
    Summary,
    Standard,
    Deep,
}

/// Alert threshold on a named metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    /// Metric name (e.g. "wage_to_revenue_ratio")
    pub metric: String,
    /// Value at which to alert
    pub value: f64,
}

/// Per-session counters, monotonically non-decreasing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionAnalytics {
    /// Total messages appended to this session
    pub total_messages: u64,
    /// Intent -> occurrence count
    pub common_queries: HashMap<String, u64>,
    /// Action label -> occurrence count
    pub successful_actions: HashMap<String, u64>,
    /// Topic -> occurrence count
    pub preferred_topics: HashMap<String, u64>,
}

/// Lifetime statistics for one user, recomputed on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnalytics {
    /// User ID
    pub user_id: String,
    /// Number of sessions found for the user
    pub total_sessions: u64,
    /// Messages summed across sessions
    pub total_messages: u64,
    /// Mean of (last_active_at - created_at) across sessions
    pub avg_session_duration_ms: i64,
    /// Intent -> count, summed across sessions
    pub common_queries: HashMap<String, u64>,
    /// Action label -> count, summed across sessions
    pub successful_actions: HashMap<String, u64>,
    /// Topic -> count, summed across sessions
    pub preferred_topics: HashMap<String, u64>,
}
