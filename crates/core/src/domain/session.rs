use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::sales::SalesProgress;
use crate::flows::{FlowState, FlowType};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalProgress {
    /// The customer's first message; every knowledge-base query uses it.
    pub issue: String,
    pub attempts: u32,
    pub resolved: bool,
    pub state: FlowState,
}

impl TechnicalProgress {
    pub fn new(issue: impl Into<String>) -> Self {
        Self { issue: issue.into(), attempts: 0, resolved: false, state: FlowState::New }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureProgress {
    pub description: String,
    pub state: FlowState,
}

impl FeatureProgress {
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into(), state: FlowState::New }
    }

    pub fn append_details(&mut self, details: &str) {
        self.description.push(' ');
        self.description.push_str(details);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowProgress {
    Technical(TechnicalProgress),
    Sales(SalesProgress),
    Feature(FeatureProgress),
}

impl FlowProgress {
    pub fn flow_type(&self) -> FlowType {
        match self {
            Self::Technical(_) => FlowType::Technical,
            Self::Sales(_) => FlowType::Sales,
            Self::Feature(_) => FlowType::Feature,
        }
    }
}

/// Conversation history plus the single in-flight flow record for one customer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    turns: Vec<Turn>,
    progress: Option<FlowProgress>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self { id, turns: Vec::new(), progress: None }
    }

    pub fn record_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `count` turns in chronological order.
    pub fn recent_turns(&self, count: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(count);
        &self.turns[start..]
    }

    pub fn progress(&self) -> Option<&FlowProgress> {
        self.progress.as_ref()
    }

    pub fn active_flow(&self) -> Option<FlowType> {
        self.progress.as_ref().map(FlowProgress::flow_type)
    }

    /// Starts a flow, replacing whatever progress the session held.
    pub fn begin(&mut self, progress: FlowProgress) {
        self.progress = Some(progress);
    }

    pub fn clear_progress(&mut self) -> Option<FlowProgress> {
        self.progress.take()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::sales::SalesProgress;
    use crate::domain::session::{
        FeatureProgress, FlowProgress, Role, Session, SessionId, TechnicalProgress, Turn,
    };
    use crate::flows::{FlowState, FlowType};

    #[test]
    fn recent_turns_returns_tail_in_order() {
        let mut session = Session::new(SessionId::from("s1"));
        for index in 0..5 {
            session.record_turn(Turn::user(format!("message {index}")));
        }

        let recent = session.recent_turns(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "message 2");
        assert_eq!(recent[2].content, "message 4");
        assert_eq!(session.recent_turns(10).len(), 5);
    }

    #[test]
    fn beginning_a_flow_replaces_previous_progress() {
        let mut session = Session::new(SessionId::from("s1"));
        session.begin(FlowProgress::Technical(TechnicalProgress::new("printer offline")));
        assert_eq!(session.active_flow(), Some(FlowType::Technical));

        session.begin(FlowProgress::Sales(SalesProgress::default()));
        assert_eq!(session.active_flow(), Some(FlowType::Sales));
        assert!(matches!(session.progress(), Some(FlowProgress::Sales(_))));
    }

    #[test]
    fn clearing_progress_leaves_history_intact() {
        let mut session = Session::new(SessionId::from("s1"));
        session.record_turn(Turn::user("dark mode please"));
        session.begin(FlowProgress::Feature(FeatureProgress::new("dark mode please")));

        let cleared = session.clear_progress().expect("feature progress");
        assert!(matches!(
            cleared,
            FlowProgress::Feature(FeatureProgress { state: FlowState::New, .. })
        ));
        assert!(session.active_flow().is_none());
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.turns()[0].role, Role::User);
    }

    #[test]
    fn feature_details_are_space_appended() {
        let mut progress = FeatureProgress::new("export to csv");
        progress.append_details("with headers");
        assert_eq!(progress.description, "export to csv with headers");
    }

    #[test]
    fn session_id_serializes_transparently() {
        let id = SessionId::from("abc-123");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"abc-123\"");
        assert_eq!(id.to_string(), "abc-123");
    }
}
