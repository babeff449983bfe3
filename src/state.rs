// Session state shared by every feature on the browsing screen.
// Plain data; mutation happens only in modules::store::reduce.

use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct ReaderState {
    /// The engine found an article it can reflow.
    pub readerable: bool,
    /// Reader view is currently shown.
    pub active: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub id: String,
    pub url: String,
    pub title: String,
    pub loading: bool,
    /// Completed page loads so far. Observers compare it across states, so a
    /// load that starts and finishes between two notifications is still seen.
    #[serde(default)]
    pub load_count: u64,
    pub private: bool,
    pub history: Vec<String>,
    pub history_index: usize,
    pub reader: ReaderState,
}

impl SessionState {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: id.into(),
            url: url.clone(),
            title: String::new(),
            loading: false,
            load_count: 0,
            private: false,
            history: vec![url],
            history_index: 0,
            reader: ReaderState::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn can_go_back(&self) -> bool {
        self.history_index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.history_index + 1 < self.history.len()
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct BrowserState {
    pub sessions: Vec<SessionState>,
    pub selected_session_id: Option<String>,
}

impl BrowserState {
    pub fn find_session(&self, id: &str) -> Option<&SessionState> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn selected_session(&self) -> Option<&SessionState> {
        self.selected_session_id
            .as_deref()
            .and_then(|id| self.find_session(id))
    }

    /// The session a screen bound to `session_id` displays: that session when
    /// given, otherwise the selected one. A stale id resolves to nothing.
    pub fn find_custom_or_selected(&self, session_id: Option<&str>) -> Option<&SessionState> {
        match session_id {
            Some(id) => self.find_session(id),
            None => self.selected_session(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> BrowserState {
        BrowserState {
            sessions: vec![
                SessionState::new("x", "https://x.org/"),
                SessionState::new("y", "https://y.org/"),
            ],
            selected_session_id: Some("y".to_string()),
        }
    }

    #[test]
    fn test_find_custom_or_selected() {
        let state = state();
        assert_eq!(state.find_custom_or_selected(None).unwrap().id, "y");
        assert_eq!(state.find_custom_or_selected(Some("x")).unwrap().id, "x");
        assert!(state.find_custom_or_selected(Some("abc")).is_none());
    }

    #[test]
    fn test_navigation_availability() {
        let mut session = SessionState::new("x", "https://a.org/");
        assert!(!session.can_go_back());
        assert!(!session.can_go_forward());

        session.history.push("https://b.org/".to_string());
        session.history_index = 1;
        assert!(session.can_go_back());
        assert!(!session.can_go_forward());

        session.history_index = 0;
        assert!(session.can_go_forward());
    }
}
