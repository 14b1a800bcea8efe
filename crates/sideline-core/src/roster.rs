/// Joined/left difference between two roster snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDiff {
    pub joined: Vec<String>,
    pub left: Vec<String>,
}

impl RosterDiff {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Participant list for one session, driven by store change-feed snapshots.
///
/// Updated by the controllers' watch tasks. Read by host UI layers.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: Vec<String>,
    local_token: Option<String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_local_token(&mut self, token: String) {
        self.local_token = Some(token);
    }

    pub fn local_token(&self) -> Option<&str> {
        self.local_token.as_deref()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.participants.iter().any(|p| p == token)
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    fn is_local(&self, token: &str) -> bool {
        self.local_token.as_deref() == Some(token)
    }

    /// Replace the roster with a store snapshot, reporting who changed.
    /// The local member is tracked but never reported in the diff.
    pub fn apply_snapshot(&mut self, snapshot: &[String]) -> RosterDiff {
        let joined = snapshot
            .iter()
            .filter(|token| !self.contains(token) && !self.is_local(token))
            .cloned()
            .collect();
        let left = self
            .participants
            .iter()
            .filter(|token| !snapshot.contains(token) && !self.is_local(token))
            .cloned()
            .collect();
        self.participants = snapshot.to_vec();
        RosterDiff { joined, left }
    }

    pub fn clear(&mut self) {
        self.participants.clear();
        self.local_token = None;
    }
}
