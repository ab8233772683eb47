//! Import session lifecycle states and the transition table.
//!
//! The status column on `import_sessions` is the single source of truth
//! for "whose turn it is". Every stage transition goes through the guarded
//! compare-and-swap update in `eanflow_db::SessionRepo`, and that helper
//! consults [`SessionStatus::can_transition`]; no stage re-derives the
//! allowed-states check ad hoc.

use serde::{Deserialize, Serialize};

/// The closed set of pipeline states for an import session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Uploading,
    Parsing,
    AnalyzingEan,
    WaitingColumnSelection,
    Approved,
    Converting,
    ReadyForActivation,
    Activating,
    Activated,
    Rejected,
    Failed,
}

impl SessionStatus {
    /// Database string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Parsing => "parsing",
            Self::AnalyzingEan => "analyzing_ean",
            Self::WaitingColumnSelection => "waiting_column_selection",
            Self::Approved => "approved",
            Self::Converting => "converting",
            Self::ReadyForActivation => "ready_for_activation",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }

    /// Parse from the database `status` column.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "uploading" => Some(Self::Uploading),
            "parsing" => Some(Self::Parsing),
            "analyzing_ean" => Some(Self::AnalyzingEan),
            "waiting_column_selection" => Some(Self::WaitingColumnSelection),
            "approved" => Some(Self::Approved),
            "converting" => Some(Self::Converting),
            "ready_for_activation" => Some(Self::ReadyForActivation),
            "activating" => Some(Self::Activating),
            "activated" => Some(Self::Activated),
            "rejected" => Some(Self::Rejected),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states: no automatic continuation and no operator resume
    /// except the explicit retry path.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Activated | Self::Rejected | Self::Failed)
    }

    /// In-progress states. A session stuck here longer than the staleness
    /// window is a candidate for operator retry.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Pending
                | Self::Uploading
                | Self::Parsing
                | Self::AnalyzingEan
                | Self::Converting
                | Self::Activating
        )
    }

    /// Whether moving `self` → `to` is a legal transition.
    ///
    /// Any non-terminal state may move to `Failed`. The only backward
    /// edge is the explicit retry path into `AnalyzingEan`.
    pub fn can_transition(self, to: SessionStatus) -> bool {
        if to == Self::Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, to),
            (Self::Pending, Self::Uploading)
                | (Self::Uploading, Self::Parsing)
                | (Self::Parsing, Self::AnalyzingEan)
                | (Self::AnalyzingEan, Self::Approved)
                | (Self::AnalyzingEan, Self::Rejected)
                | (Self::AnalyzingEan, Self::WaitingColumnSelection)
                | (Self::WaitingColumnSelection, Self::Approved)
                | (Self::WaitingColumnSelection, Self::Rejected)
                | (Self::Approved, Self::Converting)
                | (Self::Converting, Self::ReadyForActivation)
                | (Self::ReadyForActivation, Self::Activating)
                | (Self::Activating, Self::Activated)
                // Retry path: re-drive a stuck or failed analysis.
                | (Self::AnalyzingEan, Self::AnalyzingEan)
                | (Self::Failed, Self::AnalyzingEan)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
