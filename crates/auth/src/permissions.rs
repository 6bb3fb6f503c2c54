use serde::{Deserialize, Serialize};

/// An action subject to the authorization policy.
///
/// Each action has a stable permission name (e.g. "requests.decide") used in
/// logs and audit explanations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateSoftware,
    ReadSoftware,
    /// Create an access request naming the caller as requester.
    CreateAccessRequest,
    /// Read a user's own access requests (reviewers may read anyone's).
    ReadOwnAccessRequests,
    ListPendingAccessRequests,
    /// Approve, reject or cancel a pending request.
    TransitionAccessRequest,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::CreateSoftware,
        Action::ReadSoftware,
        Action::CreateAccessRequest,
        Action::ReadOwnAccessRequests,
        Action::ListPendingAccessRequests,
        Action::TransitionAccessRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateSoftware => "software.create",
            Action::ReadSoftware => "software.read",
            Action::CreateAccessRequest => "requests.create",
            Action::ReadOwnAccessRequests => "requests.read_own",
            Action::ListPendingAccessRequests => "requests.list_pending",
            Action::TransitionAccessRequest => "requests.decide",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
