use core::str::FromStr;

use serde::{Deserialize, Serialize};

use accessdesk_core::DomainError;

/// Lifecycle status of an access request.
///
/// ```text
/// Pending ──┬──▶ Approved
///           ├──▶ Rejected
///           └──▶ Cancelled
/// ```
///
/// Every non-pending status is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl core::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "cancelled" | "canceled" => Ok(RequestStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown status '{other}'"))),
        }
    }
}

/// A reviewer's decision: the only way out of `Pending`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Approve,
    Reject,
    Cancel,
}

impl Decision {
    pub fn target_status(&self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
            Decision::Cancel => RequestStatus::Cancelled,
        }
    }
}

impl TryFrom<RequestStatus> for Decision {
    type Error = DomainError;

    fn try_from(status: RequestStatus) -> Result<Self, Self::Error> {
        match status {
            RequestStatus::Approved => Ok(Decision::Approve),
            RequestStatus::Rejected => Ok(Decision::Reject),
            RequestStatus::Cancelled => Ok(Decision::Cancel),
            RequestStatus::Pending => Err(DomainError::validation(
                "a decision must be Approved, Rejected or Cancelled",
            )),
        }
    }
}
