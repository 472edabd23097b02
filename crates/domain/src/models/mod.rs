//! Domain models for the Sales Team backend.

pub mod assignment;
pub mod group;
pub mod member;

pub use assignment::{
    AssignmentAction, AssignmentBoard, AssignmentConflict, AssignmentOutcome, AssignmentRequest,
    FailedAssignment, GroupSummary, ManagerRow,
};
pub use group::{DirectoryGroup, GroupRef, NewChildGroup};
pub use member::{MemberWithGroups, OrgMember, UserSummary};
