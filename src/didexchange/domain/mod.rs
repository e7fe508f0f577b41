//! Connection records, states and DID exchange messages.

mod error;
mod ids;
mod invitation;
mod messages;
mod record;
mod state;

pub use error::{DidExchangeDomainError, ParseConnectionStateError};
pub use ids::ConnectionId;
pub use invitation::Invitation;
pub use messages::{
    COMPLETE_TYPE, CompleteBody, DIDEXCHANGE_PREFIX, INVITATION_TYPE, PROBLEM_REPORT_TYPE,
    ProblemReportBody, REQUEST_TYPE, RESPONSE_TYPE, RequestBody, ResponseBody, SignedAttachment,
};
pub use record::{ConnectionRecord, PeerInfo};
pub use state::{ConnectionState, Role};
