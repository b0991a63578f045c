//! Queued message variants
//!
//! The two actors share one queue contract: a current node, a remaining TTL,
//! and a subject event. Agents are owned by whichever queue they sit in;
//! requests are tracked by the simulation loop for their resend/abandon
//! lifecycle, so queues hold them by id.

use crate::agent::Agent;
use crate::types::RequestId;

#[derive(Debug, Clone)]
pub enum Message {
    /// Random-walk knowledge disseminator, moved by value between queues
    Agent(Agent),
    /// Search/backtrack actor, resolved through the simulation's request set
    Request(RequestId),
}

impl Message {
    pub fn is_agent(&self) -> bool {
        matches!(self, Message::Agent(_))
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }
}
