//! Agent roles and the invocation contract.

mod call;
mod invoker;
mod role;

pub use call::call_bounded;
pub use invoker::{AgentInput, AgentInvoker, AgentReply, InputPurpose, RefereeBrief};
pub use role::AgentRole;
