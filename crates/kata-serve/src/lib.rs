//! kata-serve — expose an agent to peers over HTTP
//!
//! A thin, stateless surface: an agent card for discovery and a single chat
//! endpoint that runs each task on a fresh conversation thread.

pub mod protocol;
pub mod server;

pub use protocol::{AgentCard, ChatTask, ChatTaskReply};
pub use server::AgentServer;
