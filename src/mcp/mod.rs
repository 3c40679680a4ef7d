//! MCP (Model Context Protocol) implementation.

mod handlers;
pub mod query_plan;
pub mod server;
mod tools;

pub use query_plan::{plan, QueryPlanStep};
pub use server::McpServer;
pub use tools::{Tool, ToolHandler, ToolRegistry};
