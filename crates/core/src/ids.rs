//! Identifier Aliases
//!
//! All identifiers are opaque strings minted by the agent backend. Aliases
//! keep signatures readable without imposing a newtype tax at every boundary.

/// Identifier of one conversation (one session each)
pub type ConversationId = String;

/// Identifier of one execution attempt of the agent for a conversation
pub type RunId = String;

/// Identifier of one tool invocation within a run
pub type ToolCallId = String;
