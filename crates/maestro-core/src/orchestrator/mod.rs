//! Turn orchestrator
//!
//! Wires the components together for one hook event:
//!
//! ```text
//! HookInput ─► prior-turn feedback ─► classify ─► threshold ─► route
//!                                                               │
//!                       ┌───────────────────────────────────────┴──────┐
//!                       ▼                                              ▼
//!                 SkillResolver                         plan ─► MultiAgentCoordinator
//!                       │                                              │
//!                       └──────────────────► HookOutput ◄──────────────┘
//! ```

mod core;
mod process;
mod types;

pub use self::core::Orchestrator;
pub use types::TurnOutcome;
