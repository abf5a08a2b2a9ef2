pub mod session;

pub use session::{
    AgentKind, NO_PROMPT_TITLE, SCHEMA_VERSION, SchemaVersion, SessionRecord, TokenTotals,
    all_agent_kinds, json_schema,
};
