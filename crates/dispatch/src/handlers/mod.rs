pub mod agent_ops;
pub mod analysis;
pub mod cookies;
pub mod script;
pub mod storage;
pub mod tabs;
pub mod waits;
