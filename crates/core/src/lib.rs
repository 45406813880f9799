pub mod catalog;
pub mod chat;
pub mod config;
pub mod engine;
pub mod magnet;
pub mod storage;
pub mod testing;
pub mod transmission;

pub use catalog::{register_commands, CommandDeps};
pub use chat::{ChatId, Incoming, Keyboard, Outgoing, UserId};
pub use config::{
    load_config, load_config_from_str, validate_config, BackendErrorPolicy, Config, ConfigError,
    DownloadsConfig, SanitizedConfig,
};
pub use engine::{
    CommandReply, ConversationEngine, EngineBuilder, EngineError, Session, StateId, StateRegistry,
};
pub use storage::{DfStorageReporter, StorageError, StorageReporter};
pub use transmission::{
    AddedTorrent, TorrentControl, TorrentControlError, TorrentFileRef, TorrentState,
    TorrentSummary, TransmissionClient,
};
