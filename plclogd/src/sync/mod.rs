pub mod event_log;
pub mod paths;
pub mod poller;
pub mod registry;
pub mod transfer;
