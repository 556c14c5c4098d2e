pub mod cli;
pub mod config;
pub mod engine;
pub mod fusion;
pub mod history;
pub mod htaccess;
pub mod install;
pub mod launch;
pub mod naming;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod util;
