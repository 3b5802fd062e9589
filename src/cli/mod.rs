pub mod app;
mod commands;
mod config;
mod context;
mod dispatch;
mod env;
mod output;
mod run;
mod selectors;
