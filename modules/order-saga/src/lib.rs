pub mod clients;
pub mod config;
pub mod db;
pub mod health;
pub mod ledger;
pub mod listener;
pub mod models;
pub mod outbox;
pub mod poller;
pub mod retry;
pub mod saga;
pub mod worker;
