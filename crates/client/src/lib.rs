//! Client code for the expedition countdown.
//!
//! This crate provides the network fetch client and the offline cache
//! manager that serves the countdown page's assets.

pub mod fetch;
pub mod worker;

pub use fetch::{Destination, FetchClient, FetchConfig, FetchRequest, FetchResponse, Fetcher, RequestMode};
pub use worker::{CacheManager, Command, ManagerConfig, Reply, Served, Source, WorkerEvent, WorkerState};
