#![doc = "repo2notion-core: core logic library for repo2notion."]

//! This crate mirrors a source repository into a tree of remote pages: one page per
//! directory, one page per eligible file holding an AI summary and the chunked source.
//! Remote services are reached only through the capability traits in [`contract`];
//! the HTTP adapters live in the `repo2notion` binary crate.
//!
//! # Usage
//! Build a [`repository::PageRepository`] and a [`summarise::GuardedSummariser`] around
//! your adapters, then call [`synchronise::synchronise`].

pub mod chunk;
pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod executor;
pub mod language;
pub mod local;
pub mod repository;
pub mod summarise;
pub mod synchronise;
