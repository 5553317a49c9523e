#![doc = "notebook-sync-core: core logic library for notebook-sync."]

//! Manifest model, item selection, CI matrix generation, notebook conversion
//! and the batch pipelines that publish tutorials to a remote workspace.
//!
//! # Usage
//! The CLI crate wires these modules to the command line and provides the HTTP
//! implementation of [`contract::Uploader`].

pub mod contract;
pub mod convert;
pub mod error;
pub mod filter;
pub mod manifest;
pub mod matrix;
pub mod metadata;
pub mod notebook;
pub mod synchronise;
