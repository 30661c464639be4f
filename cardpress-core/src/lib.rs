#![doc = "cardpress-core: deployment pipeline for digital business card sites."]

//! Builds a static site (one HTML page and one vCard per employee record,
//! plus shared assets) into a disposable staging directory and force-pushes
//! it to a GitHub repository.
//!
//! # Usage
//! Wire the collaborators from [`store`], [`render`] and [`publish`] (or your
//! own [`contract`] implementations) into a [`deploy::Deployment`] and call
//! [`deploy::Deployment::run`].

pub mod config;
pub mod contract;
pub mod deploy;
pub mod error;
pub mod outcome;
pub mod publish;
pub mod record;
pub mod render;
pub mod settings;
pub mod site;
pub mod staging;
pub mod store;
pub mod vcard;
