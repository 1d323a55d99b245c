//! pagedrop: package HTML documents into zip archives and publish them to a
//! preview-hosting platform.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
