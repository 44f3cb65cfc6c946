#![doc = "mdx-docs-core: conversion and publishing pipeline for mdx-docs."]

//! This crate holds the document → MDX pipeline and the pull request workflow,
//! independent of any particular model provider or hosting API.
//!
//! # Usage
//! Build a [`convert::DocumentConverter`] and a [`publish::Publisher`] from
//! implementations of the traits in [`contract`]; the `mdx-docs` crate
//! supplies the Gemini and GitHub ones.

pub mod components;
pub mod config;
pub mod contract;
pub mod convert;
pub mod enhance;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod publish;
pub mod rewrite;
