//! Conformance engine for XBRL Taxonomy Packages.
//!
//! Regulatory publishers distribute taxonomy packages that violate one or
//! more structural rules of the Taxonomy Packages specification: no zip
//! container, no single top-level directory, no `META-INF` descriptors, or
//! an internal layout with dangling cross-taxonomy references. The engine
//! classifies the defects ([`inspect`]), selects a publisher-specific repair
//! policy ([`fixers`]), and drives a linear repair pipeline ([`pipeline`])
//! over an extracted working copy ([`package`]), regenerating the two
//! descriptor files ([`descriptors`]) from the repaired on-disk layout.

pub mod cli;
pub mod descriptors;
pub mod entrypoints;
pub mod fixers;
pub mod inspect;
pub mod package;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod rewrite;
pub mod util;
