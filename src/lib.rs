//! Packaging pipeline for automation-script distributions.
//!
//! This crate builds the distribution archives for a set of automation
//! scripts that run inside a host asset-management platform. One run is a
//! linear pipeline:
//!
//! ```text
//! preflight ─ compile ─ archive ─ assemble ─ verify ─ pack ─ unpack ─ repack ─ cleanup
//!                │          │         │         │               │        │
//!                │          │         │         │               │        └── 4 final archives
//!                │          │         │         │               └── scratch tree
//!                │          │         │         └── scriptConfig validation
//!                │          │         └── install-layout staging tree
//!                │          └── <product>.jar with metadata header
//!                └── javac against compile-only platform jars
//! ```
//!
//! The four final artifacts are the full zip and tarball (everything
//! needed to install, compiled code included) and the release zip and
//! tarball (raw platform-facing assets only; the compiled archive, the
//! application-install subtree, and example content are filtered out by
//! explicit glob rule sets shared across both container formats).
//!
//! Archive writers normalize entry order, timestamps, and modes, so
//! re-running the pipeline with unchanged inputs reproduces the artifacts
//! byte for byte.

pub mod artifact;
pub mod filter;
pub mod pipeline;
pub mod preflight;
pub mod script;

pub use pipeline::config::{load_config, DistConfig};
pub use pipeline::paths::DistPaths;
pub use pipeline::{clean, run_build, BuildSummary};
