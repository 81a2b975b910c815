//! Change-driven build and deploy for monorepos.
//!
//! Given the files changed in a working directory, monodeploy selects the
//! actions (independently deployable units) that own any of them, builds each
//! into its own directory under a freshly reset output directory, and deploys
//! the ones that built. One failing action never stops the others.
//!
//! - **[`core`]**: pure, deterministic logic (ownership rules, selection,
//!   outcomes). No I/O.
//! - **[`io`]**: git, processes, manifests, the output directory, deploy
//!   targets. Behind traits so runs can be driven by fakes in tests.
//! - **[`run`]**: the orchestrator tying both together for one run.

pub mod action;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
