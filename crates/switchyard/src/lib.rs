//! Library side of the `switchyard` CLI: route manifests and the targets
//! their routes dispatch to.

pub mod manifest;
pub mod target;

pub use manifest::{CheckOutcome, ManifestError, MethodSpec, RouteManifest, RouteSpec};
pub use target::{Param, Probe, Report, Target};
