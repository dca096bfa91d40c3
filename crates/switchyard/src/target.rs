//! Route targets and the probe request they are dispatched with.
//!
//! The CLI has no real request pipeline. A resolved route is "dispatched"
//! by writing what matched into a [`Report`], which the command then prints.

use serde::Serialize;
use switchyard_router::{Constraints, Handler, Params};

/// The handler registered for every manifest route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: String,
    /// Pattern the target was declared with, `None` for the default route.
    pattern: Option<String>,
}

impl Target {
    pub fn route(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: Some(pattern.into()),
        }
    }

    /// The target served when nothing else matches.
    pub fn fallback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_fallback(&self) -> bool {
        self.pattern.is_none()
    }
}

/// A request to resolve.
#[derive(Debug, Clone)]
pub struct Probe {
    pub method: String,
    pub path: String,
    pub constraints: Constraints,
}

/// One captured parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

/// What a dispatched probe reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub method: String,
    pub path: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub params: Vec<Param>,
    pub fallback: bool,
}

impl<'p, 'r> Handler<&'p Probe, &'r mut Report> for Target {
    type Output = ();

    fn call(&self, probe: &'p Probe, report: &'r mut Report, params: &Params) {
        report.method = probe.method.clone();
        report.path = probe.path.clone();
        report.target = self.name.clone();
        report.pattern = self.pattern.clone();
        report.params = params
            .iter()
            .map(|(name, value)| Param {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect();
        report.fallback = self.is_fallback();
    }
}
