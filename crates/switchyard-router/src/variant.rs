//! Route variants and the selection policy between them.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::constraint::{CompiledConstraint, Constraints};

/// One `{constraints, handler}` registration at a trie node for one method.
pub(crate) struct Variant<H> {
    /// Normalized pattern this variant was registered with.
    pub(crate) pattern: Arc<str>,
    /// Capture names for the captures collected on the way to this node.
    pub(crate) param_names: Arc<[String]>,
    pub(crate) constraints: Constraints,
    compiled: Arc<[CompiledConstraint]>,
    pub(crate) handler: Arc<H>,
}

// Manual impl: cloning only bumps reference counts and must not require `H: Clone`.
impl<H> Clone for Variant<H> {
    fn clone(&self) -> Self {
        Self {
            pattern: Arc::clone(&self.pattern),
            param_names: Arc::clone(&self.param_names),
            constraints: self.constraints.clone(),
            compiled: Arc::clone(&self.compiled),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H> Variant<H> {
    pub(crate) fn new(
        pattern: Arc<str>,
        param_names: Arc<[String]>,
        constraints: Constraints,
        compiled: Arc<[CompiledConstraint]>,
        handler: Arc<H>,
    ) -> Self {
        Self {
            pattern,
            param_names,
            constraints,
            compiled,
            handler,
        }
    }

    /// Whether this variant declares the same parsed constraints.
    pub(crate) fn declares(&self, compiled: &[CompiledConstraint]) -> bool {
        *self.compiled == *compiled
    }

    pub(crate) fn is_unconstrained(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Every declared constraint has a context value that satisfies it.
    /// Context keys this variant does not declare are ignored.
    fn satisfied_by(&self, context: &Constraints) -> bool {
        self.compiled.iter().all(|constraint| {
            context
                .get(&constraint.key)
                .is_some_and(|requested| constraint.value.accepts(requested))
        })
    }

    /// Preference between two satisfying variants.
    ///
    /// More declared constraints rank higher. With the same count, values
    /// are compared key by key while the keys line up; anything still tied
    /// is left to registration order.
    fn rank(&self, other: &Variant<H>) -> Ordering {
        self.compiled.len().cmp(&other.compiled.len()).then_with(|| {
            for (a, b) in self.compiled.iter().zip(other.compiled.iter()) {
                if a.key != b.key {
                    return Ordering::Equal;
                }
                let order = a.value.rank(&b.value);
                if order != Ordering::Equal {
                    return order;
                }
            }
            Ordering::Equal
        })
    }
}

/// Pick the variant that serves a request with the given constraint context.
///
/// An empty context only ever selects an unconstrained variant (the first
/// registered). A non-empty context only ever selects a constrained variant
/// whose constraints are all satisfied, the highest ranked one winning and
/// ties going to the earliest registration.
pub(crate) fn choose<'v, H>(
    variants: &'v [Variant<H>],
    context: &Constraints,
) -> Option<&'v Variant<H>> {
    if context.is_empty() {
        return variants.iter().find(|v| v.is_unconstrained());
    }

    let mut best: Option<&Variant<H>> = None;
    for candidate in variants
        .iter()
        .filter(|v| !v.is_unconstrained() && v.satisfied_by(context))
    {
        best = match best {
            Some(current) if candidate.rank(current) != Ordering::Greater => Some(current),
            _ => Some(candidate),
        };
    }
    best
}
