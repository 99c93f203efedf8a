//! The ordered, editable list of filter stages.
//!
//! Stages are addressed by their [`FilterId`], never by position, so a
//! caller holding an id keeps pointing at the same stage no matter what
//! is inserted or removed around it.

use serde::{Deserialize, Serialize};

use crate::filter::{FilterId, FilterKind, FilterStage};

/// An ordered sequence of filter stages with chain-local id allocation.
///
/// Ids are handed out from a counter owned by the chain: they strictly
/// increase and are never reused, even after [`clear`](Self::clear).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    stages: Vec<FilterStage>,
    next_id: u64,
}

impl FilterChain {
    /// An empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stages: Vec::new(),
            next_id: 0,
        }
    }

    /// Build a chain from a serializable description.
    ///
    /// Each entry goes through [`add_filter`](Self::add_filter) and, when
    /// it carries a parameter, [`set_parameter`](Self::set_parameter), so
    /// out-of-range values are normalized exactly as interactive edits
    /// would be.
    #[must_use]
    pub fn from_spec(spec: &ChainSpec) -> Self {
        let mut chain = Self::new();
        for stage in &spec.0 {
            let id = chain.add_filter(stage.kind);
            if let Some(k) = stage.k {
                chain.set_parameter(id, k);
            }
        }
        chain
    }

    /// Describe the current stages (kind and parameter, in order).
    #[must_use]
    pub fn to_spec(&self) -> ChainSpec {
        ChainSpec(
            self.stages
                .iter()
                .map(|stage| StageSpec {
                    kind: stage.kind(),
                    k: Some(i64::from(stage.k())),
                })
                .collect(),
        )
    }

    /// Append a stage of `kind` with its default parameter.
    pub fn add_filter(&mut self, kind: FilterKind) -> FilterId {
        let id = FilterId::new(self.next_id);
        self.next_id += 1;
        self.stages.push(FilterStage::new(id, kind));
        self.check_ids();
        tracing::debug!(%id, %kind, "added filter stage");
        id
    }

    /// Remove the stage with `id`, returning it.
    ///
    /// An unknown id leaves the chain untouched and returns `None`.
    pub fn remove_filter(&mut self, id: FilterId) -> Option<FilterStage> {
        let index = self.stages.iter().position(|stage| stage.id() == id)?;
        let removed = self.stages.remove(index);
        self.check_ids();
        tracing::debug!(%id, kind = %removed.kind(), "removed filter stage");
        Some(removed)
    }

    /// Normalize `raw` into the stage's bounds and store it.
    ///
    /// Returns the stored value, or `None` (and changes nothing) when no
    /// stage has `id`.
    pub fn set_parameter(&mut self, id: FilterId, raw: i64) -> Option<u32> {
        let stage = self.stages.iter_mut().find(|stage| stage.id() == id)?;
        let k = stage.set_k(raw);
        tracing::debug!(%id, raw, k, "set filter parameter");
        Some(k)
    }

    /// Remove every stage. Ids issued afterwards still exceed all earlier ones.
    pub fn clear(&mut self) {
        self.stages.clear();
    }

    /// Stages in application order.
    #[must_use]
    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// The stage with `id`, if present.
    #[must_use]
    pub fn get(&self, id: FilterId) -> Option<&FilterStage> {
        self.stages.iter().find(|stage| stage.id() == id)
    }

    /// Number of stages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if the chain has no stages.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn check_ids(&self) {
        let mut ids: Vec<FilterId> = self.stages.iter().map(FilterStage::id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(
            ids.len(),
            self.stages.len(),
            "filter chain holds duplicate stage ids"
        );
    }
}

/// Serializable description of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Which filter to apply.
    pub kind: FilterKind,
    /// Raw parameter; the kind's default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<i64>,
}

/// Serializable description of a whole chain, e.g.
/// `[{"kind":"threshold","k":127},{"kind":"erosion"}]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainSpec(pub Vec<StageSpec>);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn kinds(chain: &FilterChain) -> Vec<FilterKind> {
        chain.stages().iter().map(FilterStage::kind).collect()
    }

    #[test]
    fn new_chain_is_empty() {
        let chain = FilterChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn add_appends_with_default_parameter() {
        let mut chain = FilterChain::new();
        let a = chain.add_filter(FilterKind::Threshold);
        let b = chain.add_filter(FilterKind::GaussianThreshold);
        assert_eq!(kinds(&chain), vec![FilterKind::Threshold, FilterKind::GaussianThreshold]);
        assert_eq!(chain.get(a).unwrap().k(), 3);
        assert_eq!(chain.get(b).unwrap().k(), 31);
        assert!(b > a);
    }

    #[test]
    fn add_then_remove_restores_previous_chain() {
        let mut chain = FilterChain::new();
        chain.add_filter(FilterKind::Erosion);
        let before = chain.to_spec();

        let id = chain.add_filter(FilterKind::Invert);
        let removed = chain.remove_filter(id).unwrap();
        assert_eq!(removed.kind(), FilterKind::Invert);
        assert_eq!(chain.to_spec(), before);
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut chain = FilterChain::new();
        let id = chain.add_filter(FilterKind::Lab);
        chain.remove_filter(id);
        let snapshot = chain.clone();
        assert!(chain.remove_filter(id).is_none());
        assert_eq!(chain, snapshot);
    }

    #[test]
    fn interior_removal_keeps_order() {
        let mut chain = FilterChain::new();
        chain.add_filter(FilterKind::Threshold);
        let middle = chain.add_filter(FilterKind::Dilation);
        chain.add_filter(FilterKind::Laplacian);
        chain.remove_filter(middle);
        assert_eq!(kinds(&chain), vec![FilterKind::Threshold, FilterKind::Laplacian]);
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut chain = FilterChain::new();
        let first = chain.add_filter(FilterKind::Opening);
        chain.remove_filter(first);
        let second = chain.add_filter(FilterKind::Opening);
        assert_ne!(first, second);
    }

    #[test]
    fn clear_keeps_id_counter() {
        let mut chain = FilterChain::new();
        let old: Vec<_> = (0..3).map(|_| chain.add_filter(FilterKind::Closing)).collect();
        chain.clear();
        assert!(chain.is_empty());
        let new = chain.add_filter(FilterKind::Closing);
        assert!(old.iter().all(|id| new > *id));
    }

    #[test]
    fn set_parameter_normalizes() {
        let mut chain = FilterChain::new();
        let id = chain.add_filter(FilterKind::Hsv);
        assert_eq!(chain.set_parameter(id, 36), Some(37));
        assert_eq!(chain.set_parameter(id, 0), Some(31));
        assert_eq!(chain.set_parameter(id, 1000), Some(255));
        assert_eq!(chain.get(id).unwrap().k(), 255);

        let morph = chain.add_filter(FilterKind::TopHat);
        assert_eq!(chain.set_parameter(morph, 200), Some(101));
    }

    #[test]
    fn set_parameter_on_unknown_id_changes_nothing() {
        let mut chain = FilterChain::new();
        let id = chain.add_filter(FilterKind::CannyEdges);
        chain.remove_filter(id);
        let keep = chain.add_filter(FilterKind::CannyEdges);
        assert_eq!(chain.set_parameter(id, 99), None);
        assert_eq!(chain.get(keep).unwrap().k(), 3);
    }

    #[test]
    fn from_spec_normalizes_parameters() {
        let spec: ChainSpec = serde_json::from_str(
            r#"[{"kind":"threshold","k":128},{"kind":"black-hat"},{"kind":"gaussian-threshold","k":4}]"#,
        )
        .unwrap();
        let chain = FilterChain::from_spec(&spec);
        let params: Vec<u32> = chain.stages().iter().map(FilterStage::k).collect();
        assert_eq!(params, vec![129, 3, 31]);
        assert_eq!(kinds(&chain)[1], FilterKind::BlackHat);
    }

    #[test]
    fn to_spec_serializes_every_parameter() {
        let mut chain = FilterChain::new();
        chain.add_filter(FilterKind::Invert);
        let json = serde_json::to_string(&chain.to_spec()).unwrap();
        assert_eq!(json, r#"[{"kind":"invert","k":3}]"#);
    }
}
