//! Explicit proxy ("worker") relationships.
//!
//! A proxy subject is recorded through a delegating employee. The link lives in
//! a lookup table instead of being encoded in display names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::SubjectKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRelation {
    pub proxy_subject: SubjectKey,
    pub delegating_subject: SubjectKey,
    /// Display label for the proxy, e.g. "Ana's helper #2".
    pub label: String,
}

/// In-memory index over proxy relations.
#[derive(Debug, Clone, Default)]
pub struct ProxyDirectory {
    by_proxy: HashMap<SubjectKey, ProxyRelation>,
}

impl ProxyDirectory {
    /// Builds the directory. A later relation for the same proxy replaces an earlier one.
    pub fn new(relations: impl IntoIterator<Item = ProxyRelation>) -> Self {
        let by_proxy = relations
            .into_iter()
            .map(|relation| (relation.proxy_subject.clone(), relation))
            .collect();
        Self { by_proxy }
    }

    pub fn relation(&self, proxy: &SubjectKey) -> Option<&ProxyRelation> {
        self.by_proxy.get(proxy)
    }

    /// Proxies registered under `delegating`, ordered by proxy key.
    pub fn proxies_of(&self, delegating: &SubjectKey) -> Vec<&ProxyRelation> {
        let mut proxies: Vec<_> = self
            .by_proxy
            .values()
            .filter(|r| &r.delegating_subject == delegating)
            .collect();
        proxies.sort_by(|a, b| a.proxy_subject.cmp(&b.proxy_subject));
        proxies
    }

    /// Display name for a subject: the proxy label if any, else `fallback`.
    pub fn display_name<'a>(&'a self, subject: &SubjectKey, fallback: &'a str) -> &'a str {
        self.relation(subject).map_or(fallback, |r| r.label.as_str())
    }
}
