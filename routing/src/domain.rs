//! Host-based dispatch, resolved before any path matching.
//!
//! Lookup priority, highest first:
//! 1. the full host (`api.example.com`)
//! 2. the subdomain part (`a.b` for `a.b.example.com`)
//! 3. `*.<label>` where `<label>` is the label left of the registrable
//!    domain, when a further label exists (`x` is captured for `x.a.example.com`)
//! 4. `*`, when a subdomain label exists and is not `www` (that label is captured)

use std::collections::HashMap;

use crate::handler::Handler;

#[derive(Clone, Debug)]
pub enum DomainTarget {
    /// Bind the module.
    Module(String),
    /// Bind the module and merge the query string into the request. A `*`
    /// value is replaced with the captured wildcard label.
    ModuleWithQuery(String, String),
    /// Run the handler instead of path dispatch.
    Handler(Handler),
}

#[derive(Debug)]
pub(crate) struct DomainMatch<'a> {
    pub target: &'a DomainTarget,
    pub wildcard: Option<&'a str>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct DomainTable {
    rules: HashMap<String, DomainTarget>,
}

impl DomainTable {
    pub(crate) fn insert(&mut self, pattern: String, target: DomainTarget) {
        self.rules.insert(pattern, target);
    }

    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }

    pub(crate) fn resolve<'a>(&'a self, host: &'a str) -> Option<DomainMatch<'a>> {
        if let Some(target) = self.rules.get(host) {
            return Some(DomainMatch {
                target,
                wildcard: None,
            });
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() <= 2 {
            return None;
        }
        let sub_labels = &labels[..labels.len() - 2];
        let second = sub_labels[sub_labels.len() - 1];
        let third = sub_labels.len().checked_sub(2).map(|i| sub_labels[i]);

        if let Some(target) = self.rules.get(&sub_labels.join(".")) {
            return Some(DomainMatch {
                target,
                wildcard: None,
            });
        }

        if let Some(third) = third
            && !third.is_empty()
            && let Some(target) = self.rules.get(&format!("*.{second}"))
        {
            return Some(DomainMatch {
                target,
                wildcard: Some(third),
            });
        }

        if !second.is_empty()
            && second != "www"
            && let Some(target) = self.rules.get("*")
        {
            return Some(DomainMatch {
                target,
                wildcard: Some(second),
            });
        }

        None
    }
}
