//! Inline handlers.
//!
//! A handler is registered together with the ordered list of parameter
//! names it expects. Rule-syntax matches bind arguments by name against the
//! captured variables; regex matches bind them by position, using the
//! length of the declared list as the arity.

use std::fmt;
use std::sync::Arc;

use crate::pattern::Captures;
use crate::target::{Redirect, Route};

/// What a handler decided to do with the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The handler produced the response body itself.
    Handled(String),
    /// The handler resolved the request to a route.
    Matched(Route),
    /// The handler asked for a redirect.
    Redirect(Redirect),
    /// Not actually a match; the rule walk goes on.
    Continue,
}

type HandlerFn = dyn Fn(&[Option<&str>]) -> HandlerOutcome + Send + Sync;

#[derive(Clone)]
pub struct Handler {
    params: Arc<[String]>,
    func: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F>(params: &[&str], func: F) -> Self
    where
        F: Fn(&[Option<&str>]) -> HandlerOutcome + Send + Sync + 'static,
    {
        Self {
            params: params.iter().map(|p| p.to_string()).collect(),
            func: Arc::new(func),
        }
    }

    /// Declared parameter names, in argument order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub(crate) fn call(&self) -> HandlerOutcome {
        (self.func)(&[])
    }

    pub(crate) fn call_named(&self, captures: &Captures) -> HandlerOutcome {
        let args: Vec<Option<&str>> = self
            .params
            .iter()
            .map(|name| captures.get(name).map(String::as_str))
            .collect();
        (self.func)(&args)
    }

    /// `groups[0]` is the whole match and is never passed as an argument.
    pub(crate) fn call_positional(&self, groups: &[Option<String>]) -> HandlerOutcome {
        let args: Vec<Option<&str>> = (1..=self.params.len())
            .map(|index| groups.get(index).and_then(|group| group.as_deref()))
            .collect();
        (self.func)(&args)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Handler {
        Handler::new(&["id", "page"], |args| {
            HandlerOutcome::Handled(format!("{:?}", args))
        })
    }

    #[test]
    fn test_named_binding() {
        let captures = Captures::from([
            ("page".to_string(), "3".to_string()),
            ("id".to_string(), "7".to_string()),
        ]);
        assert_eq!(
            echo().call_named(&captures),
            HandlerOutcome::Handled(r#"[Some("7"), Some("3")]"#.to_string())
        );
    }

    #[test]
    fn test_named_binding_missing() {
        let captures = Captures::from([("id".to_string(), "7".to_string())]);
        assert_eq!(
            echo().call_named(&captures),
            HandlerOutcome::Handled(r#"[Some("7"), None]"#.to_string())
        );
    }

    #[test]
    fn test_positional_binding_skips_whole_match() {
        let groups = vec![Some("new/7".to_string()), Some("7".to_string())];
        assert_eq!(
            echo().call_positional(&groups),
            HandlerOutcome::Handled(r#"[Some("7"), None]"#.to_string())
        );
    }
}
