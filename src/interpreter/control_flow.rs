use crate::value::Value;

/// How a statement finished. `Break` and `Continue` travel up to the
/// nearest enclosing loop frame; exceptions travel separately as the `Err`
/// arm of the evaluator's `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Normal,
    Return(Value),
    Break,
    Continue,
}

impl Signal {
    pub fn is_normal(&self) -> bool {
        matches!(self, Signal::Normal)
    }
}
