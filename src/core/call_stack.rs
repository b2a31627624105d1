use super::Statement;

/// Tracks the method invocations that are still open in the trace.
///
/// Invoke statements are pushed as they are seen and popped by the next
/// return. The `called` attribute of the top frame is the entity that is
/// currently executing.
#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<Statement>,
    root_entity: String,
}

impl CallStack {
    pub fn new(root_entity: impl Into<String>) -> Self {
        Self {
            frames: Vec::new(),
            root_entity: root_entity.into(),
        }
    }

    pub fn push(&mut self, invoke: Statement) {
        self.frames.push(invoke);
    }

    /// Remove the most recent open invocation, if any
    pub fn pop(&mut self) -> Option<Statement> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Statement> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Entity executing right now, falling back to the traced root entity
    pub fn current_caller(&self) -> &str {
        self.top()
            .and_then(|frame| frame.attribute("called"))
            .unwrap_or(&self.root_entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StatementKind;

    fn invoke(called: &str) -> Statement {
        let mut statement = Statement::new(StatementKind::Invoke);
        statement.set_attribute("called", called);
        statement
    }

    #[test]
    fn test_empty_stack_reports_root() {
        let mut stack = CallStack::new("RLC");
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.current_caller(), "RLC");
        assert!(stack.top().is_none());
        assert!(stack.pop().is_none());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_current_caller_follows_top_frame() {
        let mut stack = CallStack::new("RLC");
        stack.push(invoke("Server"));
        stack.push(invoke("Database"));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current_caller(), "Database");

        let popped = stack.pop().unwrap();
        assert_eq!(popped.attribute("called"), Some("Database"));
        assert_eq!(stack.current_caller(), "Server");

        stack.pop();
        assert_eq!(stack.current_caller(), "RLC");
    }
}
