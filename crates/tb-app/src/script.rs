//! Scripting seam.

/// Interpreter for the text scripts a saved page or user may carry.
pub trait Scripter: Send {
    fn execute(&mut self, script: &str);
}
