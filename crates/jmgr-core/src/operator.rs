/// The person (or script) driving jmgr: answers confirmations and sees
/// progress of long-running steps.
pub trait Operator {
    /// Ask a yes/no question. `false` aborts the operation.
    fn confirm(&self, question: &str) -> bool;

    /// Informational line, e.g. a summary before a confirmation.
    fn notice(&self, message: &str);

    /// A long-running step has started.
    fn progress(&self, message: &str);

    /// The current long-running step has finished.
    fn done(&self, message: &str);
}

/// Answers yes to everything and stays silent.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Operator for AssumeYes {
    fn confirm(&self, _question: &str) -> bool {
        true
    }

    fn notice(&self, _message: &str) {}

    fn progress(&self, _message: &str) {}

    fn done(&self, _message: &str) {}
}
