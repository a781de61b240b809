use crate::commands::{spin_fail, spin_ok, spinner};
use dialoguer::Confirm;
use indicatif::ProgressBar;
use jmgr_core::Operator;
use std::cell::RefCell;
use std::io::{stdin, IsTerminal};

/// Operator on the controlling terminal: `dialoguer` prompts and `indicatif`
/// spinners. Without a terminal every confirmation is declined.
pub struct TerminalOperator {
    interactive: bool,
    active: RefCell<Option<ProgressBar>>,
}

impl TerminalOperator {
    pub fn new() -> Self {
        Self {
            interactive: stdin().is_terminal(),
            active: RefCell::new(None),
        }
    }

    fn finish_active(&self, message: &str) {
        if let Some(pb) = self.active.borrow_mut().take() {
            spin_ok(&pb, message);
        }
    }

    /// Mark the step in progress, if any, as failed.
    pub fn fail(&self) {
        if let Some(pb) = self.active.borrow_mut().take() {
            let message = pb.message();
            spin_fail(&pb, &message);
        }
    }
}

impl Operator for TerminalOperator {
    fn confirm(&self, question: &str) -> bool {
        if !self.interactive {
            eprintln!("{question} [no terminal, answering no; use -f to force]");
            return false;
        }
        let ask = || {
            Confirm::new()
                .with_prompt(question)
                .default(false)
                .interact()
                .unwrap_or(false)
        };
        match self.active.borrow().as_ref() {
            Some(pb) => pb.suspend(ask),
            None => ask(),
        }
    }

    fn notice(&self, message: &str) {
        match self.active.borrow().as_ref() {
            Some(pb) => pb.println(message),
            None => println!("{message}"),
        }
    }

    fn progress(&self, message: &str) {
        if let Some(pb) = self.active.borrow().as_ref() {
            pb.set_message(message.to_owned());
            return;
        }
        *self.active.borrow_mut() = Some(spinner(message));
    }

    fn done(&self, message: &str) {
        self.finish_active(message);
    }
}

impl Drop for TerminalOperator {
    fn drop(&mut self) {
        if let Some(pb) = self.active.get_mut().take() {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_finishes_active_spinner() {
        let operator = TerminalOperator::new();
        operator.fail();
        operator.progress("copying www to www2");
        assert!(operator.active.borrow().is_some());
        operator.fail();
        assert!(operator.active.borrow().is_none());
    }
}
