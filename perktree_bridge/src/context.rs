use std::cell::RefCell;
use std::collections::VecDeque;

use crate::collaborators::Collaborators;
use crate::config::ShimConfig;

/// Process-wide state shared by the registry takeover, every menu instance
/// and every bridge. Lives from plugin load to process exit.
#[derive(Debug)]
pub struct ShimContext {
    config: ShimConfig,
    collaborators: Collaborators,
    journal: RefCell<VecDeque<String>>,
}

impl ShimContext {
    pub fn new(config: ShimConfig, collaborators: Collaborators) -> Self {
        ShimContext {
            config,
            collaborators,
            journal: RefCell::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Append to the event journal. Only the newest `journal_limit` entries
    /// are kept.
    pub fn log_event(&self, event: impl Into<String>) {
        let limit = self.config.journal_limit;
        let mut journal = self.journal.borrow_mut();
        if limit == 0 {
            return;
        }
        while journal.len() >= limit {
            journal.pop_front();
        }
        journal.push_back(event.into());
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.borrow().iter().cloned().collect()
    }

    pub fn drain_journal(&self) -> Vec<String> {
        self.journal.borrow_mut().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_limit(journal_limit: usize) -> ShimContext {
        let config = ShimConfig {
            journal_limit,
            ..ShimConfig::default()
        };
        ShimContext::new(config, Collaborators::default())
    }

    #[test]
    fn journal_keeps_only_the_newest_entries() {
        let context = context_with_limit(3);
        for index in 0..5 {
            context.log_event(format!("event {index}"));
        }
        assert_eq!(context.journal(), vec!["event 2", "event 3", "event 4"]);
    }

    #[test]
    fn draining_empties_the_journal() {
        let context = context_with_limit(8);
        context.log_event("menu.construct LevelUpMenu");
        assert_eq!(context.drain_journal(), vec!["menu.construct LevelUpMenu"]);
        assert!(context.journal().is_empty());

        let silent = context_with_limit(0);
        silent.log_event("dropped");
        assert!(silent.journal().is_empty());
    }
}
