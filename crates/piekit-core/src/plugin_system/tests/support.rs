#![cfg(test)]

use std::cell::RefCell;
use std::rc::Rc;

use crate::kernel::error::{Error, Result};
use crate::plugin_system::{Plugin, PluginContext};

pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}

/// Configurable plugin that records what happens to it.
pub struct TestPlugin {
    pub name: &'static str,
    pub version: &'static str,
    pub requires: Vec<&'static str>,
    pub on_available: Vec<&'static str>,
    pub on_teardown: Vec<&'static str>,
    pub fail: bool,
    pub panic: bool,
    pub journal: Journal,
}

impl TestPlugin {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            version: "1.0.0",
            requires: Vec::new(),
            on_available: Vec::new(),
            on_teardown: Vec::new(),
            fail: false,
            panic: false,
            journal: journal.clone(),
        }
    }

    pub fn depends_on(mut self, names: &[&'static str]) -> Self {
        self.requires = names.to_vec();
        self
    }

    /// Subscribes to availability of each target in `init`.
    pub fn waits_for(mut self, names: &[&'static str]) -> Self {
        self.on_available = names.to_vec();
        self
    }

    pub fn watches_teardown_of(mut self, names: &[&'static str]) -> Self {
        self.on_teardown = names.to_vec();
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }
}

impl Plugin for TestPlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &str {
        self.version
    }

    fn requires(&self) -> Vec<&'static str> {
        self.requires.clone()
    }

    fn init(&mut self, ctx: &PluginContext<'_>) -> Result<()> {
        self.journal.borrow_mut().push(format!("init {}", self.name));
        if self.panic {
            panic!("{} exploded", self.name);
        }
        if self.fail {
            return Err(Error::Other(format!("{} refused to start", self.name)));
        }

        for &target in &self.on_available {
            let journal = self.journal.clone();
            ctx.on_plugin_available(target, move |ctx| {
                journal.borrow_mut().push(format!("{} saw {}", ctx.name(), target));
                Ok(())
            })?;
        }
        for &target in &self.on_teardown {
            let journal = self.journal.clone();
            ctx.on_teardown(target, move |ctx| {
                journal.borrow_mut().push(format!("{} saw {} leave", ctx.name(), target));
                Ok(())
            })?;
        }
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &PluginContext<'_>) -> Result<()> {
        self.journal.borrow_mut().push(format!("shutdown {}", self.name));
        Ok(())
    }
}
