//! Scripted in-memory page for exercising the portal steps.

use crate::page::{PortalError, PortalPage, PortalSession};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Goto(String),
    Type { selector: String, text: String },
    Click(String),
    ClickAndWait(String),
    Close,
}

#[derive(Default)]
pub struct FakePage {
    /// Shared so tests can inspect it after the session is consumed by `close`.
    pub actions: Rc<RefCell<Vec<Action>>>,
    /// HTML served per URL.
    pub documents: HashMap<String, String>,
    /// Selectors that behave as absent from the page.
    pub missing: HashSet<String>,
    /// Where `click_and_wait` on a selector lands.
    pub navigations: HashMap<String, String>,
    pub current_url: String,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            current_url: "about:blank".to_string(),
            ..Self::default()
        }
    }

    pub fn with_document(mut self, url: &str, html: &str) -> Self {
        self.documents.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_missing(mut self, selector: &str) -> Self {
        self.missing.insert(selector.to_string());
        self
    }

    pub fn with_navigation(mut self, selector: &str, url: &str) -> Self {
        self.navigations.insert(selector.to_string(), url.to_string());
        self
    }

    pub fn recorded(&self) -> Vec<Action> {
        self.actions.borrow().clone()
    }

    fn require(&self, selector: &str) -> Result<(), PortalError> {
        if self.missing.contains(selector) {
            return Err(PortalError::ElementNotFound {
                selector: selector.to_string(),
                reason: "not present in fake document".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, action: Action) {
        self.actions.borrow_mut().push(action);
    }
}

impl PortalPage for FakePage {
    async fn goto(&mut self, url: &str) -> Result<(), PortalError> {
        self.record(Action::Goto(url.to_string()));
        self.current_url = url.to_string();
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), PortalError> {
        self.require(selector)?;
        self.record(Action::Type {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), PortalError> {
        self.require(selector)?;
        self.record(Action::Click(selector.to_string()));
        Ok(())
    }

    async fn click_and_wait(&mut self, selector: &str) -> Result<(), PortalError> {
        self.require(selector)?;
        self.record(Action::ClickAndWait(selector.to_string()));
        if let Some(url) = self.navigations.get(selector) {
            self.current_url = url.clone();
        }
        Ok(())
    }

    async fn content(&mut self) -> Result<String, PortalError> {
        Ok(self
            .documents
            .get(&self.current_url)
            .cloned()
            .unwrap_or_default())
    }

    async fn url(&mut self) -> Result<String, PortalError> {
        Ok(self.current_url.clone())
    }
}

impl PortalSession for FakePage {
    async fn close(self) {
        self.record(Action::Close);
    }
}
