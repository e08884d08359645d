use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::handlers::agent_ops::{
    ExtractStructuredData, GetElementInfo, HighlightElement, InjectCss, ObserveMutations,
    RemoveCss, SimulateEvent,
};
use crate::handlers::analysis::{GetAccessibilitySnapshot, GetActionables};
use crate::handlers::cookies::{DeleteCookie, GetCookies, SetCookie};
use crate::handlers::script::{Click, ExecuteScript, ExtractText, FindElements, Scroll, TypeText};
use crate::handlers::storage::{
    ClearLocalStorage, ClearSessionStorage, GetLocalStorage, GetSessionStorage, SetLocalStorage,
    SetSessionStorage,
};
use crate::handlers::tabs::{
    ActivateTab, CaptureScreenshot, CloseTab, CreateTab, GetFrames, GoBack, GoForward, ListTabs,
    Navigate, ReloadTab,
};
use crate::handlers::waits::{WaitForElement, WaitForNavigation};
use crate::Handler;

/// Command name to handler. Built once at startup and read-only after; a
/// lookup miss is the wire-level `Unknown command` error, never a crash.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Tab lifecycle
        registry.register(Arc::new(ListTabs));
        registry.register(Arc::new(CreateTab));
        registry.register(Arc::new(CloseTab));
        registry.register(Arc::new(ActivateTab));
        registry.register(Arc::new(ReloadTab));
        registry.register(Arc::new(Navigate));
        registry.register(Arc::new(GoBack));
        registry.register(Arc::new(GoForward));
        registry.register(Arc::new(CaptureScreenshot));
        registry.register(Arc::new(GetFrames));

        // Script injection
        registry.register(Arc::new(ExecuteScript));
        registry.register(Arc::new(ExtractText));
        registry.register(Arc::new(FindElements));
        registry.register(Arc::new(Click));
        registry.register(Arc::new(TypeText));
        registry.register(Arc::new(Scroll));

        // Page storage
        registry.register(Arc::new(GetLocalStorage));
        registry.register(Arc::new(SetLocalStorage));
        registry.register(Arc::new(ClearLocalStorage));
        registry.register(Arc::new(GetSessionStorage));
        registry.register(Arc::new(SetSessionStorage));
        registry.register(Arc::new(ClearSessionStorage));

        // Cookies
        registry.register(Arc::new(GetCookies));
        registry.register(Arc::new(SetCookie));
        registry.register(Arc::new(DeleteCookie));

        // Polling waits
        registry.register(Arc::new(WaitForElement));
        registry.register(Arc::new(WaitForNavigation));

        // DOM-derived analyses
        registry.register(Arc::new(GetActionables));
        registry.register(Arc::new(GetAccessibilitySnapshot));

        // Agent-forwarded page operations
        registry.register(Arc::new(GetElementInfo));
        registry.register(Arc::new(HighlightElement));
        registry.register(Arc::new(SimulateEvent));
        registry.register(Arc::new(ExtractStructuredData));
        registry.register(Arc::new(ObserveMutations));
        registry.register(Arc::new(InjectCss));
        registry.register(Arc::new(RemoveCss));

        registry
    }

    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        debug!(name = handler.name(), "Registering handler");
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vocabulary_is_complete() {
        let registry = HandlerRegistry::with_defaults();
        for name in [
            "tabs.list",
            "tabs.create",
            "tabs.navigate",
            "tabs.executeScript",
            "tabs.waitForElement",
            "tabs.waitForNavigation",
            "tabs.getFrames",
            "tabs.getActionables",
            "tabs.getAccessibilitySnapshot",
            "tabs.getElementInfo",
            "tabs.observeMutations",
            "tabs.injectCSS",
            "tabs.removeCSS",
            "tabs.clearSessionStorage",
        ] {
            assert!(registry.get(name).is_some(), "missing handler: {}", name);
        }
        assert!(registry.get("tabs.captureVideo").is_none());
        assert_eq!(registry.names().len(), 36);
    }
}
