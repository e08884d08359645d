use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::page::PageFunction;

/// Numeric tab identifier, stable while the tab lives.
pub type TabId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub active: bool,
    pub window_id: i64,
    pub index: i64,
    pub pinned: bool,
    pub audible: bool,
    pub muted_info: Value,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTabParams {
    pub url: Option<String>,
    /// Defaults to true when absent, matching the wire contract.
    pub active: Option<bool>,
    pub window_id: Option<i64>,
    pub index: Option<i64>,
    pub pinned: Option<bool>,
}

impl CreateTabParams {
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieFilter {
    pub url: Option<String>,
    pub domain: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieDetails {
    pub url: Option<String>,
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    pub secure: Option<bool>,
    pub http_only: Option<bool>,
    pub expiration_date: Option<f64>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    pub window_id: Option<i64>,
    pub format: String,
    pub quality: u8,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            window_id: None,
            format: "png".to_string(),
            quality: 100,
        }
    }
}

/// Execution world for injected scripts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptWorld {
    #[default]
    #[serde(rename = "ISOLATED")]
    Isolated,
    #[serde(rename = "MAIN")]
    Main,
}

/// A page-side call: which tab, which function, which frame scope.
#[derive(Debug, Clone)]
pub struct ScriptInjection {
    pub tab_id: TabId,
    pub func: PageFunction,
    pub world: ScriptWorld,
    /// Target a specific frame; `None` means the main frame.
    pub frame_id: Option<i64>,
    /// Execute in every frame; results are one entry per frame.
    pub all_frames: bool,
}

impl ScriptInjection {
    pub fn main_frame(tab_id: TabId, func: PageFunction) -> Self {
        Self {
            tab_id,
            func,
            world: ScriptWorld::Isolated,
            frame_id: None,
            all_frames: false,
        }
    }

    /// True when the injection targets anything beyond the main frame.
    pub fn is_frame_scoped(&self) -> bool {
        self.all_frames || self.frame_id.map_or(false, |f| f != 0)
    }
}

/// Per-frame result of a script injection. The main frame is frame 0 and
/// always comes first when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameResult {
    pub frame_id: i64,
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub frame_id: i64,
    pub parent_frame_id: Option<i64>,
    pub url: String,
}
