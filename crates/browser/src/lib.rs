pub mod cdp;
pub mod dom;
pub mod page;
pub mod remote;
pub mod surface;
pub mod types;

pub use dom::{RawNode, Rect};
pub use page::PageFunction;
pub use remote::CdpSurface;
pub use surface::{first_frame_result, BrowserSurface};
pub use types::{
    CaptureOptions, CookieDetails, CookieFilter, CreateTabParams, FrameInfo, FrameResult,
    ScriptInjection, ScriptWorld, TabId, TabInfo,
};
