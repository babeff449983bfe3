// Screen logic. Nothing in here knows about a concrete UI toolkit; the host
// plugs its views and surfaces in through the traits these modules define.
pub mod browser_screen;
pub mod engine;
pub mod feature;             // Lifecycle-scoped feature handles
pub mod navigation;
pub mod reader;
pub mod screens;             // Top-level screen stack
pub mod store;
pub mod suggestions;
pub mod telemetry;
pub mod thumbnails;
pub mod toolbar;
pub mod use_cases;
