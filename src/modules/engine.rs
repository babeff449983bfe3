// Boundary to the web engine's view. The engine itself is an external collaborator.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait EngineView: Send + Sync {
    /// Snapshots the rendered page. None when nothing is rendered yet.
    async fn capture_thumbnail(&self) -> Option<Bitmap>;

    /// Switches paragraph reflow for reader view on or off.
    fn set_reader_reflow(&self, enabled: bool);
}
