mod render;
mod text;

pub use render::{
    BACKGROUND, FrameStats, HIGHLIGHT, OUTLINE, OUTLINE_WIDTH, Renderer, Scene, SkiaRenderer,
    TRAIL, TRAIL_WIDTH, TaskHeader,
};
pub use text::render_text_pixmap;
