mod canvas;
mod font;
mod overlay;
mod projection;
mod renderer;

pub use overlay::OverlayData;
pub use renderer::Renderer;
