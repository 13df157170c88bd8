pub mod overlay_renderer;
pub mod overlay_scene;
pub mod overlay_surface;
