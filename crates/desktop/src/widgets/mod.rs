pub mod overlay_canvas;
