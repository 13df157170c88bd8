pub mod ffmpeg_camera;
pub mod image_sequence_source;
