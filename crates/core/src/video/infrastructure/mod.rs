pub mod ffmpeg_frame_source;
pub mod image_file_reader;
pub mod threaded_frame_source;
