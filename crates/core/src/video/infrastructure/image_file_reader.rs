use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::infrastructure::ffmpeg_frame_source::extract_rgb_pixels;

/// Decodes a still image (the enrollment reference) into an RGB [`Frame`].
///
/// Uses ffmpeg for decoding, which is significantly faster than the pure-Rust
/// `image` crate for large images (e.g. 4032x3024 JPEG).
pub fn read_image(path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
    ffmpeg_next::init()?;

    let mut ictx = ffmpeg_next::format::input(path)
        .map_err(|e| format!("Cannot open reference image {}: {e}", path.display()))?;

    let stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or("No image data found")?;

    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    let mut decoder = codec_ctx.decoder().video()?;

    let width = decoder.width();
    let height = decoder.height();

    let mut scaler = ffmpeg_next::software::scaling::Context::get(
        decoder.format(),
        width,
        height,
        ffmpeg_next::format::Pixel::RGB24,
        width,
        height,
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    )?;

    let video_stream_index = stream.index();
    decode_single_frame(
        &mut ictx,
        &mut decoder,
        &mut scaler,
        width,
        height,
        video_stream_index,
    )
}

fn decode_single_frame(
    ictx: &mut ffmpeg_next::format::context::Input,
    decoder: &mut ffmpeg_next::decoder::Video,
    scaler: &mut ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
) -> Result<Frame, Box<dyn std::error::Error>> {
    for (stream, packet) in ictx.packets() {
        if stream.index() != video_stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;
        if let Some(frame) = try_receive_frame(decoder, scaler, width, height)? {
            return Ok(frame);
        }
    }

    // Flush decoder for formats that buffer the single frame
    let _ = decoder.send_eof();
    try_receive_frame(decoder, scaler, width, height)?
        .ok_or_else(|| "Failed to decode image".into())
}

fn try_receive_frame(
    decoder: &mut ffmpeg_next::decoder::Video,
    scaler: &mut ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
    let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
    if decoder.receive_frame(&mut decoded).is_ok() {
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&decoded, &mut rgb_frame)?;
        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        Ok(Some(Frame::new(pixels, width, height, 3, 0)))
    } else {
        Ok(None)
    }
}
