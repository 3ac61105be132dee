use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

/// How to open a source that isn't a plain file, e.g. a webcam.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureOptions {
    /// libavdevice input format such as `v4l2`, `avfoundation` or `dshow`.
    pub input_format: Option<String>,
    /// Requested capture size, `WIDTHxHEIGHT`.
    pub video_size: Option<String>,
    pub framerate: Option<String>,
}

impl CaptureOptions {
    fn dictionary(&self) -> ffmpeg_next::Dictionary<'_> {
        let mut dict = ffmpeg_next::Dictionary::new();
        if let Some(size) = &self.video_size {
            dict.set("video_size", size);
        }
        if let Some(rate) = &self.framerate {
            dict.set("framerate", rate);
        }
        dict
    }
}

struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    flushing: bool,
}

/// Pulls frames from a video file or capture device via ffmpeg-next.
///
/// Each decoded frame is converted to RGB24. Once the container runs dry
/// (or after [`close`](FrameSource::close)) every call returns `Ok(None)`.
pub struct FfmpegFrameSource {
    state: Option<DecodeState>,
    metadata: VideoMetadata,
    frame_index: usize,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn open(
        locator: &str,
        options: &CaptureOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = open_input(locator, options)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            locator: locator.to_string(),
        };
        log::debug!("Opened frame source {metadata}");

        Ok(Self {
            state: Some(DecodeState {
                ictx,
                decoder,
                scaler,
                video_stream_index,
                flushing: false,
            }),
            metadata,
            frame_index: 0,
        })
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }
}

fn open_input(
    locator: &str,
    options: &CaptureOptions,
) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
    let Some(name) = options.input_format.as_deref() else {
        return Ok(ffmpeg_next::format::input_with_dictionary(
            locator,
            options.dictionary(),
        )?);
    };

    ffmpeg_next::device::register_all();
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == name)
        .ok_or_else(|| format!("Capture format '{name}' is not available in this ffmpeg build"))?;

    match ffmpeg_next::format::open_with(locator, &format, options.dictionary())? {
        ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
        ffmpeg_next::format::context::Context::Output(_) => {
            Err(format!("'{name}' opened {locator} as an output").into())
        }
    }
}

impl DecodeState {
    fn try_receive(
        &mut self,
        width: u32,
        height: u32,
        index: usize,
    ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;
        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        Ok(Some(Frame::new(pixels, width, height, 3, index)))
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let (width, height) = (self.metadata.width, self.metadata.height);
        let index = self.frame_index;
        let Some(state) = self.state.as_mut() else {
            return Ok(None);
        };

        let frame = loop {
            if let Some(frame) = state.try_receive(width, height, index)? {
                break Some(frame);
            }
            if state.flushing {
                break None;
            }

            let Some((stream, packet)) = state.ictx.packets().next() else {
                let _ = state.decoder.send_eof();
                state.flushing = true;
                continue;
            };

            if stream.index() != state.video_stream_index {
                continue;
            }

            state.decoder.send_packet(&packet)?;
        };

        match frame {
            Some(frame) => {
                self.frame_index += 1;
                Ok(Some(frame))
            }
            None => {
                self.close();
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::debug!("Closed frame source {}", self.metadata.locator);
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This function strips that padding to produce a tightly-packed pixel buffer.
pub(crate) fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn write_test_image(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("still.png");
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([10, 120, 240]);
        }
        img.save(&path).unwrap();
        path
    }

    fn open(path: &Path) -> FfmpegFrameSource {
        FfmpegFrameSource::open(path.to_str().unwrap(), &CaptureOptions::default()).unwrap()
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 64, 48);
        let source = open(&path);
        let meta = source.metadata();
        assert_eq!(meta.width, 64);
        assert_eq!(meta.height, 48);
        assert_eq!(meta.locator, path.to_str().unwrap());
    }

    #[test]
    fn test_open_nonexistent_errors() {
        assert!(FfmpegFrameSource::open("/nonexistent/clip.mp4", &CaptureOptions::default()).is_err());
    }

    #[test]
    fn test_unknown_capture_format_errors() {
        let options = CaptureOptions {
            input_format: Some("no-such-device".to_string()),
            ..Default::default()
        };
        let err = FfmpegFrameSource::open("0", &options).err().unwrap();
        assert!(err.to_string().contains("no-such-device"));
    }

    #[test]
    fn test_frames_are_rgb_then_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 64, 48);
        let mut source = open(&path);

        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.channels(), 3);
        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert_eq!(&frame.data()[..3], &[10, 120, 240]);
        assert_eq!(frame.index(), 0);

        assert!(source.next_frame().unwrap().is_none());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_closed_source_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 32, 32);
        let mut source = open(&path);
        source.close();
        source.close();
        assert!(source.next_frame().unwrap().is_none());
    }
}
