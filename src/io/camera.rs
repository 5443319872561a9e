// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Live camera capture.
//!
//! A [`CameraBackend`] opens a device for a [`CaptureRequest`] and hands back
//! a [`FrameSource`]. [`CameraFeed`] owns the active source, keeps the most
//! recent frame and maps failures to the messages shown in the status line.

use image::RgbaImage;
use thiserror::Error;

/// Which way the device should face, when the platform can choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Any,
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub facing: Facing,
    pub ideal_size: Option<(u32, u32)>,
}

impl CaptureRequest {
    /// Rear-facing, preferring 1920x1080.
    pub fn constrained() -> Self {
        Self {
            facing: Facing::Environment,
            ideal_size: Some((1920, 1080)),
        }
    }

    /// Any device at any resolution.
    pub fn permissive() -> Self {
        Self {
            facing: Facing::Any,
            ideal_size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera device found")]
    NoDevice,
    #[error("camera failed: {0}")]
    Backend(String),
}

impl CameraError {
    /// Status line text for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            CameraError::PermissionDenied => "Camera denied. Enable permission and reload.",
            CameraError::NoDevice => "No camera device found.",
            CameraError::Backend(_) => "Could not start camera.",
        }
    }
}

/// An open capture stream.
pub trait FrameSource {
    /// Native frame size; `(0, 0)` until the device reports one.
    fn frame_size(&self) -> (u32, u32);
    /// The newest frame captured since the last call, if any.
    fn poll_frame(&mut self) -> Option<RgbaImage>;
    /// Release the device. Further polls return nothing.
    fn stop(&mut self);
}

pub trait CameraBackend {
    fn open(&mut self, request: &CaptureRequest) -> Result<Box<dyn FrameSource>, CameraError>;
}

/// Backend for builds without capture support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCameraBackend;

impl CameraBackend for NoCameraBackend {
    fn open(&mut self, _request: &CaptureRequest) -> Result<Box<dyn FrameSource>, CameraError> {
        Err(CameraError::NoDevice)
    }
}

/// The capture backend compiled into this build.
pub fn default_backend() -> Box<dyn CameraBackend> {
    #[cfg(feature = "video-opencv")]
    {
        Box::new(opencv_backend::OpenCvBackend::default())
    }
    #[cfg(not(feature = "video-opencv"))]
    {
        Box::new(NoCameraBackend)
    }
}

pub struct CameraFeed {
    backend: Box<dyn CameraBackend>,
    source: Option<Box<dyn FrameSource>>,
    frame: Option<RgbaImage>,
    frame_generation: u64,
}

impl CameraFeed {
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        Self {
            backend,
            source: None,
            frame: None,
            frame_generation: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    /// Active and delivering frames with a known size.
    pub fn is_ready(&self) -> bool {
        self.is_active() && self.frame.as_ref().is_some_and(|f| f.width() > 0 && f.height() > 0)
    }

    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    /// Increments whenever a new frame arrives.
    pub fn frame_generation(&self) -> u64 {
        self.frame_generation
    }

    /// Open the camera, trying the constrained request before the permissive
    /// one. Returns `Ok(false)` when a stream is already active.
    pub fn start(&mut self) -> Result<bool, CameraError> {
        if self.is_active() {
            return Ok(false);
        }

        let source = match self.backend.open(&CaptureRequest::constrained()) {
            Ok(source) => source,
            Err(first) => {
                log::debug!("Constrained camera request failed: {}", first);
                self.backend.open(&CaptureRequest::permissive()).map_err(|e| {
                    log::warn!("Camera unavailable: {}", e);
                    e
                })?
            }
        };

        let (width, height) = source.frame_size();
        log::info!("Camera started at {}x{}", width, height);
        self.source = Some(source);
        Ok(true)
    }

    /// Stop the stream and drop the last frame. Returns whether anything was
    /// running.
    pub fn stop(&mut self) -> bool {
        let Some(mut source) = self.source.take() else {
            return false;
        };
        source.stop();
        self.frame = None;
        log::info!("Camera stopped");
        true
    }

    /// Pull the newest frame from the device. Returns whether one arrived.
    pub fn poll(&mut self) -> bool {
        let Some(source) = self.source.as_mut() else {
            return false;
        };
        match source.poll_frame() {
            Some(frame) => {
                self.frame = Some(frame);
                self.frame_generation += 1;
                true
            }
            None => false,
        }
    }
}

impl Drop for CameraFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(feature = "video-opencv")]
mod opencv_backend {
    use super::{CameraBackend, CameraError, CaptureRequest, FrameSource};
    use image::RgbaImage;
    use opencv::{
        core::Mat,
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture},
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, Receiver, TryRecvError};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    #[derive(Debug, Default)]
    pub struct OpenCvBackend {
        pub device_index: i32,
    }

    struct CaptureThread {
        frames: Receiver<RgbaImage>,
        running: Arc<AtomicBool>,
        handle: Option<JoinHandle<()>>,
        size: (u32, u32),
    }

    fn open_device(index: i32, request: &CaptureRequest) -> Result<VideoCapture, CameraError> {
        log::debug!("Opening capture device {} ({:?})", index, request.facing);
        let mut cap = VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|e| CameraError::Backend(e.to_string()))?;
        if !cap.is_opened().unwrap_or(false) {
            return Err(CameraError::NoDevice);
        }
        if let Some((width, height)) = request.ideal_size {
            let _ = cap.set(videoio::CAP_PROP_FRAME_WIDTH, width as f64);
            let _ = cap.set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64);
        }
        Ok(cap)
    }

    fn to_rgba(frame: &Mat) -> Option<RgbaImage> {
        let mut rgba = Mat::default();
        imgproc::cvt_color(frame, &mut rgba, imgproc::COLOR_BGR2RGBA, 0).ok()?;
        let size = rgba.size().ok()?;
        let data = rgba.data_bytes().ok()?.to_vec();
        RgbaImage::from_raw(size.width as u32, size.height as u32, data)
    }

    impl CameraBackend for OpenCvBackend {
        fn open(&mut self, request: &CaptureRequest) -> Result<Box<dyn FrameSource>, CameraError> {
            let index = self.device_index;
            let request = *request;
            let running = Arc::new(AtomicBool::new(true));
            let (frame_tx, frames) = mpsc::sync_channel(1);
            let (ready_tx, ready) = mpsc::channel();

            let flag = Arc::clone(&running);
            let handle = thread::spawn(move || {
                let mut cap = match open_device(index, &request) {
                    Ok(cap) => cap,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0) as u32;
                let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0) as u32;
                let _ = ready_tx.send(Ok((width, height)));

                let mut frame = Mat::default();
                while flag.load(Ordering::Relaxed) {
                    match cap.read(&mut frame) {
                        Ok(true) if !frame.empty() => {
                            if let Some(image) = to_rgba(&frame) {
                                // A full slot means the UI has not caught up; drop the frame.
                                let _ = frame_tx.try_send(image);
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            log::error!("Camera read failed: {}", e);
                            break;
                        }
                    }
                }
                let _ = cap.release();
            });

            let size = ready
                .recv()
                .map_err(|_| CameraError::Backend("capture thread exited".into()))??;
            Ok(Box::new(CaptureThread {
                frames,
                running,
                handle: Some(handle),
                size,
            }))
        }
    }

    impl FrameSource for CaptureThread {
        fn frame_size(&self) -> (u32, u32) {
            self.size
        }

        fn poll_frame(&mut self) -> Option<RgbaImage> {
            let mut latest = None;
            loop {
                match self.frames.try_recv() {
                    Ok(frame) => latest = Some(frame),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
            latest
        }

        fn stop(&mut self) {
            self.running.store(false, Ordering::Relaxed);
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgba;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scriptable backend: fails the first `failures` opens with the given
    /// errors, then succeeds with a stream yielding `frames` frames.
    pub(crate) struct FakeBackend {
        pub failures: Vec<CameraError>,
        pub requests: Rc<RefCell<Vec<CaptureRequest>>>,
        pub stops: Rc<RefCell<u32>>,
        pub frames: u32,
    }

    impl FakeBackend {
        pub(crate) fn working(frames: u32) -> Self {
            Self {
                failures: Vec::new(),
                requests: Rc::default(),
                stops: Rc::default(),
                frames,
            }
        }
    }

    struct FakeSource {
        remaining: u32,
        stops: Rc<RefCell<u32>>,
    }

    impl FrameSource for FakeSource {
        fn frame_size(&self) -> (u32, u32) {
            (4, 3)
        }

        fn poll_frame(&mut self) -> Option<RgbaImage> {
            if self.remaining == 0 {
                return None;
            }
            self.remaining -= 1;
            Some(RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255])))
        }

        fn stop(&mut self) {
            *self.stops.borrow_mut() += 1;
        }
    }

    impl CameraBackend for FakeBackend {
        fn open(&mut self, request: &CaptureRequest) -> Result<Box<dyn FrameSource>, CameraError> {
            self.requests.borrow_mut().push(*request);
            if !self.failures.is_empty() {
                return Err(self.failures.remove(0));
            }
            Ok(Box::new(FakeSource {
                remaining: self.frames,
                stops: Rc::clone(&self.stops),
            }))
        }
    }

    #[test]
    fn test_start_is_idempotent() {
        let backend = FakeBackend::working(1);
        let requests = Rc::clone(&backend.requests);
        let mut feed = CameraFeed::new(Box::new(backend));

        assert_eq!(feed.start(), Ok(true));
        assert_eq!(feed.start(), Ok(false));
        assert_eq!(requests.borrow().as_slice(), &[CaptureRequest::constrained()]);
    }

    #[test]
    fn test_falls_back_to_permissive_request() {
        let mut backend = FakeBackend::working(0);
        backend.failures = vec![CameraError::Backend("overconstrained".into())];
        let requests = Rc::clone(&backend.requests);
        let mut feed = CameraFeed::new(Box::new(backend));

        assert_eq!(feed.start(), Ok(true));
        assert_eq!(
            requests.borrow().as_slice(),
            &[CaptureRequest::constrained(), CaptureRequest::permissive()]
        );
    }

    #[test]
    fn test_reports_last_error() {
        let mut backend = FakeBackend::working(0);
        backend.failures = vec![CameraError::NoDevice, CameraError::PermissionDenied];
        let mut feed = CameraFeed::new(Box::new(backend));

        let err = feed.start().unwrap_err();
        assert_eq!(err, CameraError::PermissionDenied);
        assert_eq!(err.user_message(), "Camera denied. Enable permission and reload.");
        assert!(!feed.is_active());
        assert_eq!(
            NoCameraBackend.open(&CaptureRequest::permissive()).err().map(|e| e.user_message()),
            Some("No camera device found.")
        );
    }

    #[test]
    fn test_ready_after_first_frame_and_stop_clears() {
        let backend = FakeBackend::working(2);
        let stops = Rc::clone(&backend.stops);
        let mut feed = CameraFeed::new(Box::new(backend));

        assert!(!feed.poll());
        feed.start().unwrap();
        assert!(feed.is_active());
        assert!(!feed.is_ready());

        assert!(feed.poll());
        assert!(feed.is_ready());
        assert_eq!(feed.frame_generation(), 1);

        assert!(feed.stop());
        assert!(!feed.stop());
        assert_eq!(*stops.borrow(), 1);
        assert!(!feed.is_ready());
        assert!(feed.frame().is_none());
    }
}
