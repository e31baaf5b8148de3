#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embassy_time::Duration;
use smart_leds::RGB8;
use weather_strip::{BoardError, ConnectionProvider, PixelSink};

pub const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };
pub const DIM: RGB8 = RGB8 { r: 5, g: 5, b: 5 };

/// Everything the renderer did, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Set(usize, RGB8),
    Refresh,
    Clear,
    DelayMs(u32),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// Pixel sink that keeps the staged and the visible frame
pub struct RecordingStrip {
    pub staged: Vec<RGB8>,
    pub shown: Vec<RGB8>,
    /// Lit pixel indices at every refresh
    pub frames: Vec<Vec<usize>>,
    log: EventLog,
    fail_on_refresh: Option<usize>,
}

impl RecordingStrip {
    pub fn new(len: usize, log: EventLog) -> Self {
        Self {
            staged: vec![OFF; len],
            shown: vec![OFF; len],
            frames: Vec::new(),
            log,
            fail_on_refresh: None,
        }
    }

    /// Refresh number `n` (0-based) fails with `DeviceError`
    pub fn failing_on_refresh(mut self, n: usize) -> Self {
        self.fail_on_refresh = Some(n);
        self
    }

    pub fn lit(&self) -> Vec<usize> {
        lit(&self.shown)
    }

    fn push_frame(&mut self) -> Result<(), BoardError> {
        if self.fail_on_refresh == Some(self.frames.len()) {
            return Err(BoardError::DeviceError);
        }
        self.shown = self.staged.clone();
        self.frames.push(lit(&self.shown));
        Ok(())
    }
}

fn lit(frame: &[RGB8]) -> Vec<usize> {
    frame
        .iter()
        .enumerate()
        .filter(|(_, c)| **c != OFF)
        .map(|(i, _)| i)
        .collect()
}

impl PixelSink for RecordingStrip {
    fn len(&self) -> usize {
        self.staged.len()
    }

    fn set_pixel(&mut self, index: usize, color: RGB8) -> Result<(), BoardError> {
        let pixel = self.staged.get_mut(index).ok_or(BoardError::DeviceError)?;
        *pixel = color;
        self.log.borrow_mut().push(Event::Set(index, color));
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), BoardError> {
        self.push_frame()?;
        self.log.borrow_mut().push(Event::Refresh);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), BoardError> {
        self.staged.iter_mut().for_each(|p| *p = OFF);
        self.push_frame()?;
        self.log.borrow_mut().push(Event::Clear);
        Ok(())
    }
}

/// Delay that returns at once and logs how long it was asked to wait
pub struct RecordingDelay {
    log: EventLog,
}

impl RecordingDelay {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.log.borrow_mut().push(Event::DelayMs(ns / 1_000_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::DelayMs(ms));
    }
}

pub fn new_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Connection replaying a fixed script of reads
#[derive(Default)]
pub struct ScriptedConnection {
    pub connect_result: Option<BoardError>,
    pub send_result: Option<BoardError>,
    pub reads: VecDeque<Result<Vec<u8>, BoardError>>,
    pub sent: Vec<u8>,
    pub calls: Vec<&'static str>,
    pub timeouts: Vec<Duration>,
    pub buffer_sizes: Vec<usize>,
}

impl ScriptedConnection {
    pub fn with_reads(reads: Vec<Result<Vec<u8>, BoardError>>) -> Self {
        Self {
            reads: reads.into(),
            ..Default::default()
        }
    }

    /// The body streamed in chunks of `chunk` bytes, then end of stream
    pub fn streaming(body: &[u8], chunk: usize) -> Self {
        Self::with_reads(body.chunks(chunk).map(|c| Ok(c.to_vec())).collect())
    }
}

impl ConnectionProvider for ScriptedConnection {
    async fn connect(&mut self) -> Result<(), BoardError> {
        self.calls.push("connect");
        match self.connect_result {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), BoardError> {
        self.calls.push("send");
        if let Some(e) = self.send_result {
            return Err(e);
        }
        self.sent.extend_from_slice(data);
        Ok(())
    }

    async fn receive_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, BoardError> {
        self.calls.push("receive");
        self.timeouts.push(timeout);
        self.buffer_sizes.push(buf.len());
        match self.reads.pop_front() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(bytes)) => {
                assert!(bytes.len() <= buf.len(), "scripted read larger than buffer");
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
        }
    }

    async fn disconnect(&mut self) {
        self.calls.push("disconnect");
    }
}

/// A trimmed OpenWeatherMap 5 day / 3 hour forecast response with 4 slots
pub const FORECAST_RESPONSE: &[u8] = b"HTTP/1.0 200 OK\r\n\
Server: openresty\r\n\
Content-Type: application/json; charset=utf-8\r\n\
\r\n\
{\"cod\":\"200\",\"message\":0,\"cnt\":4,\"list\":[\
{\"dt\":1734181200,\"main\":{\"temp\":7.53,\"feels_like\":5.1,\"temp_min\":6.9,\"temp_max\":7.53,\"pressure\":1021},\"weather\":[{\"id\":803,\"main\":\"Clouds\"}]},\
{\"dt\":1734192000,\"main\":{\"temp\":6.12,\"feels_like\":3.4,\"temp_min\":4.75,\"temp_max\":6.12,\"pressure\":1022},\"weather\":[{\"id\":804,\"main\":\"Clouds\"}]},\
{\"dt\":1734202800,\"main\":{\"temp\":3.2,\"feels_like\":0.8,\"temp_min\":-1.3,\"temp_max\":3.2,\"pressure\":1023},\"weather\":[{\"id\":800,\"main\":\"Clear\"}]},\
{\"dt\":1734213600,\"main\":{\"temp\":9.8,\"feels_like\":8.0,\"temp_min\":9.1,\"temp_max\":11.4,\"pressure\":1020},\"weather\":[{\"id\":500,\"main\":\"Rain\"}]}\
],\"city\":{\"name\":\"Dublin\",\"country\":\"IE\"}}";
