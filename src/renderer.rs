//! Temperature light renderer
//!
//! Maps °C onto strip positions and plays the display sequence: a lit pixel
//! chasing up and back down the strip, then min/current/max shown with min
//! and max blinking, then the strip is cleared.

use crate::config;
use crate::led_control::{OFF, PixelSink};
use crate::BoardError;
use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use smart_leds::RGB8;

/// Dim white used for every lit pixel
pub const ACTIVE_COLOR: RGB8 = RGB8 { r: 5, g: 5, b: 5 };

/// Which temperatures the strip can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    /// Pixels below 0 °C
    pub negative_range: usize,
    /// Pixels from 0 °C upwards
    pub positive_range: usize,
}

impl StripLayout {
    pub const fn new(negative_range: usize, positive_range: usize) -> Self {
        Self {
            negative_range,
            positive_range,
        }
    }

    /// Total number of pixels
    pub const fn len(&self) -> usize {
        self.negative_range + self.positive_range
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of 0 °C
    pub const fn zero_offset(&self) -> usize {
        self.negative_range
    }

    /// Pixel showing `celsius`, or `None` when it is off the strip
    pub fn position(&self, celsius: i32) -> Option<usize> {
        let index = self.zero_offset() as i64 + i64::from(celsius);
        usize::try_from(index).ok().filter(|&i| i < self.len())
    }

    /// Pixel showing `celsius`, pinned to the first or last pixel when off the strip
    pub fn clamped_position(&self, celsius: i32) -> usize {
        let last = self.len().saturating_sub(1) as i64;
        let index = self.zero_offset() as i64 + i64::from(celsius);
        index.clamp(0, last) as usize
    }
}

impl Default for StripLayout {
    fn default() -> Self {
        Self::new(config::NEGATIVE_RANGE, config::POSITIVE_RANGE)
    }
}

/// Animation timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTimings {
    /// How long each pixel stays lit during the sweeps
    pub sweep_step: Duration,
    /// Time between two blink toggles
    pub blink_period: Duration,
    /// Number of blink toggles
    pub blink_cycles: u32,
}

impl Default for RenderTimings {
    fn default() -> Self {
        Self {
            sweep_step: Duration::from_millis(50),
            blink_period: Duration::from_millis(500),
            blink_cycles: 10,
        }
    }
}

/// What to do with a temperature that does not fit on the strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangePolicy {
    /// Show it on the nearest end pixel
    #[default]
    Clamp,
    /// Refuse to render, `BoardError::OutOfRange`
    Reject,
}

/// Configuration for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    pub layout: StripLayout,
    pub timings: RenderTimings,
    pub color: RGB8,
    pub range_policy: RangePolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            layout: StripLayout::default(),
            timings: RenderTimings::default(),
            color: ACTIVE_COLOR,
            range_policy: RangePolicy::default(),
        }
    }
}

/// Strip positions of one render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Positions {
    pub minimum: usize,
    pub current: usize,
    pub maximum: usize,
}

/// Plays the temperature sequence on a pixel sink
///
/// The caller must make sure nothing else touches the sink while
/// [`render`](Self::render) runs.
pub struct TemperatureRenderer {
    config: RenderConfig,
}

impl TemperatureRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Map the three temperatures to pixels according to the range policy
    pub fn positions(&self, min: i32, current: i32, max: i32) -> Result<Positions, BoardError> {
        Ok(Positions {
            minimum: self.position(min)?,
            current: self.position(current)?,
            maximum: self.position(max)?,
        })
    }

    fn position(&self, celsius: i32) -> Result<usize, BoardError> {
        let layout = &self.config.layout;
        if let Some(index) = layout.position(celsius) {
            return Ok(index);
        }

        match self.config.range_policy {
            RangePolicy::Clamp if !layout.is_empty() => {
                let index = layout.clamped_position(celsius);
                log!("[LED] {}°C is off the strip, clamped to pixel {}", celsius, index);
                Ok(index)
            }
            _ => {
                log!("[LED] {}°C is off the strip", celsius);
                Err(BoardError::OutOfRange)
            }
        }
    }

    /// Run the full sequence; returns once the strip is cleared
    ///
    /// A sink whose length differs from the layout is refused with
    /// `DeviceError` before anything is drawn. A sink error later on aborts
    /// the sequence straight away; whatever was already flushed stays on the
    /// strip.
    pub async fn render<S, D>(
        &self,
        sink: &mut S,
        delay: &mut D,
        min: i32,
        current: i32,
        max: i32,
    ) -> Result<(), BoardError>
    where
        S: PixelSink,
        D: DelayNs,
    {
        log!(
            "[LED] light_animate_and_set: temp_min={}, temp_now={}, temp_max={}",
            min,
            current,
            max
        );

        // Validate before the first pixel changes
        let layout_len = self.config.layout.len();
        if sink.len() != layout_len {
            log!(
                "[LED] Strip has {} pixels, layout expects {}",
                sink.len(),
                layout_len
            );
            return Err(BoardError::DeviceError);
        }
        let positions = self.positions(min, current, max)?;

        self.sweep_forward(sink, delay).await?;
        self.sweep_backward(sink, delay).await?;
        self.blink(sink, delay, positions).await?;

        sink.clear()
    }

    /// Single lit pixel travelling from the first to the last LED
    async fn sweep_forward<S: PixelSink, D: DelayNs>(
        &self,
        sink: &mut S,
        delay: &mut D,
    ) -> Result<(), BoardError> {
        for index in 0..sink.len() {
            self.sweep_step(sink, delay, index).await?;
        }
        Ok(())
    }

    /// Back down again, the first LED is not revisited
    async fn sweep_backward<S: PixelSink, D: DelayNs>(
        &self,
        sink: &mut S,
        delay: &mut D,
    ) -> Result<(), BoardError> {
        for index in (1..sink.len()).rev() {
            self.sweep_step(sink, delay, index).await?;
        }
        Ok(())
    }

    async fn sweep_step<S: PixelSink, D: DelayNs>(
        &self,
        sink: &mut S,
        delay: &mut D,
        index: usize,
    ) -> Result<(), BoardError> {
        sink.set_pixel(index, self.config.color)?;
        sink.refresh()?;
        delay.delay_ms(millis(self.config.timings.sweep_step)).await;
        // Staged only, the next refresh shows it
        sink.set_pixel(index, OFF)
    }

    /// Min and max blink, current stays lit once it is on
    async fn blink<S: PixelSink, D: DelayNs>(
        &self,
        sink: &mut S,
        delay: &mut D,
        positions: Positions,
    ) -> Result<(), BoardError> {
        let color = self.config.color;
        let mut on = false;

        for _ in 0..self.config.timings.blink_cycles {
            if on {
                sink.set_pixel(positions.minimum, color)?;
                sink.set_pixel(positions.current, color)?;
                sink.set_pixel(positions.maximum, color)?;
            } else {
                // min/max sharing the current pixel stay lit
                if positions.minimum != positions.current {
                    sink.set_pixel(positions.minimum, OFF)?;
                }
                if positions.maximum != positions.current {
                    sink.set_pixel(positions.maximum, OFF)?;
                }
            }
            sink.refresh()?;

            on = !on;
            delay.delay_ms(millis(self.config.timings.blink_period)).await;
        }
        Ok(())
    }
}

impl Default for TemperatureRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
