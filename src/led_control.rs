use crate::BoardError;
use smart_leds::{RGB8, SmartLedsWrite};

/// LED switched off
pub const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// Full white, the power indicator colour at boot
pub const WHITE: RGB8 = RGB8 {
    r: 255,
    g: 255,
    b: 255,
};

/// Addressable strip the renderer draws on
///
/// `set_pixel` stages a colour, `refresh` makes every staged change visible.
/// `clear` switches every LED off and is visible immediately.
pub trait PixelSink {
    /// Number of addressable pixels
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stage one pixel; `DeviceError` when `index` is past the end
    fn set_pixel(&mut self, index: usize, color: RGB8) -> Result<(), BoardError>;

    /// Push the staged frame to the LEDs
    fn refresh(&mut self) -> Result<(), BoardError>;

    /// Switch every LED off
    fn clear(&mut self) -> Result<(), BoardError>;
}

/// Buffered strip on top of any `smart-leds` driver
///
/// On the board the writer is the RMT based `ws2812::RmtWriter`.
pub struct SmartLedStrip<W, const N: usize> {
    writer: W,
    pixels: [RGB8; N],
    indicator: RGB8,
}

impl<W, const N: usize> SmartLedStrip<W, N>
where
    W: SmartLedsWrite<Color = RGB8>,
{
    /// Create a new strip with every pixel off
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pixels: [OFF; N],
            indicator: WHITE,
        }
    }

    /// Currently staged frame
    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    /// Light or darken the first LED with the stored indicator colour
    pub fn set_power(&mut self, power: bool) -> Result<(), BoardError> {
        let color = if power { self.indicator } else { OFF };
        self.set_pixel(0, color)?;
        self.refresh()
    }

    /// Remember a new indicator colour and show it on the first LED
    pub fn set_color(&mut self, color: RGB8) -> Result<(), BoardError> {
        self.indicator = color;
        self.set_pixel(0, color)?;
        self.refresh()
    }

    /// Get the driver back
    pub fn release(self) -> W {
        self.writer
    }
}

impl<W, const N: usize> PixelSink for SmartLedStrip<W, N>
where
    W: SmartLedsWrite<Color = RGB8>,
{
    fn len(&self) -> usize {
        N
    }

    fn set_pixel(&mut self, index: usize, color: RGB8) -> Result<(), BoardError> {
        let pixel = self.pixels.get_mut(index).ok_or(BoardError::DeviceError)?;
        *pixel = color;
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), BoardError> {
        self.writer
            .write(self.pixels.iter().copied())
            .map_err(|_| BoardError::DeviceError)
    }

    fn clear(&mut self) -> Result<(), BoardError> {
        self.pixels = [OFF; N];
        self.refresh()
    }
}
