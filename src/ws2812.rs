//! WS2812 output on the RMT peripheral
//!
//! Encodes each GRB byte into RMT pulse codes and transmits the whole frame
//! in one blocking transaction.

use crate::BoardError;
use alloc::vec::Vec;
use esp_hal::gpio::Level;
use esp_hal::rmt::{PulseCode, TxChannel};
use smart_leds::{RGB8, SmartLedsWrite};

/// `smart-leds` writer for WS2812 strips driven by an RMT channel at 10MHz
pub struct RmtWriter<TX>
where
    TX: TxChannel,
{
    channel: Option<TX>,
}

impl<TX> RmtWriter<TX>
where
    TX: TxChannel,
{
    pub fn new(channel: TX) -> Self {
        Self {
            channel: Some(channel),
        }
    }

    fn transmit(&mut self, pulses: &[u32]) -> Result<(), BoardError> {
        let channel = self.channel.take().ok_or(BoardError::DeviceError)?;
        match channel.transmit(pulses) {
            Ok(transaction) => match transaction.wait() {
                Ok(channel) => {
                    self.channel = Some(channel);
                    Ok(())
                }
                Err((_, channel)) => {
                    self.channel = Some(channel);
                    Err(BoardError::DeviceError)
                }
            },
            // The channel is consumed by a failed transmit
            Err(_) => Err(BoardError::DeviceError),
        }
    }
}

impl<TX> SmartLedsWrite for RmtWriter<TX>
where
    TX: TxChannel,
{
    type Error = BoardError;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let mut pulses = Vec::new();
        for color in iterator {
            let color: RGB8 = color.into();
            // WS2812 wants G, R, B
            for byte in [color.g, color.r, color.b] {
                pulses.extend_from_slice(&byte_to_pulses(byte));
            }
        }

        // Reset: 80us low
        pulses.push(PulseCode::new(Level::Low, 800, Level::Low, 0));

        self.transmit(&pulses)
    }
}

/// Convert a single byte to RMT pulses
/// 1-bit = 8 high + 4 low cycles, 0-bit = 4 high + 8 low cycles at 10MHz
fn byte_to_pulses(byte: u8) -> [u32; 8] {
    let mut pulses = [0u32; 8];

    for (i, pulse) in pulses.iter_mut().enumerate() {
        let bit = (byte >> (7 - i)) & 1;
        *pulse = if bit == 1 {
            PulseCode::new(Level::High, 8, Level::Low, 4)
        } else {
            PulseCode::new(Level::High, 4, Level::Low, 8)
        };
    }

    pulses
}
