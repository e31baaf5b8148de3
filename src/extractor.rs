//! Streaming temperature extraction
//!
//! Picks `"temp":N`, `"temp_min":N` and `"temp_max":N` out of the raw HTTP
//! response as it arrives from the socket, one chunk at a time. No JSON
//! parsing: every byte offset of a chunk is tried against each tag.
//!
//! Matches are only looked for inside a single chunk. A tag or number cut by
//! a chunk boundary is missed (or its number truncated).

/// `current` before the first `"temp"` is seen
pub const UNSET: i32 = 99;

/// Start value of the running minimum, above any real reading
pub const MIN_SENTINEL: i32 = 99;

/// Start value of the running maximum, below any real reading
pub const MAX_SENTINEL: i32 = -40;

const TAG_CURRENT: &[u8] = b"\"temp\":";
const TAG_MIN: &[u8] = b"\"temp_min\":";
const TAG_MAX: &[u8] = b"\"temp_max\":";

/// Temperatures found in one response, in whole °C
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureSample {
    pub current: i32,
    pub minimum: i32,
    pub maximum: i32,
}

impl TemperatureSample {
    /// Nothing found yet
    pub const EMPTY: Self = Self {
        current: UNSET,
        minimum: MIN_SENTINEL,
        maximum: MAX_SENTINEL,
    };

    pub fn has_current(&self) -> bool {
        self.current != UNSET
    }

    pub fn has_minimum(&self) -> bool {
        self.minimum != MIN_SENTINEL
    }

    pub fn has_maximum(&self) -> bool {
        self.maximum != MAX_SENTINEL
    }

    /// All three values came from the response
    pub fn is_complete(&self) -> bool {
        self.has_current() && self.has_minimum() && self.has_maximum()
    }

    /// Not a single value came from the response
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl Default for TemperatureSample {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Incremental extractor fed with successive socket reads
#[derive(Debug, Clone)]
pub struct TemperatureExtractor {
    sample: TemperatureSample,
}

impl TemperatureExtractor {
    pub fn new() -> Self {
        Self {
            sample: TemperatureSample::EMPTY,
        }
    }

    /// Scan one chunk and fold every match into the running sample
    pub fn feed(&mut self, chunk: &[u8]) {
        for i in 0..chunk.len() {
            let window = &chunk[i..];

            if !self.sample.has_current() {
                if let Some(value) = scan_tagged(window, TAG_CURRENT) {
                    self.sample.current = value;
                    log!("[HTTP] temp_now={}", value);
                }
            }

            if let Some(value) = scan_tagged(window, TAG_MIN) {
                if value < self.sample.minimum {
                    self.sample.minimum = value;
                    log!("[HTTP] new temp_min={}", value);
                }
            }

            if let Some(value) = scan_tagged(window, TAG_MAX) {
                if value > self.sample.maximum {
                    self.sample.maximum = value;
                    log!("[HTTP] new temp_max={}", value);
                }
            }
        }
    }

    /// Values accumulated so far
    pub fn sample(&self) -> TemperatureSample {
        self.sample
    }

    /// End of stream; hand the sample over
    pub fn finalize(self) -> TemperatureSample {
        self.sample
    }
}

impl Default for TemperatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Match `tag` at the start of `input` and parse the integer right after it
fn scan_tagged(input: &[u8], tag: &[u8]) -> Option<i32> {
    let rest = input.strip_prefix(tag)?;
    parse_int(rest)
}

/// Leading whitespace, optional sign, then as many decimal digits as there are.
/// Stops at the first non-digit, so `7.53` reads as 7. Saturates at the `i32` range.
fn parse_int(input: &[u8]) -> Option<i32> {
    let mut rest = input;
    while let [b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c, tail @ ..] = rest {
        rest = tail;
    }

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let magnitude = rest[..digits].iter().fold(0i64, |acc, &d| {
        acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
    });
    let value = if negative { -magnitude } else { magnitude };

    Some(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}
