//! Line levels over timer ticks
//!
//! A waveform is a list of `(tick, level)` edges; the line holds each level
//! from its tick until the next edge. Before the first edge the line idles
//! high (mark).

use capserial_hal::Level;
use heapless::Vec;

/// Maximum edges stored per waveform
pub const MAX_EDGES: usize = 32;

/// Bits per 8N1 frame
const FRAME_BITS: u16 = 10;

/// Recorded or synthesized line levels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Waveform {
    edges: Vec<(u16, Level), MAX_EDGES>,
}

impl Waveform {
    /// Create an idle (always high) waveform
    pub const fn idle() -> Self {
        Self { edges: Vec::new() }
    }

    /// Build a waveform from explicit edges
    ///
    /// Edges beyond [`MAX_EDGES`] are dropped.
    pub fn from_edges(edges: &[(u16, Level)]) -> Self {
        let mut waveform = Self::idle();
        for &(tick, level) in edges {
            if !waveform.push(tick, level) {
                break;
            }
        }
        waveform
    }

    /// Synthesize a 10-bit frame from raw line bits
    ///
    /// Bit 0 of `bits` is sent first (the start bit), bit 9 last (the stop
    /// bit). Bit `i` begins at tick `(ticks_per_frame * i + 5) / 10`.
    pub fn frame_bits(bits: u16, ticks_per_frame: u16) -> Self {
        let mut waveform = Self::idle();
        for i in 0..FRAME_BITS {
            let start = (u32::from(ticks_per_frame) * u32::from(i) + 5) / 10;
            let level = Level::from((bits >> i) & 1 == 1);
            waveform.push(start as u16, level);
        }
        waveform
    }

    /// Synthesize a well-formed 8N1 frame carrying `byte`
    pub fn uart_frame(byte: u8, ticks_per_frame: u16) -> Self {
        Self::frame_bits((1 << 9) | (u16::from(byte) << 1), ticks_per_frame)
    }

    /// Append an edge
    ///
    /// Returns false if the waveform is full.
    pub fn push(&mut self, tick: u16, level: Level) -> bool {
        self.edges.push((tick, level)).is_ok()
    }

    /// Level of the line at `tick`
    pub fn level_at(&self, tick: u16) -> Level {
        self.edges
            .iter()
            .take_while(|(at, _)| *at <= tick)
            .last()
            .map(|&(_, level)| level)
            .unwrap_or(Level::High)
    }

    /// Recorded edges in order
    pub fn edges(&self) -> &[(u16, Level)] {
        &self.edges
    }

    /// Check if no edge has been recorded
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Decode the level of each frame bit at the centre of its cell
    ///
    /// Returns the 10 line bits in the same layout [`Waveform::frame_bits`]
    /// accepts.
    pub fn sample_frame(&self, ticks_per_frame: u16) -> u16 {
        let mut bits = 0u16;
        for i in 0..FRAME_BITS {
            let centre = (u32::from(ticks_per_frame) * (2 * u32::from(i) + 1) + 10) / 20;
            if self.level_at(centre as u16).is_high() {
                bits |= 1 << i;
            }
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_line_is_high() {
        let waveform = Waveform::idle();
        assert_eq!(waveform.level_at(0), Level::High);
        assert_eq!(waveform.level_at(u16::MAX), Level::High);
    }

    #[test]
    fn test_level_holds_until_next_edge() {
        let waveform = Waveform::from_edges(&[(0, Level::Low), (100, Level::High)]);
        assert_eq!(waveform.level_at(0), Level::Low);
        assert_eq!(waveform.level_at(99), Level::Low);
        assert_eq!(waveform.level_at(100), Level::High);
        assert_eq!(waveform.level_at(5000), Level::High);
    }

    #[test]
    fn test_uart_frame_layout() {
        // 0x01: start low, d0 high, d1..d7 low, stop high
        let waveform = Waveform::uart_frame(0x01, 1000);
        assert_eq!(waveform.edges().len(), 10);
        assert_eq!(waveform.level_at(50), Level::Low);
        assert_eq!(waveform.level_at(150), Level::High);
        assert_eq!(waveform.level_at(250), Level::Low);
        assert_eq!(waveform.level_at(950), Level::High);
        assert_eq!(waveform.sample_frame(1000), 0x202);
    }
}
