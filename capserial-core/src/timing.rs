//! Clock/timing calculator
//!
//! Converts a baud rate into a counter prescaler and two per-bit tables of
//! tick offsets measured from the start of a frame:
//!
//! - `rx_sample_instants[i]`: when the receive engine samples bit `i`
//! - `tx_output_instants[i]`: when the transmit engine ends bit `i`
//!
//! # Prescaler selection
//!
//! `raw = 11 × f_cpu / 65536 / baud` estimates the divider needed to keep a
//! frame inside the 16-bit counter with some margin. The smallest divider
//! of {1, 8, 64} above `raw` is chosen.

use capserial_hal::Prescaler;

use crate::error::ConfigError;

/// Bit times per 8N1 frame (start + 8 data + stop)
pub const FRAME_BITS: usize = 10;

/// Minimum counter ticks per frame (4 ticks per bit)
pub const MIN_TICKS_PER_FRAME: u32 = 4 * FRAME_BITS as u32;

/// Index of the stop bit within a frame
pub const STOP_BIT: usize = FRAME_BITS - 1;

/// Timing of one frame at a given baud rate and CPU clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameTiming {
    baud_rate: u32,
    prescaler: Prescaler,
    ticks_per_frame: u16,
    rx_sample_instants: [u16; FRAME_BITS],
    tx_output_instants: [u16; FRAME_BITS],
}

impl FrameTiming {
    /// Derive the timing for `baud_rate` on a CPU running at `cpu_hz`
    pub fn compute(cpu_hz: u32, baud_rate: u32) -> Result<Self, ConfigError> {
        let prescaler = select_prescaler(cpu_hz, baud_rate)?;

        let ticks = 10 * u64::from(cpu_hz) / u64::from(baud_rate) / u64::from(prescaler.divisor());
        if ticks < u64::from(MIN_TICKS_PER_FRAME) {
            return Err(ConfigError::UnsupportedBaud);
        }
        let ticks_per_frame = u16::try_from(ticks).map_err(|_| ConfigError::UnsupportedBaud)?;

        Ok(Self {
            baud_rate,
            prescaler,
            ticks_per_frame,
            rx_sample_instants: rx_sample_instants(ticks_per_frame),
            tx_output_instants: tx_output_instants(ticks_per_frame),
        })
    }

    /// Requested baud rate
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Selected counter prescaler
    pub fn prescaler(&self) -> Prescaler {
        self.prescaler
    }

    /// Counter ticks spanning one frame
    pub fn ticks_per_frame(&self) -> u16 {
        self.ticks_per_frame
    }

    /// Sampling instant of each bit, in ticks from the start edge
    pub fn rx_sample_instants(&self) -> &[u16; FRAME_BITS] {
        &self.rx_sample_instants
    }

    /// End of each transmitted bit, in ticks from the start of the frame
    pub fn tx_output_instants(&self) -> &[u16; FRAME_BITS] {
        &self.tx_output_instants
    }
}

/// Pick the counter prescaler for `baud_rate`
///
/// Fails with [`ConfigError::UnsupportedBaud`] if even the largest divider would
/// overflow the counter within one frame, or if the baud rate is zero.
pub fn select_prescaler(cpu_hz: u32, baud_rate: u32) -> Result<Prescaler, ConfigError> {
    if baud_rate == 0 {
        return Err(ConfigError::UnsupportedBaud);
    }
    let raw = 11 * u64::from(cpu_hz) / 65536 / u64::from(baud_rate);
    Prescaler::ALL
        .into_iter()
        .find(|p| raw < u64::from(p.divisor()))
        .ok_or(ConfigError::UnsupportedBaud)
}

/// Sampling instants: bit centres, except the stop bit
///
/// The stop bit is sampled at 73/80 of the frame instead of 95/100 so the
/// handler finishes well before the next start edge can arrive.
fn rx_sample_instants(ticks_per_frame: u16) -> [u16; FRAME_BITS] {
    let ticks = u32::from(ticks_per_frame);
    let mut instants = [0u16; FRAME_BITS];
    for (i, instant) in instants.iter_mut().enumerate() {
        let i = i as u32;
        let at = if i as usize == STOP_BIT {
            ticks * (i * 8 + 1) / 80
        } else {
            (ticks * (i * 2 + 1) + 10) / 20
        };
        *instant = at as u16;
    }
    instants
}

/// Output instants: the trailing edge of each bit cell
fn tx_output_instants(ticks_per_frame: u16) -> [u16; FRAME_BITS] {
    let ticks = u32::from(ticks_per_frame);
    let mut instants = [0u16; FRAME_BITS];
    for (i, instant) in instants.iter_mut().enumerate() {
        *instant = ((ticks * (i as u32 + 1) + 5) / 10) as u16;
    }
    instants
}
