//! Stream trait adapters
//!
//! `&SoftSerial` implements the blocking `embedded-io` traits and the
//! `UartTx`/`UartRx` traits of `capserial-hal`, so a link in a `static`
//! can be handed to any driver written against either.

use capserial_hal::uart::{UartRx, UartTx};
use capserial_hal::{CaptureTimer, DigitalIo};

use crate::error::LinkError;
use crate::flow::{CtsWait, Forever};
use crate::link::SoftSerial;

impl<T, D, const N: usize> SoftSerial<T, D, N>
where
    T: CaptureTimer,
    D: DigitalIo,
{
    /// Block until a byte arrives
    fn read_byte_blocking(&self) -> Result<u8, LinkError> {
        loop {
            if !self.is_configured() {
                return Err(LinkError::NotConfigured);
            }
            if let Some(byte) = self.read() {
                return Ok(byte);
            }
            core::hint::spin_loop();
        }
    }

    /// Send every byte of `data`, sharing one CTS wait budget across them
    ///
    /// Fails with [`LinkError::CtsTimeout`] once `wait` gives up; the bytes
    /// before that point have been sent.
    pub fn write_all_until<W: CtsWait>(&self, data: &[u8], wait: &mut W) -> Result<(), LinkError> {
        for &byte in data {
            if self.write_until(byte, wait) == 0 {
                return Err(if self.is_configured() {
                    LinkError::CtsTimeout
                } else {
                    LinkError::NotConfigured
                });
            }
        }
        Ok(())
    }
}

impl<T, D, const N: usize> embedded_io::ErrorType for &SoftSerial<T, D, N> {
    type Error = LinkError;
}

impl<T, D, const N: usize> embedded_io::Read for &SoftSerial<T, D, N>
where
    T: CaptureTimer,
    D: DigitalIo,
{
    /// Blocks for the first byte, then takes whatever else is waiting
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some((first, rest)) = buf.split_first_mut() else {
            return Ok(0);
        };
        *first = self.read_byte_blocking()?;

        let mut count = 1;
        for slot in rest {
            match SoftSerial::read(*self) {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl<T, D, const N: usize> embedded_io::ReadReady for &SoftSerial<T, D, N>
where
    T: CaptureTimer,
    D: DigitalIo,
{
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        if !self.is_configured() {
            return Err(LinkError::NotConfigured);
        }
        Ok(self.available() > 0)
    }
}

impl<T, D, const N: usize> embedded_io::Write for &SoftSerial<T, D, N>
where
    T: CaptureTimer,
    D: DigitalIo,
{
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.write_all_until(buf, &mut Forever)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        SoftSerial::flush(*self);
        Ok(())
    }
}

impl<T, D, const N: usize> embedded_io::WriteReady for &SoftSerial<T, D, N>
where
    T: CaptureTimer,
    D: DigitalIo,
{
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        if !self.is_configured() {
            return Err(LinkError::NotConfigured);
        }
        Ok(self.can_write())
    }
}

impl<T, D, const N: usize> UartTx for &SoftSerial<T, D, N>
where
    T: CaptureTimer,
    D: DigitalIo,
{
    type Error = LinkError;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.write_all_until(data, &mut Forever)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T, D, const N: usize> UartRx for &SoftSerial<T, D, N>
where
    T: CaptureTimer,
    D: DigitalIo,
{
    type Error = LinkError;

    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte_blocking()?;
        }
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::MaxPolls;
    use capserial_hal::{CaptureHandler, FrameFormat, Level, PinId};
    use capserial_hal_sim::{SimBoard, SimIo, SimTimer, Waveform};
    use embedded_io::{ErrorKind, Read, ReadReady, Write, WriteReady};

    const F_CPU: u32 = 16_000_000;
    const BAUD: u32 = 115_200;
    const RXD: PinId = PinId(8);
    const TXD: PinId = PinId(9);
    const CTS: PinId = PinId(11);

    type Link<'a> = SoftSerial<SimTimer<'a>, SimIo<'a>, 16>;

    fn link(board: &SimBoard) -> Link<'_> {
        let link = SoftSerial::new(F_CPU, board.timer(), board.io());
        link.begin(BAUD, FrameFormat::SERIAL_8N1, None, None).unwrap();
        link
    }

    fn receive(board: &SimBoard, link: &Link<'_>, byte: u8) {
        let ticks = link.timing().unwrap().ticks_per_frame();
        board.begin_frame(RXD, Waveform::uart_frame(byte, ticks), 5);
        link.on_capture_event();
    }

    #[test]
    fn test_unconfigured_link_reports_errors() {
        let board = SimBoard::new();
        let link: Link<'_> = SoftSerial::new(F_CPU, board.timer(), board.io());
        let mut port = &link;

        let mut buf = [0u8; 4];
        assert_eq!(Read::read(&mut port, &mut buf), Err(LinkError::NotConfigured));
        assert_eq!(Write::write(&mut port, b"hi"), Err(LinkError::NotConfigured));
        assert_eq!(port.read_ready(), Err(LinkError::NotConfigured));
        assert_eq!(port.write_ready(), Err(LinkError::NotConfigured));
        assert_eq!(port.write_blocking(b"x"), Err(LinkError::NotConfigured));
    }

    #[test]
    fn test_empty_buffers_are_no_ops() {
        let board = SimBoard::new();
        let link: Link<'_> = SoftSerial::new(F_CPU, board.timer(), board.io());
        let mut port = &link;
        assert_eq!(Read::read(&mut port, &mut []), Ok(0));
        assert_eq!(Write::write(&mut port, &[]), Ok(0));
    }

    #[test]
    fn test_read_takes_everything_waiting() {
        let board = SimBoard::new();
        let link = link(&board);
        for byte in *b"abc" {
            receive(&board, &link, byte);
        }

        let mut port = &link;
        assert_eq!(port.read_ready(), Ok(true));
        let mut buf = [0u8; 8];
        assert_eq!(Read::read(&mut port, &mut buf), Ok(3));
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(port.read_ready(), Ok(false));
    }

    #[test]
    fn test_uart_rx_fills_buffer() {
        let board = SimBoard::new();
        let link = link(&board);
        for byte in [0x10, 0x20] {
            receive(&board, &link, byte);
        }

        let mut port = &link;
        let mut buf = [0u8; 2];
        assert_eq!(port.read_blocking(&mut buf), Ok(2));
        assert_eq!(buf, [0x10, 0x20]);
    }

    #[test]
    fn test_bounded_write_times_out_on_cts() {
        let board = SimBoard::new();
        let link: Link<'_> = SoftSerial::new(F_CPU, board.timer(), board.io());
        link.begin(BAUD, FrameFormat::SERIAL_8N1, None, Some(CTS)).unwrap();
        board.drive(CTS, Level::Low);

        board.record(TXD);
        let err = link.write_all_until(b"ab", &mut MaxPolls(5)).unwrap_err();
        assert_eq!(err, LinkError::CtsTimeout);
        assert_eq!(embedded_io::Error::kind(&err), ErrorKind::TimedOut);
        assert!(board.take_trace().is_empty());

        // first byte goes out, then the peer drops CTS
        board.drive(CTS, Level::High);
        board.drive_after(CTS, Level::Low, 1);
        assert_eq!(
            link.write_all_until(b"ab", &mut MaxPolls(3)),
            Err(LinkError::CtsTimeout)
        );
        assert!(link.is_operational());
    }

    #[test]
    fn test_bounded_write_on_unconfigured_link() {
        let board = SimBoard::new();
        let link: Link<'_> = SoftSerial::new(F_CPU, board.timer(), board.io());
        assert_eq!(
            link.write_all_until(b"a", &mut MaxPolls(5)),
            Err(LinkError::NotConfigured)
        );
    }

    #[test]
    fn test_write_sends_every_byte() {
        let board = SimBoard::new();
        let link = link(&board);
        let ticks = link.timing().unwrap().ticks_per_frame();
        let mut port = &link;

        assert_eq!(port.write_ready(), Ok(true));
        for byte in *b"ok" {
            board.record(TXD);
            assert_eq!(Write::write(&mut port, &[byte]), Ok(1));
            let frame = board.take_trace().sample_frame(ticks);
            assert_eq!(frame, (1 << 9) | (u16::from(byte) << 1));
        }

        board.record(TXD);
        assert_eq!(port.write_blocking(b"xyz"), Ok(()));
        assert!(!board.take_trace().is_empty());
        assert_eq!(Write::flush(&mut port), Ok(()));
    }
}
