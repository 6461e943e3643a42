//! DHT20 temperature/humidity sensor over I2C.
//!
//! Generic over `embedded-hal` 1.0 so the same driver runs on the ESP-IDF
//! I2C peripheral and against a scripted bus in tests.
//!
//! ## Transaction sequence
//!
//! ```text
//! detect: W[0x71] R[status]         status & 0x08 == 0 → NotReady
//! read:   W[0xAC 0x33 0x00]         trigger
//!         wait 80 ms
//!         R[7]                      status · H[19:12] · H[11:4] · H[3:0]T[19:16]
//!                                   · T[15:8] · T[7:0] · CRC-8
//! ```
//!
//! A device that passed detection and then stops answering has lost
//! VCC or GND; that is reported as [`DriverError::Power`], distinct from a
//! plain fetch failure.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use log::{debug, warn};

use crate::app::ports::SensorDriver;
use crate::error::DriverError;
use crate::sensors::RawSample;

/// Fixed 7-bit bus address.
pub const ADDRESS: u8 = 0x38;

const CMD_STATUS: u8 = 0x71;
const CMD_TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];
const STATUS_CALIBRATED: u8 = 0x08;
const STATUS_BUSY: u8 = 0x80;
const CONVERSION_MS: u32 = 80;
const BUSY_RETRIES: u8 = 3;
const BUSY_POLL_MS: u32 = 10;
const FULL_SCALE: f32 = 1_048_576.0; // 2^20

pub struct Dht20<I, D> {
    i2c: I,
    delay: D,
}

impl<I: I2c, D: DelayNs> Dht20<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self { i2c, delay }
    }

    fn fetch(&mut self) -> Result<[u8; 7], DriverError> {
        self.i2c
            .write(ADDRESS, &CMD_TRIGGER)
            .map_err(|e| classify(e.kind()))?;
        self.delay.delay_ms(CONVERSION_MS);

        let mut frame = [0u8; 7];
        for attempt in 0..=BUSY_RETRIES {
            self.i2c
                .read(ADDRESS, &mut frame)
                .map_err(|e| classify(e.kind()))?;
            if frame[0] & STATUS_BUSY == 0 {
                return Ok(frame);
            }
            debug!("DHT20 | busy (attempt {})", attempt + 1);
            self.delay.delay_ms(BUSY_POLL_MS);
        }
        warn!("DHT20 | conversion never completed");
        Err(DriverError::Fetch)
    }
}

impl<I, D> SensorDriver for Dht20<I, D>
where
    I: I2c + Send,
    D: DelayNs + Send,
{
    fn detect(&mut self) -> Result<(), DriverError> {
        let mut status = [0u8; 1];
        self.i2c
            .write_read(ADDRESS, &[CMD_STATUS], &mut status)
            .map_err(|_| DriverError::Bus)?;
        if status[0] & STATUS_CALIBRATED == 0 {
            return Err(DriverError::NotReady);
        }
        Ok(())
    }

    fn read(&mut self) -> Result<RawSample, DriverError> {
        let frame = self.fetch()?;
        if crc8(&frame[..6]) != frame[6] {
            return Err(DriverError::Checksum);
        }
        Ok(decode(&frame))
    }
}

/// Silence after successful detection means the device lost power.
fn classify(kind: ErrorKind) -> DriverError {
    match kind {
        ErrorKind::NoAcknowledge(_) => DriverError::Power,
        _ => DriverError::Fetch,
    }
}

fn decode(frame: &[u8; 7]) -> RawSample {
    let raw_h = (u32::from(frame[1]) << 12) | (u32::from(frame[2]) << 4) | (u32::from(frame[3]) >> 4);
    let raw_t =
        ((u32::from(frame[3]) & 0x0F) << 16) | (u32::from(frame[4]) << 8) | u32::from(frame[5]);

    RawSample::new(
        raw_t as f32 / FULL_SCALE * 200.0 - 50.0,
        raw_h as f32 / FULL_SCALE * 100.0,
    )
}

/// CRC-8, polynomial 0x31, initial value 0xFF.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{self, NoAcknowledgeSource, Operation};

    #[derive(Debug)]
    struct BusErr(ErrorKind);

    impl i2c::Error for BusErr {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    /// Scripted bus: fixed status byte and measurement frame, optional
    /// failure on writes or reads.
    struct FakeBus {
        status: u8,
        frame: [u8; 7],
        nack_everything: bool,
        nack_after_detect: bool,
        detected: bool,
    }

    impl FakeBus {
        fn healthy(frame: [u8; 7]) -> Self {
            Self {
                status: 0x18,
                frame,
                nack_everything: false,
                nack_after_detect: false,
                detected: false,
            }
        }
    }

    impl i2c::ErrorType for FakeBus {
        type Error = BusErr;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            let nack = BusErr(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            if self.nack_everything || (self.nack_after_detect && self.detected) {
                return Err(nack);
            }
            let mut status_query = false;
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(bytes) => status_query = bytes.first() == Some(&CMD_STATUS),
                    Operation::Read(buf) if status_query => {
                        buf[0] = self.status;
                        self.detected = true;
                    }
                    Operation::Read(buf) => {
                        let n = buf.len();
                        buf.copy_from_slice(&self.frame[..n]);
                    }
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Build a frame for the given raw 20-bit values with a valid CRC.
    fn frame(raw_h: u32, raw_t: u32) -> [u8; 7] {
        let mut f = [
            0x18,
            (raw_h >> 12) as u8,
            (raw_h >> 4) as u8,
            (((raw_h & 0x0F) << 4) | ((raw_t >> 16) & 0x0F)) as u8,
            (raw_t >> 8) as u8,
            raw_t as u8,
            0,
        ];
        f[6] = crc8(&f[..6]);
        f
    }

    #[test]
    fn crc_matches_reference_vector() {
        // Sensirion reference: 0xBEEF → 0x92
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn decodes_half_scale_frame() {
        let half = 1 << 19;
        let mut dev = Dht20::new(FakeBus::healthy(frame(half, half)), NoDelay);
        dev.detect().unwrap();
        let s = dev.read().unwrap();
        assert!((s.humidity.unwrap() - 50.0).abs() < 0.01);
        assert!((s.temperature.unwrap() - 50.0).abs() < 0.01);
    }

    #[test]
    fn absent_device_is_bus_fault() {
        let mut bus = FakeBus::healthy(frame(0, 0));
        bus.nack_everything = true;
        let mut dev = Dht20::new(bus, NoDelay);
        assert_eq!(dev.detect(), Err(DriverError::Bus));
    }

    #[test]
    fn uncalibrated_device_is_not_ready() {
        let mut bus = FakeBus::healthy(frame(0, 0));
        bus.status = 0x10;
        let mut dev = Dht20::new(bus, NoDelay);
        assert_eq!(dev.detect(), Err(DriverError::NotReady));
    }

    #[test]
    fn silence_after_detect_is_power_fault() {
        let mut bus = FakeBus::healthy(frame(0, 0));
        bus.nack_after_detect = true;
        let mut dev = Dht20::new(bus, NoDelay);
        assert_eq!(dev.detect(), Ok(()));
        assert_eq!(dev.read(), Err(DriverError::Power));
    }

    #[test]
    fn corrupted_frame_is_checksum_error() {
        let mut f = frame(1 << 19, 1 << 19);
        f[6] ^= 0xFF;
        let mut dev = Dht20::new(FakeBus::healthy(f), NoDelay);
        assert_eq!(dev.read(), Err(DriverError::Checksum));
    }

    #[test]
    fn stuck_busy_bit_is_fetch_fault() {
        let mut f = frame(1 << 19, 1 << 19);
        f[0] |= STATUS_BUSY;
        let mut dev = Dht20::new(FakeBus::healthy(f), NoDelay);
        assert_eq!(dev.read(), Err(DriverError::Fetch));
    }
}
