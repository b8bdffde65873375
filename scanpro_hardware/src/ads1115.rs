use std::time::Duration;

use rppal::i2c::I2c;
use scanpro_traits::{Adc, HwResult};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::wait_until_with_timeout;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

// PGA ±4.096 V (gain 1), single-shot, 128 SPS, comparator disabled.
const CONFIG_OS_START: u8 = 0x80;
const CONFIG_PGA_4V096: u8 = 0b001 << 1;
const CONFIG_MODE_SINGLE: u8 = 0x01;
const CONFIG_LO: u8 = (0b100 << 5) | 0b11;
const FULL_SCALE_V: f32 = 4.096;

/// ADS1115 16-bit ADC, single-ended read of one channel.
pub struct Ads1115 {
    i2c: I2c,
    channel: u8,
    read_timeout: Duration,
}

impl Ads1115 {
    pub fn open(bus: u8, address: u16, channel: u8, read_timeout: Duration) -> Result<Self> {
        if channel > 3 {
            return Err(HwError::InvalidChannel(channel));
        }
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;
        Ok(Self {
            i2c,
            channel,
            read_timeout,
        })
    }

    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<f32> {
        let mux = 0b100 | self.channel;
        let hi = CONFIG_OS_START | (mux << 4) | CONFIG_PGA_4V096 | CONFIG_MODE_SINGLE;
        self.i2c.write(&[REG_CONFIG, hi, CONFIG_LO])?;

        let i2c = &self.i2c;
        wait_until_with_timeout(
            || {
                let mut cfg = [0u8; 2];
                i2c.write_read(&[REG_CONFIG], &mut cfg)?;
                Ok(cfg[0] & CONFIG_OS_START != 0)
            },
            timeout,
            Duration::from_micros(500),
        )?;

        let mut buf = [0u8; 2];
        self.i2c.write_read(&[REG_CONVERSION], &mut buf)?;
        let raw = i16::from_be_bytes(buf);
        let volts = f32::from(raw) * FULL_SCALE_V / 32768.0;
        trace!(raw, volts, "ads1115 read");
        Ok(volts)
    }
}

impl Adc for Ads1115 {
    fn voltage(&mut self) -> HwResult<f32> {
        let timeout = self.read_timeout;
        Ok(self.read_with_timeout(timeout)?)
    }
}
