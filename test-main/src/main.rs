mod config;

use crate::config::Config;
use dotenv::dotenv;
use lcdbang_gpio::delay::ThreadDelay;
use lcdbang_gpio::gpiod::GpiodDriver;
use lcdbang_gpio::lcd::hd44780::CharacterLcd;
use lcdbang_gpio::lcd::hd44780::driver::{GpioHD44780Driver, TextDirection};
use lcdbang_gpio::{GpioDriver, GpioResult};
use log::{debug, info};
use std::thread::sleep;
use std::time::{Duration, Instant};
use sysinfo::System;

const HEART: [u8; 8] = [
    0b00000, 0b01010, 0b11111, 0b11111, 0b11111, 0b01110, 0b00100, 0b00000,
];

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "Hostname {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );

    let config = Config::load()?;
    let width = config.interface_width()?;
    info!(
        "LCD @ {} RS: {}, RW: {:?}, E: {}, Data: {:?}",
        config.gpio_chip, config.pin_rs, config.pin_rw, config.pin_e, config.pins_data
    );

    let gpio = GpiodDriver::open(&config.gpio_chip)?;
    debug!("{:?} initialized.", gpio);

    let mut pin_rs = gpio.get_pin(config.pin_rs)?;
    let mut pin_e = gpio.get_pin(config.pin_e)?;
    let mut pin_rw = config.pin_rw.map(|index| gpio.get_pin(index)).transpose()?;
    let mut data_pins = config
        .pins_data
        .iter()
        .map(|&index| gpio.get_pin(index))
        .collect::<GpioResult<Vec<_>>>()?;

    let pin_rw_out = match pin_rw.as_mut() {
        Some(pin) => Some(pin.as_output()?),
        None => None,
    };
    let data_out = data_pins
        .iter_mut()
        .map(|pin| pin.as_output())
        .collect::<GpioResult<Vec<_>>>()?;

    let driver = GpioHD44780Driver::new(
        width,
        pin_rs.as_output()?,
        pin_rw_out,
        pin_e.as_output()?,
        data_out,
        ThreadDelay,
    )?;
    let mut lcd = CharacterLcd::new(driver);

    lcd.begin(config.columns, config.lines, config.font.into())?;
    debug!("{:?} initialized.", lcd.state());

    lcd.create_char(0, &HEART)?;
    lcd.home()?;
    lcd.print("Hello ")?;
    lcd.write(0)?;
    if config.lines > 1 {
        lcd.set_cursor(0, 1)?;
        lcd.print(concat!("v", env!("CARGO_PKG_VERSION")))?;
    }
    sleep(Duration::from_secs(2));

    info!("Cursor and blink");
    lcd.cursor_on()?;
    sleep(Duration::from_secs(1));
    lcd.blink_on()?;
    sleep(Duration::from_secs(1));
    lcd.cursor_off()?;
    lcd.blink_off()?;

    info!("Scrolling");
    for _ in 0..4 {
        lcd.scroll_right()?;
        sleep(Duration::from_millis(300));
    }
    for _ in 0..4 {
        lcd.scroll_left()?;
        sleep(Duration::from_millis(300));
    }

    info!("Right to left with autoscroll");
    lcd.clear()?;
    lcd.set_cursor(config.columns - 1, 0)?;
    lcd.text_direction(TextDirection::RightToLeft)?;
    lcd.print("!olleH")?;
    lcd.text_direction(TextDirection::LeftToRight)?;
    lcd.set_cursor(config.columns - 1, 0)?;
    lcd.autoscroll(true)?;
    lcd.print("123")?;
    lcd.autoscroll(false)?;
    sleep(Duration::from_secs(2));

    info!("Blinking display");
    for _ in 0..3 {
        lcd.display_off()?;
        sleep(Duration::from_millis(300));
        lcd.display_on()?;
        sleep(Duration::from_millis(300));
    }

    info!("Counting uptime, Ctrl+C to stop");
    lcd.clear()?;
    lcd.print("Uptime:")?;
    let start = Instant::now();
    loop {
        let row = if config.lines > 1 { 1 } else { 0 };
        let col = if config.lines > 1 { 0 } else { 8 };
        lcd.set_cursor(col, row)?;
        lcd.print(&format!("{}s", start.elapsed().as_secs()))?;

        sleep(Duration::from_millis(500));
    }
}
