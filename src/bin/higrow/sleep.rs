use embassy_time::Duration;
use esp_hal::{
    peripherals::LPWR,
    rtc_cntl::{sleep::TimerWakeupSource, Rtc},
};
use higrow_mqtt_sender::cycle::SleepPrimitive;

/// Timer-only deep sleep on the RTC controller.
pub struct RtcSleep {
    rtc: Rtc<'static>,
}

impl RtcSleep {
    pub fn new(rtc_cntl: LPWR<'static>) -> Self {
        Self {
            rtc: Rtc::new(rtc_cntl),
        }
    }
}

impl SleepPrimitive for RtcSleep {
    fn sleep_deep(mut self, duration: Duration) -> ! {
        let wakeup_source_timer =
            TimerWakeupSource::new(core::time::Duration::from_secs(duration.as_secs()));
        self.rtc.sleep_deep(&[&wakeup_source_timer]);
    }
}
