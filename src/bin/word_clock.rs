#![deny(warnings)]
#![no_main]
#![no_std]

#[rtic::app(device = stm32f1xx_hal::pac, peripherals = true, dispatchers = [PVD, WWDG])]
mod app {
    use core::fmt::Write;
    use dwt_systick_monotonic::{DwtSystick, ExtU32};
    use heapless::String;
    use smart_leds::RGB8;
    use stm32f103_word_clock::{
        clock_face::ClockFace,
        draw::{scale, Marquee},
        effects::{Colorfall, Effect, Flash},
        hw::{self, Tim2Dma1},
        EncodedFrame, Error, Result, Timing, Ws2812,
    };
    use stm32f1xx_hal::gpio::{gpioc::PC13, Output, PushPull};
    use stm32f1xx_hal::prelude::*;
    use stm32f1xx_hal::rtc::Rtc;
    use stm32f1xx_hal::watchdog::IndependentWatchdog;
    use time::{Duration, Time};

    const FREQ: u32 = 72_000_000;
    #[monotonic(binds = SysTick, default = true)]
    type MyMono = DwtSystick<FREQ>;

    const LED_LEVEL_DAY: u8 = 16;
    const LED_LEVEL_NIGHT: u8 = 1;
    const BASE_COLOR: RGB8 = RGB8 { r: 2, g: 1, b: 0 };
    const CHIME_FLASH_MS: u32 = 400;
    const CHIME_FLASHES: u8 = 3;
    const ROLL_MS: u32 = 60;
    const CLOCK_MS: u32 = 250;
    /// Poll period while the previous frame is still latching.
    const RETRY_MS: u32 = 1;

    pub enum Scene {
        Intro(Colorfall),
        Clock,
        Chime(Flash),
        Announce(Marquee),
    }

    #[shared]
    struct Shared {
        leds: Ws2812<Tim2Dma1>,
    }

    #[local]
    struct Local {
        led: PC13<Output<PushPull>>,
        wdg: IndependentWatchdog,
        rtc: Rtc,
        face: ClockFace,
        scene: Scene,
    }

    #[init]
    fn init(mut c: init::Context) -> (Shared, Local, init::Monotonics) {
        defmt::info!("Starting !!!");

        // workaround, see: https://github.com/knurling-rs/defmt/issues/322
        #[cfg(debug_assertions)]
        c.device.DBGMCU.cr.modify(|_, w| {
            w.dbg_sleep().set_bit();
            w.dbg_standby().set_bit();
            w.dbg_stop().set_bit()
        });
        hw::enable_clocks(&c.device.RCC);

        let mut flash = c.device.FLASH.constrain();
        let rcc = c.device.RCC.constrain();

        let clocks = rcc
            .cfgr
            .use_hse(8.mhz())
            .sysclk(FREQ.hz())
            .pclk1(36.mhz())
            .freeze(&mut flash.acr);

        let mut backup_domain = rcc.bkp.constrain(c.device.BKP, &mut c.device.PWR);
        let rtc = Rtc::rtc(c.device.RTC, &mut backup_domain);

        let mut gpioc = c.device.GPIOC.split();
        let mut led = gpioc.pc13.into_push_pull_output(&mut gpioc.crh);
        led.set_high();

        let bus = Tim2Dma1::new(
            c.device.TIM2,
            c.device.DMA1,
            c.device.GPIOA,
            clocks.pclk1_tim().0,
        );
        let frame = cortex_m::singleton!(: EncodedFrame = EncodedFrame::new()).unwrap();
        let leds = match Ws2812::new(bus, frame, Timing::WS2812B) {
            Ok(leds) => leds,
            Err(e) => defmt::panic!("ws2812 init: {}", e),
        };

        let mut dcb = c.core.DCB;
        let dwt = c.core.DWT;
        let systick = c.core.SYST;
        let mono = DwtSystick::new(&mut dcb, dwt, systick, clocks.sysclk().0);

        let wdg = IndependentWatchdog::new(c.device.IWDG);

        render::spawn_after(50.millis()).unwrap();

        (
            Shared { leds },
            Local {
                led,
                wdg,
                rtc,
                face: ClockFace::new(),
                scene: Scene::Intro(Colorfall::new()),
            },
            init::Monotonics(mono),
        )
    }

    #[task(binds = DMA1_CHANNEL7, shared = [leds], priority = 3)]
    fn dma1_ch7(mut cx: dma1_ch7::Context) {
        if let Err(e) = cx.shared.leds.lock(|leds| leds.on_dma_interrupt()) {
            defmt::panic!("ws2812: {}", e);
        }
    }

    #[task(binds = TIM2, shared = [leds], priority = 3)]
    fn tim2(mut cx: tim2::Context) {
        match cx.shared.leds.lock(|leds| leds.on_timer_interrupt()) {
            Ok(true) => defmt::trace!("frame latched"),
            Ok(false) => (),
            Err(e) => defmt::panic!("ws2812: {}", e),
        }
    }

    fn now(rtc: &Rtc) -> Time {
        Time::MIDNIGHT + Duration::seconds(i64::from(rtc.current_time() % 86_400))
    }

    fn next_scene(scene: &Scene, now: Time) -> Result<Scene> {
        Ok(match scene {
            Scene::Chime(_) => {
                let mut text: String<16> = String::new();
                write!(text, "{} uhr", now.hour()).map_err(|_| Error::TextTooLong)?;
                Scene::Announce(Marquee::new(&text, 0, 0)?)
            }
            _ => Scene::Clock,
        })
    }

    /// Draws one step of the current scene, moving on when it runs out.
    fn step(
        scene: &mut Scene,
        face: &mut ClockFace,
        chimed: &mut Option<u8>,
        frame: &mut EncodedFrame,
        now: Time,
        color: RGB8,
    ) -> Result<u32> {
        if matches!(scene, Scene::Clock) && now.minute() == 0 && *chimed != Some(now.hour()) {
            *chimed = Some(now.hour());
            *scene = Scene::Chime(Flash::new(CHIME_FLASH_MS, CHIME_FLASHES));
        }
        loop {
            let dwell = match &mut *scene {
                Scene::Intro(fall) => fall.next_frame(frame),
                Scene::Chime(flash) => flash.next_frame(frame),
                Scene::Announce(text) => text.next_frame(frame, color),
                Scene::Clock => Some(if face.render(frame, now, color) {
                    ROLL_MS
                } else {
                    CLOCK_MS
                }),
            };
            match dwell {
                Some(ms) => return Ok(ms),
                None => *scene = next_scene(&*scene, now)?,
            }
        }
    }

    #[task(shared = [leds], local = [rtc, face, scene, chimed: Option<u8> = None], priority = 1)]
    fn render(mut cx: render::Context) {
        let now = now(cx.local.rtc);
        let level = if (7..22).contains(&now.hour()) {
            LED_LEVEL_DAY
        } else {
            LED_LEVEL_NIGHT
        };
        let color = scale(BASE_COLOR, level);
        let (scene, face, chimed) = (cx.local.scene, cx.local.face, cx.local.chimed);

        let shown = cx.shared.leds.lock(|leds| -> Result<Option<u32>> {
            if leds.poll_ready().is_err() {
                return Ok(None);
            }
            let dwell = step(scene, face, chimed, leds.frame_mut()?, now, color)?;
            leds.send()?;
            Ok(Some(dwell))
        });

        let dwell = match shown {
            Ok(Some(ms)) => ms,
            Ok(None) => RETRY_MS,
            Err(e) => defmt::panic!("render: {}", e),
        };
        render::spawn_after(dwell.millis()).unwrap();
    }

    #[idle(local = [led, wdg])]
    fn idle(cx: idle::Context) -> ! {
        cx.local.wdg.start(4000.ms());

        loop {
            cx.local.led.set_high();
            rtic::export::wfi();
            cx.local.led.set_low();
            cx.local.wdg.feed();
        }
    }
}
