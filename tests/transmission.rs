use std::cell::RefCell;
use std::rc::Rc;

use stm32f103_word_clock::engine::CompareChannel;
use stm32f103_word_clock::{
    Column, EncodedFrame, Error, PixelBus, Result, Row, Timing, TransferEvent,
    TransmissionState, Ws2812, FRAME_WORDS, RGB8,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Configure(Timing),
    Compare(CompareChannel, u16),
    Arm { ptr: usize, len: usize },
    Start(u16),
    Release,
    ClearOverflow,
    Stop,
}

/// Records every call; transfer events are queued by the test.
#[derive(Clone, Default)]
struct Recorder {
    ops: Rc<RefCell<Vec<Op>>>,
    events: Rc<RefCell<Vec<TransferEvent>>>,
    refuse: bool,
}

impl Recorder {
    fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }

    fn take_ops(&self) -> Vec<Op> {
        self.ops.borrow_mut().drain(..).collect()
    }

    fn push(&self, op: Op) {
        self.ops.borrow_mut().push(op);
    }

    fn raise(&self, event: TransferEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl PixelBus for Recorder {
    fn configure(&mut self, timing: &Timing) -> Result<()> {
        if self.refuse {
            return Err(Error::Config);
        }
        self.push(Op::Configure(*timing));
        Ok(())
    }

    fn set_compare_value(&mut self, channel: CompareChannel, ticks: u16) {
        self.push(Op::Compare(channel, ticks));
    }

    fn arm(&mut self, (ptr, len): (*const u16, usize)) {
        self.push(Op::Arm {
            ptr: ptr as usize,
            len,
        });
    }

    fn start(&mut self, preset: u16) {
        self.push(Op::Start(preset));
    }

    fn transfer_event(&mut self) -> Option<TransferEvent> {
        self.events.borrow_mut().pop()
    }

    fn release(&mut self) {
        self.push(Op::Release);
    }

    fn clear_overflow(&mut self) {
        self.push(Op::ClearOverflow);
    }

    fn stop(&mut self) {
        self.push(Op::Stop);
    }
}

fn frame() -> &'static mut EncodedFrame {
    Box::leak(Box::new(EncodedFrame::new()))
}

fn engine() -> (Ws2812<Recorder>, Recorder) {
    let bus = Recorder::default();
    let engine = Ws2812::new(bus.clone(), frame(), Timing::WS2812B).unwrap();
    bus.take_ops();
    (engine, bus)
}

fn finish_transfer(engine: &mut Ws2812<Recorder>, bus: &Recorder) {
    bus.raise(TransferEvent::Complete);
    engine.on_dma_interrupt().unwrap();
}

fn finish_dead_time(engine: &mut Ws2812<Recorder>) {
    while !engine.on_timer_interrupt().unwrap() {}
}

#[test]
fn init_programs_timer_then_compares() {
    let bus = Recorder::default();
    let engine = Ws2812::new(bus.clone(), frame(), Timing::WS2812B).unwrap();

    assert_eq!(
        bus.ops(),
        [
            Op::Configure(Timing::WS2812B),
            Op::Compare(CompareChannel::Data, 8),
            Op::Compare(CompareChannel::Low, 17),
        ]
    );
    assert_eq!(engine.state(), TransmissionState::IdleReady);
    assert!(engine.is_transmission_complete());
    assert_eq!(engine.frame(), &EncodedFrame::new());
}

#[test]
fn refused_configuration_is_fatal() {
    let bus = Recorder {
        refuse: true,
        ..Recorder::default()
    };
    assert_eq!(
        Ws2812::new(bus.clone(), frame(), Timing::WS2812B).err(),
        Some(Error::Config)
    );
    assert!(bus.ops().is_empty());
}

#[test]
fn full_cycle_follows_state_order() {
    let (mut engine, bus) = engine();
    let frame_ptr = engine.frame().words().as_ptr() as usize;

    engine.send().unwrap();
    assert_eq!(engine.state(), TransmissionState::Transmitting);
    assert!(!engine.is_transmission_complete());
    assert_eq!(
        bus.take_ops(),
        [
            Op::Arm {
                ptr: frame_ptr,
                len: FRAME_WORDS
            },
            Op::Start(Timing::WS2812B.auto_reload()),
        ]
    );

    finish_transfer(&mut engine, &bus);
    assert_eq!(engine.state(), TransmissionState::DeadTime);
    assert!(!engine.is_transmission_complete());
    assert_eq!(bus.take_ops(), [Op::Release]);

    finish_dead_time(&mut engine);
    assert_eq!(engine.state(), TransmissionState::IdleReady);
    assert!(engine.is_transmission_complete());

    let ops = bus.take_ops();
    let periods = Timing::WS2812B.dead_periods() as usize;
    assert_eq!(ops.len(), periods + 1);
    assert!(ops[..periods].iter().all(|op| *op == Op::ClearOverflow));
    assert_eq!(ops[periods], Op::Stop);
}

#[test]
fn flag_stays_low_until_last_dead_period() {
    let (mut engine, bus) = engine();
    engine.send().unwrap();
    finish_transfer(&mut engine, &bus);

    let periods = Timing::WS2812B.dead_periods();
    for n in 1..periods {
        assert_eq!(engine.on_timer_interrupt(), Ok(false), "overflow {n}");
        assert!(!engine.is_transmission_complete());
    }
    assert_eq!(engine.on_timer_interrupt(), Ok(true));
    assert!(engine.is_transmission_complete());
}

#[test]
fn overflow_count_restarts_each_frame() {
    let (mut engine, bus) = engine();
    for _ in 0..3 {
        engine.send().unwrap();
        finish_transfer(&mut engine, &bus);
        bus.take_ops();
        finish_dead_time(&mut engine);
        let clears = bus
            .take_ops()
            .iter()
            .filter(|op| **op == Op::ClearOverflow)
            .count();
        assert_eq!(clears, Timing::WS2812B.dead_periods() as usize);
    }
}

#[test]
fn second_send_is_rejected_without_touching_dma() {
    let (mut engine, bus) = engine();
    engine.send().unwrap();
    bus.take_ops();

    assert_eq!(
        engine.send(),
        Err(Error::InvalidState(TransmissionState::Transmitting))
    );
    finish_transfer(&mut engine, &bus);
    bus.take_ops();
    assert_eq!(
        engine.send(),
        Err(Error::InvalidState(TransmissionState::DeadTime))
    );
    assert!(bus.ops().is_empty());

    finish_dead_time(&mut engine);
    assert_eq!(engine.send(), Ok(()));
}

#[test]
fn drawing_waits_for_idle() {
    let (mut engine, bus) = engine();
    let (row, column) = (Row::new(1).unwrap(), Column::new(1).unwrap());
    engine.send().unwrap();
    assert!(engine.frame_mut().is_err());
    assert!(engine.set_pixel(row, column, RGB8::new(1, 2, 3)).is_err());

    finish_transfer(&mut engine, &bus);
    finish_dead_time(&mut engine);
    engine.set_pixel(row, column, RGB8::new(1, 2, 3)).unwrap();
    assert_eq!(engine.frame().pixel(row, column), RGB8::new(1, 2, 3));
}

#[test]
fn single_pixel_frame() {
    let (mut engine, bus) = engine();
    let origin = (Row::new(0).unwrap(), Column::new(0).unwrap());
    engine
        .set_pixel(origin.0, origin.1, RGB8::new(0xFF, 0, 0))
        .unwrap();
    engine.send().unwrap();

    let words = engine.frame().words();
    assert!(words[0..8].iter().all(|w| *w == 0));
    assert!(words[8..16].iter().all(|w| *w == 0x0001));
    assert!(words[16..].iter().all(|w| *w == 0));

    // frame is kept after the transfer
    finish_transfer(&mut engine, &bus);
    finish_dead_time(&mut engine);
    assert_eq!(engine.frame().pixel(origin.0, origin.1), RGB8::new(0xFF, 0, 0));
}

#[test]
fn transfer_error_is_reported() {
    let (mut engine, bus) = engine();
    engine.send().unwrap();
    bus.raise(TransferEvent::Error);
    assert_eq!(engine.on_dma_interrupt(), Err(Error::Transfer));
}

#[test]
fn interrupts_out_of_order_are_rejected() {
    let (mut engine, bus) = engine();
    assert_eq!(
        engine.on_timer_interrupt(),
        Err(Error::InvalidState(TransmissionState::IdleReady))
    );

    engine.send().unwrap();
    assert_eq!(
        engine.on_timer_interrupt(),
        Err(Error::InvalidState(TransmissionState::Transmitting))
    );
    finish_transfer(&mut engine, &bus);
    bus.raise(TransferEvent::Complete);
    assert_eq!(
        engine.on_dma_interrupt(),
        Err(Error::InvalidState(TransmissionState::DeadTime))
    );

    bus.take_ops();
    finish_dead_time(&mut engine);
    assert_eq!(bus.ops().last(), Some(&Op::Stop));
    assert!(!bus.ops().contains(&Op::Release));
}

#[test]
fn armed_frame_survives_moving_engine() {
    let (mut engine, bus) = engine();
    engine.send().unwrap();
    let armed = match bus.take_ops()[0] {
        Op::Arm { ptr, .. } => ptr,
        ref op => panic!("expected arm, got {op:?}"),
    };

    let mut moved = Box::new(engine);
    assert_eq!(moved.frame().words().as_ptr() as usize, armed);
    finish_transfer(&mut moved, &bus);
    finish_dead_time(&mut moved);
    assert!(moved.is_transmission_complete());
}

#[test]
fn dropping_mid_transfer_stops_hardware() {
    let (mut engine, bus) = engine();
    engine.send().unwrap();
    bus.take_ops();
    drop(engine);
    assert_eq!(bus.take_ops(), [Op::Release, Op::Stop]);
}

#[test]
fn dropping_during_dead_time_stops_timer() {
    let (mut engine, bus) = engine();
    engine.send().unwrap();
    finish_transfer(&mut engine, &bus);
    bus.take_ops();
    drop(engine);
    assert_eq!(bus.take_ops(), [Op::Stop]);
}

#[test]
fn dropping_idle_engine_leaves_hardware_alone() {
    let (engine, bus) = engine();
    drop(engine);
    assert!(bus.ops().is_empty());
}
