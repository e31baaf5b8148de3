mod common;

use common::{DIM, Event, OFF, RecordingDelay, RecordingStrip, new_log};
use embassy_futures::block_on;
use weather_strip::{BoardError, RangePolicy, RenderConfig, TemperatureRenderer};

const LEN: usize = 50;

type Run = (Result<(), BoardError>, RecordingStrip, Vec<Event>);

/// Render on a `len` pixel strip, strip and delay sharing one event log
fn run(renderer: &TemperatureRenderer, strip_len: usize, fail_on_refresh: Option<usize>, t: (i32, i32, i32)) -> Run {
    let log = new_log();
    let mut strip = RecordingStrip::new(strip_len, log.clone());
    if let Some(n) = fail_on_refresh {
        strip = strip.failing_on_refresh(n);
    }
    let mut delay = RecordingDelay::new(log.clone());

    let result = block_on(renderer.render(&mut strip, &mut delay, t.0, t.1, t.2));
    let events = log.borrow().clone();
    (result, strip, events)
}

fn render(min: i32, current: i32, max: i32) -> (RecordingStrip, Vec<Event>) {
    let (result, strip, events) = run(&TemperatureRenderer::default(), LEN, None, (min, current, max));
    result.expect("render failed");
    (strip, events)
}

/// Events of the blink phase: everything after the last sweep delay
fn blink_phase(events: &[Event]) -> &[Event] {
    let last_sweep = events
        .iter()
        .rposition(|e| *e == Event::DelayMs(50))
        .expect("no sweep");
    &events[last_sweep + 1..]
}

#[test]
fn strip_is_dark_after_render() {
    let (strip, events) = render(-14, 3, 34);
    assert!(strip.lit().is_empty());
    assert!(strip.staged.iter().all(|p| *p == OFF));
    assert_eq!(events.last(), Some(&Event::Clear));
}

#[test]
fn strip_is_dark_after_render_for_many_triples() {
    for (min, current, max) in [(-15, -15, -15), (0, 0, 0), (-5, 10, 34), (2, 7, 15), (34, 34, 34)] {
        let (strip, _) = render(min, current, max);
        assert!(strip.lit().is_empty(), "pixels left on for {min}/{current}/{max}");
    }
}

#[test]
fn sweep_lights_one_pixel_at_a_time() {
    let (strip, _) = render(2, 7, 15);

    // 50 forward + 49 backward sweep frames, then 10 blink frames and the clear
    assert_eq!(strip.frames.len(), 50 + 49 + 10 + 1);

    let expected: Vec<Vec<usize>> = (0..LEN).chain((1..LEN).rev()).map(|i| vec![i]).collect();
    assert_eq!(&strip.frames[..99], expected.as_slice());
}

#[test]
fn sweep_and_blink_timing() {
    let (_, events) = render(2, 7, 15);
    let delays: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            Event::DelayMs(ms) => Some(*ms),
            _ => None,
        })
        .collect();

    assert_eq!(delays.len(), 99 + 10);
    assert!(delays[..99].iter().all(|ms| *ms == 50));
    assert!(delays[99..].iter().all(|ms| *ms == 500));
}

#[test]
fn blink_uses_min_current_max_positions() {
    // -14 °C -> 1, 3 °C -> 18, 34 °C -> 49
    let (strip, events) = render(-14, 3, 34);

    let touched: Vec<usize> = blink_phase(&events)
        .iter()
        .filter_map(|e| match e {
            Event::Set(i, _) => Some(*i),
            _ => None,
        })
        .collect();
    assert!(!touched.is_empty());
    assert!(touched.iter().all(|i| [1, 18, 49].contains(i)));

    let blink_frames = &strip.frames[99..109];
    assert_eq!(blink_frames[0], Vec::<usize>::new());
    for (n, frame) in blink_frames.iter().enumerate().skip(1) {
        if n % 2 == 1 {
            assert_eq!(frame, &vec![1, 18, 49], "frame {n}");
        } else {
            assert_eq!(frame, &vec![18], "frame {n}");
        }
    }
}

#[test]
fn current_stays_lit_through_blink() {
    let (_, events) = render(-14, 3, 34);
    let blink = blink_phase(&events);

    let first_on = blink
        .iter()
        .position(|e| *e == Event::Set(18, DIM))
        .expect("current never lit");
    let clear = blink.iter().position(|e| *e == Event::Clear).expect("no clear");

    assert!(
        blink[first_on..clear]
            .iter()
            .all(|e| *e != Event::Set(18, OFF))
    );
}

#[test]
fn current_sharing_min_pixel_stays_lit() {
    let (strip, _) = render(5, 5, 20);
    // 5 °C is pixel 20 for both min and current, it must never go dark once lit
    for frame in &strip.frames[100..109] {
        assert!(frame.contains(&20), "{frame:?}");
    }
}

#[test]
fn current_sharing_max_pixel_stays_lit() {
    let (strip, _) = render(0, 20, 20);
    // 20 °C is pixel 35 for both current and max, 0 °C (pixel 15) still blinks
    for frame in &strip.frames[100..109] {
        assert!(frame.contains(&35), "{frame:?}");
    }
    assert_eq!(strip.frames[100], vec![15, 35]);
    assert_eq!(strip.frames[101], vec![35]);
}

#[test]
fn out_of_range_is_clamped_by_default() {
    let (strip, _) = render(-30, 3, 60);
    assert_eq!(strip.frames[100], vec![0, 18, 49]);
    assert!(strip.lit().is_empty());
}

#[test]
fn reject_policy_touches_nothing() {
    let renderer = TemperatureRenderer::new(RenderConfig {
        range_policy: RangePolicy::Reject,
        ..Default::default()
    });
    let (result, strip, events) = run(&renderer, LEN, None, (-30, 3, 10));

    assert_eq!(result, Err(BoardError::OutOfRange));
    assert!(events.is_empty());
    assert!(strip.frames.is_empty());
}

#[test]
fn device_error_aborts_render() {
    let (result, strip, events) = run(&TemperatureRenderer::default(), LEN, Some(10), (2, 7, 15));

    assert_eq!(result, Err(BoardError::DeviceError));
    assert_eq!(strip.frames.len(), 10);
    assert!(!events.contains(&Event::Clear));
}

#[test]
fn strip_shorter_than_layout_is_refused_up_front() {
    for range_policy in [RangePolicy::Clamp, RangePolicy::Reject] {
        let renderer = TemperatureRenderer::new(RenderConfig {
            range_policy,
            ..Default::default()
        });
        let (result, strip, events) = run(&renderer, 20, None, (2, 7, 15));

        assert_eq!(result, Err(BoardError::DeviceError), "{range_policy:?}");
        assert!(events.is_empty(), "{range_policy:?}");
        assert!(strip.frames.is_empty(), "{range_policy:?}");
    }
}

#[test]
fn strip_longer_than_layout_is_refused_up_front() {
    let (result, strip, events) = run(&TemperatureRenderer::default(), LEN + 1, None, (2, 7, 15));

    assert_eq!(result, Err(BoardError::DeviceError));
    assert!(events.is_empty());
    assert!(strip.frames.is_empty());
}
