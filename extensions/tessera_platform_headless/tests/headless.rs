//! End-to-end tests of the headless backend
//!
//! Each test runs a real event loop with a closure as the application. The
//! closure scripts the display server through the window's handle, usually
//! from inside frame callbacks, and the loop exits after `Close`.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tessera_platform::prelude::*;
use tessera_platform::{Axis, Buttons, Insets, OffscreenFormat, PresentError};
use tessera_platform_headless::{
    HeadlessEventLoop, HeadlessHandle, HeadlessPlatform, NativeMessage, SoftwareContext,
    SoftwareOptions, SoftwareTarget,
};

/// Application state visible to the script
struct AppState {
    driver: Option<Arc<dyn Driver>>,
    handle: HeadlessHandle,
    ctx: Option<Box<dyn GpuContext>>,
    frames: usize,
}

impl AppState {
    fn driver(&self) -> &Arc<dyn Driver> {
        self.driver.as_ref().expect("driver is set before events")
    }

    fn ctx(&mut self) -> &mut Box<dyn GpuContext> {
        if self.ctx.is_none() {
            self.ctx = Some(self.driver().new_context().expect("software context"));
        }
        self.ctx.as_mut().expect("context created above")
    }

    fn software(&mut self) -> &mut SoftwareContext {
        self.ctx()
            .as_any_mut()
            .downcast_mut::<SoftwareContext>()
            .expect("headless contexts are software contexts")
    }
}

struct ScriptedApp<F> {
    state: AppState,
    events: Rc<RefCell<Vec<Event>>>,
    script: F,
}

impl<F: FnMut(&mut AppState, &Event)> Callbacks for ScriptedApp<F> {
    fn set_driver(&mut self, driver: Arc<dyn Driver>) {
        self.state.driver = Some(driver);
    }

    fn event(&mut self, event: Event) {
        self.events.borrow_mut().push(event.clone());
        (self.script)(&mut self.state, &event);
        if event.as_frame().is_some() {
            self.state.frames += 1;
        }
        if event.is_destroy() {
            if let Some(mut ctx) = self.state.ctx.take() {
                ctx.release();
            }
        }
    }
}

fn test_config() -> PlatformConfig {
    PlatformConfig {
        frame_interval_ms: 0,
        ..Default::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn window(options: WindowOptions, software: SoftwareOptions) -> HeadlessEventLoop {
    init_tracing();
    HeadlessPlatform::new(test_config())
        .unwrap()
        .with_software(software)
        .create_event_loop(options)
        .unwrap()
}

fn default_window() -> HeadlessEventLoop {
    window(
        WindowOptions::new("test").size(Value::px(64.0), Value::px(48.0)),
        SoftwareOptions::default(),
    )
}

fn run(
    event_loop: HeadlessEventLoop,
    script: impl FnMut(&mut AppState, &Event) + 'static,
) -> Vec<Event> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let app = ScriptedApp {
        state: AppState {
            driver: None,
            handle: event_loop.handle(),
            ctx: None,
            frames: 0,
        },
        events: Rc::clone(&events),
        script,
    };
    event_loop.run(app).unwrap();
    let events = events.borrow().clone();
    events
}

fn frames(events: &[Event]) -> Vec<FrameEvent> {
    events.iter().filter_map(|e| e.as_frame().cloned()).collect()
}

fn pointer_events(events: &[Event]) -> Vec<PointerEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Pointer(p) => Some(p.clone()),
            _ => None,
        })
        .collect()
}

fn assert_destroy_last(events: &[Event]) {
    assert_eq!(events.iter().filter(|e| e.is_destroy()).count(), 1);
    assert!(events.last().unwrap().is_destroy());
}

#[test]
fn test_first_frame_and_resize() {
    let event_loop = window(
        WindowOptions::new("test").size(Value::dp(300.0), Value::dp(200.0)),
        SoftwareOptions::default(),
    )
    .with_scale(2.0);

    let events = run(event_loop, |app, event| {
        if event.as_frame().is_some() {
            match app.frames {
                0 => app.handle.configure(150, 100),
                _ => app.handle.close(),
            }
        }
    });

    assert!(matches!(events[0], Event::Stage(Stage::Running)));
    let frames = frames(&events);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].size, Size::new(600, 400));
    assert_eq!(frames[0].config.px_per_dp, 2.0);
    assert_eq!(frames[1].size, Size::new(150, 100));
    assert!(frames.iter().all(|f| f.sync));
    assert!(matches!(events.last(), Some(Event::Destroy(None))));
}

#[test]
fn test_resizes_coalesce_into_one_frame() {
    let events = run(default_window(), |app, event| {
        if event.as_frame().is_some() {
            match app.frames {
                0 => {
                    app.handle.configure(300, 300);
                    app.handle.configure(200, 120);
                    app.handle.configure(150, 100);
                }
                _ => app.handle.close(),
            }
        }
    });

    let frames = frames(&events);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].size, Size::new(150, 100));
}

#[test]
fn test_close_delivers_destroy_last() {
    let events = run(default_window(), |app, event| {
        if event.as_frame().is_some() {
            app.handle.post(NativeMessage::Focus(true));
            app.driver().close();
        }
        if event.is_destroy() {
            // The loop is gone; nothing posted now is delivered.
            app.handle.post(NativeMessage::Expose);
        }
    });

    assert_eq!(frames(&events).len(), 1);
    assert!(events.iter().any(|e| matches!(e, Event::Focus(true))));
    assert_destroy_last(&events);
}

#[test]
fn test_disconnect_carries_error() {
    let events = run(default_window(), |app, event| {
        if event.as_frame().is_some() {
            app.handle
                .post(NativeMessage::Disconnect("broken pipe".to_string()));
        }
    });

    assert_destroy_last(&events);
    match events.last() {
        Some(Event::Destroy(Some(err))) => {
            assert!(matches!(**err, PlatformError::ResourceUnavailable(_)));
            assert!(err.to_string().contains("broken pipe"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

fn events_after_first_frame(events: &[Event]) -> &[Event] {
    let first = events
        .iter()
        .position(|e| e.as_frame().is_some())
        .expect("a frame was delivered");
    &events[first + 1..]
}

#[test]
fn test_nothing_delivered_after_disconnect_or_close() {
    let closing = [
        NativeMessage::Disconnect("gone".to_string()),
        NativeMessage::Close,
    ];
    for message in closing {
        let first = message.clone();
        let events = run(default_window(), move |app, event| {
            if event.as_frame().is_some() {
                app.handle.post(first.clone());
                app.handle.post(NativeMessage::Focus(true));
                app.handle.post(NativeMessage::Text("late".to_string()));
                app.handle.post(NativeMessage::PointerMotion { x: 3.0, y: 4.0 });
                app.handle.post(NativeMessage::Expose);
            }
        });

        let tail = events_after_first_frame(&events);
        assert_eq!(tail.len(), 1, "{:?}: {:?}", message, tail);
        assert!(tail[0].is_destroy());
    }
}

#[test]
fn test_double_make_current_binds_once() {
    let event_loop = default_window();
    let handle = event_loop.handle();
    run(event_loop, |app, event| {
        if event.as_frame().is_some() {
            let ctx = app.ctx();
            ctx.make_current().unwrap();
            ctx.make_current().unwrap();
            ctx.present().unwrap();
            app.handle.close();
        }
    });

    let stats = handle.stats().snapshot();
    assert_eq!(stats.surfaces_created, 1);
    assert_eq!(stats.frames_presented, 1);
    assert_eq!(stats.contexts_released, 1);
}

#[test]
fn test_resizes_rebind_once_at_final_size() {
    let event_loop = default_window();
    let handle = event_loop.handle();
    let bound = Rc::new(RefCell::new(None));
    let bound_in = Rc::clone(&bound);

    run(event_loop, move |app, event| {
        if event.as_frame().is_none() {
            return;
        }
        let ctx = app.software();
        ctx.make_current().unwrap();
        ctx.clear([0.0, 0.0, 0.0, 1.0]).unwrap();
        ctx.present().unwrap();
        match app.frames {
            0 => {
                for (w, h) in [(100, 100), (120, 90), (150, 100)] {
                    app.handle.configure(w, h);
                }
            }
            _ => {
                *bound_in.borrow_mut() = app.software().surface_size();
                app.handle.close();
            }
        }
    });

    assert_eq!(*bound.borrow(), Some((150, 100)));
    let stats = handle.stats().snapshot();
    assert_eq!(stats.surfaces_created, 2);
    assert_eq!(stats.frames_presented, 2);
}

/// Render 50% gray and read back the presented pixel
fn presented_gray(software: SoftwareOptions) -> (ColorCorrection, Option<OffscreenFormat>, [u8; 4]) {
    let result = Rc::new(RefCell::new(None));
    let result_in = Rc::clone(&result);
    let event_loop = window(WindowOptions::default(), software);

    run(event_loop, move |app, event| {
        if event.as_frame().is_some() {
            let ctx = app.software();
            ctx.make_current().unwrap();
            ctx.clear([0.5, 0.5, 0.5, 1.0]).unwrap();
            ctx.present().unwrap();
            *result_in.borrow_mut() = Some((
                ctx.color_correction(),
                ctx.offscreen_format(),
                ctx.presented_pixel(0, 0).unwrap(),
            ));
            app.handle.close();
        }
    });

    let result = result.borrow_mut().take();
    result.expect("one frame rendered")
}

#[test]
fn test_srgb_output_across_devices() {
    let (correction, format, px) = presented_gray(SoftwareOptions::default());
    assert_eq!(correction, ColorCorrection::NativeSrgb);
    assert_eq!(format, None);
    assert_eq!(px[0], 188);

    let (correction, format, px) = presented_gray(SoftwareOptions {
        native_srgb: false,
        ..Default::default()
    });
    assert_eq!(correction, ColorCorrection::EmulatedSrgbBlit);
    assert_eq!(format, Some(OffscreenFormat::Srgb));
    assert_eq!(px[0], 188);

    let (correction, format, px) = presented_gray(SoftwareOptions {
        native_srgb: false,
        broken_srgb_offscreen: true,
        ..Default::default()
    });
    assert_eq!(correction, ColorCorrection::EmulatedSrgbBlit);
    assert_eq!(format, Some(OffscreenFormat::Unmanaged));
    assert_eq!(px[0], 188);

    let (correction, _, px) = presented_gray(SoftwareOptions {
        native_srgb: false,
        offscreen_unsupported: true,
        ..Default::default()
    });
    assert_eq!(correction, ColorCorrection::None);
    assert_eq!(px[0], 128);
}

#[test]
fn test_device_lost_until_recreated() {
    let event_loop = default_window();
    let handle = event_loop.handle();
    let outcome = Rc::new(RefCell::new(Vec::new()));
    let outcome_in = Rc::clone(&outcome);

    run(event_loop, move |app, event| {
        if event.as_frame().is_none() {
            return;
        }
        let mut log = outcome_in.borrow_mut();
        {
            let ctx = app.ctx();
            ctx.make_current().unwrap();
            ctx.present().unwrap();
        }

        app.handle.faults().lose_device();
        let ctx = app.ctx();
        log.push(ctx.present().map_err(|e| e.is_device_lost()));
        log.push(ctx.make_current().map_err(|e| e.is_device_lost()));
        log.push(ctx.present().map_err(|e| e.is_device_lost()));
        assert_eq!(ctx.state(), ContextState::Lost);

        ctx.release();
        app.ctx = None;
        let ctx = app.ctx();
        log.push(ctx.make_current().map_err(|e| e.is_device_lost()));
        log.push(ctx.present().map_err(|e| e.is_device_lost()));
        app.handle.close();
    });

    assert_eq!(
        *outcome.borrow(),
        vec![Err(true), Err(true), Err(true), Ok(()), Ok(())]
    );
    let stats = handle.stats().snapshot();
    assert_eq!(stats.contexts_created, 2);
    assert_eq!(stats.contexts_released, 2);
    assert_eq!(stats.frames_presented, 2);
}

#[test]
fn test_transient_present_errors_absorbed() {
    let event_loop = default_window();
    let handle = event_loop.handle();
    let results = Rc::new(RefCell::new(Vec::new()));
    let results_in = Rc::clone(&results);

    run(event_loop, move |app, event| {
        if event.as_frame().is_none() {
            return;
        }
        let faults = Arc::clone(app.handle.faults());
        let ctx = app.ctx();
        ctx.make_current().unwrap();
        faults.inject_present(PresentError::Outdated);
        results_in.borrow_mut().push(ctx.present().is_ok());

        // The outdated surface is rebuilt on the next bind.
        ctx.make_current().unwrap();
        faults.inject_present(PresentError::Ignorable);
        results_in.borrow_mut().push(ctx.present().is_ok());
        app.handle.close();
    });

    assert_eq!(*results.borrow(), vec![true, true]);
    assert_eq!(handle.stats().snapshot().surfaces_created, 2);
}

#[test]
fn test_animation_frames_until_stopped() {
    let events = run(default_window(), |app, event| {
        if event.as_frame().is_some() {
            match app.frames {
                0 => app.driver().set_animating(true),
                3 => {
                    app.driver().set_animating(false);
                    app.handle.close();
                }
                _ => {}
            }
        }
    });

    let frames = frames(&events);
    assert_eq!(frames.len(), 4);
    assert!(frames[0].sync);
    assert!(frames[1..].iter().all(|f| !f.sync));
}

#[test]
fn test_animating_toggle_yields_at_most_one_frame() {
    let event_loop = default_window();
    let handle = event_loop.handle();
    let closer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        handle.close();
    });

    let events = run(event_loop, |app, event| {
        if event.as_frame().is_some() && app.frames == 0 {
            app.driver().set_animating(true);
            app.driver().set_animating(false);
        }
    });
    closer.join().unwrap();

    assert_eq!(frames(&events).len(), 2);
}

#[test]
fn test_wheel_notches_scroll() {
    let events = run(default_window(), |app, event| {
        if event.as_frame().is_some() {
            let h = &app.handle;
            h.post(NativeMessage::PointerMotion { x: 10.0, y: 20.0 });
            h.post(NativeMessage::AxisNotches {
                axis: Axis::Vertical,
                notches: 3.0,
            });
            h.post(NativeMessage::PointerFrame);
            h.close();
        }
    });

    let scrolls: Vec<_> = pointer_events(&events)
        .into_iter()
        .filter(|p| p.is_scroll())
        .collect();
    assert_eq!(scrolls.len(), 1);
    assert_eq!(scrolls[0].scroll, Point::new(0.0, 300.0));
    assert_eq!(scrolls[0].position, Point::new(10.0, 20.0));
}

#[test]
fn test_continuous_scroll_flings() {
    let events = run(default_window(), |app, event| {
        if event.as_frame().is_none() {
            return;
        }
        if app.frames == 0 {
            let h = &app.handle;
            for i in 0..6 {
                h.post_at(
                    Duration::from_millis(i * 10),
                    NativeMessage::Axis {
                        axis: Axis::Vertical,
                        value: 20.0,
                    },
                );
                h.post(NativeMessage::PointerFrame);
            }
            h.post(NativeMessage::AxisStop);
            h.post(NativeMessage::PointerFrame);
        } else if app.frames == 3 {
            app.handle.close();
        }
    });

    // Six gesture frames, then fling steps continuing downward.
    let scrolls: Vec<_> = pointer_events(&events)
        .into_iter()
        .filter(|p| p.is_scroll())
        .collect();
    assert!(scrolls.len() > 6);
    assert!(scrolls.iter().all(|p| p.scroll.y >= 0.0));
    assert!(frames(&events).len() >= 4);
}

#[test]
fn test_unknown_buttons_dropped() {
    let events = run(default_window(), |app, event| {
        if event.as_frame().is_some() {
            let h = &app.handle;
            h.post(NativeMessage::PointerButton {
                code: 0x110,
                pressed: true,
            });
            h.post(NativeMessage::PointerButton {
                code: 0x113,
                pressed: true,
            });
            h.post(NativeMessage::PointerButton {
                code: 0x110,
                pressed: false,
            });
            h.close();
        }
    });

    let pointers = pointer_events(&events);
    assert_eq!(pointers.len(), 2);
    assert_eq!(pointers[0].kind, PointerKind::Press);
    assert_eq!(pointers[0].buttons, Buttons::PRIMARY);
    assert_eq!(pointers[1].kind, PointerKind::Release);
    assert!(pointers[1].buttons.is_empty());
}

#[test]
fn test_keyboard_and_text() {
    let event_loop = default_window();
    let handle = event_loop.handle();
    let events = run(event_loop, |app, event| {
        if event.as_frame().is_some() {
            app.driver().show_text_input(true);
            let h = &app.handle;
            h.post(NativeMessage::Key(KeyEvent {
                key: Key::Char('A'),
                state: KeyState::Pressed,
                modifiers: Modifiers::SHIFT,
            }));
            h.post(NativeMessage::Text(String::new()));
            h.post(NativeMessage::Text("A".to_string()));
            h.close();
        }
    });

    assert!(handle.text_input_shown());
    let texts: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::TextEdit(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["A"]);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Key(k) if k.key == Key::Char('A'))));
}

#[test]
fn test_hidden_window_pauses_and_remaps() {
    let event_loop = default_window();
    let handle = event_loop.handle();
    let states = Rc::new(RefCell::new(Vec::new()));
    let states_in = Rc::clone(&states);

    let events = run(event_loop, move |app, event| {
        if event.as_frame().is_none() {
            return;
        }
        let ctx = app.ctx();
        ctx.make_current().unwrap();
        states_in.borrow_mut().push(ctx.state());
        ctx.present().unwrap();
        match app.frames {
            0 => {
                app.handle.post(NativeMessage::Visibility(false));
                app.handle.post(NativeMessage::Expose);
                app.handle.post(NativeMessage::Visibility(true));
            }
            _ => app.handle.close(),
        }
    });

    let stages: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Stage(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(stages, vec![Stage::Running, Stage::Paused, Stage::Running]);
    assert_eq!(frames(&events).len(), 2);
    assert_eq!(
        *states.borrow(),
        vec![ContextState::SurfaceBound, ContextState::SurfaceBound]
    );
    // Mapping again creates a new surface.
    assert_eq!(handle.stats().snapshot().surfaces_created, 2);
}

#[test]
fn test_insets_in_frame() {
    let insets = Insets {
        top: 24,
        bottom: 0,
        left: 0,
        right: 0,
    };
    let events = run(default_window(), move |app, event| {
        if event.as_frame().is_some() {
            match app.frames {
                0 => app.handle.post(NativeMessage::Insets(Some(insets))),
                _ => app.handle.close(),
            }
        }
    });

    let frames = frames(&events);
    assert_eq!(frames[0].insets, None);
    assert_eq!(frames[1].insets, Some(insets));
}

#[test]
fn test_no_device() {
    let event_loop = window(
        WindowOptions::default(),
        SoftwareOptions {
            max_version: None,
            ..Default::default()
        },
    );
    let failed = Rc::new(RefCell::new(false));
    let failed_in = Rc::clone(&failed);

    let events = run(event_loop, move |app, event| {
        if event.as_frame().is_some() {
            let err = app.driver().new_context().err();
            *failed_in.borrow_mut() =
                matches!(err, Some(PlatformError::ResourceUnavailable(_)));
            app.handle.close();
        }
    });

    assert!(*failed.borrow());
    // A missing GPU does not take the window down.
    assert!(matches!(events.last(), Some(Event::Destroy(None))));
}
