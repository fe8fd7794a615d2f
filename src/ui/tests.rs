use super::state::PendingConfirmAction;
use super::*;
use crate::card::CardId;
use crate::geometry::Rect;
use eframe::egui;
use std::path::PathBuf;

fn raw_input(events: Vec<egui::Event>) -> egui::RawInput {
    let mut raw = egui::RawInput::default();
    raw.screen_rect = Some(egui::Rect::from_min_size(
        egui::Pos2::ZERO,
        egui::vec2(1200.0, 800.0),
    ));
    // Mirror a real backend: held modifiers are reported frame-wide too.
    for event in &events {
        if let egui::Event::Key { modifiers, .. } = event {
            raw.modifiers = raw.modifiers | *modifiers;
        }
    }
    raw.events = events;
    raw
}

/// Run a single headless egui frame with the provided input events and closure.
fn run_ui_with(
    ctx: &egui::Context,
    events: Vec<egui::Event>,
    mut f: impl FnMut(&egui::Context),
) -> egui::FullOutput {
    ctx.run(raw_input(events), |ctx| {
        ctx.set_visuals(egui::Visuals::dark());
        f(ctx);
    })
}

/// One canvas frame wrapped in the project's frame hooks, the way `update` runs it.
fn canvas_frame(app: &mut PlanboardApp, ctx: &egui::Context, events: Vec<egui::Event>) {
    let _ = run_ui_with(ctx, events, |ctx| {
        app.project.begin_frame();
        egui::CentralPanel::default().show(ctx, |ui| {
            app.draw_canvas(ui);
        });
        app.project.end_frame();
    });
}

fn key(key: egui::Key, modifiers: egui::Modifiers) -> egui::Event {
    egui::Event::Key {
        key,
        physical_key: Some(key),
        pressed: true,
        repeat: false,
        modifiers,
    }
}

fn command() -> egui::Modifiers {
    egui::Modifiers {
        command: true,
        ..Default::default()
    }
}

fn press(pos: egui::Pos2, button: egui::PointerButton, pressed: bool) -> egui::Event {
    egui::Event::PointerButton {
        pos,
        button,
        pressed,
        modifiers: egui::Modifiers::NONE,
    }
}

/// Draws one idle frame so the canvas knows its screen center.
fn settle(app: &mut PlanboardApp, ctx: &egui::Context) {
    canvas_frame(app, ctx, vec![egui::Event::PointerMoved(egui::pos2(1.0, 1.0))]);
}

fn note_at(app: &mut PlanboardApp, x: f32, y: f32) -> CardId {
    app.project.create_card(CardKind::Note, Point::new(x, y))
}

#[test]
fn undo_shortcut_removes_last_created_card() {
    let mut app = PlanboardApp::default();
    let id = note_at(&mut app, 96.0, 16.0);
    assert!(app.project.current_page().contains(id));

    let ctx = egui::Context::default();
    let _ = run_ui_with(&ctx, vec![key(egui::Key::Z, command())], |ctx| {
        app.handle_keyboard(ctx);
    });

    assert!(!app.project.current_page().contains(id));
}

#[test]
fn redo_shortcut_restores_card() {
    let mut app = PlanboardApp::default();
    let id = note_at(&mut app, 96.0, 16.0);
    app.project.undo();

    let ctx = egui::Context::default();
    let redo = egui::Modifiers {
        command: true,
        shift: true,
        ..Default::default()
    };
    let _ = run_ui_with(&ctx, vec![key(egui::Key::Z, redo)], |ctx| {
        app.handle_keyboard(ctx);
    });

    assert!(app.project.current_page().contains(id));
}

#[test]
fn clicking_card_selects_it() {
    let mut app = PlanboardApp::default();
    let id = note_at(&mut app, 96.0, 16.0);
    app.project.current_page_mut().selection.clear();
    app.watch_selection();
    assert_eq!(app.selected_count.get(), 0);

    let ctx = egui::Context::default();
    settle(&mut app, &ctx);
    let target = app.world_to_screen(Point::new(96.0, 16.0));

    canvas_frame(
        &mut app,
        &ctx,
        vec![
            egui::Event::PointerMoved(target),
            press(target, egui::PointerButton::Primary, true),
        ],
    );

    assert_eq!(app.project.current_page().selection.as_slice(), &[id]);
    assert_eq!(app.selected_count.get(), 1);
}

#[test]
fn dragging_card_snaps_to_grid_in_one_undo_step() {
    let mut app = PlanboardApp::default();
    let id = note_at(&mut app, 96.0, 16.0);
    let frames_before = app.project.history.len();

    let ctx = egui::Context::default();
    settle(&mut app, &ctx);
    let start = app.world_to_screen(Point::new(96.0, 16.0));
    let mid = start + egui::vec2(35.0, 0.0);
    let end = start + egui::vec2(70.0, 0.0);

    canvas_frame(
        &mut app,
        &ctx,
        vec![
            egui::Event::PointerMoved(start),
            press(start, egui::PointerButton::Primary, true),
        ],
    );
    canvas_frame(&mut app, &ctx, vec![egui::Event::PointerMoved(mid)]);
    canvas_frame(&mut app, &ctx, vec![egui::Event::PointerMoved(end)]);
    let dragged = app.project.current_page().card(id).map(|c| c.rect.x);
    assert_eq!(dragged, Some(70.0));

    canvas_frame(
        &mut app,
        &ctx,
        vec![press(end, egui::PointerButton::Primary, false)],
    );

    let card = app.project.current_page().card(id).expect("card exists");
    assert_eq!(card.rect.x, 64.0);
    assert_eq!(card.rect.y, 0.0);
    assert_eq!(app.project.history.len(), frames_before + 1);

    assert!(app.project.undo());
    let card = app.project.current_page().card(id).expect("card exists");
    assert_eq!(card.rect.x, 0.0);
}

#[test]
fn box_drag_selects_cards_and_escape_restores_previous_selection() {
    let mut app = PlanboardApp::default();
    let top = note_at(&mut app, 96.0, 16.0);
    let bottom = note_at(&mut app, 96.0, 80.0);
    app.project.current_page_mut().selection.replace([bottom]);

    let ctx = egui::Context::default();
    settle(&mut app, &ctx);
    let start = app.world_to_screen(Point::new(-50.0, -50.0));
    let end = app.world_to_screen(Point::new(100.0, 20.0));

    canvas_frame(
        &mut app,
        &ctx,
        vec![
            egui::Event::PointerMoved(start),
            press(start, egui::PointerButton::Primary, true),
        ],
    );
    assert!(app.project.current_page().selection.is_box_selecting());

    canvas_frame(&mut app, &ctx, vec![egui::Event::PointerMoved(end)]);
    assert_eq!(app.project.current_page().selection.as_slice(), &[top]);

    canvas_frame(
        &mut app,
        &ctx,
        vec![key(egui::Key::Escape, egui::Modifiers::NONE)],
    );
    let selection = &app.project.current_page().selection;
    assert!(!selection.is_box_selecting());
    assert_eq!(selection.as_slice(), &[bottom]);
}

#[test]
fn box_release_keeps_selection() {
    let mut app = PlanboardApp::default();
    let top = note_at(&mut app, 96.0, 16.0);
    let bottom = note_at(&mut app, 96.0, 80.0);

    let ctx = egui::Context::default();
    settle(&mut app, &ctx);
    let start = app.world_to_screen(Point::new(-50.0, -50.0));
    let end = app.world_to_screen(Point::new(100.0, 100.0));

    canvas_frame(
        &mut app,
        &ctx,
        vec![
            egui::Event::PointerMoved(start),
            press(start, egui::PointerButton::Primary, true),
        ],
    );
    canvas_frame(&mut app, &ctx, vec![egui::Event::PointerMoved(end)]);
    canvas_frame(
        &mut app,
        &ctx,
        vec![press(end, egui::PointerButton::Primary, false)],
    );

    let selection = &app.project.current_page().selection;
    assert!(!selection.is_box_selecting());
    assert!(selection.contains(top));
    assert!(selection.contains(bottom));
}

#[test]
fn click_on_empty_canvas_restores_previous_selection() {
    let mut app = PlanboardApp::default();
    note_at(&mut app, 96.0, 16.0);
    let bottom = note_at(&mut app, 96.0, 80.0);
    app.project.current_page_mut().selection.replace([bottom]);

    let ctx = egui::Context::default();
    settle(&mut app, &ctx);
    let at = app.world_to_screen(Point::new(-300.0, -300.0));

    canvas_frame(
        &mut app,
        &ctx,
        vec![
            egui::Event::PointerMoved(at),
            press(at, egui::PointerButton::Primary, true),
        ],
    );
    assert!(app.project.current_page().selection.is_box_selecting());
    canvas_frame(
        &mut app,
        &ctx,
        vec![press(at, egui::PointerButton::Primary, false)],
    );

    let selection = &app.project.current_page().selection;
    assert!(!selection.is_box_selecting());
    assert_eq!(selection.as_slice(), &[bottom]);
}

#[test]
fn box_released_before_drag_threshold_reverts() {
    let mut app = PlanboardApp::default();
    let top = note_at(&mut app, 96.0, 16.0);
    let bottom = note_at(&mut app, 96.0, 80.0);
    app.project.current_page_mut().selection.replace([bottom]);

    let ctx = egui::Context::default();
    settle(&mut app, &ctx);
    let start = app.world_to_screen(Point::new(-2.0, 10.0));
    let nudge = start + egui::vec2(3.0, 3.0);

    canvas_frame(
        &mut app,
        &ctx,
        vec![
            egui::Event::PointerMoved(start),
            press(start, egui::PointerButton::Primary, true),
        ],
    );
    canvas_frame(&mut app, &ctx, vec![egui::Event::PointerMoved(nudge)]);
    assert!(app.project.current_page().selection.contains(top));

    canvas_frame(
        &mut app,
        &ctx,
        vec![press(nudge, egui::PointerButton::Primary, false)],
    );

    let selection = &app.project.current_page().selection;
    assert!(!selection.is_box_selecting());
    assert_eq!(selection.as_slice(), &[bottom]);
}

#[test]
fn resizing_missing_card_sets_status() {
    let mut app = PlanboardApp::default();
    let id = note_at(&mut app, 96.0, 16.0);

    app.resize_card(id, 256.0, 64.0);
    assert!(app.file.status.is_none());
    let rect = app.project.current_page().card(id).map(|c| c.rect);
    assert_eq!(rect.map(|r| (r.w, r.h)), Some((256.0, 64.0)));

    app.resize_card(id + 100, 256.0, 64.0);
    assert!(app.file.status.is_some());
}

#[test]
fn number_key_creates_card_of_matching_kind() {
    let mut app = PlanboardApp::default();
    let ctx = egui::Context::default();
    let _ = run_ui_with(
        &ctx,
        vec![key(egui::Key::Num3, egui::Modifiers::NONE)],
        |ctx| {
            app.handle_keyboard(ctx);
        },
    );

    let page = app.project.current_page();
    assert_eq!(page.len(), 1);
    let card = page.cards().next().expect("one card");
    assert_eq!(card.content.kind(), CardKind::ALL[2]);
    assert_eq!(page.selection.as_slice(), &[card.id]);
}

#[test]
fn alt_number_key_jumps_to_zoom_level() {
    let mut app = PlanboardApp::default();
    let alt = egui::Modifiers {
        alt: true,
        ..Default::default()
    };
    let ctx = egui::Context::default();
    let _ = run_ui_with(&ctx, vec![key(egui::Key::Num4, alt)], |ctx| {
        app.handle_keyboard(ctx);
    });

    assert_eq!(app.project.camera.zoom, ZOOM_LEVELS[3]);
    assert!(app.project.current_page().is_empty());
}

#[test]
fn right_click_opens_context_menu_and_creates_card_there() {
    let mut app = PlanboardApp::default();
    let ctx = egui::Context::default();
    settle(&mut app, &ctx);
    let at = app.world_to_screen(Point::new(288.0, 208.0));

    canvas_frame(
        &mut app,
        &ctx,
        vec![
            egui::Event::PointerMoved(at),
            press(at, egui::PointerButton::Secondary, true),
        ],
    );
    canvas_frame(
        &mut app,
        &ctx,
        vec![press(at, egui::PointerButton::Secondary, false)],
    );

    assert!(app.context_menu.show);
    assert_eq!(app.context_menu.world_pos, Point::new(288.0, 208.0));

    app.create_card_from_menu(CardKind::Timer);

    assert!(!app.context_menu.show);
    let page = app.project.current_page();
    let card = page.cards().next().expect("card created");
    assert_eq!(card.content.kind(), CardKind::Timer);
    assert!(card.rect.contains(Point::new(288.0, 208.0)));
}

#[test]
fn copy_and_paste_shortcuts_duplicate_selection() {
    let mut app = PlanboardApp::default();
    let id = note_at(&mut app, 96.0, 16.0);
    app.project.current_page_mut().selection.replace([id]);

    let ctx = egui::Context::default();
    let _ = run_ui_with(
        &ctx,
        vec![key(egui::Key::C, command()), key(egui::Key::V, command())],
        |ctx| {
            app.handle_keyboard(ctx);
        },
    );

    let page = app.project.current_page();
    assert_eq!(page.len(), 2);
    let pasted = page.selection.as_slice();
    assert_eq!(pasted.len(), 1);
    assert_ne!(pasted[0], id);
    let unit = app.project.config.grid_size;
    let rect = page.card(pasted[0]).map(|c| c.rect);
    assert_eq!(rect, Some(Rect::new(unit, unit, 192.0, 32.0)));
}

#[test]
fn arrow_keys_pan_the_camera() {
    let mut app = PlanboardApp::default();
    let ctx = egui::Context::default();
    let _ = run_ui_with(
        &ctx,
        vec![key(egui::Key::ArrowRight, egui::Modifiers::NONE)],
        |ctx| {
            app.handle_keyboard(ctx);
        },
    );

    assert!(app.project.camera.pan.x > 0.0);
    assert_eq!(app.project.camera.pan.y, 0.0);
}

#[test]
fn confirm_prompts_only_with_unsaved_changes() {
    let mut app = PlanboardApp::default();
    let ctx = egui::Context::default();

    note_at(&mut app, 96.0, 16.0);
    assert!(app.project.modified);
    app.confirm_or_run(PendingConfirmAction::New, &ctx);
    assert!(app.file.show_unsaved_dialog);
    assert_eq!(
        app.file.pending_confirm_action,
        Some(PendingConfirmAction::New)
    );
    assert_eq!(app.project.current_page().len(), 1);

    app.file.show_unsaved_dialog = false;
    app.file.pending_confirm_action = None;
    app.project.modified = false;
    app.confirm_or_run(PendingConfirmAction::New, &ctx);
    assert!(!app.file.show_unsaved_dialog);
    assert!(app.project.current_page().is_empty());
}

#[test]
fn selection_observer_follows_page_changes() {
    let mut app = PlanboardApp::default();
    let a = note_at(&mut app, 96.0, 16.0);
    note_at(&mut app, 96.0, 80.0);
    app.watch_selection();

    app.project.dispatch(Action::SelectAll);
    assert_eq!(app.selected_count.get(), 2);

    app.project.current_page_mut().selection.remove(a);
    assert_eq!(app.selected_count.get(), 1);

    let sub = app
        .project
        .create_card(CardKind::Subpage, Point::new(96.0, 200.0));
    app.project.open_subpage(sub).expect("sub-page opens");
    app.watch_selection();
    assert_eq!(app.selected_count.get(), 0);
}

#[test]
fn app_state_round_trip_skips_project() {
    let mut app = PlanboardApp::default();
    note_at(&mut app, 96.0, 16.0);
    app.dark_mode = false;
    app.canvas.show_grid = false;
    app.remember_recent(PathBuf::from("board.plan"));

    let json = app.to_json().expect("serialize app state");
    let restored = PlanboardApp::from_json(&json).expect("deserialize app state");

    assert!(!restored.dark_mode);
    assert!(!restored.canvas.show_grid);
    assert_eq!(restored.recent_files, vec![PathBuf::from("board.plan")]);
    assert!(restored.project.current_page().is_empty());
    assert!(!restored.project.modified);
}

#[test]
fn partial_app_state_fills_in_defaults() {
    let app = PlanboardApp::from_json("{\"dark_mode\": false}").expect("partial state loads");
    assert!(!app.dark_mode);
    assert!(app.canvas.show_grid);
    assert!(PlanboardApp::from_json("not json").is_err());
}

#[test]
fn recent_files_are_deduplicated_and_capped() {
    let mut app = PlanboardApp::default();
    for i in 0..15 {
        app.remember_recent(PathBuf::from(format!("{i}.plan")));
    }
    app.remember_recent(PathBuf::from("10.plan"));

    assert_eq!(
        app.recent_files.len(),
        crate::constants::MAX_RECENT_FILES
    );
    assert_eq!(app.recent_files[0], PathBuf::from("10.plan"));
    assert_eq!(app.recent_files[1], PathBuf::from("14.plan"));
    assert_eq!(
        app.recent_files
            .iter()
            .filter(|p| **p == PathBuf::from("10.plan"))
            .count(),
        1
    );
}

#[test]
fn opening_missing_recent_file_drops_entry() {
    let mut app = PlanboardApp::default();
    app.remember_recent(PathBuf::from("/nonexistent/dir/missing.plan"));

    app.open_recent(0);

    assert!(app.recent_files.is_empty());
    assert!(app.file.status.is_some());
}
