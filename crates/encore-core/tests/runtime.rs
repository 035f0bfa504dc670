//! End-to-end runtime tests against synthetic containers.

mod fixture;

use std::rc::Rc;

use encore_core::assets::GameData;
use encore_core::events;
use encore_core::game::{Game, GameOptions};
use encore_core::render::software::SoftwareRenderer;
use encore_core::render::NullRenderer;
use encore_core::runtime::Runtime;
use encore_core::vm;

use fixture::{Asm, FxObject, GameBuilder};

fn null_game(builder: GameBuilder) -> Game {
    let data = Rc::new(GameData::load(&builder.build()).expect("fixture loads"));
    Game::new(data, Box::new(NullRenderer), GameOptions::default())
}

#[test]
fn container_round_trips_asset_names() {
    let mut b = GameBuilder::new();
    b.room_name = "room_start".into();
    let code = b.code("gml_Script_scr_noop", Asm::new().exit().finish());
    b.script("scr_noop", code);
    b.object(FxObject::new("obj_mainchara"));

    let data = GameData::load(&b.build()).expect("fixture loads");
    assert_eq!(data.rooms.len(), 1);
    assert_eq!(data.rooms[0].name, "room_start");
    assert_eq!(data.objects[0].name, "obj_mainchara");
    assert_eq!(data.scripts[0].name, "scr_noop");
    assert_eq!(data.room_by_name("room_start"), Some(0));
    // Every STRG entry resolved to a non-empty interned string.
    assert_eq!(data.strings.len(), data.string_offsets.len());
    assert!(data.strings.iter().all(|s| !s.is_empty()));
}

#[test]
fn rejects_unsupported_bytecode_version() {
    let mut b = GameBuilder::new();
    b.object(FxObject::new("obj_thing"));
    let mut bytes = b.build();
    // GEN8 payload starts 8 bytes into the chunk; byte 1 is the version.
    let gen8 = bytes
        .windows(4)
        .position(|w| w == b"GEN8")
        .expect("GEN8 present");
    bytes[gen8 + 8 + 1] = 17;
    let err = GameData::load(&bytes).expect_err("version 17 must be rejected");
    assert!(err.to_string().contains("unsupported bytecode version"));
}

#[test]
fn sparse_array_cells_read_back_with_zero_default() {
    // a[0,0] = 1; a[2,3] = 5; return a[2,3] + a[1,1];
    let mut b = GameBuilder::new();
    let a = b.variable("a", -7);
    let mut asm = Asm::new();
    asm.push_i16(1).push_i16(-7).push_i16(0).pop_var(a, -7, true);
    asm.push_i16(5)
        .push_i16(-7)
        .push_d((2 * 32000 + 3) as f64)
        .pop_var(a, -7, true);
    asm.push_i16(-7)
        .push_d((2 * 32000 + 3) as f64)
        .push_var(a, -7, true);
    asm.push_i16(-7)
        .push_d((32000 + 1) as f64)
        .push_var(a, -7, true);
    asm.add().ret();
    let code = b.code("gml_Script_scr_array", asm.finish());
    b.script("scr_array", code);

    let data = Rc::new(GameData::load(&b.build()).expect("fixture loads"));
    let mut rt = Runtime::new(data, Box::new(NullRenderer), 0);
    let result = vm::execute_code(&mut rt, code, -1, -1, &[]).expect("script runs");
    assert_eq!(result.as_real().unwrap(), 5.0);
}

#[test]
fn division_by_zero_sentinels() {
    let mut b = GameBuilder::new();
    let int_code = b.code(
        "gml_Script_scr_div_int",
        Asm::new().push_i16(5).push_i16(0).div_i16().ret().finish(),
    );
    let real_code = b.code(
        "gml_Script_scr_div_real",
        Asm::new().push_d(5.0).push_d(0.0).div_d().ret().finish(),
    );
    // The sentinel rule covers the whole division family.
    let mod_int_code = b.code(
        "gml_Script_scr_mod_int",
        Asm::new().push_i16(5).push_i16(0).mod_i16().ret().finish(),
    );
    let mod_real_code = b.code(
        "gml_Script_scr_mod_real",
        Asm::new().push_d(5.0).push_d(0.0).mod_d().ret().finish(),
    );
    b.script("scr_div_int", int_code);
    b.script("scr_div_real", real_code);
    b.script("scr_mod_int", mod_int_code);
    b.script("scr_mod_real", mod_real_code);

    let data = Rc::new(GameData::load(&b.build()).expect("fixture loads"));
    let mut rt = Runtime::new(data, Box::new(NullRenderer), 0);
    let int_result = vm::execute_code(&mut rt, int_code, -1, -1, &[]).expect("runs");
    assert_eq!(int_result.as_real().unwrap(), 0.0);
    let real_result = vm::execute_code(&mut rt, real_code, -1, -1, &[]).expect("runs");
    assert!(real_result.as_real().unwrap().is_infinite());
    let mod_int_result = vm::execute_code(&mut rt, mod_int_code, -1, -1, &[]).expect("runs");
    assert_eq!(mod_int_result.as_real().unwrap(), 0.0);
    let mod_real_result = vm::execute_code(&mut rt, mod_real_code, -1, -1, &[]).expect("runs");
    assert!(mod_real_result.as_real().unwrap().is_infinite());
}

#[test]
fn with_all_destroy_spares_persistent_instances() {
    let mut b = GameBuilder::new();
    let destroy_fn = b.function("instance_destroy");
    // with (all) instance_destroy()
    let mut asm = Asm::new();
    asm.push_i16(-3);
    asm.pushenv(20); // empty set skips past popenv
    asm.call(destroy_fn, 0);
    asm.popz();
    asm.popenv(-12); // back to the body
    asm.exit();
    let code = b.code("gml_Object_obj_bomb_Step_0", asm.finish());

    let mut bomb = FxObject::new("obj_bomb");
    bomb.events.push((events::STEP, events::STEP_NORMAL, code));
    let bomb_idx = b.object(bomb);
    let victim_idx = b.object(FxObject::new("obj_victim"));
    let mut keeper = FxObject::new("obj_keeper");
    keeper.persistent = true;
    let keeper_idx = b.object(keeper);

    b.place(bomb_idx, 0, 0);
    b.place(victim_idx, 8, 8);
    b.place(keeper_idx, 16, 16);

    let mut game = null_game(b);
    game.start().expect("start");
    assert_eq!(game.rt.instances.ids().len(), 3);

    game.step_frame().expect("frame");
    let survivors = game.rt.instances.ids();
    assert_eq!(survivors.len(), 1);
    assert_eq!(game.rt.object_of(survivors[0]), keeper_idx);
}

#[test]
fn alarm_fires_exactly_when_counter_reaches_zero() {
    let mut b = GameBuilder::new();
    let hit = b.variable("hit", -5);
    let mut asm = Asm::new();
    asm.push_var(hit, -5, false).push_i16(1).add().pop_var(hit, -5, false);
    asm.exit();
    let code = b.code("gml_Object_obj_timer_Alarm_2", asm.finish());

    let mut timer = FxObject::new("obj_timer");
    timer.events.push((events::ALARM, 2, code));
    let timer_idx = b.object(timer);
    b.place(timer_idx, 0, 0);

    let mut game = null_game(b);
    game.start().expect("start");
    let id = game.rt.instances.ids()[0];
    game.rt.instances.get_mut(id).unwrap().alarms[2] = 3;

    for frame in 0..3 {
        assert!(
            game.rt.globals.get(&hit).is_none(),
            "alarm fired early at frame {frame}"
        );
        game.step_frame().expect("frame");
    }
    assert_eq!(
        game.rt.globals.get(&hit).unwrap().as_real().unwrap(),
        1.0
    );
    // The counter is inactive afterwards; no second firing.
    game.step_frame().expect("frame");
    assert_eq!(
        game.rt.globals.get(&hit).unwrap().as_real().unwrap(),
        1.0
    );
    assert_eq!(game.rt.instances.get(id).unwrap().alarms[2], -1);
}

#[test]
fn created_instances_get_fresh_monotonic_ids_and_create_events() {
    let mut b = GameBuilder::new();
    let hit = b.variable("hit", -5);
    let create_fn = b.function("instance_create");

    let mut create_asm = Asm::new();
    create_asm
        .push_var(hit, -5, false)
        .push_i16(1)
        .add()
        .pop_var(hit, -5, false);
    create_asm.exit();
    let create_code = b.code("gml_Object_obj_spawned_Create_0", create_asm.finish());

    let mut spawned = FxObject::new("obj_spawned");
    spawned.events.push((events::CREATE, 0, create_code));
    let spawned_idx = b.object(spawned);

    // instance_create(0, 0, obj_spawned): arguments pushed in reverse.
    let mut spawn_asm = Asm::new();
    spawn_asm.push_i16(spawned_idx as i16);
    spawn_asm.push_i16(0);
    spawn_asm.push_i16(0);
    spawn_asm.call(create_fn, 3);
    spawn_asm.popz();
    spawn_asm.exit();
    let spawn_code = b.code("gml_Object_obj_spawner_Step_0", spawn_asm.finish());

    let mut spawner = FxObject::new("obj_spawner");
    spawner.events.push((events::STEP, events::STEP_NORMAL, spawn_code));
    let spawner_idx = b.object(spawner);
    b.place(spawner_idx, 0, 0);

    let mut game = null_game(b);
    game.start().expect("start");
    let before = game.rt.instances.ids();
    assert_eq!(before.len(), 1);

    game.step_frame().expect("frame");
    game.step_frame().expect("frame");
    let after = game.rt.instances.ids();
    assert_eq!(after.len(), 3);
    // Ids are unique and strictly increasing.
    let mut sorted = after.clone();
    sorted.dedup();
    assert_eq!(sorted, after);
    // Create events ran once per spawn, at the flush boundary.
    assert_eq!(game.rt.globals.get(&hit).unwrap().as_real().unwrap(), 2.0);
}

#[test]
fn parent_chain_resolves_events_and_event_inherited_runs_parent() {
    let mut b = GameBuilder::new();
    let hit = b.variable("hit", -5);
    let inherited_fn = b.function("event_inherited");

    let mut parent_asm = Asm::new();
    parent_asm
        .push_var(hit, -5, false)
        .push_i16(1)
        .add()
        .pop_var(hit, -5, false);
    parent_asm.exit();
    let parent_code = b.code("gml_Object_obj_parent_Step_0", parent_asm.finish());

    let mut child_asm = Asm::new();
    child_asm.call(inherited_fn, 0).popz();
    child_asm
        .push_var(hit, -5, false)
        .push_i16(10)
        .add()
        .pop_var(hit, -5, false);
    child_asm.exit();
    let child_code = b.code("gml_Object_obj_child_Step_0", child_asm.finish());

    let mut parent = FxObject::new("obj_parent");
    parent.events.push((events::STEP, events::STEP_NORMAL, parent_code));
    let parent_idx = b.object(parent);

    // Orphan child: no handler of its own, runs the parent's.
    let mut orphan = FxObject::new("obj_orphan");
    orphan.parent_index = parent_idx;
    let orphan_idx = b.object(orphan);

    // Overriding child: own handler plus event_inherited().
    let mut child = FxObject::new("obj_child");
    child.parent_index = parent_idx;
    child.events.push((events::STEP, events::STEP_NORMAL, child_code));
    let child_idx = b.object(child);

    b.place(orphan_idx, 0, 0);
    let mut game = null_game(b);
    game.start().expect("start");
    game.step_frame().expect("frame");
    assert_eq!(game.rt.globals.get(&hit).unwrap().as_real().unwrap(), 1.0);

    // Fresh game with the overriding child only.
    let mut b2 = GameBuilder::new();
    let hit2 = b2.variable("hit", -5);
    let inherited2 = b2.function("event_inherited");
    assert_eq!(hit2, hit);
    assert_eq!(inherited2, inherited_fn);
    let parent_code2 = b2.code("gml_Object_obj_parent_Step_0", {
        let mut a = Asm::new();
        a.push_var(hit2, -5, false).push_i16(1).add().pop_var(hit2, -5, false);
        a.exit();
        a.finish()
    });
    let child_code2 = b2.code("gml_Object_obj_child_Step_0", {
        let mut a = Asm::new();
        a.call(inherited2, 0).popz();
        a.push_var(hit2, -5, false).push_i16(10).add().pop_var(hit2, -5, false);
        a.exit();
        a.finish()
    });
    let mut parent2 = FxObject::new("obj_parent");
    parent2.events.push((events::STEP, events::STEP_NORMAL, parent_code2));
    let parent2_idx = b2.object(parent2);
    let mut child2 = FxObject::new("obj_child");
    child2.parent_index = parent2_idx;
    child2.events.push((events::STEP, events::STEP_NORMAL, child_code2));
    let child2_idx = b2.object(child2);
    b2.place(child2_idx, 0, 0);
    let _ = child_idx;

    let mut game2 = null_game(b2);
    game2.start().expect("start");
    game2.step_frame().expect("frame");
    assert_eq!(game2.rt.globals.get(&hit).unwrap().as_real().unwrap(), 11.0);
}

#[test]
fn keyboard_press_event_fires_from_deterministic_feed() {
    let mut b = GameBuilder::new();
    let hit = b.variable("hit", -5);
    let mut asm = Asm::new();
    asm.push_i16(1).pop_var(hit, -5, false);
    asm.exit();
    let code = b.code("gml_Object_obj_menu_KeyPress_13", asm.finish());

    let mut menu = FxObject::new("obj_menu");
    menu.events.push((events::KEY_PRESS, 13, code));
    let menu_idx = b.object(menu);
    b.place(menu_idx, 0, 0);

    let mut game = null_game(b);
    game.start().expect("start");
    game.step_frame().expect("frame");
    assert!(game.rt.globals.get(&hit).is_none());

    game.rt.input.feed_down(13);
    game.step_frame().expect("frame");
    assert_eq!(game.rt.globals.get(&hit).unwrap().as_real().unwrap(), 1.0);
}

#[test]
fn framebuffer_is_deterministic_and_clears_to_room_color() {
    let run_once = || {
        let mut b = GameBuilder::new();
        b.background_color = 0xFF_0000; // blue in BGR
        b.window_size = (64, 48);
        let idx = b.object(FxObject::new("obj_dummy"));
        b.place(idx, 0, 0);
        let data = Rc::new(GameData::load(&b.build()).expect("fixture loads"));
        let renderer = SoftwareRenderer::new(64, 48);
        let mut game = Game::new(data, Box::new(renderer), GameOptions::default());
        game.start().expect("start");
        game.step_frame().expect("frame");
        game.step_frame().expect("frame");
        let (pixels, w, h) = game.rt.renderer.framebuffer().expect("framebuffer");
        (pixels.to_vec(), w, h)
    };

    let (a, w, h) = run_once();
    let (b, _, _) = run_once();
    assert_eq!(a, b, "replays must be byte-identical");

    // Center pixel carries the room background color.
    let center = (((h / 2) * w + w / 2) * 4) as usize;
    assert_eq!(&a[center..center + 4], &[0, 0, 255, 255]);
}

#[test]
fn headless_capture_writes_png_screenshot() {
    let dir = std::env::temp_dir().join("encore-test-shots");
    let _ = std::fs::create_dir_all(&dir);
    let pattern = dir.join("frame%s.png");
    let pattern = pattern.to_string_lossy().to_string();

    let mut b = GameBuilder::new();
    b.window_size = (64, 48);
    let idx = b.object(FxObject::new("obj_dummy"));
    b.place(idx, 0, 0);
    let data = Rc::new(GameData::load(&b.build()).expect("fixture loads"));

    let options = GameOptions {
        headless: true,
        screenshot_pattern: Some(pattern.clone()),
        screenshot_frames: std::collections::BTreeSet::from([1]),
        ..Default::default()
    };
    let mut game = Game::new(data, Box::new(SoftwareRenderer::new(64, 48)), options);
    game.run().expect("run");

    let path = pattern.replace("%s", "1");
    let bytes = std::fs::read(&path).expect("screenshot written");
    let decoder = png::Decoder::new(bytes.as_slice());
    let reader = decoder.read_info().expect("valid png");
    assert_eq!(reader.info().width, 64);
    assert_eq!(reader.info().height, 48);
    let _ = std::fs::remove_file(path);
}

#[test]
fn room_transition_assigns_new_ids_and_drops_nonpersistent() {
    // Two-room check is covered through room_restart: the same room reloads
    // with fresh ids.
    let mut b = GameBuilder::new();
    let restart_fn = b.function("room_restart");
    let mut asm = Asm::new();
    asm.call(restart_fn, 0).popz().exit();
    let code = b.code("gml_Object_obj_resetter_Step_0", asm.finish());

    let mut resetter = FxObject::new("obj_resetter");
    resetter.events.push((events::STEP, events::STEP_NORMAL, code));
    let resetter_idx = b.object(resetter);
    b.place(resetter_idx, 0, 0);

    let mut game = null_game(b);
    game.start().expect("start");
    let before = game.rt.instances.ids();
    game.step_frame().expect("frame");
    let after = game.rt.instances.ids();
    assert_eq!(after.len(), 1);
    assert_ne!(before, after, "reloaded room instances get fresh ids");
    assert!(after[0] > before[0]);
}
