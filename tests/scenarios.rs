use std::{rc::Rc, sync::atomic::AtomicBool};

use gframe::{
    accumulator::Accumulator,
    animation::Animation,
    gif::GifRecorder,
    hitbox::{Child, Direction, Hitbox},
    input::{Input, InputEvent, Interface, Key, KeyState},
    object::{self, Object},
    quadtree::{Quadtree, Traversal},
    render::{Backbuffer, Renderer},
    save::{Save, Value},
    spriteset::Spriteset,
    tilemap::Tilemap,
    Error,
};
use image::{Rgba, RgbaImage};

#[test]
fn test_corner_slide_through_quadtree() {
    let mut player = Object::new(16, 16, 8, 8).unwrap();
    player.set_child(Child::Sprite(0));
    player.set_velocity(100., 0.);
    let floor = Hitbox::new(100, 24, 100, 4)
        .unwrap()
        .with_child(Child::Area { tilemap: 0, area: 0 });

    player.update(100);
    assert_eq!(player.x(), 26);

    let mut qt = Quadtree::new();
    qt.init_root(0, 0, 256, 64, 4, 4).unwrap();
    qt.populate_hitbox(&floor).unwrap();
    let mut status = qt.collide_object(&player).unwrap();
    let mut hits = 0;
    while status == Traversal::Overlapped {
        let overlap = qt.get_overlapping().unwrap();
        assert_eq!(overlap.other.child, floor.child);
        assert!(object::collide_hitbox(&mut player, &overlap.other).unwrap());
        qt.update_current(player.hitbox()).unwrap();
        hits += 1;
        status = qt.resume().unwrap();
    }
    assert_eq!(hits, 1);
    assert_eq!(player.position(), (26., 16.));
    assert_eq!(player.current_collision(), Direction::NONE);
}

#[test]
fn test_quadtree_partition() {
    let body = |c: i32, id: usize| {
        Hitbox::new(c, c, 2, 2)
            .unwrap()
            .with_child(Child::Object(id))
    };
    let mut qt = Quadtree::new();
    qt.init_root(0, 0, 100, 100, 2, 2).unwrap();
    qt.populate_hitbox(&body(10, 0)).unwrap();
    qt.populate_hitbox(&body(20, 1)).unwrap();
    qt.populate_hitbox(&body(90, 2)).unwrap();

    let leaves = qt.leaves();
    assert_eq!(leaves.len(), 4);
    let top_left = leaves
        .iter()
        .find(|(bounds, _)| bounds.origin == euclid::point2(0, 0))
        .unwrap();
    assert_eq!(top_left.1, vec![Child::Object(0), Child::Object(1)]);
    let bottom_right = leaves
        .iter()
        .find(|(bounds, _)| bounds.origin == euclid::point2(50, 50))
        .unwrap();
    assert_eq!(bottom_right.1, vec![Child::Object(2)]);
}

#[test]
fn test_accumulator_caps_frames() {
    let mut acc = Accumulator::default();
    acc.set_delay(16, 6).unwrap();
    acc.update(200).unwrap();
    assert_eq!(acc.get_frames(), 6);
    assert_eq!(acc.check_frames(), 0);
    assert_eq!(acc.elapsed(), 8);
}

#[test]
fn test_animation_runs_out() {
    let mut anim = Animation::new(&[7, 8, 9, 10], 10, false).unwrap();
    for _ in 0..4 {
        anim.update(100).unwrap();
    }
    assert!(anim.did_finish());
    assert_eq!(anim.frame(), 10);
    assert!(matches!(anim.update(10), Err(Error::AnimationAlreadyFinished)));
}

#[test]
fn test_gif_single_small_frame() {
    let mut image = RgbaImage::new(2, 2);
    image.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
    image.put_pixel(1, 0, Rgba([40, 50, 60, 255]));
    image.put_pixel(0, 1, Rgba([70, 80, 90, 255]));
    image.put_pixel(1, 1, Rgba([10, 20, 30, 255]));
    let mut gif = GifRecorder::new(2, 2).unwrap();
    gif.push_frame(&image, 0).unwrap();
    let mut out = Vec::new();
    gif.encode(&mut out, &AtomicBool::new(false)).unwrap();

    // global table flag with 2^(1+1) entries
    assert_eq!(out[10] & 0x87, 0x81);
    assert_eq!(&out[13..25], &[10, 20, 30, 40, 50, 60, 70, 80, 90, 0, 0, 0]);
    assert_eq!(*out.last().unwrap(), 0x3b);

    let decoded = image::load_from_memory(&out).unwrap().to_rgba();
    assert_eq!(decoded.get_pixel(1, 1).0[..3], [10, 20, 30]);
}

#[test]
fn test_input_rebind() {
    let mut input = Input::new();
    let handle = input.add_virtual_key();
    input.bind(handle, Interface::Key(Key::A)).unwrap();

    input.push_event(InputEvent::KeyDown(Key::A));
    input.begin_tick(16);
    assert_eq!(input.key_state(handle).unwrap().state, KeyState::JUST_PRESSED);
    input.begin_tick(16);
    assert_eq!(input.key_state(handle).unwrap().state, KeyState::PRESSED);

    input.push_event(InputEvent::KeyUp(Key::A));
    input.begin_tick(16);
    input.rebind(handle, Interface::Key(Key::B)).unwrap();
    assert_eq!(input.bound_to(Interface::Key(Key::A)), None);

    input.push_event(InputEvent::KeyDown(Key::A));
    input.begin_tick(16);
    assert!(input.key_state(handle).unwrap().state.is_released());
    input.push_event(InputEvent::KeyDown(Key::B));
    input.begin_tick(16);
    assert!(input.key_state(handle).unwrap().state.just_pressed());
}

#[test]
fn test_save_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slot0");
    {
        let mut save = Save::bind(&path).unwrap();
        save.write_int("coins", 12).unwrap();
        save.write_float("best", 31.5).unwrap();
        save.write_data("flags", &[1, 0, 1]).unwrap();
        save.close().unwrap();
    }
    let save = Save::bind(&path).unwrap();
    assert_eq!(save.read_int("coins").unwrap(), 12);
    assert_eq!(save.read_float("best").unwrap(), 31.5);
    assert_eq!(save.read("flags").unwrap(), &Value::Data(vec![1, 0, 1]));
    assert!(matches!(save.read("lives"), Err(Error::SaveIdNotFound(_))));
}

#[test]
fn test_tilemap_text_round_trip() {
    const DICT: &[(&str, u32)] = &[("solid", 1), ("goal", 2)];
    let mut bb = Backbuffer::new(16, 16).unwrap();
    let texture = bb.add_texture(RgbaImage::new(16, 8)).unwrap();
    let sset = Rc::new(Spriteset::new(texture, 8, 8).unwrap());

    let mut map = Tilemap::new(Rc::clone(&sset), 1, 1, -1).unwrap();
    map.load_str("solid 0\ngoal 1\nmap 4 2\n0 0 0 0\n-1 -1 1 -1\n", DICT)
        .unwrap();
    assert_eq!(map.dimensions_in_tiles(), (4, 2));
    assert_eq!(map.areas().len(), 2);

    let text = map.write_string(DICT).unwrap();
    let mut copy = Tilemap::new(sset, 1, 1, -1).unwrap();
    copy.load_str(&text, DICT).unwrap();
    assert_eq!(copy.data(), map.data());
    let rects: Vec<_> = copy.areas().iter().map(Hitbox::rect).collect();
    let expected: Vec<_> = map.areas().iter().map(Hitbox::rect).collect();
    assert_eq!(rects, expected);
}
