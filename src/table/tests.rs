use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use super::{AnyTable, Entity, Record, SharedTable, Table};
use crate::error::Error;
use crate::handle::{HandleId, HandleKind, Handles};
use crate::jar::Mint;
use crate::lock::RawTableLock;
use crate::pool::RayonPool;
use crate::test_util::{self, Position, Setting, Sprite, Velocity};
use crate::trigger::Triggers;

fn mint_entities(mint: &mut Mint<u32>, count: usize) -> Vec<Entity> {
    (0..count)
        .map(|_| Entity::from_cookie(mint.next_cookie().expect("mint entity")))
        .collect()
}

fn pos(x: f32) -> Position { Position { x, y: -x } }

#[test]
fn test_populate_update_destroy() {
    test_util::init();
    let mut mint = Mint::default();
    let entities = mint_entities(&mut mint, 3);
    let table = Table::<Position>::new();

    for (i, &entity) in entities.iter().enumerate() {
        assert_eq!(table.populate(entity, pos(i as f32)).expect("populate"), None);
    }
    assert_eq!(table.len(), 3);

    let previous = table.populate(entities[1], pos(10.0)).expect("update");
    assert_eq!(previous, Some(pos(1.0)));
    assert_eq!(table.entity_record(entities[1]), Some(pos(10.0)));

    table.with_entity_record_mut(entities[2], |record| record.y = 5.0);
    assert_eq!(table.with_entity_record(entities[2], |record| record.y), Some(5.0));

    assert_eq!(table.destroy_entity_record(entities[0]).expect("destroy"), pos(0.0));
    assert!(!table.has_entity_record(entities[0]));
    assert_eq!(table.len(), 2);

    match table.destroy_entity_record(entities[0]) {
        Err(Error::EntityRecordNotFound { entity, table: name }) => {
            assert_eq!(entity, entities[0]);
            assert_eq!(name, "Position");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_populate_invalid_entity() {
    let table = Table::<Position>::new();
    assert!(matches!(table.populate(Entity::INVALID, pos(0.0)), Err(Error::CookieInvalid { .. })));
    assert!(table.is_empty());
}

#[test]
fn test_populate_evicts_stale_record() {
    test_util::init();
    let mut mint = Mint::default();
    let old = mint_entities(&mut mint, 1)[0];
    let table = Table::<Position>::new();
    table.populate(old, pos(1.0)).expect("populate");

    // the entity is freed elsewhere without cleaning this table
    mint.return_cookie(old.cookie()).expect("return cookie");
    let new = mint_entities(&mut mint, 1)[0];
    assert_eq!(old.index(), new.index());

    assert_eq!(table.populate(new, pos(2.0)).expect("populate"), None);
    assert!(!table.has_entity_record(old));
    assert_eq!(table.entity_record(new), Some(pos(2.0)));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_populate_rejects_stale_entity() {
    test_util::init();
    let mut mint = Mint::default();
    let old = mint_entities(&mut mint, 1)[0];
    mint.return_cookie(old.cookie()).expect("return cookie");
    let new = mint_entities(&mut mint, 1)[0];
    assert_eq!(old.index(), new.index());

    let table = Table::<Position>::new();
    table.populate(new, pos(7.0)).expect("populate");

    assert!(matches!(table.populate(old, pos(1.0)), Err(Error::CookieInvalid { .. })));
    let erased: &dyn AnyTable = &table;
    assert!(matches!(
        erased.populate_erased(old, Some(Box::new(pos(1.0)))),
        Err(Error::CookieInvalid { .. })
    ));

    assert_eq!(table.entity_record(new), Some(pos(7.0)));
    assert!(!table.has_entity_record(old));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_destroy_releases_handles() {
    test_util::init();
    let handles = Arc::new(Handles::new(Arc::new(Triggers::default())));
    let table = Table::<Sprite>::with_lock(RawTableLock::new("Sprite"), Some(Arc::clone(&handles)));
    let mut mint = Mint::default();
    let entities = mint_entities(&mut mint, 2);

    let texture = handles.add_handle(HandleKind(1), Arc::new("a.png")).expect("add handle");
    let palette = handles.add_handle(HandleKind(2), Arc::new("a.pal")).expect("add handle");
    let shared = handles.add_handle(HandleKind(1), Arc::new("b.png")).expect("add handle");

    table
        .populate(entities[0], Sprite { texture, palette: Some(palette), layer: 0 })
        .expect("populate");
    table
        .populate(entities[1], Sprite { texture: shared, palette: None, layer: 1 })
        .expect("populate");

    table.destroy_entity_record(entities[0]).expect("destroy");
    assert!(!handles.contains(texture));
    assert!(!handles.contains(palette));
    assert!(handles.contains(shared));

    // an already released handle does not prevent destruction
    handles.release_handle(shared).expect("release");
    table.destroy_entity_record(entities[1]).expect("destroy");
    assert!(table.is_empty());
}

#[test]
fn test_snapshot_mirrors_deletions_only() {
    test_util::init();
    let mut mint = Mint::default();
    let entities = mint_entities(&mut mint, 4);
    let table = Table::<Position>::new();
    for &entity in &entities[..3] {
        table.populate(entity, pos(entity.index() as f32)).expect("populate");
    }

    assert!(!table.has_snapshot());
    assert!(table.take_snapshot());
    assert!(table.has_snapshot());

    {
        let snapshot = table.scoped_snapshot();
        assert_eq!(table.snapshot_users(), 1);
        assert_eq!(snapshot.len(), 3);

        table.populate(entities[3], pos(3.0)).expect("populate");
        table.populate(entities[0], pos(100.0)).expect("update");
        table.destroy_entity_record(entities[1]).expect("destroy");

        assert!(!table.take_snapshot(), "snapshot must not be replaced while in use");
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.contains(entities[1]));
        assert!(!snapshot.contains(entities[3]));
        assert_eq!(snapshot.get(entities[0]), Some(pos(0.0)));
    }

    assert_eq!(table.snapshot_users(), 0);
    assert!(table.take_snapshot());
    let snapshot = table.scoped_snapshot();
    let mut seen = Vec::new();
    snapshot.for_each(|entity, _| seen.push(entity));
    seen.sort();
    assert_eq!(seen, vec![entities[0], entities[2], entities[3]]);
}

#[test]
fn test_snapshot_shrinks_under_concurrent_removal() {
    test_util::init();
    const COUNT: usize = 2000;

    let mut mint = Mint::default();
    let entities = mint_entities(&mut mint, COUNT);
    let table = Table::<Position>::new();
    for &entity in &entities {
        table.populate(entity, pos(0.0)).expect("populate");
    }
    assert!(table.take_snapshot());
    let snapshot = table.scoped_snapshot();

    thread::scope(|scope| {
        scope.spawn(|| {
            for &entity in &entities {
                table.destroy_entity_record(entity).expect("destroy");
            }
        });

        let mut last = COUNT;
        while last > 0 {
            let len = snapshot.len();
            assert!(len <= last, "snapshot grew from {last} to {len}");
            last = len;

            let read = snapshot.read();
            for (entity, _) in read.iter() {
                assert!(!entity.is_invalid());
            }
        }
    });

    assert!(snapshot.is_empty());
    assert!(table.is_empty());
}

#[test]
fn test_sort_keeps_lookups() {
    let mut mint = Mint::default();
    let entities = mint_entities(&mut mint, 5);
    let table = Table::<Position>::new();
    for (i, &entity) in entities.iter().enumerate() {
        table.populate(entity, pos((10 - i) as f32)).expect("populate");
    }

    table.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut xs = Vec::new();
    table.for_each(|_, record| xs.push(record.x));
    assert_eq!(xs, vec![6.0, 7.0, 8.0, 9.0, 10.0]);

    for (i, &entity) in entities.iter().enumerate() {
        assert_eq!(table.entity_record(entity), Some(pos((10 - i) as f32)));
    }
    assert_eq!(table.entities(), entities.iter().rev().copied().collect::<Vec<_>>());
}

#[test]
fn test_par_for_each_visits_every_record() {
    test_util::init();
    let pool = RayonPool::new(4);
    let mut mint = Mint::default();
    let entities = mint_entities(&mut mint, 1000);
    let table = Table::<Position>::new();
    for &entity in &entities {
        table.populate(entity, pos(1.0)).expect("populate");
    }

    let visited = AtomicUsize::new(0);
    let index_sum = AtomicUsize::new(0);
    table.par_for_each(&pool, 16, |entity, record| {
        assert_eq!(record.x, 1.0);
        visited.fetch_add(1, Ordering::Relaxed);
        index_sum.fetch_add(entity.index() as usize, Ordering::Relaxed);
    });

    assert_eq!(visited.into_inner(), 1000);
    assert_eq!(index_sum.into_inner(), (0..1000).sum::<usize>());
}

#[test]
fn test_populate_erased() {
    let mut mint = Mint::default();
    let entity = mint_entities(&mut mint, 1)[0];
    let table: Arc<dyn AnyTable> = Arc::new(Table::<Position>::new());

    assert!(matches!(
        table.populate_erased(entity, None),
        Err(Error::InvalidData { table: "Position", reason: "missing value" })
    ));
    assert!(matches!(
        table.populate_erased(entity, Some(Box::new(Velocity(1.0, 2.0)))),
        Err(Error::InvalidData { table: "Position", reason: "record type mismatch" })
    ));
    assert!(!table.has_entity_record(entity));

    table.populate_erased(entity, Some(Box::new(pos(4.0)))).expect("populate erased");
    assert!(table.has_entity_record(entity));
    assert_eq!(table.len(), 1);

    let typed = Arc::clone(&table).as_any_arc().downcast::<Table<Position>>().expect("downcast");
    assert_eq!(typed.entity_record(entity), Some(pos(4.0)));

    table.destroy_entity_record(entity).expect("destroy erased");
    assert!(table.is_empty());
}

#[test]
fn test_shared_table() {
    let table = SharedTable::<Setting>::new();

    assert_eq!(table.populate("volume", Setting("10".into())), None);
    assert_eq!(table.populate("language", Setting("en".into())), None);
    assert_eq!(table.populate("volume", Setting("11".into())), Some(Setting("10".into())));

    assert_eq!(table.record("volume"), Some(Setting("11".into())));
    table.with_record_mut("language", |record| record.0.push_str("-GB"));
    assert_eq!(table.with_record("language", |record| record.0.clone()), Some("en-GB".into()));
    assert!(table.has_record("volume"));
    assert_eq!(table.names(), vec![Box::from("volume"), Box::from("language")]);

    assert_eq!(table.destroy_record("volume"), Some(Setting("11".into())));
    assert_eq!(table.destroy_record("volume"), None);
    assert_eq!(table.names(), vec![Box::from("language")]);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_shared_table_releases_handles() {
    test_util::init();
    let handles = Arc::new(Handles::new(Arc::new(Triggers::default())));
    let table =
        SharedTable::<Sprite>::with_lock(RawTableLock::new("Sprite"), Some(Arc::clone(&handles)));

    let texture = handles.add_handle(HandleKind(1), Arc::new("sky.png")).expect("add handle");
    let palette = handles.add_handle(HandleKind(2), Arc::new("sky.pal")).expect("add handle");
    table.populate("sky", Sprite { texture, palette: Some(palette), layer: 0 });

    let record = table.destroy_record("sky").expect("destroy");
    assert_eq!(record.texture, texture);
    assert!(!handles.contains(texture));
    assert!(!handles.contains(palette));
    assert!(handles.is_empty());
}

#[test]
fn test_derived_schema() {
    assert_eq!(Position::NAME, "Position");
    let fields: Vec<_> = Position::FIELDS.iter().map(|field| (field.name, field.ty)).collect();
    assert_eq!(fields, vec![("x", "f32"), ("y", "f32")]);
    assert!(Position::FIELDS.iter().all(|field| field.size == 4));

    assert_eq!(Velocity::NAME, "velocities");
    let names: Vec<_> = Velocity::FIELDS.iter().map(|field| field.name).collect();
    assert_eq!(names, vec!["0", "1"]);

    assert_eq!(Sprite::FIELDS.len(), 3);
    let sprite = Sprite { texture: HandleId::INVALID, palette: None, layer: 2 };
    let mut visited = Vec::new();
    sprite.visit_handles(&mut |id| visited.push(id));
    assert_eq!(visited, vec![HandleId::INVALID]);

    let mut visited = 0;
    pos(0.0).visit_handles(&mut |_| visited += 1);
    assert_eq!(visited, 0);
}
