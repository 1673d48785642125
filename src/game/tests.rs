use super::*;
use crate::board::GridBoard;
use crate::command::Action;
use crate::entity::NewEntity;
use crate::error::CommandError;
use crate::event::kinds;
use crate::properties::HasProperties;
use crate::store::InMemoryDataStore;
use parking_lot::Mutex as PlMutex;
use serde_json::{json, Value};

/// Records every event it sees
#[derive(Default)]
struct Recorder {
    events: PlMutex<Vec<Event>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.kind().to_string()).collect()
    }

    fn of_kind(&self, kind: &str) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }
}

impl EventListener for Recorder {
    fn accept_event(&self, event: &Event) -> anyhow::Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Agent that logs verbs into a shared journal
struct Scribe {
    id: String,
    journal: Arc<PlMutex<Vec<String>>>,
    properties: PlMutex<Properties>,
}

impl Scribe {
    fn new(id: &str, journal: Arc<PlMutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            journal,
            properties: PlMutex::new(Properties::new()),
        })
    }
}

impl EventListener for Scribe {
    fn accept_event(&self, _event: &Event) -> anyhow::Result<()> {
        Ok(())
    }
}

impl HasProperties for Scribe {
    fn properties(&self) -> Properties {
        let mut properties = self.properties.lock().clone();
        properties.insert("id".to_string(), json!(self.id));
        properties
    }

    fn set_property(&self, key: &str, value: Value) -> Result<(), GameError> {
        self.properties.lock().insert(key.to_string(), value);
        Ok(())
    }
}

impl Agent for Scribe {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> &str {
        "scribe"
    }

    fn receive_command(&self, game: &Game, command: &Command) -> Result<(), CommandError> {
        let verb = command.require_str("verb")?;
        if verb == "fail" {
            return Err(CommandError::Rejected("cannot fail on purpose".to_string()));
        }
        self.journal.lock().push(format!("command:{}", verb));

        let journal = Arc::clone(&self.journal);
        let verb = verb.to_string();
        game.enqueue_action(Action::new(move |_| {
            journal.lock().push(format!("deferred:{}", verb));
            Ok(())
        }));
        Ok(())
    }
}

fn game_with_board() -> Game {
    let game = Game::new("g1");
    game.add_board(Arc::new(GridBoard::new("B", 5, 5)));
    game
}

fn recorder(game: &Game) -> Arc<Recorder> {
    let recorder = Arc::new(Recorder::default());
    game.register_listener(recorder.clone());
    recorder
}

fn command(verb: &str) -> Command {
    Command::new("g1", Properties::from([("verb".to_string(), json!(verb))]))
}

#[test]
fn test_register_places_entity_under_root() {
    let game = Game::new("g1");
    let events = recorder(&game);

    let id = game.register_entity(NewEntity::new("crate")).unwrap();

    assert_eq!(game.contents_of(&Container::Root), vec![id]);
    assert_eq!(game.location_of(id).unwrap(), Container::Root);
    assert_eq!(events.kinds(), vec![kinds::ENTITY_CREATION]);

    let created = &events.of_kind(kinds::ENTITY_CREATION)[0];
    assert_eq!(created.get("entity-id"), Some(&json!(id)));
    assert_eq!(created.get("entity-type"), Some(&json!("crate")));
    assert!(created.describes(&StateRef::Entity(id)));
}

#[test]
fn test_move_to_tile_describes_both_locations() {
    let game = game_with_board();
    let events = recorder(&game);
    let id = game.register_entity(NewEntity::new("player")).unwrap();

    let previous = game.move_entity(id, Container::tile("B", 2, 3)).unwrap();
    assert_eq!(previous, Container::Root);

    let moved = &events.of_kind(kinds::ENTITY_MOVED)[0];
    assert_eq!(moved.get("entity"), Some(&json!(id)));
    assert_eq!(moved.get("board"), Some(&json!("B")));
    assert_eq!(moved.get("row"), Some(&json!(2)));
    assert_eq!(moved.get("column"), Some(&json!(3)));
    assert_eq!(moved.get("previous-board"), None);
    assert!(moved.describes(&StateRef::Tile(crate::container::TileRef::new("B", 2, 3))));

    game.move_entity(id, Container::tile("B", 2, 4)).unwrap();
    let moved = &events.of_kind(kinds::ENTITY_MOVED)[1];
    assert_eq!(moved.get("previous-column"), Some(&json!(3)));
    assert_eq!(moved.get("column"), Some(&json!(4)));
}

#[test]
fn test_move_to_same_container_still_emits() {
    let game = game_with_board();
    let events = recorder(&game);
    let id = game
        .register_entity(NewEntity::new("player").at(Container::tile("B", 1, 1)))
        .unwrap();

    game.move_entity(id, Container::tile("B", 1, 1)).unwrap();

    assert_eq!(events.of_kind(kinds::ENTITY_MOVED).len(), 2);
    assert_eq!(game.contents_of(&Container::tile("B", 1, 1)), vec![id]);
    assert!(game.is_consistent());
}

#[test]
fn test_initial_location_follows_creation() {
    let game = game_with_board();
    let events = recorder(&game);

    let id = game
        .register_entity(NewEntity::new("crate").at(Container::tile("B", 0, 0)))
        .unwrap();

    assert_eq!(events.kinds(), vec![kinds::ENTITY_CREATION, kinds::ENTITY_MOVED]);
    assert_eq!(game.location_of(id).unwrap(), Container::tile("B", 0, 0));
}

#[test]
fn test_move_rejects_unknown_targets() {
    let game = game_with_board();
    let id = game.register_entity(NewEntity::new("crate")).unwrap();

    assert!(matches!(
        game.move_entity(id, Container::tile("nowhere", 0, 0)),
        Err(GameError::UnknownBoard(name)) if name == "nowhere"
    ));
    assert!(matches!(
        game.move_entity(id, Container::tile("B", 9, 9)),
        Err(GameError::UnknownContainer(_))
    ));
    assert!(matches!(
        game.move_entity(id, Container::Entity(999)),
        Err(GameError::UnknownContainer(_))
    ));
    assert!(matches!(
        game.move_entity(999, Container::Root),
        Err(GameError::NotRegistered(999))
    ));
    assert_eq!(game.location_of(id).unwrap(), Container::Root);
}

#[test]
fn test_move_rejects_containment_cycle() {
    let game = Game::new("g1");
    let outer = game.register_entity(NewEntity::new("chest")).unwrap();
    let inner = game
        .register_entity(NewEntity::new("pouch").at(Container::Entity(outer)))
        .unwrap();

    assert!(matches!(
        game.move_entity(outer, Container::Entity(inner)),
        Err(GameError::ContainmentCycle { entity, .. }) if entity == outer
    ));
    assert!(matches!(
        game.move_entity(outer, Container::Entity(outer)),
        Err(GameError::ContainmentCycle { .. })
    ));
}

#[test]
fn test_deregister_announces_vacated_location() {
    let game = game_with_board();
    let id = game
        .register_entity(NewEntity::new("crate").at(Container::tile("B", 1, 2)))
        .unwrap();
    let events = recorder(&game);

    let removed = game.deregister_entity(id).unwrap();
    assert_eq!(removed.id(), id);

    assert_eq!(events.kinds(), vec![kinds::ENTITY_MOVED, kinds::ENTITY_DELETION]);
    let moved = &events.of_kind(kinds::ENTITY_MOVED)[0];
    assert_eq!(moved.get("previous-board"), Some(&json!("B")));
    assert_eq!(moved.get("board"), None);

    assert!(matches!(game.location_of(id), Err(GameError::NotRegistered(_))));
    assert!(game.contents_of(&Container::tile("B", 1, 2)).is_empty());
    assert!(game.entity(id).is_none());
    assert!(matches!(game.deregister_entity(id), Err(GameError::NotRegistered(_))));
}

#[test]
fn test_deregister_container_spills_contents() {
    let game = game_with_board();
    let chest = game
        .register_entity(NewEntity::new("chest").at(Container::tile("B", 3, 3)))
        .unwrap();
    let coin = game
        .register_entity(NewEntity::new("coin").at(Container::Entity(chest)))
        .unwrap();

    game.deregister_entity(chest).unwrap();

    assert_eq!(game.location_of(coin).unwrap(), Container::tile("B", 3, 3));
    assert!(game.contents_of(&Container::Entity(chest)).is_empty());
    assert!(game.is_consistent());
}

#[test]
fn test_top_level_location_resolves_one_level() {
    let game = game_with_board();
    let chest = game
        .register_entity(NewEntity::new("chest").at(Container::tile("B", 4, 0)))
        .unwrap();
    let coin = game
        .register_entity(NewEntity::new("coin").at(Container::Entity(chest)))
        .unwrap();
    let loose = game.register_entity(NewEntity::new("coin")).unwrap();

    assert_eq!(
        game.top_level_location_of(coin).unwrap(),
        Some(Container::tile("B", 4, 0))
    );
    assert_eq!(
        game.top_level_location_of(chest).unwrap(),
        Some(Container::tile("B", 4, 0))
    );
    assert_eq!(game.top_level_location_of(loose).unwrap(), None);
}

#[test]
fn test_set_entity_property_emits_update() {
    let game = Game::new("g1");
    let id = game
        .register_entity(NewEntity::new("door").with_property("open", json!(false)))
        .unwrap();
    let events = recorder(&game);

    let old = game.set_entity_property(id, "open", json!(true)).unwrap();
    assert_eq!(old, Some(json!(false)));
    assert_eq!(game.entity(id).unwrap().property("open"), Some(json!(true)));

    let updated = &events.of_kind(kinds::ENTITY_UPDATED)[0];
    assert_eq!(updated.get("property"), Some(&json!("open")));
    assert_eq!(updated.get("old-value"), Some(&json!(false)));
    assert_eq!(updated.get("new-value"), Some(&json!(true)));

    assert!(matches!(
        game.set_entity_property(id, "id", json!(5)),
        Err(GameError::Immutable(_))
    ));
}

#[test]
fn test_entity_listener_lives_with_entity() {
    let game = Game::new("g1");
    let heard = Arc::new(Recorder::default());
    let id = game
        .register_entity(NewEntity::new("guard").listening(heard.clone()))
        .unwrap();
    assert_eq!(game.listener_count(), 1);

    game.register_entity(NewEntity::new("crate")).unwrap();
    game.deregister_entity(id).unwrap();
    game.register_entity(NewEntity::new("crate")).unwrap();

    assert_eq!(game.listener_count(), 0);
    // Detached before its removal events are delivered
    assert_eq!(heard.kinds(), vec![kinds::ENTITY_CREATION, kinds::ENTITY_CREATION]);
}

#[test]
fn test_entity_id_of_requires_registration() {
    let game = Game::new("g1");
    let id = game.register_entity(NewEntity::new("crate")).unwrap();
    let entity = game.entity(id).unwrap();
    assert_eq!(game.entity_id_of(&entity).unwrap(), id);

    game.deregister_entity(id).unwrap();
    assert!(matches!(game.entity_id_of(&entity), Err(GameError::NotRegistered(_))));
}

#[test]
fn test_persistent_kind_adopts_stored_id() {
    let store = Arc::new(InMemoryDataStore::new());
    {
        let first = Game::builder("g1")
            .data_store(store.clone())
            .persistent_kind("hero")
            .build()
            .unwrap();
        let id = first
            .register_entity(NewEntity::new("hero").with_property("name", json!("ayla")))
            .unwrap();
        first.set_entity_property(id, "level", json!(7)).unwrap();
        first.deregister_entity(id).unwrap();
        assert_eq!(id, 1);
    }

    let second = Game::builder("g1")
        .data_store(store.clone())
        .persistent_kind("hero")
        .build()
        .unwrap();
    let hero = second
        .register_entity(NewEntity::new("hero").with_property("name", json!("ayla")))
        .unwrap();
    assert_eq!(hero, 1);
    assert_eq!(second.entity(hero).unwrap().property("level"), Some(json!(7)));

    // Fresh ids start past the stored maximum
    let other = second.register_entity(NewEntity::new("crate")).unwrap();
    assert_eq!(other, 2);
}

#[test]
fn test_live_persisted_id_falls_back_to_fresh() {
    let store = Arc::new(InMemoryDataStore::new());
    let game = Game::builder("g1")
        .data_store(store.clone())
        .persistent_kind("hero")
        .build()
        .unwrap();

    let first = game
        .register_entity(NewEntity::new("hero").with_property("name", json!("ayla")))
        .unwrap();
    game.save_entity(first).unwrap();
    let second = game
        .register_entity(NewEntity::new("hero").with_property("name", json!("ayla")))
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(game.entity_count(), 2);
    assert!(game.is_consistent());
}

#[test]
fn test_save_entity_without_store() {
    let game = Game::new("g1");
    let id = game.register_entity(NewEntity::new("crate")).unwrap();
    assert!(matches!(game.save_entity(id), Err(GameError::NotFound(_))));
}

#[test]
fn test_container_handle() {
    let game = game_with_board();
    let chest = game.register_entity(NewEntity::new("chest")).unwrap();
    let coin = game.register_entity(NewEntity::new("coin")).unwrap();
    let handle = game.container(Container::Entity(chest));

    assert!(handle.is_empty());
    handle.add(coin).unwrap();
    assert!(handle.contains(coin));
    assert_eq!(handle.entities(), vec![coin]);

    handle.remove(coin).unwrap();
    assert!(handle.is_empty());
    assert_eq!(game.location_of(coin).unwrap(), Container::Root);
    assert!(matches!(handle.remove(coin), Err(GameError::NotFound(_))));
}

#[test]
fn test_remove_board_deregisters_nested_first() {
    let game = game_with_board();
    let chest = game
        .register_entity(NewEntity::new("chest").at(Container::tile("B", 0, 1)))
        .unwrap();
    let coin = game
        .register_entity(NewEntity::new("coin").at(Container::Entity(chest)))
        .unwrap();
    let player = game
        .register_entity(NewEntity::new("player").at(Container::tile("B", 2, 2)))
        .unwrap();
    let bystander = game.register_entity(NewEntity::new("npc")).unwrap();

    let removed = game.remove_board("B").unwrap();

    assert_eq!(removed, vec![coin, chest, player]);
    assert!(game.board("B").is_none());
    assert_eq!(game.entity_count(), 1);
    assert!(game.entity(bystander).is_some());
    assert!(matches!(game.remove_board("B"), Err(GameError::UnknownBoard(_))));
}

#[test]
fn test_board_state_lists_tile_contents() {
    let game = game_with_board();
    let id = game
        .register_entity(NewEntity::new("crate").at(Container::tile("B", 1, 1)))
        .unwrap();

    let state = game.board_state("B").unwrap();
    assert_eq!(state.tiles.len(), 25);
    let tile = state
        .tiles
        .iter()
        .find(|t| t.row == 1 && t.column == 1)
        .unwrap();
    assert_eq!(tile.entities, vec![id]);
    assert!(matches!(game.board_state("C"), Err(GameError::UnknownBoard(_))));
}

#[test]
fn test_emit_custom_event() {
    let game = Game::new("g1");
    let events = recorder(&game);

    let event = game.emit(
        "door-opened",
        Properties::from([("door".to_string(), json!(4))]),
        [StateRef::Entity(4)],
    );

    assert_eq!(event.kind(), "door-opened");
    assert_eq!(events.kinds(), vec!["door-opened"]);
}

#[test]
fn test_agents_become_listeners() {
    let game = Game::new("g1");
    let journal = Arc::new(PlMutex::new(Vec::new()));
    game.add_agent(Scribe::new("a1", journal.clone()));
    game.add_agent(Scribe::new("a2", journal));

    assert_eq!(game.agent_count(), 2);
    assert_eq!(game.listener_count(), 2);
    assert_eq!(game.agents()[0].agent_id(), "a1");

    // Replacing an agent swaps its listener
    game.add_agent(Scribe::new("a1", Arc::new(PlMutex::new(Vec::new()))));
    assert_eq!(game.listener_count(), 2);

    assert!(game.remove_agent("a1").is_some());
    assert!(game.agent("a1").is_none());
    assert_eq!(game.listener_count(), 1);
    assert!(game.remove_agent("a1").is_none());
}

#[test]
fn test_tick_runs_commands_before_actions() {
    let game = Game::new("g1");
    let journal = Arc::new(PlMutex::new(Vec::new()));
    let scribe = Scribe::new("a1", journal.clone());
    game.add_agent(scribe.clone());

    let log = Arc::clone(&journal);
    game.enqueue_action(Action::new(move |_| {
        log.lock().push("action".to_string());
        Ok(())
    }));
    game.enqueue_command(scribe.clone(), command("look"));
    game.enqueue_command(scribe, command("fail"));

    let summary = game.run_tick().unwrap();
    assert_eq!(summary.tick, 1);
    assert_eq!(summary.commands_processed, 2);
    assert_eq!(summary.commands_rejected, 1);
    assert_eq!(summary.actions_applied, 1);
    assert_eq!(*journal.lock(), vec!["command:look", "action"]);

    // The action queued by the command waits for the next tick
    assert_eq!(game.pending_actions(), 1);
    let summary = game.run_tick().unwrap();
    assert_eq!(summary.actions_applied, 1);
    assert_eq!(journal.lock().last().map(String::as_str), Some("deferred:look"));
}

#[test]
fn test_failed_action_requeues_the_rest() {
    let game = Game::new("g1");
    game.enqueue_action(Action::new(|_| Err(GameError::NotRegistered(42))).describe("doomed"));
    game.enqueue_action(Action::new(|_| Ok(())));

    assert!(matches!(game.run_tick(), Err(GameError::NotRegistered(42))));
    assert_eq!(game.pending_actions(), 1);

    let summary = game.run_tick().unwrap();
    assert_eq!(summary.actions_applied, 1);
}

#[test]
fn test_enqueue_command_for_unknown_agent() {
    let game = Game::new("g1");
    assert!(matches!(
        game.enqueue_command_for("ghost", command("look")),
        Err(GameError::NotFound(_))
    ));
}

#[test]
fn test_loop_stops_when_predicate_fails() {
    let game = Arc::new(Game::new("g1"));
    let mut game_loop = GameLoop::new(Arc::clone(&game));
    assert_eq!(game_loop.state(), LoopState::Running);

    let mut remaining = 3;
    let ticks = game_loop
        .run(|| {
            remaining -= 1;
            remaining >= 0
        })
        .unwrap();

    assert_eq!(ticks, 3);
    assert_eq!(game.ticks(), 3);
    assert_eq!(game_loop.state(), LoopState::Stopped);

    // Stopped is terminal
    assert_eq!(game_loop.run(|| true).unwrap(), 0);
}

#[test]
fn test_loop_stops_on_failed_action() {
    let game = Arc::new(Game::new("g1"));
    game.enqueue_action(Action::new(|_| Err(GameError::NotFound("lever".to_string()))));
    let mut game_loop = GameLoop::new(Arc::clone(&game));

    assert!(game_loop.run(|| true).is_err());
    assert_eq!(game_loop.state(), LoopState::Stopped);
}

#[test]
fn test_bound_agent_commands_reach_queue() {
    let sink = Arc::new(crate::sink::BroadcastSink::default());
    let game = Arc::new(Game::builder("g1").sink(sink.clone()).build().unwrap());
    let journal = Arc::new(PlMutex::new(Vec::new()));
    game.add_agent(Scribe::new("a1", journal.clone()));
    game.bind_agent_commands("a1").unwrap();

    assert!(sink.deliver_command("a1", r#"{"verb": "wave"}"#));
    assert!(sink.deliver_command("a1", "[1, 2, 3]"));
    assert!(!sink.deliver_command("nobody", r#"{"verb": "wave"}"#));
    assert_eq!(game.pending_commands(), 1);

    game.run_tick().unwrap();
    assert_eq!(*journal.lock(), vec!["command:wave"]);
}

#[test]
fn test_failed_registration_leaves_no_trace() {
    let game = game_with_board();
    let events = recorder(&game);

    assert!(matches!(
        game.register_entity(NewEntity::new("gem").at(Container::Entity(77))),
        Err(GameError::UnknownContainer(_))
    ));
    assert!(matches!(
        game.register_entity(NewEntity::new("gem").at(Container::tile("B", 9, 9))),
        Err(GameError::UnknownContainer(_))
    ));

    assert_eq!(game.entity_count(), 0);
    assert!(game.contents_of(&Container::Root).is_empty());
    assert!(events.kinds().is_empty());
}

#[test]
fn test_registration_survives_holder_removed_by_listener() {
    let game = Arc::new(game_with_board());
    let chest = game
        .register_entity(NewEntity::new("chest").at(Container::tile("B", 1, 1)))
        .unwrap();

    // Removes the chest as soon as a gem is announced
    let handle = Arc::downgrade(&game);
    game.register_listener(Arc::new(move |event: &Event| -> anyhow::Result<()> {
        let is_gem = event.get("entity-type") == Some(&json!("gem"));
        if event.kind() == kinds::ENTITY_CREATION && is_gem {
            if let Some(game) = handle.upgrade() {
                game.deregister_entity(chest)?;
            }
        }
        Ok(())
    }));
    let events = recorder(&game);

    let gem = game
        .register_entity(NewEntity::new("gem").at(Container::Entity(chest)))
        .unwrap();

    // The gem was already inside, so it spills onto the chest's tile
    assert_eq!(game.location_of(gem).unwrap(), Container::tile("B", 1, 1));
    assert_eq!(game.entity_count(), 1);
    assert!(game.is_consistent());
    assert_eq!(
        events.kinds(),
        vec![
            kinds::ENTITY_CREATION,
            kinds::ENTITY_MOVED,
            kinds::ENTITY_MOVED,
            kinds::ENTITY_MOVED,
            kinds::ENTITY_DELETION
        ]
    );

    let moves = events.of_kind(kinds::ENTITY_MOVED);
    assert_eq!(moves[0].get("entity"), Some(&json!(gem)));
    assert_eq!(moves[0].get("entity-container"), Some(&json!(chest)));
    assert_eq!(moves[1].get("previous-entity-container"), Some(&json!(chest)));
    assert_eq!(moves[1].get("row"), Some(&json!(1)));
    assert_eq!(moves[2].get("entity"), Some(&json!(chest)));
}

#[test]
fn test_later_listeners_see_events_in_id_order() {
    let game = Arc::new(Game::new("g1"));

    // Every crate drags a shadow in with it
    let handle = Arc::downgrade(&game);
    game.register_listener(Arc::new(move |event: &Event| -> anyhow::Result<()> {
        let is_crate = event.get("entity-type") == Some(&json!("crate"));
        if event.kind() == kinds::ENTITY_CREATION && is_crate {
            if let Some(game) = handle.upgrade() {
                game.register_entity(NewEntity::new("shadow"))?;
            }
        }
        Ok(())
    }));
    let events = recorder(&game);

    game.register_entity(NewEntity::new("crate")).unwrap();
    game.register_entity(NewEntity::new("crate")).unwrap();

    let seen = events.events.lock();
    assert_eq!(seen.len(), 4);
    assert!(seen.windows(2).all(|pair| pair[0].id() < pair[1].id()));
}

#[test]
fn test_remote_events_reach_local_listeners() {
    let sink = Arc::new(crate::sink::BroadcastSink::default());
    let mut rx = sink.subscribe();
    let game = Arc::new(Game::builder("g1").sink(sink.clone()).build().unwrap());
    let events = recorder(&game);
    game.bind_remote_events().unwrap();

    let delivered = sink.deliver_event(
        r#"{"id": 500, "type": "weather-changed", "time": 10, "properties": {"sky": "rain"}}"#,
    );
    assert_eq!(delivered, 1);
    sink.deliver_event("not an event");

    assert_eq!(events.kinds(), vec!["weather-changed"]);
    let heard = &events.of_kind("weather-changed")[0];
    assert_eq!(heard.id(), 500);
    assert_eq!(heard.get("sky"), Some(&json!("rain")));
    // Not echoed back to the transport
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_emit_after_publishes_later() {
    let game = Arc::new(Game::new("g1"));
    let events = recorder(&game);

    let pending = game
        .emit_after(
            Duration::from_millis(30),
            "bell",
            Properties::new(),
            vec![StateRef::Game],
        )
        .unwrap();
    let knock = game.emit("knock", Properties::new(), []);
    assert_eq!(events.kinds(), vec!["knock"]);

    let bell = pending.await.unwrap().unwrap();
    assert!(bell.id() > knock.id());
    assert!(bell.describes(&StateRef::Game));
    assert_eq!(events.kinds(), vec!["knock", "bell"]);
}

#[test]
fn test_emit_after_needs_a_runtime() {
    let game = Arc::new(Game::new("g1"));
    let result = game.emit_after(Duration::from_millis(1), "bell", Properties::new(), vec![]);
    assert!(result.is_err());
}
