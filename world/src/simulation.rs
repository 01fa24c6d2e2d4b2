//! Level lifecycle and the simulation tick.

use std::{collections::BTreeMap, time::Duration};

use contraption_core::{
    catalogue::rotated_footprint, Event, LevelDescriptor, PieceId, PlayMode, Rejection,
};

use crate::{
    behavior::{Behavior, BodySample, Contact, Effect},
    grid::region_center,
    inventory::Inventory,
    physics::{ContactEvent, PhysicsWorld},
    snapshot::Snapshot,
    World,
};

impl World {
    pub(crate) fn load_level(&mut self, level: LevelDescriptor, out_events: &mut Vec<Event>) {
        self.destroy_where(|_| true, out_events);
        self.grid.clear();
        self.physics = PhysicsWorld::new(self.config.gravity);
        self.links.clear();
        self.snapshot = None;
        self.undo = None;
        self.goal_reached = false;
        self.elapsed = Duration::ZERO;

        self.install_fixtures(&level, out_events);
        self.next_piece_id = u32::try_from(level.fixtures.len()).unwrap_or(u32::MAX);
        self.inventory = Inventory::from_level(&level);
        self.announce_inventory(out_events);
        self.set_play_mode(PlayMode::Edit, out_events);

        log::info!(
            "loaded level {:?} with {} fixtures",
            level.name,
            self.pieces.len()
        );
        out_events.push(Event::LevelLoaded {
            name: level.name.clone(),
        });
        self.level = Some(level);
    }

    pub(crate) fn start_simulation(&mut self, out_events: &mut Vec<Event>) -> Result<(), Rejection> {
        self.require_edit()?;
        let snapshot = Snapshot::capture(self.pieces.values(), &self.links, &self.inventory);
        log::info!(
            "captured {} placed pieces before simulating",
            snapshot.pieces.len()
        );
        self.snapshot = Some(snapshot);
        self.elapsed = Duration::ZERO;
        self.set_play_mode(PlayMode::Simulate, out_events);
        Ok(())
    }

    pub(crate) fn reset_level(&mut self, out_events: &mut Vec<Event>) {
        match self.snapshot.take() {
            Some(snapshot) => self.restore(snapshot, out_events),
            None => self.clear_player_pieces(out_events),
        }
        self.undo = None;
        self.goal_reached = false;
        self.elapsed = Duration::ZERO;
        self.set_play_mode(PlayMode::Edit, out_events);
    }

    pub(crate) fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.play_mode != PlayMode::Simulate {
            return;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        let seconds = dt.as_secs_f32();
        if seconds <= 0.0 {
            return;
        }

        let contacts = self.physics.step(seconds);
        self.dispatch_contacts(&contacts, out_events);

        let mut effects = Vec::new();
        let bodies = self.sample_bodies();
        for piece in self.pieces.values_mut() {
            let frame = piece.frame();
            piece.behavior.tick(&frame, seconds, &bodies, &mut effects);
        }

        self.physics.reset_forces();
        self.commit(effects, out_events);
    }

    /// Routes contact transitions to both pieces of every pair and commits
    /// the effects they request.
    pub(crate) fn dispatch_contacts(
        &mut self,
        contacts: &[ContactEvent],
        out_events: &mut Vec<Event>,
    ) {
        let mut effects = Vec::new();
        for contact in contacts {
            match *contact {
                ContactEvent::Started(a, b) => {
                    self.contact_started(a, b, &mut effects);
                    self.contact_started(b, a, &mut effects);
                }
                ContactEvent::Stopped(a, b) => {
                    self.contact_stopped(a, b, &mut effects);
                    self.contact_stopped(b, a, &mut effects);
                }
            }
        }
        self.commit(effects, out_events);
    }

    fn contact_started(&mut self, id: PieceId, other: PieceId, effects: &mut Vec<Effect>) {
        let Some(other_piece) = self.pieces.get(&other) else {
            return;
        };
        let contact = Contact {
            piece: other,
            kind: other_piece.kind,
            dynamic: self.physics.is_dynamic(other_piece.body),
            impact_velocity: self.physics.impact_velocity(other_piece.body),
        };
        if let Some(piece) = self.pieces.get_mut(&id) {
            let frame = piece.frame();
            piece.behavior.contact_started(&frame, &contact, effects);
        }
    }

    fn contact_stopped(&mut self, id: PieceId, other: PieceId, effects: &mut Vec<Effect>) {
        if let Some(piece) = self.pieces.get_mut(&id) {
            let frame = piece.frame();
            piece.behavior.contact_stopped(&frame, other, effects);
        }
    }

    fn sample_bodies(&self) -> Vec<BodySample> {
        self.pieces
            .values()
            .map(|piece| BodySample {
                piece: piece.id,
                position: self
                    .physics
                    .position(piece.body)
                    .unwrap_or_else(|| region_center(piece.region())),
                mass: self.physics.mass(piece.body),
                dynamic: self.physics.is_dynamic(piece.body),
            })
            .collect()
    }

    fn commit(&mut self, effects: Vec<Effect>, out_events: &mut Vec<Event>) {
        for effect in effects {
            match effect {
                Effect::Push { piece, force } => {
                    if let Some(body) = self.body_of(piece) {
                        self.physics.add_force(body, force);
                    }
                }
                Effect::SetVelocity { piece, velocity } => {
                    if let Some(body) = self.body_of(piece) {
                        self.physics.set_velocity(body, velocity);
                    }
                }
                Effect::Tilt { piece, angle } => {
                    if let Some(body) = self.body_of(piece) {
                        self.physics.set_angle(body, angle);
                    }
                }
                Effect::Sensor { piece, engaged } => {
                    log::debug!("sensor {piece:?} engaged: {engaged}");
                    out_events.push(Event::SensorChanged { piece, engaged });
                }
                Effect::Fire { source } => self.fire(source, out_events),
                Effect::Goal { goal, ball } => {
                    if !self.goal_reached {
                        self.goal_reached = true;
                        log::info!("ball {ball:?} reached goal {goal:?}");
                        out_events.push(Event::GoalReached { goal, ball });
                        if self.play_mode == PlayMode::Simulate {
                            self.set_play_mode(PlayMode::Complete, out_events);
                        }
                    }
                }
            }
        }
    }

    fn fire(&mut self, source: PieceId, out_events: &mut Vec<Event>) {
        let Some(target) = self.links.target_of(source) else {
            log::debug!("trigger {source:?} has no link");
            return;
        };
        let Some(piece) = self.pieces.get_mut(&target) else {
            log::debug!("trigger {source:?} points at missing piece {target:?}");
            return;
        };
        if let Some(active) = piece.behavior.trigger() {
            log::info!("trigger {source:?} switched {target:?} active: {active}");
            out_events.push(Event::PieceTriggered {
                piece: target,
                source,
                active,
            });
        }
    }

    fn body_of(&self, id: PieceId) -> Option<rapier2d::prelude::RigidBodyHandle> {
        self.pieces.get(&id).map(|piece| piece.body)
    }

    /// Builds the level's fixtures with identifiers matching their position in
    /// the descriptor, then resolves authored links by tag.
    fn install_fixtures(&mut self, level: &LevelDescriptor, out_events: &mut Vec<Event>) {
        let mut tags = BTreeMap::new();
        let mut installed = Vec::new();
        for (index, fixture) in level.fixtures.iter().enumerate() {
            let id = PieceId::new(u32::try_from(index).unwrap_or(u32::MAX));
            if !fixture.kind.allows_rotation(fixture.rotation) {
                log::warn!(
                    "skipping fixture {index}: {:?} cannot face {:?}",
                    fixture.kind,
                    fixture.rotation
                );
                continue;
            }
            let footprint = rotated_footprint(fixture.kind, fixture.rotation);
            if let Err(rejection) = self.grid.check_placement(fixture.origin, footprint) {
                log::warn!("skipping fixture {index} at {:?}: {rejection}", fixture.origin);
                continue;
            }
            self.spawn(
                id,
                fixture.kind,
                fixture.origin,
                fixture.rotation,
                true,
                out_events,
            );
            if let Some(tag) = &fixture.tag {
                let _ = tags.insert(tag.as_str(), id);
            }
            installed.push((id, fixture));
        }

        for (source, fixture) in installed {
            let Some(wanted) = &fixture.linked_target else {
                continue;
            };
            if !fixture.kind.is_trigger_source() {
                log::warn!("{:?} fixture {source:?} cannot fire links", fixture.kind);
                continue;
            }
            match tags.get(wanted.as_str()) {
                Some(&target) if target != source => {
                    self.links.link(source, target);
                    out_events.push(Event::TriggerLinked { source, target });
                }
                _ => log::debug!("link target {wanted:?} of {source:?} is not present"),
            }
        }
    }

    fn restore(&mut self, snapshot: Snapshot, out_events: &mut Vec<Event>) {
        self.destroy_where(|_| true, out_events);
        self.grid.clear();
        self.physics = PhysicsWorld::new(self.config.gravity);
        self.links.clear();

        if let Some(level) = self.level.take() {
            self.install_fixtures(&level, out_events);
            self.level = Some(level);
        }

        for record in &snapshot.pieces {
            let footprint = rotated_footprint(record.kind, record.rotation);
            if let Err(rejection) = self.grid.check_placement(record.origin, footprint) {
                log::warn!("could not restore {:?}: {rejection}", record.id);
                continue;
            }
            self.spawn(
                record.id,
                record.kind,
                record.origin,
                record.rotation,
                false,
                out_events,
            );
        }
        for record in &snapshot.pieces {
            if let Some(target) = record.link {
                if self.pieces.contains_key(&record.id) && self.pieces.contains_key(&target) {
                    self.links.link(record.id, target);
                    out_events.push(Event::TriggerLinked {
                        source: record.id,
                        target,
                    });
                }
            }
        }

        self.inventory = snapshot.inventory;
        self.announce_inventory(out_events);
        log::info!("restored {} placed pieces", snapshot.pieces.len());
        out_events.push(Event::SnapshotRestored);
    }

    /// Returns every player piece to the inventory declared by the level and
    /// puts fixtures back at rest.
    fn clear_player_pieces(&mut self, out_events: &mut Vec<Event>) {
        self.destroy_where(|piece| !piece.fixed, out_events);
        for piece in self.pieces.values_mut() {
            piece.behavior = Behavior::for_kind(piece.kind);
            self.physics.teleport(
                piece.body,
                region_center(piece.region()),
                piece.rest_angle(),
            );
        }
        self.inventory = self
            .level
            .as_ref()
            .map(Inventory::from_level)
            .unwrap_or_default();
        self.announce_inventory(out_events);
    }
}
