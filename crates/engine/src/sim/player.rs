use tracing::info;

use crate::geometry::{MapGeometryIndex, PoiId, Rect, Vec2};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    pub fn label(self) -> &'static str {
        match self {
            Facing::Up => "up",
            Facing::Down => "down",
            Facing::Left => "left",
            Facing::Right => "right",
        }
    }

    fn from_direction(direction: Vec2) -> Option<Self> {
        if direction.is_zero() {
            return None;
        }
        Some(if direction.x.abs() > direction.y.abs() {
            if direction.x < 0.0 {
                Facing::Left
            } else {
                Facing::Right
            }
        } else if direction.y < 0.0 {
            Facing::Up
        } else {
            Facing::Down
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    pub spawn: Vec2,
    pub size: f32,
    /// World units per second at full deflection.
    pub speed: f32,
    pub world_size: Vec2,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            spawn: Vec2::new(100.0, 100.0),
            size: 8.0,
            speed: 120.0,
            world_size: Vec2::new(1024.0, 768.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub position: Vec2,
    pub facing: Facing,
    pub current_poi: Option<PoiId>,
    pub last_poi: Option<PoiId>,
}

#[derive(Debug, Clone)]
pub struct PlayerController {
    tuning: PlayerTuning,
    state: PlayerState,
}

impl PlayerController {
    pub fn new(tuning: PlayerTuning) -> Self {
        Self {
            tuning,
            state: Self::initial_state(tuning),
        }
    }

    fn initial_state(tuning: PlayerTuning) -> PlayerState {
        PlayerState {
            position: tuning.spawn,
            facing: Facing::default(),
            current_poi: None,
            last_poi: None,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn tuning(&self) -> &PlayerTuning {
        &self.tuning
    }

    pub fn bounds(&self) -> Rect {
        Rect::centered(self.state.position, self.tuning.size)
    }

    /// Moves by `direction * speed * dt_seconds`, sliding along walls, then
    /// returns the POI that was entered this tick, if any.
    pub fn step(&mut self, direction: Vec2, dt_seconds: f32, map: &MapGeometryIndex) -> Option<PoiId> {
        if let Some(facing) = Facing::from_direction(direction) {
            self.state.facing = facing;
            self.state.position = self.resolve_move(direction, dt_seconds, map);
        }
        self.detect_poi(map)
    }

    fn resolve_move(&self, direction: Vec2, dt_seconds: f32, map: &MapGeometryIndex) -> Vec2 {
        let current = self.state.position;
        let delta = Vec2::new(
            direction.x * self.tuning.speed * dt_seconds,
            direction.y * self.tuning.speed * dt_seconds,
        );
        let candidates = [
            Vec2::new(current.x + delta.x, current.y + delta.y),
            Vec2::new(current.x + delta.x, current.y),
            Vec2::new(current.x, current.y + delta.y),
        ];
        candidates
            .into_iter()
            .map(|candidate| self.clamp_to_world(candidate))
            .find(|candidate| *candidate != current && map.is_walkable(*candidate))
            .unwrap_or(current)
    }

    fn clamp_to_world(&self, point: Vec2) -> Vec2 {
        let half = self.tuning.size * 0.5;
        Vec2::new(
            clamp_axis(point.x, half, self.tuning.world_size.x - half),
            clamp_axis(point.y, half, self.tuning.world_size.y - half),
        )
    }

    /// Fires on the tick the overlap with a POI begins and never again until
    /// the overlap has been left.
    pub fn detect_poi(&mut self, map: &MapGeometryIndex) -> Option<PoiId> {
        let current = map.find_poi(&self.bounds());
        let current_id = current.map(|poi| poi.id);
        let entered = current.filter(|_| current_id != self.state.last_poi);
        if let Some(poi) = entered {
            info!(
                poi = poi.name.as_str(),
                class_id = poi.class_id,
                x = self.state.position.x,
                y = self.state.position.y,
                "poi_entered"
            );
        }
        self.state.current_poi = current_id;
        self.state.last_poi = current_id;
        entered.map(|poi| poi.id)
    }

    pub fn reset_to_initial(&mut self) {
        self.state = Self::initial_state(self.tuning);
    }
}

fn clamp_axis(value: f32, min: f32, max: f32) -> f32 {
    if max < min {
        return min;
    }
    value.clamp(min, max)
}
