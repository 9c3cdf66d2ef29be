use std::collections::HashSet;

use tracing::{info, warn};

use super::{GeometrySource, MapLoadError, Vec2};

pub const WALKABLE_CLASS_ID: i32 = 99;

/// Authored map object. `class_id == WALKABLE_CLASS_ID` is walkable floor,
/// anything else is a POI and must be named.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub class_id: i32,
    pub name: Option<String>,
}

impl Rectangle {
    pub fn walkable(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            class_id: WALKABLE_CLASS_ID,
            name: None,
        }
    }

    pub fn poi(name: &str, class_id: i32, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            class_id,
            name: Some(name.to_string()),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Axis-aligned box, top-left origin, y grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn centered(center: Vec2, size: f32) -> Self {
        let half = size * 0.5;
        Self {
            x: center.x - half,
            y: center.y - half,
            width: size,
            height: size,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Half-open on the far edges so adjacent rectangles never both claim a point.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Touching edges do not count as overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoiId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Poi {
    pub id: PoiId,
    pub name: String,
    pub class_id: i32,
    pub bounds: Rect,
}

#[derive(Debug, Clone, Default)]
pub struct MapGeometryIndex {
    walkable: Vec<Rect>,
    pois: Vec<Poi>,
    excluded_count: usize,
}

impl MapGeometryIndex {
    pub fn load(source: &dyn GeometrySource) -> Result<Self, MapLoadError> {
        let rectangles = source.load_rectangles()?;
        let index = Self::from_rectangles(rectangles);
        if index.walkable.is_empty() {
            return Err(MapLoadError::NoWalkableArea);
        }
        info!(
            walkable_count = index.walkable.len(),
            poi_count = index.pois.len(),
            excluded_count = index.excluded_count,
            "map_loaded"
        );
        Ok(index)
    }

    /// Builds the index, excluding POIs that are unnamed or reuse a name.
    pub fn from_rectangles(rectangles: Vec<Rectangle>) -> Self {
        let mut walkable = Vec::new();
        let mut pois: Vec<Poi> = Vec::new();
        let mut seen_names = HashSet::new();
        let mut excluded_count = 0usize;

        for rectangle in rectangles {
            if rectangle.class_id == WALKABLE_CLASS_ID {
                walkable.push(rectangle.bounds());
                continue;
            }

            let name = rectangle
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty());
            let Some(name) = name else {
                warn!(
                    class_id = rectangle.class_id,
                    x = rectangle.x,
                    y = rectangle.y,
                    "poi_without_name_excluded"
                );
                excluded_count += 1;
                continue;
            };
            if !seen_names.insert(name.to_string()) {
                warn!(name, class_id = rectangle.class_id, "duplicate_poi_name_excluded");
                excluded_count += 1;
                continue;
            }

            pois.push(Poi {
                id: PoiId(pois.len()),
                name: name.to_string(),
                class_id: rectangle.class_id,
                bounds: rectangle.bounds(),
            });
        }

        Self {
            walkable,
            pois,
            excluded_count,
        }
    }

    pub fn is_walkable(&self, point: Vec2) -> bool {
        self.walkable.iter().any(|area| area.contains(point))
    }

    /// Overlapping POI with the smallest class id; equal class ids resolve to
    /// the one authored first.
    pub fn find_poi(&self, player_bounds: &Rect) -> Option<&Poi> {
        self.pois
            .iter()
            .filter(|poi| poi.bounds.intersects(player_bounds))
            .min_by_key(|poi| (poi.class_id, poi.id.0))
    }

    pub fn poi(&self, id: PoiId) -> Option<&Poi> {
        self.pois.get(id.0)
    }

    pub fn poi_by_name(&self, name: &str) -> Option<&Poi> {
        self.pois.iter().find(|poi| poi.name == name)
    }

    pub fn walkable_areas(&self) -> &[Rect] {
        &self.walkable
    }

    pub fn pois(&self) -> &[Poi] {
        &self.pois
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::StaticGeometrySource;

    fn sample_index() -> MapGeometryIndex {
        MapGeometryIndex::from_rectangles(vec![
            Rectangle::walkable(0.0, 0.0, 100.0, 100.0),
            Rectangle::walkable(100.0, 40.0, 50.0, 20.0),
            Rectangle::poi("Brausecus", 1, 10.0, 10.0, 20.0, 20.0),
            Rectangle::poi("Polytron4000", 0, 20.0, 20.0, 20.0, 20.0),
            Rectangle::poi("Resonant", 2, 70.0, 70.0, 10.0, 10.0),
        ])
    }

    #[test]
    fn walkability_is_union_of_walkable_rectangles() {
        let index = sample_index();
        assert!(index.is_walkable(Vec2::new(50.0, 50.0)));
        assert!(index.is_walkable(Vec2::new(120.0, 50.0)));
        assert!(!index.is_walkable(Vec2::new(120.0, 10.0)));
        assert!(!index.is_walkable(Vec2::new(-1.0, 50.0)));
    }

    #[test]
    fn walkable_far_edge_is_exclusive() {
        let index = sample_index();
        assert!(index.is_walkable(Vec2::new(0.0, 0.0)));
        assert!(!index.is_walkable(Vec2::new(150.0, 50.0)));
    }

    #[test]
    fn overlapping_pois_resolve_to_smallest_class_id() {
        let index = sample_index();
        let bounds = Rect::centered(Vec2::new(25.0, 25.0), 8.0);
        let poi = index.find_poi(&bounds).expect("poi");
        assert_eq!(poi.name, "Polytron4000");
    }

    #[test]
    fn equal_class_ids_resolve_to_first_authored() {
        let index = MapGeometryIndex::from_rectangles(vec![
            Rectangle::walkable(0.0, 0.0, 100.0, 100.0),
            Rectangle::poi("Nest", 8, 0.0, 0.0, 50.0, 50.0),
            Rectangle::poi("Orgia", 8, 0.0, 0.0, 50.0, 50.0),
        ]);
        let poi = index
            .find_poi(&Rect::centered(Vec2::new(10.0, 10.0), 8.0))
            .expect("poi");
        assert_eq!(poi.name, "Nest");
    }

    #[test]
    fn no_poi_when_bounds_only_touch() {
        let index = sample_index();
        let bounds = Rect {
            x: 80.0,
            y: 70.0,
            width: 5.0,
            height: 5.0,
        };
        assert!(index.find_poi(&bounds).is_none());
    }

    #[test]
    fn unnamed_and_duplicate_pois_are_excluded() {
        let index = MapGeometryIndex::from_rectangles(vec![
            Rectangle::walkable(0.0, 0.0, 100.0, 100.0),
            Rectangle {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                class_id: 3,
                name: None,
            },
            Rectangle::poi("  ", 4, 0.0, 0.0, 10.0, 10.0),
            Rectangle::poi("Vacanza", 3, 20.0, 20.0, 10.0, 10.0),
            Rectangle::poi("Vacanza", 5, 40.0, 40.0, 10.0, 10.0),
        ]);
        assert_eq!(index.pois().len(), 1);
        assert_eq!(index.excluded_count(), 3);
        assert_eq!(index.poi_by_name("Vacanza").expect("poi").class_id, 3);
    }

    #[test]
    fn load_rejects_map_without_walkable_area() {
        let source = StaticGeometrySource::new(vec![Rectangle::poi(
            "Polytron4000",
            0,
            0.0,
            0.0,
            10.0,
            10.0,
        )]);
        let err = MapGeometryIndex::load(&source).expect_err("no walkable area");
        assert!(matches!(err, MapLoadError::NoWalkableArea));
    }

    #[test]
    fn poi_ids_index_into_poi_list() {
        let index = sample_index();
        for poi in index.pois() {
            assert_eq!(index.poi(poi.id), Some(poi));
        }
    }
}
