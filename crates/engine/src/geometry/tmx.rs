use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::warn;

use super::{GeometrySource, MapLoadError, Rectangle};

/// Reads object rectangles from a Tiled `.tmx` file.
#[derive(Debug, Clone)]
pub struct TmxMapSource {
    path: PathBuf,
}

impl TmxMapSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GeometrySource for TmxMapSource {
    fn load_rectangles(&self) -> Result<Vec<Rectangle>, MapLoadError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| MapLoadError::Read {
            path: self.path.clone(),
            source,
        })?;
        parse_tmx_rectangles(&self.path, &raw)
    }
}

/// Every `<object>` of every `<objectgroup>` becomes a rectangle. Objects with
/// unparsable numeric attributes are skipped with a warning.
pub fn parse_tmx_rectangles(path: &Path, raw: &str) -> Result<Vec<Rectangle>, MapLoadError> {
    let doc = Document::parse(raw).map_err(|error| MapLoadError::Xml {
        path: path.to_path_buf(),
        line: error.pos().row,
        column: error.pos().col,
        message: error.to_string(),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(MapLoadError::InvalidRoot {
            path: path.to_path_buf(),
            found: root.tag_name().name().to_string(),
        });
    }

    let mut rectangles = Vec::new();
    for group in root
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "objectgroup")
    {
        for object in group
            .children()
            .filter(|node| node.is_element() && node.tag_name().name() == "object")
        {
            match parse_object(object) {
                Ok(rectangle) => rectangles.push(rectangle),
                Err(message) => {
                    let pos = doc.text_pos_at(object.range().start);
                    warn!(
                        file = %path.display(),
                        line = pos.row,
                        column = pos.col,
                        reason = message.as_str(),
                        "map_object_skipped"
                    );
                }
            }
        }
    }

    Ok(rectangles)
}

fn parse_object(node: Node<'_, '_>) -> Result<Rectangle, String> {
    // Tiled 1.9 renamed `type` to `class`; accept either.
    let class_id = match node.attribute("type").or_else(|| node.attribute("class")) {
        Some(raw) => raw
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("class id '{raw}' is not an integer"))?,
        None => 0,
    };
    let name = node
        .attribute("name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string);

    Ok(Rectangle {
        x: number_attribute(node, "x")?,
        y: number_attribute(node, "y")?,
        width: number_attribute(node, "width")?,
        height: number_attribute(node, "height")?,
        class_id,
        name,
    })
}

fn number_attribute(node: Node<'_, '_>, attribute: &str) -> Result<f32, String> {
    let Some(raw) = node.attribute(attribute) else {
        return Ok(0.0);
    };
    let value = raw
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("{attribute} '{raw}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("{attribute} must be finite"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::geometry::{MapGeometryIndex, WALKABLE_CLASS_ID};

    const SAMPLE_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="32" height="24">
 <objectgroup id="2" name="areas">
  <object id="1" type="99" x="0" y="0" width="400" height="300"/>
  <object id="2" name="Polytron4000" type="0" x="45" y="91" width="85" height="70"/>
  <object id="3" name="Brausecus" class="1" x="200" y="50" width="40" height="40"/>
 </objectgroup>
 <objectgroup id="3" name="late">
  <object id="4" type="5" x="10" y="10" width="5" height="5"/>
  <object id="5" name="Broken" type="abc" x="10" y="10" width="5" height="5"/>
 </objectgroup>
</map>"#;

    #[test]
    fn parses_objects_from_every_group() {
        let rectangles = parse_tmx_rectangles(Path::new("map.tmx"), SAMPLE_MAP).expect("parse");
        assert_eq!(rectangles.len(), 4);
        assert_eq!(rectangles[0].class_id, WALKABLE_CLASS_ID);
        assert_eq!(rectangles[1].name.as_deref(), Some("Polytron4000"));
        assert!((rectangles[1].width - 85.0).abs() < f32::EPSILON);
        assert_eq!(rectangles[2].class_id, 1);
        assert_eq!(rectangles[3].name, None);
    }

    #[test]
    fn unnamed_poi_from_file_is_excluded_by_index() {
        let rectangles = parse_tmx_rectangles(Path::new("map.tmx"), SAMPLE_MAP).expect("parse");
        let index = MapGeometryIndex::from_rectangles(rectangles);
        assert_eq!(index.pois().len(), 2);
        assert_eq!(index.excluded_count(), 1);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse_tmx_rectangles(Path::new("map.tmx"), "<map><objectgroup></map>")
            .expect_err("malformed");
        match err {
            MapLoadError::Xml { line, column, .. } => {
                assert!(line >= 1);
                assert!(column >= 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = parse_tmx_rectangles(Path::new("map.tmx"), "<tileset/>").expect_err("root");
        assert!(matches!(err, MapLoadError::InvalidRoot { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let temp = TempDir::new().expect("temp");
        let source = TmxMapSource::new(temp.path().join("missing.tmx"));
        let err = source.load_rectangles().expect_err("missing");
        assert!(matches!(err, MapLoadError::Read { .. }));
    }

    #[test]
    fn loads_index_from_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("map.tmx");
        fs::write(&path, SAMPLE_MAP).expect("write");
        let index = MapGeometryIndex::load(&TmxMapSource::new(&path)).expect("load");
        assert_eq!(index.walkable_areas().len(), 1);
        assert!(index.poi_by_name("Brausecus").is_some());
    }
}
