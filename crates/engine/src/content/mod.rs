mod builtin;
mod dialogue;
mod quests;

pub use builtin::builtin_dialogue;
pub use dialogue::{load_dialogue_graph, parse_dialogue_graph};
pub use quests::{load_quest_chain, parse_quest_chain};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::geometry::MapGeometryIndex;
use crate::sim::{DialogueGraph, QuestChain, QuestChainError, MAX_CHOICES};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read content file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed JSON in {path} at {json_path}: {message}")]
    Json {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error(
        "dialogue node '{node}' in {path} has {count} choices; at most {} are allowed",
        MAX_CHOICES
    )]
    TooManyChoices {
        path: PathBuf,
        node: String,
        count: usize,
    },
    #[error("invalid quest chain in {path}: {source}")]
    Chain {
        path: PathBuf,
        #[source]
        source: QuestChainError,
    },
}

/// Where a piece of content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOrigin {
    File,
    Builtin,
}

impl ContentOrigin {
    pub fn label(self) -> &'static str {
        match self {
            ContentOrigin::File => "file",
            ContentOrigin::Builtin => "builtin",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentBundle {
    pub dialogue: DialogueGraph,
    pub dialogue_origin: ContentOrigin,
    pub quests: QuestChain,
    pub quests_origin: ContentOrigin,
}

/// Loads dialogue and quest content and cross-checks it against the map.
/// Inconsistencies are logged; only unreadable or invalid files fail.
pub fn load_content(
    dialogue_path: &Path,
    quests_path: &Path,
    map: &MapGeometryIndex,
) -> Result<ContentBundle, ContentError> {
    let (dialogue, dialogue_origin) = load_dialogue_graph(dialogue_path)?;
    let (quests, quests_origin) = load_quest_chain(quests_path)?;
    let bundle = ContentBundle {
        dialogue,
        dialogue_origin,
        quests,
        quests_origin,
    };

    let warnings = report_inconsistencies(&bundle, map);
    info!(
        dialogue_nodes = bundle.dialogue.len(),
        dialogue_origin = bundle.dialogue_origin.label(),
        quest_steps = bundle.quests.steps().len(),
        quests_origin = bundle.quests_origin.label(),
        warnings,
        "content_loaded"
    );
    Ok(bundle)
}

/// Reads a content file, treating a missing file as `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, ContentError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ContentError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub(crate) fn json_error(path: &Path, error: serde_path_to_error::Error<serde_json::Error>) -> ContentError {
    let json_path = error.path().to_string();
    ContentError::Json {
        path: path.to_path_buf(),
        json_path,
        message: error.into_inner().to_string(),
    }
}

fn report_inconsistencies(bundle: &ContentBundle, map: &MapGeometryIndex) -> usize {
    let mut warnings = 0usize;

    for node in bundle.dialogue.nodes() {
        if map.poi_by_name(&node.id).is_none() {
            warn!(node = node.id.as_str(), "dialogue_node_without_poi");
            warnings += 1;
        }
    }

    for step in bundle.quests.steps() {
        if map.poi_by_name(&step.poi).is_none() {
            warn!(poi = step.poi.as_str(), "quest_step_poi_missing");
            warnings += 1;
        }
        let reachable = bundle.dialogue.node(&step.poi).is_some_and(|node| {
            node.choices
                .iter()
                .any(|choice| choice.grants.is_superset(&step.grants))
        });
        if !reachable {
            warn!(
                poi = step.poi.as_str(),
                grants = ?step.grants,
                "quest_step_has_no_granting_choice"
            );
            warnings += 1;
        }
    }

    warnings
}
