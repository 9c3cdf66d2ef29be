use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::sim::{Choice, DialogueGraph, DialogueNode, FlagSet, MAX_CHOICES};

use super::{builtin_dialogue, json_error, read_optional, ContentError, ContentOrigin};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeFile {
    text: String,
    #[serde(default)]
    choices: Vec<ChoiceFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChoiceFile {
    label: String,
    #[serde(default)]
    requires: FlagSet,
    #[serde(default)]
    grants: FlagSet,
}

/// Loads `path`, or the built-in dialogue when the file does not exist.
pub fn load_dialogue_graph(path: &Path) -> Result<(DialogueGraph, ContentOrigin), ContentError> {
    match read_optional(path)? {
        Some(raw) => Ok((parse_dialogue_graph(path, &raw)?, ContentOrigin::File)),
        None => {
            info!(path = %path.display(), "dialogue_file_missing_using_builtin");
            Ok((builtin_dialogue(), ContentOrigin::Builtin))
        }
    }
}

/// The document is an object keyed by POI name.
pub fn parse_dialogue_graph(path: &Path, raw: &str) -> Result<DialogueGraph, ContentError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let nodes: BTreeMap<String, NodeFile> = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|error| json_error(path, error))?;

    let mut graph_nodes = Vec::with_capacity(nodes.len());
    for (id, node) in nodes {
        if node.choices.len() > MAX_CHOICES {
            return Err(ContentError::TooManyChoices {
                path: path.to_path_buf(),
                node: id,
                count: node.choices.len(),
            });
        }
        graph_nodes.push(DialogueNode {
            id,
            text: node.text,
            choices: node
                .choices
                .into_iter()
                .map(|choice| Choice {
                    label: choice.label,
                    requires: choice.requires,
                    grants: choice.grants,
                })
                .collect(),
        });
    }
    Ok(DialogueGraph::new(graph_nodes))
}
