use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::sim::{FlagSet, QuestChain, QuestStep};

use super::{json_error, read_optional, ContentError, ContentOrigin};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepFile {
    poi: String,
    #[serde(default)]
    requires: FlagSet,
    #[serde(default)]
    grants: FlagSet,
}

/// Loads `path`, or the built-in chain when the file does not exist.
pub fn load_quest_chain(path: &Path) -> Result<(QuestChain, ContentOrigin), ContentError> {
    match read_optional(path)? {
        Some(raw) => Ok((parse_quest_chain(path, &raw)?, ContentOrigin::File)),
        None => {
            info!(path = %path.display(), "quest_file_missing_using_builtin");
            Ok((QuestChain::builtin(), ContentOrigin::Builtin))
        }
    }
}

/// The document is an array of steps in chain order.
pub fn parse_quest_chain(path: &Path, raw: &str) -> Result<QuestChain, ContentError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let steps: Vec<StepFile> = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|error| json_error(path, error))?;

    let steps = steps
        .into_iter()
        .map(|step| QuestStep {
            poi: step.poi,
            requires: step.requires,
            grants: step.grants,
        })
        .collect();
    QuestChain::new(steps).map_err(|source| ContentError::Chain {
        path: path.to_path_buf(),
        source,
    })
}
