use crate::sim::{
    flag_set, Choice, DialogueGraph, DialogueNode, FlagSet, HAS_COFFEE, HAS_HYPERRAUMANTRIEB,
    HAS_PAPER, HAS_WON,
};

fn choice(label: &str, requires: FlagSet, grants: FlagSet) -> Choice {
    Choice {
        label: label.to_string(),
        requires,
        grants,
    }
}

fn leave(label: &str) -> Choice {
    choice(label, FlagSet::new(), FlagSet::new())
}

/// Dialogue used when no dialogue file is shipped. Covers the three POIs of
/// the built-in quest chain.
pub fn builtin_dialogue() -> DialogueGraph {
    DialogueGraph::new([
        DialogueNode {
            id: "Resonant".to_string(),
            text: "A stack of flyers flutters next to the speakers.".to_string(),
            choices: vec![
                choice("Take a sheet of paper", FlagSet::new(), flag_set([HAS_PAPER])),
                leave("Keep dancing"),
            ],
        },
        DialogueNode {
            id: "Brausecus".to_string(),
            text: "Coffee is paid in paper here.".to_string(),
            choices: vec![
                choice("Trade paper for coffee", flag_set([HAS_PAPER]), flag_set([HAS_COFFEE])),
                leave("Just looking"),
            ],
        },
        DialogueNode {
            id: "Polytron4000".to_string(),
            text: "The mighty Polytron 4000 awaits activation!".to_string(),
            choices: vec![
                choice(
                    "Activate",
                    flag_set([HAS_PAPER, HAS_COFFEE]),
                    flag_set([HAS_HYPERRAUMANTRIEB, HAS_WON]),
                ),
                leave("Not ready"),
            ],
        },
    ])
}
