pub mod keymap;
pub mod selection;
pub mod sequence;
pub mod state;

pub use keymap::{dispatch, parse_key, Command, Key, Modifiers};
pub use selection::{Selection, SelectionChange, UnselectToken, UNSELECT_DELAY};
pub use sequence::IndexedSequence;
pub use state::{NavPosition, NavigationState, Phase, Step};
