//! Named timer ids (spec.md §5). A live question has at most one primary
//! timer plus, for a couple of question types, one secondary timer running
//! alongside it; giving each a fixed id keeps `Clock::arm`/`cancel` calls
//! self-explanatory at the call site instead of sprinkling magic numbers
//! through every handler.

use engine_core::clock::TimerId;

pub const START_GAME: TimerId = 0;
pub const PREVIEW: TimerId = 1;
pub const PRIMARY: TimerId = 2;
pub const WORD_CHAIN_BOMB: TimerId = 3;
pub const BLIND_MAP_PHASE: TimerId = 4;
pub const ADVANCE_DELAY: TimerId = 5;
