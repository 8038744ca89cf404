//! Collision-free entity names.

use std::collections::HashSet;

/// The ball's fixed name.
pub const BALL_NAME: &str = "Ball-1";

/// Names starting with this prefix belong to the ball.
pub const BALL_PREFIX: &str = "Ball-";

/// Stand-in for proposed names that try to look like the ball.
pub const BALL_PLACEHOLDER: &str = "NotABall";

/// Picks a name for a new player.
///
/// A name carrying [`BALL_PREFIX`] is replaced by [`BALL_PLACEHOLDER`]
/// first. A free name is used as is; a taken one gets the first free
/// numeric suffix starting at 2 (`Bob`, `Bob2`, `Bob3`, ...).
pub fn resolve<'a, I>(proposed: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let base = if proposed.starts_with(BALL_PREFIX) {
        BALL_PLACEHOLDER
    } else {
        proposed
    };

    let taken: HashSet<&str> = existing.into_iter().collect();
    if !taken.contains(base) {
        return base.to_string();
    }

    (2u64..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}
