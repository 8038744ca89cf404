//! Error types for the physics layer.

/// Errors that can occur while driving a physics world.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    /// No free spot was found for a new body within the attempt budget.
    #[error("unable to place body after {attempts} attempts")]
    PlacementFailed { attempts: u32 },
}
