//! Curveshot: players place targets on a shared plane, then plot curves;
//! every sampled point that lands within the hit radius of a target
//! destroys it and scores for the shooter (and the target's owner).

use parlor::prelude::*;
use serde::{Deserialize, Serialize};

/// A sampled point counts as a hit within this distance of a target.
const HIT_RADIUS: f64 = 0.5;

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub x: f64,
    pub y: f64,
    /// Who placed it. A player's targets vanish with their session.
    pub of_player: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CurveBoard {
    pub targets: Vec<Target>,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// `{"type":"action","op":"placeTarget","target":{...}}` or
/// `{"type":"action","op":"volley","points":[...]}`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum CurveAction {
    PlaceTarget { target: PointF },
    Volley { points: Vec<PointF> },
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct CurveshotRules;

impl Ruleset for CurveshotRules {
    type Board = CurveBoard;
    type Action = CurveAction;

    fn pacing(&self) -> Pacing {
        Pacing::Continuous
    }

    fn fresh_board(&self) -> CurveBoard {
        CurveBoard::default()
    }

    fn assign_roles(&self, board: &mut CurveBoard, roster: &mut Roster) -> RoleAssignment {
        // Orphaned targets leave with their owner.
        board
            .targets
            .retain(|t| roster.iter().any(|e| e.id.as_str() == t.of_player));

        RoleAssignment {
            turn: None,
            active: !roster.is_empty(),
        }
    }

    fn validate_action(
        &self,
        _board: &CurveBoard,
        _actor: Actor<'_>,
        action: &CurveAction,
    ) -> Result<(), String> {
        match action {
            CurveAction::PlaceTarget { target } => {
                if !target.x.is_finite() || !target.y.is_finite() {
                    return Err("target coordinates must be finite".into());
                }
            }
            CurveAction::Volley { points } => {
                if points.is_empty() {
                    return Err("volley needs at least one point".into());
                }
                if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                    return Err("volley points must be finite".into());
                }
            }
        }
        Ok(())
    }

    fn apply(
        &self,
        board: &mut CurveBoard,
        actor: Actor<'_>,
        action: CurveAction,
        roster: &mut Roster,
    ) {
        match action {
            CurveAction::PlaceTarget { target } => {
                board.targets.push(Target {
                    x: target.x,
                    y: target.y,
                    of_player: actor.id.0.clone(),
                });
            }
            CurveAction::Volley { points } => {
                let shooter = actor.id.clone();
                resolve_volley(board, &points, |owner| {
                    // One point for the shooter per destroyed target, and
                    // one for the target's owner when that's someone else.
                    roster.add_score(&shooter, 1);
                    if owner != shooter.as_str() {
                        roster.add_score(&PlayerId::from(owner), 1);
                    }
                });
            }
        }
    }

    fn winner(&self, _board: &CurveBoard) -> Option<String> {
        None
    }
}

/// Removes every target within [`HIT_RADIUS`] of any sampled point,
/// reporting each hit's owner through `on_hit`.
fn resolve_volley(board: &mut CurveBoard, points: &[PointF], mut on_hit: impl FnMut(&str)) {
    board.targets.retain(|target| {
        let hit = points
            .iter()
            .any(|p| (p.x - target.x).hypot(p.y - target.y) < HIT_RADIUS);
        if hit {
            on_hit(&target.of_player);
        }
        !hit
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let server = ParlorServerBuilder::new()
        .bind("0.0.0.0:8082")
        .build(CurveshotRules)
        .await?;
    server.run().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
