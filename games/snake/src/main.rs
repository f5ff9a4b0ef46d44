//! Multiplayer snake: continuous motion on a 30×30 grid, driven by the
//! 100ms simulation tick. Hitting a wall or another snake respawns you in
//! place; eating food grows you and scores a point.

use std::collections::HashMap;
use std::time::Duration;

use parlor::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

const GRID_CELLS: i32 = 30;
const INIT_SIZE: i32 = 3;
const FOOD_COUNT: usize = 5;
const TICK_PERIOD: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    /// Head first.
    pub body: Vec<Point>,
    pub direction: Point,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnakeBoard {
    /// Per-player snakes, keyed by player id.
    pub entities: HashMap<String, Entity>,
    pub foods: Vec<Point>,
}

fn random_food() -> Point {
    let mut rng = rand::rng();
    Point {
        x: rng.random_range(0..GRID_CELLS),
        y: rng.random_range(0..GRID_CELLS),
    }
}

/// A fresh snake: three segments heading right, spawned clear of the left
/// wall so it can't die on its opening move.
fn spawn_entity() -> Entity {
    let mut rng = rand::rng();
    let start_x = rng.random_range(INIT_SIZE..GRID_CELLS - INIT_SIZE);
    let start_y = rng.random_range(0..GRID_CELLS);
    let body = (0..INIT_SIZE)
        .map(|i| Point {
            x: start_x + INIT_SIZE - 1 - i,
            y: start_y,
        })
        .collect();
    Entity {
        body,
        direction: Point { x: 1, y: 0 },
    }
}

fn in_bounds(p: Point) -> bool {
    (0..GRID_CELLS).contains(&p.x) && (0..GRID_CELLS).contains(&p.y)
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// `{"type":"action","direction":{"x":0,"y":-1}}`
#[derive(Debug, Clone, Deserialize)]
pub struct Steer {
    pub direction: Point,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SnakeRules;

impl Ruleset for SnakeRules {
    type Board = SnakeBoard;
    type Action = Steer;

    fn pacing(&self) -> Pacing {
        Pacing::Continuous
    }

    fn tick_period(&self) -> Option<Duration> {
        Some(TICK_PERIOD)
    }

    fn fresh_board(&self) -> SnakeBoard {
        SnakeBoard {
            entities: HashMap::new(),
            foods: (0..FOOD_COUNT).map(|_| random_food()).collect(),
        }
    }

    /// Keeps the entity map in step with the roster: joiners get a snake,
    /// leavers take theirs with them.
    fn assign_roles(&self, board: &mut SnakeBoard, roster: &mut Roster) -> RoleAssignment {
        for entry in roster.iter() {
            board
                .entities
                .entry(entry.id.0.clone())
                .or_insert_with(spawn_entity);
        }
        let connected: Vec<String> = roster.iter().map(|e| e.id.0.clone()).collect();
        board.entities.retain(|id, _| connected.contains(id));

        RoleAssignment {
            turn: None,
            active: !roster.is_empty(),
        }
    }

    fn validate_action(
        &self,
        board: &SnakeBoard,
        actor: Actor<'_>,
        action: &Steer,
    ) -> Result<(), String> {
        let dir = action.direction;
        if dir.x.abs() + dir.y.abs() != 1 {
            return Err(format!("({}, {}) is not a unit direction", dir.x, dir.y));
        }
        let entity = board
            .entities
            .get(actor.id.as_str())
            .ok_or_else(|| "no snake for this player".to_string())?;
        // No 180-degree turns.
        if entity.direction.x == -dir.x && entity.direction.y == -dir.y {
            return Err("cannot reverse into yourself".into());
        }
        Ok(())
    }

    fn apply(
        &self,
        board: &mut SnakeBoard,
        actor: Actor<'_>,
        action: Steer,
        _roster: &mut Roster,
    ) {
        if let Some(entity) = board.entities.get_mut(actor.id.as_str()) {
            entity.direction = action.direction;
        }
    }

    fn winner(&self, _board: &SnakeBoard) -> Option<String> {
        None
    }

    /// One simulation step. All candidate moves are computed against the
    /// pre-tick bodies, so the outcome never depends on which snake
    /// happens to be processed first within the batch.
    fn tick(&self, board: &mut SnakeBoard, roster: &mut Roster) {
        // Pre-tick view, in roster (join) order.
        let pre: Vec<(PlayerId, Vec<Point>, Point)> = roster
            .iter()
            .filter_map(|entry| {
                board
                    .entities
                    .get(entry.id.as_str())
                    .map(|e| (entry.id.clone(), e.body.clone(), e.direction))
            })
            .collect();

        let mut crashed: Vec<PlayerId> = Vec::new();
        let mut moved: Vec<(PlayerId, Point, Vec<Point>)> = Vec::new();

        for (id, body, direction) in &pre {
            let head = Point {
                x: body[0].x + direction.x,
                y: body[0].y + direction.y,
            };

            if !in_bounds(head) {
                crashed.push(id.clone());
                continue;
            }
            let hit_other = pre
                .iter()
                .filter(|(other, _, _)| other != id)
                .any(|(_, other_body, _)| other_body.contains(&head));
            if hit_other {
                crashed.push(id.clone());
                continue;
            }
            moved.push((id.clone(), head, body.clone()));
        }

        // Apply movement and food. Food is claimed in join order; the
        // replacement spawns immediately so the board always carries
        // FOOD_COUNT items.
        for (id, head, old_body) in moved {
            let ate = match board.foods.iter().position(|f| *f == head) {
                Some(i) => {
                    board.foods.swap_remove(i);
                    board.foods.push(random_food());
                    roster.add_score(&id, 1);
                    true
                }
                None => false,
            };

            let mut body = Vec::with_capacity(old_body.len() + 1);
            body.push(head);
            if ate {
                body.extend(old_body);
            } else {
                body.extend(old_body[..old_body.len() - 1].iter().copied());
            }
            if let Some(entity) = board.entities.get_mut(id.as_str()) {
                entity.body = body;
            }
        }

        // Fatal collisions respawn the snake in place: same identifier,
        // same connection, fresh body and score.
        for id in crashed {
            board.entities.insert(id.0.clone(), spawn_entity());
            if let Some(entry) = roster.get_mut(&id) {
                entry.score = 0;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let server = ParlorServerBuilder::new()
        .bind("0.0.0.0:8081")
        .build(SnakeRules)
        .await?;
    server.run().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
