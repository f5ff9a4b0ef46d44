//! Gomoku: five in a row on a 15×15 board, two players, turn-based.

use parlor::prelude::*;
use serde::{Deserialize, Serialize};

const BOARD_SIZE: i32 = 15;
const WIN_CONDITION: i32 = 5;

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GomokuBoard {
    /// `board[y][x]`: "" for empty, otherwise the mark ("X" or "O").
    board: Vec<Vec<String>>,
    /// Last placed stone; terminal detection scans outward from here.
    #[serde(skip)]
    last_move: Option<(i32, i32, String)>,
}

impl GomokuBoard {
    fn empty() -> Self {
        Self {
            board: vec![vec![String::new(); BOARD_SIZE as usize]; BOARD_SIZE as usize],
            last_move: None,
        }
    }

    fn cell(&self, x: i32, y: i32) -> &str {
        &self.board[y as usize][x as usize]
    }

    fn in_bounds(x: i32, y: i32) -> bool {
        (0..BOARD_SIZE).contains(&x) && (0..BOARD_SIZE).contains(&y)
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Deserialize)]
struct Move {
    x: i32,
    y: i32,
}

/// `{"type":"action","move":{"x":7,"y":7}}`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceMove {
    #[serde(rename = "move")]
    mv: Move,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct GomokuRules {
    /// When true, losing the second seated player also wipes the stones,
    /// so the next pairing starts clean. When false, stones survive a
    /// roster collapse until an explicit reset.
    pub clear_on_new_match: bool,
}

impl Ruleset for GomokuRules {
    type Board = GomokuBoard;
    type Action = PlaceMove;

    fn pacing(&self) -> Pacing {
        Pacing::TurnBased
    }

    fn fresh_board(&self) -> GomokuBoard {
        GomokuBoard::empty()
    }

    fn assign_roles(&self, _board: &mut GomokuBoard, roster: &mut Roster) -> RoleAssignment {
        // First two players in join order are seated as X and O; anyone
        // else spectates until a seat frees up.
        let marks = ["X", "O"];
        let mut first = None;
        for (i, entry) in roster.iter_mut().enumerate() {
            entry.mark = marks.get(i).copied().unwrap_or("").to_string();
            if i == 0 {
                first = Some(entry.id.clone());
            }
        }

        let active = roster.mark_holders() >= 2;
        RoleAssignment {
            // X opens.
            turn: first.filter(|_| active),
            active,
        }
    }

    fn board_reset_on_new_match(&self) -> bool {
        self.clear_on_new_match
    }

    fn validate_action(
        &self,
        board: &GomokuBoard,
        _actor: Actor<'_>,
        action: &PlaceMove,
    ) -> Result<(), String> {
        let Move { x, y } = action.mv;
        if !GomokuBoard::in_bounds(x, y) {
            return Err(format!("({x}, {y}) is out of bounds"));
        }
        if !board.cell(x, y).is_empty() {
            return Err(format!("({x}, {y}) is already taken"));
        }
        Ok(())
    }

    fn apply(
        &self,
        board: &mut GomokuBoard,
        actor: Actor<'_>,
        action: PlaceMove,
        _roster: &mut Roster,
    ) {
        let Move { x, y } = action.mv;
        board.board[y as usize][x as usize] = actor.mark.to_string();
        board.last_move = Some((x, y, actor.mark.to_string()));
    }

    fn winner(&self, board: &GomokuBoard) -> Option<String> {
        let (x, y, mark) = board.last_move.as_ref()?;
        winning_run(board, *x, *y, mark).then(|| mark.clone())
    }
}

/// Checks whether the stone at (x, y) completes a run of `WIN_CONDITION`
/// along any of the four axis directions, counting both ways out from the
/// stone.
fn winning_run(board: &GomokuBoard, x: i32, y: i32, mark: &str) -> bool {
    const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

    DIRECTIONS.iter().any(|&(dx, dy)| {
        let mut count = 1;
        for sign in [1, -1] {
            for i in 1..WIN_CONDITION {
                let nx = x + dx * i * sign;
                let ny = y + dy * i * sign;
                if !GomokuBoard::in_bounds(nx, ny) || board.cell(nx, ny) != mark {
                    break;
                }
                count += 1;
            }
        }
        count >= WIN_CONDITION
    })
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
        .bind("0.0.0.0:8080")
        .build(GomokuRules::default())
        .await?;
    server.run().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message;

    // -- Unit: win detection ---------------------------------------------

    fn board_with_run(x0: i32, y0: i32, dx: i32, dy: i32, len: i32) -> GomokuBoard {
        let mut board = GomokuBoard::empty();
        for i in 0..len {
            let (x, y) = (x0 + dx * i, y0 + dy * i);
            board.board[y as usize][x as usize] = "X".into();
        }
        // Pretend the run's far end was the last stone placed.
        let last = len - 1;
        board.last_move = Some((x0 + dx * last, y0 + dy * last, "X".into()));
        board
    }

    #[test]
    fn test_five_in_a_row_wins_in_all_four_directions() {
        for (dx, dy, label) in [
            (1, 0, "horizontal"),
            (0, 1, "vertical"),
            (1, 1, "diagonal"),
            (1, -1, "anti-diagonal"),
        ] {
            let y0 = if dy < 0 { 10 } else { 3 };
            let board = board_with_run(3, y0, dx, dy, WIN_CONDITION);
            assert_eq!(
                GomokuRules::default().winner(&board),
                Some("X".to_string()),
                "{label}"
            );
        }
    }

    #[test]
    fn test_four_in_a_row_is_not_terminal() {
        for (dx, dy) in [(1, 0), (0, 1), (1, 1), (1, -1)] {
            let y0 = if dy < 0 { 10 } else { 3 };
            let board = board_with_run(3, y0, dx, dy, WIN_CONDITION - 1);
            assert_eq!(GomokuRules::default().winner(&board), None);
        }
    }

    #[test]
    fn test_run_detected_from_a_middle_stone() {
        // The winning stone need not be at either end of the run.
        let mut board = board_with_run(3, 3, 1, 0, WIN_CONDITION);
        board.last_move = Some((5, 3, "X".into()));
        assert_eq!(GomokuRules::default().winner(&board), Some("X".into()));
    }

    #[test]
    fn test_run_broken_by_opponent_stone_is_not_terminal() {
        let mut board = board_with_run(3, 3, 1, 0, WIN_CONDITION);
        board.board[3][5] = "O".into();
        board.last_move = Some((6, 3, "X".into()));
        assert_eq!(GomokuRules::default().winner(&board), None);
    }

    #[test]
    fn test_empty_board_has_no_winner() {
        assert_eq!(GomokuRules::default().winner(&GomokuBoard::empty()), None);
    }

    // -- Unit: validation -------------------------------------------------

    fn actor<'a>(id: &'a PlayerId, mark: &'a str) -> Actor<'a> {
        Actor { id, mark }
    }

    #[test]
    fn test_validate_rejects_out_of_bounds() {
        let rules = GomokuRules::default();
        let board = GomokuBoard::empty();
        let id = PlayerId::from("p1");
        for (x, y) in [(-1, 0), (0, -1), (15, 0), (0, 15)] {
            let action = PlaceMove { mv: Move { x, y } };
            assert!(
                rules.validate_action(&board, actor(&id, "X"), &action).is_err(),
                "({x}, {y}) should be out of bounds"
            );
        }
    }

    #[test]
    fn test_validate_rejects_occupied_cell() {
        let rules = GomokuRules::default();
        let mut board = GomokuBoard::empty();
        let id = PlayerId::from("p1");
        let mut roster = roster_of(&["p1"]);
        rules.apply(
            &mut board,
            actor(&id, "X"),
            PlaceMove { mv: Move { x: 7, y: 7 } },
            &mut roster,
        );

        let again = PlaceMove { mv: Move { x: 7, y: 7 } };
        let result = rules.validate_action(&board, actor(&id, "O"), &again);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("taken"));
    }

    // -- Unit: roles -------------------------------------------------------

    fn roster_of(ids: &[&str]) -> Roster {
        Roster::new(
            ids.iter()
                .map(|id| PlayerEntry {
                    id: PlayerId::from(*id),
                    name: id.to_string(),
                    mark: String::new(),
                    score: 0,
                })
                .collect(),
        )
    }

    #[test]
    fn test_first_two_players_are_seated_rest_spectate() {
        let rules = GomokuRules::default();
        let mut board = GomokuBoard::empty();
        let mut roster = roster_of(&["a", "b", "c"]);

        let assignment = rules.assign_roles(&mut board, &mut roster);

        let marks: Vec<&str> = roster.iter().map(|e| e.mark.as_str()).collect();
        assert_eq!(marks, vec!["X", "O", ""]);
        assert_eq!(assignment.turn, Some(PlayerId::from("a")));
        assert!(assignment.active);
    }

    #[test]
    fn test_single_player_gets_x_but_no_game() {
        let rules = GomokuRules::default();
        let mut board = GomokuBoard::empty();
        let mut roster = roster_of(&["a"]);

        let assignment = rules.assign_roles(&mut board, &mut roster);

        assert_eq!(roster.iter().next().unwrap().mark, "X");
        assert_eq!(assignment.turn, None);
        assert!(!assignment.active);
    }

    #[test]
    fn test_role_reassignment_never_touches_stones_itself() {
        // Board wiping on roster collapse is the engine's job, driven by
        // the config hook below; assign_roles leaves stones alone.
        let rules = GomokuRules { clear_on_new_match: true };
        let mut board = GomokuBoard::empty();
        board.board[7][7] = "X".into();

        let mut roster = roster_of(&["a"]);
        rules.assign_roles(&mut board, &mut roster);
        assert_eq!(board.cell(7, 7), "X");

        assert!(rules.board_reset_on_new_match());
        assert!(!GomokuRules::default().board_reset_on_new_match());
    }

    // -- Integration: full game over WebSocket ----------------------------

    type Ws = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn start() -> String {
        let server = ParlorServerBuilder::new()
            .bind("127.0.0.1:0")
            .build(GomokuRules::default())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        addr
    }

    async fn connect(addr: &str, id: &str) -> Ws {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        ws.send(Message::Text(
            json!({"type": "init", "playerId": id, "name": id}).to_string().into(),
        ))
        .await
        .unwrap();
        recv_until(&mut ws, "gameState").await;
        ws
    }

    async fn recv_until(ws: &mut Ws, frame_type: &str) -> Value {
        for _ in 0..32 {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timeout")
                .expect("stream ended")
                .expect("read error");
            let Message::Text(text) = msg else { continue };
            let frame: Value = serde_json::from_str(text.as_str()).unwrap();
            if frame["type"] == frame_type {
                return frame;
            }
        }
        panic!("no {frame_type} frame within 32 frames");
    }

    async fn place(sender: &mut Ws, other: &mut Ws, x: i32, y: i32) -> Value {
        sender
            .send(Message::Text(
                json!({"type": "action", "move": {"x": x, "y": y}}).to_string().into(),
            ))
            .await
            .unwrap();
        let state = recv_until(sender, "gameState").await;
        recv_until(other, "gameState").await;
        state
    }

    #[tokio::test]
    async fn test_column_of_five_wins_for_x() {
        let addr = start().await;
        let mut x = connect(&addr, "px").await;
        let mut o = connect(&addr, "po").await;
        recv_until(&mut x, "gameState").await; // o's join broadcast

        // X stacks (7,7)..(7,10) while O answers along the top row.
        for i in 0..4 {
            let state = place(&mut x, &mut o, 7, 7 + i).await;
            assert!(state.get("winner").is_none());
            place(&mut o, &mut x, i, 0).await;
        }

        // The fifth stone at (7,11) ends it.
        let state = place(&mut x, &mut o, 7, 11).await;
        assert_eq!(state["winner"], "px");
        assert_eq!(state["board"][11][7], "X");

        // Terminal: O's follow-up is ignored; a reset clears the board.
        o.send(Message::Text(
            json!({"type": "action", "move": {"x": 5, "y": 5}}).to_string().into(),
        ))
        .await
        .unwrap();
        x.send(Message::Text(json!({"type": "reset"}).to_string().into()))
            .await
            .unwrap();
        let state = recv_until(&mut x, "gameState").await;
        assert!(state.get("winner").is_none());
        assert_eq!(state["board"][7][7], "");
        assert_eq!(state["turn"], "px");
    }

    #[tokio::test]
    async fn test_occupied_cell_is_rejected_without_losing_the_turn() {
        let addr = start().await;
        let mut x = connect(&addr, "px").await;
        let mut o = connect(&addr, "po").await;
        recv_until(&mut x, "gameState").await;

        place(&mut x, &mut o, 7, 7).await;

        // O tries X's cell: dropped, still O's turn afterwards.
        o.send(Message::Text(
            json!({"type": "action", "move": {"x": 7, "y": 7}}).to_string().into(),
        ))
        .await
        .unwrap();
        let state = place(&mut o, &mut x, 8, 7).await;
        assert_eq!(state["board"][7][8], "O");
        assert_eq!(state["turn"], "px");
    }
}
