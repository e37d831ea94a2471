//! Status - ボードと履歴の概況

use serde::Serialize;

use crate::domain::BoardState;

/// Counts describing one client's view of the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoardStatus {
    pub columns: usize,
    pub tasks: usize,
    pub comments: usize,
    /// Undo depth.
    pub past: usize,
    /// Redo depth.
    pub future: usize,
    pub active_users: usize,
}

impl BoardStatus {
    pub fn collect(state: &BoardState, active_users: usize) -> Self {
        let board = state.board();
        let history = state.history();
        Self {
            columns: board.columns.len(),
            tasks: board.tasks.len(),
            comments: board.comment_count(),
            past: history.past.len(),
            future: history.future.len(),
            active_users,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ulid::Ulid;

    use crate::domain::{ColumnId, Mutation};

    #[test]
    fn counts_follow_board_and_history() {
        let mut state = BoardState::new(None);
        assert_eq!(BoardStatus::collect(&state, 0), BoardStatus::default());

        state
            .apply(
                Mutation::AddColumn {
                    column_id: ColumnId::from_ulid(Ulid::new()),
                    title: "To Do".into(),
                },
                Utc::now(),
            )
            .unwrap();
        state.undo();

        let status = BoardStatus::collect(&state, 2);
        assert_eq!(
            status,
            BoardStatus {
                columns: 0,
                tasks: 0,
                comments: 0,
                past: 0,
                future: 1,
                active_users: 2,
            }
        );
    }
}
