//! Plain-text rendering of server responses for the terminal

use shared::{LeaderboardRow, LeaderboardSummary, MatchRecord, Player, PlayerHighscore};

const NAME_WIDTH: usize = 30;

/// Renders one leaderboard page with positions continuing across pages
pub fn render_page(page_index: u32, page_size: u32, rows: &[LeaderboardRow]) -> String {
    if rows.is_empty() {
        return format!("Page {} is empty\n", page_index + 1);
    }

    let first_position = page_index as u64 * page_size as u64 + 1;
    let header = format!("{:>5}  {:<NAME_WIDTH$}  {:>12}\n", "#", "Player", "Score");
    let lines = rows.iter().enumerate().map(|(i, row)| {
        format!(
            "{:>5}  {:<NAME_WIDTH$}  {:>12}\n",
            first_position + i as u64,
            row.display_name,
            row.score
        )
    });
    std::iter::once(header).chain(lines).collect()
}

pub fn render_summary(summary: &LeaderboardSummary) -> String {
    match summary.count {
        0 => "No players on the leaderboard yet\n".to_string(),
        1 => format!("1 player on {} page\n", summary.pages),
        count => format!(
            "{} players on {} page{}\n",
            count,
            summary.pages,
            if summary.pages == 1 { "" } else { "s" }
        ),
    }
}

pub fn render_highscore(highscore: &PlayerHighscore) -> String {
    format!(
        "{}: best score {}, rank {}\n",
        highscore.display_name, highscore.best_score, highscore.rank
    )
}

pub fn render_player(player: &Player) -> String {
    format!(
        "Player {} ({}), registered {}\n",
        player.id,
        player.name,
        player.registered_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

pub fn render_history(matches: &[MatchRecord]) -> String {
    if matches.is_empty() {
        return "No matches recorded\n".to_string();
    }

    matches
        .iter()
        .map(|record| {
            format!(
                "{:>8}  {}  {:>12}\n",
                record.match_id,
                record.submitted_at.format("%Y-%m-%d %H:%M:%S"),
                record.score
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(name: &str, score: u64) -> LeaderboardRow {
        LeaderboardRow {
            display_name: name.to_string(),
            score,
        }
    }

    #[test]
    fn test_render_page_positions_continue() {
        let out = render_page(1, 10, &[row("P3", 2), row("P2", 1)]);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(out.ends_with('\n'));
        assert!(lines[0].contains("Player"));
        assert!(lines[1].trim_start().starts_with("11"));
        assert!(lines[1].contains("P3"));
        assert!(lines[2].trim_start().starts_with("12"));
        assert!(lines[2].trim_end().ends_with('1'));
    }

    #[test]
    fn test_render_empty_page() {
        assert_eq!(render_page(4, 10, &[]), "Page 5 is empty\n");
    }

    #[test]
    fn test_render_summary() {
        assert_eq!(
            render_summary(&LeaderboardSummary::default()),
            "No players on the leaderboard yet\n"
        );
        assert_eq!(
            render_summary(&LeaderboardSummary { count: 1, pages: 1 }),
            "1 player on 1 page\n"
        );
        assert_eq!(
            render_summary(&LeaderboardSummary { count: 2, pages: 1 }),
            "2 players on 1 page\n"
        );
        assert_eq!(
            render_summary(&LeaderboardSummary { count: 25, pages: 3 }),
            "25 players on 3 pages\n"
        );
    }

    #[test]
    fn test_render_highscore() {
        let highscore = PlayerHighscore {
            display_name: "alice".to_string(),
            best_score: 42,
            rank: 3,
        };
        assert_eq!(render_highscore(&highscore), "alice: best score 42, rank 3\n");
    }

    #[test]
    fn test_render_history() {
        let when = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let matches = vec![MatchRecord {
            match_id: 7,
            player_id: 1,
            score: 123456,
            submitted_at: when,
        }];

        let out = render_history(&matches);
        assert_eq!(out.lines().count(), 1);
        assert!(out.ends_with('\n'));
        assert!(out.contains("2024-05-01 12:30:00"));
        assert!(out.contains("123456"));
        assert_eq!(render_history(&[]), "No matches recorded\n");
    }

    #[test]
    fn test_render_player() {
        let player = Player {
            id: 4,
            name: "bob".to_string(),
            registered_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };
        assert_eq!(
            render_player(&player),
            "Player 4 (bob), registered 2024-01-02 03:04:05 UTC\n"
        );
    }
}
