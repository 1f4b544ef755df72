// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +-------------------------+------------------------+
// | Wheel (60%)              | Watched (40%)          |
// +-------------------------+------------------------+
// | Messages (7 rows)                                 |
// +--------------------------------------------------+
// | Command Line (3 rows)                             |
// +--------------------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Owner, list counts and busy indicators.
    pub status_bar: Rect,
    /// The wheel's entries with the pointer marker.
    pub wheel: Rect,
    /// The watched list.
    pub watched: Rect,
    /// Recent info and error messages.
    pub messages: Rect,
    /// Bordered input line for typed commands.
    pub command_line: Rect,
    /// Keyboard hints.
    pub help_bar: Rect,
}

/// Build the layout from the available terminal area.
pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(6),    // wheel + watched
            Constraint::Length(7), // messages
            Constraint::Length(3), // command line
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(vertical[1]);

    AppLayout {
        status_bar: vertical[0],
        wheel: horizontal[0],
        watched: horizontal[1],
        messages: vertical[2],
        command_line: vertical[3],
        help_bar: vertical[4],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_area() -> Rect {
        Rect::new(0, 0, 120, 40)
    }

    #[test]
    fn layout_all_rects_nonzero() {
        let layout = build_layout(test_area());
        let rects = [
            ("status_bar", layout.status_bar),
            ("wheel", layout.wheel),
            ("watched", layout.watched),
            ("messages", layout.messages),
            ("command_line", layout.command_line),
            ("help_bar", layout.help_bar),
        ];
        for (name, rect) in &rects {
            assert!(
                rect.width > 0 && rect.height > 0,
                "{} has zero area: {:?}",
                name,
                rect
            );
        }
    }

    #[test]
    fn fixed_rows_have_their_heights() {
        let layout = build_layout(test_area());
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.messages.height, 7);
        assert_eq!(layout.command_line.height, 3);
        assert_eq!(layout.help_bar.height, 1);
    }

    #[test]
    fn lists_share_the_middle_row() {
        let layout = build_layout(test_area());
        assert_eq!(layout.wheel.y, layout.watched.y);
        assert_eq!(layout.wheel.height, layout.watched.height);
        assert!(layout.wheel.width > layout.watched.width);
        assert_eq!(layout.wheel.width + layout.watched.width, 120);
        assert_eq!(layout.wheel.height, 40 - 1 - 7 - 3 - 1);
    }

    #[test]
    fn panels_stack_top_to_bottom() {
        let layout = build_layout(test_area());
        assert!(layout.status_bar.y < layout.wheel.y);
        assert!(layout.wheel.y < layout.messages.y);
        assert!(layout.messages.y < layout.command_line.y);
        assert!(layout.command_line.y < layout.help_bar.y);
    }
}
