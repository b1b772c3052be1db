use std::time::{Duration, Instant};

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use crate::exchange::{Notification, NotificationKind};

const TOAST_WIDTH: u16 = 44;

/// Transient notification overlay; one at a time, newest wins
#[derive(Debug, Clone)]
pub struct Toast {
    current: Option<(Notification, Instant)>,
    lifetime: Duration,
}

impl Toast {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            current: None,
            lifetime,
        }
    }

    pub fn show(&mut self, notification: Notification) {
        self.show_at(notification, Instant::now());
    }

    fn show_at(&mut self, notification: Notification, now: Instant) {
        self.current = Some((notification, now));
    }

    /// Returns true if a toast was dismissed
    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Drop the toast once it has outlived its lifetime
    pub fn expire(&mut self, now: Instant) {
        if let Some((_, shown)) = &self.current {
            if now.duration_since(*shown) >= self.lifetime {
                self.current = None;
            }
        }
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref().map(|(n, _)| n)
    }

    /// Top-right placement inside `area`
    pub fn area(&self, area: Rect) -> Rect {
        let width = TOAST_WIDTH.min(area.width);
        let height = self
            .current()
            .map(|n| toast_height(&n.description, width))
            .unwrap_or(0)
            .min(area.height);
        Rect {
            x: area.x + area.width - width,
            y: area.y,
            width,
            height,
        }
    }
}

/// Borders, wrapped description and the dismiss hint
fn toast_height(description: &str, width: u16) -> u16 {
    let inner = usize::from(width.saturating_sub(2).max(1));
    let rows: usize = description
        .split('\n')
        .map(|line| line.chars().count().div_ceil(inner).max(1))
        .sum();
    u16::try_from(rows.saturating_add(3)).unwrap_or(u16::MAX)
}

impl Widget for &Toast {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(notification) = self.current() else {
            return;
        };

        let color = match notification.kind {
            NotificationKind::Error => Color::Red,
            NotificationKind::Info => Color::Cyan,
        };
        let toast_area = self.area(area);
        if toast_area.height < 3 {
            return;
        }

        Clear.render(toast_area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(Span::styled(
                notification.title.clone(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));

        let mut lines: Vec<Line> = notification.description.split('\n').map(Line::from).collect();
        lines.push(Line::from(Span::styled(
            "Esc to dismiss",
            Style::default().fg(Color::DarkGray),
        )));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(toast_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification() -> Notification {
        Notification::info("Note", "something happened")
    }

    #[test]
    fn test_show_and_dismiss() {
        let mut toast = Toast::new(Duration::from_secs(5));
        assert!(!toast.dismiss());

        toast.show(notification());
        assert_eq!(toast.current().map(|n| n.title.as_str()), Some("Note"));
        assert!(toast.dismiss());
        assert!(toast.current().is_none());
    }

    #[test]
    fn test_expires_after_lifetime() {
        let mut toast = Toast::new(Duration::from_secs(5));
        let shown = Instant::now();
        toast.show_at(notification(), shown);

        toast.expire(shown + Duration::from_secs(4));
        assert!(toast.current().is_some());
        toast.expire(shown + Duration::from_secs(5));
        assert!(toast.current().is_none());
    }

    #[test]
    fn test_area_stays_inside() {
        let mut toast = Toast::new(Duration::from_secs(5));
        toast.show(notification());

        let outer = Rect::new(0, 0, 30, 10);
        let area = toast.area(outer);
        assert_eq!(area.x + area.width, 30);
        assert!(area.height <= 10);
    }

    #[test]
    fn test_height_counts_line_breaks() {
        let mut toast = Toast::new(Duration::from_secs(5));
        toast.show(Notification::info("Note", "one\ntwo\nthree"));

        let area = toast.area(Rect::new(0, 0, 80, 40));
        assert_eq!(area.height, 6);
    }

    #[test]
    fn test_huge_description_on_narrow_terminal() {
        let mut toast = Toast::new(Duration::from_secs(5));
        toast.show(Notification::info("Error", "x".repeat(200_000)));

        let outer = Rect::new(0, 0, 3, 20);
        let area = toast.area(outer);
        assert_eq!(area.height, 20);
        assert_eq!(area.width, 3);

        let mut buf = Buffer::empty(outer);
        (&toast).render(outer, &mut buf);
    }
}
